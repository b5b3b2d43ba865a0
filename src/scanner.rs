//! Adaptive widening-threshold barcode search.
//!
//! Lighting and contrast of the capture are unknown, so no single fixed
//! binarization threshold is reliable. The scanner starts from an Otsu
//! threshold and widens upward in fixed steps, handing each binarized image
//! to the decoder until one attempt succeeds or the threshold space is
//! exhausted.

use crate::frame::GrayFrame;
use crate::traits::SymbolDecoder;

/// Increment between successive binarization thresholds.
///
/// Fixed policy constant trading decode success rate against latency: larger
/// steps decode faster but miss more images.
pub const THRESHOLD_STEP: u32 = 20;

/// Drives a [`SymbolDecoder`] through the widening-threshold search.
pub struct AdaptiveScanner<D> {
    decoder: D,
}

impl<D: SymbolDecoder> AdaptiveScanner<D> {
    /// Create a scanner over the given decoder.
    pub const fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Access the underlying decoder.
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Search the luminance image for one decodable symbol.
    ///
    /// Attempts the Otsu-selected threshold first, then T0, T0+20, T0+40, …
    /// while below 255, returning the first successful decode. The search
    /// runs at most `ceil((255 - T0) / 20) + 1` threshold attempts.
    pub fn scan(&mut self, luma: &GrayFrame) -> Option<String> {
        let initial = otsu_threshold(luma);

        let binary = binarize(luma, initial);
        if let Some(symbol) = self.decode_with_open_fallback(&binary) {
            return Some(symbol);
        }
        if initial >= 255 {
            return None;
        }

        let mut threshold = u32::from(initial);
        while threshold < 255 {
            #[allow(clippy::cast_possible_truncation)]
            let binary = binarize(luma, threshold as u8);
            if let Some(symbol) = self.decode_with_open_fallback(&binary) {
                return Some(symbol);
            }
            threshold += THRESHOLD_STEP;
        }
        None
    }

    /// One decode attempt on the binary image as-is, then exactly one retry
    /// on a morphologically opened copy to shed speckle noise. Not nested
    /// further into the threshold loop.
    fn decode_with_open_fallback(&mut self, binary: &GrayFrame) -> Option<String> {
        if let Some(symbol) = self.decoder.decode(binary).filter(|s| !s.is_empty()) {
            return Some(symbol);
        }
        let opened = open_3x3(binary);
        self.decoder.decode(&opened).filter(|s| !s.is_empty())
    }
}

/// Select a global threshold by Otsu's method: maximize the between-class
/// variance over the luminance histogram.
#[must_use]
pub fn otsu_threshold(image: &GrayFrame) -> u8 {
    let mut histogram = [0u32; 256];
    for &px in &image.data {
        histogram[px as usize] += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let total = image.data.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as f64 * f64::from(count))
        .sum();

    let mut sum_below = 0.0;
    let mut weight_below = 0.0;
    let mut best_threshold = 0u8;
    let mut best_variance = 0.0;

    for (value, &count) in histogram.iter().enumerate() {
        weight_below += f64::from(count);
        if weight_below == 0.0 {
            continue;
        }
        let weight_above = total - weight_below;
        if weight_above == 0.0 {
            break;
        }
        sum_below += value as f64 * f64::from(count);

        let mean_below = sum_below / weight_below;
        let mean_above = (sum_all - sum_below) / weight_above;
        let variance = weight_below * weight_above * (mean_below - mean_above).powi(2);
        if variance > best_variance {
            best_variance = variance;
            #[allow(clippy::cast_possible_truncation)]
            {
                best_threshold = value as u8;
            }
        }
    }
    best_threshold
}

/// Binarize: values strictly above `threshold` become 255, the rest 0.
#[must_use]
pub fn binarize(image: &GrayFrame, threshold: u8) -> GrayFrame {
    let data = image
        .data
        .iter()
        .map(|&px| if px > threshold { 255 } else { 0 })
        .collect();
    GrayFrame {
        width: image.width,
        height: image.height,
        data,
    }
}

/// Morphological opening with a 3x3 rectangular structuring element:
/// erosion followed by dilation, borders replicated. Removes isolated
/// speckle while preserving larger structures.
#[must_use]
pub fn open_3x3(image: &GrayFrame) -> GrayFrame {
    dilate_3x3(&erode_3x3(image))
}

fn erode_3x3(image: &GrayFrame) -> GrayFrame {
    morph_3x3(image, |neighborhood, px| neighborhood.min(px))
}

fn dilate_3x3(image: &GrayFrame) -> GrayFrame {
    morph_3x3(image, |neighborhood, px| neighborhood.max(px))
}

/// Apply `fold` over each pixel's clamped 3x3 neighborhood. Clamping the
/// window at the borders is equivalent to border replication for min/max
/// folds.
fn morph_3x3(image: &GrayFrame, fold: impl Fn(u8, u8) -> u8) -> GrayFrame {
    let mut out = GrayFrame::new(image.width, image.height);
    if image.width == 0 || image.height == 0 {
        return out;
    }
    for y in 0..image.height {
        for x in 0..image.width {
            let mut acc = None;
            for ny in y.saturating_sub(1)..=(y + 1).min(image.height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(image.width - 1) {
                    if let Some(px) = image.get(nx, ny) {
                        acc = Some(match acc {
                            None => px,
                            Some(current) => fold(current, px),
                        });
                    }
                }
            }
            out.set(x, y, acc.unwrap_or(0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::RqrrDecoder;
    use crate::mock::{qr_hello_frame, CountingDecoder, ScriptedDecoder, QR_HELLO_PAYLOAD};

    /// Bimodal image: half the pixels at `low`, half at `high`.
    fn bimodal(width: u32, height: u32, low: u8, high: u8) -> GrayFrame {
        let mut image = GrayFrame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                image.set(x, y, if x < width / 2 { low } else { high });
            }
        }
        image
    }

    #[test]
    fn test_otsu_separates_bimodal_modes() {
        let image = bimodal(64, 64, 40, 200);
        let threshold = otsu_threshold(&image);
        assert!(
            (40..200).contains(&threshold),
            "threshold {threshold} should fall between the modes"
        );
    }

    #[test]
    fn test_otsu_uniform_image() {
        let image = GrayFrame::from_data(8, 8, vec![128; 64]).expect("size matches");
        // A single-mode histogram has no between-class split; any value is
        // acceptable as long as it does not panic.
        let _ = otsu_threshold(&image);
    }

    #[test]
    fn test_binarize_is_strictly_above() {
        let image = GrayFrame::from_data(4, 1, vec![0, 127, 128, 255]).expect("size matches");
        let binary = binarize(&image, 127);
        assert_eq!(binary.data, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_open_removes_isolated_speckle() {
        let mut image = GrayFrame::new(9, 9);
        image.set(4, 4, 255);
        let opened = open_3x3(&image);
        assert!(opened.data.iter().all(|&px| px == 0));
    }

    #[test]
    fn test_open_preserves_solid_block() {
        let mut image = GrayFrame::new(9, 9);
        for y in 2..7 {
            for x in 2..7 {
                image.set(x, y, 255);
            }
        }
        let opened = open_3x3(&image);
        // Interior of a 5x5 block survives erosion + dilation intact.
        assert_eq!(opened.get(4, 4), Some(255));
        assert_eq!(opened.get(3, 3), Some(255));
        assert_eq!(opened.get(0, 0), Some(0));
    }

    #[test]
    fn test_scan_attempt_bound() {
        let mut scanner = AdaptiveScanner::new(CountingDecoder::default());
        let image = bimodal(32, 32, 40, 200);
        let initial = u32::from(otsu_threshold(&image));

        assert_eq!(scanner.scan(&image), None);

        let threshold_attempts = (255 - initial).div_ceil(THRESHOLD_STEP) + 1;
        // Two decode calls per threshold level: as-is, then opened.
        assert_eq!(
            scanner.decoder().calls(),
            threshold_attempts as usize * 2,
            "initial threshold {initial}"
        );
    }

    #[test]
    fn test_scan_stops_at_first_success() {
        // Succeed on the third decode call: second threshold level, as-is
        // attempt.
        let decoder = ScriptedDecoder::new("hello", 3);
        let mut scanner = AdaptiveScanner::new(decoder);
        let image = bimodal(32, 32, 40, 200);

        assert_eq!(scanner.scan(&image).as_deref(), Some("hello"));
        assert_eq!(scanner.decoder().calls(), 3);
    }

    #[test]
    fn test_scan_decodes_qr_symbol_from_grey_levels() {
        // Mid-range grey levels, so the symbol only becomes readable after
        // binarization.
        let mut scanner = AdaptiveScanner::new(RqrrDecoder);
        let image = qr_hello_frame(4, 40, 200);
        assert_eq!(scanner.scan(&image).as_deref(), Some(QR_HELLO_PAYLOAD));
    }

    #[test]
    fn test_scan_empty_string_is_not_found() {
        // A decoder handing back empty strings must read as "not found".
        let decoder = ScriptedDecoder::new("", 1);
        let mut scanner = AdaptiveScanner::new(decoder);
        let image = bimodal(32, 32, 40, 200);
        assert_eq!(scanner.scan(&image), None);
    }
}

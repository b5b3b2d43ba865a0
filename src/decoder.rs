//! Production QR symbol decoder backed by the pure-Rust rqrr crate.

use crate::frame::GrayFrame;
use crate::traits::SymbolDecoder;

/// QR decoder over [`rqrr`].
///
/// Finding no symbol in an image is reported as `None`, never as an error;
/// grids that fail to decode are skipped the same way.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl SymbolDecoder for RqrrDecoder {
    fn decode(&mut self, image: &GrayFrame) -> Option<String> {
        let width = image.width as usize;
        let height = image.height as usize;
        if width == 0 || height == 0 {
            return None;
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            image.data.get(y * width + x).copied().unwrap_or(0)
        });

        for grid in prepared.detect_grids() {
            if let Ok((_meta, content)) = grid.decode() {
                if !content.is_empty() {
                    return Some(content);
                }
            }
        }
        None
    }
}

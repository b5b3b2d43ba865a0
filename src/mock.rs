//! Test doubles for the pipeline: scripted frame source, decoders, and an
//! in-memory framebuffer.

use std::collections::VecDeque;

use crate::frame::{BgrFrame, GrayFrame};
use crate::traits::{
    FbGeometry, FrameSource, LinearFramebuffer, PipelineError, Result, SymbolDecoder,
};

/// Frame source replaying a scripted queue; reports
/// [`PipelineError::FrameUnavailable`] once the queue is exhausted.
#[derive(Debug, Default)]
pub struct MockSource {
    frames: VecDeque<Result<BgrFrame>>,
}

impl MockSource {
    /// Queue a frame to be returned by a later `next_frame` call.
    #[must_use]
    pub fn with_frame(mut self, frame: BgrFrame) -> Self {
        self.frames.push_back(Ok(frame));
        self
    }

    /// Queue an error to be returned by a later `next_frame` call.
    #[must_use]
    pub fn with_error(mut self, error: PipelineError) -> Self {
        self.frames.push_back(Err(error));
        self
    }
}

impl FrameSource for MockSource {
    fn next_frame(&mut self) -> Result<BgrFrame> {
        self.frames
            .pop_front()
            .unwrap_or(Err(PipelineError::FrameUnavailable))
    }
}

/// Decoder that never finds a symbol but counts how often it was asked.
#[derive(Debug, Default)]
pub struct CountingDecoder {
    calls: usize,
}

impl CountingDecoder {
    /// Number of decode attempts so far.
    #[must_use]
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl SymbolDecoder for CountingDecoder {
    fn decode(&mut self, _image: &GrayFrame) -> Option<String> {
        self.calls += 1;
        None
    }
}

/// Decoder that fails until the Nth call, then returns a fixed payload on
/// that call and every call after it.
#[derive(Debug)]
pub struct ScriptedDecoder {
    payload: String,
    succeed_on: usize,
    calls: usize,
}

impl ScriptedDecoder {
    /// Succeed with `payload` starting from call number `succeed_on`
    /// (1-based).
    #[must_use]
    pub fn new(payload: &str, succeed_on: usize) -> Self {
        Self {
            payload: payload.to_owned(),
            succeed_on,
            calls: 0,
        }
    }

    /// Number of decode attempts so far.
    #[must_use]
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(&mut self, _image: &GrayFrame) -> Option<String> {
        self.calls += 1;
        (self.calls >= self.succeed_on).then(|| self.payload.clone())
    }
}

/// Payload encoded by [`QR_HELLO_MODULES`].
pub const QR_HELLO_PAYLOAD: &str = "hello";

/// Version-1 QR symbol for [`QR_HELLO_PAYLOAD`], byte mode, error correction
/// level L, mask 0. `#` is a dark module.
pub const QR_HELLO_MODULES: [&str; 21] = [
    "#######  # ## #######",
    "#     #  ###  #     #",
    "# ### # ## ## # ### #",
    "# ### #  # #  # ### #",
    "# ### #   # # # ### #",
    "#     #     # #     #",
    "####### # # # #######",
    "        ## ##        ",
    "### ######## ##   #  ",
    " ##### ###    #    ##",
    " ###### #   #   #####",
    "  ##          #    # ",
    "    # ## ## # # #    ",
    "        ## # # #  ###",
    "####### #### ###  ###",
    "#     # ###### ##    ",
    "# ### # #### ###   ##",
    "# ### #   #   ##  ## ",
    "# ### # ### #   # # #",
    "#     # ##    # #  # ",
    "####### # # # ##   ##",
];

/// Render [`QR_HELLO_MODULES`] at `scale` pixels per module on a `light`
/// background with a four-module quiet zone on every side.
#[must_use]
pub fn qr_hello_frame(scale: u32, dark: u8, light: u8) -> GrayFrame {
    const QUIET_MODULES: u32 = 4;
    let modules = QR_HELLO_MODULES.len() as u32;
    let side = (modules + 2 * QUIET_MODULES) * scale;

    let mut frame = GrayFrame::new(side, side);
    frame.data.fill(light);
    for (row, line) in QR_HELLO_MODULES.iter().enumerate() {
        for (col, module) in line.bytes().enumerate() {
            if module != b'#' {
                continue;
            }
            let y0 = (QUIET_MODULES + row as u32) * scale;
            let x0 = (QUIET_MODULES + col as u32) * scale;
            for y in y0..y0 + scale {
                for x in x0..x0 + scale {
                    frame.set(x, y, dark);
                }
            }
        }
    }
    frame
}

/// Rows of device memory held by a [`MemoryFramebuffer`].
const MEMORY_FB_ROWS: usize = 1024;

/// In-memory linear framebuffer recording every write's offset and length.
#[derive(Debug)]
pub struct MemoryFramebuffer {
    geometry: FbGeometry,
    data: Vec<u8>,
    writes: Vec<(usize, usize)>,
}

impl MemoryFramebuffer {
    /// Create a zeroed device with room for [`MEMORY_FB_ROWS`] scanlines.
    #[must_use]
    pub fn new(geometry: FbGeometry) -> Self {
        let stride = geometry.virtual_width as usize * geometry.bytes_per_pixel().max(1) as usize;
        Self {
            geometry,
            data: vec![0; stride * MEMORY_FB_ROWS],
            writes: Vec::new(),
        }
    }

    /// Prefill device memory with a sentinel byte.
    #[must_use]
    pub fn filled_with(mut self, value: u8) -> Self {
        self.data.fill(value);
        self
    }

    /// Every write performed so far, as (byte offset, length) pairs in order.
    #[must_use]
    pub const fn writes(&self) -> &Vec<(usize, usize)> {
        &self.writes
    }

    /// Raw device memory.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl LinearFramebuffer for MemoryFramebuffer {
    fn geometry(&self) -> FbGeometry {
        self.geometry
    }

    fn write_scanline(&mut self, offset: usize, pixels: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(pixels.len())
            .ok_or(PipelineError::ScanlineOutOfBounds {
                offset,
                len: pixels.len(),
            })?;
        let destination =
            self.data
                .get_mut(offset..end)
                .ok_or(PipelineError::ScanlineOutOfBounds {
                    offset,
                    len: pixels.len(),
                })?;
        destination.copy_from_slice(pixels);
        self.writes.push((offset, pixels.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_replays_then_drains() {
        let mut source = MockSource::default().with_frame(BgrFrame::new(2, 2));
        assert!(source.next_frame().is_ok());
        assert!(matches!(
            source.next_frame(),
            Err(PipelineError::FrameUnavailable)
        ));
    }

    #[test]
    fn test_scripted_decoder_threshold() {
        let mut decoder = ScriptedDecoder::new("ok", 2);
        let image = GrayFrame::new(1, 1);
        assert_eq!(decoder.decode(&image), None);
        assert_eq!(decoder.decode(&image).as_deref(), Some("ok"));
        assert_eq!(decoder.decode(&image).as_deref(), Some("ok"));
        assert_eq!(decoder.calls(), 3);
    }

    #[test]
    fn test_memory_framebuffer_records_writes() {
        let mut fb = MemoryFramebuffer::new(FbGeometry {
            virtual_width: 8,
            bits_per_pixel: 16,
        });
        fb.write_scanline(4, &[1, 2, 3]).expect("in bounds");
        assert_eq!(fb.writes(), &vec![(4, 3)]);
        assert_eq!(&fb.data()[4..7], &[1, 2, 3]);
    }

    #[test]
    fn test_memory_framebuffer_rejects_out_of_bounds() {
        let mut fb = MemoryFramebuffer::new(FbGeometry {
            virtual_width: 1,
            bits_per_pixel: 16,
        });
        let too_far = fb.data().len();
        assert!(matches!(
            fb.write_scanline(too_far, &[0]),
            Err(PipelineError::ScanlineOutOfBounds { .. })
        ));
    }
}

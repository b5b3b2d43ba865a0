//! Depth-specific pixel conversion and scanline-addressed framebuffer writes.
//!
//! Byte offsets are computed from the device's virtual width, not the frame
//! width, so rows are written independently: a frame narrower than the
//! display leaves the remainder of each scanline untouched.

use crate::frame::{BgrFrame, BGR_CHANNELS};
use crate::traits::{LinearFramebuffer, PipelineError, Result};

/// Convert `frame` to the device's native pixel layout and write it scanline
/// by scanline.
///
/// Fails with [`PipelineError::FrameWiderThanDevice`] before any write when
/// the frame does not fit within the virtual width, and with
/// [`PipelineError::UnsupportedFramebufferDepth`] for depths other than 16
/// and 32 bits per pixel.
pub fn write_frame<F: LinearFramebuffer>(fb: &mut F, frame: &BgrFrame) -> Result<()> {
    let geometry = fb.geometry();
    if frame.width > geometry.virtual_width {
        return Err(PipelineError::FrameWiderThanDevice {
            frame: frame.width,
            device: geometry.virtual_width,
        });
    }
    // A degenerate frame has no scanlines to emit.
    if frame.width == 0 || frame.height == 0 {
        return Ok(());
    }

    match geometry.bits_per_pixel {
        16 => {
            let packed = pack_bgr565(frame);
            write_rows(fb, frame, &packed, 2, geometry.virtual_width)
        }
        32 => {
            let padded = pad_bgra(frame);
            write_rows(fb, frame, &padded, 4, geometry.virtual_width)
        }
        depth => Err(PipelineError::UnsupportedFramebufferDepth(depth)),
    }
}

fn write_rows<F: LinearFramebuffer>(
    fb: &mut F,
    frame: &BgrFrame,
    pixels: &[u8],
    bytes_per_pixel: usize,
    virtual_width: u32,
) -> Result<()> {
    let row_bytes = frame.width as usize * bytes_per_pixel;
    let device_stride = virtual_width as usize * bytes_per_pixel;
    for (row, line) in pixels.chunks_exact(row_bytes).enumerate() {
        fb.write_scanline(row * device_stride, line)?;
    }
    Ok(())
}

/// Pack the whole frame into 16-bit 5/6/5 pixels (red in the high bits),
/// little-endian, in one pass.
#[must_use]
pub fn pack_bgr565(frame: &BgrFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize * 2);
    for px in frame.data.chunks_exact(BGR_CHANNELS) {
        let (b, g, r) = (u16::from(px[0]), u16::from(px[1]), u16::from(px[2]));
        let packed = (b >> 3) | ((g >> 2) << 5) | ((r >> 3) << 11);
        out.extend_from_slice(&packed.to_le_bytes());
    }
    out
}

/// Pad the frame to 4 bytes per pixel by interleaving a constant fully-opaque
/// fourth channel (255) after the blue-green-red bytes.
#[must_use]
pub fn pad_bgra(frame: &BgrFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize * 4);
    for px in frame.data.chunks_exact(BGR_CHANNELS) {
        out.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    out
}

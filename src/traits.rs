//! Core traits and shared types for the capture-to-framebuffer pipeline.

use thiserror::Error;

use crate::frame::{BgrFrame, GrayFrame};

/// Pixel format representation (e.g., YUYV, RGB3, BGR3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");
    /// BGR3 pixel format (24-bit BGR).
    pub const BGR3: Self = Self::new(b"BGR3");
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Display geometry of a linear framebuffer device.
///
/// Queried once at startup and immutable for the process lifetime; the
/// pipeline does not support hot display resizing. Scanline byte offsets are
/// always computed against `virtual_width`, never against the frame width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbGeometry {
    /// Virtual horizontal resolution in pixels.
    pub virtual_width: u32,
    /// Bits per pixel; 16 and 32 are the supported depths.
    pub bits_per_pixel: u32,
}

impl FbGeometry {
    /// Bytes occupied by one pixel at this depth.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> u32 {
        self.bits_per_pixel / 8
    }

    /// Whether the pipeline has a conversion path for this depth.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self.bits_per_pixel, 16 | 32)
    }
}

/// Error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Camera or framebuffer device could not be opened. Fatal at startup.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Framebuffer geometry query or memory map failed. Fatal at startup.
    #[error("framebuffer geometry query failed: {0}")]
    QueryFailed(String),
    /// Captured frame format has no conversion path to BGR.
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(FourCC),
    /// Framebuffer depth is neither 16 nor 32 bits per pixel.
    #[error("unsupported framebuffer depth: {0} bits per pixel")]
    UnsupportedFramebufferDepth(u32),
    /// No frame was available this cycle. Transient, skipped without logging.
    #[error("no frame available")]
    FrameUnavailable,
    /// Frame does not fit within the device's virtual width.
    #[error("frame width {frame} exceeds framebuffer virtual width {device}")]
    FrameWiderThanDevice {
        /// Width of the rejected frame in pixels.
        frame: u32,
        /// Virtual width of the device in pixels.
        device: u32,
    },
    /// Scanline write would fall outside the mapped device memory.
    #[error("scanline write out of device bounds: offset {offset}, len {len}")]
    ScanlineOutOfBounds {
        /// Byte offset of the attempted write.
        offset: usize,
        /// Length of the attempted write in bytes.
        len: usize,
    },
    /// Error during streaming capture.
    #[error("stream error: {0}")]
    Stream(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A camera producing a sequence of BGR frames.
///
/// `next_frame` blocks until a frame is available or the device signals that
/// none is ready, in which case it returns [`PipelineError::FrameUnavailable`].
pub trait FrameSource {
    /// Acquire the next frame from the device.
    fn next_frame(&mut self) -> Result<BgrFrame>;
}

/// Opaque barcode-symbol decoding capability.
///
/// Stateless per call at the design level; an implementation may retain a
/// scanning context between calls, hence `&mut self`.
pub trait SymbolDecoder {
    /// Attempt to extract one decoded symbol from a single-channel image.
    ///
    /// Returns `None` when no symbol was found; finding nothing is not an
    /// error.
    fn decode(&mut self, image: &GrayFrame) -> Option<String>;
}

/// A byte-addressable linear framebuffer.
///
/// Abstracts the raw device so the rendering logic can be exercised against
/// an in-memory buffer. Writes carry no framing or header; callers compute
/// byte offsets from [`FbGeometry`].
pub trait LinearFramebuffer {
    /// Display geometry of this device.
    fn geometry(&self) -> FbGeometry;

    /// Write one scanline's worth of pixel bytes at the given byte offset.
    fn write_scanline(&mut self, offset: usize, pixels: &[u8]) -> Result<()>;
}

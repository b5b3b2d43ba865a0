//! cam2fb: camera-to-framebuffer renderer with adaptive QR scanning
//!
//! This library captures frames from a V4L2 camera, searches each frame for a
//! QR code with a widening-threshold binarization scan, and renders the frame
//! into a memory-mapped Linux framebuffer, converting pixels to the device's
//! native 16-bit or 32-bit layout. Every hardware dependency sits behind a
//! trait so the pipeline runs against in-memory devices in tests.

pub mod camera;
pub mod decoder;
pub mod frame;
pub mod framebuffer;
pub mod render;
pub mod scanner;
pub mod traits;
pub mod writer;

#[cfg(test)]
pub mod mock;

pub use camera::{V4l2Camera, V4l2Source};
pub use decoder::RqrrDecoder;
pub use frame::{BgrFrame, GrayFrame};
pub use framebuffer::LinuxFramebuffer;
pub use render::{CropRegion, RenderLoop};
pub use scanner::AdaptiveScanner;
pub use traits::{
    FbGeometry, FourCC, FrameSource, LinearFramebuffer, PipelineError, Result, SymbolDecoder,
};

//! The steady-state rendering loop: acquire, orient, scan, write.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::frame::BgrFrame;
use crate::scanner::AdaptiveScanner;
use crate::traits::{FrameSource, LinearFramebuffer, PipelineError, SymbolDecoder};
use crate::writer;

/// Fixed sub-rectangle of the capture that gets rendered, chosen for this
/// device's camera mounting: a 320x240 region centered in a 640x480 capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Region width in pixels.
    pub width: u32,
    /// Region height in pixels.
    pub height: u32,
}

/// Default crop region, matching the device's capture geometry.
pub const CROP_REGION: CropRegion = CropRegion {
    x: 160,
    y: 120,
    width: 320,
    height: 240,
};

/// Orchestrates the frame pipeline indefinitely.
///
/// All devices are owned by the loop for the lifetime of the process. Every
/// per-frame failure is contained within one iteration; only device-open
/// failures before the loop exists are fatal. The loop runs until the stop
/// flag is raised, which the steady state never does on its own.
pub struct RenderLoop<S, D, F, O> {
    source: S,
    scanner: AdaptiveScanner<D>,
    framebuffer: F,
    observer: O,
    crop: CropRegion,
    stop: Arc<AtomicBool>,
}

impl<S, D, F, O> RenderLoop<S, D, F, O>
where
    S: FrameSource,
    D: SymbolDecoder,
    F: LinearFramebuffer,
    O: Write,
{
    /// Build a loop over the given devices with the default crop region.
    pub fn new(source: S, decoder: D, framebuffer: F, observer: O) -> Self {
        Self {
            source,
            scanner: AdaptiveScanner::new(decoder),
            framebuffer,
            observer,
            crop: CROP_REGION,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the crop region.
    #[must_use]
    pub fn with_crop(mut self, crop: CropRegion) -> Self {
        self.crop = crop;
        self
    }

    /// Flag that terminates `run` at the next iteration boundary.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run iterations until the stop flag is raised.
    pub fn run(&mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            self.step();
        }
    }

    /// Execute one pipeline iteration. Per-frame failures are logged and
    /// contained; a missing frame is skipped silently.
    pub fn step(&mut self) {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            // A dropped or delayed camera frame is not an error; retry on
            // the next iteration without log spam.
            Err(PipelineError::FrameUnavailable) => return,
            Err(err) => {
                warn!(%err, "frame acquisition failed");
                return;
            }
        };

        let Some(oriented) = self.orient(&frame) else {
            debug!(
                width = frame.width,
                height = frame.height,
                "capture too small for crop region"
            );
            return;
        };

        let decoded = self.scanner.scan(&oriented.to_luma());
        self.emit(decoded.as_deref());

        if let Err(err) = writer::write_frame(&mut self.framebuffer, &oriented) {
            warn!(%err, "framebuffer write failed");
        }
    }

    /// Crop to the configured region, then transpose and horizontally flip
    /// into display orientation.
    fn orient(&self, frame: &BgrFrame) -> Option<BgrFrame> {
        let cropped = frame.crop(self.crop.x, self.crop.y, self.crop.width, self.crop.height)?;
        let mut oriented = cropped.transpose();
        oriented.flip_horizontal();
        Some(oriented)
    }

    /// Emit the decode result to the observer: the decoded string, or an
    /// empty line when nothing was found, one line per frame.
    fn emit(&mut self, decoded: Option<&str>) {
        if let Err(err) = writeln!(self.observer, "{}", decoded.unwrap_or("")) {
            warn!(%err, "observer write failed");
        }
    }

    /// Tear the loop apart, returning the owned devices. Test seam.
    pub fn into_parts(self) -> (S, AdaptiveScanner<D>, F, O) {
        (self.source, self.scanner, self.framebuffer, self.observer)
    }
}

//! V4L2 frame source implementation using the v4l crate.

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::parameters::Parameters;
use v4l::video::Capture;
use v4l::Device;

use tracing::warn;

use crate::frame::{BgrFrame, BGR_CHANNELS};
use crate::traits::{FourCC, FrameSource, PipelineError, Result};

/// Identification strings of an opened camera, for startup diagnostics.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
}

/// Effective capture format as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per line (stride).
    pub stride: u32,
    /// Pixel format.
    pub fourcc: FourCC,
}

/// V4L2 camera device wrapping the v4l crate.
pub struct V4l2Camera {
    device: Device,
    info: CameraInfo,
}

impl V4l2Camera {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize)
            .map_err(|err| PipelineError::DeviceUnavailable(err.to_string()))?;

        let caps = device
            .query_caps()
            .map_err(|err| PipelineError::DeviceUnavailable(err.to_string()))?;

        Ok(Self {
            device,
            info: CameraInfo {
                driver: caps.driver,
                card: caps.card,
            },
        })
    }

    /// Identification strings of the opened device.
    #[must_use]
    pub const fn info(&self) -> &CameraInfo {
        &self.info
    }

    /// Request a capture resolution and frame rate.
    ///
    /// Best-effort: the driver may silently substitute any of width, height,
    /// pixel format, or rate. The format actually in effect is returned and
    /// must be consulted instead of the request.
    pub fn configure(&mut self, width: u32, height: u32, fps: u32) -> Result<CaptureFormat> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| PipelineError::Stream(err.to_string()))?;

        fmt.width = width;
        fmt.height = height;
        fmt.fourcc = FourCC::YUYV.into();

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| PipelineError::Stream(err.to_string()))?;

        if let Err(err) = self.device.set_params(&Parameters::with_fps(fps)) {
            warn!(%err, fps, "frame rate request not honored");
        }

        Ok(CaptureFormat {
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
            fourcc: FourCC::from(fmt.fourcc),
        })
    }

    /// Start a mmap capture stream with the given number of buffers.
    pub fn stream(&mut self, buffer_count: u32) -> Result<V4l2Source<'_>> {
        let fmt = self
            .device
            .format()
            .map_err(|err| PipelineError::Stream(err.to_string()))?;
        let format = CaptureFormat {
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
            fourcc: FourCC::from(fmt.fourcc),
        };

        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(|err| PipelineError::Stream(err.to_string()))?;

        Ok(V4l2Source { stream, format })
    }
}

/// Blocking frame source over a mmap V4L2 capture stream.
pub struct V4l2Source<'a> {
    stream: Stream<'a>,
    format: CaptureFormat,
}

impl FrameSource for V4l2Source<'_> {
    fn next_frame(&mut self) -> Result<BgrFrame> {
        let (buf, meta) = self.stream.next().map_err(|err| match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                PipelineError::FrameUnavailable
            }
            _ => PipelineError::Stream(err.to_string()),
        })?;

        if meta.bytesused == 0 {
            return Err(PipelineError::FrameUnavailable);
        }

        to_bgr(buf, &self.format)
    }
}

/// Convert one raw capture buffer into a tightly packed BGR frame.
fn to_bgr(buf: &[u8], format: &CaptureFormat) -> Result<BgrFrame> {
    match format.fourcc {
        FourCC::YUYV => yuyv_to_bgr(buf, format),
        FourCC::BGR3 => packed24_to_bgr(buf, format, false),
        FourCC::RGB3 => packed24_to_bgr(buf, format, true),
        other => Err(PipelineError::UnsupportedPixelFormat(other)),
    }
}

fn yuyv_to_bgr(buf: &[u8], format: &CaptureFormat) -> Result<BgrFrame> {
    let width = format.width as usize;
    let height = format.height as usize;
    let stride = if format.stride == 0 {
        width * 2
    } else {
        format.stride as usize
    };
    if buf.len() < stride * height {
        // Truncated capture; treat like a dropped frame.
        return Err(PipelineError::FrameUnavailable);
    }

    let mut data = Vec::with_capacity(width * height * BGR_CHANNELS);
    for row in buf.chunks_exact(stride).take(height) {
        // YUYV: [Y0 U Y1 V] repeats, each pair of pixels sharing U and V.
        let mut emitted = 0;
        for quad in row.chunks_exact(4) {
            if emitted >= width {
                break;
            }
            let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
            let (r, g, b) = yuv_to_rgb(y0, u, v);
            data.extend_from_slice(&[b, g, r]);
            emitted += 1;
            if emitted < width {
                let (r, g, b) = yuv_to_rgb(y1, u, v);
                data.extend_from_slice(&[b, g, r]);
                emitted += 1;
            }
        }
    }

    BgrFrame::from_data(format.width, format.height, data)
        .ok_or_else(|| PipelineError::Stream("YUYV conversion size mismatch".to_owned()))
}

fn packed24_to_bgr(buf: &[u8], format: &CaptureFormat, swap_rb: bool) -> Result<BgrFrame> {
    let width = format.width as usize;
    let height = format.height as usize;
    let stride = if format.stride == 0 {
        width * BGR_CHANNELS
    } else {
        format.stride as usize
    };
    if buf.len() < stride * height {
        return Err(PipelineError::FrameUnavailable);
    }

    let mut data = Vec::with_capacity(width * height * BGR_CHANNELS);
    for row in buf.chunks_exact(stride).take(height) {
        for px in row.chunks_exact(BGR_CHANNELS).take(width) {
            if swap_rb {
                data.extend_from_slice(&[px[2], px[1], px[0]]);
            } else {
                data.extend_from_slice(&[px[0], px[1], px[2]]);
            }
        }
    }

    BgrFrame::from_data(format.width, format.height, data)
        .ok_or_else(|| PipelineError::Stream("24-bit conversion size mismatch".to_owned()))
}

/// Convert YUV values to RGB using the ITU-R BT.601 formula, clamped to
/// 0-255.
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    let clamp = |val: f32| -> u8 {
        if val < 0.0 {
            0
        } else if val > 255.0 {
            255
        } else {
            #[allow(clippy::cast_possible_truncation)]
            #[allow(clippy::cast_sign_loss)]
            {
                val as u8
            }
        }
    };

    (clamp(r), clamp(g), clamp(b))
}

//! Image buffer types and the geometric operations the render loop needs.

/// Interleaved channels per pixel in a [`BgrFrame`].
pub const BGR_CHANNELS: usize = 3;

/// A captured video frame: 3 interleaved 8-bit channels in blue-green-red
/// order, row-major, tightly packed (stride == width * 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl BgrFrame {
    /// Create a zeroed (black) frame.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BGR_CHANNELS],
        }
    }

    /// Wrap existing pixel bytes. Returns `None` when the buffer length does
    /// not match the dimensions.
    #[must_use]
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * BGR_CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Get the (b, g, r) values of the pixel at the given coordinates.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
        let b = *self.data.get(offset)?;
        let g = *self.data.get(offset + 1)?;
        let r = *self.data.get(offset + 2)?;
        Some((b, g, r))
    }

    /// Set the (b, g, r) values of the pixel at the given coordinates.
    /// Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: (u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
        if let Some(px) = self.data.get_mut(offset..offset + BGR_CHANNELS) {
            px.copy_from_slice(&[bgr.0, bgr.1, bgr.2]);
        }
    }

    /// One row of pixel bytes.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * BGR_CHANNELS;
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// Copy out the `width` x `height` sub-rectangle whose top-left corner is
    /// at (`x`, `y`). Returns `None` when the rectangle does not fit inside
    /// the frame.
    #[must_use]
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if x.checked_add(width)? > self.width || y.checked_add(height)? > self.height {
            return None;
        }
        let src_stride = self.width as usize * BGR_CHANNELS;
        let row_bytes = width as usize * BGR_CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = (y as usize + row) * src_stride + x as usize * BGR_CHANNELS;
            data.extend_from_slice(self.data.get(start..start + row_bytes)?);
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Swap rows and columns, producing a `height` x `width` frame.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(px) = self.pixel(x, y) {
                    out.set_pixel(y, x, px);
                }
            }
        }
        out
    }

    /// Mirror the frame around its vertical axis, in place.
    pub fn flip_horizontal(&mut self) {
        if self.width == 0 {
            return;
        }
        let stride = self.width as usize * BGR_CHANNELS;
        for row in self.data.chunks_exact_mut(stride) {
            let mut left = 0;
            let mut right = self.width as usize - 1;
            while left < right {
                for channel in 0..BGR_CHANNELS {
                    row.swap(left * BGR_CHANNELS + channel, right * BGR_CHANNELS + channel);
                }
                left += 1;
                right -= 1;
            }
        }
    }

    /// Compute the single-channel luminance view (ITU-R BT.601 weights).
    #[must_use]
    pub fn to_luma(&self) -> GrayFrame {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize);
        for px in self.data.chunks_exact(BGR_CHANNELS) {
            let (b, g, r) = (px[0], px[1], px[2]);
            let luma = 0.114f32.mul_add(
                f32::from(b),
                0.587f32.mul_add(f32::from(g), 0.299 * f32::from(r)),
            );
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            data.push(luma.round().clamp(0.0, 255.0) as u8);
        }
        GrayFrame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// A single-channel 8-bit image, row-major.
///
/// Binarized frames reuse this type with values restricted to {0, 255}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Raw pixel bytes, `width * height` long.
    pub data: Vec<u8>,
}

impl GrayFrame {
    /// Create a zeroed (black) image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap existing pixel bytes. Returns `None` when the buffer length does
    /// not match the dimensions.
    #[must_use]
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Value of the pixel at the given coordinates.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Set the pixel at the given coordinates. Out-of-bounds coordinates are
    /// ignored.
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        if let Some(px) = self
            .data
            .get_mut(y as usize * self.width as usize + x as usize)
        {
            *px = value;
        }
    }
}

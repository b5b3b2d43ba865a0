//! Linux framebuffer device implementation using the linuxfb crate.

use std::path::Path;

use crate::traits::{FbGeometry, LinearFramebuffer, PipelineError, Result};

/// A memory-mapped `/dev/fb*` device.
///
/// The device is opened and mapped once at startup and the handle is reused
/// for every frame; dropping the handle unmaps and closes the device on every
/// exit path. The device is assumed single-writer; no synchronization with
/// other framebuffer writers is provided.
pub struct LinuxFramebuffer {
    // Kept open for the lifetime of the mapping.
    _device: linuxfb::Framebuffer,
    map: memmap::MmapMut,
    geometry: FbGeometry,
}

impl LinuxFramebuffer {
    /// Open and map a framebuffer device, querying its geometry once.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let device = linuxfb::Framebuffer::new(path)
            .map_err(|err| PipelineError::DeviceUnavailable(format!("{err:?}")))?;

        let (virtual_width, _) = device.get_virtual_size();
        // linuxfb only exposes whole bytes per pixel, so packed depths such
        // as 15 bpp are reported at their storage size. Both depths this
        // crate renders to (16 and 32) survive the round trip exactly.
        let geometry = FbGeometry {
            virtual_width,
            bits_per_pixel: device.get_bytes_per_pixel() * 8,
        };

        let map = device
            .map()
            .map_err(|err| PipelineError::QueryFailed(format!("{err:?}")))?;

        Ok(Self {
            _device: device,
            map,
            geometry,
        })
    }
}

impl LinearFramebuffer for LinuxFramebuffer {
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
            self.map
                .get_mut(offset..end)
                .ok_or(PipelineError::ScanlineOutOfBounds {
                    offset,
                    len: pixels.len(),
                })?;
        destination.copy_from_slice(pixels);
        Ok(())
    }
}

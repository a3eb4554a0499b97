//! Security limits for parsing and decoding.
//!
//! Adversarial files can declare absurd tile counts, unit counts or plane
//! sizes. [`SecurityLimits`] caps them before any allocation happens.
//! All fields are optional; `None` means no limit for that resource.

use crate::errors::UncError;

/// Caps on resource usage during parse, decode and plane allocation.
///
/// [`SecurityLimits::default()`] returns the documented defaults;
/// [`SecurityLimits::disabled()`] lifts every cap (intended for tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityLimits {
    /// Maximum total box size in bytes. Default 1 GiB.
    pub max_box_size_bytes: Option<u64>,
    /// Maximum number of `icef` compressed units. Default 2^20.
    pub max_icef_units: Option<u32>,
    /// Maximum image size in pixels (also caps the tile grid,
    /// since a tile is at least one pixel). Default 2^30.
    pub max_image_size_pixels: Option<u64>,
    /// Maximum total plane/tile memory in bytes. Default 4 GiB.
    pub max_image_size_bytes: Option<u64>,
    /// Maximum number of components per pixel. Default 256.
    pub max_components: Option<u32>,
    /// Maximum number of entries in a sensor bad-pixels list. Default 2^20.
    pub max_bad_pixels: Option<u32>,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_box_size_bytes: Some(1 << 30),
            max_icef_units: Some(1 << 20),
            max_image_size_pixels: Some(1 << 30),
            max_image_size_bytes: Some(4 << 30),
            max_components: Some(256),
            max_bad_pixels: Some(1 << 20),
        }
    }
}

impl SecurityLimits {
    /// All caps lifted. For tests and trusted input only.
    pub fn disabled() -> Self {
        Self {
            max_box_size_bytes: None,
            max_icef_units: None,
            max_image_size_pixels: None,
            max_image_size_bytes: None,
            max_components: None,
            max_bad_pixels: None,
        }
    }

    pub fn check_box_size(&self, size: u64) -> Result<(), UncError> {
        if let Some(max) = self.max_box_size_bytes {
            if size > max {
                return Err(UncError::InvalidParameterValue(format!(
                    "box size {size} exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_icef_units(&self, units: u32) -> Result<(), UncError> {
        if let Some(max) = self.max_icef_units {
            if units > max {
                return Err(UncError::InvalidParameterValue(format!(
                    "number of compressed units {units} exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    /// The tile grid cannot exceed the pixel cap: every tile holds at
    /// least one pixel.
    pub fn check_tile_count(&self, cols: u32, rows: u32) -> Result<(), UncError> {
        if let Some(max) = self.max_image_size_pixels {
            let tiles = cols as u64 * rows as u64;
            if tiles > max {
                return Err(UncError::InvalidParameterValue(format!(
                    "tile count {tiles} exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_pixel_count(&self, pixels: u64) -> Result<(), UncError> {
        if let Some(max) = self.max_image_size_pixels {
            if pixels > max {
                return Err(UncError::MemoryAllocation(format!(
                    "pixel count {pixels} exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_allocation(&self, bytes: u64) -> Result<(), UncError> {
        if let Some(max) = self.max_image_size_bytes {
            if bytes > max {
                return Err(UncError::MemoryAllocation(format!(
                    "allocation of {bytes} bytes exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_components(&self, components: u32) -> Result<(), UncError> {
        if let Some(max) = self.max_components {
            if components > max {
                return Err(UncError::InvalidParameterValue(format!(
                    "component count {components} exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn check_bad_pixels(&self, entries: u32) -> Result<(), UncError> {
        if let Some(max) = self.max_bad_pixels {
            if entries > max {
                return Err(UncError::InvalidParameterValue(format!(
                    "bad pixel list with {entries} entries exceeds limit {max}"
                )));
            }
        }
        Ok(())
    }
}

//! Resource caps applied while decoding untrusted containers.

use crate::error::{Error, Result};

/// Configuration for decode limits.
///
/// All limits are optional; `None` means unlimited.
///
/// # Example
///
/// ```rust
/// use webpanim::Limits;
///
/// let limits = Limits::default()
///     .max_dimensions(4096, 4096)
///     .max_memory(256 * 1024 * 1024);
///
/// // Trusted inputs only.
/// let unlimited = Limits::none();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Limits {
    /// Maximum canvas width in pixels.
    pub max_width: Option<u32>,

    /// Maximum canvas height in pixels.
    pub max_height: Option<u32>,

    /// Maximum canvas pixels (width * height).
    pub max_total_pixels: Option<u64>,

    /// Maximum number of frames.
    pub max_frame_count: Option<u64>,

    /// Maximum input size in bytes.
    pub max_file_size: Option<u64>,

    /// Maximum bytes of decoded RGBA output held at once.
    pub max_memory: Option<u64>,
}

impl Default for Limits {
    /// - Max dimensions: 16384 x 16384
    /// - Max total pixels: 100 megapixels
    /// - Max frames: 10,000
    /// - Max file size: 100 MB
    /// - Max memory: 1 GB
    fn default() -> Self {
        Self {
            max_width: Some(16384),
            max_height: Some(16384),
            max_total_pixels: Some(100_000_000),
            max_frame_count: Some(10_000),
            max_file_size: Some(100 * 1024 * 1024),
            max_memory: Some(1024 * 1024 * 1024),
        }
    }
}

impl Limits {
    /// Create limits with no restrictions.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_total_pixels: None,
            max_frame_count: None,
            max_file_size: None,
            max_memory: None,
        }
    }

    /// Set maximum dimensions.
    #[must_use]
    pub fn max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_width = Some(width);
        self.max_height = Some(height);
        self
    }

    /// Set maximum total pixels.
    #[must_use]
    pub fn max_total_pixels(mut self, pixels: u64) -> Self {
        self.max_total_pixels = Some(pixels);
        self
    }

    /// Set maximum frame count.
    #[must_use]
    pub fn max_frame_count(mut self, count: u64) -> Self {
        self.max_frame_count = Some(count);
        self
    }

    /// Set maximum file size in bytes.
    #[must_use]
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Set maximum decoded output in bytes.
    #[must_use]
    pub fn max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Check canvas dimensions.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if let Some(max_w) = self.max_width {
            if width > max_w {
                return Err(Error::LimitExceeded(format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }

        if let Some(max_h) = self.max_height {
            if height > max_h {
                return Err(Error::LimitExceeded(format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }

        let total_pixels = u64::from(width) * u64::from(height);
        if let Some(max_pixels) = self.max_total_pixels {
            if total_pixels > max_pixels {
                return Err(Error::LimitExceeded(format!(
                    "total pixels {total_pixels} exceeds limit {max_pixels}"
                )));
            }
        }

        Ok(())
    }

    /// Check the number of frames.
    pub fn check_frame_count(&self, count: u64) -> Result<()> {
        match self.max_frame_count {
            Some(max) if count > max => Err(Error::LimitExceeded(format!(
                "frame count {count} exceeds limit {max}"
            ))),
            _ => Ok(()),
        }
    }

    /// Check the input size.
    pub fn check_file_size(&self, size: u64) -> Result<()> {
        match self.max_file_size {
            Some(max) if size > max => Err(Error::LimitExceeded(format!(
                "file size {size} bytes exceeds limit {max} bytes"
            ))),
            _ => Ok(()),
        }
    }

    /// Check decoded output size.
    pub fn check_memory(&self, bytes: u64) -> Result<()> {
        match self.max_memory {
            Some(max) if bytes > max => Err(Error::LimitExceeded(format!(
                "decoded output {bytes} bytes exceeds limit {max} bytes"
            ))),
            _ => Ok(()),
        }
    }
}

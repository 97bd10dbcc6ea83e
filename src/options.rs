//! Encoding options and per-call overrides.
//!
//! [`EncodingOptions`] is an immutable value: setters consume and return
//! `self`, and [`EncodingOptions::merge`] produces a new value from a set of
//! [`OptionOverrides`] without touching the receiver.
//!
//! ```rust
//! use webpanim::{EncodingOptions, OptionOverrides};
//!
//! let defaults = EncodingOptions::new().lossless(false).quality(75.0);
//! let one_off = defaults.merge(&OptionOverrides::new().quality(50.0))?;
//! assert_eq!(defaults.quality, 75);
//! assert_eq!(one_off.quality, 50);
//! # Ok::<(), webpanim::Error>(())
//! ```

use crate::codec::CompressParams;
use crate::error::{Error, Result};

/// Highest compression method accepted by the pixel codec.
pub const MAX_METHOD: u8 = 6;

/// Highest loop count the `ANIM` chunk can store.
pub const MAX_LOOP_COUNT: u32 = u16::MAX as u32;

/// Options controlling how frames are compressed and the container is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingOptions {
    /// Use reversible (VP8L) compression instead of lossy VP8.
    pub lossless: bool,
    /// Quality 0-100. For lossy frames, 0 is smallest and 100 is best; for
    /// lossless frames it trades encode effort against size.
    pub quality: u8,
    /// Speed/ratio trade-off, 0 (fastest) to 6 (best compression).
    pub method: u8,
    /// Number of times the animation plays. 0 loops forever.
    pub loop_count: u32,
    /// Canvas background colour in BGRA byte order, as stored in `ANIM`.
    pub background_color: [u8; 4],
    /// Encode only the changed rectangle of frames after the first.
    pub minimize_size: bool,
}

impl Default for EncodingOptions {
    /// Lossless, quality 1, method 4, loop forever, transparent background,
    /// sub-frame optimisation on.
    fn default() -> Self {
        Self {
            lossless: true,
            quality: 1,
            method: 4,
            loop_count: 0,
            background_color: [0, 0, 0, 0],
            minimize_size: true,
        }
    }
}

impl EncodingOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select lossless or lossy compression.
    #[must_use]
    pub fn lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }

    /// Set quality, clamped to 0-100 and rounded to the nearest integer.
    #[must_use]
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    /// Set method, clamped to 0-6.
    #[must_use]
    pub fn method(mut self, method: u8) -> Self {
        self.method = method.min(MAX_METHOD);
        self
    }

    /// Set the loop count (0 = forever). Checked by [`validate`](Self::validate).
    #[must_use]
    pub fn loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Set the background colour hint (BGRA).
    #[must_use]
    pub fn background_color(mut self, bgra: [u8; 4]) -> Self {
        self.background_color = bgra;
        self
    }

    /// Enable or disable sub-frame optimisation.
    #[must_use]
    pub fn minimize_size(mut self, minimize: bool) -> Self {
        self.minimize_size = minimize;
        self
    }

    /// Check that every field can be represented in the container.
    pub fn validate(&self) -> Result<()> {
        if self.loop_count > MAX_LOOP_COUNT {
            return Err(Error::Config(format!(
                "loop count {} exceeds {}",
                self.loop_count, MAX_LOOP_COUNT
            )));
        }
        Ok(())
    }

    /// Apply per-call overrides, returning a new validated value.
    pub fn merge(&self, overrides: &OptionOverrides) -> Result<Self> {
        let merged = Self {
            lossless: overrides.lossless.unwrap_or(self.lossless),
            quality: overrides.quality.map_or(self.quality, clamp_quality),
            method: overrides.method.map_or(self.method, |m| m.min(MAX_METHOD)),
            loop_count: overrides.loop_count.unwrap_or(self.loop_count),
            background_color: overrides.background_color.unwrap_or(self.background_color),
            minimize_size: overrides.minimize_size.unwrap_or(self.minimize_size),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Parameters handed to the pixel codec for each frame.
    pub(crate) fn compress_params(&self) -> CompressParams {
        CompressParams {
            lossless: self.lossless,
            quality: self.quality.min(100),
            method: self.method.min(MAX_METHOD),
        }
    }
}

/// Per-call overrides for [`EncodingOptions`]. Unset fields keep the
/// encoder's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptionOverrides {
    /// Override [`EncodingOptions::lossless`].
    pub lossless: Option<bool>,
    /// Override [`EncodingOptions::quality`] (clamped on merge).
    pub quality: Option<f32>,
    /// Override [`EncodingOptions::method`] (clamped on merge).
    pub method: Option<u8>,
    /// Override [`EncodingOptions::loop_count`].
    pub loop_count: Option<u32>,
    /// Override [`EncodingOptions::background_color`].
    pub background_color: Option<[u8; 4]>,
    /// Override [`EncodingOptions::minimize_size`].
    pub minimize_size: Option<bool>,
}

impl OptionOverrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override lossless mode.
    #[must_use]
    pub fn lossless(mut self, lossless: bool) -> Self {
        self.lossless = Some(lossless);
        self
    }

    /// Override quality.
    #[must_use]
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Override method.
    #[must_use]
    pub fn method(mut self, method: u8) -> Self {
        self.method = Some(method);
        self
    }

    /// Override loop count.
    #[must_use]
    pub fn loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = Some(loop_count);
        self
    }

    /// Override the background colour (BGRA).
    #[must_use]
    pub fn background_color(mut self, bgra: [u8; 4]) -> Self {
        self.background_color = Some(bgra);
        self
    }

    /// Override sub-frame optimisation.
    #[must_use]
    pub fn minimize_size(mut self, minimize: bool) -> Self {
        self.minimize_size = Some(minimize);
        self
    }
}

fn clamp_quality(quality: f32) -> u8 {
    if quality.is_nan() {
        return 0;
    }
    quality.clamp(0.0, 100.0).round() as u8
}

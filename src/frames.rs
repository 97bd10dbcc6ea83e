//! Frame accumulation prior to encoding.
//!
//! Frames added without an explicit duration do not store one. Their
//! duration is resolved from the frame rate in effect when the buffer is
//! read, so [`FrameBuffer::set_frame_rate`] applies retroactively to every
//! such frame, including those added before the call.

use crate::error::{Error, Result};

/// Largest canvas side the VP8X chunk can describe.
pub const MAX_DIMENSION: u32 = 16384;

/// Largest duration the 24-bit ANMF duration field can hold.
pub const MAX_DURATION_MS: u32 = 0xFF_FFFF;

/// Frame rate used until [`FrameBuffer::set_frame_rate`] is called.
pub const DEFAULT_FRAME_RATE: u16 = 30;

/// A buffered RGBA frame.
#[derive(Debug, Clone)]
pub(crate) struct BufferedFrame {
    pub(crate) pixels: Vec<u8>,
    pub(crate) duration_ms: Option<u32>,
}

/// Validated store of RGBA frames for one output file.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    frame_rate: u16,
    frames: Vec<BufferedFrame>,
}

impl FrameBuffer {
    /// Create an empty buffer for a `width` x `height` canvas.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            frame_rate: DEFAULT_FRAME_RATE,
            frames: Vec::new(),
        })
    }

    /// Canvas dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Required length of every frame buffer.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Current frame rate in frames per second.
    pub fn frame_rate(&self) -> u16 {
        self.frame_rate
    }

    /// Set the frame rate used for frames without an explicit duration.
    pub fn set_frame_rate(&mut self, fps: u16) -> Result<()> {
        if fps == 0 {
            return Err(Error::Config("frame rate must be at least 1".into()));
        }
        self.frame_rate = fps;
        Ok(())
    }

    /// Duration applied to frames without an explicit one: `floor(1000 / fps)`.
    pub fn default_duration_ms(&self) -> u32 {
        1000 / u32::from(self.frame_rate)
    }

    /// Append a frame. `pixels` must be exactly `width * height * 4` bytes.
    pub fn push(&mut self, pixels: Vec<u8>, duration_ms: Option<u32>) -> Result<()> {
        let expected = self.frame_len();
        if pixels.len() != expected {
            return Err(Error::FrameShape {
                expected,
                actual: pixels.len(),
            });
        }
        if let Some(d) = duration_ms {
            check_duration(d)?;
        }
        self.frames.push(BufferedFrame { pixels, duration_ms });
        Ok(())
    }

    /// Drop all buffered frames, keeping dimensions and frame rate.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Change the canvas size. Only allowed while the buffer is empty, since
    /// buffered frames were validated against the old size.
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> Result<()> {
        check_dimensions(width, height)?;
        if !self.frames.is_empty() && (width, height) != (self.width, self.height) {
            return Err(Error::Config(format!(
                "cannot resize to {width}x{height} with {} frames buffered",
                self.frames.len()
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Resolved per-frame durations in add order.
    ///
    /// `last_frame_duration_ms`, when given, replaces the final frame's
    /// duration.
    pub fn durations(&self, last_frame_duration_ms: Option<u32>) -> Result<Vec<u32>> {
        let fallback = self.default_duration_ms();
        let mut durations: Vec<u32> = self
            .frames
            .iter()
            .map(|f| f.duration_ms.unwrap_or(fallback))
            .collect();
        if let (Some(last), Some(d)) = (durations.last_mut(), last_frame_duration_ms) {
            check_duration(d)?;
            *last = d;
        }
        Ok(durations)
    }

    pub(crate) fn frames(&self) -> &[BufferedFrame] {
        &self.frames
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::Config(format!(
            "canvas {width}x{height} outside 1..={MAX_DIMENSION}"
        )));
    }
    Ok(())
}

fn check_duration(duration_ms: u32) -> Result<()> {
    if duration_ms > MAX_DURATION_MS {
        return Err(Error::Config(format!(
            "frame duration {duration_ms}ms exceeds {MAX_DURATION_MS}ms"
        )));
    }
    Ok(())
}

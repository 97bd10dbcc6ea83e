//! Animated WebP decoding.
//!
//! [`AnimationDecoder`] walks the frames of a container, decompresses each
//! one through a [`PixelCodec`] and composites it onto a full-size RGBA
//! canvas. [`decode_webp`] collects every composited frame at once.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpanim::AnimationDecoder;
//!
//! let webp_data: &[u8] = &[]; // your animated WebP data
//! let decoder = AnimationDecoder::new(webp_data)?;
//! let info = decoder.info();
//! println!("{}x{}, {} frames", info.canvas_width, info.canvas_height, info.frame_count);
//!
//! for frame in decoder {
//!     let frame = frame?;
//!     println!("frame ends at {}ms, duration {}ms", frame.timestamp_ms, frame.duration_ms);
//! }
//! # Ok::<(), webpanim::Error>(())
//! ```

use log::debug;

use crate::codec::{LibwebpCodec, PixelCodec};
use crate::error::Result;
use crate::limits::Limits;
use crate::mux::{BlendMethod, DemuxFrame, DisposeMethod, WebPDemuxer};

/// A composited animation frame with owned RGBA pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// RGBA pixel data (canvas_width * canvas_height * 4 bytes).
    pub data: Vec<u8>,
    /// Time at which this frame stops being shown: the sum of the durations
    /// of this frame and every frame before it.
    pub timestamp_ms: u64,
    /// Display duration of this frame in milliseconds.
    pub duration_ms: u32,
}

/// A fully decoded animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAnimation {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Number of times to play the animation (0 = forever).
    pub loop_count: u32,
    /// Background colour hint (BGRA byte order).
    pub background_color: [u8; 4],
    /// Composited frames in display order.
    pub frames: Vec<DecodedFrame>,
}

/// Metadata about an animated WebP image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationInfo {
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    /// Total number of frames.
    pub frame_count: u32,
    /// Loop count for the animation (0 = forever).
    pub loop_count: u32,
    /// Background colour hint (BGRA byte order).
    pub background_color: [u8; 4],
    /// Whether the header declares alpha.
    pub has_alpha: bool,
    /// Sum of all frame durations.
    pub total_duration_ms: u64,
}

/// Frame-by-frame animated WebP decoder.
///
/// Yields owned RGBA snapshots of the composited canvas. The canvas starts
/// fully transparent; a frame with [`DisposeMethod::Background`] has its
/// rectangle cleared to transparent before the next frame is drawn.
pub struct AnimationDecoder<'a> {
    demuxer: WebPDemuxer<'a>,
    codec: &'a dyn PixelCodec,
    canvas: Vec<u8>,
    /// Rectangle to clear before drawing the next frame.
    pending_dispose: Option<(u32, u32, u32, u32)>,
    cumulative_ms: u64,
    frames_read: u32,
}

impl<'a> AnimationDecoder<'a> {
    /// Create a decoder over `data` using libwebp and default [`Limits`].
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Self::with_codec(data, &LibwebpCodec, &Limits::default())
    }

    /// Create a decoder with an explicit codec and limits.
    pub fn with_codec(data: &'a [u8], codec: &'a dyn PixelCodec, limits: &Limits) -> Result<Self> {
        limits.check_file_size(data.len() as u64)?;
        let demuxer = WebPDemuxer::new(data)?;
        let (w, h) = (demuxer.canvas_width(), demuxer.canvas_height());
        limits.check_dimensions(w, h)?;
        limits.check_frame_count(u64::from(demuxer.num_frames()))?;

        let canvas_len = w as usize * h as usize * 4;
        limits.check_memory(canvas_len as u64)?;
        Ok(Self {
            demuxer,
            codec,
            canvas: vec![0; canvas_len],
            pending_dispose: None,
            cumulative_ms: 0,
            frames_read: 0,
        })
    }

    /// Get metadata about the animation.
    pub fn info(&self) -> AnimationInfo {
        AnimationInfo {
            canvas_width: self.demuxer.canvas_width(),
            canvas_height: self.demuxer.canvas_height(),
            frame_count: self.demuxer.num_frames(),
            loop_count: self.demuxer.loop_count(),
            background_color: self.demuxer.background_color(),
            has_alpha: self.demuxer.has_alpha(),
            total_duration_ms: self.demuxer.total_duration_ms(),
        }
    }

    /// Returns `true` if there are more frames to decode.
    pub fn has_more_frames(&self) -> bool {
        self.frames_read < self.demuxer.num_frames()
    }

    /// Returns the number of frames decoded so far.
    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }

    /// Decode the next frame, returning `None` when all frames have been read.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        let Some(frame) = self.demuxer.frame(self.frames_read + 1) else {
            return Ok(None);
        };

        if let Some((x, y, w, h)) = self.pending_dispose.take() {
            fill_rect(&mut self.canvas, self.demuxer.canvas_width(), x, y, w, h);
        }

        let pixels = self
            .codec
            .decompress(frame.payload(), frame.width, frame.height)?;
        composite(&mut self.canvas, self.demuxer.canvas_width(), frame, &pixels);
        if frame.dispose == DisposeMethod::Background {
            self.pending_dispose = Some((frame.x_offset, frame.y_offset, frame.width, frame.height));
        }

        self.cumulative_ms += u64::from(frame.duration_ms);
        self.frames_read += 1;
        debug!(
            "decoded frame {}: {}x{} at ({}, {}), ends at {}ms",
            frame.frame_num,
            frame.width,
            frame.height,
            frame.x_offset,
            frame.y_offset,
            self.cumulative_ms
        );

        Ok(Some(DecodedFrame {
            data: self.canvas.clone(),
            timestamp_ms: self.cumulative_ms,
            duration_ms: frame.duration_ms,
        }))
    }

    /// Decode all remaining frames into a [`DecodedAnimation`].
    pub fn decode_all(mut self) -> Result<DecodedAnimation> {
        let mut frames = Vec::with_capacity(self.demuxer.num_frames() as usize);
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(DecodedAnimation {
            width: self.demuxer.canvas_width(),
            height: self.demuxer.canvas_height(),
            loop_count: self.demuxer.loop_count(),
            background_color: self.demuxer.background_color(),
            frames,
        })
    }
}

impl Iterator for AnimationDecoder<'_> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Decode every frame of a WebP file with libwebp and default [`Limits`].
pub fn decode_webp(data: &[u8]) -> Result<DecodedAnimation> {
    decode_webp_with_limits(data, &Limits::default())
}

/// Decode every frame of a WebP file under the given limits.
///
/// The memory limit covers all composited frames held in the result.
pub fn decode_webp_with_limits(data: &[u8], limits: &Limits) -> Result<DecodedAnimation> {
    let decoder = AnimationDecoder::with_codec(data, &LibwebpCodec, limits)?;
    let info = decoder.info();
    let frame_bytes = u64::from(info.canvas_width) * u64::from(info.canvas_height) * 4;
    limits.check_memory(frame_bytes.saturating_mul(u64::from(info.frame_count)))?;
    decoder.decode_all()
}

fn fill_rect(canvas: &mut [u8], canvas_width: u32, x: u32, y: u32, w: u32, h: u32) {
    let stride = canvas_width as usize * 4;
    for row in canvas.chunks_exact_mut(stride).skip(y as usize).take(h as usize) {
        let start = x as usize * 4;
        row[start..start + w as usize * 4].fill(0);
    }
}

/// Draw a decoded sub-frame onto the canvas at its offset.
fn composite(canvas: &mut [u8], canvas_width: u32, frame: &DemuxFrame<'_>, pixels: &[u8]) {
    let stride = canvas_width as usize * 4;
    let row_len = frame.width as usize * 4;
    let start = frame.x_offset as usize * 4;
    let rows = canvas
        .chunks_exact_mut(stride)
        .skip(frame.y_offset as usize)
        .zip(pixels.chunks_exact(row_len));
    for (canvas_row, src_row) in rows {
        let dst_row = &mut canvas_row[start..start + row_len];
        match frame.blend {
            BlendMethod::Overwrite => dst_row.copy_from_slice(src_row),
            BlendMethod::AlphaBlend => {
                for (dst, src) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                    blend_pixel_non_premult(dst, src);
                }
            }
        }
    }
}

/// Non-premultiplied "src over dst" as used by WebP animation.
fn blend_pixel_non_premult(dst: &mut [u8], src: &[u8]) {
    let src_a = u32::from(src[3]);
    if src_a == 0 {
        return;
    }
    if src_a == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let dst_factor_a = (u32::from(dst[3]) * (256 - src_a)) >> 8;
    let blend_a = src_a + dst_factor_a;
    let scale = (1u32 << 24) / blend_a;
    for c in 0..3 {
        let blended = (u32::from(src[c]) * src_a + u32::from(dst[c]) * dst_factor_a) * scale;
        dst[c] = (blended >> 24) as u8;
    }
    dst[3] = blend_a as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_source_replaces_destination() {
        let mut dst = [10, 20, 30, 255];
        blend_pixel_non_premult(&mut dst, &[200, 100, 50, 255]);
        assert_eq!(dst, [200, 100, 50, 255]);
    }

    #[test]
    fn transparent_source_keeps_destination() {
        let mut dst = [10, 20, 30, 128];
        blend_pixel_non_premult(&mut dst, &[200, 100, 50, 0]);
        assert_eq!(dst, [10, 20, 30, 128]);
    }

    #[test]
    fn source_over_transparent_keeps_source() {
        let mut dst = [0, 0, 0, 0];
        blend_pixel_non_premult(&mut dst, &[200, 100, 50, 128]);
        assert_eq!(dst, [200, 100, 50, 128]);
    }

    #[test]
    fn half_alpha_over_opaque() {
        let mut dst = [0, 0, 0, 255];
        blend_pixel_non_premult(&mut dst, &[255, 255, 255, 128]);
        // dst_factor = 255 * 128 >> 8 = 127, blend_a = 255.
        assert_eq!(dst[3], 255);
        assert!((127..=129).contains(&dst[0]));
    }

    #[test]
    fn fill_rect_clears_only_the_rectangle() {
        let mut canvas = vec![9u8; 4 * 3 * 4];
        fill_rect(&mut canvas, 4, 2, 1, 2, 2);
        for (i, px) in canvas.chunks_exact(4).enumerate() {
            let (x, y) = (i % 4, i / 4);
            let inside = (2..4).contains(&x) && (1..3).contains(&y);
            assert_eq!(px, if inside { [0; 4] } else { [9; 4] }, "pixel ({x}, {y})");
        }
    }
}

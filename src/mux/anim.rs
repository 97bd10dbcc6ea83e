//! Animation encoder.
//!
//! Compresses full-canvas RGBA frames through a [`PixelCodec`] and assembles
//! them into an animated WebP container. With
//! [`EncodingOptions::minimize_size`] enabled, every frame after the first is
//! reduced to the rectangle that changed since the previous frame.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpanim::mux::AnimationEncoder;
//! use webpanim::{EncodingOptions, LibwebpCodec};
//!
//! let options = EncodingOptions::new().lossless(false).quality(75.0);
//! let mut anim = AnimationEncoder::new(320, 240, options, &LibwebpCodec)?;
//!
//! let pixels = vec![255u8; 320 * 240 * 4];
//! anim.add_frame(&pixels, 100)?;
//! anim.add_frame(&pixels, 100)?;
//!
//! let webp = anim.finalize()?;
//! # Ok::<(), webpanim::Error>(())
//! ```

use log::debug;

use super::assemble::{MuxFrame, WebPMux};
use super::demux::{BlendMethod, DisposeMethod};
use crate::codec::{CompressParams, CompressedFrame, PixelCodec};
use crate::error::{Error, Result};
use crate::frames::check_dimensions;
use crate::options::EncodingOptions;

/// Animated WebP encoder over a borrowed pixel codec.
pub struct AnimationEncoder<'c> {
    width: u32,
    height: u32,
    options: EncodingOptions,
    params: CompressParams,
    codec: &'c dyn PixelCodec,
    frames: Vec<MuxFrame>,
    /// Previous frame's RGBA canvas for delta compression.
    prev_canvas: Option<Vec<u8>>,
}

impl<'c> AnimationEncoder<'c> {
    /// Create a new animation encoder.
    ///
    /// The canvas dimensions must be between 1 and 16384 (inclusive).
    pub fn new(
        width: u32,
        height: u32,
        options: EncodingOptions,
        codec: &'c dyn PixelCodec,
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        options.validate()?;
        Ok(Self {
            width,
            height,
            params: options.compress_params(),
            options,
            codec,
            frames: Vec::new(),
            prev_canvas: None,
        })
    }

    /// Number of frames added so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Compress and append a full-canvas RGBA frame shown for `duration_ms`.
    pub fn add_frame(&mut self, rgba: &[u8], duration_ms: u32) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if rgba.len() != expected {
            return Err(Error::FrameShape {
                expected,
                actual: rgba.len(),
            });
        }

        let (x, y, w, h) = match (&self.prev_canvas, self.options.minimize_size) {
            (Some(prev), true) => {
                // Identical frames still need a chunk to carry their duration.
                find_diff_rect(prev, rgba, self.width, self.height).unwrap_or((0, 0, 1, 1))
            }
            _ => (0, 0, self.width, self.height),
        };

        let encoded = if (w, h) == (self.width, self.height) {
            self.codec.compress(rgba, w, h, &self.params)?
        } else {
            let sub = extract_sub_rect(rgba, self.width, x, y, w, h);
            self.codec.compress(&sub, w, h, &self.params)?
        };
        debug!(
            "frame {}: {}x{} at ({}, {}), {}ms, {} bytes",
            self.frames.len() + 1,
            w,
            h,
            x,
            y,
            duration_ms,
            encoded.bitstream.len()
        );

        let CompressedFrame {
            bitstream,
            alpha_data,
            is_lossless,
        } = encoded;
        self.frames.push(MuxFrame {
            x_offset: x,
            y_offset: y,
            width: w,
            height: h,
            duration_ms,
            dispose: DisposeMethod::None,
            blend: BlendMethod::Overwrite,
            bitstream,
            alpha_data,
            is_lossless,
        });

        if self.options.minimize_size {
            match &mut self.prev_canvas {
                Some(prev) => prev.copy_from_slice(rgba),
                None => self.prev_canvas = Some(rgba.to_vec()),
            }
        }
        Ok(())
    }

    /// Assemble the container.
    ///
    /// A single frame becomes a still image, which stores neither a loop
    /// count nor a duration.
    pub fn finalize(self) -> Result<Vec<u8>> {
        let mut mux = WebPMux::new(self.width, self.height);
        let mut frames = self.frames;
        match frames.len() {
            0 => return Err(Error::EmptyAnimation),
            1 => mux.set_image(frames.remove(0)),
            _ => {
                // `validate` bounds the loop count to the 16-bit field.
                mux.set_animation(
                    self.options.background_color,
                    self.options.loop_count as u16,
                );
                for frame in frames {
                    mux.push_frame(frame)?;
                }
            }
        }
        mux.assemble()
    }
}

/// Find the minimal bounding rectangle of pixels that differ between two
/// RGBA canvases. Returns `(x, y, w, h)` snapped to even coordinates, or
/// `None` if the frames are identical.
fn find_diff_rect(
    prev: &[u8],
    curr: &[u8],
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let w = width as usize;
    let mut min_x = w;
    let mut max_x = 0usize;
    let mut min_y = height as usize;
    let mut max_y = 0usize;

    for (y, (prev_row, curr_row)) in prev
        .chunks_exact(w * 4)
        .zip(curr.chunks_exact(w * 4))
        .enumerate()
    {
        if prev_row == curr_row {
            continue;
        }
        for (x, (p, c)) in prev_row
            .chunks_exact(4)
            .zip(curr_row.chunks_exact(4))
            .enumerate()
        {
            if p != c {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }

    if min_x > max_x {
        return None;
    }

    // Offsets are stored in 2-pixel units
    let x0 = (min_x as u32) & !1;
    let y0 = (min_y as u32) & !1;
    let x1 = (max_x as u32 + 1).min(width);
    let y1 = (max_y as u32 + 1).min(height);

    Some((x0, y0, x1 - x0, y1 - y0))
}

/// Copy a sub-rectangle out of an RGBA canvas.
fn extract_sub_rect(rgba: &[u8], canvas_width: u32, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
    let stride = canvas_width as usize * 4;
    let row_len = w as usize * 4;
    let mut out = Vec::with_capacity(row_len * h as usize);
    for row in rgba.chunks_exact(stride).skip(y as usize).take(h as usize) {
        let start = x as usize * 4;
        out.extend_from_slice(&row[start..start + row_len]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FramePayload;

    /// Stores raw pixels as the "bitstream" so tests can inspect exactly
    /// what the encoder handed over.
    struct RawCodec;

    impl PixelCodec for RawCodec {
        fn compress(
            &self,
            rgba: &[u8],
            _width: u32,
            _height: u32,
            params: &CompressParams,
        ) -> Result<CompressedFrame> {
            Ok(CompressedFrame {
                bitstream: rgba.to_vec(),
                alpha_data: None,
                is_lossless: params.lossless,
            })
        }

        fn decompress(&self, frame: FramePayload<'_>, _: u32, _: u32) -> Result<Vec<u8>> {
            Ok(frame.bitstream.to_vec())
        }
    }

    struct FailingCodec;

    impl PixelCodec for FailingCodec {
        fn compress(&self, _: &[u8], _: u32, _: u32, _: &CompressParams) -> Result<CompressedFrame> {
            Err(Error::Codec("out of memory".into()))
        }

        fn decompress(&self, _: FramePayload<'_>, _: u32, _: u32) -> Result<Vec<u8>> {
            Err(Error::Codec("out of memory".into()))
        }
    }

    fn canvas(width: u32, height: u32, fill: u8) -> Vec<u8> {
        vec![fill; (width * height * 4) as usize]
    }

    fn set_pixel(buf: &mut [u8], width: u32, x: u32, y: u32, value: u8) {
        let off = ((y * width + x) * 4) as usize;
        buf[off..off + 4].fill(value);
    }

    #[test]
    fn diff_rect_snaps_offsets_to_even() {
        let prev = canvas(10, 10, 0);
        let mut curr = prev.clone();
        set_pixel(&mut curr, 10, 3, 5, 9);
        set_pixel(&mut curr, 10, 6, 7, 9);
        assert_eq!(find_diff_rect(&prev, &curr, 10, 10), Some((2, 4, 5, 4)));
        assert_eq!(find_diff_rect(&prev, &prev, 10, 10), None);
    }

    #[test]
    fn sub_rect_extraction() {
        let mut buf = canvas(4, 3, 0);
        set_pixel(&mut buf, 4, 2, 1, 7);
        let sub = extract_sub_rect(&buf, 4, 2, 1, 2, 2);
        assert_eq!(sub.len(), 16);
        assert_eq!(&sub[..4], &[7; 4]);
        assert!(sub[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn delta_frames_only_encode_changes() {
        let options = EncodingOptions::new();
        let mut anim = AnimationEncoder::new(8, 8, options, &RawCodec).unwrap();
        let first = canvas(8, 8, 1);
        let mut second = first.clone();
        set_pixel(&mut second, 8, 5, 5, 2);
        anim.add_frame(&first, 10).unwrap();
        anim.add_frame(&second, 20).unwrap();
        anim.add_frame(&second, 30).unwrap();

        assert_eq!(anim.frames[0].bitstream.len(), 8 * 8 * 4);
        assert_eq!(
            (anim.frames[1].x_offset, anim.frames[1].y_offset),
            (4, 4)
        );
        assert_eq!((anim.frames[1].width, anim.frames[1].height), (2, 2));
        assert_eq!((anim.frames[2].width, anim.frames[2].height), (1, 1));
        assert_eq!(anim.frames[2].duration_ms, 30);
    }

    #[test]
    fn minimize_off_keeps_key_frames() {
        let options = EncodingOptions::new().minimize_size(false);
        let mut anim = AnimationEncoder::new(4, 4, options, &RawCodec).unwrap();
        anim.add_frame(&canvas(4, 4, 1), 10).unwrap();
        anim.add_frame(&canvas(4, 4, 1), 10).unwrap();
        assert!(anim
            .frames
            .iter()
            .all(|f| (f.x_offset, f.y_offset, f.width, f.height) == (0, 0, 4, 4)));
        assert!(anim.prev_canvas.is_none());
    }

    #[test]
    fn codec_failure_propagates() {
        let mut anim = AnimationEncoder::new(2, 2, EncodingOptions::new(), &FailingCodec).unwrap();
        assert!(matches!(
            anim.add_frame(&canvas(2, 2, 0), 10),
            Err(Error::Codec(_))
        ));
        assert_eq!(anim.frame_count(), 0);
        assert!(matches!(anim.finalize(), Err(Error::EmptyAnimation)));
    }

    #[test]
    fn wrong_shape_rejected() {
        let mut anim = AnimationEncoder::new(2, 2, EncodingOptions::new(), &RawCodec).unwrap();
        assert!(matches!(
            anim.add_frame(&[0; 15], 10),
            Err(Error::FrameShape {
                expected: 16,
                actual: 15
            })
        ));
    }
}

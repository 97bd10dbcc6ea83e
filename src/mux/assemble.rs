//! WebP container assembler.
//!
//! Assembles a valid WebP file from pre-compressed frame bitstreams.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpanim::mux::{WebPMux, MuxFrame, BlendMethod, DisposeMethod};
//!
//! let mut mux = WebPMux::new(320, 240);
//! mux.set_animation([0, 0, 0, 0], 0);
//!
//! mux.push_frame(MuxFrame {
//!     x_offset: 0,
//!     y_offset: 0,
//!     width: 320,
//!     height: 240,
//!     duration_ms: 100,
//!     dispose: DisposeMethod::None,
//!     blend: BlendMethod::Overwrite,
//!     bitstream: vec![], // VP8L data here
//!     alpha_data: None,
//!     is_lossless: true,
//! })?;
//!
//! let webp_bytes = mux.assemble()?;
//! # Ok::<(), webpanim::Error>(())
//! ```

use crate::codec::FramePayload;
use crate::error::{Error, Result};
use crate::frames::{MAX_DIMENSION, MAX_DURATION_MS};
use crate::vec_writer::{chunk_size, write_chunk, VecWriter};

use super::demux::{BlendMethod, DisposeMethod};

/// VP8X flag bits.
const ALPHA_FLAG: u8 = 1 << 4;
const ANIMATION_FLAG: u8 = 1 << 1;

/// Fixed part of an ANMF payload: five u24 fields and a flags byte.
const ANMF_HEADER_LEN: usize = 16;

/// A single frame to be muxed into a WebP container.
#[derive(Debug, Clone)]
pub struct MuxFrame {
    /// Horizontal offset on the canvas. Must be even.
    pub x_offset: u32,
    /// Vertical offset on the canvas. Must be even.
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame duration in milliseconds (max 16777215).
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Raw VP8 or VP8L bitstream data.
    pub bitstream: Vec<u8>,
    /// Raw ALPH chunk payload (for lossy frames with separate alpha).
    pub alpha_data: Option<Vec<u8>>,
    /// Whether the bitstream is VP8L (lossless). `false` means VP8 (lossy).
    pub is_lossless: bool,
}

impl MuxFrame {
    /// Borrow the compressed data of this frame.
    pub fn payload(&self) -> FramePayload<'_> {
        FramePayload {
            bitstream: &self.bitstream,
            alpha_data: self.alpha_data.as_deref(),
            is_lossless: self.is_lossless,
        }
    }
}

#[derive(Debug, Clone)]
struct AnimationParams {
    background_color: [u8; 4],
    loop_count: u16,
}

/// WebP container assembler.
///
/// Builds either a still image (no animation configured) or an animated
/// file with one `ANMF` chunk per pushed frame.
#[derive(Debug, Clone)]
pub struct WebPMux {
    canvas_width: u32,
    canvas_height: u32,
    animation: Option<AnimationParams>,
    frames: Vec<MuxFrame>,
    single_image: Option<MuxFrame>,
}

impl WebPMux {
    /// Create a new mux assembler with the given canvas dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            animation: None,
            frames: Vec::new(),
            single_image: None,
        }
    }

    /// Configure this mux for animation output.
    ///
    /// The `background_color` is in BGRA byte order; `loop_count` 0 loops
    /// forever.
    pub fn set_animation(&mut self, background_color: [u8; 4], loop_count: u16) {
        self.animation = Some(AnimationParams {
            background_color,
            loop_count,
        });
    }

    /// Add a frame to the animation.
    ///
    /// Frame offsets must be even, the frame must fit within the canvas and
    /// the duration must fit in 24 bits.
    pub fn push_frame(&mut self, frame: MuxFrame) -> Result<()> {
        if frame.x_offset % 2 != 0 || frame.y_offset % 2 != 0 {
            return Err(Error::Config(format!(
                "frame offset must be even: ({}, {})",
                frame.x_offset, frame.y_offset
            )));
        }
        if frame.width == 0
            || frame.height == 0
            || frame.width > MAX_DIMENSION
            || frame.height > MAX_DIMENSION
        {
            return Err(Error::Config(format!(
                "invalid frame dimensions: {}x{}",
                frame.width, frame.height
            )));
        }
        if frame.x_offset + frame.width > self.canvas_width
            || frame.y_offset + frame.height > self.canvas_height
        {
            return Err(Error::Config(format!(
                "frame at ({}, {}) size {}x{} exceeds canvas {}x{}",
                frame.x_offset,
                frame.y_offset,
                frame.width,
                frame.height,
                self.canvas_width,
                self.canvas_height
            )));
        }
        if frame.duration_ms > MAX_DURATION_MS {
            return Err(Error::Config(format!(
                "frame duration {}ms exceeds {MAX_DURATION_MS}ms",
                frame.duration_ms
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Set a single (non-animated) image.
    pub fn set_image(&mut self, frame: MuxFrame) {
        self.single_image = Some(frame);
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Assemble the final WebP file.
    pub fn assemble(&self) -> Result<Vec<u8>> {
        if self.animation.is_some() {
            self.assemble_animated()
        } else {
            let frame = self.single_image.as_ref().ok_or(Error::EmptyAnimation)?;
            Ok(assemble_still(
                self.canvas_width,
                self.canvas_height,
                frame.payload(),
            ))
        }
    }

    fn assemble_animated(&self) -> Result<Vec<u8>> {
        let anim = match (&self.animation, self.frames.is_empty()) {
            (Some(anim), false) => anim,
            _ => return Err(Error::EmptyAnimation),
        };

        let mut total = 4u32 + chunk_size(10) + chunk_size(6); // "WEBP" + VP8X + ANIM
        for frame in &self.frames {
            total += chunk_size(anmf_payload_size(frame));
        }

        let mut out = Vec::with_capacity(total as usize + 8);
        out.write_all(b"RIFF");
        out.write_u32_le(total);
        out.write_all(b"WEBP");

        let has_alpha = self
            .frames
            .iter()
            .any(|f| f.alpha_data.is_some() || f.is_lossless);
        let mut flags = ANIMATION_FLAG;
        if has_alpha {
            flags |= ALPHA_FLAG;
        }
        write_vp8x(&mut out, flags, self.canvas_width, self.canvas_height);

        let mut anim_data = Vec::with_capacity(6);
        anim_data.write_all(&anim.background_color);
        anim_data.write_u16_le(anim.loop_count);
        write_chunk(&mut out, b"ANIM", &anim_data);

        for frame in &self.frames {
            write_anmf(&mut out, frame);
        }

        debug_assert_eq!(out.len(), total as usize + 8);
        Ok(out)
    }
}

/// Wrap one compressed frame in a still-image container.
///
/// Produces the simple format (`VP8 ` or `VP8L` directly after the header)
/// unless separate alpha forces the extended `VP8X` + `ALPH` layout.
pub(crate) fn assemble_still(width: u32, height: u32, frame: FramePayload<'_>) -> Vec<u8> {
    let frame_chunk = if frame.is_lossless { b"VP8L" } else { b"VP8 " };

    let Some(alpha) = frame.alpha_data else {
        let mut out = Vec::with_capacity(chunk_size(frame.bitstream.len()) as usize + 12);
        out.write_all(b"RIFF");
        out.write_u32_le(chunk_size(frame.bitstream.len()) + 4);
        out.write_all(b"WEBP");
        write_chunk(&mut out, frame_chunk, frame.bitstream);
        return out;
    };

    let total =
        4u32 + chunk_size(10) + chunk_size(alpha.len()) + chunk_size(frame.bitstream.len());
    let mut out = Vec::with_capacity(total as usize + 8);
    out.write_all(b"RIFF");
    out.write_u32_le(total);
    out.write_all(b"WEBP");
    write_vp8x(&mut out, ALPHA_FLAG, width, height);
    write_chunk(&mut out, b"ALPH", alpha);
    write_chunk(&mut out, frame_chunk, frame.bitstream);
    out
}

fn write_vp8x(out: &mut Vec<u8>, flags: u8, width: u32, height: u32) {
    let mut vp8x = Vec::with_capacity(10);
    vp8x.push(flags);
    vp8x.write_all(&[0; 3]); // reserved
    vp8x.write_u24_le(width - 1);
    vp8x.write_u24_le(height - 1);
    write_chunk(out, b"VP8X", &vp8x);
}

fn anmf_payload_size(frame: &MuxFrame) -> usize {
    let mut size = ANMF_HEADER_LEN;
    if let Some(alpha) = &frame.alpha_data {
        size += chunk_size(alpha.len()) as usize;
    }
    size + chunk_size(frame.bitstream.len()) as usize
}

fn write_anmf(out: &mut Vec<u8>, frame: &MuxFrame) {
    out.write_all(b"ANMF");
    out.write_u32_le(anmf_payload_size(frame) as u32);

    // Offsets are stored in 2-pixel units
    out.write_u24_le(frame.x_offset / 2);
    out.write_u24_le(frame.y_offset / 2);
    out.write_u24_le(frame.width - 1);
    out.write_u24_le(frame.height - 1);
    out.write_u24_le(frame.duration_ms);

    let mut flags = 0u8;
    if frame.dispose == DisposeMethod::Background {
        flags |= 1;
    }
    if frame.blend == BlendMethod::Overwrite {
        flags |= 2;
    }
    out.push(flags);

    if let Some(alpha) = &frame.alpha_data {
        write_chunk(out, b"ALPH", alpha);
    }
    let frame_chunk = if frame.is_lossless { b"VP8L" } else { b"VP8 " };
    write_chunk(out, frame_chunk, &frame.bitstream);
}

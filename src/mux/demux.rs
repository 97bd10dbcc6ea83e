//! Zero-copy WebP demuxer.
//!
//! Walks a WebP file at the chunk level, validating every declared size
//! against the buffer and exposing frame metadata and raw bitstream slices
//! without decoding pixels.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpanim::mux::WebPDemuxer;
//!
//! let data: &[u8] = &[]; // your WebP data
//! let demuxer = WebPDemuxer::new(data)?;
//! println!("{}x{}, {} frame(s)", demuxer.canvas_width(), demuxer.canvas_height(), demuxer.num_frames());
//!
//! for frame in demuxer.frames() {
//!     println!("  frame {}: {}x{} at ({},{}) duration={}ms",
//!         frame.frame_num, frame.width, frame.height,
//!         frame.x_offset, frame.y_offset, frame.duration_ms);
//! }
//! # Ok::<(), webpanim::Error>(())
//! ```

use log::trace;

use crate::codec::FramePayload;
use crate::error::{Error, Result};
use crate::slice_reader::SliceReader;

/// How the frame area is disposed after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMethod {
    /// Do not dispose. The frame remains on the canvas.
    None,
    /// Clear the frame rectangle before the next frame is drawn.
    Background,
}

/// How the frame is blended with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMethod {
    /// Use alpha blending with the existing canvas content.
    AlphaBlend,
    /// Overwrite the canvas region with the frame data.
    Overwrite,
}

/// Metadata and bitstream slices for a single frame.
#[derive(Debug, Clone)]
pub struct DemuxFrame<'a> {
    /// 1-based frame number.
    pub frame_num: u32,
    /// Horizontal offset of the frame on the canvas (always even).
    pub x_offset: u32,
    /// Vertical offset of the frame on the canvas (always even).
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame duration in milliseconds. Always 0 for still images.
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Whether the frame covers the whole canvas.
    pub is_key_frame: bool,
    /// Whether the frame uses lossy (VP8) encoding. `false` means lossless (VP8L).
    pub is_lossy: bool,
    /// Raw VP8 or VP8L bitstream data for this frame.
    pub bitstream: &'a [u8],
    /// Raw ALPH chunk payload, if present (lossy frames with separate alpha).
    pub alpha_data: Option<&'a [u8]>,
}

impl<'a> DemuxFrame<'a> {
    /// The compressed data in the form the pixel codec consumes.
    pub fn payload(&self) -> FramePayload<'a> {
        FramePayload {
            bitstream: self.bitstream,
            alpha_data: self.alpha_data,
            is_lossless: !self.is_lossy,
        }
    }
}

/// Zero-copy WebP demuxer.
///
/// Parsing is eager: every chunk is walked and checked in [`new`](Self::new),
/// so a successfully constructed demuxer only hands out in-bounds slices.
#[derive(Debug, Clone)]
pub struct WebPDemuxer<'a> {
    canvas_width: u32,
    canvas_height: u32,
    loop_count: u32,
    background_color: [u8; 4],
    has_alpha: bool,
    is_animated: bool,
    frames: Vec<DemuxFrame<'a>>,
}

/// One chunk header and its in-bounds payload.
struct Chunk<'a> {
    fourcc: [u8; 4],
    payload: &'a [u8],
}

/// Read the next chunk, consuming its pad byte when present.
fn read_chunk<'a>(r: &mut SliceReader<'a>) -> Result<Chunk<'a>> {
    let offset = r.position();
    let fourcc = r.read_fourcc()?;
    let size = r.read_u32_le()? as usize;
    let payload = r.take_slice(size)?;
    // A missing pad byte on the very last chunk is tolerated.
    if size % 2 == 1 && r.remaining() > 0 {
        r.skip(1)?;
    }
    trace!(
        "chunk {:?} at {} ({} bytes)",
        String::from_utf8_lossy(&fourcc),
        offset,
        size
    );
    Ok(Chunk { fourcc, payload })
}

impl<'a> WebPDemuxer<'a> {
    /// Parse a WebP file from a byte slice.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::MalformedContainer("file too small".into()));
        }

        let mut r = SliceReader::new(data);
        if &r.read_fourcc()? != b"RIFF" {
            return Err(Error::MalformedContainer("missing RIFF signature".into()));
        }
        let riff_size = r.read_u32_le()? as usize;
        if &r.read_fourcc()? != b"WEBP" {
            return Err(Error::MalformedContainer("missing WEBP signature".into()));
        }
        if riff_size < 4 {
            return Err(Error::MalformedContainer(format!(
                "RIFF size {riff_size} too small"
            )));
        }
        let riff_end = 8 + riff_size;
        if riff_end > data.len() {
            return Err(Error::TruncatedData {
                offset: 8,
                needed: riff_size,
                available: data.len() - 8,
            });
        }

        // Trailing bytes after the RIFF payload are ignored.
        let mut r = SliceReader::new(&data[..riff_end]);
        r.seek_from_start(12)?;

        if r.remaining() == 0 {
            return Err(Error::MalformedContainer("no chunks".into()));
        }
        let first = read_chunk(&mut r)?;
        match &first.fourcc {
            b"VP8 " => Self::parse_simple(first.payload, true),
            b"VP8L" => Self::parse_simple(first.payload, false),
            b"VP8X" => Self::parse_extended(first.payload, r),
            other => Err(Error::UnsupportedCodec(*other)),
        }
    }

    fn parse_simple(bitstream: &'a [u8], is_lossy: bool) -> Result<Self> {
        let (width, height, has_alpha) = if is_lossy {
            vp8_dimensions(bitstream)?
        } else {
            vp8l_dimensions(bitstream)?
        };
        Ok(Self {
            canvas_width: width,
            canvas_height: height,
            loop_count: 0,
            background_color: [0; 4],
            has_alpha,
            is_animated: false,
            frames: vec![still_frame(width, height, bitstream, None, is_lossy)],
        })
    }

    fn parse_extended(vp8x: &'a [u8], mut r: SliceReader<'a>) -> Result<Self> {
        if vp8x.len() < 10 {
            return Err(Error::MalformedContainer("VP8X chunk too small".into()));
        }
        let mut header = SliceReader::new(vp8x);
        let flags = header.read_u8()?;
        let has_alpha = flags & 0b0001_0000 != 0;
        let is_animated = flags & 0b0000_0010 != 0;
        header.skip(3)?;
        // Canvas dimensions (24-bit LE, stored as value-1)
        let canvas_width = header.read_u24_le()? + 1;
        let canvas_height = header.read_u24_le()? + 1;

        let mut demuxer = Self {
            canvas_width,
            canvas_height,
            loop_count: 0,
            background_color: [0; 4],
            has_alpha,
            is_animated,
            frames: Vec::new(),
        };

        let mut seen_anim = false;
        let mut still_alpha: Option<&'a [u8]> = None;
        let mut still: Option<(&'a [u8], bool)> = None;

        while r.remaining() > 0 {
            let chunk = read_chunk(&mut r)?;
            match (&chunk.fourcc, is_animated) {
                (b"ANIM", true) => {
                    if chunk.payload.len() < 6 {
                        return Err(Error::MalformedContainer("ANIM chunk too small".into()));
                    }
                    let mut anim = SliceReader::new(chunk.payload);
                    demuxer.background_color = anim.read_fourcc()?;
                    demuxer.loop_count = u32::from(anim.read_u16_le()?);
                    seen_anim = true;
                }
                (b"ANMF", true) => {
                    if !seen_anim {
                        return Err(Error::MalformedContainer("ANMF before ANIM".into()));
                    }
                    let frame_num = demuxer.frames.len() as u32 + 1;
                    let frame = demuxer.parse_anmf(chunk.payload, frame_num)?;
                    demuxer.frames.push(frame);
                }
                (b"ALPH", false) => still_alpha = Some(chunk.payload),
                (b"VP8 ", false) if still.is_none() => still = Some((chunk.payload, true)),
                (b"VP8L", false) if still.is_none() => still = Some((chunk.payload, false)),
                // ICCP, EXIF, XMP and unknown chunks carry nothing we decode.
                _ => {}
            }
        }

        if is_animated {
            if !seen_anim {
                return Err(Error::MalformedContainer("missing ANIM chunk".into()));
            }
            if demuxer.frames.is_empty() {
                return Err(Error::MalformedContainer("animation has no frames".into()));
            }
        } else {
            let (bitstream, is_lossy) = still
                .ok_or_else(|| Error::MalformedContainer("missing image chunk".into()))?;
            let alpha = if is_lossy { still_alpha } else { None };
            demuxer
                .frames
                .push(still_frame(canvas_width, canvas_height, bitstream, alpha, is_lossy));
        }

        Ok(demuxer)
    }

    fn parse_anmf(&self, payload: &'a [u8], frame_num: u32) -> Result<DemuxFrame<'a>> {
        if payload.len() < 16 {
            return Err(Error::MalformedContainer(format!(
                "ANMF chunk {frame_num} too small"
            )));
        }

        // ANMF payload layout:
        // 3 bytes: Frame X (in 2-pixel units)
        // 3 bytes: Frame Y (in 2-pixel units)
        // 3 bytes: Frame Width Minus One
        // 3 bytes: Frame Height Minus One
        // 3 bytes: Frame Duration
        // 1 byte:  Flags (dispose[0], no-blend[1], reserved[2-7])
        // Then: sub-chunks (ALPH + VP8, or VP8L)
        let mut r = SliceReader::new(payload);
        let x_offset = r.read_u24_le()? * 2;
        let y_offset = r.read_u24_le()? * 2;
        let width = r.read_u24_le()? + 1;
        let height = r.read_u24_le()? + 1;
        let duration_ms = r.read_u24_le()?;
        let flags = r.read_u8()?;
        let dispose = if flags & 1 != 0 {
            DisposeMethod::Background
        } else {
            DisposeMethod::None
        };
        let blend = if flags & 2 != 0 {
            BlendMethod::Overwrite
        } else {
            BlendMethod::AlphaBlend
        };

        if x_offset + width > self.canvas_width || y_offset + height > self.canvas_height {
            return Err(Error::MalformedContainer(format!(
                "frame {frame_num} at ({x_offset}, {y_offset}) size {width}x{height} \
                 exceeds canvas {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }

        let mut alpha_data = None;
        loop {
            if r.remaining() == 0 {
                return Err(Error::MalformedContainer(format!(
                    "frame {frame_num} has no bitstream"
                )));
            }
            let sub = read_chunk(&mut r)?;
            let is_lossy = match &sub.fourcc {
                b"ALPH" if alpha_data.is_none() => {
                    alpha_data = Some(sub.payload);
                    continue;
                }
                b"ALPH" => {
                    return Err(Error::MalformedContainer(format!(
                        "frame {frame_num} has two ALPH chunks"
                    )))
                }
                b"VP8 " => true,
                b"VP8L" => false,
                other => return Err(Error::UnsupportedCodec(*other)),
            };
            return Ok(DemuxFrame {
                frame_num,
                x_offset,
                y_offset,
                width,
                height,
                duration_ms,
                dispose,
                blend,
                is_key_frame: x_offset == 0
                    && y_offset == 0
                    && width == self.canvas_width
                    && height == self.canvas_height,
                is_lossy,
                bitstream: sub.payload,
                alpha_data: if is_lossy { alpha_data } else { None },
            });
        }
    }

    /// Canvas width in pixels.
    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    /// Canvas height in pixels.
    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// Number of frames. Still images return 1.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Loop count from the `ANIM` chunk (0 = forever). Still images return 0.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Background colour from the `ANIM` chunk, in BGRA byte order.
    pub fn background_color(&self) -> [u8; 4] {
        self.background_color
    }

    /// Whether the file carries an animation.
    pub fn is_animated(&self) -> bool {
        self.is_animated
    }

    /// Whether the header declares alpha.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Sum of all frame durations in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }

    /// Get a specific frame by 1-based index.
    pub fn frame(&self, n: u32) -> Option<&DemuxFrame<'a>> {
        self.frames.get((n as usize).checked_sub(1)?)
    }

    /// Iterate over all frames in file order.
    pub fn frames(&self) -> core::slice::Iter<'_, DemuxFrame<'a>> {
        self.frames.iter()
    }
}

fn still_frame<'a>(
    width: u32,
    height: u32,
    bitstream: &'a [u8],
    alpha_data: Option<&'a [u8]>,
    is_lossy: bool,
) -> DemuxFrame<'a> {
    DemuxFrame {
        frame_num: 1,
        x_offset: 0,
        y_offset: 0,
        width,
        height,
        duration_ms: 0,
        dispose: DisposeMethod::None,
        blend: BlendMethod::Overwrite,
        is_key_frame: true,
        is_lossy,
        bitstream,
        alpha_data,
    }
}

/// Width, height and alpha flag from a VP8 key frame header.
fn vp8_dimensions(bitstream: &[u8]) -> Result<(u32, u32, bool)> {
    if bitstream.len() < 10 {
        return Err(Error::MalformedContainer("VP8 chunk too small".into()));
    }
    let mut r = SliceReader::new(bitstream);
    let frame_tag = r.read_u24_le()?;
    if frame_tag & 1 != 0 {
        return Err(Error::MalformedContainer("VP8 frame is not a key frame".into()));
    }
    let magic = r.take_slice(3)?;
    if magic != [0x9D, 0x01, 0x2A] {
        return Err(Error::MalformedContainer("invalid VP8 magic".into()));
    }
    let w = u32::from(r.read_u16_le()? & 0x3FFF);
    let h = u32::from(r.read_u16_le()? & 0x3FFF);
    if w == 0 || h == 0 {
        return Err(Error::MalformedContainer(format!(
            "VP8 frame has zero dimension {w}x{h}"
        )));
    }
    Ok((w, h, false))
}

/// Width, height and alpha hint from a VP8L header.
fn vp8l_dimensions(bitstream: &[u8]) -> Result<(u32, u32, bool)> {
    if bitstream.len() < 5 {
        return Err(Error::MalformedContainer("VP8L chunk too small".into()));
    }
    let mut r = SliceReader::new(bitstream);
    if r.read_u8()? != 0x2f {
        return Err(Error::MalformedContainer("invalid VP8L signature".into()));
    }
    let header = r.read_u32_le()?;
    let width = (header & 0x3FFF) + 1;
    let height = ((header >> 14) & 0x3FFF) + 1;
    let has_alpha = (header >> 28) & 1 != 0;
    Ok((width, height, has_alpha))
}

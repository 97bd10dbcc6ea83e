//! Single-frame pixel codec boundary.
//!
//! The container layer never touches VP8/VP8L internals. It hands RGBA
//! buffers to a [`PixelCodec`] and gets back raw bitstream chunks (plus an
//! optional `ALPH` payload for lossy frames with transparency), and the
//! reverse on decode. Codecs are passed explicitly (`Arc<dyn PixelCodec>` to
//! encoders, `&dyn PixelCodec` to decoders), so independent instances never
//! share hidden state.
//!
//! [`LibwebpCodec`] is the default implementation, backed by libwebp.

use log::debug;
use webp::{Decoder, Encoder};

use crate::error::{Error, Result};
use crate::mux::assemble::assemble_still;
use crate::mux::WebPDemuxer;

/// Per-frame compression parameters, already clamped to their valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressParams {
    /// Reversible VP8L compression instead of lossy VP8.
    pub lossless: bool,
    /// 0-100.
    pub quality: u8,
    /// 0-6.
    pub method: u8,
}

/// Output of [`PixelCodec::compress`]: the raw contents of the frame's
/// bitstream chunk, without RIFF framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFrame {
    /// VP8 or VP8L bitstream.
    pub bitstream: Vec<u8>,
    /// ALPH chunk payload for lossy frames that carry transparency.
    pub alpha_data: Option<Vec<u8>>,
    /// Whether `bitstream` is VP8L.
    pub is_lossless: bool,
}

/// Borrowed view of a compressed frame, as found in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePayload<'a> {
    /// VP8 or VP8L bitstream.
    pub bitstream: &'a [u8],
    /// ALPH chunk payload, if any.
    pub alpha_data: Option<&'a [u8]>,
    /// Whether `bitstream` is VP8L.
    pub is_lossless: bool,
}

/// A single-frame RGBA compressor and its inverse.
///
/// Implementations must be deterministic: the same pixels and parameters
/// must always produce the same bytes.
pub trait PixelCodec: Send + Sync {
    /// Compress a `width` x `height` RGBA32 buffer.
    fn compress(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        params: &CompressParams,
    ) -> Result<CompressedFrame>;

    /// Decompress a frame bitstream into a `width` x `height` RGBA32 buffer.
    fn decompress(&self, frame: FramePayload<'_>, width: u32, height: u32) -> Result<Vec<u8>>;
}

/// [`PixelCodec`] backed by libwebp (single-threaded, so output is
/// reproducible).
#[derive(Debug, Clone, Copy, Default)]
pub struct LibwebpCodec;

impl PixelCodec for LibwebpCodec {
    fn compress(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
        params: &CompressParams,
    ) -> Result<CompressedFrame> {
        let mut config = libwebp_sys::WebPConfig::new()
            .map_err(|()| Error::Codec("libwebp rejected its default configuration".into()))?;
        config.lossless = i32::from(params.lossless);
        config.quality = f32::from(params.quality.min(100));
        config.method = i32::from(params.method.min(6));
        config.thread_level = 0;
        // Keep RGB under fully transparent pixels so lossless really is lossless.
        config.exact = i32::from(params.lossless);

        let encoded = Encoder::from_rgba(rgba, width, height)
            .encode_advanced(&config)
            .map_err(|e| Error::Codec(format!("libwebp encode failed: {e:?}")))?;

        let demuxer = WebPDemuxer::new(&encoded)
            .map_err(|e| Error::Codec(format!("unexpected libwebp output: {e}")))?;
        let frame = demuxer
            .frame(1)
            .ok_or_else(|| Error::Codec("libwebp produced no image".into()))?;
        debug!(
            "compressed {}x{} frame: {} ({} bytes{})",
            width,
            height,
            if frame.is_lossy { "VP8" } else { "VP8L" },
            frame.bitstream.len(),
            if frame.alpha_data.is_some() { " + ALPH" } else { "" },
        );
        Ok(CompressedFrame {
            bitstream: frame.bitstream.to_vec(),
            alpha_data: frame.alpha_data.map(<[u8]>::to_vec),
            is_lossless: !frame.is_lossy,
        })
    }

    fn decompress(&self, frame: FramePayload<'_>, width: u32, height: u32) -> Result<Vec<u8>> {
        let still = assemble_still(width, height, frame);
        let image = Decoder::new(&still)
            .decode()
            .ok_or_else(|| Error::Codec(format!("libwebp could not decode {width}x{height} frame")))?;
        if (image.width(), image.height()) != (width, height) {
            return Err(Error::Codec(format!(
                "frame bitstream is {}x{}, container declares {width}x{height}",
                image.width(),
                image.height()
            )));
        }
        if image.is_alpha() {
            Ok(image.to_vec())
        } else {
            Ok(image
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect())
        }
    }
}

//! Animated WebP encoding and decoding
//!
//! This crate buffers RGBA frames, compresses each one through a pluggable
//! single-frame [`PixelCodec`] (libwebp by default) and assembles the results
//! into an animated WebP container. The reverse direction parses a container
//! and composites its frames back into full-canvas RGBA snapshots.
//!
//! # Encoding
//!
//! ```rust,no_run
//! use webpanim::{EncodingOptions, WebpEncoder};
//!
//! let options = EncodingOptions::new().lossless(false).quality(80.0);
//! let mut encoder = WebpEncoder::new(4, 4, Some(options))?;
//! encoder.add_frame(vec![255u8; 4 * 4 * 4], Some(100))?;
//! encoder.add_frame(vec![0u8; 4 * 4 * 4], Some(100))?;
//! let webp = encoder.finish(None)?;
//! # Ok::<(), webpanim::Error>(())
//! ```
//!
//! Frames added without a duration take theirs from the frame rate
//! ([`WebpEncoder::set_frame_rate`], 30 fps by default) at the time the
//! animation is finished.
//!
//! # Decoding
//!
//! ```rust,no_run
//! let webp_data: &[u8] = &[]; // your WebP data
//! let animation = webpanim::decode_webp(webp_data)?;
//! for frame in &animation.frames {
//!     println!("{} bytes, shown until {}ms", frame.data.len(), frame.timestamp_ms);
//! }
//! # Ok::<(), webpanim::Error>(())
//! ```
//!
//! Or the [`AnimationDecoder`] iterator to composite one frame at a time.
//!
//! # Logging
//!
//! Progress is reported through the [`log`] facade. The crate never installs
//! a logger.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frames;
pub mod limits;
pub mod mux;
pub mod options;

// Byte-level helpers shared by the demuxer and the assembler
mod slice_reader;
mod vec_writer;

pub use codec::{CompressParams, CompressedFrame, FramePayload, LibwebpCodec, PixelCodec};
pub use decoder::{
    decode_webp, decode_webp_with_limits, AnimationDecoder, AnimationInfo, DecodedAnimation,
    DecodedFrame,
};
pub use encoder::{WebpEncoder, WriteTask};
pub use error::{Error, Result};
pub use frames::{FrameBuffer, DEFAULT_FRAME_RATE, MAX_DIMENSION, MAX_DURATION_MS};
pub use limits::Limits;
pub use mux::{
    AnimationEncoder, BlendMethod, DemuxFrame, DisposeMethod, MuxFrame, WebPDemuxer, WebPMux,
};
pub use options::{EncodingOptions, OptionOverrides, MAX_LOOP_COUNT, MAX_METHOD};

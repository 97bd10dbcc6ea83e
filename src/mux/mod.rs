//! WebP mux/demux and animation encoding.
//!
//! This module provides three capabilities:
//!
//! - **Demux** ([`WebPDemuxer`]): Parse WebP files at the chunk level, iterate
//!   frames and access raw bitstream data without decoding pixels.
//! - **Mux** ([`WebPMux`]): Assemble WebP containers from pre-encoded frame
//!   bitstreams.
//! - **Animation** ([`AnimationEncoder`]): Encode animated WebP files
//!   frame-by-frame through a [`PixelCodec`](crate::PixelCodec).

mod anim;
pub(crate) mod assemble;
mod demux;

pub use anim::AnimationEncoder;
pub use assemble::{MuxFrame, WebPMux};
pub use demux::{BlendMethod, DemuxFrame, DisposeMethod, WebPDemuxer};

//! Frame-accumulating animated WebP encoder.
//!
//! [`WebpEncoder`] buffers RGBA frames and turns them into a container only
//! when a terminal operation consumes it:
//!
//! - [`finish`](WebpEncoder::finish) returns the bytes,
//! - [`write_to_file_sync`](WebpEncoder::write_to_file_sync) writes them in
//!   the calling thread,
//! - [`write_to_file`](WebpEncoder::write_to_file) writes them on a
//!   background thread and returns a [`WriteTask`] future.
//!
//! All three run the same blocking core, [`encode`](WebpEncoder::encode), so
//! their output is byte-identical for the same frames and options.
//!
//! # Example
//!
//! ```rust,no_run
//! use webpanim::{EncodingOptions, OptionOverrides, WebpEncoder};
//!
//! let mut encoder = WebpEncoder::new(64, 64, Some(EncodingOptions::new().loop_count(1)))?;
//! encoder.set_frame_rate(24)?;
//! for shade in [0u8, 128, 255] {
//!     encoder.add_frame(vec![shade; 64 * 64 * 4], None)?;
//! }
//! let written = encoder.write_to_file_sync("fade", &OptionOverrides::new())?;
//! # Ok::<(), webpanim::Error>(())
//! ```

use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use futures_channel::oneshot;
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::codec::{LibwebpCodec, PixelCodec};
use crate::error::{Error, Result};
use crate::frames::FrameBuffer;
use crate::mux::AnimationEncoder;
use crate::options::{EncodingOptions, OptionOverrides};

/// Animated WebP encoder that buffers frames until a terminal operation.
#[derive(Clone)]
pub struct WebpEncoder {
    buffer: FrameBuffer,
    options: EncodingOptions,
    codec: Arc<dyn PixelCodec>,
}

impl core::fmt::Debug for WebpEncoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebpEncoder")
            .field("buffer", &self.buffer)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl WebpEncoder {
    /// Create an encoder for a `width` x `height` canvas backed by libwebp.
    ///
    /// `None` options use [`EncodingOptions::default`].
    pub fn new(width: u32, height: u32, options: Option<EncodingOptions>) -> Result<Self> {
        Self::with_codec(width, height, options, Arc::new(LibwebpCodec))
    }

    /// Create an encoder with an explicit pixel codec.
    pub fn with_codec(
        width: u32,
        height: u32,
        options: Option<EncodingOptions>,
        codec: Arc<dyn PixelCodec>,
    ) -> Result<Self> {
        let options = options.unwrap_or_default();
        options.validate()?;
        Ok(Self {
            buffer: FrameBuffer::new(width, height)?,
            options,
            codec,
        })
    }

    /// Set the frame rate used for frames added without a duration.
    ///
    /// Applies to every such frame, including those already added.
    pub fn set_frame_rate(&mut self, fps: u16) -> Result<()> {
        self.buffer.set_frame_rate(fps)
    }

    /// Current frame rate.
    pub fn frame_rate(&self) -> u16 {
        self.buffer.frame_rate()
    }

    /// Append an RGBA frame of exactly `width * height * 4` bytes.
    ///
    /// `duration_ms` of `None` defers to the frame rate.
    pub fn add_frame(&mut self, pixels: impl Into<Vec<u8>>, duration_ms: Option<u32>) -> Result<()> {
        self.buffer.push(pixels.into(), duration_ms)
    }

    /// Drop all buffered frames.
    pub fn clear_frames(&mut self) {
        self.buffer.clear();
    }

    /// Change the canvas size. Fails while frames of another size are buffered.
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> Result<()> {
        self.buffer.set_dimensions(width, height)
    }

    /// Replace the instance options.
    pub fn set_options(&mut self, options: EncodingOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    /// Instance options.
    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Number of buffered frames.
    pub fn frame_count(&self) -> usize {
        self.buffer.len()
    }

    /// Canvas dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Encode the buffered frames without consuming the encoder.
    pub fn encode(&self, overrides: &OptionOverrides) -> Result<Vec<u8>> {
        self.encode_with(overrides, None)
    }

    /// Encode with the instance options and consume the encoder.
    ///
    /// `Some(d)` replaces the last frame's duration; `None` keeps it.
    pub fn finish(self, last_frame_duration_ms: Option<u32>) -> Result<Vec<u8>> {
        self.encode_with(&OptionOverrides::new(), last_frame_duration_ms)
    }

    /// Encode and write to `path`, returning the number of bytes written.
    ///
    /// `.webp` is appended when `path` has another extension or none. The
    /// file is staged next to its destination and renamed into place, so a
    /// failed encode or write never leaves partial output.
    pub fn write_to_file_sync(
        self,
        path: impl AsRef<Path>,
        overrides: &OptionOverrides,
    ) -> Result<usize> {
        let path = with_webp_extension(path.as_ref());
        let data = self.encode(overrides)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&data)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| Error::Io(e.error))?;

        info!("wrote {} ({} bytes)", path.display(), data.len());
        Ok(data.len())
    }

    /// Like [`write_to_file_sync`](Self::write_to_file_sync), but runs on a
    /// background thread. The encoder moves into that thread, so no frame can
    /// be added while the write is in flight.
    pub fn write_to_file(self, path: impl AsRef<Path>, overrides: OptionOverrides) -> WriteTask {
        let path = path.as_ref().to_path_buf();
        let (sender, receiver) = oneshot::channel();
        let spawned = thread::Builder::new()
            .name("webpanim-writer".into())
            .spawn(move || {
                let _ = sender.send(self.write_to_file_sync(path, &overrides));
            });

        match spawned {
            Ok(_) => WriteTask {
                receiver: Some(receiver),
                spawn_error: None,
            },
            Err(e) => WriteTask {
                receiver: None,
                spawn_error: Some(e),
            },
        }
    }

    fn encode_with(
        &self,
        overrides: &OptionOverrides,
        last_frame_duration_ms: Option<u32>,
    ) -> Result<Vec<u8>> {
        if self.buffer.is_empty() {
            return Err(Error::EmptyAnimation);
        }
        let options = self.options.merge(overrides)?;
        let durations = self.buffer.durations(last_frame_duration_ms)?;
        let (width, height) = self.buffer.dimensions();

        let mut anim = AnimationEncoder::new(width, height, options, self.codec.as_ref())?;
        for (frame, duration_ms) in self.buffer.frames().iter().zip(durations) {
            anim.add_frame(&frame.pixels, duration_ms)?;
        }
        let data = anim.finalize()?;
        debug!(
            "encoded {} frames at {}x{} into {} bytes",
            self.buffer.len(),
            width,
            height,
            data.len()
        );
        Ok(data)
    }
}

/// Future returned by [`WebpEncoder::write_to_file`], resolving to the number
/// of bytes written.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct WriteTask {
    receiver: Option<oneshot::Receiver<Result<usize>>>,
    spawn_error: Option<io::Error>,
}

impl Future for WriteTask {
    type Output = Result<usize>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(e) = self.spawn_error.take() {
            return Poll::Ready(Err(Error::Io(e)));
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(Error::Io(io::Error::other(
                "write task polled after completion",
            ))));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.receiver = None;
                Poll::Ready(result.unwrap_or_else(|_| {
                    Err(Error::Io(io::Error::other(
                        "writer thread exited without a result",
                    )))
                }))
            }
        }
    }
}

fn with_webp_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "webp") {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".webp");
    PathBuf::from(name)
}

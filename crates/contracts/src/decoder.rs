//! FrameDecoder trait - video decoding collaborator
//!
//! Narrow capability set required by the frame extractor: open a source,
//! query its native frame rate, pull frames until end of stream.

use std::path::Path;

use crate::{DecodedFrame, Result};

/// Frame decoder provider
///
/// Abstracts the decoding backend so the extractor runs unchanged against the
/// ffmpeg-backed decoder and the mock decoder used in tests.
pub trait FrameDecoder {
    /// Open decode handle
    type Stream: FrameStream;

    /// Open a video source
    ///
    /// # Errors
    /// `SyncError::Open` when the source cannot be decoded
    fn open(&self, path: &Path) -> Result<Self::Stream>;
}

/// Open decode handle
///
/// Resources behind the handle (processes, pipes, file descriptors) are
/// released when it is dropped, on every exit path.
pub trait FrameStream {
    /// Native frame rate (frames per second)
    fn frame_rate(&self) -> f64;

    /// Decode the next frame, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>>;
}

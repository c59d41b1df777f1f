//! Mock decoder implementation
//!
//! Implements `FrameDecoder`, generates synthetic RGB frames.
//! Used for testing without ffmpeg or a real video file.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{DecodedFrame, FrameDecoder, FrameStream, Result, SyncError};
use tracing::trace;

/// Mock decoder configuration
#[derive(Debug, Clone)]
pub struct MockDecoderConfig {
    /// Reported native frame rate
    pub frame_rate: f64,
    /// Frames produced before end of stream
    pub frame_count: u64,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Reject `open` with this message
    pub open_error: Option<String>,
    /// Fail with a decode error when this frame index is requested
    pub fail_at: Option<u64>,
}

impl Default for MockDecoderConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            frame_count: 90,
            width: 64,
            height: 48,
            open_error: None,
            fail_at: None,
        }
    }
}

/// Mock decoder
///
/// Counts opened and released streams so tests can check that decode handles
/// are closed on every exit path.
#[derive(Debug, Clone, Default)]
pub struct MockDecoder {
    config: MockDecoderConfig,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MockDecoder {
    pub fn new(config: MockDecoderConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Decoder whose `open` always fails
    pub fn failing_open(message: impl Into<String>) -> Self {
        Self::new(MockDecoderConfig {
            open_error: Some(message.into()),
            ..Default::default()
        })
    }

    /// Streams successfully opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams dropped so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl FrameDecoder for MockDecoder {
    type Stream = MockStream;

    fn open(&self, path: &Path) -> Result<Self::Stream> {
        if let Some(message) = &self.config.open_error {
            return Err(SyncError::open(path, message.clone()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockStream {
            config: self.config.clone(),
            next: 0,
            released: Arc::clone(&self.released),
        })
    }
}

/// Open mock stream
#[derive(Debug)]
pub struct MockStream {
    config: MockDecoderConfig,
    next: u64,
    released: Arc<AtomicUsize>,
}

impl MockStream {
    /// Horizontal gradient shifted by the frame index
    fn render(&self, index: u64) -> Bytes {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        let mut data = Vec::with_capacity(DecodedFrame::expected_len(
            self.config.width,
            self.config.height,
        ));
        for y in 0..h {
            for x in 0..w {
                let shade = ((x + index as usize) * 255 / w.max(1)) as u8;
                data.extend_from_slice(&[shade, (y * 255 / h.max(1)) as u8, index as u8]);
            }
        }
        Bytes::from(data)
    }
}

impl FrameStream for MockStream {
    fn frame_rate(&self) -> f64 {
        self.config.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.config.fail_at == Some(self.next) {
            return Err(SyncError::decode(format!(
                "mock decode failure at frame {}",
                self.next
            )));
        }
        if self.next >= self.config.frame_count {
            return Ok(None);
        }

        let index = self.next;
        self.next += 1;
        trace!(index, "Mock frame generated");
        Ok(Some(DecodedFrame {
            index,
            width: self.config.width,
            height: self.config.height,
            data: self.render(index),
        }))
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

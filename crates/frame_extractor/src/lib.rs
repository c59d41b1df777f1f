//! # Frame Extractor
//!
//! Video frame sampling module.
//!
//! Responsibilities:
//! - Decode a video through a `FrameDecoder`
//! - Keep every Nth frame, N = floor(native fps / target fps) with a floor of 1
//! - Write kept frames as `frame_NNNNNN.jpeg`
//! - Provide an ffmpeg backend and a mock backend

pub mod extractor;
pub mod ffmpeg;
pub mod mock_decoder;

pub use extractor::{frame_file_name, frame_interval, ExtractionReport, FrameExtractor, VideoProbe};
pub use ffmpeg::{FfmpegDecoder, FfmpegStream, StreamInfo};
pub use mock_decoder::{MockDecoder, MockDecoderConfig, MockStream};

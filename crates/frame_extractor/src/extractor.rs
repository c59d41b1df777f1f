//! Frame Extractor - decode a video and keep every Nth frame as JPEG.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{
    DecodedFrame, FileSystemProvider, FrameConfig, FrameDecoder, FrameStream, Result, SyncError,
};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::{debug, info, instrument, warn};

/// Frames written between two `debug!` progress lines
const PROGRESS_EVERY: usize = 100;

/// Sampling interval N = floor(native / target), never below 1.
pub fn frame_interval(native_fps: f64, target_fps: f64) -> u64 {
    let ratio = native_fps / target_fps;
    if !ratio.is_finite() || ratio < 1.0 {
        1
    } else {
        ratio.floor() as u64
    }
}

/// `frame_000042.jpeg`; lexical order equals temporal order up to 10^6 frames.
pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index:06}.jpeg")
}

/// Video properties gathered without extracting anything
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProbe {
    pub native_fps: f64,
    pub interval: u64,
}

/// Extraction result
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    /// Native frame rate reported by the decoder
    pub native_fps: f64,
    /// Sampling interval N
    pub interval: u64,
    /// Frames pulled from the decoder
    pub decoded: u64,
    /// Written images, in temporal order
    pub frames: Vec<PathBuf>,
}

impl ExtractionReport {
    pub fn kept(&self) -> usize {
        self.frames.len()
    }
}

/// Frame Extractor
///
/// Side effects happen only after the video has been opened: an absent or
/// undecodable source leaves the output directory untouched. Images from an
/// extraction aborted halfway are left on disk.
pub struct FrameExtractor<'a, F: FileSystemProvider, D: FrameDecoder> {
    fs: &'a F,
    decoder: &'a D,
    config: FrameConfig,
}

impl<'a, F: FileSystemProvider, D: FrameDecoder> FrameExtractor<'a, F, D> {
    pub fn new(fs: &'a F, decoder: &'a D, config: FrameConfig) -> Self {
        Self {
            fs,
            decoder,
            config,
        }
    }

    /// Open the video, read its frame rate and release it again.
    #[instrument(name = "video_probe", skip(self), fields(video = %video.display()))]
    pub fn probe(&self, video: &Path) -> Result<VideoProbe> {
        let stream = self.open(video)?;
        let native_fps = stream.frame_rate();
        Ok(VideoProbe {
            native_fps,
            interval: self.interval_for(native_fps),
        })
    }

    /// Extract every Nth frame of `video` into `out_dir`.
    ///
    /// # Errors
    /// - `SyncError::MissingInput` if the video does not exist
    /// - `SyncError::Open` if it cannot be decoded
    /// - `SyncError::Decode` / `SyncError::Image` / `SyncError::Io` mid-run
    #[instrument(
        name = "frame_extract",
        skip(self),
        fields(video = %video.display(), out_dir = %out_dir.display())
    )]
    pub fn extract(&self, video: &Path, out_dir: &Path) -> Result<ExtractionReport> {
        let mut stream = self.open(video)?;
        let native_fps = stream.frame_rate();
        let interval = self.interval_for(native_fps);

        self.fs.create_dir_all(out_dir)?;

        let mut decoded = 0u64;
        let mut frames = Vec::new();
        while let Some(frame) = stream.next_frame()? {
            if decoded % interval == 0 {
                let path = out_dir.join(frame_file_name(decoded / interval));
                write_jpeg(&path, &frame, self.config.jpeg_quality)?;
                frames.push(path);

                if frames.len() % PROGRESS_EVERY == 0 {
                    debug!(written = frames.len(), decoded, "Frame extraction progress");
                }
            }
            decoded += 1;
        }

        metrics::counter!("telemetry_sync_frames_extracted_total").increment(frames.len() as u64);
        info!(
            native_fps,
            interval,
            decoded,
            kept = frames.len(),
            "Frames extracted"
        );
        Ok(ExtractionReport {
            native_fps,
            interval,
            decoded,
            frames,
        })
    }

    fn open(&self, video: &Path) -> Result<D::Stream> {
        if !self.fs.exists(video) {
            return Err(SyncError::missing_input("video file", video));
        }
        self.decoder.open(video)
    }

    fn interval_for(&self, native_fps: f64) -> u64 {
        let interval = frame_interval(native_fps, self.config.target_fps);
        if native_fps < self.config.target_fps || !native_fps.is_finite() {
            warn!(
                native_fps,
                target_fps = self.config.target_fps,
                "Native frame rate below target, keeping every frame"
            );
        }
        interval
    }
}

fn write_jpeg(path: &Path, frame: &DecodedFrame, quality: u8) -> Result<()> {
    let expected = DecodedFrame::expected_len(frame.width, frame.height);
    if frame.data.len() != expected {
        return Err(SyncError::decode(format!(
            "frame {} holds {} bytes, expected {expected} for {}x{} rgb24",
            frame.index,
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let file = File::create(path)
        .map_err(|e| SyncError::io(format!("creating {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| SyncError::image(path, e.to_string()))?;
    writer
        .flush()
        .map_err(|e| SyncError::io(format!("flushing {}", path.display()), e))
}

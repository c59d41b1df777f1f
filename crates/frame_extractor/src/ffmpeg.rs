//! FfmpegDecoder - 基于 ffprobe / ffmpeg 子进程的解码器
//!
//! - `ffprobe` 读取首个视频流的尺寸、帧率与旋转元数据 (JSON 输出)
//! - `ffmpeg` 将视频解码为 rgb24 原始帧，通过 stdout 管道逐帧读取
//! - ffmpeg 默认按旋转元数据自动旋转，90°/270° 时输出帧宽高互换
//! - 句柄 Drop 时 kill 并回收子进程

use std::collections::HashMap;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use bytes::Bytes;
use contracts::{DecodedFrame, DecoderConfig, FrameDecoder, FrameStream, Result, SyncError};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// ffprobe JSON 输出
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Display Matrix 旋转角，旧版本 ffmpeg 写在 `rotate` 标签里
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|raw| raw.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// 旋转角是否为 90° 的奇数倍 (输出帧宽高互换)
fn is_quarter_turn(rotation: f64) -> bool {
    let quarters = (rotation / 90.0).round() as i64;
    quarters.rem_euclid(2) == 1
}

/// 视频流参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

/// 解析 ffprobe 的帧率字段，如 `30000/1001` 或 `25`
///
/// `0/0` 等无效值返回 `None`。
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// 解析 ffprobe JSON，取第一个视频流
///
/// 返回的尺寸是 ffmpeg 自动旋转后的输出尺寸。
pub fn parse_probe_output(json: &[u8]) -> std::result::Result<StreamInfo, String> {
    let output: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no frame size".to_string()),
    };
    let (width, height) = if is_quarter_turn(stream.rotation()) {
        (height, width)
    } else {
        (width, height)
    };
    let frame_rate = [stream.avg_frame_rate, stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_frame_rate(&raw))
        .ok_or_else(|| "video stream has no frame rate".to_string())?;

    Ok(StreamInfo {
        width,
        height,
        frame_rate,
    })
}

/// ffmpeg 解码器
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl FfmpegDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
        }
    }

    fn probe(&self, path: &Path) -> Result<StreamInfo> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate:stream_tags=rotate:stream_side_data=rotation",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SyncError::open(path, format!("cannot run {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::open(
                path,
                format!("{} failed ({}): {}", self.ffprobe, output.status, stderr.trim()),
            ));
        }

        parse_probe_output(&output.stdout).map_err(|message| SyncError::open(path, message))
    }
}

impl FrameDecoder for FfmpegDecoder {
    type Stream = FfmpegStream;

    #[instrument(name = "ffmpeg_open", skip(self), fields(path = %path.display()))]
    fn open(&self, path: &Path) -> Result<Self::Stream> {
        let info = self.probe(path)?;

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map",
                "0:v:0",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-fps_mode",
                "passthrough",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SyncError::open(path, format!("cannot run {}: {e}", self.ffmpeg)))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SyncError::open(path, "ffmpeg stdout not captured"));
        };
        let mut stdout = BufReader::new(stdout);

        // 首次读取前不返回：选项或输入错误时 ffmpeg 立即退出，此时仍属于 open 失败
        let started = loop {
            match stdout.fill_buf() {
                Ok(buf) => break !buf.is_empty(),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SyncError::open(
                        path,
                        format!("reading {} output: {e}", self.ffmpeg),
                    ));
                }
            }
        };
        if !started {
            let status = child
                .wait()
                .map_err(|e| SyncError::open(path, format!("waiting for {}: {e}", self.ffmpeg)))?;
            if !status.success() {
                return Err(SyncError::open(
                    path,
                    format!("{} exited with {status} before the first frame", self.ffmpeg),
                ));
            }
        }

        debug!(
            width = info.width,
            height = info.height,
            frame_rate = info.frame_rate,
            "ffmpeg decoder started"
        );
        Ok(FfmpegStream {
            child,
            stdout,
            info,
            next_index: 0,
            finished: !started,
        })
    }
}

/// ffmpeg 解码句柄
#[derive(Debug)]
pub struct FfmpegStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: StreamInfo,
    next_index: u64,
    finished: bool,
}

impl FfmpegStream {
    /// 读满一帧；返回实际读取的字节数
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SyncError::io("reading decoded frames", e)),
            }
        }
        Ok(filled)
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| SyncError::io("waiting for ffmpeg", e))?;
        if status.success() {
            Ok(())
        } else {
            Err(SyncError::decode(format!(
                "ffmpeg exited with {status} after {} frames",
                self.next_index
            )))
        }
    }
}

impl FrameStream for FfmpegStream {
    fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.finished {
            return Ok(None);
        }

        let len = DecodedFrame::expected_len(self.info.width, self.info.height);
        let mut buf = vec![0u8; len];
        let filled = self.fill(&mut buf)?;

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < len {
            self.finished = true;
            return Err(SyncError::decode(format!(
                "truncated frame {}: {filled} of {len} bytes",
                self.next_index
            )));
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(DecodedFrame {
            index,
            width: self.info.width,
            height: self.info.height,
            data: Bytes::from(buf),
        }))
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        // 已正常 wait 的子进程无需再处理
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "Failed to kill ffmpeg");
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "programs": [],
            "streams": [
                { "width": 1920, "height": 1080, "avg_frame_rate": "0/0", "r_frame_rate": "60000/1001" }
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.frame_rate - 59.94).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_without_stream() {
        let err = parse_probe_output(br#"{ "streams": [] }"#).unwrap_err();
        assert!(err.contains("no video stream"));
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn test_parse_probe_swaps_size_for_quarter_turn() {
        let json = br#"{
            "streams": [
                {
                    "width": 1920, "height": 1080, "avg_frame_rate": "30/1",
                    "side_data_list": [ { "side_data_type": "Display Matrix", "rotation": -90 } ]
                }
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(DecodedFrame::expected_len(info.width, info.height), 1920 * 1080 * 3);
    }

    #[test]
    fn test_parse_probe_rotate_tag() {
        let rotated = br#"{ "streams": [ { "width": 640, "height": 480, "avg_frame_rate": "25/1", "tags": { "rotate": "270" } } ] }"#;
        let info = parse_probe_output(rotated).unwrap();
        assert_eq!((info.width, info.height), (480, 640));

        let upside_down = br#"{ "streams": [ { "width": 640, "height": 480, "avg_frame_rate": "25/1", "tags": { "rotate": "180" } } ] }"#;
        let info = parse_probe_output(upside_down).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
    }

    #[test]
    fn test_quarter_turn() {
        assert!(is_quarter_turn(90.0));
        assert!(is_quarter_turn(-90.0));
        assert!(is_quarter_turn(270.0));
        assert!(!is_quarter_turn(0.0));
        assert!(!is_quarter_turn(-180.0));
        assert!(!is_quarter_turn(360.0));
    }

    #[test]
    fn test_missing_binary_is_open_error() {
        let decoder = FfmpegDecoder::new(&DecoderConfig {
            ffmpeg: "telemetry-sync-no-such-ffmpeg".into(),
            ffprobe: "telemetry-sync-no-such-ffprobe".into(),
        });
        let err = decoder.open(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, SyncError::Open { .. }), "got: {err}");
    }

    #[cfg(unix)]
    mod fake_binaries {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        const PROBE_2X2: &str = r#"{"streams":[{"width":2,"height":2,"avg_frame_rate":"30/1"}]}"#;

        fn script(dir: &TempDir, name: &str, body: &str) -> String {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        fn decoder(dir: &TempDir, probe_json: &str, ffmpeg_body: &str) -> FfmpegDecoder {
            FfmpegDecoder::new(&DecoderConfig {
                ffprobe: script(dir, "ffprobe", &format!("echo '{probe_json}'")),
                ffmpeg: script(dir, "ffmpeg", ffmpeg_body),
            })
        }

        #[test]
        fn test_ffmpeg_failing_before_first_frame_is_open_error() {
            let dir = tempfile::tempdir().unwrap();
            let decoder = decoder(&dir, PROBE_2X2, "echo 'Unrecognized option fps_mode' >&2; exit 1");

            let err = decoder.open(Path::new("clip.mp4")).unwrap_err();
            assert!(matches!(err, SyncError::Open { .. }), "got: {err}");
            assert!(err.to_string().contains("before the first frame"), "got: {err}");
        }

        #[test]
        fn test_frames_are_read_from_pipe() {
            let dir = tempfile::tempdir().unwrap();
            // 两帧 2x2 rgb24 = 24 字节
            let decoder = decoder(&dir, PROBE_2X2, "printf '%024d' 0");

            let mut stream = decoder.open(Path::new("clip.mp4")).unwrap();
            assert_eq!(stream.frame_rate(), 30.0);
            let first = stream.next_frame().unwrap().unwrap();
            let second = stream.next_frame().unwrap().unwrap();
            assert_eq!((first.index, second.index), (0, 1));
            assert_eq!(first.data.len(), 12);
            assert!(stream.next_frame().unwrap().is_none());
            assert!(stream.next_frame().unwrap().is_none());
        }

        #[test]
        fn test_rotated_frames_use_display_size() {
            let dir = tempfile::tempdir().unwrap();
            let probe = r#"{"streams":[{"width":4,"height":2,"avg_frame_rate":"30/1","side_data_list":[{"rotation":90}]}]}"#;
            let decoder = decoder(&dir, probe, "printf '%024d' 0");

            let mut stream = decoder.open(Path::new("clip.mp4")).unwrap();
            let frame = stream.next_frame().unwrap().unwrap();
            assert_eq!((frame.width, frame.height), (2, 4));
        }

        #[test]
        fn test_empty_successful_output_has_no_frames() {
            let dir = tempfile::tempdir().unwrap();
            let decoder = decoder(&dir, PROBE_2X2, "exit 0");

            let mut stream = decoder.open(Path::new("clip.mp4")).unwrap();
            assert!(stream.next_frame().unwrap().is_none());
        }

        #[test]
        fn test_truncated_frame_is_decode_error() {
            let dir = tempfile::tempdir().unwrap();
            let decoder = decoder(&dir, PROBE_2X2, "printf '%018d' 0");

            let mut stream = decoder.open(Path::new("clip.mp4")).unwrap();
            assert!(stream.next_frame().unwrap().is_some());
            let err = stream.next_frame().unwrap_err();
            assert!(matches!(err, SyncError::Decode { .. }), "got: {err}");
        }
    }
}

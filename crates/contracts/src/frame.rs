//! FrameRecord / DecodedFrame - Frame Extractor 与 Synthesizer 的数据结构

use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 默认帧路径列名
pub const DEFAULT_FRAME_PATH_COLUMN: &str = "Frame";

/// 默认帧时间戳列名
pub const DEFAULT_FRAME_TIMESTAMP_COLUMN: &str = "Image Timestamp [s]";

/// 已抽取帧及其合成时间戳
///
/// 由 Frame Timestamp Synthesizer 创建，被 Asof Merger 消费一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// 图像文件路径
    pub path: PathBuf,

    /// 合成时间戳 (seconds)
    pub timestamp: f64,
}

/// 解码后的视频帧
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// 解码序号 (从 0 开始)
    pub index: u64,

    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// RGB8 像素数据，长度 = width * height * 3
    pub data: Bytes,
}

impl DecodedFrame {
    /// RGB8 帧应有的字节数
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

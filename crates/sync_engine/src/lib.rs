//! # Sync Engine
//!
//! 时间对齐引擎。
//!
//! 负责：
//! - Asof 最近邻合并（平局取较小时间戳）
//! - 合成帧时间戳（均匀铺满传感器时间轴）
//! - GPS / ACCL / GYRO 与视频帧的逐级对齐
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::TimeAlignmentEngine;
//!
//! let engine = TimeAlignmentEngine::default();
//! let sensors = engine.combine_streams(gps, accl, gyro)?;
//! let aligned = engine.attach_frames(sensors, frame_paths)?;
//! ```

mod asof;
mod engine;
mod synthesizer;

pub use asof::{nearest_index, AsofMerger, MergeOn, MergeStats, Merged, LEFT_SUFFIX, RIGHT_SUFFIX};
pub use engine::{AlignmentColumns, FrameAlignment, TimeAlignmentEngine};
pub use synthesizer::{frame_table, linspace, synthesize_timestamps};

//! Frame Timestamp Synthesizer
//!
//! 抽帧文件不带采集时间，按均匀间隔把 M 帧铺满 `[0, max_sensor_time]`。
//! 前提是视频时长与传感器记录时长一致（已知近似，不做校正）。

use std::path::PathBuf;

use contracts::{ColumnKind, ColumnSpec, FrameRecord, Result, Schema, TimeSeriesTable, Value};
use tracing::debug;

/// `count` evenly spaced points over `[0, end]`, both ends included.
///
/// - `count == 0` → empty
/// - `count == 1` → `[0.0]`
/// - otherwise the last point is exactly `end`
pub fn linspace(end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = count - 1;
            let step = end / last as f64;
            (0..count)
                .map(|i| if i == last { end } else { i as f64 * step })
                .collect()
        }
    }
}

/// Pair each frame path (already in temporal order) with its synthetic timestamp
pub fn synthesize_timestamps(paths: Vec<PathBuf>, max_sensor_time: f64) -> Vec<FrameRecord> {
    let timestamps = linspace(max_sensor_time, paths.len());
    let records: Vec<FrameRecord> = paths
        .into_iter()
        .zip(timestamps)
        .map(|(path, timestamp)| FrameRecord { path, timestamp })
        .collect();

    debug!(
        frames = records.len(),
        max_sensor_time, "Synthetic frame timestamps assigned"
    );
    records
}

/// Two-column table (`path_column`, `timestamp_column`) ready for the asof merge
pub fn frame_table(
    records: &[FrameRecord],
    path_column: &str,
    timestamp_column: &str,
) -> Result<TimeSeriesTable> {
    let schema = Schema::new(vec![
        ColumnSpec::new(path_column, ColumnKind::Text),
        ColumnSpec::new(timestamp_column, ColumnKind::Float),
    ]);
    let rows = records
        .iter()
        .map(|r| {
            vec![
                Value::Text(r.path.display().to_string()),
                Value::Float(r.timestamp),
            ]
        })
        .collect();
    TimeSeriesTable::from_rows("frames", schema, rows)
}

//! Time alignment engine: sensor stream fusion and frame attachment.

use std::path::PathBuf;

use contracts::{FrameRecord, Result, TimeSeriesTable};
use tracing::{info, instrument};

use crate::asof::{AsofMerger, MergeOn, MergeStats};
use crate::synthesizer::{frame_table, synthesize_timestamps};

/// Column layout the engine aligns on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentColumns {
    /// Sensor merge key
    pub merge_key: String,
    /// Frame path column
    pub frame_path: String,
    /// Frame synthetic timestamp column
    pub frame_timestamp: String,
}

impl Default for AlignmentColumns {
    fn default() -> Self {
        Self {
            merge_key: contracts::DEFAULT_MERGE_KEY.to_string(),
            frame_path: contracts::DEFAULT_FRAME_PATH_COLUMN.to_string(),
            frame_timestamp: contracts::DEFAULT_FRAME_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

/// Frames attached to the sensor table
#[derive(Debug, Clone)]
pub struct FrameAlignment {
    pub table: TimeSeriesTable,
    pub records: Vec<FrameRecord>,
    pub stats: MergeStats,
}

/// Time alignment engine
///
/// GPS is always the left-most table, so every output keeps the GPS row count.
#[derive(Debug, Clone, Default)]
pub struct TimeAlignmentEngine {
    columns: AlignmentColumns,
}

impl TimeAlignmentEngine {
    pub fn new(columns: AlignmentColumns) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &AlignmentColumns {
        &self.columns
    }

    /// GPS asof ACCL, then the result asof GYRO.
    #[instrument(
        name = "combine_streams",
        skip_all,
        fields(gps_rows = gps.len(), accl_rows = accl.len(), gyro_rows = gyro.len())
    )]
    pub fn combine_streams(
        &self,
        gps: TimeSeriesTable,
        accl: TimeSeriesTable,
        gyro: TimeSeriesTable,
    ) -> Result<TimeSeriesTable> {
        let merger = AsofMerger::new(MergeOn::same(self.columns.merge_key.as_str()));

        let with_accl = merger.merge(gps, accl)?;
        let with_gyro = merger.merge(with_accl.table, gyro)?;

        info!(
            rows = with_gyro.table.len(),
            columns = with_gyro.table.schema().len(),
            accl_max_distance = with_accl.stats.max_distance,
            gyro_max_distance = with_gyro.stats.max_distance,
            "Sensor streams combined"
        );
        Ok(with_gyro.table)
    }

    /// End of the sensor timeline; an empty table spans `[0, 0]`.
    pub fn sensor_timeline_end(&self, sensors: &TimeSeriesTable) -> Result<f64> {
        Ok(sensors.max_key(&self.columns.merge_key)?.unwrap_or(0.0))
    }

    /// Give each frame path a synthetic timestamp and asof-merge the frames onto
    /// the sensor table.
    ///
    /// `frame_paths` must already be in temporal order.
    #[instrument(
        name = "attach_frames",
        skip_all,
        fields(sensor_rows = sensors.len(), frames = frame_paths.len())
    )]
    pub fn attach_frames(
        &self,
        sensors: TimeSeriesTable,
        frame_paths: Vec<PathBuf>,
    ) -> Result<FrameAlignment> {
        let end = self.sensor_timeline_end(&sensors)?;
        let records = synthesize_timestamps(frame_paths, end);
        let frames = frame_table(
            &records,
            &self.columns.frame_path,
            &self.columns.frame_timestamp,
        )?;

        let merged = AsofMerger::new(MergeOn::new(
            self.columns.merge_key.as_str(),
            self.columns.frame_timestamp.as_str(),
        ))
        .merge(sensors, frames)?;

        info!(
            rows = merged.table.len(),
            frames = records.len(),
            timeline_end = end,
            max_distance = merged.stats.max_distance,
            "Frames attached"
        );
        Ok(FrameAlignment {
            table: merged.table,
            records,
            stats: merged.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ColumnKind, ColumnSpec, Schema, Value, DEFAULT_MERGE_KEY};

    fn stream(name: &str, column: &str, keys: &[f64]) -> TimeSeriesTable {
        let schema = Schema::new(vec![
            ColumnSpec::new(DEFAULT_MERGE_KEY, ColumnKind::Float),
            ColumnSpec::new(column, ColumnKind::Float),
        ]);
        let rows = keys
            .iter()
            .map(|k| vec![Value::Float(*k), Value::Float(k * 10.0)])
            .collect();
        TimeSeriesTable::from_rows(name, schema, rows).unwrap()
    }

    fn frame_paths(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("frames/frame_{i:06}.jpeg")))
            .collect()
    }

    #[test]
    fn test_combine_keeps_gps_cardinality() {
        let engine = TimeAlignmentEngine::default();
        let gps = stream("gps", "lat", &[0.0, 0.5, 1.0, 1.5]);
        let accl = stream("accl", "ax", &[0.0, 0.25, 0.75, 1.25, 1.75]);
        let gyro = stream("gyro", "wx", &[0.2, 1.2]);

        let combined = engine.combine_streams(gps, accl, gyro).unwrap();
        assert_eq!(combined.len(), 4);
        assert_eq!(
            combined.schema().names().collect::<Vec<_>>(),
            vec![DEFAULT_MERGE_KEY, "lat", "ax", "wx"]
        );
        // 0.5 is equidistant from 0.25 and 0.75
        assert_eq!(combined.get(1, "ax"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_attach_frames_spans_timeline() {
        let engine = TimeAlignmentEngine::default();
        let sensors = stream("gps", "lat", &[0.0, 3.0, 4.4, 9.0]);

        let aligned = engine.attach_frames(sensors, frame_paths(4)).unwrap();
        let ts: Vec<f64> = aligned.records.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![0.0, 3.0, 6.0, 9.0]);

        let table = aligned.table;
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.schema().names().collect::<Vec<_>>(),
            vec![DEFAULT_MERGE_KEY, "lat", "Frame", "Image Timestamp [s]"]
        );
        assert_eq!(
            table.get(2, "Frame"),
            Some(&Value::Text("frames/frame_000001.jpeg".into()))
        );
        assert_eq!(table.get(3, "Image Timestamp [s]"), Some(&Value::Float(9.0)));
    }

    #[test]
    fn test_attach_no_frames_leaves_missing() {
        let engine = TimeAlignmentEngine::default();
        let sensors = stream("gps", "lat", &[0.0, 1.0]);

        let aligned = engine.attach_frames(sensors, Vec::new()).unwrap();
        assert!(aligned.records.is_empty());
        assert_eq!(aligned.stats.unmatched, 2);
        assert_eq!(aligned.table.get(0, "Frame"), Some(&Value::Missing));
    }

    #[test]
    fn test_empty_sensor_table_timeline() {
        let engine = TimeAlignmentEngine::default();
        let sensors = stream("gps", "lat", &[]);
        assert_eq!(engine.sensor_timeline_end(&sensors).unwrap(), 0.0);

        let aligned = engine.attach_frames(sensors, frame_paths(3)).unwrap();
        assert!(aligned.table.is_empty());
        assert!(aligned.records.iter().all(|r| r.timestamp == 0.0));
    }
}

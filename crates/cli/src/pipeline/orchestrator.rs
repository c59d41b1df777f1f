//! Pipeline orchestrator - coordinates all components.
//!
//! Stage order: load streams → merge sensors → extract frames → synthesize
//! timestamps and attach frames → write output. Any stage error aborts the run
//! before the output file is created.

use std::path::Path;
use std::time::Instant;

use contracts::{FileSystemProvider, FrameDecoder, Result, SyncConfig, TimeSeriesTable};
use frame_extractor::FrameExtractor;
use ingestion::{SensorStreams, StreamKind, StreamLoader};
use observability::RunningStats;
use sync_engine::{AlignmentColumns, TimeAlignmentEngine};
use tracing::{info, instrument};

use super::{PipelineStats, StreamStats};

/// Pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Loaded and validated sync configuration
    pub sync: SyncConfig,

    /// Inspect inputs only; no frames, no output file
    pub dry_run: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline<'a, F: FileSystemProvider, D: FrameDecoder> {
    fs: &'a F,
    decoder: &'a D,
    config: PipelineConfig,
}

impl<'a, F: FileSystemProvider, D: FrameDecoder> Pipeline<'a, F, D> {
    /// Create a new pipeline over the given providers
    pub fn new(fs: &'a F, decoder: &'a D, config: PipelineConfig) -> Self {
        Self {
            fs,
            decoder,
            config,
        }
    }

    /// Run the pipeline to completion
    #[instrument(
        name = "pipeline_run",
        skip(self),
        fields(
            data_dir = %data_dir.display(),
            video = %video.display(),
            dry_run = self.config.dry_run
        )
    )]
    pub fn run(&self, data_dir: &Path, video: &Path) -> Result<PipelineStats> {
        let started = Instant::now();
        let sync = &self.config.sync;
        let mut stats = PipelineStats::new(data_dir, video, self.config.dry_run);

        // 1. Locate every stream, then parse them
        let loader = StreamLoader::new(self.fs, sync.selectors.clone());
        let streams = stats.timed("load", || loader.load(data_dir))?;
        stats.streams = StreamKind::ALL
            .iter()
            .map(|&kind| StreamStats {
                stream: kind.label(),
                rows: streams.get(kind).len(),
            })
            .collect();

        // 2. GPS asof ACCL asof GYRO
        let engine = TimeAlignmentEngine::new(AlignmentColumns {
            merge_key: sync.merge_key.clone(),
            frame_path: sync.frames.path_column.clone(),
            frame_timestamp: sync.frames.timestamp_column.clone(),
        });
        let SensorStreams { gps, accl, gyro } = streams;
        let combined = stats.timed("merge_sensors", || engine.combine_streams(gps, accl, gyro))?;
        stats.combined_rows = combined.len();
        stats.combined_columns = combined.schema().len();

        let extractor = FrameExtractor::new(self.fs, self.decoder, sync.frames.clone());

        if self.config.dry_run {
            let probe = stats.timed("probe_video", || extractor.probe(video))?;
            stats.native_fps = Some(probe.native_fps);
            stats.frame_interval = Some(probe.interval);
            stats.finish(started.elapsed());
            info!(
                rows = stats.combined_rows,
                native_fps = probe.native_fps,
                interval = probe.interval,
                "Dry run complete"
            );
            return Ok(stats);
        }

        // 3. Sample the video
        let frames_dir = data_dir.join(&sync.frames.dir_name);
        let report = stats.timed("extract_frames", || extractor.extract(video, &frames_dir))?;
        stats.native_fps = Some(report.native_fps);
        stats.frame_interval = Some(report.interval);
        stats.frames_decoded = report.decoded;
        stats.frames_extracted = report.kept();

        // 4. Synthetic timestamps + asof merge onto the sensor rows
        let aligned = stats.timed("attach_frames", || {
            engine.attach_frames(combined, report.frames)
        })?;
        stats.combined_columns = aligned.table.schema().len();
        stats.frame_offset_s = frame_offsets(&aligned.table, engine.columns()).summary();

        // 5. Output appears only once complete
        let output = data_dir.join(&sync.output_file);
        stats.timed("write_output", || self.fs.write_table(&output, &aligned.table))?;
        stats.output = Some(output);
        stats.finish(started.elapsed());

        info!(
            rows = aligned.table.len(),
            columns = stats.combined_columns,
            frames = stats.frames_extracted,
            output = ?stats.output,
            total_ms = stats.total_ms,
            "Pipeline complete"
        );
        Ok(stats)
    }
}

/// Distance between each row's sample time and its attached frame timestamp
fn frame_offsets(table: &TimeSeriesTable, columns: &AlignmentColumns) -> RunningStats {
    let (Some(keys), Some(frames)) = (
        table.column_values(&columns.merge_key),
        table.column_values(&columns.frame_timestamp),
    ) else {
        return RunningStats::default();
    };

    keys.iter()
        .zip(frames)
        .filter_map(|(key, frame)| Some((key.as_f64()? - frame.as_f64()?).abs()))
        .collect()
}

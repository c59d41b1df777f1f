//! Pipeline statistics and metrics.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use observability::{record_stage_duration, StatsSummary};
use serde::Serialize;

/// Rows parsed from one sensor stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStats {
    pub stream: &'static str,
    pub rows: usize,
}

/// Wall time of one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration_ms: f64,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub data_dir: PathBuf,
    pub video: PathBuf,

    /// Inputs were only inspected, nothing was written
    pub dry_run: bool,

    /// Rows per sensor stream, in merge order
    pub streams: Vec<StreamStats>,

    /// Rows of the merged table (= GPS rows)
    pub combined_rows: usize,

    /// Columns of the final table
    pub combined_columns: usize,

    /// Native video frame rate
    pub native_fps: Option<f64>,

    /// Frame sampling interval N
    pub frame_interval: Option<u64>,

    /// Frames pulled from the decoder
    pub frames_decoded: u64,

    /// Images written
    pub frames_extracted: usize,

    /// |sample time - frame timestamp| over the final rows (seconds)
    pub frame_offset_s: StatsSummary,

    /// Written output table
    pub output: Option<PathBuf>,

    pub stages: Vec<StageTiming>,

    /// Total duration of the pipeline run (ms)
    pub total_ms: f64,
}

impl PipelineStats {
    pub fn new(data_dir: &Path, video: &Path, dry_run: bool) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            video: video.to_path_buf(),
            dry_run,
            ..Default::default()
        }
    }

    /// Run one stage, recording its duration whether it succeeds or not
    pub fn timed<T, E>(
        &mut self,
        stage: &'static str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let started = Instant::now();
        let result = f();
        let elapsed = started.elapsed();

        record_stage_duration(stage, elapsed);
        self.stages.push(StageTiming {
            stage,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        });
        result
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.total_ms = elapsed.as_secs_f64() * 1000.0;
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Telemetry Sync Summary ===\n");

        println!("Inputs");
        println!("   ├─ Data directory: {}", self.data_dir.display());
        println!("   ├─ Video: {}", self.video.display());
        for stream in &self.streams {
            println!("   ├─ {} rows: {}", stream.stream, stream.rows);
        }
        println!(
            "   └─ Merged table: {} rows x {} columns",
            self.combined_rows, self.combined_columns
        );

        println!("\nFrames");
        match self.native_fps {
            Some(fps) => println!("   ├─ Native frame rate: {fps:.3} fps"),
            None => println!("   ├─ Native frame rate: N/A"),
        }
        match self.frame_interval {
            Some(interval) => println!("   ├─ Interval: every {interval} frame(s)"),
            None => println!("   ├─ Interval: N/A"),
        }
        println!(
            "   ├─ Decoded / extracted: {} / {}",
            self.frames_decoded, self.frames_extracted
        );
        println!("   └─ Row-to-frame offset (s): {}", self.frame_offset_s);

        println!("\nTimings");
        for stage in &self.stages {
            println!("   ├─ {}: {:.1} ms", stage.stage, stage.duration_ms);
        }
        println!("   └─ Total: {:.1} ms", self.total_ms);

        println!();
        match &self.output {
            Some(path) => println!("Combined and synced data saved to {}", path.display()),
            None => println!("Dry run: no frames or output written"),
        }
    }
}

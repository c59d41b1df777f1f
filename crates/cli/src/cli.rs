//! CLI argument definitions using clap.

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use contracts::SyncError;
use std::path::PathBuf;

/// Telemetry Sync - align GPS/ACCL/GYRO streams with sampled video frames
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-sync",
    author,
    version,
    about = "Align telemetry CSV streams with frames sampled from a companion video",
    long_about = "Locates the GPS, accelerometer and gyroscope CSV files in DATA_DIR, merges them \n\
                  on their sample time by nearest match, extracts about 6 frames per second from \n\
                  VIDEO into DATA_DIR/frames and writes DATA_DIR/combined_metrics.csv."
)]
pub struct Cli {
    /// Directory holding the *_GPS9/ACCL/GYRO_sample_final.csv files
    pub data_dir: PathBuf,

    /// Companion video file
    pub video: PathBuf,

    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "TELEMETRY_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "TELEMETRY_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        env = "TELEMETRY_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Load and merge the sensor streams and probe the video, writing nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Exit code for a failed parse: help and version succeed, the rest is an argument error
pub fn parse_error_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        kind => SyncError::argument(kind.to_string()).exit_code(),
    }
}

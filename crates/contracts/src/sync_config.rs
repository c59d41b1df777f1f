//! SyncConfig - Config Loader output
//!
//! Every field has a default reproducing the fixed pipeline behaviour, so an
//! empty config file (or none at all) yields a valid configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DEFAULT_FRAME_PATH_COLUMN, DEFAULT_FRAME_TIMESTAMP_COLUMN, DEFAULT_MERGE_KEY};

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyncConfig {
    /// Shared timestamp column of the sensor streams
    #[validate(length(min = 1))]
    pub merge_key: String,

    /// Output CSV file name, written inside the data directory
    #[validate(length(min = 1))]
    pub output_file: String,

    /// Filename selectors for the three sensor streams
    #[validate(nested)]
    pub selectors: SelectorConfig,

    /// Frame extraction settings
    #[validate(nested)]
    pub frames: FrameConfig,

    /// Decoder backend settings
    #[validate(nested)]
    pub decoder: DecoderConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            merge_key: DEFAULT_MERGE_KEY.to_string(),
            output_file: "combined_metrics.csv".to_string(),
            selectors: SelectorConfig::default(),
            frames: FrameConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Filename substrings locating each stream inside the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SelectorConfig {
    #[validate(length(min = 1))]
    pub gps: String,
    #[validate(length(min = 1))]
    pub accl: String,
    #[validate(length(min = 1))]
    pub gyro: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            gps: "GPS9_sample_final.csv".to_string(),
            accl: "ACCL_sample_final.csv".to_string(),
            gyro: "GYRO_sample_final.csv".to_string(),
        }
    }
}

/// Frame extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FrameConfig {
    /// Sub-directory of the data directory receiving the images
    #[validate(length(min = 1))]
    pub dir_name: String,

    /// Approximate number of frames kept per second of video
    #[validate(range(exclusive_min = 0.0))]
    pub target_fps: f64,

    /// JPEG encoder quality (1-100)
    #[validate(range(min = 1, max = 100))]
    pub jpeg_quality: u8,

    /// Output column holding the image path
    #[validate(length(min = 1))]
    pub path_column: String,

    /// Output column holding the synthetic timestamp
    #[validate(length(min = 1))]
    pub timestamp_column: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            dir_name: "frames".to_string(),
            target_fps: 6.0,
            jpeg_quality: 95,
            path_column: DEFAULT_FRAME_PATH_COLUMN.to_string(),
            timestamp_column: DEFAULT_FRAME_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

/// External decoder binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DecoderConfig {
    #[validate(length(min = 1))]
    pub ffmpeg: String,
    #[validate(length(min = 1))]
    pub ffprobe: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

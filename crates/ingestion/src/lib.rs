//! # Ingestion
//!
//! Sensor stream ingestion module.
//!
//! Responsibilities:
//! - Locate the GPS / accelerometer / gyroscope CSV files by filename selector
//! - Parse each file into a `TimeSeriesTable` with an inferred schema
//! - Provide the local, `csv`-backed `FileSystemProvider`
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{LocalFileSystem, StreamLoader};
//! use contracts::SelectorConfig;
//!
//! let fs = LocalFileSystem::new();
//! let loader = StreamLoader::new(&fs, SelectorConfig::default());
//! let streams = loader.load(Path::new("/data/run1"))?;
//! println!("gps rows: {}", streams.gps.len());
//! ```

mod loader;
mod local_fs;

// Re-exports
pub use contracts::{FileSystemProvider, TimeSeriesTable};
pub use loader::{LocatedStreams, SensorStreams, StreamKind, StreamLoader};
pub use local_fs::LocalFileSystem;

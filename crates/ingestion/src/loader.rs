//! Stream Loader - locate and parse the three sensor streams.

use std::fmt;
use std::path::{Path, PathBuf};

use contracts::{FileSystemProvider, Result, SelectorConfig, SyncError, TimeSeriesTable};
use tracing::{info, instrument, warn};

/// Sensor stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Position (GPS)
    Gps,
    /// Acceleration
    Accl,
    /// Angular rate
    Gyro,
}

impl StreamKind {
    /// Merge order: GPS is always the left-most table
    pub const ALL: [StreamKind; 3] = [StreamKind::Gps, StreamKind::Accl, StreamKind::Gyro];

    /// Short label used as table name and metric label
    pub fn label(self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Accl => "accl",
            Self::Gyro => "gyro",
        }
    }

    /// Filename substring selecting this stream
    pub fn selector(self, selectors: &SelectorConfig) -> &str {
        match self {
            Self::Gps => &selectors.gps,
            Self::Accl => &selectors.accl,
            Self::Gyro => &selectors.gyro,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolved file path per stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedStreams {
    pub gps: PathBuf,
    pub accl: PathBuf,
    pub gyro: PathBuf,
}

impl LocatedStreams {
    pub fn path(&self, kind: StreamKind) -> &Path {
        match kind {
            StreamKind::Gps => &self.gps,
            StreamKind::Accl => &self.accl,
            StreamKind::Gyro => &self.gyro,
        }
    }
}

/// Parsed sensor streams, unsorted
#[derive(Debug, Clone)]
pub struct SensorStreams {
    pub gps: TimeSeriesTable,
    pub accl: TimeSeriesTable,
    pub gyro: TimeSeriesTable,
}

impl SensorStreams {
    pub fn get(&self, kind: StreamKind) -> &TimeSeriesTable {
        match kind {
            StreamKind::Gps => &self.gps,
            StreamKind::Accl => &self.accl,
            StreamKind::Gyro => &self.gyro,
        }
    }
}

/// Stream Loader
///
/// Resolves one file per stream kind inside a data directory and parses it.
///
/// Selection policy when several files match a selector: directory entries are
/// taken in lexical order (the provider sorts them), the first match wins and
/// the ignored candidates are logged at `warn` level.
pub struct StreamLoader<'a, F: FileSystemProvider> {
    fs: &'a F,
    selectors: SelectorConfig,
}

impl<'a, F: FileSystemProvider> StreamLoader<'a, F> {
    pub fn new(fs: &'a F, selectors: SelectorConfig) -> Self {
        Self { fs, selectors }
    }

    /// Resolve the file of every stream without reading any of them.
    ///
    /// # Errors
    /// `SyncError::MissingInput` if the directory is absent or any selector
    /// matches no file.
    #[instrument(name = "stream_locate", skip(self), fields(dir = %dir.display()))]
    pub fn locate(&self, dir: &Path) -> Result<LocatedStreams> {
        let entries = self.fs.list_dir(dir)?;

        let gps = self.resolve(dir, &entries, StreamKind::Gps)?;
        let accl = self.resolve(dir, &entries, StreamKind::Accl)?;
        let gyro = self.resolve(dir, &entries, StreamKind::Gyro)?;

        Ok(LocatedStreams { gps, accl, gyro })
    }

    /// Locate and parse every stream.
    ///
    /// All three files are resolved before any of them is parsed.
    #[instrument(name = "stream_load", skip(self), fields(dir = %dir.display()))]
    pub fn load(&self, dir: &Path) -> Result<SensorStreams> {
        let located = self.locate(dir)?;

        let gps = self.read(&located, StreamKind::Gps)?;
        let accl = self.read(&located, StreamKind::Accl)?;
        let gyro = self.read(&located, StreamKind::Gyro)?;

        Ok(SensorStreams { gps, accl, gyro })
    }

    fn resolve(&self, dir: &Path, entries: &[String], kind: StreamKind) -> Result<PathBuf> {
        let selector = kind.selector(&self.selectors);
        let mut matches = entries.iter().filter(|name| name.contains(selector));

        let chosen = matches.next().ok_or_else(|| {
            SyncError::missing_input(format!("{kind} stream (*{selector}*)"), dir)
        })?;

        let ignored: Vec<&String> = matches.collect();
        if !ignored.is_empty() {
            warn!(
                stream = %kind,
                selector,
                chosen = %chosen,
                ignored = ?ignored,
                "Multiple files match selector, using the first in lexical order"
            );
        }

        Ok(dir.join(chosen))
    }

    fn read(&self, located: &LocatedStreams, kind: StreamKind) -> Result<TimeSeriesTable> {
        let path = located.path(kind);
        let table = self.fs.read_table(path, kind.label())?;

        metrics::counter!("telemetry_sync_rows_loaded_total", "stream" => kind.label())
            .increment(table.len() as u64);
        info!(
            stream = %kind,
            path = %path.display(),
            rows = table.len(),
            columns = table.schema().len(),
            "Sensor stream loaded"
        );
        Ok(table)
    }
}

//! FileSystemProvider trait - file-system collaborator
//!
//! Directory listing, existence checks, directory creation and CSV table I/O.
//! The pipeline touches the disk only through this trait (plus the image
//! writer of the frame extractor).

use std::path::Path;

use crate::{Result, TimeSeriesTable};

/// File-system provider
pub trait FileSystemProvider {
    /// File names (not paths) of the entries directly inside `dir`
    ///
    /// Implementations must return names in lexical order so that "first
    /// match" selection is reproducible.
    fn list_dir(&self, dir: &Path) -> Result<Vec<String>>;

    /// Check whether a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all of its parents; no-op when present
    fn create_dir_all(&self, dir: &Path) -> Result<()>;

    /// Read a CSV file into a table labeled `name`
    fn read_table(&self, path: &Path, name: &str) -> Result<TimeSeriesTable>;

    /// Write a table as CSV. The file must only become visible once complete.
    fn write_table(&self, path: &Path, table: &TimeSeriesTable) -> Result<()>;
}

//! LocalFileSystem - 本地磁盘 + CSV 实现
//!
//! 读取时推断列类型 (Integer / Float / Text)，写入时先写临时文件再原子重命名。

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use contracts::{
    ColumnKind, ColumnSpec, FileSystemProvider, Result, Schema, SyncError, TimeSeriesTable, Value,
};
use tracing::{debug, instrument};

/// 本地文件系统提供者
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemProvider for LocalFileSystem {
    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SyncError::missing_input("data directory", dir),
            _ => SyncError::io(format!("listing {}", dir.display()), e),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::io(format!("listing {}", dir.display()), e))?;
            // 非 UTF-8 文件名无法匹配 selector，直接跳过
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| SyncError::io(format!("creating directory {}", dir.display()), e))
    }

    #[instrument(name = "csv_read_table", skip(self), fields(path = %path.display()))]
    fn read_table(&self, path: &Path, name: &str) -> Result<TimeSeriesTable> {
        let file = fs::File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SyncError::missing_input(format!("{name} stream"), path),
            _ => SyncError::io(format!("opening {}", path.display()), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| SyncError::csv(path, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(SyncError::schema(name, header, "duplicate column name"));
            }
        }

        let records = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SyncError::csv(path, e.to_string()))?;

        let columns: Vec<ColumnSpec> = headers
            .into_iter()
            .enumerate()
            .map(|(idx, header)| {
                let kind = ColumnKind::infer(records.iter().map(|r| r.get(idx).unwrap_or("")));
                ColumnSpec::new(header, kind)
            })
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, spec)| Value::parse(record.get(idx).unwrap_or(""), spec.kind))
                    .collect()
            })
            .collect();

        let table = TimeSeriesTable::from_rows(name, Schema::new(columns), rows)?;
        debug!(
            rows = table.len(),
            columns = table.schema().len(),
            "CSV table parsed"
        );
        Ok(table)
    }

    #[instrument(name = "csv_write_table", skip(self, table), fields(path = %path.display(), rows = table.len()))]
    fn write_table(&self, path: &Path, table: &TimeSeriesTable) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // 写入同目录临时文件，完成后 rename，保证输出文件只在成功时出现
        let mut tmp = tempfile::Builder::new()
            .prefix(".combined-")
            .suffix(".csv.tmp")
            .tempfile_in(parent)
            .map_err(|e| SyncError::io(format!("creating temp file in {}", parent.display()), e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(tmp.as_file_mut());
            writer
                .write_record(table.schema().names())
                .map_err(|e| SyncError::csv(path, e.to_string()))?;

            let mut cells: Vec<String> = Vec::with_capacity(table.schema().len());
            for row in table.rows() {
                cells.clear();
                cells.extend(row.iter().map(Value::to_string));
                writer
                    .write_record(&cells)
                    .map_err(|e| SyncError::csv(path, e.to_string()))?;
            }
            writer
                .flush()
                .map_err(|e| SyncError::io(format!("flushing {}", path.display()), e))?;
        }

        tmp.persist(path)
            .map_err(|e| SyncError::io(format!("persisting {}", path.display()), e.error))?;
        Ok(())
    }
}

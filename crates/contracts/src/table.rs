//! TimeSeriesTable - Stream Loader / Asof Merger output
//!
//! Row-oriented table with an explicit, inferred column schema.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, SyncError};

/// Default merge key shared by every sensor stream
pub const DEFAULT_MERGE_KEY: &str = "Sample time [seg]";

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Whether values of this kind can act as a merge key
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Infer the narrowest kind that accepts every non-empty cell.
    ///
    /// All-empty columns are treated as `Float` so they stay numeric.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = None;
        for cell in cells.into_iter().map(str::trim).filter(|c| !c.is_empty()) {
            if kind != Some(Self::Float) && cell.parse::<i64>().is_ok() {
                kind.get_or_insert(Self::Integer);
            } else if cell.parse::<f64>().is_ok() {
                kind = Some(Self::Float);
            } else {
                return Self::Text;
            }
        }
        kind.unwrap_or(Self::Float)
    }
}

/// Single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Empty CSV cell, or a right-hand column with no matched row
    Missing,
}

impl Value {
    /// Parse a raw cell according to an already inferred column kind
    pub fn parse(raw: &str, kind: ColumnKind) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        match kind {
            ColumnKind::Integer => trimmed
                .parse()
                .map(Self::Integer)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
            ColumnKind::Float => trimmed
                .parse()
                .map(Self::Float)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
            ColumnKind::Text => Self::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) | Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// CSV rendering: floats keep a fractional part (`3.0`), NaN and missing cells are empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_nan() => Ok(()),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
            Self::Missing => Ok(()),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Time-ordered table of telemetry rows
///
/// Each row holds exactly one value per schema column, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    /// Table label used in logs and error messages (e.g. "gps")
    name: String,
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl TimeSeriesTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    /// Create a table from rows, checking every row against the schema width
    pub fn from_rows(
        name: impl Into<String>,
        schema: Schema,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(name, schema);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(SyncError::schema(
                &self.name,
                format!("row {}", self.rows.len()),
                format!(
                    "row has {} values, schema has {} columns",
                    row.len(),
                    self.schema.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Extract the merge key of every row.
    ///
    /// # Errors
    /// `SyncError::Schema` if the column is absent, not numeric, or any row
    /// holds a missing / non-finite key.
    pub fn key_values(&self, key: &str) -> Result<Vec<f64>> {
        let spec = self
            .schema
            .column(key)
            .ok_or_else(|| SyncError::schema(&self.name, key, "merge key column is absent"))?;
        if !spec.kind.is_numeric() {
            return Err(SyncError::schema(
                &self.name,
                key,
                format!("merge key column must be numeric, found {:?}", spec.kind),
            ));
        }
        let idx = self.schema.index_of(key).unwrap_or_default();

        self.rows
            .iter()
            .enumerate()
            .map(|(row, values)| match values[idx].as_f64() {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(SyncError::schema(
                    &self.name,
                    key,
                    format!("row {row} has no finite key value ('{}')", values[idx]),
                )),
            })
            .collect()
    }

    /// Largest key value, `None` for an empty table
    pub fn max_key(&self, key: &str) -> Result<Option<f64>> {
        let keys = self.key_values(key)?;
        Ok(keys.into_iter().reduce(f64::max))
    }

    /// Whether rows are already in ascending key order
    pub fn is_sorted_by_key(&self, key: &str) -> Result<bool> {
        let keys = self.key_values(key)?;
        Ok(keys.windows(2).all(|w| w[0] <= w[1]))
    }

    /// Stable ascending sort on the key column; returns the sorted keys.
    ///
    /// Rows with equal keys keep their relative order.
    pub fn sort_by_key(&mut self, key: &str) -> Result<Vec<f64>> {
        let keys = self.key_values(key)?;
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal));

        let mut slots: Vec<Option<Vec<Value>>> = std::mem::take(&mut self.rows)
            .into_iter()
            .map(Some)
            .collect();
        self.rows = order
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect();

        Ok(order.into_iter().map(|i| keys[i]).collect())
    }
}

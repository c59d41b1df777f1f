//! Nearest-key ("asof") merge of time-ordered tables.
//!
//! Matching policy:
//! - every left row is matched to the right row with the smallest
//!   `|right_key - left_key|`, with no distance cutoff
//! - equidistant candidates resolve to the lower key
//! - among equal right keys, the backward candidate is the last such row and
//!   the forward candidate the first such row (stable sort keeps file order)
//! - exact matches always take the backward candidate

use std::collections::HashSet;

use contracts::{ColumnSpec, Result, Schema, SyncError, TimeSeriesTable, Value};
use tracing::{debug, instrument};

/// Suffix appended to an overlapping left-hand column
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix appended to an overlapping right-hand column
pub const RIGHT_SUFFIX: &str = "_y";

/// Key columns aligning two tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOn {
    pub left: String,
    pub right: String,
}

impl MergeOn {
    /// Both tables share the same key column name
    pub fn same(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            left: key.clone(),
            right: key,
        }
    }

    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    fn shares_key(&self) -> bool {
        self.left == self.right
    }
}

/// Match quality of a single merge
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MergeStats {
    /// Output rows (always the left row count)
    pub rows: usize,
    /// Left rows left without a match (right table empty)
    pub unmatched: usize,
    /// Largest absolute key distance of a match (seconds)
    pub max_distance: f64,
    /// Mean absolute key distance over matched rows (seconds)
    pub mean_distance: f64,
}

/// Merge result
#[derive(Debug, Clone)]
pub struct Merged {
    pub table: TimeSeriesTable,
    pub stats: MergeStats,
}

/// Index of the key nearest to `target` in ascending `keys`.
///
/// Ties resolve to the lower key. Returns `None` only for an empty slice.
pub fn nearest_index(keys: &[f64], target: f64) -> Option<usize> {
    // first key >= target
    let forward = keys.partition_point(|&k| k < target);
    // last key <= target
    let backward = keys.partition_point(|&k| k <= target).checked_sub(1);
    let forward = (forward < keys.len()).then_some(forward);

    match (backward, forward) {
        (Some(b), Some(f)) if keys[f] - target < target - keys[b] => Some(f),
        (Some(b), _) => Some(b),
        (None, f) => f,
    }
}

/// Asof merger
///
/// Sorts both inputs on their key before matching; callers need not pre-sort.
#[derive(Debug, Clone)]
pub struct AsofMerger {
    on: MergeOn,
}

impl AsofMerger {
    pub fn new(on: MergeOn) -> Self {
        Self { on }
    }

    pub fn on(&self) -> &MergeOn {
        &self.on
    }

    /// Merge `right` into `left`, one output row per left row.
    ///
    /// # Errors
    /// `SyncError::Schema` when either key column is absent, non-numeric or
    /// holds a non-finite value.
    #[instrument(
        name = "asof_merge",
        skip(self, left, right),
        fields(
            left = %left.name(),
            right = %right.name(),
            left_rows = left.len(),
            right_rows = right.len()
        )
    )]
    pub fn merge(&self, mut left: TimeSeriesTable, mut right: TimeSeriesTable) -> Result<Merged> {
        let left_keys = left.sort_by_key(&self.on.left)?;
        let right_keys = right.sort_by_key(&self.on.right)?;

        let layout = ColumnLayout::build(left.schema(), right.schema(), &self.on)?;
        let name = format!("{}+{}", left.name(), right.name());
        let right_rows = right.into_rows();

        let mut rows = Vec::with_capacity(left_keys.len());
        let mut stats = MergeStats {
            rows: left_keys.len(),
            ..Default::default()
        };
        let mut distance_sum = 0.0;

        for (left_row, &key) in left.into_rows().into_iter().zip(&left_keys) {
            let mut row = left_row;
            row.reserve(layout.right_indices.len());

            match nearest_index(&right_keys, key) {
                Some(idx) => {
                    let distance = (right_keys[idx] - key).abs();
                    stats.max_distance = stats.max_distance.max(distance);
                    distance_sum += distance;
                    metrics::histogram!("telemetry_sync_merge_distance_s").record(distance);

                    let matched = &right_rows[idx];
                    row.extend(layout.right_indices.iter().map(|&i| matched[i].clone()));
                }
                None => {
                    stats.unmatched += 1;
                    row.extend(layout.right_indices.iter().map(|_| Value::Missing));
                }
            }
            rows.push(row);
        }

        let matched = stats.rows - stats.unmatched;
        if matched > 0 {
            stats.mean_distance = distance_sum / matched as f64;
        }

        let table = TimeSeriesTable::from_rows(name, layout.schema, rows)?;
        debug!(
            rows = stats.rows,
            unmatched = stats.unmatched,
            max_distance = stats.max_distance,
            mean_distance = stats.mean_distance,
            "Asof merge complete"
        );
        Ok(Merged { table, stats })
    }

    /// Fold several tables left to right on a shared key.
    ///
    /// The first table fixes the output cardinality.
    pub fn merge_all(
        key: &str,
        tables: impl IntoIterator<Item = TimeSeriesTable>,
    ) -> Result<TimeSeriesTable> {
        let merger = Self::new(MergeOn::same(key));
        let mut tables = tables.into_iter();
        let first = tables
            .next()
            .ok_or_else(|| SyncError::schema("<none>", key, "no tables to merge"))?;

        tables.try_fold(first, |acc, next| Ok(merger.merge(acc, next)?.table))
    }
}

/// Output schema plus the right-hand columns carried into it
struct ColumnLayout {
    schema: Schema,
    right_indices: Vec<usize>,
}

impl ColumnLayout {
    fn build(left: &Schema, right: &Schema, on: &MergeOn) -> Result<Self> {
        let right_names: HashSet<&str> = right.names().collect();
        let overlap: HashSet<&str> = left
            .names()
            .filter(|name| right_names.contains(name))
            .filter(|name| !(on.shares_key() && *name == on.left))
            .collect();

        let mut columns: Vec<ColumnSpec> = left
            .columns()
            .iter()
            .map(|c| suffixed(c, &overlap, LEFT_SUFFIX))
            .collect();

        let mut right_indices = Vec::new();
        for (idx, column) in right.columns().iter().enumerate() {
            if on.shares_key() && column.name == on.right {
                continue;
            }
            columns.push(suffixed(column, &overlap, RIGHT_SUFFIX));
            right_indices.push(idx);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(SyncError::schema(
                format!("{}+{}", on.left, on.right),
                &dup.name,
                "merged column name is ambiguous after suffixing",
            ));
        }

        Ok(Self {
            schema: Schema::new(columns),
            right_indices,
        })
    }
}

fn suffixed(column: &ColumnSpec, overlap: &HashSet<&str>, suffix: &str) -> ColumnSpec {
    if overlap.contains(column.name.as_str()) {
        ColumnSpec::new(format!("{}{suffix}", column.name), column.kind)
    } else {
        column.clone()
    }
}

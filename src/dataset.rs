//! In-memory row-oriented dataset.
//!
//! The dataset is the value passed between pipeline stages: an ordered,
//! row-indexed table where every operation yields a new dataset. Cells are
//! JSON values, so blocks can carry arbitrary column types without the
//! pipeline core caring about schemas.

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::error::BlockError;

/// A single row: column name to cell value, in insertion order.
pub type Row = Map<String, Value>;

/// An ordered, row-indexed, in-memory table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    /// An empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Contiguous row range `[start, end)`, clamped to the row count.
    pub fn slice(&self, start: usize, end: usize) -> Dataset {
        let start = start.min(self.rows.len());
        let end = end.clamp(start, self.rows.len());
        Dataset {
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Concatenate datasets; row order equals concatenation order.
    pub fn concat(parts: impl IntoIterator<Item = Dataset>) -> Dataset {
        let mut rows = Vec::new();
        for part in parts {
            rows.extend(part.rows);
        }
        Dataset { rows }
    }

    /// Per-row transform producing a new dataset of the same length.
    pub fn map<F>(&self, f: F) -> Dataset
    where
        F: Fn(&Row) -> Row,
    {
        Dataset {
            rows: self.rows.iter().map(f).collect(),
        }
    }

    /// Fallible per-row transform; the first failing row aborts the whole
    /// operation.
    pub fn try_map<F>(&self, f: F) -> Result<Dataset, BlockError>
    where
        F: Fn(&Row) -> Result<Row, BlockError>,
    {
        let rows = self
            .rows
            .iter()
            .map(f)
            .collect::<Result<Vec<_>, BlockError>>()?;
        Ok(Dataset { rows })
    }

    /// Keep only rows matching the predicate, preserving order.
    pub fn filter<F>(&self, f: F) -> Dataset
    where
        F: Fn(&Row) -> bool,
    {
        Dataset {
            rows: self.rows.iter().filter(|r| f(r)).cloned().collect(),
        }
    }

    /// Ordered union of column names across all rows (first-seen order).
    pub fn column_names(&self) -> Vec<String> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for row in &self.rows {
            for key in row.keys() {
                names.insert(key.as_str());
            }
        }
        names.into_iter().map(str::to_string).collect()
    }

    /// Whether any row carries the given column.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains_key(column))
    }
}

impl FromIterator<Row> for Dataset {
    fn from_iter<T: IntoIterator<Item = Row>>(iter: T) -> Self {
        Dataset {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str, value: i64) -> Row {
        let mut r = Row::new();
        r.insert(key.to_string(), json!(value));
        r
    }

    fn sample(n: i64) -> Dataset {
        (0..n).map(|i| row("foo", i)).collect()
    }

    #[test]
    fn test_slice_is_clamped() {
        let ds = sample(5);
        assert_eq!(ds.slice(3, 100).num_rows(), 2);
        assert_eq!(ds.slice(9, 12).num_rows(), 0);
        assert_eq!(ds.slice(0, 5), ds);
    }

    #[test]
    fn test_concat_preserves_order() {
        let ds = sample(6);
        let parts = vec![ds.slice(0, 2), ds.slice(2, 4), ds.slice(4, 6)];
        assert_eq!(Dataset::concat(parts), ds);
    }

    #[test]
    fn test_column_names_first_seen_order() {
        let mut a = row("foo", 1);
        a.insert("bar".to_string(), json!(2));
        let b = row("baz", 3);
        let ds = Dataset::from_rows(vec![a, b]);
        assert_eq!(ds.column_names(), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_try_map_aborts_on_error() {
        let ds = sample(3);
        let result = ds.try_map(|r| {
            if r["foo"] == json!(1) {
                Err(BlockError::generate("boom"))
            } else {
                Ok(r.clone())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_preserves_order() {
        let ds = sample(6);
        let even = ds.filter(|r| r["foo"].as_i64().unwrap() % 2 == 0);
        let values: Vec<i64> = even.rows().iter().map(|r| r["foo"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![0, 2, 4]);
    }
}

//! Column-manipulation utility blocks.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::dataset::{Dataset, Row};
use crate::error::BlockError;
use crate::registry::BlockInit;

use super::Block;

/// Renames columns according to an `old -> new` mapping.
#[derive(Debug)]
pub struct RenameColumnsBlock {
    name: String,
    columns_map: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RenameConfig {
    columns_map: IndexMap<String, String>,
}

impl RenameColumnsBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: RenameConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            columns_map: config.columns_map,
        })
    }
}

#[async_trait]
impl Block for RenameColumnsBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "RenameColumnsBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        for old in self.columns_map.keys() {
            if !dataset.is_empty() && !dataset.has_column(old) {
                return Err(BlockError::MissingColumn {
                    column: old.clone(),
                });
            }
        }
        dataset.try_map(|row| {
            let mut out = Row::new();
            for (key, value) in row {
                let key = self
                    .columns_map
                    .get(key)
                    .map(String::as_str)
                    .unwrap_or(key.as_str());
                out.insert(key.to_string(), value.clone());
            }
            Ok(out)
        })
    }
}

/// Copies columns according to an `existing -> copy` mapping.
pub struct DuplicateColumnsBlock {
    name: String,
    columns_map: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DuplicateConfig {
    columns_map: IndexMap<String, String>,
}

impl DuplicateColumnsBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: DuplicateConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            columns_map: config.columns_map,
        })
    }
}

#[async_trait]
impl Block for DuplicateColumnsBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "DuplicateColumnsBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        dataset.try_map(|row| {
            let mut out = row.clone();
            for (existing, copy) in &self.columns_map {
                let value = row.get(existing).ok_or_else(|| BlockError::MissingColumn {
                    column: existing.clone(),
                })?;
                out.insert(copy.clone(), value.clone());
            }
            Ok(out)
        })
    }
}

/// Joins the string forms of several columns into one output column.
pub struct CombineColumnsBlock {
    name: String,
    columns: Vec<String>,
    output_col: String,
    separator: String,
}

#[derive(Debug, Deserialize)]
struct CombineConfig {
    columns: Vec<String>,
    output_col: String,
    #[serde(default = "default_separator")]
    separator: String,
}

fn default_separator() -> String {
    "\n\n".to_string()
}

impl CombineColumnsBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: CombineConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            columns: config.columns,
            output_col: config.output_col,
            separator: config.separator,
        })
    }

    fn cell_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Block for CombineColumnsBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "CombineColumnsBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        dataset.try_map(|row| {
            let mut parts = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                let value = row.get(column).ok_or_else(|| BlockError::MissingColumn {
                    column: column.clone(),
                })?;
                parts.push(Self::cell_to_string(value));
            }
            let mut out = row.clone();
            out.insert(
                self.output_col.clone(),
                Value::String(parts.join(&self.separator)),
            );
            Ok(out)
        })
    }
}

/// Melts the configured columns into rows: each input row yields one output
/// row per column, carrying the column's name and its cell value. The
/// canonical row-expanding block.
pub struct FlattenColumnsBlock {
    name: String,
    var_cols: Vec<String>,
    var_name: String,
    value_name: String,
}

#[derive(Debug, Deserialize)]
struct FlattenConfig {
    var_cols: Vec<String>,
    var_name: String,
    value_name: String,
}

impl FlattenColumnsBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: FlattenConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            var_cols: config.var_cols,
            var_name: config.var_name,
            value_name: config.value_name,
        })
    }
}

#[async_trait]
impl Block for FlattenColumnsBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "FlattenColumnsBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        let mut rows = Vec::with_capacity(dataset.num_rows() * self.var_cols.len());
        for row in dataset.rows() {
            for column in &self.var_cols {
                let value = row
                    .get(column)
                    .ok_or_else(|| BlockError::MissingColumn {
                        column: column.clone(),
                    })?
                    .clone();
                let mut out = Row::new();
                for (key, cell) in row {
                    if !self.var_cols.contains(key) {
                        out.insert(key.clone(), cell.clone());
                    }
                }
                out.insert(self.var_name.clone(), Value::String(column.clone()));
                out.insert(self.value_name.clone(), value);
                rows.push(out);
            }
        }
        Ok(Dataset::from_rows(rows))
    }
}

/// Copies a column chosen per-row by a choice column into an output column.
pub struct SelectorBlock {
    name: String,
    choice_map: IndexMap<String, String>,
    choice_col: String,
    output_col: String,
}

#[derive(Debug, Deserialize)]
struct SelectorConfig {
    choice_map: IndexMap<String, String>,
    choice_col: String,
    output_col: String,
}

impl SelectorBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: SelectorConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            choice_map: config.choice_map,
            choice_col: config.choice_col,
            output_col: config.output_col,
        })
    }
}

#[async_trait]
impl Block for SelectorBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "SelectorBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        dataset.try_map(|row| {
            let choice = row
                .get(&self.choice_col)
                .ok_or_else(|| BlockError::MissingColumn {
                    column: self.choice_col.clone(),
                })?;
            let choice = choice.as_str().ok_or_else(|| {
                BlockError::generate(format!(
                    "Choice column '{}' must hold a string",
                    self.choice_col
                ))
            })?;
            let source_col = self.choice_map.get(choice).ok_or_else(|| {
                BlockError::generate(format!("No column mapped for choice '{choice}'"))
            })?;
            let value = row
                .get(source_col)
                .ok_or_else(|| BlockError::MissingColumn {
                    column: source_col.clone(),
                })?;
            let mut out = row.clone();
            out.insert(self.output_col.clone(), value.clone());
            Ok(out)
        })
    }
}

/// Overwrites a column with its most frequent value across the dataset.
/// Ties resolve to the value seen first, keeping the output deterministic.
pub struct SetToMajorityValueBlock {
    name: String,
    col_name: String,
}

#[derive(Debug, Deserialize)]
struct MajorityConfig {
    col_name: String,
}

impl SetToMajorityValueBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: MajorityConfig = init.parse_config()?;
        Ok(Self {
            name: init.name,
            col_name: config.col_name,
        })
    }
}

#[async_trait]
impl Block for SetToMajorityValueBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "SetToMajorityValueBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        if dataset.is_empty() {
            return Ok(dataset);
        }
        if !dataset.has_column(&self.col_name) {
            return Err(BlockError::MissingColumn {
                column: self.col_name.clone(),
            });
        }
        // Keyed by rendered value; insertion order gives first-seen
        // tie-breaking.
        let mut counts: IndexMap<String, (Value, usize)> = IndexMap::new();
        for row in dataset.rows() {
            if let Some(value) = row.get(&self.col_name) {
                let entry = counts
                    .entry(value.to_string())
                    .or_insert_with(|| (value.clone(), 0));
                entry.1 += 1;
            }
        }
        let mut best: Option<(&Value, usize)> = None;
        for (value, count) in counts.values() {
            if best.map_or(true, |(_, c)| *count > c) {
                best = Some((value, *count));
            }
        }
        let Some((majority, _)) = best else {
            return Ok(dataset);
        };
        let majority = majority.clone();
        Ok(dataset.map(|row| {
            let mut out = row.clone();
            out.insert(self.col_name.clone(), majority.clone());
            out
        }))
    }
}

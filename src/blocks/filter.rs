//! Row filtering by column value.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::dataset::Dataset;
use crate::error::BlockError;
use crate::registry::BlockInit;

use super::Block;

/// Comparison applied between a row's cell and the configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperation {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

/// Keeps rows whose `filter_column` cell relates to `filter_value` under the
/// configured operation. Cells of a mismatched type simply fail the
/// predicate; a column absent from the whole dataset is an error.
pub struct FilterByValueBlock {
    name: String,
    filter_column: String,
    filter_value: Value,
    operation: FilterOperation,
}

#[derive(Debug, Deserialize)]
struct FilterConfig {
    filter_column: String,
    filter_value: serde_yaml::Value,
    operation: FilterOperation,
}

impl FilterByValueBlock {
    pub fn from_init(init: BlockInit) -> Result<Self, BlockError> {
        let config: FilterConfig = init.parse_config()?;
        let filter_value = serde_yaml::from_value::<Value>(config.filter_value)
            .map_err(|source| BlockError::InvalidConfig { source })?;
        Ok(Self {
            name: init.name,
            filter_column: config.filter_column,
            filter_value,
            operation: config.operation,
        })
    }

    fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    fn matches(&self, cell: &Value) -> bool {
        use FilterOperation::*;
        match self.operation {
            Eq => cell == &self.filter_value,
            Ne => cell != &self.filter_value,
            Contains => match (cell, &self.filter_value) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
            ordered => {
                let Some(ordering) = Self::compare(cell, &self.filter_value) else {
                    return false;
                };
                match ordered {
                    Gt => ordering == Ordering::Greater,
                    Lt => ordering == Ordering::Less,
                    Ge => ordering != Ordering::Less,
                    Le => ordering != Ordering::Greater,
                    _ => unreachable!("equality handled above"),
                }
            }
        }
    }
}

#[async_trait]
impl Block for FilterByValueBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "FilterByValueBlock"
    }

    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError> {
        if !dataset.is_empty() && !dataset.has_column(&self.filter_column) {
            return Err(BlockError::MissingColumn {
                column: self.filter_column.clone(),
            });
        }
        Ok(dataset.filter(|row| {
            row.get(&self.filter_column)
                .map(|cell| self.matches(cell))
                .unwrap_or(false)
        }))
    }
}

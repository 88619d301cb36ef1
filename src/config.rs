//! Pipeline configuration parsing.
//!
//! A pipeline config is a YAML document with a `blocks` list of
//! `{name, type, config}` records. Block specs are kept raw and validated
//! when their stage runs, so a malformed spec surfaces as a stage failure
//! with block identity attached rather than an upfront parse failure.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{ConfigError, ParseSnafu, ReadFileSnafu};

/// A declarative `{name, type, config}` block descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BlockSpec {
    fields: IndexMap<String, serde_yaml::Value>,
}

impl BlockSpec {
    /// Build a spec programmatically (tests and embedded pipelines).
    pub fn new(
        name: impl Into<String>,
        block_type: impl Into<String>,
        config: serde_yaml::Value,
    ) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(
            "name".to_string(),
            serde_yaml::Value::String(name.into()),
        );
        fields.insert(
            "type".to_string(),
            serde_yaml::Value::String(block_type.into()),
        );
        fields.insert("config".to_string(), config);
        Self { fields }
    }

    /// The configured block name; absence is a configuration error.
    pub fn name(&self) -> Result<&str, ConfigError> {
        self.str_field("name")
    }

    /// The configured block type; absence is a configuration error.
    pub fn block_type(&self) -> Result<&str, ConfigError> {
        self.str_field("type")
    }

    /// The block-specific `config` mapping; defaults to an empty mapping.
    pub fn config(&self) -> serde_yaml::Value {
        self.fields
            .get("config")
            .cloned()
            .unwrap_or_else(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()))
    }

    fn str_field(&self, field: &'static str) -> Result<&str, ConfigError> {
        let value = self
            .fields
            .get(field)
            .ok_or(ConfigError::MissingField { field })?;
        value.as_str().ok_or(ConfigError::FieldType { field })
    }

    /// Best-effort name for diagnostics when validation itself failed.
    pub(crate) fn display_name(&self) -> String {
        self.name().unwrap_or("<unknown>").to_string()
    }

    /// Best-effort type for diagnostics when validation itself failed.
    pub(crate) fn display_type(&self) -> String {
        self.block_type().unwrap_or("<unknown>").to_string()
    }
}

/// Top-level pipeline config file: a version marker and an ordered block
/// list.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub version: String,
    pub blocks: Vec<BlockSpec>,
}

impl PipelineConfig {
    /// Parse a pipeline config from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).context(ParseSnafu)
    }

    /// Load a pipeline config from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
version: "1.0"
blocks:
  - name: rename
    type: rename_columns
    config:
      columns_map:
        raw: cleaned
  - name: keep-positive
    type: filter_by_value
    config:
      filter_column: score
      filter_value: 0
      operation: gt
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.blocks.len(), 2);
        assert_eq!(config.blocks[0].name().unwrap(), "rename");
        assert_eq!(config.blocks[1].block_type().unwrap(), "filter_by_value");
    }

    #[test]
    fn test_missing_name_is_lazy() {
        let yaml = r#"
blocks:
  - name_not_there: oops
    type: rename_columns
"#;
        // Parsing succeeds; validation is deferred to the owning stage.
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        let spec = &config.blocks[0];
        assert!(matches!(
            spec.name(),
            Err(ConfigError::MissingField { field: "name" })
        ));
        assert_eq!(spec.block_type().unwrap(), "rename_columns");
        assert_eq!(spec.display_name(), "<unknown>");
    }

    #[test]
    fn test_config_defaults_to_empty_mapping() {
        let spec = BlockSpec::new("b", "t", serde_yaml::Value::Null);
        assert!(spec.config().is_null());

        let yaml = "blocks:\n  - name: b\n    type: t\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(config.blocks[0].config().as_mapping().is_some());
    }

    #[test]
    fn test_non_string_field_rejected() {
        let yaml = "blocks:\n  - name: 7\n    type: t\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.blocks[0].name(),
            Err(ConfigError::FieldType { field: "name" })
        ));
    }
}

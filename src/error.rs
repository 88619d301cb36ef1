//! Error types for the batchline pipeline executor.

use snafu::prelude::*;

/// Errors arising from pipeline and block configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// A block spec is missing a required field.
    #[snafu(display("Block spec is missing required field '{field}'"))]
    MissingField { field: &'static str },

    /// A block spec field has the wrong type.
    #[snafu(display("Block spec field '{field}' must be a string"))]
    FieldType { field: &'static str },

    /// Failed to parse pipeline YAML.
    #[snafu(display("Failed to parse pipeline config: {source}"))]
    Parse { source: serde_yaml::Error },

    /// Failed to read a pipeline config file.
    #[snafu(display("Failed to read pipeline config {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Batch size of zero rows.
    #[snafu(display("batch_size must be greater than zero"))]
    ZeroBatchSize,

    /// Worker count of zero.
    #[snafu(display("concurrency must be greater than zero"))]
    ZeroConcurrency,
}

/// Errors raised inside a block's construction or `generate`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BlockError {
    /// The block's `config` mapping did not deserialize.
    #[snafu(display("Invalid block config: {source}"))]
    InvalidConfig { source: serde_yaml::Error },

    /// A column the block needs is not present in the dataset.
    #[snafu(display("Column '{column}' not found in dataset"))]
    MissingColumn { column: String },

    /// Generic generation failure.
    #[snafu(display("{message}"))]
    Generate { message: String },
}

impl BlockError {
    /// Generation failure from a plain message.
    pub fn generate(message: impl Into<String>) -> Self {
        BlockError::Generate {
            message: message.into(),
        }
    }
}

/// A failure within a single pipeline stage, tagged by kind.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StageError {
    /// Malformed block spec.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// The configured block type is not registered.
    #[snafu(display("Unknown block type '{type_name}' (known types: {known})"))]
    Resolution { type_name: String, known: String },

    /// The block's construction or `generate` failed.
    #[snafu(display("Block execution failed: {source}"))]
    Execution { source: BlockError },

    /// A worker task panicked or was aborted.
    #[snafu(display("Worker task failed: {source}"))]
    WorkerPanic { source: tokio::task::JoinError },

    /// A stage produced a dataset with zero rows.
    #[snafu(display("Pipeline stopped: empty dataset after running block"))]
    EmptyDataset,
}

impl From<ConfigError> for StageError {
    fn from(source: ConfigError) -> Self {
        StageError::Config { source }
    }
}

impl From<BlockError> for StageError {
    fn from(source: BlockError) -> Self {
        StageError::Execution { source }
    }
}

/// Top-level error returned by [`crate::Pipeline::generate`].
///
/// Wraps any stage failure with the identity of the block it came from.
/// `block_type` is the constructed instance's runtime type name when an
/// instance existed, otherwise the `type` string from the block spec;
/// `block_name` falls back to the spec's `name` the same way. The underlying
/// failure is preserved as the error source and is never swallowed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(display("PipelineBlockError({block_type}/{block_name}): {source}"))]
pub struct PipelineBlockError {
    /// Runtime type name of the failing block, or the spec's `type` string.
    pub block_type: String,
    /// Configured name of the failing block, or `<unknown>`.
    pub block_name: String,
    /// The stage failure, with its causal chain intact.
    pub source: StageError,
}

impl PipelineBlockError {
    /// The stage failure this error wraps.
    pub fn stage_error(&self) -> &StageError {
        &self.source
    }
}

//! Pipeline stage sequencing and error wrapping.
//!
//! A pipeline owns an ordered list of block specs. For each stage it
//! validates the spec, resolves the block type through the registry, splits
//! the current dataset into batches, runs them through the scheduler, and
//! threads the reassembled output into the next stage. The output of every
//! stage is re-split from scratch, so batch sizes hold downstream even when
//! a block expands or shrinks the row count.

mod scheduler;

pub use scheduler::{split_into_batches, Batch};

use tracing::{debug, info};

use crate::config::{BlockSpec, PipelineConfig};
use crate::context::ExecutionContext;
use crate::dataset::Dataset;
use crate::error::{PipelineBlockError, StageError};
use crate::registry::{BlockInit, BlockRegistry};

use scheduler::{run_stage, StageFailure};

/// A sequential pipeline of block stages over a dataset.
///
/// Each `generate` call is independent; no state is retained between calls.
pub struct Pipeline {
    ctx: ExecutionContext,
    /// Label for the config source, carried in logs.
    source: String,
    specs: Vec<BlockSpec>,
    registry: BlockRegistry,
}

impl Pipeline {
    /// Create a pipeline with the built-in block registry.
    ///
    /// Spec validation is deferred to `generate`, where a malformed spec
    /// fails with block identity attached.
    pub fn new(ctx: ExecutionContext, source: impl Into<String>, specs: Vec<BlockSpec>) -> Self {
        Self {
            ctx,
            source: source.into(),
            specs,
            registry: BlockRegistry::with_builtins(),
        }
    }

    /// Create a pipeline from a parsed config file.
    pub fn from_config(
        ctx: ExecutionContext,
        source: impl Into<String>,
        config: PipelineConfig,
    ) -> Self {
        Self::new(ctx, source, config.blocks)
    }

    /// Replace the block registry (e.g. to add custom block types).
    pub fn with_registry(mut self, registry: BlockRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The ordered block specs of this pipeline.
    pub fn specs(&self) -> &[BlockSpec] {
        &self.specs
    }

    /// Run every stage in order over the dataset.
    ///
    /// Stops at the first faulting stage; the returned error wraps the
    /// underlying failure with the identity of the block it came from.
    /// Partial results from earlier stages are discarded.
    pub async fn generate(&self, dataset: Dataset) -> Result<Dataset, PipelineBlockError> {
        let mut current = dataset;
        for spec in &self.specs {
            current = self.run_block(spec, current).await?;
        }
        info!(
            pipeline = %self.source,
            rows = current.num_rows(),
            "Pipeline complete"
        );
        Ok(current)
    }

    async fn run_block(
        &self,
        spec: &BlockSpec,
        dataset: Dataset,
    ) -> Result<Dataset, PipelineBlockError> {
        // Identity from the spec strings until an instance exists.
        let wrap_spec = |error: StageError| PipelineBlockError {
            block_type: spec.display_type(),
            block_name: spec.display_name(),
            source: error,
        };

        let name = spec.name().map_err(|e| wrap_spec(e.into()))?;
        let type_name = spec.block_type().map_err(|e| wrap_spec(e.into()))?;
        let factory = self.registry.resolve(type_name).map_err(wrap_spec)?;

        let batches = split_into_batches(&dataset, self.ctx.batch_size());
        info!(
            pipeline = %self.source,
            block = name,
            block_type = type_name,
            rows = dataset.num_rows(),
            batches = batches.len(),
            "Running block"
        );

        let init = BlockInit {
            ctx: self.ctx.clone(),
            name: name.to_string(),
            config: spec.config(),
        };
        let make_block = || factory(init.clone());

        let stage = run_stage(make_block, batches, self.ctx.concurrency())
            .await
            .map_err(|failed: StageFailure| PipelineBlockError {
                // Prefer the constructed instance's runtime type name.
                block_type: failed
                    .block_type
                    .map(str::to_string)
                    .unwrap_or_else(|| type_name.to_string()),
                block_name: name.to_string(),
                source: failed.error,
            })?;
        let output = stage.data;

        debug!(
            pipeline = %self.source,
            block = name,
            rows = output.num_rows(),
            "Block complete"
        );

        // The stage itself tolerates empty input, but an empty output means
        // nothing remains for downstream stages to work on. Instances ran, so
        // the error carries their runtime type name.
        if output.is_empty() {
            return Err(PipelineBlockError {
                block_type: stage
                    .block_type
                    .map(str::to_string)
                    .unwrap_or_else(|| type_name.to_string()),
                block_name: name.to_string(),
                source: StageError::EmptyDataset,
            });
        }

        Ok(output)
    }
}

//! Batchline: batched, concurrent pipeline execution over tabular datasets.
//!
//! A [`Pipeline`] applies an ordered list of transformation blocks to a
//! [`Dataset`]. Each stage may split the current dataset into contiguous
//! batches and run them across a bounded worker pool, reassembling results
//! in original row order before the next stage runs. Any failure is wrapped
//! in a [`PipelineBlockError`] carrying the identity of the block it came
//! from, with the causal chain intact.
//!
//! ```no_run
//! use batchline::{Dataset, ExecutionContext, Pipeline, PipelineConfig};
//!
//! # async fn run(input: Dataset) -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ExecutionContext::default()
//!     .with_batch_size(512)?
//!     .with_concurrency(4)?;
//! let config = PipelineConfig::from_file("pipeline.yaml")?;
//! let output = Pipeline::from_config(ctx, "pipeline.yaml", config)
//!     .generate(input)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod blocks;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use blocks::Block;
pub use config::{BlockSpec, PipelineConfig};
pub use context::{BatchSize, ExecutionContext};
pub use dataset::{Dataset, Row};
pub use error::{BlockError, ConfigError, PipelineBlockError, StageError};
pub use pipeline::{split_into_batches, Batch, Pipeline};
pub use registry::{BlockFactory, BlockInit, BlockRegistry};

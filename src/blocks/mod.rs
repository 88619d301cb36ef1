//! Block capability contract and built-in transformation blocks.

pub mod filter;
pub mod util;

use async_trait::async_trait;

use crate::dataset::Dataset;
use crate::error::BlockError;

pub use filter::FilterByValueBlock;
pub use util::{
    CombineColumnsBlock, DuplicateColumnsBlock, FlattenColumnsBlock, RenameColumnsBlock,
    SelectorBlock, SetToMajorityValueBlock,
};

/// A single transformation unit applied to a dataset.
///
/// The scheduler constructs one instance per batch, so an implementation
/// never sees concurrent calls on the same instance and needs no internal
/// synchronization.
#[async_trait]
pub trait Block: Send + Sync {
    /// Configured instance name from the block spec.
    fn name(&self) -> &str;

    /// Runtime type name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Apply this block to a dataset, producing a new dataset. May change
    /// the row count in either direction.
    async fn generate(&self, dataset: Dataset) -> Result<Dataset, BlockError>;
}

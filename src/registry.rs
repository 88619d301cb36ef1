//! Explicit block type registry.
//!
//! The registry is an ordinary value owned by the pipeline rather than
//! ambient global state, so construction stays deterministic and tests can
//! register mock block types without patching anything.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::blocks::{
    Block, CombineColumnsBlock, DuplicateColumnsBlock, FilterByValueBlock, FlattenColumnsBlock,
    RenameColumnsBlock, SelectorBlock, SetToMajorityValueBlock,
};
use crate::context::ExecutionContext;
use crate::error::{BlockError, StageError};

/// Everything a block factory receives to construct an instance.
#[derive(Debug, Clone)]
pub struct BlockInit {
    /// Shared execution context, read-only.
    pub ctx: ExecutionContext,
    /// Configured block name from the spec.
    pub name: String,
    /// The spec's `config` mapping.
    pub config: serde_yaml::Value,
}

impl BlockInit {
    /// Deserialize the `config` mapping into a block's own config struct.
    pub fn parse_config<T: DeserializeOwned>(&self) -> Result<T, BlockError> {
        serde_yaml::from_value(self.config.clone())
            .map_err(|source| BlockError::InvalidConfig { source })
    }
}

/// Factory producing a fresh block instance for each invocation.
pub type BlockFactory =
    Arc<dyn Fn(BlockInit) -> Result<Box<dyn Block>, BlockError> + Send + Sync>;

/// Mapping from configured type names to block factories.
///
/// Unknown type names fail closed at resolution time.
#[derive(Clone, Default)]
pub struct BlockRegistry {
    factories: IndexMap<String, BlockFactory>,
}

impl BlockRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in utility and filter blocks.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("rename_columns", |init| {
            Ok(Box::new(RenameColumnsBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("duplicate_columns", |init| {
            Ok(Box::new(DuplicateColumnsBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("combine_columns", |init| {
            Ok(Box::new(CombineColumnsBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("flatten_columns", |init| {
            Ok(Box::new(FlattenColumnsBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("selector", |init| {
            Ok(Box::new(SelectorBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("set_to_majority_value", |init| {
            Ok(Box::new(SetToMajorityValueBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry.register("filter_by_value", |init| {
            Ok(Box::new(FilterByValueBlock::from_init(init)?) as Box<dyn Block>)
        });
        registry
    }

    /// Register a block type; a later registration replaces an earlier one
    /// with the same name.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(BlockInit) -> Result<Box<dyn Block>, BlockError> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
    }

    /// Resolve a configured type name to its factory.
    pub fn resolve(&self, type_name: &str) -> Result<&BlockFactory, StageError> {
        self.factories
            .get(type_name)
            .ok_or_else(|| StageError::Resolution {
                type_name: type_name.to_string(),
                known: self.known_types().collect::<Vec<_>>().join(", "),
            })
    }

    /// Registered type names, in registration order.
    pub fn known_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = BlockRegistry::with_builtins();
        let types: Vec<&str> = registry.known_types().collect();
        assert_eq!(
            types,
            vec![
                "rename_columns",
                "duplicate_columns",
                "combine_columns",
                "flatten_columns",
                "selector",
                "set_to_majority_value",
                "filter_by_value"
            ]
        );
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let registry = BlockRegistry::with_builtins();
        let err = match registry.resolve("llm") {
            Ok(_) => panic!("expected resolution error, got Ok"),
            Err(err) => err,
        };
        match err {
            StageError::Resolution { type_name, known } => {
                assert_eq!(type_name, "llm");
                assert!(known.contains("rename_columns"));
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }
}

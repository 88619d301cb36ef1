//! Execution context shared across pipeline stages and workers.

use crate::error::ConfigError;

/// Maximum number of rows handed to a single block invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchSize {
    /// Never split: the whole dataset is one batch and each block runs once.
    #[default]
    Unbounded,
    /// Split into contiguous slices of at most this many rows.
    Rows(usize),
}

/// Immutable configuration shared read-only across all stages and workers.
///
/// `concurrency > 1` is only meaningful with a bounded batch size: an
/// unbounded dataset is never split, so its block runs exactly once
/// regardless of the worker count.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    batch_size: BatchSize,
    concurrency: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::Unbounded,
            concurrency: 1,
        }
    }
}

impl ExecutionContext {
    /// Create a context, rejecting zero batch sizes and zero worker counts.
    pub fn new(batch_size: BatchSize, concurrency: usize) -> Result<Self, ConfigError> {
        if matches!(batch_size, BatchSize::Rows(0)) {
            return Err(ConfigError::ZeroBatchSize);
        }
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self {
            batch_size,
            concurrency,
        })
    }

    /// Set a bounded batch size in rows.
    pub fn with_batch_size(self, rows: usize) -> Result<Self, ConfigError> {
        Self::new(BatchSize::Rows(rows), self.concurrency)
    }

    /// Set the worker pool size for concurrent batch execution.
    pub fn with_concurrency(self, workers: usize) -> Result<Self, ConfigError> {
        Self::new(self.batch_size, workers)
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_run_single_threaded_unbounded() {
        let ctx = ExecutionContext::default();
        assert_eq!(ctx.batch_size(), BatchSize::Unbounded);
        assert_eq!(ctx.concurrency(), 1);
    }

    #[test]
    fn test_builder_chain() {
        let ctx = ExecutionContext::default()
            .with_batch_size(6)
            .unwrap()
            .with_concurrency(2)
            .unwrap();
        assert_eq!(ctx.batch_size(), BatchSize::Rows(6));
        assert_eq!(ctx.concurrency(), 2);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            ExecutionContext::new(BatchSize::Rows(0), 1),
            Err(ConfigError::ZeroBatchSize)
        ));
        assert!(matches!(
            ExecutionContext::new(BatchSize::Unbounded, 0),
            Err(ConfigError::ZeroConcurrency)
        ));
    }
}

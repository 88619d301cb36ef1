//! Batch splitting, worker dispatch, and ordinal reassembly.
//!
//! A stage's dataset is split into contiguous batches which run on a bounded
//! worker pool. Dispatch order is ordinal but completion order is not, so
//! completed results are written into a slot array indexed by ordinal and
//! concatenated only once the pool drains. Output row order is therefore
//! identical regardless of worker count or scheduling jitter.

use std::collections::HashMap;

use tokio::task::{self, JoinSet};
use tracing::{debug, trace};

use crate::blocks::Block;
use crate::context::BatchSize;
use crate::dataset::Dataset;
use crate::error::{BlockError, StageError};

/// A contiguous row-range slice tagged with its position in the split.
#[derive(Debug, Clone)]
pub struct Batch {
    /// 0-based position among the batches of this stage.
    pub ordinal: usize,
    /// The rows of this batch.
    pub data: Dataset,
}

/// A completed stage: the reassembled dataset plus the runtime type name of
/// the block instances that produced it.
#[derive(Debug)]
pub(crate) struct StageOutput {
    pub data: Dataset,
    pub block_type: Option<&'static str>,
}

/// A stage failure plus the runtime type name of the block that raised it,
/// when an instance existed.
#[derive(Debug)]
pub(crate) struct StageFailure {
    pub block_type: Option<&'static str>,
    pub error: StageError,
}

impl StageFailure {
    fn new(block_type: Option<&'static str>, error: StageError) -> Self {
        Self { block_type, error }
    }
}

/// Split a dataset into contiguous batches in ascending row order.
///
/// Produces exactly one batch when the size is unbounded, when it covers the
/// whole dataset, or when the dataset has zero rows — so a stage still runs
/// once on empty input, preserving schema.
pub fn split_into_batches(dataset: &Dataset, batch_size: BatchSize) -> Vec<Batch> {
    let rows = dataset.num_rows();
    let size = match batch_size {
        BatchSize::Unbounded => 0,
        BatchSize::Rows(n) => n,
    };
    if size == 0 || size >= rows || rows == 0 {
        return vec![Batch {
            ordinal: 0,
            data: dataset.clone(),
        }];
    }
    (0..rows)
        .step_by(size)
        .enumerate()
        .map(|(ordinal, start)| Batch {
            ordinal,
            data: dataset.slice(start, start + size),
        })
        .collect()
}

/// Run one block invocation per batch and reassemble the outputs in ordinal
/// order.
///
/// `make_block` constructs a fresh instance per batch. With `concurrency`
/// of one, batches run strictly in order on the calling task; otherwise up
/// to `concurrency` batches run in parallel on spawned workers.
pub(crate) async fn run_stage<F>(
    make_block: F,
    batches: Vec<Batch>,
    concurrency: usize,
) -> Result<StageOutput, StageFailure>
where
    F: Fn() -> Result<Box<dyn Block>, BlockError>,
{
    if concurrency <= 1 || batches.len() <= 1 {
        run_sequential(make_block, batches).await
    } else {
        run_concurrent(make_block, batches, concurrency).await
    }
}

async fn run_sequential<F>(make_block: F, batches: Vec<Batch>) -> Result<StageOutput, StageFailure>
where
    F: Fn() -> Result<Box<dyn Block>, BlockError>,
{
    let mut stage_type = None;
    let mut outputs = Vec::with_capacity(batches.len());
    for batch in batches {
        let block = make_block().map_err(|e| StageFailure::new(None, e.into()))?;
        let block_type = block.type_name();
        stage_type = Some(block_type);
        trace!(ordinal = batch.ordinal, rows = batch.data.num_rows(), "Running batch");
        let output = block
            .generate(batch.data)
            .await
            .map_err(|e| StageFailure::new(Some(block_type), e.into()))?;
        outputs.push(output);
    }
    Ok(StageOutput {
        data: Dataset::concat(outputs),
        block_type: stage_type,
    })
}

async fn run_concurrent<F>(
    make_block: F,
    batches: Vec<Batch>,
    concurrency: usize,
) -> Result<StageOutput, StageFailure>
where
    F: Fn() -> Result<Box<dyn Block>, BlockError>,
{
    let total = batches.len();
    let mut slots: Vec<Option<Dataset>> = Vec::new();
    slots.resize_with(total, || None);

    let mut workers: JoinSet<(usize, Result<Dataset, BlockError>)> = JoinSet::new();
    // Maps in-flight task ids to (ordinal, block type) so panics can still be
    // attributed to the right batch.
    let mut in_flight: HashMap<task::Id, (usize, &'static str)> = HashMap::new();
    let mut stage_type: Option<&'static str> = None;
    let mut pending = batches.into_iter();
    // Lowest failing ordinal wins, for deterministic diagnostics.
    let mut failure: Option<(usize, StageFailure)> = None;

    debug!(batches = total, concurrency, "Dispatching stage");
    for batch in pending.by_ref().take(concurrency) {
        if failure.is_some() {
            break;
        }
        dispatch(
            &make_block,
            batch,
            &mut workers,
            &mut in_flight,
            &mut stage_type,
            &mut failure,
        );
    }

    while let Some(joined) = workers.join_next_with_id().await {
        match joined {
            Ok((id, (ordinal, Ok(output)))) => {
                in_flight.remove(&id);
                trace!(ordinal, rows = output.num_rows(), "Batch complete");
                slots[ordinal] = Some(output);
            }
            Ok((id, (ordinal, Err(source)))) => {
                let block_type = in_flight.remove(&id).map(|(_, t)| t);
                record_failure(
                    &mut failure,
                    ordinal,
                    StageFailure::new(block_type, source.into()),
                );
            }
            Err(join_err) => {
                let (ordinal, block_type) = in_flight
                    .remove(&join_err.id())
                    .map(|(o, t)| (o, Some(t)))
                    .unwrap_or((usize::MAX, None));
                record_failure(
                    &mut failure,
                    ordinal,
                    StageFailure::new(block_type, StageError::WorkerPanic { source: join_err }),
                );
            }
        }

        // In-flight batches run to completion, but nothing new starts once a
        // batch has failed.
        if failure.is_none() {
            if let Some(batch) = pending.next() {
                dispatch(
                    &make_block,
                    batch,
                    &mut workers,
                    &mut in_flight,
                    &mut stage_type,
                    &mut failure,
                );
            }
        }
    }

    if let Some((ordinal, failed)) = failure {
        debug!(ordinal, "Stage failed; discarding partial results");
        return Err(failed);
    }

    // Every slot is filled once the pool drains without failure.
    Ok(StageOutput {
        data: Dataset::concat(slots.into_iter().flatten()),
        block_type: stage_type,
    })
}

fn dispatch<F>(
    make_block: &F,
    batch: Batch,
    workers: &mut JoinSet<(usize, Result<Dataset, BlockError>)>,
    in_flight: &mut HashMap<task::Id, (usize, &'static str)>,
    stage_type: &mut Option<&'static str>,
    failure: &mut Option<(usize, StageFailure)>,
) where
    F: Fn() -> Result<Box<dyn Block>, BlockError>,
{
    let ordinal = batch.ordinal;
    match make_block() {
        Ok(block) => {
            let block_type = block.type_name();
            *stage_type = Some(block_type);
            let data = batch.data;
            let handle = workers.spawn(async move { (ordinal, block.generate(data).await) });
            in_flight.insert(handle.id(), (ordinal, block_type));
        }
        Err(source) => {
            record_failure(failure, ordinal, StageFailure::new(None, source.into()));
        }
    }
}

fn record_failure(failure: &mut Option<(usize, StageFailure)>, ordinal: usize, failed: StageFailure) {
    match failure {
        Some((existing, _)) if *existing <= ordinal => {}
        _ => *failure = Some((ordinal, failed)),
    }
}

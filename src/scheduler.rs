//! Dynamic macroblock scheduling over a fixed pool of worker threads.
//!
//! Workers pull block indices from a shared cursor one at a time, count primes
//! in the claimed block without touching shared state, then fold the local
//! count into a shared accumulator. The cursor and the accumulator are guarded
//! independently so claiming never waits behind merging.
//!
//! All synchronization state is owned by a single [`search_with`] call; two
//! searches running at the same time share nothing.

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::partition::{BlockGrid, Macroblock};
use crate::predicate::is_prime;
use crossbeam::utils::CachePadded;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

// =============================================================================
// Work queue
// =============================================================================

/// Source of macroblock indices, shared by every worker of one search.
pub trait WorkQueue: Sync {
    /// Claim the next unprocessed block index, or `None` once all are taken.
    ///
    /// Every index in `0..total()` is handed out exactly once.
    fn claim(&self) -> Option<usize>;

    fn total(&self) -> usize;
}

/// Mutex-protected cursor. The lock is held only to read and bump the index.
#[derive(Debug)]
pub struct LockedCursor {
    next: CachePadded<Mutex<usize>>,
    total: usize,
}

impl LockedCursor {
    pub fn new(total: usize) -> Self {
        LockedCursor {
            next: CachePadded::new(Mutex::new(0)),
            total,
        }
    }

    /// Current cursor value, in `[0, total]`.
    pub fn position(&self) -> usize {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkQueue for LockedCursor {
    fn claim(&self) -> Option<usize> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next >= self.total {
            return None;
        }
        let id = *next;
        *next += 1;
        Some(id)
    }

    fn total(&self) -> usize {
        self.total
    }
}

/// Lock-free cursor. Never advances past `total`.
#[derive(Debug)]
pub struct AtomicCursor {
    next: CachePadded<AtomicUsize>,
    total: usize,
}

impl AtomicCursor {
    pub fn new(total: usize) -> Self {
        AtomicCursor {
            next: CachePadded::new(AtomicUsize::new(0)),
            total,
        }
    }

    pub fn position(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }
}

impl WorkQueue for AtomicCursor {
    fn claim(&self) -> Option<usize> {
        let total = self.total;
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < total).then_some(next + 1)
            })
            .ok()
    }

    fn total(&self) -> usize {
        self.total
    }
}

// =============================================================================
// Accumulator
// =============================================================================

/// Global prime count, merged into once per processed block.
#[derive(Debug, Default)]
pub struct Accumulator {
    count: CachePadded<Mutex<u64>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, local: u64) {
        // A panicking worker cannot leave a plain integer half-written.
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += local;
    }

    /// Final value. Taking `self` by value means every worker is gone.
    pub fn into_inner(self) -> u64 {
        self.count
            .into_inner()
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Search parameters
// =============================================================================

/// How workers claim block indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStrategy {
    /// Mutex-guarded cursor.
    #[default]
    Locked,
    /// Compare-and-swap cursor.
    Atomic,
}

/// Whether block descriptors are computed per claim or all up front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockPlan {
    #[default]
    Lazy,
    Precomputed,
}

/// Validated parameters for one parallel search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    block_height: NonZeroUsize,
    block_width: NonZeroUsize,
    threads: NonZeroUsize,
    pub claim: ClaimStrategy,
    pub plan: BlockPlan,
}

impl SearchParams {
    /// Rejects zero block dimensions and zero threads.
    pub fn new(block_height: usize, block_width: usize, threads: usize) -> Result<Self> {
        let invalid_block = || Error::InvalidBlockSize {
            height: block_height,
            width: block_width,
        };

        Ok(SearchParams {
            block_height: NonZeroUsize::new(block_height).ok_or_else(invalid_block)?,
            block_width: NonZeroUsize::new(block_width).ok_or_else(invalid_block)?,
            threads: NonZeroUsize::new(threads).ok_or(Error::InvalidThreadCount)?,
            claim: ClaimStrategy::default(),
            plan: BlockPlan::default(),
        })
    }

    pub fn with_claim(mut self, claim: ClaimStrategy) -> Self {
        self.claim = claim;
        self
    }

    pub fn with_plan(mut self, plan: BlockPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn block_height(&self) -> usize {
        self.block_height.get()
    }

    pub fn block_width(&self) -> usize {
        self.block_width.get()
    }

    pub fn threads(&self) -> usize {
        self.threads.get()
    }
}

/// Outcome of one parallel search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub prime_count: u64,
    pub total_blocks: usize,
    /// Blocks claimed by each worker, indexed by worker number.
    pub blocks_per_worker: Vec<usize>,
}

impl SearchReport {
    pub fn blocks_claimed(&self) -> usize {
        self.blocks_per_worker.iter().sum()
    }

    /// Workers that exited without claiming anything.
    pub fn idle_workers(&self) -> usize {
        self.blocks_per_worker.iter().filter(|&&n| n == 0).count()
    }
}

// =============================================================================
// Search
// =============================================================================

/// Count primes in `matrix` with `threads` workers pulling
/// `block_height x block_width` macroblocks from a locked cursor.
pub fn search(
    matrix: &Matrix,
    block_height: usize,
    block_width: usize,
    threads: usize,
) -> Result<u64> {
    let params = SearchParams::new(block_height, block_width, threads)?;
    search_with(matrix, &params).map(|report| report.prime_count)
}

/// Parallel search with explicit claim strategy and block plan.
pub fn search_with(matrix: &Matrix, params: &SearchParams) -> Result<SearchReport> {
    let grid = BlockGrid::new(
        matrix.rows(),
        matrix.cols(),
        params.block_height(),
        params.block_width(),
    )?;

    let blocks = match params.plan {
        BlockPlan::Lazy => Blocks::Lazy(grid),
        BlockPlan::Precomputed => Blocks::Precomputed(grid.descriptors()?),
    };

    log::debug!(
        "search: {}x{} matrix, {}x{} blocks ({} total), {} threads, {:?}/{:?}",
        matrix.rows(),
        matrix.cols(),
        params.block_height(),
        params.block_width(),
        grid.total_blocks(),
        params.threads(),
        params.claim,
        params.plan,
    );

    let total = grid.total_blocks();
    let report = match params.claim {
        ClaimStrategy::Locked => {
            run_workers(matrix, &blocks, LockedCursor::new(total), params.threads())?
        }
        ClaimStrategy::Atomic => {
            run_workers(matrix, &blocks, AtomicCursor::new(total), params.threads())?
        }
    };

    log::debug!(
        "search: {} primes, blocks per worker {:?}",
        report.prime_count,
        report.blocks_per_worker
    );
    Ok(report)
}

/// Single-threaded reference scan, no locking.
pub fn search_serial(matrix: &Matrix) -> u64 {
    matrix.as_slice().iter().filter(|&&v| is_prime(v)).count() as u64
}

/// Primes inside one macroblock.
pub fn count_block(matrix: &Matrix, block: &Macroblock) -> u64 {
    block
        .rows()
        .map(|row| {
            matrix.row(row)[block.cols()]
                .iter()
                .filter(|&&v| is_prime(v))
                .count() as u64
        })
        .sum()
}

enum Blocks {
    Lazy(BlockGrid),
    Precomputed(Vec<Macroblock>),
}

impl Blocks {
    fn get(&self, index: usize) -> Option<Macroblock> {
        match self {
            Blocks::Lazy(grid) => grid.block(index),
            Blocks::Precomputed(blocks) => blocks.get(index).copied(),
        }
    }
}

/// Fails with [`Error::IncompleteSearch`] when the workers that ran left
/// blocks unclaimed; a partial count is never returned.
fn run_workers<Q: WorkQueue>(
    matrix: &Matrix,
    blocks: &Blocks,
    queue: Q,
    threads: usize,
) -> Result<SearchReport> {
    let accumulator = Accumulator::new();

    let blocks_per_worker = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let (queue, accumulator) = (&queue, &accumulator);
                thread::Builder::new()
                    .name(format!("primescan-worker-{}", worker))
                    .spawn_scoped(s, move || {
                        worker_loop(worker, matrix, blocks, queue, accumulator)
                    })
            })
            .collect();

        // Joining is the only barrier; the accumulator is read after this.
        handles
            .into_iter()
            .map(|spawned| match spawned {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                Err(err) => {
                    // The remaining workers still drain the queue.
                    log::warn!("failed to spawn worker thread: {}", err);
                    0
                }
            })
            .collect::<Vec<_>>()
    });

    let report = SearchReport {
        prime_count: accumulator.into_inner(),
        total_blocks: queue.total(),
        blocks_per_worker,
    };

    let claimed = report.blocks_claimed();
    if claimed != report.total_blocks {
        log::error!("claimed {} of {} blocks", claimed, report.total_blocks);
        return Err(Error::IncompleteSearch {
            claimed,
            total: report.total_blocks,
        });
    }
    Ok(report)
}

fn worker_loop<Q: WorkQueue>(
    worker: usize,
    matrix: &Matrix,
    blocks: &Blocks,
    queue: &Q,
    accumulator: &Accumulator,
) -> usize {
    let mut claimed = 0;
    while let Some(id) = queue.claim() {
        let Some(block) = blocks.get(id) else {
            break;
        };
        accumulator.merge(count_block(matrix, &block));
        claimed += 1;
    }
    log::trace!("worker {} done after {} blocks", worker, claimed);
    claimed
}

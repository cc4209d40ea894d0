//! Benchmark driver: times serial and parallel searches over a parameter sweep.

use crate::config::SweepConfig;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::report::ReportSink;
use crate::scheduler::{search_serial, search_with, SearchParams, SearchReport};
use itertools::iproduct;
use std::time::{Duration, Instant};

/// A value together with the wall-clock time it took to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

fn timed<T>(f: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = f();
    Timed {
        value,
        elapsed: start.elapsed(),
    }
}

/// Serial baseline, timed.
/// Role: reference count every parallel row is checked against
pub fn run_serial(matrix: &Matrix) -> Timed<u64> {
    timed(|| search_serial(matrix))
}

/// Parallel search, timed from thread creation to the last join.
pub fn run_parallel(matrix: &Matrix, params: &SearchParams) -> Result<Timed<SearchReport>> {
    let Timed { value, elapsed } = timed(|| search_with(matrix, params));
    Ok(Timed {
        value: value?,
        elapsed,
    })
}

// =============================================================================
// Records
// =============================================================================

/// One row of the benchmark report.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchRecord {
    pub matrix_size: usize,
    pub block_size: usize,
    pub threads: usize,
    pub serial_seconds: f64,
    pub parallel_seconds: f64,
    /// `serial_seconds / parallel_seconds`
    pub speedup: f64,
    /// `speedup / threads`
    pub efficiency: f64,
    /// `None` when the configuration could not be allocated or run in full.
    pub serial_count: Option<u64>,
    pub parallel_count: Option<u64>,
}

impl BenchRecord {
    pub fn new(
        matrix_size: usize,
        block_size: usize,
        threads: usize,
        serial: Duration,
        parallel: Duration,
        serial_count: Option<u64>,
        parallel_count: Option<u64>,
    ) -> Self {
        let serial_seconds = serial.as_secs_f64();
        let parallel_seconds = parallel.as_secs_f64();
        let speedup = serial_seconds / parallel_seconds;

        BenchRecord {
            matrix_size,
            block_size,
            threads,
            serial_seconds,
            parallel_seconds,
            speedup,
            efficiency: speedup / threads as f64,
            serial_count,
            parallel_count,
        }
    }

    /// Sentinel row for a configuration that ran out of memory or workers.
    /// Role: keep the report rectangular when one configuration fails
    pub fn failed(matrix_size: usize, block_size: usize, threads: usize) -> Self {
        BenchRecord {
            matrix_size,
            block_size,
            threads,
            serial_seconds: 0.0,
            parallel_seconds: 0.0,
            speedup: 0.0,
            efficiency: 0.0,
            serial_count: None,
            parallel_count: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.serial_count.is_none() || self.parallel_count.is_none()
    }

    /// Both counts present and different.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            (self.serial_count, self.parallel_count),
            (Some(serial), Some(parallel)) if serial != parallel
        )
    }
}

// =============================================================================
// Sweep
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub records: usize,
    pub failures: usize,
    pub mismatches: usize,
}

impl SweepSummary {
    fn observe(&mut self, record: &BenchRecord) {
        self.records += 1;
        if record.is_failed() {
            self.failures += 1;
        }
        if record.is_mismatch() {
            self.mismatches += 1;
        }
    }
}

/// Matrix size x block size x thread count sweep.
///
/// The serial baseline runs once per matrix size; the parallel engine runs
/// once per (block size, thread count) pair on that same matrix.
pub struct Sweep {
    config: SweepConfig,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Sweep { config })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run every configuration and hand each record to `sink`.
    ///
    /// Allocation failures and incomplete searches become sentinel rows and the
    /// sweep moves on; any sink error stops the sweep immediately.
    pub fn run<S: ReportSink + ?Sized>(&self, sink: &mut S) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();

        for &size in &self.config.matrix_sizes {
            let matrix = match Matrix::random(size, size, self.config.seed, self.config.max_value) {
                Ok(matrix) => Some(matrix),
                Err(err) if err.is_allocation() => {
                    log::warn!("skipping {}x{} matrix: {}", size, size, err);
                    None
                }
                Err(err) => return Err(err),
            };

            let serial = matrix.as_ref().map(run_serial);
            if let Some(serial) = &serial {
                log::info!(
                    "{}x{} serial: {} primes in {:.6}s",
                    size,
                    size,
                    serial.value,
                    serial.elapsed.as_secs_f64()
                );
            }

            let pairs = iproduct!(&self.config.block_sizes, &self.config.thread_counts);
            for (&block, &threads) in pairs {
                let record = match (&matrix, &serial) {
                    (Some(matrix), Some(serial)) => self.measure(matrix, serial, block, threads)?,
                    _ => BenchRecord::failed(size, block, threads),
                };

                if record.is_mismatch() {
                    log::error!(
                        "count mismatch for size={} block={} threads={}: serial={:?} parallel={:?}",
                        size,
                        block,
                        threads,
                        record.serial_count,
                        record.parallel_count
                    );
                }

                summary.observe(&record);
                sink.write_record(&record)?;
            }
        }

        sink.finish()?;
        log::info!(
            "sweep finished: {} records, {} failed, {} mismatched",
            summary.records,
            summary.failures,
            summary.mismatches
        );
        Ok(summary)
    }

    fn measure(
        &self,
        matrix: &Matrix,
        serial: &Timed<u64>,
        block: usize,
        threads: usize,
    ) -> Result<BenchRecord> {
        let size = matrix.rows();
        let params = SearchParams::new(block, block, threads)?
            .with_claim(self.config.claim)
            .with_plan(self.config.plan);

        let parallel = match run_parallel(matrix, &params) {
            Ok(parallel) => parallel,
            Err(err) if err.is_resource_exhaustion() => {
                log::warn!("size={} block={} threads={}: {}", size, block, threads, err);
                return Ok(BenchRecord::failed(size, block, threads));
            }
            Err(err) => return Err(err),
        };

        let record = BenchRecord::new(
            size,
            block,
            threads,
            serial.elapsed,
            parallel.elapsed,
            Some(serial.value),
            Some(parallel.value.prime_count),
        );
        log::info!(
            "size={} block={} threads={}: {:.6}s speedup {:.2} efficiency {:.2}",
            size,
            block,
            threads,
            record.parallel_seconds,
            record.speedup,
            record.efficiency
        );
        Ok(record)
    }
}

//! Prime counting over dense integer matrices.
//!
//! A serial scan is compared against a parallel engine that cuts the matrix
//! into macroblocks and lets a fixed pool of worker threads pull them from a
//! shared cursor, first come first served.
//!
//! ```
//! use primescan::{search, search_serial, Matrix};
//!
//! let m = Matrix::from_rows(&[[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12], [13, 14, 15, 16]])?;
//! assert_eq!(search_serial(&m), 6);
//! assert_eq!(search(&m, 2, 2, 4)?, 6);
//! # Ok::<(), primescan::Error>(())
//! ```

pub mod bench;
pub mod config;
pub mod error;
pub mod matrix;
pub mod partition;
pub mod predicate;
pub mod report;
pub mod scheduler;

pub use bench::{run_parallel, run_serial, BenchRecord, Sweep, SweepSummary, Timed};
pub use config::SweepConfig;
pub use error::{ConfigError, Error, Result};
pub use matrix::Matrix;
pub use partition::{partition, BlockGrid, Macroblock};
pub use predicate::is_prime;
pub use report::{CsvReport, ReportSink, TerminalReport};
pub use scheduler::{
    search, search_serial, search_with, BlockPlan, ClaimStrategy, SearchParams, SearchReport,
};

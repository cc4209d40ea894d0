use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building matrices, planning searches or writing reports.
#[derive(Debug, Error)]
pub enum Error {
    #[error("matrix must have at least one row and one column (got {rows}x{cols})")]
    EmptyMatrix { rows: usize, cols: usize },

    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("buffer of {actual} cells does not match a {rows}x{cols} matrix")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        actual: usize,
    },

    #[error("block size must be at least 1x1 (got {height}x{width})")]
    InvalidBlockSize { height: usize, width: usize },

    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    #[error("max value must be positive (got {0})")]
    InvalidMaxValue(i32),

    /// Workers exited with blocks still unclaimed, so the count is partial.
    #[error("search claimed {claimed} of {total} blocks")]
    IncompleteSearch { claimed: usize, total: usize },

    /// Resource exhaustion while reserving a matrix or descriptor array.
    #[error("could not allocate {what} ({elements} elements)")]
    Allocation { what: &'static str, elements: usize },

    #[error("cannot open report '{}': {source}", .path.display())]
    ReportUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report: {0}")]
    Report(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Sweep configuration problems. Invalid values are rejected, never adjusted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("'{field}' must not be empty")]
    EmptyList { field: &'static str },

    #[error("'{field}' contains {value}, values must be at least 1")]
    ZeroEntry { field: &'static str, value: usize },

    #[error("'max_value' must be positive (got {0})")]
    InvalidMaxValue(i32),
}

impl Error {
    /// True for failures that only invalidate one configuration of a sweep.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Error::Allocation { .. })
    }

    /// Allocation failures and searches cut short by missing workers: the
    /// sweep records these as failed rows and keeps going.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            Error::Allocation { .. } | Error::IncompleteSearch { .. }
        )
    }
}

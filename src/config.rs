//! Benchmark sweep configuration, loaded from TOML.
//!
//! Every field is optional in the file; missing fields fall back to the
//! classic sweep (six matrix sizes, six block sizes, six thread counts).

use crate::error::ConfigError;
use crate::matrix::{DEFAULT_MAX_VALUE, DEFAULT_SEED};
use crate::scheduler::{BlockPlan, ClaimStrategy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Side length of each square matrix.
    pub matrix_sizes: Vec<usize>,
    /// Side length of each square macroblock.
    pub block_sizes: Vec<usize>,
    pub thread_counts: Vec<usize>,
    pub seed: u64,
    /// Cells are drawn from `[0, max_value)`.
    pub max_value: i32,
    /// Where the CSV report is written.
    pub output: PathBuf,
    pub claim: ClaimStrategy,
    pub plan: BlockPlan,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            matrix_sizes: vec![100, 1000, 3000, 5000, 8000, 10000],
            block_sizes: vec![10, 50, 100, 250, 500, 1000],
            thread_counts: vec![1, 2, 3, 4, 8, 12],
            seed: DEFAULT_SEED,
            max_value: DEFAULT_MAX_VALUE,
            output: PathBuf::from("benchmark.csv"),
            claim: ClaimStrategy::default(),
            plan: BlockPlan::default(),
        }
    }
}

impl SweepConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SweepConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_list("matrix_sizes", &self.matrix_sizes)?;
        check_list("block_sizes", &self.block_sizes)?;
        check_list("thread_counts", &self.thread_counts)?;
        if self.max_value <= 0 {
            return Err(ConfigError::InvalidMaxValue(self.max_value));
        }
        Ok(())
    }

    /// Number of report rows a full sweep produces.
    pub fn record_count(&self) -> usize {
        self.matrix_sizes.len() * self.block_sizes.len() * self.thread_counts.len()
    }
}

fn check_list(field: &'static str, values: &[usize]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::EmptyList { field });
    }
    if let Some(&value) = values.iter().find(|&&v| v == 0) {
        return Err(ConfigError::ZeroEntry { field, value });
    }
    Ok(())
}

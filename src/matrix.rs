//! Dense row-major matrix of `i32` cells.
//!
//! Cells live in one contiguous buffer indexed by `row * cols + col`. A matrix
//! is never mutated after construction, so searches share it by plain `&`
//! reference across worker threads.

use crate::error::{Error, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::ops::Index;

/// Seed used by the benchmark sweep when none is configured.
pub const DEFAULT_SEED: u64 = 2004;

/// Exclusive upper bound for randomly generated cell values.
pub const DEFAULT_MAX_VALUE: i32 = 32_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    data: Vec<i32>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Wrap a row-major buffer. `data.len()` must equal `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<i32>) -> Result<Self> {
        check_dims(rows, cols)?;
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::ShapeMismatch {
                rows,
                cols,
                actual: data.len(),
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        check_dims(rows.len(), cols)?;

        let mut data = alloc_cells(rows.len(), cols)?;
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::RaggedRow {
                    row: index,
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Ok(Matrix {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: i32) -> Result<Self> {
        check_dims(rows, cols)?;
        let mut data = alloc_cells(rows, cols)?;
        data.resize(rows * cols, value);
        Ok(Matrix { data, rows, cols })
    }

    /// Matrix of uniform values in `[0, max_value)`. `max_value` must be positive.
    ///
    /// Each row draws from its own generator derived from `(seed, row)`, so the
    /// contents depend only on the arguments, not on how rayon schedules rows.
    pub fn random(rows: usize, cols: usize, seed: u64, max_value: i32) -> Result<Self> {
        check_dims(rows, cols)?;
        if max_value <= 0 {
            return Err(Error::InvalidMaxValue(max_value));
        }

        let mut data = alloc_cells(rows, cols)?;
        data.resize(rows * cols, 0);
        data.par_chunks_mut(cols).enumerate().for_each(|(row, cells)| {
            let mut rng = StdRng::seed_from_u64(row_seed(seed, row));
            for cell in cells.iter_mut() {
                *cell = rng.gen_range(0..max_value);
            }
        });

        Ok(Matrix { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance in cells between the starts of two consecutive rows.
    pub fn stride(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: empty matrices cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Borrow one row. Panics when `row >= rows()`.
    pub fn row(&self, row: usize) -> &[i32] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = i32;

    fn index(&self, (row, col): (usize, usize)) -> &i32 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        &self.data[row * self.cols + col]
    }
}

fn check_dims(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(Error::EmptyMatrix { rows, cols });
    }
    Ok(())
}

/// Reserve room for `rows * cols` cells, reporting exhaustion instead of aborting.
fn alloc_cells(rows: usize, cols: usize) -> Result<Vec<i32>> {
    let elements = rows.saturating_mul(cols);
    let len = rows.checked_mul(cols).ok_or(Error::Allocation {
        what: "matrix",
        elements,
    })?;

    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| Error::Allocation {
        what: "matrix",
        elements: len,
    })?;
    Ok(data)
}

fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_row_major() {
        let m = Matrix::from_rows(&[[1, 2, 3], [4, 5, 6]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.stride(), 3);
        assert_eq!(m.as_slice(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(m.get(1, 0), Some(4));
        assert_eq!(m[(0, 2)], 3);
        assert_eq!(m.row(1), &[4, 5, 6]);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let m = Matrix::filled(2, 2, 7).unwrap();
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.get(0, 2), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_out_of_bounds_panics() {
        let m = Matrix::filled(1, 1, 0).unwrap();
        let _ = m[(1, 0)];
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows: Vec<Vec<i32>> = vec![vec![1, 2], vec![3]];
        let err = Matrix::from_rows(&rows).unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_empty_dimensions_rejected() {
        assert!(matches!(
            Matrix::filled(0, 4, 1),
            Err(Error::EmptyMatrix { rows: 0, cols: 4 })
        ));
        assert!(matches!(
            Matrix::random(3, 0, DEFAULT_SEED, DEFAULT_MAX_VALUE),
            Err(Error::EmptyMatrix { .. })
        ));
        let no_rows: Vec<Vec<i32>> = Vec::new();
        assert!(Matrix::from_rows(&no_rows).is_err());
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        let err = Matrix::from_vec(2, 3, vec![0; 5]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { actual: 5, .. }));
        assert!(Matrix::from_vec(2, 3, vec![0; 6]).is_ok());
    }

    #[test]
    fn test_random_is_deterministic_and_bounded() {
        let a = Matrix::random(37, 53, 42, 100).unwrap();
        let b = Matrix::random(37, 53, 42, 100).unwrap();
        let c = Matrix::random(37, 53, 43, 100).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_slice().iter().all(|&v| (0..100).contains(&v)));
    }

    #[test]
    fn test_random_rejects_non_positive_max_value() {
        assert!(matches!(
            Matrix::random(4, 4, 1, 0),
            Err(Error::InvalidMaxValue(0))
        ));
        assert!(matches!(
            Matrix::random(4, 4, 1, -5),
            Err(Error::InvalidMaxValue(-5))
        ));

        let zeros = Matrix::random(4, 4, 1, 1).unwrap();
        assert!(zeros.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_oversized_allocation_reported() {
        let err = Matrix::filled(usize::MAX, 2, 0).unwrap_err();
        assert!(err.is_allocation());
    }
}

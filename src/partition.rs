//! Macroblock tiling of a `rows x cols` matrix.
//!
//! [`BlockGrid`] is the only place the tiling formula lives. Lazy lookups
//! (`BlockGrid::block`) and the precomputed descriptor array (`partition`) both
//! go through it, so they always agree on block boundaries.

use crate::error::{Error, Result};
use std::ops::Range;

/// Half-open rectangle `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Macroblock {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Macroblock {
    pub fn rows(&self) -> Range<usize> {
        self.row_start..self.row_end
    }

    pub fn cols(&self) -> Range<usize> {
        self.col_start..self.col_end
    }

    pub fn height(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    /// Number of cells covered by this block.
    pub fn cells(&self) -> usize {
        self.height() * self.width()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.rows().contains(&row) && self.cols().contains(&col)
    }
}

/// Row-major grid of macroblocks over a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    rows: usize,
    cols: usize,
    block_height: usize,
    block_width: usize,
    block_rows: usize,
    block_cols: usize,
}

impl BlockGrid {
    pub fn new(rows: usize, cols: usize, block_height: usize, block_width: usize) -> Result<Self> {
        if block_height == 0 || block_width == 0 {
            return Err(Error::InvalidBlockSize {
                height: block_height,
                width: block_width,
            });
        }

        Ok(BlockGrid {
            rows,
            cols,
            block_height,
            block_width,
            block_rows: rows.div_ceil(block_height),
            block_cols: cols.div_ceil(block_width),
        })
    }

    /// Number of block rows, `ceil(rows / block_height)`.
    pub fn block_rows(&self) -> usize {
        self.block_rows
    }

    /// Number of block columns, `ceil(cols / block_width)`.
    pub fn block_cols(&self) -> usize {
        self.block_cols
    }

    pub fn total_blocks(&self) -> usize {
        self.block_rows * self.block_cols
    }

    /// Block `index` in row-major order, clamped to the matrix edge.
    ///
    /// Returns `None` once `index >= total_blocks()`.
    pub fn block(&self, index: usize) -> Option<Macroblock> {
        (index < self.total_blocks()).then(|| self.locate(index))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Macroblock> + '_ {
        (0..self.total_blocks()).map(move |index| self.locate(index))
    }

    /// Same as [`partition`] for an existing grid.
    pub fn descriptors(&self) -> Result<Vec<Macroblock>> {
        let total = self.total_blocks();
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(total)
            .map_err(|_| Error::Allocation {
                what: "macroblock descriptors",
                elements: total,
            })?;
        blocks.extend(self.iter());
        Ok(blocks)
    }

    fn locate(&self, index: usize) -> Macroblock {
        let block_row = index / self.block_cols;
        let block_col = index % self.block_cols;

        let row_start = block_row * self.block_height;
        let col_start = block_col * self.block_width;

        Macroblock {
            row_start,
            row_end: (row_start + self.block_height).min(self.rows),
            col_start,
            col_end: (col_start + self.block_width).min(self.cols),
        }
    }
}

/// Precompute every macroblock of the grid, in claim order.
///
/// The descriptor array is reserved up front; exhaustion is reported as
/// [`Error::Allocation`] rather than aborting the process.
pub fn partition(
    rows: usize,
    cols: usize,
    block_height: usize,
    block_width: usize,
) -> Result<Vec<Macroblock>> {
    BlockGrid::new(rows, cols, block_height, block_width)?.descriptors()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_block_counts() {
        let grid = BlockGrid::new(10, 7, 3, 2).unwrap();
        assert_eq!(grid.block_rows(), 4);
        assert_eq!(grid.block_cols(), 4);
        assert_eq!(grid.total_blocks(), 16);
    }

    #[test]
    fn test_row_major_order() {
        let grid = BlockGrid::new(4, 4, 2, 2).unwrap();
        let starts: Vec<(usize, usize)> = grid.iter().map(|b| (b.row_start, b.col_start)).collect();
        assert_eq!(starts, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);
    }

    #[test]
    fn test_edge_blocks_are_truncated() {
        let grid = BlockGrid::new(5, 7, 2, 3).unwrap();
        let last = grid.block(grid.total_blocks() - 1).unwrap();
        assert_eq!(
            last,
            Macroblock {
                row_start: 4,
                row_end: 5,
                col_start: 6,
                col_end: 7,
            }
        );
        assert_eq!(last.cells(), 1);
        assert_eq!(grid.block(grid.total_blocks()), None);
    }

    #[test]
    fn test_block_larger_than_matrix() {
        let blocks = partition(3, 2, 100, 100).unwrap();
        assert_eq!(
            blocks,
            vec![Macroblock {
                row_start: 0,
                row_end: 3,
                col_start: 0,
                col_end: 2,
            }]
        );
    }

    #[test]
    fn test_single_cell() {
        let blocks = partition(1, 1, 1, 1).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains(0, 0));
        assert!(!blocks[0].contains(0, 1));
    }

    #[test]
    fn test_zero_block_dimension_rejected() {
        assert!(matches!(
            BlockGrid::new(4, 4, 0, 2),
            Err(Error::InvalidBlockSize { height: 0, width: 2 })
        ));
        assert!(partition(4, 4, 2, 0).is_err());
    }

    #[test]
    fn test_lazy_and_precomputed_agree() {
        let grid = BlockGrid::new(23, 41, 4, 6).unwrap();
        let precomputed = grid.descriptors().unwrap();
        assert_eq!(precomputed.len(), grid.total_blocks());
        for (index, block) in precomputed.iter().enumerate() {
            assert_eq!(grid.block(index), Some(*block));
        }
    }

    proptest! {
        #[test]
        fn prop_blocks_tile_matrix_exactly(
            rows in 1usize..40,
            cols in 1usize..40,
            block_height in 1usize..12,
            block_width in 1usize..12,
        ) {
            let blocks = partition(rows, cols, block_height, block_width).unwrap();
            prop_assert_eq!(
                blocks.len(),
                rows.div_ceil(block_height) * cols.div_ceil(block_width)
            );

            let mut seen = HashSet::with_capacity(rows * cols);
            for block in &blocks {
                prop_assert!(block.row_start < block.row_end && block.row_end <= rows);
                prop_assert!(block.col_start < block.col_end && block.col_end <= cols);
                prop_assert!(block.height() <= block_height && block.width() <= block_width);
                for row in block.rows() {
                    for col in block.cols() {
                        prop_assert!(
                            seen.insert((row, col)),
                            "cell ({}, {}) covered twice",
                            row,
                            col
                        );
                    }
                }
            }
            prop_assert_eq!(seen.len(), rows * cols);
        }
    }
}

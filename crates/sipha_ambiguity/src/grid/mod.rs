//! # Grid Layout
//!
//! Divergent path segments laid out on a matrix of node ids so that equal
//! nodes share a column.
//!
//! A [`Grid`] is a rectangle of `i32` ids with [`EMPTY`] marking free cells.
//! Every value has an *anchor*: the greatest column it occupies in any row.
//! [`GridAligner`] moves values toward their anchors, separates columns that
//! hold different values, and trims columns nobody uses. All moves go through
//! a [`ShiftMatrix`], which is validated before any cell is written.
//!
//! [`GridLayout`] builds a grid from a [`PathDiff`](crate::diff::PathDiff)
//! and renders it as text.

mod aligner;
mod layout;

pub use aligner::{AlignStats, GridAligner};
pub use layout::GridLayout;

use crate::error::GridError;
use hashbrown::{HashMap, HashSet};
use std::fmt;

/// Marker of an unoccupied cell
pub const EMPTY: i32 = -1;

/// Anchor column per value
pub type Anchors = HashMap<i32, usize, ahash::RandomState>;

/// Rectangular matrix of node ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<i32>>,
    width: usize,
}

impl Grid {
    /// Build a grid from `rows`, padding each to a common width.
    ///
    /// With a fixed `width`, rows are padded to it and a longer row is an
    /// error.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidValue`] for a negative id other than [`EMPTY`]
    /// - [`GridError::DuplicateInRow`] when a row holds an id twice
    /// - [`GridError::RowTooWide`] when a row exceeds the fixed width
    pub fn new(rows: Vec<Vec<i32>>, width: Option<usize>) -> Result<Self, GridError> {
        for (row, cells) in rows.iter().enumerate() {
            let mut seen: HashSet<i32, ahash::RandomState> = HashSet::default();
            for &value in cells {
                if value == EMPTY {
                    continue;
                }
                if value < 0 {
                    return Err(GridError::InvalidValue { row, value });
                }
                if !seen.insert(value) {
                    return Err(GridError::DuplicateInRow { row, value });
                }
            }
            if let Some(width) = width
                && cells.len() > width
            {
                return Err(GridError::RowTooWide {
                    row,
                    len: cells.len(),
                    width,
                });
            }
        }

        let width = width.unwrap_or_else(|| rows.iter().map(Vec::len).max().unwrap_or(0));
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, EMPTY);
                cells
            })
            .collect();
        Ok(Self { rows, width })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[i32]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Id at `(row, column)`, `None` for empty or out-of-range cells
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<i32> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .copied()
            .filter(|&value| value != EMPTY)
    }

    /// Non-empty cells of `row` as `(column, value)`
    pub fn occupied(&self, row: usize) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|cells| cells.iter().copied().enumerate())
            .filter(|&(_, value)| value != EMPTY)
    }

    /// Greatest column each value occupies in any row
    #[must_use]
    pub fn anchors(&self) -> Anchors {
        let mut anchors = Anchors::default();
        for cells in &self.rows {
            for (column, &value) in cells.iter().enumerate() {
                if value != EMPTY {
                    let anchor = anchors.entry(value).or_insert(column);
                    *anchor = (*anchor).max(column);
                }
            }
        }
        anchors
    }

    #[must_use]
    pub fn anchor(&self, value: i32) -> Option<usize> {
        self.rows
            .iter()
            .filter_map(|cells| cells.iter().position(|&v| v == value))
            .max()
    }

    /// Drop every column that is empty in all rows, returning how many went
    pub fn trim(&mut self) -> usize {
        let used: Vec<bool> = (0..self.width)
            .map(|column| self.rows.iter().any(|cells| cells[column] != EMPTY))
            .collect();
        let removed = used.iter().filter(|&&u| !u).count();
        if removed == 0 {
            return 0;
        }
        for cells in &mut self.rows {
            let mut column = 0;
            cells.retain(|_| {
                let keep = used[column];
                column += 1;
                keep
            });
        }
        self.width -= removed;
        removed
    }

    /// Move cells as `shifts` says.
    ///
    /// Every destination is computed and checked before the grid is touched;
    /// the grid grows when a destination lies past the last column. Returns
    /// whether any cell moved.
    ///
    /// # Errors
    ///
    /// - [`GridError::ShapeMismatch`] when the matrix has a different row count
    /// - [`GridError::ShiftCollision`] when two cells land in one column
    pub fn apply_shifts(&mut self, shifts: &ShiftMatrix) -> Result<bool, GridError> {
        if shifts.rows.len() != self.rows.len() {
            return Err(GridError::ShapeMismatch {
                expected: self.rows.len(),
                actual: shifts.rows.len(),
            });
        }
        if shifts.is_identity() {
            return Ok(false);
        }

        let needed = self
            .rows
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != EMPTY)
                    .map(move |(column, _)| column + shifts.amount(row, column) + 1)
            })
            .max()
            .unwrap_or(0);
        let width = doubled(self.width, needed);

        let mut moved = Vec::with_capacity(self.rows.len());
        for (row, cells) in self.rows.iter().enumerate() {
            let mut next = vec![EMPTY; width];
            for (column, &value) in cells.iter().enumerate() {
                if value == EMPTY {
                    continue;
                }
                let to = column + shifts.amount(row, column);
                if next[to] != EMPTY {
                    return Err(GridError::ShiftCollision {
                        row,
                        from: column,
                        to,
                    });
                }
                next[to] = value;
            }
            moved.push(next);
        }

        if width > self.width {
            tracing::trace!(from = self.width, to = width, "grid grown");
        }
        self.rows = moved;
        self.width = width;
        Ok(true)
    }
}

fn doubled(width: usize, needed: usize) -> usize {
    if needed <= width {
        return width;
    }
    let mut width = width.max(1);
    while width < needed {
        width *= 2;
    }
    width
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cells in &self.rows {
            let line: Vec<String> = cells
                .iter()
                .map(|&v| if v == EMPTY { ".".to_string() } else { v.to_string() })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Per-cell rightward moves for one grid update.
///
/// Cell `(row, column)` moves to `column + amount(row, column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftMatrix {
    rows: Vec<Vec<usize>>,
}

impl ShiftMatrix {
    /// All-zero matrix for a grid of `rows` x `width`
    #[must_use]
    pub fn new(rows: usize, width: usize) -> Self {
        Self {
            rows: vec![vec![0; width]; rows],
        }
    }

    #[must_use]
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.row_count(), grid.width())
    }

    #[must_use]
    pub fn amount(&self, row: usize, column: usize) -> usize {
        self.rows
            .get(row)
            .and_then(|amounts| amounts.get(column))
            .copied()
            .unwrap_or(0)
    }

    /// Move `column` and everything right of it by `amount`
    pub fn shift_suffix(&mut self, row: usize, column: usize, amount: usize) {
        if let Some(amounts) = self.rows.get_mut(row) {
            for a in amounts.iter_mut().skip(column) {
                *a += amount;
            }
        }
    }

    /// Move the single cell at `column` by `amount`
    pub fn shift_cell(&mut self, row: usize, column: usize, amount: usize) {
        if let Some(a) = self.rows.get_mut(row).and_then(|amounts| amounts.get_mut(column)) {
            *a += amount;
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rows.iter().flatten().all(|&a| a == 0)
    }
}

use super::{Anchors, EMPTY, Grid, ShiftMatrix};
use crate::config::GridConfig;
use crate::error::GridError;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Counters from one [`GridAligner::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignStats {
    pub passes: usize,
    /// Whether the last pass changed nothing
    pub converged: bool,
    /// Columns removed by trimming, over all passes
    pub trimmed: usize,
}

/// Iterative column alignment of a [`Grid`].
///
/// A pass runs [`align`](Self::align), [`align_inners`](Self::align_inners)
/// and [`align_starts`](Self::align_starts), then repeats
/// [`shift_conflicts`](Self::shift_conflicts) until no column holds two
/// different values, then trims empty columns. Passes repeat until one
/// changes nothing or the configured cap is hit.
///
/// The first three steps only move a value toward its anchor and never past
/// it, every move of a row suffix is limited by the slack of the cells it
/// carries along, and no move lands a value in a column where another row
/// holds a different value. So once the first pass has separated the
/// conflicting columns, later passes only close the distance between values
/// and their anchors, and the run ends at a fixpoint.
#[derive(Debug, Clone, Default)]
pub struct GridAligner {
    config: GridConfig,
}

impl GridAligner {
    #[must_use]
    pub const fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// Align `grid` in place.
    ///
    /// # Errors
    ///
    /// [`GridError`] when a computed shift is malformed.
    pub fn run(&self, grid: &mut Grid) -> Result<AlignStats, GridError> {
        let mut stats = AlignStats {
            trimmed: grid.trim(),
            ..AlignStats::default()
        };

        while stats.passes < self.config.max_passes {
            stats.passes += 1;
            let mut changed = Self::align(grid)?;
            changed |= Self::align_inners(grid)?;
            changed |= Self::align_starts(grid)?;
            while Self::shift_conflicts(grid)? {
                changed = true;
            }
            let trimmed = grid.trim();
            stats.trimmed += trimmed;
            tracing::trace!(pass = stats.passes, changed, trimmed, width = grid.width(), "grid pass");
            if !changed && trimmed == 0 {
                stats.converged = true;
                return Ok(stats);
            }
        }

        tracing::warn!(
            passes = stats.passes,
            rows = grid.row_count(),
            width = grid.width(),
            "grid alignment stopped before reaching a fixpoint"
        );
        Ok(stats)
    }

    /// Push each row suffix right so its leading value reaches its anchor,
    /// as far as the cells carried along allow.
    ///
    /// # Errors
    ///
    /// [`GridError`] when a computed shift is malformed.
    pub fn align(grid: &mut Grid) -> Result<bool, GridError> {
        let anchors = grid.anchors();
        let mut shifts = ShiftMatrix::for_grid(grid);
        let mut occupancy = Occupancy::new(grid);

        for (row, cells) in grid.rows().iter().enumerate() {
            let mut offset = 0;
            for (column, &value) in cells.iter().enumerate() {
                if value == EMPTY {
                    continue;
                }
                let position = column + offset;
                let wanted = anchor_of(&anchors, value).saturating_sub(position);
                if wanted == 0 {
                    continue;
                }
                let amount = wanted.min(slack(&anchors, cells, column + 1, offset));
                let amount = occupancy.admissible_suffix(&shifts, row, column, amount);
                if amount > 0 {
                    shifts.shift_suffix(row, column, amount);
                    offset += amount;
                }
            }
            occupancy.claim(&shifts, row);
        }
        grid.apply_shifts(&shifts)
    }

    /// Move a value that has only empty cells between it and its anchor
    /// straight into the anchor cell.
    ///
    /// # Errors
    ///
    /// [`GridError`] when a computed shift is malformed.
    pub fn align_inners(grid: &mut Grid) -> Result<bool, GridError> {
        let anchors = grid.anchors();
        let mut shifts = ShiftMatrix::for_grid(grid);
        let mut occupancy = Occupancy::new(grid);

        for (row, cells) in grid.rows().iter().enumerate() {
            for (column, &value) in cells.iter().enumerate() {
                if value == EMPTY {
                    continue;
                }
                let anchor = anchor_of(&anchors, value);
                if anchor > column
                    && cells[column + 1..=anchor].iter().all(|&v| v == EMPTY)
                    && occupancy.admits(row, anchor, value)
                {
                    shifts.shift_cell(row, column, anchor - column);
                }
            }
            occupancy.claim(&shifts, row);
        }
        grid.apply_shifts(&shifts)
    }

    /// Shift rows whose first value starts left of the smallest anchor any
    /// row's first value claims.
    ///
    /// # Errors
    ///
    /// [`GridError`] when a computed shift is malformed.
    pub fn align_starts(grid: &mut Grid) -> Result<bool, GridError> {
        let anchors = grid.anchors();
        let firsts: Vec<Option<(usize, i32)>> = (0..grid.row_count())
            .map(|row| grid.occupied(row).next())
            .collect();
        let Some(target) = firsts
            .iter()
            .flatten()
            .map(|&(_, value)| anchor_of(&anchors, value))
            .min()
        else {
            return Ok(false);
        };

        let mut shifts = ShiftMatrix::for_grid(grid);
        let mut occupancy = Occupancy::new(grid);
        for (row, first) in firsts.iter().enumerate() {
            let Some((column, _)) = *first else {
                continue;
            };
            if column >= target {
                continue;
            }
            let amount = (target - column).min(slack(&anchors, &grid.rows()[row], column, 0));
            let amount = occupancy.admissible_suffix(&shifts, row, column, amount);
            if amount > 0 {
                shifts.shift_suffix(row, column, amount);
                occupancy.claim(&shifts, row);
            }
        }
        grid.apply_shifts(&shifts)
    }

    /// Separate the leftmost column holding different values.
    ///
    /// Each distinct value in that column gets an offset in order of first
    /// appearance (0, 1, ...), and every row's suffix from that column is
    /// pushed by its value's offset. Columns left of it are untouched, so
    /// calling this until it returns `false` leaves no conflicting column.
    ///
    /// # Errors
    ///
    /// [`GridError`] when a computed shift is malformed.
    pub fn shift_conflicts(grid: &mut Grid) -> Result<bool, GridError> {
        let Some((column, values)) = (0..grid.width()).find_map(|column| {
            let mut values: Vec<i32> = Vec::new();
            for cells in grid.rows() {
                let value = cells[column];
                if value != EMPTY && !values.contains(&value) {
                    values.push(value);
                }
            }
            (values.len() > 1).then_some((column, values))
        }) else {
            return Ok(false);
        };

        tracing::trace!(column, values = values.len(), "column conflict");
        let mut shifts = ShiftMatrix::for_grid(grid);
        for (row, cells) in grid.rows().iter().enumerate() {
            if let Some(offset) = values.iter().position(|&v| v == cells[column])
                && offset > 0
            {
                shifts.shift_suffix(row, column, offset);
            }
        }
        grid.apply_shifts(&shifts)
    }
}

/// Values each column holds, plus the cells earlier rows of the same step
/// will move into it.
///
/// A cell leaving a column still counts there until the step lands.
struct Occupancy<'g> {
    grid: &'g Grid,
    claimed: HashMap<usize, SmallVec<[(usize, i32); 2]>, ahash::RandomState>,
}

impl<'g> Occupancy<'g> {
    fn new(grid: &'g Grid) -> Self {
        Self {
            grid,
            claimed: HashMap::default(),
        }
    }

    /// Whether `value` may land in `column` of `row` without sharing the
    /// column with a different value
    fn admits(&self, row: usize, column: usize, value: i32) -> bool {
        let settled = self.grid.rows().iter().enumerate().all(|(r, cells)| {
            r == row || cells.get(column).is_none_or(|&v| v == EMPTY || v == value)
        });
        settled
            && self
                .claimed
                .get(&column)
                .is_none_or(|cells| cells.iter().all(|&(r, v)| r == row || v == value))
    }

    /// Largest amount up to `amount` by which the suffix of `row` from
    /// `column` can move on top of `shifts`
    fn admissible_suffix(&self, shifts: &ShiftMatrix, row: usize, column: usize, amount: usize) -> usize {
        let Some(cells) = self.grid.row(row) else {
            return 0;
        };
        (1..=amount)
            .rev()
            .find(|&extra| {
                cells
                    .iter()
                    .enumerate()
                    .skip(column)
                    .filter(|&(_, &v)| v != EMPTY)
                    .all(|(c, &v)| self.admits(row, c + shifts.amount(row, c) + extra, v))
            })
            .unwrap_or(0)
    }

    /// Record where the moved cells of `row` land
    fn claim(&mut self, shifts: &ShiftMatrix, row: usize) {
        let Some(cells) = self.grid.row(row) else {
            return;
        };
        for (column, &value) in cells.iter().enumerate() {
            let amount = shifts.amount(row, column);
            if value != EMPTY && amount > 0 {
                self.claimed.entry(column + amount).or_default().push((row, value));
            }
        }
    }
}

fn anchor_of(anchors: &Anchors, value: i32) -> usize {
    anchors.get(&value).copied().unwrap_or(0)
}

/// How far the cells of `cells[from..]` can move right, given that they have
/// already moved by `offset`, before one of them passes its anchor.
fn slack(anchors: &Anchors, cells: &[i32], from: usize, offset: usize) -> usize {
    cells
        .iter()
        .enumerate()
        .skip(from)
        .filter(|&(_, &v)| v != EMPTY)
        .map(|(column, &v)| anchor_of(anchors, v).saturating_sub(column + offset))
        .min()
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: i32 = EMPTY;

    fn grid(rows: &[&[i32]]) -> Grid {
        Grid::new(rows.iter().map(|r| r.to_vec()).collect(), None).unwrap()
    }

    #[test]
    fn test_align_stops_at_slack() {
        let mut g = grid(&[&[1, 2], &[E, E, 1], &[E, 2]]);
        // 1 cannot reach column 2 without pushing 2 past column 1
        assert!(!GridAligner::align(&mut g).unwrap());
        assert_eq!(g.row(0), Some(&[1, 2, E][..]));

        let mut g = grid(&[&[1, 2], &[E, 1, E, 2]]);
        assert!(GridAligner::align(&mut g).unwrap());
        assert_eq!(g.row(0), Some(&[E, 1, E, 2][..]));
    }

    #[test]
    fn test_align_never_shares_a_column() {
        // moving 1 would carry 4 onto the 5 of row 1
        let mut g = grid(&[&[1, 4], &[E, E, 1, 5, 4]]);
        assert!(GridAligner::align(&mut g).unwrap());
        assert_eq!(g.row(0), Some(&[1, E, E, E, 4][..]));
    }

    #[test]
    fn test_align_inners_moves_single_cell() {
        let mut g = grid(&[&[1, E, E, 3], &[E, E, 1, 2]]);
        assert!(GridAligner::align_inners(&mut g).unwrap());
        assert_eq!(g.row(0), Some(&[E, E, 1, 3][..]));
        assert_eq!(g.row(1), Some(&[E, E, 1, 2][..]));
    }

    #[test]
    fn test_align_starts() {
        let mut g = grid(&[&[E, E, 1, 2], &[3], &[E, 3]]);
        assert!(GridAligner::align_starts(&mut g).unwrap());
        assert_eq!(g.row(1), Some(&[E, 3, E, E][..]));
        assert!(!GridAligner::align_starts(&mut g).unwrap());
    }

    #[test]
    fn test_shift_conflicts_offsets_by_first_appearance() {
        let mut g = grid(&[&[1, 2], &[3, 2], &[1, E]]);
        assert!(GridAligner::shift_conflicts(&mut g).unwrap());
        assert_eq!(g.width(), 4);
        assert_eq!(g.row(0), Some(&[1, 2, E, E][..]));
        assert_eq!(g.row(1), Some(&[E, 3, 2, E][..]));
        assert_eq!(g.row(2), Some(&[1, E, E, E][..]));
    }

    #[test]
    fn test_run_separates_swapped_rows() {
        let mut g = grid(&[&[1, 2], &[2, 1]]);
        let stats = GridAligner::default().run(&mut g).unwrap();
        assert!(stats.converged);
        assert_eq!(g.rows(), &[vec![1, 2, E], vec![E, 2, 1]]);
    }

    #[test]
    fn test_run_reaches_fixpoint_for_shared_middles() {
        let mut g = grid(&[&[0, 1, 2], &[1, 2, 0]]);
        let stats = GridAligner::default().run(&mut g).unwrap();
        assert!(stats.converged);
        assert_eq!(g.rows(), &[vec![0, 1, 2, E], vec![E, 1, 2, 0]]);
    }

    #[test]
    fn test_run_settles_order_conflicts() {
        let mut g = grid(&[
            &[E, 7, 1, 6, 0],
            &[6, 7, E, 1, 4, 0],
            &[1, 4, 0],
            &[0, 2, 5, E, 4, 6],
            &[E, 5, 7],
        ]);
        let stats = GridAligner::default().run(&mut g).unwrap();
        assert!(stats.converged);
        assert!(stats.passes <= 4);
        for column in 0..g.width() {
            let mut values: Vec<i32> = g.rows().iter().map(|r| r[column]).filter(|&v| v != E).collect();
            values.dedup();
            assert!(values.len() <= 1, "column {column} of\n{g}");
        }
    }

    #[test]
    fn test_pass_cap() {
        let mut g = grid(&[&[1, 2], &[2, 1]]);
        let stats = GridAligner::new(GridConfig {
            max_passes: 1,
            initial_width: None,
        })
        .run(&mut g)
        .unwrap();
        assert_eq!(stats.passes, 1);
        assert!(!stats.converged);
    }
}

use super::{AlignStats, EMPTY, Grid, GridAligner};
use crate::config::GridConfig;
use crate::diff::PathDiff;
use crate::error::GridError;
use crate::path::{Commonalities, PathElement, commonalities};
use hashbrown::HashMap;
use std::fmt::{self, Write as _};

/// Aligned grid of the divergent middles of a [`PathDiff`].
///
/// Each row is the middle of one path once the head and tail shared by its
/// group are removed. Node ids are interned per `(element, occurrence)`, so
/// the second `expr` of one row lines up with the second `expr` of another
/// and no row holds an id twice.
#[derive(Debug, Clone)]
pub struct GridLayout {
    grid: Grid,
    labels: Vec<PathElement>,
    row_groups: Vec<usize>,
    groups: Vec<Commonalities>,
    terminals: Vec<PathElement>,
    stats: AlignStats,
}

impl GridLayout {
    /// Lay out and align every group of `diff`.
    ///
    /// # Errors
    ///
    /// [`GridError`] when the initial rows exceed the configured width or an
    /// alignment shift is malformed.
    pub fn from_diff(diff: &PathDiff, config: &GridConfig) -> Result<Self, GridError> {
        let mut ids: HashMap<(PathElement, usize), i32, ahash::RandomState> = HashMap::default();
        let mut labels: Vec<PathElement> = Vec::new();
        let mut rows: Vec<Vec<i32>> = Vec::with_capacity(diff.row_count());
        let mut row_groups = Vec::with_capacity(diff.row_count());
        let mut groups = Vec::with_capacity(diff.len());
        let mut terminals = Vec::with_capacity(diff.len());

        for (index, group) in diff.groups().iter().enumerate() {
            let common = commonalities(&group.paths);
            for middle in &common.middles {
                let mut occurrences: HashMap<&PathElement, usize, ahash::RandomState> =
                    HashMap::default();
                let row = middle
                    .iter()
                    .map(|element| {
                        let nth = occurrences.entry(element).or_insert(0);
                        let key = (element.clone(), *nth);
                        *nth += 1;
                        *ids.entry(key).or_insert_with(|| {
                            labels.push(element.clone());
                            i32::try_from(labels.len() - 1).unwrap_or(i32::MAX)
                        })
                    })
                    .collect();
                rows.push(row);
                row_groups.push(index);
            }
            groups.push(common);
            terminals.push(group.terminal.clone());
        }

        let mut grid = Grid::new(rows, config.initial_width)?;
        let stats = GridAligner::new(config.clone()).run(&mut grid)?;
        tracing::debug!(
            rows = grid.row_count(),
            width = grid.width(),
            ids = labels.len(),
            passes = stats.passes,
            "grid layout built"
        );
        Ok(Self {
            grid,
            labels,
            row_groups,
            groups,
            terminals,
            stats,
        })
    }

    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub const fn stats(&self) -> AlignStats {
        self.stats
    }

    /// Element interned as `id`
    #[must_use]
    pub fn label(&self, id: i32) -> Option<&PathElement> {
        usize::try_from(id).ok().and_then(|i| self.labels.get(i))
    }

    /// Element at `(row, column)`
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&PathElement> {
        self.grid.get(row, column).and_then(|id| self.label(id))
    }

    /// Group index of `row`
    #[must_use]
    pub fn row_group(&self, row: usize) -> Option<usize> {
        self.row_groups.get(row).copied()
    }

    /// Rows belonging to group `group`
    pub fn rows_of_group(&self, group: usize) -> impl Iterator<Item = usize> + '_ {
        self.row_groups
            .iter()
            .enumerate()
            .filter(move |&(_, &g)| g == group)
            .map(|(row, _)| row)
    }

    /// Shared head and tail of group `group`
    #[must_use]
    pub fn commonalities(&self, group: usize) -> Option<&Commonalities> {
        self.groups.get(group)
    }

    /// Text rendering: per group a header with the terminal, shared head and
    /// shared tail, then one line per row with labels padded into columns.
    #[must_use]
    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.grid.width())
            .map(|column| {
                (0..self.grid.row_count())
                    .filter_map(|row| self.cell(row, column))
                    .map(|element| element.to_string().len())
                    .max()
                    .unwrap_or(1)
            })
            .collect();

        let mut out = String::new();
        for (index, common) in self.groups.iter().enumerate() {
            let terminal = &self.terminals[index];
            let _ = writeln!(
                out,
                "{terminal}: {} | ... | {}",
                join(&common.head),
                join(&common.tail)
            );
            for row in self.rows_of_group(index) {
                let cells = self.grid.row(row).unwrap_or_default();
                let mut line = String::from("  ");
                for (column, &id) in cells.iter().enumerate() {
                    let text = if id == EMPTY {
                        String::new()
                    } else {
                        self.label(id).map(ToString::to_string).unwrap_or_default()
                    };
                    let _ = write!(line, "{text:<width$} ", width = widths[column]);
                }
                let _ = writeln!(out, "{}", line.trim_end());
            }
        }
        out
    }
}

fn join(elements: &[PathElement]) -> String {
    let labels: Vec<String> = elements.iter().map(ToString::to_string).collect();
    labels.join(" ")
}

impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_paths;
    use crate::path::ParsePath;

    fn path(labels: &str) -> ParsePath {
        labels
            .split_whitespace()
            .map(|l| {
                if l.chars().all(char::is_uppercase) {
                    PathElement::token(l)
                } else {
                    PathElement::rule(l)
                }
            })
            .collect()
    }

    #[test]
    fn test_expression_middles_line_up() {
        let diff = diff_paths(&[
            path("e e e A O e A O e A"),
            path("e e A O e e A O e A"),
        ]);
        let layout = GridLayout::from_diff(&diff, &GridConfig::default()).unwrap();
        assert!(layout.stats().converged);
        assert_eq!(layout.grid().row_count(), 2);
        assert_eq!(layout.row_group(1), Some(0));

        let row = |r: usize| -> Vec<Option<String>> {
            (0..layout.grid().width())
                .map(|c| layout.cell(r, c).map(ToString::to_string))
                .collect()
        };
        let s = |l: &str| Some(l.to_string());
        assert_eq!(row(0), vec![s("e"), s("A"), s("O"), None]);
        assert_eq!(row(1), vec![None, s("A"), s("O"), s("e")]);

        let text = layout.render();
        assert!(text.starts_with("A: e e | ... | e A O e A\n"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_repeated_labels_get_distinct_ids() {
        let diff = diff_paths(&[path("s x x Z"), path("s y Z")]);
        let layout = GridLayout::from_diff(&diff, &GridConfig::default()).unwrap();
        let ids: Vec<i32> = layout.grid().occupied(0).map(|(_, id)| id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(layout.label(ids[1]).map(|e| e.label.as_str()), Some("x"));
    }

    #[test]
    fn test_fixed_width_too_small() {
        let diff = diff_paths(&[path("s a b c Z"), path("s d Z")]);
        let config = GridConfig {
            max_passes: 8,
            initial_width: Some(1),
        };
        assert!(matches!(
            GridLayout::from_diff(&diff, &config),
            Err(GridError::RowTooWide { row: 0, len: 3, width: 1 })
        ));
    }
}

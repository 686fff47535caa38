//! Property-based tests for the path and grid algorithms

#![cfg(test)]

use proptest::prelude::*;
use sipha_ambiguity::config::GridConfig;
use sipha_ambiguity::diff::diff_paths;
use sipha_ambiguity::grid::{EMPTY, Grid, GridAligner};
use sipha_ambiguity::path::{ParsePath, PathElement, commonalities};

const LABELS: [&str; 4] = ["expr", "term", "ID", "OP"];

fn path_strategy() -> impl Strategy<Value = ParsePath> {
    prop::collection::vec(0..LABELS.len(), 0..8).prop_map(|indices| {
        indices
            .into_iter()
            .map(|i| {
                if i < 2 {
                    PathElement::rule(LABELS[i])
                } else {
                    PathElement::token(LABELS[i])
                }
            })
            .collect()
    })
}

fn row_strategy() -> impl Strategy<Value = Vec<i32>> {
    (
        prop::sample::subsequence((0..10).collect::<Vec<i32>>(), 0..6).prop_shuffle(),
        prop::collection::vec(0usize..3, 6),
    )
        .prop_map(|(values, gaps)| {
            let mut row = Vec::new();
            for (value, gap) in values.into_iter().zip(gaps) {
                row.extend(std::iter::repeat_n(EMPTY, gap));
                row.push(value);
            }
            row
        })
}

fn occupied(grid: &Grid, row: usize) -> Vec<i32> {
    grid.occupied(row).map(|(_, v)| v).collect()
}

fn has_duplicates(values: &[i32]) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

proptest! {
    #[test]
    fn test_commonalities_round_trip(paths in prop::collection::vec(path_strategy(), 1..5)) {
        let common = commonalities(&paths);
        let shortest = paths.iter().map(ParsePath::len).min().unwrap_or(0);
        prop_assert!(common.head.len() + common.tail.len() <= shortest);
        prop_assert_eq!(common.middles.len(), paths.len());
        for (i, path) in paths.iter().enumerate() {
            let rebuilt = common.path(i);
            prop_assert_eq!(rebuilt.as_ref(), Some(path));
        }
    }

    #[test]
    fn test_diff_groups_are_divergent(paths in prop::collection::vec(path_strategy(), 0..8)) {
        let diff = diff_paths(&paths);
        for group in diff.groups() {
            prop_assert!(group.len() >= 2);
            for (i, path) in group.paths.iter().enumerate() {
                prop_assert_eq!(path.terminal(), Some(&group.terminal));
                prop_assert!(!group.paths[i + 1..].contains(path));
            }
        }
    }

    #[test]
    fn test_trim_keeps_rows_and_ids(rows in prop::collection::vec(row_strategy(), 1..6)) {
        let mut grid = Grid::new(rows.clone(), None).unwrap();
        grid.trim();
        prop_assert_eq!(grid.row_count(), rows.len());
        for (row, cells) in rows.iter().enumerate() {
            let expected: Vec<i32> = cells.iter().copied().filter(|&v| v != EMPTY).collect();
            let values = occupied(&grid, row);
            prop_assert!(!has_duplicates(&values));
            prop_assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_alignment_preserves_rows(rows in prop::collection::vec(row_strategy(), 1..6)) {
        let mut grid = Grid::new(rows.clone(), None).unwrap();
        let config = GridConfig { max_passes: 16, initial_width: None };
        GridAligner::new(config).run(&mut grid).unwrap();
        prop_assert_eq!(grid.row_count(), rows.len());
        for (row, cells) in rows.iter().enumerate() {
            let expected: Vec<i32> = cells.iter().copied().filter(|&v| v != EMPTY).collect();
            prop_assert_eq!(occupied(&grid, row), expected);
        }
    }

    #[test]
    fn test_alignment_reaches_a_conflict_free_fixpoint(rows in prop::collection::vec(row_strategy(), 1..6)) {
        let mut grid = Grid::new(rows, None).unwrap();
        let stats = GridAligner::new(GridConfig::default()).run(&mut grid).unwrap();
        prop_assert!(stats.converged, "no fixpoint after {} passes:\n{}", stats.passes, grid);
        for column in 0..grid.width() {
            let mut values: Vec<i32> = grid
                .rows()
                .iter()
                .map(|cells| cells[column])
                .filter(|&v| v != EMPTY)
                .collect();
            values.sort_unstable();
            values.dedup();
            prop_assert!(values.len() <= 1, "column {} holds {:?}", column, values);
        }

        let before = grid.clone();
        let again = GridAligner::new(GridConfig::default()).run(&mut grid).unwrap();
        prop_assert_eq!(again.passes, 1);
        prop_assert_eq!(grid, before);
    }
}

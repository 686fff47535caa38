//! # Path Diff
//!
//! Reduces canonical paths to the groups that actually disagree: paths are
//! pooled without duplicates, grouped by the element they end in, and groups
//! with a single member are dropped.

use crate::path::{ParsePath, PathElement};
use hashbrown::{HashMap, HashSet};
use std::fmt;

/// Distinct paths ending in the same element
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PathGroup {
    pub terminal: PathElement,
    pub paths: Vec<ParsePath>,
}

impl PathGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Groups of divergent paths, in first-seen order of their terminal element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PathDiff {
    groups: Vec<PathGroup>,
}

impl PathDiff {
    #[must_use]
    pub fn groups(&self) -> &[PathGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, terminal: &PathElement) -> Option<&PathGroup> {
        self.groups.iter().find(|g| &g.terminal == terminal)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Total number of paths over all groups
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(PathGroup::len).sum()
    }

    /// Every path of every group, group by group
    pub fn rows(&self) -> impl Iterator<Item = (usize, &ParsePath)> {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| group.paths.iter().map(move |path| (index, path)))
    }
}

impl fmt::Display for PathDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            writeln!(f, "{}:", group.terminal)?;
            for path in &group.paths {
                writeln!(f, "  {path}")?;
            }
        }
        Ok(())
    }
}

/// Group `paths` by terminal element and keep only groups that diverge.
///
/// ```rust
/// use sipha_ambiguity::diff::diff_paths;
/// use sipha_ambiguity::path::{ParsePath, PathElement};
///
/// let a: ParsePath = [PathElement::rule("e"), PathElement::token("A")].into_iter().collect();
/// let b: ParsePath = [PathElement::rule("f"), PathElement::token("A")].into_iter().collect();
/// let diff = diff_paths(&[a.clone(), b, a]);
/// assert_eq!(diff.len(), 1);
/// assert_eq!(diff.groups()[0].len(), 2);
/// ```
#[must_use]
pub fn diff_paths(paths: &[ParsePath]) -> PathDiff {
    let mut seen: HashSet<&ParsePath, ahash::RandomState> = HashSet::default();
    let mut index: HashMap<&PathElement, usize, ahash::RandomState> = HashMap::default();
    let mut groups: Vec<PathGroup> = Vec::new();

    for path in paths {
        let Some(terminal) = path.terminal() else {
            continue;
        };
        if !seen.insert(path) {
            continue;
        }
        match index.get(terminal) {
            Some(&at) => groups[at].paths.push(path.clone()),
            None => {
                index.insert(terminal, groups.len());
                groups.push(PathGroup {
                    terminal: terminal.clone(),
                    paths: vec![path.clone()],
                });
            }
        }
    }

    let before = groups.len();
    groups.retain(|g| g.paths.len() > 1);
    tracing::trace!(pooled = seen.len(), groups = groups.len(), dropped = before - groups.len(), "path diff");
    PathDiff { groups }
}

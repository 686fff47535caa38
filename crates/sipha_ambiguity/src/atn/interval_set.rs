//! Sets of token types stored as sorted, disjoint, inclusive intervals.

use crate::atn::{TokenType, Vocabulary};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Inclusive interval `a..=b` of token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Interval {
    pub a: TokenType,
    pub b: TokenType,
}

impl Interval {
    #[must_use]
    pub const fn new(a: TokenType, b: TokenType) -> Self {
        Self { a, b }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        if self.b < self.a {
            0
        } else {
            (self.b - self.a) as usize + 1
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.b < self.a
    }
}

/// A set of token types.
///
/// Intervals are kept sorted and coalesced: adjacent or overlapping intervals
/// are merged on insertion, so two sets with the same members compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct IntervalSet {
    intervals: SmallVec<[Interval; 2]>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding a single token type
    #[must_use]
    pub fn of(token: TokenType) -> Self {
        Self::of_range(token, token)
    }

    /// Set holding `a..=b`
    #[must_use]
    pub fn of_range(a: TokenType, b: TokenType) -> Self {
        let mut set = Self::new();
        set.add_range(a, b);
        set
    }

    pub fn add(&mut self, token: TokenType) {
        self.add_range(token, token);
    }

    pub fn add_range(&mut self, a: TokenType, b: TokenType) {
        if b < a {
            return;
        }
        let mut merged = Interval::new(a, b);
        let mut out: SmallVec<[Interval; 2]> = SmallVec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;
        for &iv in &self.intervals {
            if iv.b.saturating_add(1) < merged.a {
                out.push(iv);
            } else if merged.b.saturating_add(1) < iv.a {
                if !placed {
                    out.push(merged);
                    placed = true;
                }
                out.push(iv);
            } else {
                merged = Interval::new(merged.a.min(iv.a), merged.b.max(iv.b));
            }
        }
        if !placed {
            out.push(merged);
        }
        self.intervals = out;
    }

    pub fn add_all(&mut self, other: &Self) {
        for iv in &other.intervals {
            self.add_range(iv.a, iv.b);
        }
    }

    #[must_use]
    pub fn contains(&self, token: TokenType) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if iv.b < token {
                    std::cmp::Ordering::Less
                } else if iv.a > token {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of token types in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.iter().map(|iv| iv.len()).sum()
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate every member in ascending order
    pub fn iter(&self) -> impl Iterator<Item = TokenType> + '_ {
        self.intervals.iter().flat_map(|iv| iv.a..=iv.b)
    }

    /// Members of `min..=max` that are not in this set
    #[must_use]
    pub fn complement(&self, min: TokenType, max: TokenType) -> Self {
        let mut result = Self::new();
        let mut next = min;
        for iv in &self.intervals {
            if iv.b < min {
                continue;
            }
            if iv.a > max {
                break;
            }
            if iv.a > next {
                result.add_range(next, iv.a - 1);
            }
            next = next.max(iv.b.saturating_add(1));
        }
        if next <= max {
            result.add_range(next, max);
        }
        result
    }

    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut result = Self::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            let lo = a.a.max(b.a);
            let hi = a.b.min(b.b);
            if lo <= hi {
                result.add_range(lo, hi);
            }
            if a.b < b.b {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }

    /// Remove a single member, splitting its interval if needed
    pub fn remove(&mut self, token: TokenType) {
        let mut out: SmallVec<[Interval; 2]> = SmallVec::with_capacity(self.intervals.len() + 1);
        for &iv in &self.intervals {
            if token < iv.a || token > iv.b {
                out.push(iv);
                continue;
            }
            if iv.a < token {
                out.push(Interval::new(iv.a, token - 1));
            }
            if token < iv.b {
                out.push(Interval::new(token + 1, iv.b));
            }
        }
        self.intervals = out;
    }

    /// Render members with their vocabulary display names
    #[must_use]
    pub fn to_string_with(&self, vocabulary: &Vocabulary) -> String {
        let names: Vec<_> = self.iter().map(|t| vocabulary.display_name(t)).collect();
        format!("{{{}}}", names.join(", "))
    }
}

impl FromIterator<TokenType> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = TokenType>>(iter: I) -> Self {
        let mut set = Self::new();
        for token in iter {
            set.add(token);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if iv.a == iv.b {
                write!(f, "{}", iv.a)?;
            } else {
                write!(f, "{}..{}", iv.a, iv.b)?;
            }
        }
        f.write_str("}")
    }
}

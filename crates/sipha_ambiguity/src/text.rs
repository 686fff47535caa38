//! Byte ranges into grammar source text.
//!
//! Transition states and parse-tree nodes point back into the grammar
//! definition they came from so that a rendered diff cell can be mapped to the
//! rule that produced it.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte offset into grammar source text (UTF-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextSize(u32);

impl TextSize {
    #[must_use]
    pub const fn from(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn into(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Half-open byte range `start..end` in grammar source text.
///
/// Ranges coming from a stale grammar parse may be nonsensical (`start > end`
/// or past the end of the text). [`TextRange::fits_within`] lets callers
/// detect and skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextRange {
    /// Build a range without validation.
    #[must_use]
    pub const fn new(start: TextSize, end: TextSize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: TextSize, len: TextSize) -> Self {
        Self::new(start, TextSize(start.0.saturating_add(len.0)))
    }

    #[must_use]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Whether the range is well formed and lies inside a text of `text_len` bytes.
    #[must_use]
    pub const fn fits_within(self, text_len: u32) -> bool {
        self.start.0 <= self.end.0 && self.end.0 <= text_len
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        Self::new(
            miette::SourceOffset::from(range.start().into() as usize),
            range.len() as usize,
        )
    }
}

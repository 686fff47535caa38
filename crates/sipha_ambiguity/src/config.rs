//! Tuning knobs for an analysis request.
//!
//! Configuration is an explicit value handed to the engine; nothing is read
//! from global state.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Budgets for the grammar interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct InterpreterConfig {
    /// State visits allowed before the run is cancelled
    pub max_steps: usize,
    /// Derivations kept per `(rule, position)`; extra ones are dropped
    pub max_derivations: usize,
    /// Complete parses compared when looking for ambiguities
    pub max_full_trees: usize,
    /// Fixpoint passes allowed before the run is cancelled
    pub max_passes: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: 2_000_000,
            max_derivations: 256,
            max_full_trees: 64,
            max_passes: 64,
        }
    }
}

/// Limits for grid alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct GridConfig {
    /// Alignment passes before giving up on reaching a fixpoint
    pub max_passes: usize,
    /// Initial row width; rows are padded to it
    pub initial_width: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_passes: 32,
            initial_width: None,
        }
    }
}

/// Configuration of an [`AmbiguityEngine`](crate::engine::AmbiguityEngine).
///
/// # Example
///
/// ```rust
/// use sipha_ambiguity::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_max_steps(50_000)
///     .with_grid_min_rows(3);
/// assert_eq!(config.interpreter.max_steps, 50_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct EngineConfig {
    pub interpreter: InterpreterConfig,
    pub grid: GridConfig,
    /// Treat predicates as true during lookahead instead of stopping at them
    pub see_through_predicates: bool,
    /// Check that the token at the decision is in the lookahead of every
    /// conflicting alternative before enumerating
    pub confirm_with_lookahead: bool,
    /// Lay the diff out on a grid once it has at least this many rows; below
    /// it only the recursive split is produced
    pub grid_min_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter: InterpreterConfig::default(),
            grid: GridConfig::default(),
            see_through_predicates: true,
            confirm_with_lookahead: true,
            grid_min_rows: 2,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.interpreter.max_steps = max_steps;
        self
    }

    #[must_use]
    pub const fn with_max_derivations(mut self, max_derivations: usize) -> Self {
        self.interpreter.max_derivations = max_derivations;
        self
    }

    #[must_use]
    pub const fn with_grid_min_rows(mut self, rows: usize) -> Self {
        self.grid_min_rows = rows;
        self
    }

    #[must_use]
    pub const fn with_see_through_predicates(mut self, see_through: bool) -> Self {
        self.see_through_predicates = see_through;
        self
    }

    #[must_use]
    pub const fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm_with_lookahead = confirm;
        self
    }
}

//! # Error Types
//!
//! Errors raised while building grammar models, interpreting token streams,
//! aligning grids and analysing ambiguous decisions.
//!
//! Non-termination is not an error: the lookahead guard set and the
//! interpreter memo make unbounded recursion impossible. An ambiguity that
//! cannot be reproduced is not an error either; it is reported as
//! [`AnalysisOutcome::NotReproduced`](crate::engine::AnalysisOutcome).
//!
//! When the `diagnostics` feature is enabled, errors integrate with
//! [`miette`].

use crate::atn::{DecisionId, RuleIndex, StateId, TokenType};
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors raised while building a [`GrammarModel`](crate::atn::GrammarModel)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum AtnError {
    #[error("grammar defines no rules")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::empty_grammar)))]
    EmptyGrammar,

    #[error("rule `{name}` is declared but never defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::undefined_rule)))]
    UndefinedRule { name: String },

    #[error("rule `{name}` is defined more than once")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::duplicate_rule)))]
    DuplicateRule { name: String },

    #[error("rule index {index} is not declared")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_rule)))]
    UnknownRule { index: RuleIndex },

    #[error("token type {token} is not in the vocabulary")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_token)))]
    UnknownToken { token: TokenType },

    #[error("a block in rule `{rule}` has no alternatives")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::empty_block)))]
    EmptyBlock { rule: String },
}

/// Errors raised by the [`GrammarInterpreter`](crate::interpreter::GrammarInterpreter)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum InterpreterError {
    /// The step budget ran out; partial results are discarded.
    #[error("interpretation cancelled after {steps} steps")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(interpreter::cancelled),
            help("raise `InterpreterConfig::max_steps` or analyse a shorter span")
        )
    )]
    Cancelled { steps: usize },

    #[error("start rule {rule} does not exist")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(interpreter::unknown_rule)))]
    UnknownStartRule { rule: RuleIndex },
}

/// Internal-logic errors raised by grid operations.
///
/// These indicate a defect in a shift computation, never a user error; they
/// are raised instead of silently overwriting or dropping a cell.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GridError {
    #[error("shift in row {row} moves column {from} onto occupied column {to}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grid::shift_collision)))]
    ShiftCollision { row: usize, from: usize, to: usize },

    #[error("shift matrix has {actual} rows but the grid has {expected}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grid::shape_mismatch)))]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("value {value} occurs more than once in row {row}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grid::duplicate_in_row)))]
    DuplicateInRow { row: usize, value: i32 },

    #[error("row {row} has {len} cells but the fixed width is {width}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grid::row_too_wide)))]
    RowTooWide { row: usize, len: usize, width: usize },

    #[error("value {value} in row {row} is negative and not the empty marker")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grid::invalid_value)))]
    InvalidValue { row: usize, value: i32 },
}

/// Errors returned by [`AmbiguityEngine`](crate::engine::AmbiguityEngine) for
/// malformed requests or internal defects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum AnalysisError {
    #[error("state {state} does not exist in the transition network")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::unknown_state)))]
    UnknownState { state: StateId },

    #[error("rule index {rule} does not exist")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::unknown_rule)))]
    UnknownRule { rule: RuleIndex },

    #[error("decision {decision} does not exist")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::unknown_decision)))]
    UnknownDecision { decision: DecisionId },

    #[error("decision {decision} starts at state {expected}, not state {state}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::decision_mismatch)))]
    DecisionMismatch {
        decision: DecisionId,
        state: StateId,
        expected: StateId,
    },

    #[error("state {state} belongs to rule {actual}, not rule {rule}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::rule_mismatch)))]
    RuleMismatch {
        state: StateId,
        rule: RuleIndex,
        actual: RuleIndex,
    },

    #[error("token span {start}..={stop} is outside the stream of {len} tokens")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(analysis::span_out_of_range)))]
    SpanOutOfRange { start: usize, stop: usize, len: usize },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Grid(#[from] GridError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = GridError::ShiftCollision {
            row: 1,
            from: 2,
            to: 4,
        };
        assert_eq!(
            err.to_string(),
            "shift in row 1 moves column 2 onto occupied column 4"
        );

        let wrapped: AnalysisError = InterpreterError::Cancelled { steps: 10 }.into();
        assert_eq!(wrapped.to_string(), "interpretation cancelled after 10 steps");
    }
}

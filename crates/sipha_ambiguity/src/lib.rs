//! # Sipha Ambiguity
//!
//! Ambiguity analysis for grammar transition networks.
//!
//! ## Overview
//!
//! Given a decision a recognizer flagged as ambiguous (a rule, a decision
//! number, a token span and the set of conflicting alternatives), this crate:
//!
//! - **Recomputes lookahead**: the tokens reachable from any state of the
//!   transition network under a call-stack context, terminating on
//!   left-recursive grammars
//! - **Enumerates parse trees**: every distinct tree the conflicting
//!   alternatives lead to over the span, with a cheaper lookahead-only
//!   reconstruction when the full interpreter runs out of budget
//! - **Diffs the trees**: canonical paths, a shared head and tail, and groups
//!   of paths that end in the same element
//! - **Lays the diff out**: a recursive split, or a grid where equal nodes
//!   share a column, plus a map back to grammar source ranges
//!
//! ## Quick Start
//!
//! ```rust
//! use sipha_ambiguity::{AmbiguityEngine, AnalysisOutcome, DecisionTarget, NoProgress};
//! use sipha_ambiguity::atn::{Alternative, Element, GrammarBuilder};
//!
//! // expr : expr OP expr | ATOM ;
//! let mut builder = GrammarBuilder::new();
//! let atom = builder.token("ATOM");
//! let op = builder.token("OP");
//! let expr = builder.declare_rule("expr");
//! builder.define(
//!     expr,
//!     vec![
//!         Alternative::new(vec![Element::rule(expr), Element::token(op), Element::rule(expr)]),
//!         Alternative::new(vec![Element::token(atom)]),
//!     ],
//! );
//! let grammar = builder.build().unwrap();
//!
//! let tokens = sipha_ambiguity::TokenStream::from_types(&[atom, op, atom, op, atom], grammar.vocabulary());
//! let decision = grammar.atn().rule_decision(expr).unwrap();
//! let target = DecisionTarget {
//!     rule_index: expr,
//!     state: grammar.atn().decision_state(decision).unwrap(),
//!     decision,
//!     start_index: 0,
//!     stop_index: 4,
//!     conflicting_alternatives: [1, 2].into_iter().collect(),
//! };
//!
//! let outcome = AmbiguityEngine::new(&grammar).analyze(&tokens, &target, &mut NoProgress).unwrap();
//! if let AnalysisOutcome::Diff(diff) = outcome {
//!     for group in diff.diff.groups() {
//!         println!("{} is reached {} ways", group.terminal, group.len());
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - `serialize`: serde support for configuration, paths and diffs
//! - `diagnostics`: `miette::Diagnostic` for every error type
//! - `parallel`: canonicalize parse trees on the rayon thread pool

pub mod atn;
pub mod config;
pub mod diff;
pub mod engine;
pub mod enumerate;
pub mod error;
pub mod grid;
pub mod interpreter;
pub mod lookahead;
pub mod path;
pub mod progress;
pub mod testing;
pub mod text;
pub mod token;
pub mod tree;

// Re-export commonly used types
pub use atn::{AltSet, Atn, CallContext, GrammarBuilder, GrammarModel, IntervalSet, Vocabulary};
pub use config::{EngineConfig, GridConfig, InterpreterConfig};
pub use diff::{PathDiff, PathGroup, diff_paths};
pub use engine::{AmbiguityDiff, AmbiguityEngine, AnalysisOutcome};
pub use enumerate::{DecisionTarget, Enumeration, NotReproduced, SourceMap, Strategy, TreeEnumerator};
pub use error::{AnalysisError, AtnError, GridError, InterpreterError};
pub use grid::{Grid, GridAligner, GridLayout};
pub use interpreter::{AmbiguityListener, AmbiguityReport, GrammarInterpreter, PredictionMode};
pub use lookahead::{LookaheadComputer, LookaheadReport, LookaheadRequest};
pub use path::{ParsePath, PathCanonicalizer, PathElement, PathKind};
pub use progress::{NoProgress, ProgressSink};
pub use text::{TextRange, TextSize};
pub use token::{Token, TokenStream};
pub use tree::ParseTree;

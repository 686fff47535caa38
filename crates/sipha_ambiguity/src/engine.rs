//! # Analysis Engine
//!
//! Entry point tying the pipeline together: target validation, lookahead
//! confirmation, tree enumeration, canonical paths, diff reduction and
//! layout.
//!
//! ```rust
//! use sipha_ambiguity::atn::AltSet;
//! use sipha_ambiguity::engine::{AmbiguityEngine, AnalysisOutcome};
//! use sipha_ambiguity::enumerate::DecisionTarget;
//! use sipha_ambiguity::progress::NoProgress;
//! use sipha_ambiguity::testing::fixtures;
//!
//! let grammar = fixtures::expr_grammar();
//! let tokens = fixtures::expr_tokens(&grammar, 3);
//! let target = DecisionTarget {
//!     rule_index: 0,
//!     state: grammar.atn().rule_decision(0).and_then(|d| grammar.atn().decision_state(d)).unwrap(),
//!     decision: 0,
//!     start_index: 0,
//!     stop_index: 4,
//!     conflicting_alternatives: AltSet::from_iter([1, 2]),
//! };
//!
//! let outcome = AmbiguityEngine::new(&grammar)
//!     .analyze(&tokens, &target, &mut NoProgress)
//!     .unwrap();
//! let AnalysisOutcome::Diff(diff) = outcome else {
//!     panic!("ambiguity not reproduced");
//! };
//! assert_eq!(diff.diff.len(), 1);
//! ```

use crate::atn::{AltSet, EOF, EPSILON, GrammarModel, HIT_PRED, IntervalSet, RuleIndex};
use crate::config::EngineConfig;
use crate::diff::{PathDiff, diff_paths};
use crate::enumerate::{DecisionTarget, Enumeration, NotReproduced, SourceMap, Strategy, TreeEnumerator};
use crate::error::AnalysisError;
use crate::grid::GridLayout;
use crate::lookahead::{LookaheadComputer, LookaheadReport, LookaheadRequest};
use crate::path::{ParsePath, PathCanonicalizer, Segment, split};
use crate::progress::ProgressSink;
use crate::token::TokenStream;
use crate::tree::ParseTree;
use std::sync::Arc;

/// Everything produced for a reproduced ambiguity
#[derive(Debug, Clone)]
pub struct AmbiguityDiff {
    pub strategy: Strategy,
    /// One tree per conflicting alternative that some parse takes
    pub trees: Vec<Arc<ParseTree>>,
    /// Canonical path of each tree, in tree order
    pub paths: Vec<ParsePath>,
    pub diff: PathDiff,
    /// Recursive head/tail layout of the diff rows
    pub split: Vec<Segment>,
    /// Grid layout, present once the diff has enough rows
    pub grid: Option<GridLayout>,
    /// Grammar source ranges of the states the trees went through
    pub source_map: SourceMap,
}

/// Result of [`AmbiguityEngine::analyze`]
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Diff(AmbiguityDiff),
    NotReproduced { reason: NotReproduced },
}

impl AnalysisOutcome {
    #[must_use]
    pub const fn as_diff(&self) -> Option<&AmbiguityDiff> {
        match self {
            Self::Diff(diff) => Some(diff),
            Self::NotReproduced { .. } => None,
        }
    }
}

/// Ambiguity analysis over one grammar model.
#[derive(Debug, Clone)]
pub struct AmbiguityEngine<'a> {
    model: &'a GrammarModel,
    config: EngineConfig,
    start_rule: RuleIndex,
}

impl<'a> AmbiguityEngine<'a> {
    #[must_use]
    pub fn new(model: &'a GrammarModel) -> Self {
        Self {
            model,
            config: EngineConfig::default(),
            start_rule: 0,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Rule the interpreter starts from; rule 0 by default
    #[must_use]
    pub const fn with_start_rule(mut self, rule: RuleIndex) -> Self {
        self.start_rule = rule;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lookahead computation against this engine's grammar.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownState`] for a state outside the network.
    pub fn lookahead(&self, request: &LookaheadRequest) -> Result<LookaheadReport, AnalysisError> {
        LookaheadComputer::new(self.model.atn()).lookahead(request)
    }

    /// Reproduce the ambiguity described by `target` over `tokens` and lay
    /// out how its parses differ.
    ///
    /// A target that cannot be reproduced is a normal outcome,
    /// [`AnalysisOutcome::NotReproduced`].
    ///
    /// # Errors
    ///
    /// [`AnalysisError`] when the target does not describe a decision of the
    /// grammar or its span lies outside `tokens`, when the start rule does
    /// not exist, or when the grid layout hits an internal defect.
    pub fn analyze(
        &self,
        tokens: &TokenStream,
        target: &DecisionTarget,
        progress: &mut dyn ProgressSink,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.validate(tokens, target)?;
        tracing::debug!(
            rule = target.rule_index,
            decision = target.decision,
            start = target.start_index,
            stop = target.stop_index,
            alts = %format_alts(&target.conflicting_alternatives),
            "analyzing ambiguity"
        );

        if self.config.confirm_with_lookahead
            && let Some(alt) = self.unreachable_alternative(tokens, target)?
        {
            tracing::debug!(alt, "conflicting alternative cannot start at the decision");
            return Ok(AnalysisOutcome::NotReproduced {
                reason: NotReproduced::LookaheadMismatch { alt },
            });
        }

        let enumeration = TreeEnumerator::new(self.model, tokens, &self.config, self.start_rule)
            .enumerate(target, progress)?;
        let (strategy, trees, source_map) = match enumeration {
            Enumeration::Found {
                strategy,
                trees,
                source_map,
            } => (strategy, trees, source_map),
            Enumeration::NotReproduced(reason) => {
                tracing::debug!(%reason, "ambiguity not reproduced");
                return Ok(AnalysisOutcome::NotReproduced { reason });
            }
        };

        progress.report("canonicalizing parse paths", 1, 2);
        let paths = PathCanonicalizer::new(self.model)
            .with_source_map(&source_map)
            .canonicalize_all(&trees, target.start_index, target.stop_index);
        let diff = diff_paths(&paths);
        let rows: Vec<ParsePath> = diff.rows().map(|(_, path)| path.clone()).collect();
        let split = split(&rows);

        let grid = if !diff.is_empty() && diff.row_count() >= self.config.grid_min_rows {
            progress.report("laying out grid", 2, 2);
            Some(GridLayout::from_diff(&diff, &self.config.grid)?)
        } else {
            None
        };
        tracing::debug!(
            ?strategy,
            trees = trees.len(),
            groups = diff.len(),
            grid = grid.is_some(),
            "analysis finished"
        );

        Ok(AnalysisOutcome::Diff(AmbiguityDiff {
            strategy,
            trees,
            paths,
            diff,
            split,
            grid,
            source_map,
        }))
    }

    fn validate(&self, tokens: &TokenStream, target: &DecisionTarget) -> Result<(), AnalysisError> {
        let atn = self.model.atn();
        let state = atn
            .state(target.state)
            .ok_or(AnalysisError::UnknownState { state: target.state })?;
        if target.rule_index >= atn.rule_count() {
            return Err(AnalysisError::UnknownRule {
                rule: target.rule_index,
            });
        }
        let expected = atn
            .decision_state(target.decision)
            .ok_or(AnalysisError::UnknownDecision {
                decision: target.decision,
            })?;
        if expected != target.state {
            return Err(AnalysisError::DecisionMismatch {
                decision: target.decision,
                state: target.state,
                expected,
            });
        }
        if state.rule != target.rule_index {
            return Err(AnalysisError::RuleMismatch {
                state: target.state,
                rule: target.rule_index,
                actual: state.rule,
            });
        }
        if target.start_index > target.stop_index || target.stop_index >= tokens.len() {
            return Err(AnalysisError::SpanOutOfRange {
                start: target.start_index,
                stop: target.stop_index,
                len: tokens.len(),
            });
        }
        Ok(())
    }

    /// First conflicting alternative whose lookahead rules out the token at
    /// the decision
    fn unreachable_alternative(
        &self,
        tokens: &TokenStream,
        target: &DecisionTarget,
    ) -> Result<Option<usize>, AnalysisError> {
        let token = tokens.token_type(target.start_index).unwrap_or(EOF);
        let accepts = IntervalSet::of(token);
        for alt in target.conflicting_alternatives.iter() {
            let request = LookaheadRequest::new(target.state)
                .with_alternatives(AltSet::from_iter([alt]))
                .with_see_through_predicates(self.config.see_through_predicates)
                .with_add_eof(false);
            let report = self.lookahead(&request)?;
            let set = report.tokens();
            let open = set.contains(EPSILON) || set.contains(HIT_PRED);
            if !open && set.intersect(&accepts).is_empty() {
                tracing::trace!(
                    alt,
                    lookahead = %set.to_string_with(self.model.vocabulary()),
                    "alternative lookahead excludes the decision token"
                );
                return Ok(Some(alt));
            }
        }
        Ok(None)
    }
}

fn format_alts(alts: &AltSet) -> String {
    let alts: Vec<String> = alts.iter().map(|a| a.to_string()).collect();
    format!("{{{}}}", alts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{Alternative, Element, GrammarBuilder};
    use crate::error::InterpreterError;
    use crate::progress::NoProgress;
    use crate::testing::fixtures;

    fn expr_target(grammar: &GrammarModel, alts: &[usize]) -> DecisionTarget {
        DecisionTarget {
            rule_index: 0,
            state: grammar.atn().decision_state(0).unwrap(),
            decision: 0,
            start_index: 0,
            stop_index: 4,
            conflicting_alternatives: alts.iter().copied().collect(),
        }
    }

    #[test]
    fn test_expression_ambiguity_has_one_group() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let outcome = AmbiguityEngine::new(&grammar)
            .analyze(&tokens, &expr_target(&grammar, &[1, 2]), &mut NoProgress)
            .unwrap();
        let diff = outcome.as_diff().unwrap();
        assert_eq!(diff.strategy, Strategy::Exact);
        assert_eq!(diff.diff.len(), 1);
        assert_eq!(diff.diff.groups()[0].len(), 2);
        assert!(diff.grid.is_some());
        assert!(matches!(diff.split.first(), Some(Segment::Common(_))));
    }

    #[test]
    fn test_single_alternative_yields_no_groups() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let outcome = AmbiguityEngine::new(&grammar)
            .analyze(&tokens, &expr_target(&grammar, &[1]), &mut NoProgress)
            .unwrap();
        let diff = outcome.as_diff().unwrap();
        assert_eq!(diff.trees.len(), 1);
        assert!(diff.diff.is_empty());
        assert!(diff.grid.is_none());
        assert!(diff.split.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let engine = AmbiguityEngine::new(&grammar);
        let good = expr_target(&grammar, &[1, 2]);

        let target = DecisionTarget { state: 999, ..good.clone() };
        assert_eq!(
            engine.analyze(&tokens, &target, &mut NoProgress).unwrap_err(),
            AnalysisError::UnknownState { state: 999 }
        );

        let target = DecisionTarget { rule_index: 3, ..good.clone() };
        assert_eq!(
            engine.analyze(&tokens, &target, &mut NoProgress).unwrap_err(),
            AnalysisError::UnknownRule { rule: 3 }
        );

        let target = DecisionTarget { decision: 5, ..good.clone() };
        assert_eq!(
            engine.analyze(&tokens, &target, &mut NoProgress).unwrap_err(),
            AnalysisError::UnknownDecision { decision: 5 }
        );

        let rule_start = grammar.atn().rule_start(0).unwrap();
        let target = DecisionTarget { state: rule_start, ..good.clone() };
        assert!(matches!(
            engine.analyze(&tokens, &target, &mut NoProgress),
            Err(AnalysisError::DecisionMismatch { decision: 0, .. })
        ));

        let target = DecisionTarget { stop_index: 5, ..good };
        assert_eq!(
            engine.analyze(&tokens, &target, &mut NoProgress).unwrap_err(),
            AnalysisError::SpanOutOfRange { start: 0, stop: 5, len: 5 }
        );
    }

    #[test]
    fn test_predicated_alternatives_share_one_path() {
        let grammar = fixtures::predicate_grammar();
        let tokens = fixtures::predicate_tokens(&grammar);
        let decision = grammar.atn().rule_decision(0).unwrap();
        let target = DecisionTarget {
            rule_index: 0,
            state: grammar.atn().decision_state(decision).unwrap(),
            decision,
            start_index: 0,
            stop_index: 1,
            conflicting_alternatives: AltSet::from_iter([1, 2]),
        };
        let outcome = AmbiguityEngine::new(&grammar)
            .analyze(&tokens, &target, &mut NoProgress)
            .unwrap();
        let diff = outcome.as_diff().unwrap();
        assert_eq!(diff.trees.len(), 2);
        assert_eq!(diff.paths[0], diff.paths[1]);
        assert_eq!(diff.paths[0].to_string(), "decl ID ID");
        assert!(diff.diff.is_empty());
        assert!(diff.grid.is_none());
    }

    #[test]
    fn test_start_rule_selects_the_interpreted_rule() {
        let mut builder = GrammarBuilder::new();
        let atom = builder.token("ATOM");
        let op = builder.token("OP");
        let stmt = builder.declare_rule("stmt");
        let expr = builder.declare_rule("expr");
        builder.define(stmt, vec![Alternative::new([Element::token(op)])]);
        builder.define(
            expr,
            vec![
                Alternative::new([Element::rule(expr), Element::token(op), Element::rule(expr)]),
                Alternative::new([Element::token(atom)]),
            ],
        );
        let grammar = builder.build().unwrap();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let decision = grammar.atn().rule_decision(expr).unwrap();
        let target = DecisionTarget {
            rule_index: expr,
            state: grammar.atn().decision_state(decision).unwrap(),
            decision,
            start_index: 0,
            stop_index: 4,
            conflicting_alternatives: AltSet::from_iter([1, 2]),
        };

        let from_stmt = AmbiguityEngine::new(&grammar)
            .analyze(&tokens, &target, &mut NoProgress)
            .unwrap();
        assert!(matches!(
            from_stmt,
            AnalysisOutcome::NotReproduced {
                reason: NotReproduced::NoMatchingReport { reports: 0 }
            }
        ));

        let from_expr = AmbiguityEngine::new(&grammar)
            .with_start_rule(expr)
            .analyze(&tokens, &target, &mut NoProgress)
            .unwrap();
        assert_eq!(from_expr.as_diff().map(|d| d.diff.len()), Some(1));

        let missing = AmbiguityEngine::new(&grammar)
            .with_start_rule(7)
            .analyze(&tokens, &target, &mut NoProgress);
        assert_eq!(
            missing.unwrap_err(),
            AnalysisError::Interpreter(InterpreterError::UnknownStartRule { rule: 7 })
        );
    }

    #[test]
    fn test_lookahead_mismatch_is_not_reproduced() {
        let grammar = fixtures::dangling_else_grammar();
        let tokens = fixtures::dangling_else_tokens(&grammar);
        let state = grammar.atn().decision_state(1).unwrap();
        // the optional ELSE block cannot start with the THEN token at index 2
        let target = DecisionTarget {
            rule_index: 0,
            state,
            decision: 1,
            start_index: 2,
            stop_index: 3,
            conflicting_alternatives: AltSet::from_iter([1, 2]),
        };
        let outcome = AmbiguityEngine::new(&grammar)
            .analyze(&tokens, &target, &mut NoProgress)
            .unwrap();
        assert!(matches!(
            outcome,
            AnalysisOutcome::NotReproduced {
                reason: NotReproduced::LookaheadMismatch { alt: 1 }
            }
        ));
    }
}

//! # Grammar Interpreter
//!
//! Interprets a [`GrammarModel`] over a [`TokenStream`] and produces every
//! complete parse of a start rule.
//!
//! ## Algorithm
//!
//! Derivations are memoized per `(rule, position)`. Each pass re-derives the
//! start rule; a call to a rule that is already being derived in the current
//! pass sees only the derivations found so far. Passes repeat until no entry
//! grows, which handles direct and indirect left recursion. Every rule node
//! records the decisions it took, so two parses can be compared decision by
//! decision.
//!
//! Predicates are assumed to hold.
//!
//! ## Budgets
//!
//! [`InterpreterConfig`] bounds the number of explored states, the number of
//! fixpoint passes and the number of derivations kept per memo entry. Running
//! out of steps or passes cancels the run with
//! [`InterpreterError::Cancelled`].

mod detection;
mod memo;

pub use detection::{AmbiguityListener, AmbiguityReport};

use crate::atn::{AltSet, Atn, DecisionId, GrammarModel, RuleIndex, StateId, Transition};
use crate::config::InterpreterConfig;
use crate::error::InterpreterError;
use crate::token::TokenStream;
use crate::tree::{DecisionChoice, ParseTree, RuleNode, TerminalNode};
use hashbrown::HashSet;
use memo::{MemoKey, MemoTable};
use smallvec::SmallVec;
use std::sync::Arc;

/// How the interpreter treats multiple complete parses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMode {
    /// Produce parses only
    #[default]
    Ll,
    /// Compare every pair of complete parses and report where they diverge
    LlExactAmbigDetection,
}

/// Counters collected during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    pub passes: usize,
    pub steps: usize,
    pub memo_entries: usize,
    /// Derivations discarded because a memo entry was full
    pub dropped_derivations: usize,
}

/// Complete parses of a start rule over a whole token stream
#[derive(Debug, Clone)]
pub struct ParseForest {
    start_rule: RuleIndex,
    trees: Vec<Arc<ParseTree>>,
    stats: InterpreterStats,
}

impl ParseForest {
    #[must_use]
    pub const fn start_rule(&self) -> RuleIndex {
        self.start_rule
    }

    /// Distinct complete parses, in discovery order
    #[must_use]
    pub fn trees(&self) -> &[Arc<ParseTree>] {
        &self.trees
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    #[must_use]
    pub const fn stats(&self) -> InterpreterStats {
        self.stats
    }
}

/// Interpreter over a borrowed grammar model and token stream.
///
/// # Example
///
/// ```rust
/// use sipha_ambiguity::config::InterpreterConfig;
/// use sipha_ambiguity::interpreter::GrammarInterpreter;
/// use sipha_ambiguity::testing::fixtures;
///
/// let grammar = fixtures::expr_grammar();
/// let tokens = fixtures::expr_tokens(&grammar, 3);
/// let forest = GrammarInterpreter::new(&grammar, &tokens, InterpreterConfig::default())
///     .parse(0)?;
/// assert_eq!(forest.len(), 2);
/// # Ok::<(), sipha_ambiguity::error::InterpreterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GrammarInterpreter<'a> {
    model: &'a GrammarModel,
    tokens: &'a TokenStream,
    config: InterpreterConfig,
    mode: PredictionMode,
}

impl<'a> GrammarInterpreter<'a> {
    #[must_use]
    pub const fn new(
        model: &'a GrammarModel,
        tokens: &'a TokenStream,
        config: InterpreterConfig,
    ) -> Self {
        Self {
            model,
            tokens,
            config,
            mode: PredictionMode::Ll,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: PredictionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> PredictionMode {
        self.mode
    }

    /// Every complete parse of `start_rule` over the whole stream.
    ///
    /// # Errors
    ///
    /// [`InterpreterError::UnknownStartRule`] for a rule outside the grammar;
    /// [`InterpreterError::Cancelled`] when the step or pass budget runs out.
    pub fn parse(&self, start_rule: RuleIndex) -> Result<ParseForest, InterpreterError> {
        let atn = self.model.atn();
        if start_rule >= atn.rule_count() {
            return Err(InterpreterError::UnknownStartRule { rule: start_rule });
        }

        let mut run = Run {
            atn,
            tokens: self.tokens,
            max_steps: self.config.max_steps,
            memo: MemoTable::new(self.config.max_derivations.max(1)),
            computed: HashSet::default(),
            steps: 0,
            changed: false,
        };

        let mut passes = 0;
        loop {
            if passes == self.config.max_passes {
                tracing::warn!(passes, steps = run.steps, "interpreter did not reach a fixpoint");
                return Err(InterpreterError::Cancelled { steps: run.steps });
            }
            passes += 1;
            run.changed = false;
            run.computed.clear();
            if let Err(err) = run.derive(start_rule, 0) {
                tracing::debug!(passes, steps = run.steps, "interpreter cancelled");
                return Err(err);
            }
            tracing::trace!(pass = passes, memo = run.memo.len(), steps = run.steps, "interpreter pass");
            if !run.changed {
                break;
            }
        }

        let len = self.tokens.len();
        let trees: Vec<_> = run
            .memo
            .get(MemoKey::new(start_rule, 0))
            .into_iter()
            .filter(|tree| tree.end() == len)
            .take(self.config.max_full_trees)
            .collect();
        let stats = InterpreterStats {
            passes,
            steps: run.steps,
            memo_entries: run.memo.len(),
            dropped_derivations: run.memo.dropped(),
        };
        tracing::debug!(trees = trees.len(), ?stats, "interpretation finished");

        Ok(ParseForest {
            start_rule,
            trees,
            stats,
        })
    }

    /// Parse, and in [`PredictionMode::LlExactAmbigDetection`] report every
    /// ambiguity between complete parses to `listener`.
    ///
    /// Reporting stops as soon as the listener returns
    /// [`ControlFlow::Break`](std::ops::ControlFlow::Break).
    ///
    /// # Errors
    ///
    /// See [`GrammarInterpreter::parse`].
    pub fn run<L>(&self, start_rule: RuleIndex, listener: &mut L) -> Result<ParseForest, InterpreterError>
    where
        L: AmbiguityListener + ?Sized,
    {
        let forest = self.parse(start_rule)?;
        if self.mode == PredictionMode::LlExactAmbigDetection
            && detection::detect(self.model.atn(), forest.trees(), listener).is_break()
        {
            tracing::trace!("ambiguity listener stopped the run");
        }
        Ok(forest)
    }

    /// One subtree per alternative in `alternatives`: the smallest rule node
    /// enclosing the reported span, taken from the first pair of parses that
    /// raises `report` with that alternative on one side.
    ///
    /// Structurally equal subtrees are returned once.
    #[must_use]
    pub fn get_all_possible_parse_trees(
        &self,
        forest: &ParseForest,
        report: &AmbiguityReport,
        alternatives: &AltSet,
    ) -> Vec<Arc<ParseTree>> {
        detection::trees_for(self.model.atn(), forest.trees(), report, alternatives)
    }
}

/// Partial parse inside one rule invocation
#[derive(Debug, Clone)]
struct Branch {
    state: StateId,
    position: usize,
    children: Vec<Arc<ParseTree>>,
    trail: SmallVec<[DecisionChoice; 2]>,
    /// States visited since the last consumed token
    idle: SmallVec<[StateId; 8]>,
}

struct Run<'a> {
    atn: &'a Atn,
    tokens: &'a TokenStream,
    max_steps: usize,
    memo: MemoTable,
    computed: HashSet<MemoKey, ahash::RandomState>,
    steps: usize,
    changed: bool,
}

impl Run<'_> {
    fn tick(&mut self) -> Result<(), InterpreterError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(InterpreterError::Cancelled { steps: self.steps });
        }
        Ok(())
    }

    fn derive(&mut self, rule: RuleIndex, position: usize) -> Result<Vec<Arc<ParseTree>>, InterpreterError> {
        let key = MemoKey::new(rule, position);
        if !self.computed.insert(key) {
            return Ok(self.memo.get(key));
        }
        let found = self.expand(rule, position)?;
        if self.memo.extend(key, found) > 0 {
            self.changed = true;
        }
        Ok(self.memo.get(key))
    }

    fn expand(&mut self, rule: RuleIndex, position: usize) -> Result<Vec<Arc<ParseTree>>, InterpreterError> {
        let atn = self.atn;
        let stop = atn.rule_stop[rule];
        let rule_decision = atn.rule_decision(rule);
        let mut results = Vec::new();
        let mut pending = vec![Branch {
            state: atn.rule_start[rule],
            position,
            children: Vec::new(),
            trail: SmallVec::new(),
            idle: SmallVec::new(),
        }];

        while let Some(mut branch) = pending.pop() {
            self.tick()?;
            if branch.state == stop {
                results.push(finish(rule, position, rule_decision, branch));
                continue;
            }
            if branch.idle.contains(&branch.state) {
                continue;
            }
            branch.idle.push(branch.state);

            let state = &atn.states[branch.state];
            for (index, transition) in state.transitions.iter().enumerate().rev() {
                let mut next = branch.clone();
                if let Some(decision) = state.decision {
                    next.trail.push(DecisionChoice {
                        decision,
                        position: next.position,
                        alt: index + 1,
                        child: next.children.len(),
                    });
                }
                match transition {
                    Transition::Epsilon { target } | Transition::Predicate { target, .. } => {
                        next.state = *target;
                        pending.push(next);
                    }
                    Transition::Rule {
                        rule: callee,
                        follow,
                        ..
                    } => {
                        for child in self.derive(*callee, next.position)?.into_iter().rev() {
                            let mut call = next.clone();
                            if child.end() > call.position {
                                call.idle.clear();
                            }
                            call.position = child.end();
                            call.children.push(child.invoked_from(branch.state));
                            call.state = *follow;
                            pending.push(call);
                        }
                    }
                    Transition::Wildcard { target }
                    | Transition::Set { target, .. }
                    | Transition::NotSet { target, .. } => {
                        if let Some(token_type) = self.tokens.token_type(next.position)
                            && transition.matches(token_type, atn.max_token_type())
                        {
                            next.children.push(Arc::new(ParseTree::Token(TerminalNode {
                                token_index: next.position,
                                token_type,
                                state: Some(branch.state),
                            })));
                            next.position += 1;
                            next.idle.clear();
                            next.state = *target;
                            pending.push(next);
                        }
                    }
                }
            }
        }
        Ok(results)
    }
}

fn finish(
    rule: RuleIndex,
    start: usize,
    rule_decision: Option<DecisionId>,
    branch: Branch,
) -> Arc<ParseTree> {
    let alt = rule_decision
        .and_then(|decision| branch.trail.first().filter(|c| c.decision == decision))
        .map_or(1, |choice| choice.alt);
    Arc::new(ParseTree::Rule(RuleNode {
        rule,
        alt,
        invoking_state: None,
        start,
        end: branch.position,
        trail: branch.trail,
        children: branch.children,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::ops::ControlFlow;

    fn interpreter<'a>(grammar: &'a GrammarModel, tokens: &'a TokenStream) -> GrammarInterpreter<'a> {
        GrammarInterpreter::new(grammar, tokens, InterpreterConfig::default())
    }

    #[test]
    fn test_left_recursive_expression_has_two_parses() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let forest = interpreter(&grammar, &tokens).parse(0).unwrap();
        assert_eq!(forest.len(), 2);
        assert!(forest.trees().iter().all(|t| t.start() == 0 && t.end() == 5));
        assert!(forest.stats().passes > 1);
    }

    #[test]
    fn test_unambiguous_input_has_one_parse() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 2);
        let forest = interpreter(&grammar, &tokens).parse(0).unwrap();
        assert_eq!(forest.len(), 1);
        let root = forest.trees()[0].as_rule().unwrap();
        assert_eq!(root.alt, 1);
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn test_indirect_left_recursion_terminates() {
        let grammar = fixtures::indirect_left_recursive_grammar();
        let tokens = fixtures::indirect_tokens(&grammar);
        let forest = interpreter(&grammar, &tokens).parse(0).unwrap();
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_nullable_loop_terminates() {
        let grammar = fixtures::nullable_loop_grammar();
        let tokens = fixtures::nullable_loop_tokens(&grammar);
        let forest = interpreter(&grammar, &tokens).parse(0).unwrap();
        assert!(!forest.is_empty());
    }

    #[test]
    fn test_step_budget_cancels() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 6);
        let config = InterpreterConfig {
            max_steps: 10,
            ..InterpreterConfig::default()
        };
        let err = GrammarInterpreter::new(&grammar, &tokens, config)
            .parse(0)
            .unwrap_err();
        assert!(matches!(err, InterpreterError::Cancelled { steps: 11 }));
    }

    #[test]
    fn test_unknown_start_rule() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 1);
        let err = interpreter(&grammar, &tokens).parse(7).unwrap_err();
        assert_eq!(err, InterpreterError::UnknownStartRule { rule: 7 });
    }

    #[test]
    fn test_dangling_else_is_reported_at_else() {
        let grammar = fixtures::dangling_else_grammar();
        let tokens = fixtures::dangling_else_tokens(&grammar);
        let mut reports = Vec::new();
        let forest = interpreter(&grammar, &tokens)
            .with_mode(PredictionMode::LlExactAmbigDetection)
            .run(0, &mut |report: &AmbiguityReport| {
                reports.push(report.clone());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.start, 7);
        assert_eq!(report.stop, 8);
        assert_eq!(report.ambig_alts.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(grammar.atn().state(report.state).unwrap().decision, Some(report.decision));
    }

    #[test]
    fn test_ll_mode_reports_nothing() {
        let grammar = fixtures::expr_grammar();
        let tokens = fixtures::expr_tokens(&grammar, 3);
        let mut calls = 0;
        interpreter(&grammar, &tokens)
            .run(0, &mut |_: &AmbiguityReport| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(calls, 0);
    }
}

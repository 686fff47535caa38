//! # Lookahead
//!
//! Computes the set of tokens that can follow a state of the transition
//! network, optionally under a call-stack context.
//!
//! ## Termination
//!
//! Two structures make the traversal finite on any grammar:
//!
//! - a visited set keyed by `(state, context)`, for epsilon cycles
//! - a rule guard holding every rule entered through a rule-call edge and not
//!   yet left; a call into a guarded rule is skipped, which stops left
//!   recursion
//!
//! The traversal runs on an explicit worklist, so its depth is bounded by heap
//! memory rather than by the thread's stack.

use crate::atn::{
    AltSet, Atn, CallContext, DecisionId, EOF, EPSILON, HIT_PRED, IntervalSet,
    MIN_USER_TOKEN_TYPE, RuleIndex, StateId, StateKind, TokenType, Transition,
};
use crate::error::AnalysisError;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::sync::Arc;

/// Rules entered on the way to a token, outermost first
pub type CallPath = SmallVec<[RuleIndex; 4]>;

type Context = Option<Arc<CallContext>>;

/// Parameters of one lookahead computation
#[derive(Debug, Clone)]
pub struct LookaheadRequest {
    pub state: StateId,
    /// Reaching this state ends the walk as if it were a rule stop state
    pub stop_state: Option<StateId>,
    /// `None` means "no context": reaching a rule end yields [`EPSILON`]
    pub context: Option<Arc<CallContext>>,
    /// Only tokens in this set are reported
    pub conflict_filter: Option<IntervalSet>,
    /// When `state` is a decision, only these alternatives are followed
    pub alternatives: Option<AltSet>,
    pub see_through_predicates: bool,
    /// Report [`EOF`] when the end of an empty context is reached
    pub add_eof: bool,
}

impl LookaheadRequest {
    #[must_use]
    pub const fn new(state: StateId) -> Self {
        Self {
            state,
            stop_state: None,
            context: None,
            conflict_filter: None,
            alternatives: None,
            see_through_predicates: true,
            add_eof: true,
        }
    }

    #[must_use]
    pub const fn with_stop_state(mut self, stop_state: StateId) -> Self {
        self.stop_state = Some(stop_state);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Arc<CallContext>) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn with_conflict_filter(mut self, filter: IntervalSet) -> Self {
        self.conflict_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_alternatives(mut self, alternatives: AltSet) -> Self {
        self.alternatives = Some(alternatives);
        self
    }

    #[must_use]
    pub const fn with_see_through_predicates(mut self, see_through: bool) -> Self {
        self.see_through_predicates = see_through;
        self
    }

    #[must_use]
    pub const fn with_add_eof(mut self, add_eof: bool) -> Self {
        self.add_eof = add_eof;
        self
    }
}

/// Counters collected during a lookahead walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookaheadStats {
    pub visits: usize,
    pub rule_entries: usize,
    /// Deepest nesting of rule-call edges followed at once
    pub max_call_depth: usize,
}

/// Result of a lookahead computation
#[derive(Debug, Clone, Default)]
pub struct LookaheadReport {
    tokens: IntervalSet,
    via_rule: HashMap<RuleIndex, IntervalSet>,
    paths: HashMap<TokenType, Vec<CallPath>>,
    stats: LookaheadStats,
}

impl LookaheadReport {
    /// Every reachable token, including [`EPSILON`], [`EOF`] and [`HIT_PRED`]
    #[must_use]
    pub const fn tokens(&self) -> &IntervalSet {
        &self.tokens
    }

    #[must_use]
    pub fn into_tokens(self) -> IntervalSet {
        self.tokens
    }

    /// Tokens reached while `rule` was on the call path
    #[must_use]
    pub fn via_rule(&self, rule: RuleIndex) -> Option<&IntervalSet> {
        self.via_rule.get(&rule)
    }

    /// Distinct call paths that lead to `token`
    #[must_use]
    pub fn paths(&self, token: TokenType) -> &[CallPath] {
        self.paths.get(&token).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct call paths that lead to `token`
    #[must_use]
    pub fn path_count(&self, token: TokenType) -> usize {
        self.paths(token).len()
    }

    #[must_use]
    pub const fn stats(&self) -> LookaheadStats {
        self.stats
    }

    fn restrict(&mut self, filter: &IntervalSet) {
        self.tokens = self.tokens.intersect(filter);
        for set in self.via_rule.values_mut() {
            *set = set.intersect(filter);
        }
        self.via_rule.retain(|_, set| !set.is_empty());
        self.paths.retain(|token, _| filter.contains(*token));
    }
}

/// Set of rules currently entered through a rule-call edge
#[derive(Debug, Clone, Default)]
struct RuleGuard(AltSet);

impl RuleGuard {
    fn is_active(&self, rule: RuleIndex) -> bool {
        self.0.contains(rule)
    }

    fn enter(&mut self, rule: RuleIndex) {
        self.0.insert(rule);
    }

    /// Clears the mark and reports whether it was set
    fn leave(&mut self, rule: RuleIndex) -> bool {
        let was_active = self.0.contains(rule);
        self.0.remove(rule);
        was_active
    }
}

enum Step {
    Visit {
        state: StateId,
        ctx: Context,
    },
    Follow {
        state: StateId,
        index: usize,
        ctx: Context,
    },
    /// Pop the rule pushed by a rule-call edge
    Leave(RuleIndex),
    /// Put back a rule lifted while returning through its stop state
    Restore {
        rule: RuleIndex,
        position: Option<usize>,
    },
}

/// Computes lookahead sets over a transition network.
///
/// All scratch state lives in a single call; one computer can serve any
/// number of sequential requests.
#[derive(Debug, Clone, Copy)]
pub struct LookaheadComputer<'a> {
    atn: &'a Atn,
}

impl<'a> LookaheadComputer<'a> {
    #[must_use]
    pub const fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Tokens reachable from `state` under `context`, seeing through
    /// predicates and reporting EOF at the end of an empty context.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownState`] when `state` is not in the network.
    pub fn look(&self, state: StateId, context: Option<Arc<CallContext>>) -> Result<IntervalSet, AnalysisError> {
        let mut request = LookaheadRequest::new(state);
        request.context = context;
        Ok(self.lookahead(&request)?.into_tokens())
    }

    /// Run a lookahead computation.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownState`] when the start or stop state is not in
    /// the network.
    pub fn lookahead(&self, request: &LookaheadRequest) -> Result<LookaheadReport, AnalysisError> {
        for state in std::iter::once(request.state).chain(request.stop_state) {
            if self.atn.state(state).is_none() {
                return Err(AnalysisError::UnknownState { state });
            }
        }

        let mut walk = Walk {
            atn: self.atn,
            request,
            guard: RuleGuard::default(),
            busy: HashSet::default(),
            call_path: CallPath::new(),
            report: LookaheadReport::default(),
            stack: Vec::new(),
        };
        walk.seed();
        walk.run();

        let mut report = walk.report;
        if let Some(filter) = &request.conflict_filter {
            report.restrict(filter);
        }
        Ok(report)
    }

    /// Lookahead of every alternative of `decision`, without context and
    /// without seeing through predicates.
    ///
    /// An alternative whose walk stops at a predicate yields `None`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownDecision`] when the decision does not exist.
    pub fn decision_lookahead(&self, decision: DecisionId) -> Result<Vec<Option<IntervalSet>>, AnalysisError> {
        let state = self
            .atn
            .decision_state(decision)
            .ok_or(AnalysisError::UnknownDecision { decision })?;
        let alt_count = self.atn.state(state).map_or(0, |s| s.transitions.len());

        (1..=alt_count)
            .map(|alt| {
                let request = LookaheadRequest::new(state)
                    .with_alternatives(AltSet::from_iter([alt]))
                    .with_see_through_predicates(false)
                    .with_add_eof(false);
                let tokens = self.lookahead(&request)?.into_tokens();
                Ok((!tokens.contains(HIT_PRED)).then_some(tokens))
            })
            .collect()
    }
}

struct Walk<'a, 'r> {
    atn: &'a Atn,
    request: &'r LookaheadRequest,
    guard: RuleGuard,
    busy: HashSet<(StateId, Context), ahash::RandomState>,
    call_path: CallPath,
    report: LookaheadReport,
    stack: Vec<Step>,
}

impl Walk<'_, '_> {
    fn seed(&mut self) {
        let state = self.request.state;
        let ctx = self.request.context.clone();
        let Some(alternatives) = &self.request.alternatives else {
            self.stack.push(Step::Visit { state, ctx });
            return;
        };
        self.busy.insert((state, ctx.clone()));
        let count = self.atn.states[state].transitions.len();
        for index in (0..count).rev() {
            if alternatives.contains(index + 1) {
                self.stack.push(Step::Follow {
                    state,
                    index,
                    ctx: ctx.clone(),
                });
            }
        }
    }

    fn run(&mut self) {
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Visit { state, ctx } => self.visit(state, ctx),
                Step::Follow { state, index, ctx } => self.follow(state, index, ctx),
                Step::Leave(rule) => {
                    self.guard.leave(rule);
                    self.call_path.pop();
                }
                Step::Restore { rule, position } => {
                    self.guard.enter(rule);
                    if let Some(position) = position {
                        self.call_path.insert(position, rule);
                    }
                }
            }
        }
    }

    fn visit(&mut self, state_id: StateId, ctx: Context) {
        if !self.busy.insert((state_id, ctx.clone())) {
            return;
        }
        self.report.stats.visits += 1;
        let atn = self.atn;
        let state = &atn.states[state_id];
        let add_eof = self.request.add_eof;

        if Some(state_id) == self.request.stop_state {
            match &ctx {
                None => return self.add(&IntervalSet::of(EPSILON)),
                Some(c) if c.is_empty() && add_eof => return self.add(&IntervalSet::of(EOF)),
                Some(_) => {}
            }
        }

        if state.kind == StateKind::RuleStop {
            match &ctx {
                None => return self.add(&IntervalSet::of(EPSILON)),
                Some(c) if c.is_empty() && add_eof => return self.add(&IntervalSet::of(EOF)),
                Some(c) if !c.is_empty() => {
                    let rule = state.rule;
                    if self.guard.leave(rule) {
                        let position = self.call_path.iter().rposition(|&r| r == rule);
                        if let Some(position) = position {
                            self.call_path.remove(position);
                        }
                        self.stack.push(Step::Restore { rule, position });
                    }
                    for frame in c.frames().iter().rev() {
                        self.stack.push(Step::Visit {
                            state: frame.return_state,
                            ctx: frame.parent.clone(),
                        });
                    }
                    return;
                }
                // empty context without EOF: follow the global follow edges
                Some(_) => {}
            }
        }

        for index in (0..state.transitions.len()).rev() {
            self.stack.push(Step::Follow {
                state: state_id,
                index,
                ctx: ctx.clone(),
            });
        }
    }

    fn follow(&mut self, state_id: StateId, index: usize, ctx: Context) {
        let atn = self.atn;
        let transition = &atn.states[state_id].transitions[index];
        match transition {
            Transition::Rule {
                target,
                rule,
                follow,
            } => {
                if self.guard.is_active(*rule) {
                    return;
                }
                self.guard.enter(*rule);
                self.call_path.push(*rule);
                self.report.stats.rule_entries += 1;
                self.report.stats.max_call_depth =
                    self.report.stats.max_call_depth.max(self.call_path.len());
                let callee_ctx = CallContext::push(ctx.as_ref(), *follow);
                self.stack.push(Step::Leave(*rule));
                self.stack.push(Step::Visit {
                    state: *target,
                    ctx: Some(callee_ctx),
                });
            }
            Transition::Predicate { target, index } => {
                if self.request.see_through_predicates {
                    self.stack.push(Step::Visit {
                        state: *target,
                        ctx,
                    });
                } else {
                    tracing::trace!(predicate = ?atn.predicate_text(*index), "lookahead stopped at predicate");
                    self.add(&IntervalSet::of(HIT_PRED));
                }
            }
            Transition::Epsilon { target } => self.stack.push(Step::Visit {
                state: *target,
                ctx,
            }),
            Transition::Wildcard { .. } => self.add(&atn.token_range()),
            Transition::Set { set, .. } => self.add(set),
            Transition::NotSet { set, .. } => {
                let complement = set.complement(MIN_USER_TOKEN_TYPE, atn.max_token_type());
                self.add(&complement);
            }
        }
    }

    fn add(&mut self, set: &IntervalSet) {
        self.report.tokens.add_all(set);
        for &rule in &self.call_path {
            self.report.via_rule.entry(rule).or_default().add_all(set);
        }
        for token in set.iter() {
            let paths = self.report.paths.entry(token).or_default();
            if !paths.contains(&self.call_path) {
                paths.push(self.call_path.clone());
            }
        }
    }
}

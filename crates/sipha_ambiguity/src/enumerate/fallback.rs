//! Lookahead-only tree reconstruction.
//!
//! Starting at the decision state with one alternative forced, the rest of
//! the rule is parsed by greedy LL(1) descent: at every decision the first
//! alternative whose lookahead holds the current token wins. Mismatched tokens
//! become error leaves and are consumed, so every loop either consumes a token
//! or moves through a state not yet visited at the current position.

use crate::atn::{AltSet, Atn, EOF, EPSILON, RuleIndex, StateId, Transition};
use crate::lookahead::{LookaheadComputer, LookaheadRequest};
use crate::token::TokenStream;
use crate::tree::{DecisionChoice, ParseTree, RuleNode, TerminalNode};
use smallvec::SmallVec;
use std::sync::Arc;

/// Left-recursive calls allowed per `(rule, position)` before the call is cut
const MAX_REENTRY: usize = 2;

pub(super) struct Reconstruction<'a> {
    atn: &'a Atn,
    tokens: &'a TokenStream,
    lookahead: LookaheadComputer<'a>,
    see_through_predicates: bool,
    max_steps: usize,
    steps: usize,
    limit: usize,
    active: Vec<(RuleIndex, usize)>,
}

impl<'a> Reconstruction<'a> {
    pub fn new(
        atn: &'a Atn,
        tokens: &'a TokenStream,
        see_through_predicates: bool,
        max_steps: usize,
    ) -> Self {
        Self {
            atn,
            tokens,
            lookahead: LookaheadComputer::new(atn),
            see_through_predicates,
            max_steps,
            steps: 0,
            limit: 0,
            active: Vec::new(),
        }
    }

    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// Tree for `rule` from `decision_state` at `position` with `alt` taken
    /// at the decision. Each call gets its own step budget.
    pub fn build(
        &mut self,
        rule: RuleIndex,
        decision_state: StateId,
        position: usize,
        alt: usize,
    ) -> Option<Arc<ParseTree>> {
        let state = self.atn.state(decision_state)?;
        let decision = state.decision?;
        let target = state.transitions.get(alt.checked_sub(1)?)?.target();
        let choice = DecisionChoice {
            decision,
            position,
            alt,
            child: 0,
        };
        self.limit = self.steps.saturating_add(self.max_steps);
        Some(self.rule(rule, target, position, None, Some(choice)))
    }

    fn rule(
        &mut self,
        rule: RuleIndex,
        entry: StateId,
        start: usize,
        invoking_state: Option<StateId>,
        forced: Option<DecisionChoice>,
    ) -> Arc<ParseTree> {
        let atn = self.atn;
        self.active.push((rule, start));
        let stop = atn.rule_stop(rule);
        let mut state = entry;
        let mut position = start;
        let mut children: Vec<Arc<ParseTree>> = Vec::new();
        let mut trail: SmallVec<[DecisionChoice; 2]> = forced.into_iter().collect();
        let mut idle: SmallVec<[StateId; 8]> = SmallVec::new();

        while Some(state) != stop && self.steps < self.limit {
            self.steps += 1;
            if idle.contains(&state) {
                break;
            }
            idle.push(state);

            let current = &atn.states[state];
            let index = match current.decision {
                Some(decision) => {
                    let Some(alt) = self.predict(state, position) else {
                        break;
                    };
                    trail.push(DecisionChoice {
                        decision,
                        position,
                        alt,
                        child: children.len(),
                    });
                    alt - 1
                }
                None if current.transitions.is_empty() => break,
                None => 0,
            };

            match &current.transitions[index] {
                Transition::Epsilon { target } | Transition::Predicate { target, .. } => {
                    state = *target;
                }
                Transition::Rule {
                    target,
                    rule: callee,
                    follow,
                } => {
                    let entered = self
                        .active
                        .iter()
                        .filter(|&&active| active == (*callee, position))
                        .count();
                    if entered >= MAX_REENTRY {
                        break;
                    }
                    let child = self.rule(*callee, *target, position, Some(state), None);
                    if child.end() > position {
                        idle.clear();
                    }
                    position = child.end();
                    children.push(child);
                    state = *follow;
                }
                transition => {
                    let Some(token_type) = self.tokens.token_type(position) else {
                        break;
                    };
                    let leaf = TerminalNode {
                        token_index: position,
                        token_type,
                        state: Some(state),
                    };
                    children.push(Arc::new(if transition.matches(token_type, atn.max_token_type()) {
                        ParseTree::Token(leaf)
                    } else {
                        ParseTree::Error(leaf)
                    }));
                    position += 1;
                    idle.clear();
                    state = transition.target();
                }
            }
        }

        self.active.pop();
        let alt = atn
            .rule_decision(rule)
            .and_then(|decision| trail.first().filter(|c| c.decision == decision))
            .map_or(1, |c| c.alt);
        Arc::new(ParseTree::Rule(RuleNode {
            rule,
            alt,
            invoking_state,
            start,
            end: position,
            trail,
            children,
        }))
    }

    /// First alternative whose lookahead holds the current token through a
    /// call path that avoids rules already entered at this position; failing
    /// that, the first alternative that can leave the rule without input
    fn predict(&self, state: StateId, position: usize) -> Option<usize> {
        let token = self.tokens.token_type(position).unwrap_or(EOF);
        let alt_count = self.atn.state(state)?.transitions.len();
        let mut can_exit = None;

        for alt in 1..=alt_count {
            let request = LookaheadRequest::new(state)
                .with_alternatives(AltSet::from_iter([alt]))
                .with_see_through_predicates(self.see_through_predicates)
                .with_add_eof(false);
            let Ok(report) = self.lookahead.lookahead(&request) else {
                continue;
            };
            let viable = report.paths(token).iter().any(|path| {
                path.iter()
                    .all(|rule| !self.active.iter().any(|&(r, p)| r == *rule && p == position))
            });
            if viable {
                return Some(alt);
            }
            if can_exit.is_none() && report.tokens().contains(EPSILON) {
                can_exit = Some(alt);
            }
        }
        can_exit
    }
}

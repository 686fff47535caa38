//! Lookahead over left-recursive, nullable and predicated grammars

mod common;

use sipha_ambiguity::atn::{
    AltSet, Alternative, CallContext, EOF, EPSILON, Element, GrammarBuilder, HIT_PRED, Transition,
};
use sipha_ambiguity::lookahead::{LookaheadComputer, LookaheadRequest};
use sipha_ambiguity::testing::fixtures;
use sipha_ambiguity::{AnalysisError, GrammarModel, IntervalSet};
use std::sync::Arc;

fn token(grammar: &GrammarModel, name: &str) -> i32 {
    grammar.vocabulary().token_type(name).expect("token exists")
}

fn sorted(set: &IntervalSet) -> Vec<i32> {
    set.iter().collect()
}

#[test]
fn test_direct_left_recursion_terminates() {
    common::init_tracing();
    let grammar = fixtures::expr_grammar();
    let atn = grammar.atn();
    let start = atn.rule_start(0).unwrap();

    let report = LookaheadComputer::new(atn)
        .lookahead(&LookaheadRequest::new(start).with_context(CallContext::empty()))
        .unwrap();
    assert_eq!(sorted(report.tokens()), vec![token(&grammar, "ATOM")]);
    assert!(report.stats().max_call_depth <= atn.rule_count());
}

#[test]
fn test_indirect_left_recursion_never_reenters_a_rule() {
    common::init_tracing();
    let grammar = fixtures::indirect_left_recursive_grammar();
    let atn = grammar.atn();
    let start = atn.rule_start(0).unwrap();

    let report = LookaheadComputer::new(atn)
        .lookahead(&LookaheadRequest::new(start))
        .unwrap();
    let mut expected = vec![token(&grammar, "Y"), token(&grammar, "W")];
    expected.sort_unstable();
    assert_eq!(sorted(report.tokens()), expected);

    for t in report.tokens().iter() {
        for path in report.paths(t) {
            let mut rules = path.to_vec();
            rules.sort_unstable();
            rules.dedup();
            assert_eq!(rules.len(), path.len(), "rule entered twice on {path:?}");
        }
    }
    assert!(report.stats().max_call_depth <= atn.rule_count());
}

#[test]
fn test_nullable_loop_sees_loop_exit() {
    let grammar = fixtures::nullable_loop_grammar();
    let atn = grammar.atn();
    let start = atn.rule_start(0).unwrap();

    let tokens = LookaheadComputer::new(atn)
        .look(start, Some(CallContext::empty()))
        .unwrap();
    let mut expected = vec![token(&grammar, "A"), token(&grammar, "END")];
    expected.sort_unstable();
    assert_eq!(sorted(&tokens), expected);
    assert!(!tokens.contains(EOF));
}

#[test]
fn test_predicates_stop_the_walk_unless_seen_through() {
    let grammar = fixtures::predicate_grammar();
    let atn = grammar.atn();
    let decision = atn.rule_decision(0).unwrap();
    let state = atn.decision_state(decision).unwrap();
    let computer = LookaheadComputer::new(atn);
    let id = token(&grammar, "ID");

    let blocked = computer
        .lookahead(
            &LookaheadRequest::new(state)
                .with_alternatives(AltSet::from_iter([1]))
                .with_see_through_predicates(false),
        )
        .unwrap();
    assert_eq!(sorted(blocked.tokens()), vec![HIT_PRED]);

    let seen = computer
        .lookahead(&LookaheadRequest::new(state).with_alternatives(AltSet::from_iter([1])))
        .unwrap();
    assert_eq!(sorted(seen.tokens()), vec![id]);
}

#[test]
fn test_decision_lookahead_per_alternative() {
    let grammar = fixtures::predicate_grammar();
    let per_alt = LookaheadComputer::new(grammar.atn())
        .decision_lookahead(0)
        .unwrap();
    assert_eq!(per_alt.len(), 2);
    assert!(per_alt[0].is_none());
    assert_eq!(
        per_alt[1].as_ref().map(sorted),
        Some(vec![token(&grammar, "ID")])
    );

    let grammar = fixtures::dangling_else_grammar();
    let computer = LookaheadComputer::new(grammar.atn());
    let stat = computer.decision_lookahead(0).unwrap();
    assert_eq!(stat[0].as_ref().map(sorted), Some(vec![token(&grammar, "IF")]));
    assert_eq!(stat[1].as_ref().map(sorted), Some(vec![token(&grammar, "OTHER")]));

    let optional = computer.decision_lookahead(1).unwrap();
    assert_eq!(optional[0].as_ref().map(sorted), Some(vec![token(&grammar, "ELSE")]));
    assert!(optional[1].as_ref().is_some_and(|set| set.contains(EPSILON)));
}

#[test]
fn test_stop_state_ends_the_walk() {
    let grammar = fixtures::dangling_else_grammar();
    let atn = grammar.atn();
    let expr = atn.rule_index("expr").unwrap();
    let start = atn.rule_start(expr).unwrap();

    let report = LookaheadComputer::new(atn)
        .lookahead(&LookaheadRequest::new(start).with_stop_state(start))
        .unwrap();
    assert_eq!(sorted(report.tokens()), vec![EPSILON]);
}

#[test]
fn test_unknown_decision() {
    let grammar = fixtures::expr_grammar();
    assert_eq!(
        LookaheadComputer::new(grammar.atn()).decision_lookahead(9),
        Err(AnalysisError::UnknownDecision { decision: 9 })
    );
}

/// `not_b : ~B ; any : . ;` over tokens `A B C`
fn set_grammar() -> GrammarModel {
    let mut builder = GrammarBuilder::new();
    builder.token("A");
    let b = builder.token("B");
    builder.token("C");
    let not_b = builder.declare_rule("not_b");
    let any = builder.declare_rule("any");
    builder.define(not_b, vec![Alternative::new([Element::not_set(IntervalSet::of(b))])]);
    builder.define(any, vec![Alternative::new([Element::wildcard()])]);
    builder.build().expect("valid grammar")
}

#[test]
fn test_not_set_yields_the_complement() {
    let grammar = set_grammar();
    let atn = grammar.atn();
    let start = atn.rule_start(atn.rule_index("not_b").unwrap()).unwrap();

    let report = LookaheadComputer::new(atn)
        .lookahead(&LookaheadRequest::new(start))
        .unwrap();
    assert_eq!(
        sorted(report.tokens()),
        vec![token(&grammar, "A"), token(&grammar, "C")]
    );
}

#[test]
fn test_wildcard_yields_every_token() {
    let grammar = set_grammar();
    let atn = grammar.atn();
    let start = atn.rule_start(atn.rule_index("any").unwrap()).unwrap();

    let report = LookaheadComputer::new(atn)
        .lookahead(&LookaheadRequest::new(start))
        .unwrap();
    assert_eq!(
        sorted(report.tokens()),
        vec![token(&grammar, "A"), token(&grammar, "B"), token(&grammar, "C")]
    );
    assert!(!report.tokens().contains(EOF));
}

#[test]
fn test_merged_context_follows_every_caller() {
    common::init_tracing();
    let mut builder = GrammarBuilder::new();
    let a = builder.token("A");
    let b = builder.token("B");
    let x = builder.token("X");
    let s = builder.declare_rule("s");
    let item = builder.declare_rule("item");
    builder.define(
        s,
        vec![
            Alternative::new([Element::rule(item), Element::token(a)]),
            Alternative::new([Element::rule(item), Element::token(b)]),
        ],
    );
    builder.define(item, vec![Alternative::new([Element::token(x)])]);
    let grammar = builder.build().expect("valid grammar");
    let atn = grammar.atn();

    let follows: Vec<_> = atn
        .states()
        .iter()
        .flat_map(|state| &state.transitions)
        .filter_map(|transition| match transition {
            Transition::Rule { rule, follow, .. } if *rule == item => Some(*follow),
            _ => None,
        })
        .collect();
    assert_eq!(follows.len(), 2);

    let root = CallContext::empty();
    let first = CallContext::push(Some(&root), follows[0]);
    let second = CallContext::push(Some(&root), follows[1]);
    let merged = CallContext::merge(&first, &second);
    assert_eq!(merged.frames().len(), 2);

    let computer = LookaheadComputer::new(atn);
    let stop = atn.rule_stop(item).unwrap();
    let from = |ctx: Arc<CallContext>| {
        computer
            .lookahead(&LookaheadRequest::new(stop).with_context(ctx))
            .unwrap()
            .into_tokens()
    };

    let alone: Vec<_> = [first, second].into_iter().map(&from).collect();
    assert!(alone.iter().all(|set| set.len() == 1));
    assert_ne!(alone[0], alone[1]);

    let both = from(merged);
    assert_eq!(sorted(&both), vec![a, b]);
    assert!(!both.contains(EOF));
}

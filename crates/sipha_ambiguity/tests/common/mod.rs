//! Shared helpers for the integration tests

#![allow(dead_code)]

use sipha_ambiguity::GrammarModel;
use sipha_ambiguity::atn::AltSet;
use sipha_ambiguity::enumerate::DecisionTarget;

/// Route `tracing` output through the test harness; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Target for `decision` of `grammar` over `start..=stop`
pub fn target(
    grammar: &GrammarModel,
    decision: usize,
    start: usize,
    stop: usize,
    alts: &[usize],
) -> DecisionTarget {
    let atn = grammar.atn();
    let state = atn.decision_state(decision).expect("decision exists");
    DecisionTarget {
        rule_index: atn.state(state).expect("state exists").rule,
        state,
        decision,
        start_index: start,
        stop_index: stop,
        conflicting_alternatives: alts.iter().copied().collect::<AltSet>(),
    }
}

//! Exact ambiguity detection between complete parses.
//!
//! Two parses of the same input take the same decisions up to some point and
//! then diverge. Since everything before that point is identical, the first
//! differing entries of the two decision timelines are the same decision at
//! the same token, with different alternatives.

use crate::atn::{AltSet, Atn, DecisionId, RuleIndex, StateId};
use crate::tree::{DecisionChoice, ParseTree};
use std::ops::ControlFlow;
use std::sync::Arc;

/// A decision at which two complete parses chose differently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityReport {
    pub decision: DecisionId,
    /// Decision state
    pub state: StateId,
    /// Rule containing the decision state
    pub rule: RuleIndex,
    /// Token index at which the decision was taken
    pub start: usize,
    /// Last token index of the smallest rule invocation the parses disagree on
    pub stop: usize,
    pub ambig_alts: AltSet,
    /// Number of earlier times the same parse took this decision at `start`
    pub occurrence: usize,
}

impl AmbiguityReport {
    fn same_event(&self, other: &Self) -> bool {
        self.decision == other.decision
            && self.start == other.start
            && self.stop == other.stop
            && self.occurrence == other.occurrence
    }
}

/// Receiver of ambiguity reports.
///
/// Returning [`ControlFlow::Break`] stops the reporting.
pub trait AmbiguityListener {
    fn report_ambiguity(&mut self, report: &AmbiguityReport) -> ControlFlow<()>;
}

impl<F> AmbiguityListener for F
where
    F: FnMut(&AmbiguityReport) -> ControlFlow<()>,
{
    fn report_ambiguity(&mut self, report: &AmbiguityReport) -> ControlFlow<()> {
        self(report)
    }
}

/// Compare every pair of parses; reports describing the same event are
/// merged before any is delivered.
pub(super) fn detect<L>(atn: &Atn, trees: &[Arc<ParseTree>], listener: &mut L) -> ControlFlow<()>
where
    L: AmbiguityListener + ?Sized,
{
    let timelines: Vec<_> = trees.iter().map(|tree| tree.timeline()).collect();
    let mut reports: Vec<AmbiguityReport> = Vec::new();

    for (i, a) in trees.iter().enumerate() {
        for (j, b) in trees.iter().enumerate().skip(i + 1) {
            let Some(report) = compare(atn, (a, &timelines[i]), (b, &timelines[j])) else {
                continue;
            };
            match reports.iter_mut().find(|r| r.same_event(&report)) {
                Some(existing) => {
                    for alt in report.ambig_alts.iter() {
                        existing.ambig_alts.insert(alt);
                    }
                }
                None => reports.push(report),
            }
        }
    }

    tracing::debug!(parses = trees.len(), reports = reports.len(), "ambiguity detection");
    for report in &reports {
        listener.report_ambiguity(report)?;
    }
    ControlFlow::Continue(())
}

fn compare(
    atn: &Atn,
    (a, timeline_a): (&Arc<ParseTree>, &[DecisionChoice]),
    (b, timeline_b): (&Arc<ParseTree>, &[DecisionChoice]),
) -> Option<AmbiguityReport> {
    let key = |c: &DecisionChoice| (c.decision, c.position, c.alt);
    let index = timeline_a
        .iter()
        .zip(timeline_b)
        .position(|(x, y)| key(x) != key(y))?;
    let (x, y) = (timeline_a[index], timeline_b[index]);
    if x.decision != y.decision || x.position != y.position {
        return None;
    }

    let state = atn.decision_state(x.decision)?;
    let rule = atn.state(state)?.rule;
    let occurrence = timeline_a[..index]
        .iter()
        .filter(|c| c.decision == x.decision && c.position == x.position)
        .count();
    let stop = disagreement(a, b).end().saturating_sub(1).max(x.position);

    Some(AmbiguityReport {
        decision: x.decision,
        state,
        rule,
        start: x.position,
        stop,
        ambig_alts: AltSet::from_iter([x.alt, y.alt]),
        occurrence,
    })
}

/// Smallest rule invocation of `a` that `b` parses over the same tokens but
/// differently
fn disagreement<'t>(mut a: &'t Arc<ParseTree>, mut b: &'t Arc<ParseTree>) -> &'t Arc<ParseTree> {
    loop {
        let (Some(node_a), Some(node_b)) = (a.as_rule(), b.as_rule()) else {
            return a;
        };
        if node_a.trail != node_b.trail || node_a.children.len() != node_b.children.len() {
            return a;
        }
        let mut differing = node_a
            .children
            .iter()
            .zip(&node_b.children)
            .filter(|(x, y)| x != y);
        let (Some((child_a, child_b)), None) = (differing.next(), differing.next()) else {
            return a;
        };
        if !same_invocation(child_a, child_b) {
            return a;
        }
        a = child_a;
        b = child_b;
    }
}

fn same_invocation(a: &ParseTree, b: &ParseTree) -> bool {
    match (a.as_rule(), b.as_rule()) {
        (Some(x), Some(y)) => x.rule == y.rule && x.start == y.start && x.end == y.end,
        _ => false,
    }
}

/// Parses that raise `report`, paired with the alternative each one took.
///
/// Both sides of a raising pair share a rule invocation spanning exactly
/// `start..=stop`, so their enclosing subtrees line up. Other parses may
/// take the same alternative under a different nesting and are skipped.
fn witnesses(atn: &Atn, trees: &[Arc<ParseTree>], report: &AmbiguityReport) -> Vec<(usize, usize)> {
    let timelines: Vec<_> = trees.iter().map(|tree| tree.timeline()).collect();
    let mut out = Vec::new();
    for i in 0..trees.len() {
        for j in i + 1..trees.len() {
            let Some(raised) = compare(atn, (&trees[i], &timelines[i]), (&trees[j], &timelines[j])) else {
                continue;
            };
            if !raised.same_event(report) {
                continue;
            }
            let mut alts = raised.ambig_alts.iter();
            if let (Some(first), Some(second)) = (alts.next(), alts.next()) {
                let (alt_i, alt_j) = if choice_at(&timelines[i], report) == Some(first) {
                    (first, second)
                } else {
                    (second, first)
                };
                out.push((i, alt_i));
                out.push((j, alt_j));
            }
        }
    }
    out
}

/// Alternative chosen at the reported decision instance
fn choice_at(timeline: &[DecisionChoice], report: &AmbiguityReport) -> Option<usize> {
    timeline
        .iter()
        .filter(|c| c.decision == report.decision && c.position == report.start)
        .nth(report.occurrence)
        .map(|c| c.alt)
}

pub(super) fn trees_for(
    atn: &Atn,
    trees: &[Arc<ParseTree>],
    report: &AmbiguityReport,
    alternatives: &AltSet,
) -> Vec<Arc<ParseTree>> {
    let witnesses = witnesses(atn, trees, report);
    let mut out: Vec<Arc<ParseTree>> = Vec::new();
    for alt in alternatives.iter() {
        let subtree = witnesses
            .iter()
            .filter(|&&(_, chosen)| chosen == alt)
            .filter_map(|&(index, _)| trees[index].enclosing(report.start, report.stop))
            .find(|subtree| subtree.end() == report.stop + 1);
        if let Some(subtree) = subtree
            && !out.contains(&subtree)
        {
            out.push(subtree);
        }
    }
    out
}

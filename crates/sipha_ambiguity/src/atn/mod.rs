//! # Transition Network
//!
//! The compiled automaton form of a grammar: states connected by labeled
//! transitions, one start/stop state pair per rule, and numbered decision
//! states where a parser has to pick an alternative.
//!
//! The network is owned by the grammar model and only read by the analysis
//! components. Build one with [`GrammarBuilder`].

mod alt_set;
mod builder;
mod context;
mod interval_set;
mod vocabulary;

pub use alt_set::AltSet;
pub use builder::{Alternative, Element, ElementKind, GrammarBuilder};
pub use context::{CallContext, ContextFrame};
pub use interval_set::{Interval, IntervalSet};
pub use vocabulary::Vocabulary;

use crate::text::TextRange;
use compact_str::CompactString;

/// Index of a state in [`Atn::states`]
pub type StateId = usize;
/// Index of a rule in [`Atn::rule_names`]
pub type RuleIndex = usize;
/// Decision number, in creation order
pub type DecisionId = usize;
/// Token type; user types start at [`MIN_USER_TOKEN_TYPE`]
pub type TokenType = i32;

/// End of input
pub const EOF: TokenType = -1;
/// Lookahead reached the end of a rule without a calling context
pub const EPSILON: TokenType = -2;
/// Lookahead stopped at a predicate it was not allowed to see through
pub const HIT_PRED: TokenType = 0;
pub const MIN_USER_TOKEN_TYPE: TokenType = 1;

/// Role a state plays in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    RuleStop,
    /// Entry of a `( .. | .. )` block
    BlockStart,
    BlockEnd,
    /// Decision between another iteration of a `*` loop and leaving it
    StarLoopEntry,
    /// Decision between another iteration of a `+` loop and leaving it
    PlusLoopBack,
    StarLoopBack,
    LoopEnd,
}

/// Labeled edge between two states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    /// Call of `rule`; parsing resumes at `follow` once the rule returns
    Rule {
        target: StateId,
        rule: RuleIndex,
        follow: StateId,
    },
    Predicate {
        target: StateId,
        index: usize,
    },
    Wildcard {
        target: StateId,
    },
    Set {
        target: StateId,
        set: IntervalSet,
    },
    NotSet {
        target: StateId,
        set: IntervalSet,
    },
}

impl Transition {
    #[must_use]
    pub const fn target(&self) -> StateId {
        match self {
            Self::Epsilon { target }
            | Self::Rule { target, .. }
            | Self::Predicate { target, .. }
            | Self::Wildcard { target }
            | Self::Set { target, .. }
            | Self::NotSet { target, .. } => *target,
        }
    }

    /// Whether following the edge consumes no input
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Self::Epsilon { .. } | Self::Rule { .. } | Self::Predicate { .. }
        )
    }

    /// Whether the edge consumes `token`; `max_token_type` bounds wildcard
    /// and not-set edges.
    #[must_use]
    pub fn matches(&self, token: TokenType, max_token_type: TokenType) -> bool {
        let in_vocab = (MIN_USER_TOKEN_TYPE..=max_token_type).contains(&token);
        match self {
            Self::Wildcard { .. } => in_vocab,
            Self::Set { set, .. } => set.contains(token),
            Self::NotSet { set, .. } => in_vocab && !set.contains(token),
            _ => false,
        }
    }
}

/// A node of the transition network
#[derive(Debug, Clone)]
pub struct AtnState {
    pub id: StateId,
    pub rule: RuleIndex,
    pub kind: StateKind,
    /// Set when this state chooses among alternatives
    pub decision: Option<DecisionId>,
    pub transitions: Vec<Transition>,
    /// Where the grammar construct that produced this state is written
    pub span: Option<TextRange>,
}

/// The transition network of a grammar
#[derive(Debug, Clone, Default)]
pub struct Atn {
    pub(crate) states: Vec<AtnState>,
    pub(crate) rule_names: Vec<CompactString>,
    pub(crate) rule_start: Vec<StateId>,
    pub(crate) rule_stop: Vec<StateId>,
    pub(crate) decision_to_state: Vec<StateId>,
    pub(crate) predicates: Vec<CompactString>,
    pub(crate) max_token_type: TokenType,
    pub(crate) source_len: Option<u32>,
}

impl Atn {
    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id)
    }

    #[must_use]
    pub fn rule_names(&self) -> &[CompactString] {
        &self.rule_names
    }

    #[must_use]
    pub fn rule_name(&self, rule: RuleIndex) -> Option<&str> {
        self.rule_names.get(rule).map(CompactString::as_str)
    }

    #[must_use]
    pub fn rule_index(&self, name: &str) -> Option<RuleIndex> {
        self.rule_names.iter().position(|n| n == name)
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_names.len()
    }

    #[must_use]
    pub fn rule_start(&self, rule: RuleIndex) -> Option<StateId> {
        self.rule_start.get(rule).copied()
    }

    #[must_use]
    pub fn rule_stop(&self, rule: RuleIndex) -> Option<StateId> {
        self.rule_stop.get(rule).copied()
    }

    #[must_use]
    pub fn decision_state(&self, decision: DecisionId) -> Option<StateId> {
        self.decision_to_state.get(decision).copied()
    }

    #[must_use]
    pub fn decision_count(&self) -> usize {
        self.decision_to_state.len()
    }

    /// Decision of the outermost alternative block of `rule`, if it has more
    /// than one alternative
    #[must_use]
    pub fn rule_decision(&self, rule: RuleIndex) -> Option<DecisionId> {
        let start = self.state(self.rule_start(rule)?)?;
        match start.transitions.first()? {
            Transition::Epsilon { target } => self.state(*target)?.decision,
            _ => None,
        }
    }

    #[must_use]
    pub fn predicate_text(&self, index: usize) -> Option<&str> {
        self.predicates.get(index).map(CompactString::as_str)
    }

    #[must_use]
    pub const fn max_token_type(&self) -> TokenType {
        self.max_token_type
    }

    /// Length of the grammar source text, when known
    #[must_use]
    pub const fn source_len(&self) -> Option<u32> {
        self.source_len
    }

    /// All token types a wildcard can match
    #[must_use]
    pub fn token_range(&self) -> IntervalSet {
        IntervalSet::of_range(MIN_USER_TOKEN_TYPE, self.max_token_type)
    }
}

/// A grammar's transition network together with its token vocabulary.
///
/// This is the snapshot every analysis request works against; the engine
/// borrows it and never mutates it.
#[derive(Debug, Clone)]
pub struct GrammarModel {
    atn: Atn,
    vocabulary: Vocabulary,
}

impl GrammarModel {
    #[must_use]
    pub const fn new(atn: Atn, vocabulary: Vocabulary) -> Self {
        Self { atn, vocabulary }
    }

    #[must_use]
    pub const fn atn(&self) -> &Atn {
        &self.atn
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn rule_names(&self) -> &[CompactString] {
        self.atn.rule_names()
    }
}

//! Construction of [`GrammarModel`]s from rules written as alternatives of
//! elements.
//!
//! The generated network has the usual shape:
//!
//! - each rule gets a start and a stop state, joined through a block
//! - blocks with more than one alternative, optional blocks and loop entries
//!   and loop backs are decision states, numbered in creation order
//! - every rule call adds an epsilon edge from the callee's stop state to the
//!   call's follow state, so lookahead without a context sees the global follow

use crate::atn::{
    Atn, AtnState, DecisionId, GrammarModel, IntervalSet, RuleIndex, StateId, StateKind,
    TokenType, Transition, Vocabulary, MIN_USER_TOKEN_TYPE,
};
use crate::error::AtnError;
use crate::text::TextRange;
use compact_str::CompactString;

/// What a grammar element matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Token(TokenType),
    Rule(RuleIndex),
    Wildcard,
    Set(IntervalSet),
    NotSet(IntervalSet),
    /// Semantic predicate, kept as source text
    Predicate(CompactString),
    /// `( a | b )`
    Block(Vec<Alternative>),
    /// `( a | b )?`
    Optional(Vec<Alternative>),
    /// `( a | b )*`
    Star(Vec<Alternative>),
    /// `( a | b )+`
    Plus(Vec<Alternative>),
}

/// One element of an alternative, with the source range it was written at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub span: Option<TextRange>,
}

impl Element {
    #[must_use]
    pub const fn new(kind: ElementKind) -> Self {
        Self { kind, span: None }
    }

    #[must_use]
    pub const fn token(token: TokenType) -> Self {
        Self::new(ElementKind::Token(token))
    }

    #[must_use]
    pub const fn rule(rule: RuleIndex) -> Self {
        Self::new(ElementKind::Rule(rule))
    }

    #[must_use]
    pub const fn wildcard() -> Self {
        Self::new(ElementKind::Wildcard)
    }

    #[must_use]
    pub const fn set(set: IntervalSet) -> Self {
        Self::new(ElementKind::Set(set))
    }

    #[must_use]
    pub const fn not_set(set: IntervalSet) -> Self {
        Self::new(ElementKind::NotSet(set))
    }

    #[must_use]
    pub fn predicate(text: &str) -> Self {
        Self::new(ElementKind::Predicate(text.into()))
    }

    #[must_use]
    pub const fn block(alternatives: Vec<Alternative>) -> Self {
        Self::new(ElementKind::Block(alternatives))
    }

    #[must_use]
    pub const fn optional(alternatives: Vec<Alternative>) -> Self {
        Self::new(ElementKind::Optional(alternatives))
    }

    #[must_use]
    pub const fn star(alternatives: Vec<Alternative>) -> Self {
        Self::new(ElementKind::Star(alternatives))
    }

    #[must_use]
    pub const fn plus(alternatives: Vec<Alternative>) -> Self {
        Self::new(ElementKind::Plus(alternatives))
    }

    /// Attach the grammar source range of this element
    #[must_use]
    pub const fn at(mut self, span: TextRange) -> Self {
        self.span = Some(span);
        self
    }
}

/// A sequence of elements; an empty alternative matches nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alternative {
    pub elements: Vec<Element>,
    pub span: Option<TextRange>,
}

impl Alternative {
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            span: None,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn at(mut self, span: TextRange) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Debug, Clone)]
struct RuleDef {
    name: CompactString,
    alternatives: Option<Vec<Alternative>>,
    span: Option<TextRange>,
}

/// Builder for [`GrammarModel`]s.
///
/// Tokens and rules are declared first so rules can reference each other in
/// any order; definitions are validated in [`GrammarBuilder::build`].
///
/// ```rust
/// use sipha_ambiguity::atn::{Alternative, Element, GrammarBuilder};
///
/// let mut builder = GrammarBuilder::new();
/// let atom = builder.token("ATOM");
/// let op = builder.token("OP");
/// let expr = builder.declare_rule("expr");
/// builder.define(
///     expr,
///     vec![
///         Alternative::new([Element::rule(expr), Element::token(op), Element::rule(expr)]),
///         Alternative::new([Element::token(atom)]),
///     ],
/// );
/// let grammar = builder.build()?;
/// assert_eq!(grammar.atn().decision_count(), 1);
/// # Ok::<(), sipha_ambiguity::error::AtnError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    vocabulary: Vocabulary,
    rules: Vec<RuleDef>,
    source_len: Option<u32>,
    duplicate: Option<CompactString>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vocabulary: Vocabulary::new(),
            rules: Vec::new(),
            source_len: None,
            duplicate: None,
        }
    }

    /// Declare a token by symbolic name; returns its type
    pub fn token(&mut self, name: &str) -> TokenType {
        self.vocabulary.push(Some(name), None)
    }

    /// Declare a token with both a symbolic and a literal name
    pub fn literal_token(&mut self, name: &str, literal: &str) -> TokenType {
        self.vocabulary.push(Some(name), Some(literal))
    }

    /// Declare a rule, or return the index of an existing rule with that name
    pub fn declare_rule(&mut self, name: &str) -> RuleIndex {
        if let Some(index) = self.rules.iter().position(|r| r.name == name) {
            return index;
        }
        self.rules.push(RuleDef {
            name: name.into(),
            alternatives: None,
            span: None,
        });
        self.rules.len() - 1
    }

    /// Define the alternatives of a declared rule
    pub fn define(&mut self, rule: RuleIndex, alternatives: Vec<Alternative>) -> &mut Self {
        self.define_inner(rule, alternatives, None)
    }

    /// Define a rule and record where its definition is written
    pub fn define_at(
        &mut self,
        rule: RuleIndex,
        alternatives: Vec<Alternative>,
        span: TextRange,
    ) -> &mut Self {
        self.define_inner(rule, alternatives, Some(span))
    }

    fn define_inner(
        &mut self,
        rule: RuleIndex,
        alternatives: Vec<Alternative>,
        span: Option<TextRange>,
    ) -> &mut Self {
        if let Some(def) = self.rules.get_mut(rule) {
            if def.alternatives.is_some() && self.duplicate.is_none() {
                self.duplicate = Some(def.name.clone());
            }
            def.alternatives = Some(alternatives);
            def.span = span;
        }
        self
    }

    /// Length of the grammar text the source ranges point into
    pub fn source_len(&mut self, len: u32) -> &mut Self {
        self.source_len = Some(len);
        self
    }

    /// Assemble the transition network.
    ///
    /// # Errors
    ///
    /// Returns an [`AtnError`] for undefined or duplicate rules, references
    /// to undeclared rules or tokens, and empty blocks.
    pub fn build(self) -> Result<GrammarModel, AtnError> {
        if self.rules.is_empty() {
            return Err(AtnError::EmptyGrammar);
        }
        if let Some(name) = self.duplicate {
            return Err(AtnError::DuplicateRule {
                name: name.to_string(),
            });
        }

        let mut assembler = Assembler {
            atn: Atn {
                rule_names: self.rules.iter().map(|r| r.name.clone()).collect(),
                max_token_type: self.vocabulary.max_token_type(),
                source_len: self.source_len,
                ..Atn::default()
            },
            rule_count: self.rules.len(),
            follow_edges: Vec::new(),
        };

        for (index, def) in self.rules.iter().enumerate() {
            let start = assembler.new_state(index, StateKind::RuleStart, def.span);
            let stop = assembler.new_state(index, StateKind::RuleStop, def.span);
            assembler.atn.rule_start.push(start);
            assembler.atn.rule_stop.push(stop);
        }

        for (index, def) in self.rules.iter().enumerate() {
            let Some(alternatives) = &def.alternatives else {
                return Err(AtnError::UndefinedRule {
                    name: def.name.to_string(),
                });
            };
            let (entry, exit) = assembler.block(index, alternatives, def.span)?;
            let (start, stop) = (assembler.atn.rule_start[index], assembler.atn.rule_stop[index]);
            assembler.epsilon(start, entry);
            assembler.epsilon(exit, stop);
        }

        for (callee, follow) in std::mem::take(&mut assembler.follow_edges) {
            let stop = assembler.atn.rule_stop[callee];
            let edge = Transition::Epsilon { target: follow };
            if !assembler.atn.states[stop].transitions.contains(&edge) {
                assembler.atn.states[stop].transitions.push(edge);
            }
        }

        Ok(GrammarModel::new(assembler.atn, self.vocabulary))
    }
}

struct Assembler {
    atn: Atn,
    rule_count: usize,
    follow_edges: Vec<(RuleIndex, StateId)>,
}

impl Assembler {
    fn new_state(&mut self, rule: RuleIndex, kind: StateKind, span: Option<TextRange>) -> StateId {
        let id = self.atn.states.len();
        self.atn.states.push(AtnState {
            id,
            rule,
            kind,
            decision: None,
            transitions: Vec::new(),
            span,
        });
        id
    }

    fn new_decision(
        &mut self,
        rule: RuleIndex,
        kind: StateKind,
        span: Option<TextRange>,
    ) -> StateId {
        let id = self.new_state(rule, kind, span);
        let decision: DecisionId = self.atn.decision_to_state.len();
        self.atn.decision_to_state.push(id);
        self.atn.states[id].decision = Some(decision);
        id
    }

    fn edge(&mut self, from: StateId, transition: Transition) {
        self.atn.states[from].transitions.push(transition);
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.edge(from, Transition::Epsilon { target: to });
    }

    fn rule_name(&self, rule: RuleIndex) -> String {
        self.atn
            .rule_name(rule)
            .map_or_else(|| rule.to_string(), str::to_string)
    }

    /// Block start/end pair; the start is a decision when there is a choice
    fn block(
        &mut self,
        rule: RuleIndex,
        alternatives: &[Alternative],
        span: Option<TextRange>,
    ) -> Result<(StateId, StateId), AtnError> {
        if alternatives.is_empty() {
            return Err(AtnError::EmptyBlock {
                rule: self.rule_name(rule),
            });
        }
        let start = if alternatives.len() > 1 {
            self.new_decision(rule, StateKind::BlockStart, span)
        } else {
            self.new_state(rule, StateKind::BlockStart, span)
        };
        let end = self.new_state(rule, StateKind::BlockEnd, None);
        for alternative in alternatives {
            let (entry, exit) = self.alternative(rule, alternative)?;
            self.epsilon(start, entry);
            self.epsilon(exit, end);
        }
        Ok((start, end))
    }

    fn alternative(
        &mut self,
        rule: RuleIndex,
        alternative: &Alternative,
    ) -> Result<(StateId, StateId), AtnError> {
        let entry = self.new_state(rule, StateKind::Basic, alternative.span);
        let mut current = entry;
        for element in &alternative.elements {
            let (left, right) = self.element(rule, element)?;
            self.epsilon(current, left);
            current = right;
        }
        Ok((entry, current))
    }

    fn element(&mut self, rule: RuleIndex, element: &Element) -> Result<(StateId, StateId), AtnError> {
        let span = element.span;
        match &element.kind {
            ElementKind::Token(token) => {
                if *token < MIN_USER_TOKEN_TYPE || *token > self.atn.max_token_type {
                    return Err(AtnError::UnknownToken { token: *token });
                }
                Ok(self.consuming(rule, span, |target| Transition::Set {
                    target,
                    set: IntervalSet::of(*token),
                }))
            }
            ElementKind::Set(set) => Ok(self.consuming(rule, span, |target| Transition::Set {
                target,
                set: set.clone(),
            })),
            ElementKind::NotSet(set) => Ok(self.consuming(rule, span, |target| {
                Transition::NotSet {
                    target,
                    set: set.clone(),
                }
            })),
            ElementKind::Wildcard => {
                Ok(self.consuming(rule, span, |target| Transition::Wildcard { target }))
            }
            ElementKind::Predicate(text) => {
                let index = self.atn.predicates.len();
                self.atn.predicates.push(text.clone());
                Ok(self.consuming(rule, span, |target| Transition::Predicate { target, index }))
            }
            ElementKind::Rule(callee) => {
                if *callee >= self.rule_count {
                    return Err(AtnError::UnknownRule { index: *callee });
                }
                let left = self.new_state(rule, StateKind::Basic, span);
                let follow = self.new_state(rule, StateKind::Basic, None);
                let target = self.atn.rule_start[*callee];
                self.edge(
                    left,
                    Transition::Rule {
                        target,
                        rule: *callee,
                        follow,
                    },
                );
                self.follow_edges.push((*callee, follow));
                Ok((left, follow))
            }
            ElementKind::Block(alternatives) => self.block(rule, alternatives, span),
            ElementKind::Optional(alternatives) => {
                if alternatives.is_empty() {
                    return Err(AtnError::EmptyBlock {
                        rule: self.rule_name(rule),
                    });
                }
                let start = self.new_decision(rule, StateKind::BlockStart, span);
                let end = self.new_state(rule, StateKind::BlockEnd, None);
                for alternative in alternatives {
                    let (entry, exit) = self.alternative(rule, alternative)?;
                    self.epsilon(start, entry);
                    self.epsilon(exit, end);
                }
                // bypass is the last alternative
                self.epsilon(start, end);
                Ok((start, end))
            }
            ElementKind::Star(alternatives) => {
                let entry = self.new_decision(rule, StateKind::StarLoopEntry, span);
                let (body_start, body_end) = self.block(rule, alternatives, span)?;
                let loop_back = self.new_state(rule, StateKind::StarLoopBack, None);
                let end = self.new_state(rule, StateKind::LoopEnd, None);
                self.epsilon(entry, body_start);
                self.epsilon(entry, end);
                self.epsilon(body_end, loop_back);
                self.epsilon(loop_back, entry);
                Ok((entry, end))
            }
            ElementKind::Plus(alternatives) => {
                let (body_start, body_end) = self.block(rule, alternatives, span)?;
                let loop_back = self.new_decision(rule, StateKind::PlusLoopBack, span);
                let end = self.new_state(rule, StateKind::LoopEnd, None);
                self.epsilon(body_end, loop_back);
                self.epsilon(loop_back, body_start);
                self.epsilon(loop_back, end);
                Ok((body_start, end))
            }
        }
    }

    fn consuming(
        &mut self,
        rule: RuleIndex,
        span: Option<TextRange>,
        make: impl FnOnce(StateId) -> Transition,
    ) -> (StateId, StateId) {
        let left = self.new_state(rule, StateKind::Basic, span);
        let right = self.new_state(rule, StateKind::Basic, None);
        let transition = make(right);
        self.edge(left, transition);
        (left, right)
    }
}

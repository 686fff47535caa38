//! # Grammar Fixtures
//!
//! Small grammars with known ambiguities, built with [`GrammarBuilder`], and
//! token streams that exercise them. Every element carries the source range
//! of the grammar text shown on its constructor.
//!
//! The fixture grammars are known to be valid; a constructor panics only if
//! the builder rejects one, which is a defect in this module.

use crate::atn::{Alternative, Element, GrammarBuilder, GrammarModel, TokenType};
use crate::text::{TextRange, TextSize};
use crate::token::TokenStream;

/// Source of [`expr_grammar`]
pub const EXPR_SOURCE: &str = "expr : expr OP expr | ATOM ;";

/// Source of [`dangling_else_grammar`]
pub const DANGLING_ELSE_SOURCE: &str =
    "stat : IF expr THEN stat (ELSE stat)? | OTHER ;\nexpr : C ;";

/// Range of the `nth` occurrence of `needle` in `source`
#[must_use]
pub fn span_of(source: &str, needle: &str, nth: usize) -> Option<TextRange> {
    let (start, _) = source.match_indices(needle).nth(nth)?;
    let start = u32::try_from(start).ok()?;
    let len = u32::try_from(needle.len()).ok()?;
    Some(TextRange::at(TextSize::from(start), TextSize::from(len)))
}

fn located(element: Element, source: &str, needle: &str, nth: usize) -> Element {
    match span_of(source, needle, nth) {
        Some(span) => element.at(span),
        None => element,
    }
}

fn whole(source: &str) -> TextRange {
    let len = u32::try_from(source.len()).unwrap_or(u32::MAX);
    TextRange::at(TextSize::zero(), TextSize::from(len))
}

fn source_len(source: &str) -> u32 {
    u32::try_from(source.len()).unwrap_or(u32::MAX)
}

fn tokens(grammar: &GrammarModel, names: &[&str]) -> TokenStream {
    let types: Vec<TokenType> = names
        .iter()
        .filter_map(|name| grammar.vocabulary().token_type(name))
        .collect();
    TokenStream::from_types(&types, grammar.vocabulary())
}

/// `expr : expr OP expr | ATOM ;`
///
/// Ambiguous for three or more operands: both associativities parse.
#[must_use]
pub fn expr_grammar() -> GrammarModel {
    let src = EXPR_SOURCE;
    let mut builder = GrammarBuilder::new();
    let atom = builder.token("ATOM");
    let op = builder.token("OP");
    let expr = builder.declare_rule("expr");
    let binary = Alternative::new([
        located(Element::rule(expr), src, "expr", 1),
        located(Element::token(op), src, "OP", 0),
        located(Element::rule(expr), src, "expr", 2),
    ]);
    let binary = match span_of(src, "expr OP expr", 0) {
        Some(span) => binary.at(span),
        None => binary,
    };
    builder.define_at(
        expr,
        vec![
            binary,
            Alternative::new([located(Element::token(atom), src, "ATOM", 0)]),
        ],
        whole(src),
    );
    builder.source_len(source_len(src));
    build(builder)
}

/// `ATOM (OP ATOM)*` with `operands` atoms
#[must_use]
pub fn expr_tokens(grammar: &GrammarModel, operands: usize) -> TokenStream {
    let mut names = Vec::with_capacity(operands * 2);
    for i in 0..operands {
        if i > 0 {
            names.push("OP");
        }
        names.push("ATOM");
    }
    tokens(grammar, &names)
}

/// ```text
/// stat : IF expr THEN stat (ELSE stat)? | OTHER ;
/// expr : C ;
/// ```
#[must_use]
pub fn dangling_else_grammar() -> GrammarModel {
    let src = DANGLING_ELSE_SOURCE;
    let mut builder = GrammarBuilder::new();
    let if_tok = builder.literal_token("IF", "'if'");
    let then_tok = builder.literal_token("THEN", "'then'");
    let else_tok = builder.literal_token("ELSE", "'else'");
    let other = builder.token("OTHER");
    let cond = builder.token("C");
    let stat = builder.declare_rule("stat");
    let expr = builder.declare_rule("expr");

    let else_part = Alternative::new([
        located(Element::token(else_tok), src, "ELSE", 0),
        located(Element::rule(stat), src, "stat", 2),
    ]);
    let optional = Element::optional(vec![else_part]);
    let optional = match span_of(src, "(ELSE stat)?", 0) {
        Some(span) => optional.at(span),
        None => optional,
    };
    builder.define_at(
        stat,
        vec![
            Alternative::new([
                located(Element::token(if_tok), src, "IF", 0),
                located(Element::rule(expr), src, "expr", 0),
                located(Element::token(then_tok), src, "THEN", 0),
                located(Element::rule(stat), src, "stat", 1),
                optional,
            ]),
            Alternative::new([located(Element::token(other), src, "OTHER", 0)]),
        ],
        span_of(src, "stat : IF expr THEN stat (ELSE stat)? | OTHER ;", 0).unwrap_or_else(|| whole(src)),
    );
    builder.define(
        expr,
        vec![Alternative::new([located(Element::token(cond), src, "C", 0)])],
    );
    builder.source_len(source_len(src));
    build(builder)
}

/// `if c then if c then other else other`; the `else` is token 7
#[must_use]
pub fn dangling_else_tokens(grammar: &GrammarModel) -> TokenStream {
    tokens(
        grammar,
        &["IF", "C", "THEN", "IF", "C", "THEN", "OTHER", "ELSE", "OTHER"],
    )
}

/// ```text
/// a : b X | Y ;
/// b : a Z | W ;
/// ```
#[must_use]
pub fn indirect_left_recursive_grammar() -> GrammarModel {
    let mut builder = GrammarBuilder::new();
    let x = builder.token("X");
    let y = builder.token("Y");
    let z = builder.token("Z");
    let w = builder.token("W");
    let a = builder.declare_rule("a");
    let b = builder.declare_rule("b");
    builder.define(
        a,
        vec![
            Alternative::new([Element::rule(b), Element::token(x)]),
            Alternative::new([Element::token(y)]),
        ],
    );
    builder.define(
        b,
        vec![
            Alternative::new([Element::rule(a), Element::token(z)]),
            Alternative::new([Element::token(w)]),
        ],
    );
    build(builder)
}

/// `W X Z X`, parsed as `a(b(a(b(W) X) Z) X)`
#[must_use]
pub fn indirect_tokens(grammar: &GrammarModel) -> TokenStream {
    tokens(grammar, &["W", "X", "Z", "X"])
}

/// ```text
/// s : x* END ;
/// x : A? ;
/// ```
#[must_use]
pub fn nullable_loop_grammar() -> GrammarModel {
    let mut builder = GrammarBuilder::new();
    let a_tok = builder.token("A");
    let end = builder.token("END");
    let s = builder.declare_rule("s");
    let x = builder.declare_rule("x");
    builder.define(
        s,
        vec![Alternative::new([
            Element::star(vec![Alternative::new([Element::rule(x)])]),
            Element::token(end),
        ])],
    );
    builder.define(
        x,
        vec![Alternative::new([Element::optional(vec![Alternative::new([
            Element::token(a_tok),
        ])])])],
    );
    build(builder)
}

/// `A A END`
#[must_use]
pub fn nullable_loop_tokens(grammar: &GrammarModel) -> TokenStream {
    tokens(grammar, &["A", "A", "END"])
}

/// ```text
/// decl : {isType}? ID ID | ID ID ;
/// ```
#[must_use]
pub fn predicate_grammar() -> GrammarModel {
    let mut builder = GrammarBuilder::new();
    let id = builder.token("ID");
    let decl = builder.declare_rule("decl");
    builder.define(
        decl,
        vec![
            Alternative::new([
                Element::predicate("isType"),
                Element::token(id),
                Element::token(id),
            ]),
            Alternative::new([Element::token(id), Element::token(id)]),
        ],
    );
    build(builder)
}

/// `ID ID`
#[must_use]
pub fn predicate_tokens(grammar: &GrammarModel) -> TokenStream {
    tokens(grammar, &["ID", "ID"])
}

fn build(builder: GrammarBuilder) -> GrammarModel {
    match builder.build() {
        Ok(grammar) => grammar,
        Err(err) => panic!("fixture grammar is invalid: {err}"),
    }
}

//! Token streams handed to the interpreter.

use crate::atn::{TokenType, Vocabulary};
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A lexed token of the text being analysed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Token {
    pub token_type: TokenType,
    pub text: CompactString,
}

impl Token {
    #[must_use]
    pub fn new(token_type: TokenType, text: &str) -> Self {
        Self {
            token_type,
            text: text.into(),
        }
    }
}

/// Ordered tokens of one input, without a trailing EOF token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    #[must_use]
    pub const fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Tokens whose text is their vocabulary display name
    #[must_use]
    pub fn from_types(types: &[TokenType], vocabulary: &Vocabulary) -> Self {
        Self::new(
            types
                .iter()
                .map(|&t| Token::new(t, &vocabulary.display_name(t)))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Type of the token at `index`, if any
    #[must_use]
    pub fn token_type(&self, index: usize) -> Option<TokenType> {
        self.tokens.get(index).map(|t| t.token_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

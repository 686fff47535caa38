use crate::atn::{EOF, EPSILON, HIT_PRED, TokenType};
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Token type → name table.
///
/// Token types start at [`MIN_USER_TOKEN_TYPE`](crate::atn::MIN_USER_TOKEN_TYPE);
/// index 0 is reserved. Each type may carry a symbolic name (`ID`) and a
/// literal name (`'+'`).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Vocabulary {
    symbolic: Vec<Option<CompactString>>,
    literal: Vec<Option<CompactString>>,
}

impl Vocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbolic: vec![None],
            literal: vec![None],
        }
    }

    /// Register the next token type and return it
    pub fn push(&mut self, symbolic: Option<&str>, literal: Option<&str>) -> TokenType {
        if self.symbolic.is_empty() {
            self.symbolic.push(None);
            self.literal.push(None);
        }
        self.symbolic.push(symbolic.map(CompactString::from));
        self.literal.push(literal.map(CompactString::from));
        self.max_token_type()
    }

    /// Highest registered token type
    #[must_use]
    pub fn max_token_type(&self) -> TokenType {
        TokenType::try_from(self.symbolic.len().saturating_sub(1)).unwrap_or(TokenType::MAX)
    }

    #[must_use]
    pub fn symbolic_name(&self, token: TokenType) -> Option<&str> {
        let index = usize::try_from(token).ok()?;
        self.symbolic.get(index)?.as_deref()
    }

    #[must_use]
    pub fn literal_name(&self, token: TokenType) -> Option<&str> {
        let index = usize::try_from(token).ok()?;
        self.literal.get(index)?.as_deref()
    }

    /// Symbolic name when known, literal name otherwise, the number as a last resort.
    #[must_use]
    pub fn display_name(&self, token: TokenType) -> String {
        match token {
            EOF => "EOF".to_string(),
            EPSILON => "<EPSILON>".to_string(),
            HIT_PRED => "<PRED>".to_string(),
            _ => self
                .symbolic_name(token)
                .or_else(|| self.literal_name(token))
                .map_or_else(|| token.to_string(), str::to_string),
        }
    }

    /// Look up a token type by its symbolic or literal name
    #[must_use]
    pub fn token_type(&self, name: &str) -> Option<TokenType> {
        let position = self
            .symbolic
            .iter()
            .position(|s| s.as_deref() == Some(name))
            .or_else(|| self.literal.iter().position(|s| s.as_deref() == Some(name)))?;
        TokenType::try_from(position).ok()
    }
}

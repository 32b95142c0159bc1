use std::fmt;

use serde::{Deserialize, Serialize};
use span::{Location, Span};

/// The five kinds of spans a template is split in to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Verbatim template text
    Literal,
    /// Code spliced in to the render procedure: `<% ... %>`
    Statement,
    /// Code whose value is rendered: `<%= ... %>` or `${ ... }`
    Expression,
    /// Compile time declaration: `<%@ ... %>`
    Directive,
    /// Discarded text: `<%-- ... --%>`
    Comment,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::Literal => "literal",
            TokenKind::Statement => "statement",
            TokenKind::Expression => "expression",
            TokenKind::Directive => "directive",
            TokenKind::Comment => "comment",
        };

        write!(f, "{name}")
    }
}

/// A classified span of template source
///
/// `text` is the content between the delimiters, trimmed for every kind but
/// [TokenKind::Literal]. `span` covers the raw source including delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: Location, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            line: location.line,
            column: location.column,
            offset: location.offset,
            span,
        }
    }

    /// Where the token starts in the source
    pub fn location(&self) -> Location {
        Location::new(self.line, self.column, self.offset)
    }

    /// The untrimmed source text of the token, delimiters included
    pub fn raw<'source>(&self, source: &'source str) -> &'source str {
        &source[self.span.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_exposes_its_location() {
        let token = Token::new(TokenKind::Statement, "x", Location::new(2, 3, 7), 7..14);

        assert_eq!(Location::new(2, 3, 7), token.location());
    }

    #[test]
    fn token_raw_text_includes_delimiters() {
        let source = "a<% x %>b";
        let token = Token::new(TokenKind::Statement, "x", Location::new(1, 2, 1), 1..8);

        assert_eq!("<% x %>", token.raw(source));
    }

    #[test]
    fn token_kind_display() {
        assert_eq!("directive", TokenKind::Directive.to_string());
    }
}

use errors::{BbError, ErrorS, SyntaxError};
use span::Location;
use token::{Token, TokenKind};

/// Sequences that open a block. Any of them ends a literal run.
const OPENERS: [&str; 2] = ["<%", "${"];

/// Delimiters and scanning rules for a non-literal token kind
struct Block {
    kind: TokenKind,
    open: &'static str,
    close: &'static str,
    quote_sensitive: bool,
    check_nesting: bool,
}

const DIRECTIVE: Block = Block {
    kind: TokenKind::Directive,
    open: "<%@",
    close: "%>",
    quote_sensitive: true,
    check_nesting: true,
};

const LEGACY_EXPRESSION: Block = Block {
    kind: TokenKind::Expression,
    open: "<%=",
    close: "%>",
    quote_sensitive: true,
    check_nesting: true,
};

const COMMENT: Block = Block {
    kind: TokenKind::Comment,
    open: "<%--",
    close: "--%>",
    quote_sensitive: false,
    check_nesting: false,
};

const STATEMENT: Block = Block {
    kind: TokenKind::Statement,
    open: "<%",
    close: "%>",
    quote_sensitive: true,
    check_nesting: true,
};

const MODERN_EXPRESSION: Block = Block {
    kind: TokenKind::Expression,
    open: "${",
    close: "}",
    quote_sensitive: true,
    check_nesting: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Double,
    Single,
}

/// Split a template in to [tokens](Token)
///
/// Fails on the first malformed block, no tokens are returned in that case.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ErrorS> {
    Tokenizer::new(source).collect()
}

/// Iterator over the tokens of a template
///
/// Yields at most one error, the iterator is exhausted after it.
pub struct Tokenizer<'source> {
    source: &'source str,
    bytes: &'source [u8],
    index: usize,
    line: usize,
    column: usize,
    failed: bool,
}

impl<'source> Tokenizer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            index: 0,
            line: 1,
            column: 1,
            failed: false,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column, self.index)
    }

    fn rest(&self) -> &'source [u8] {
        &self.bytes[self.index..]
    }

    fn at(&self, sequence: &str) -> bool {
        self.rest().starts_with(sequence.as_bytes())
    }

    fn at_opener(&self) -> Option<&'static str> {
        OPENERS.into_iter().find(|opener| self.at(opener))
    }

    /// Decide the kind of the next token from a fixed width lookahead
    fn block_at_cursor(&self) -> Option<&'static Block> {
        if self.at(DIRECTIVE.open) {
            Some(&DIRECTIVE)
        } else if self.at(LEGACY_EXPRESSION.open) {
            Some(&LEGACY_EXPRESSION)
        } else if self.at(COMMENT.open) {
            Some(&COMMENT)
        } else if self.at(STATEMENT.open) {
            Some(&STATEMENT)
        } else if self.at(MODERN_EXPRESSION.open) {
            Some(&MODERN_EXPRESSION)
        } else {
            None
        }
    }

    fn advance(&mut self) {
        let byte = self.bytes[self.index];

        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_utf8_continuation(byte) {
            self.column += 1;
        }

        self.index += 1;
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// True when the byte at the cursor follows an odd number of backslashes
    fn is_escaped(&self) -> bool {
        let backslashes = self.bytes[..self.index]
            .iter()
            .rev()
            .take_while(|byte| **byte == b'\\')
            .count();

        backslashes % 2 == 1
    }

    /// True when the `'` at the cursor starts a lifetime or label, e.g. `'static`
    fn is_lifetime(&self) -> bool {
        let rest = &self.rest()[1..];

        match rest.first() {
            Some(first) if first.is_ascii_alphabetic() || *first == b'_' => {
                let ident_len = rest
                    .iter()
                    .take_while(|byte| byte.is_ascii_alphanumeric() || **byte == b'_')
                    .count();

                rest.get(ident_len) != Some(&b'\'')
            }
            _ => false,
        }
    }

    fn scan_literal(&mut self) -> Token {
        let start = self.location();

        while self.index < self.bytes.len() && self.at_opener().is_none() {
            self.advance();
        }

        let text = &self.source[start.offset..self.index];

        Token::new(TokenKind::Literal, text, start, start.offset..self.index)
    }

    fn scan_block(&mut self, block: &Block) -> Result<Token, ErrorS> {
        let start = self.location();

        self.advance_by(block.open.len());

        let content_start = self.index;
        let mut quote = Quote::None;

        while self.index < self.bytes.len() {
            let byte = self.bytes[self.index];

            if block.quote_sensitive && (byte == b'"' || byte == b'\'') && !self.is_escaped() {
                quote = match (quote, byte) {
                    (Quote::None, b'"') => Quote::Double,
                    (Quote::None, b'\'') if !self.is_lifetime() => Quote::Single,
                    (Quote::Double, b'"') | (Quote::Single, b'\'') => Quote::None,
                    (current, _) => current,
                };
            } else if quote == Quote::None {
                if self.at(block.close) {
                    let content = &self.source[content_start..self.index];

                    self.advance_by(block.close.len());

                    return Ok(Token::new(
                        block.kind,
                        content.trim(),
                        start,
                        start.offset..self.index,
                    ));
                }

                if block.check_nesting {
                    if let Some(opener) = self.at_opener() {
                        return Err(located(
                            SyntaxError::IllegalNesting {
                                block: block.kind,
                                opener: opener.to_string(),
                            },
                            self.location(),
                        ));
                    }
                }
            }

            self.advance();
        }

        Err(located(
            SyntaxError::UnterminatedBlock {
                block: block.kind,
                terminator: block.close.to_string(),
            },
            start,
        ))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, ErrorS>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.bytes.len() {
            return None;
        }

        let result = match self.block_at_cursor() {
            Some(block) => self.scan_block(block),
            None => Ok(self.scan_literal()),
        };

        self.failed = result.is_err();

        Some(result)
    }
}

fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

fn located(error: SyntaxError, location: Location) -> ErrorS {
    BbError::from(error).at(location)
}

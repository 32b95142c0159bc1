use serde::{Deserialize, Serialize};
use span::{Located, Location};
use thiserror::Error;
use token::TokenKind;

/// An error paired with where it happened in the template source
pub type ErrorS = Located<BbError>;

/// Common error for compiling templates
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum BbError {
    #[error("SyntaxError: {0}")]
    SyntaxError(SyntaxError),
    #[error("StructuralError: {0}")]
    StructuralError(StructuralError),
    #[error("TypeError: {0}")]
    TypeError(TypeError),
}

impl BbError {
    /// Name of the error kind, used as the diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            BbError::SyntaxError(_) => "SyntaxError",
            BbError::StructuralError(_) => "StructuralError",
            BbError::TypeError(_) => "TypeError",
        }
    }

    /// Pair the error with a location
    pub fn at(self, location: Location) -> ErrorS {
        (self, location)
    }
}

/// Malformed delimiter sequences
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum SyntaxError {
    #[error("Attempted to open `{opener}` inside of a {block}")]
    IllegalNesting { block: TokenKind, opener: String },
    #[error("The {block} is not closed, expected `{terminator}` before the end of the template")]
    UnterminatedBlock {
        block: TokenKind,
        terminator: String,
    },
}

/// Well tokenized templates whose structure doesn't make sense
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum StructuralError {
    #[error("Directive is malformed: {message}")]
    MalformedDirective { message: String },
    #[error("Unknown directive: {0}")]
    UnknownDirective(String),
    #[error("Directive '{0}' can only be declared once")]
    DuplicateDirective(String),
    #[error("Section declaration is malformed: {message}")]
    MalformedSection { message: String },
    #[error("Parameter list is malformed: {message}")]
    MalformedParams { message: String },
    #[error("Section '{0}' is already defined in this scope")]
    DuplicateSection(String),
    #[error("Section '{0}' is never closed, expected `<% end section %>`")]
    UnclosedSection(String),
    #[error("Found `end section` without an open section")]
    UnexpectedEndSection,
    #[error("Expression is empty, expected a value to render")]
    EmptyExpression,
    #[error("Undefined section reference: {0}")]
    UndefinedSection(String),
    #[error("Section '{section}' takes {expected} argument(s) but {found} were passed")]
    ArityMismatch {
        section: String,
        expected: usize,
        found: usize,
    },
}

/// Parameters and locals whose types could not be inferred
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum TypeError {
    #[error("The type of '{name}' is ambiguous, usage sites disagree: {}", types.join(", "))]
    AmbiguousType { name: String, types: Vec<String> },
    #[error("The type of '{name}' can not be inferred, declare it explicitly or use it at a call site")]
    UnresolvedType { name: String },
}

macro_rules! impl_from_error {
    ($($error:tt),+) => {$(
        impl From<$error> for BbError {
            fn from(e: $error) -> Self {
                BbError::$error(e)
            }
        }
    )+};
}

impl_from_error!(SyntaxError, StructuralError, TypeError);

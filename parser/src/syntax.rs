use std::collections::HashSet;
use std::sync::LazyLock;

use errors::{BbError, ErrorS, StructuralError};
use quote::ToTokens;
use regex::Regex;
use span::Location;

use crate::ast::{Param, ParamType};
use crate::scan::{split_arguments, split_params};

/// Item name every generated unit defines, can't be used for a section
pub const RESERVED_SECTION_NAME: &str = "Template";

static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^section(?:\s+(.*))?$").expect("valid section pattern"));

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*(?:\((.*)\))?$").expect("valid header pattern")
});

static SECTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^end\s+section$").expect("valid end pattern"));

static SECTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*(\.\s*render\s*)?\((.*)\)\s*;?$")
        .expect("valid call pattern")
});

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*(?::(.*))?$").expect("valid param pattern")
});

/// What a statement means to the template structure
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind<'a> {
    /// `section name(params)`
    SectionStart {
        name: &'a str,
        params: Option<&'a str>,
    },
    /// `end section`
    SectionEnd,
    /// Anything else, spliced in to the render procedure
    Code,
}

/// Classify the trimmed text of a statement
pub fn classify_statement(text: &str) -> Result<StatementKind<'_>, StructuralError> {
    if SECTION_END.is_match(text) {
        return Ok(StatementKind::SectionEnd);
    }

    let Some(start) = SECTION_START.captures(text) else {
        return Ok(StatementKind::Code);
    };

    let header = start.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    let captures = SECTION_HEADER
        .captures(header)
        .ok_or_else(|| StructuralError::MalformedSection {
            message: format!("expected `section name` or `section name(params)`, found `{text}`"),
        })?;

    let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    if !is_identifier(name) || name == RESERVED_SECTION_NAME {
        return Err(StructuralError::MalformedSection {
            message: format!("'{name}' can not be used as a section name"),
        });
    }

    Ok(StatementKind::SectionStart {
        name,
        params: captures.get(2).map(|m| m.as_str()),
    })
}

/// A statement or expression shaped like `name(args)` or `name.render(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallSyntax {
    pub name: String,
    /// Written with `.render`, always meant as a section call
    pub explicit: bool,
    pub args: Vec<String>,
}

/// Recognize call syntax, `None` if the code is anything else
pub fn parse_call(code: &str) -> Option<CallSyntax> {
    let captures = SECTION_CALL.captures(code)?;

    let args = split_arguments(captures.get(3)?.as_str())?;

    Some(CallSyntax {
        name: captures.get(1)?.as_str().to_string(),
        explicit: captures.get(2).is_some(),
        args,
    })
}

/// Parse `a, b: Type, ...` in to parameters
pub fn parse_params(text: &str, location: Location) -> Result<Vec<Param>, ErrorS> {
    let malformed = |message: String| -> ErrorS {
        BbError::from(StructuralError::MalformedParams { message }).at(location)
    };

    let parts = split_params(text)
        .ok_or_else(|| malformed(format!("unbalanced or empty parameter in `{text}`")))?;

    let mut seen = HashSet::new();
    let mut params = vec![];

    for part in parts {
        let captures = PARAM
            .captures(&part)
            .ok_or_else(|| malformed(format!("expected `name` or `name: Type`, found `{part}`")))?;

        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

        if !is_identifier(name) {
            return Err(malformed(format!("'{name}' can not be used as a parameter name")));
        }

        if !seen.insert(name.to_string()) {
            return Err(malformed(format!("parameter '{name}' is declared twice")));
        }

        let ty = match captures.get(2) {
            Some(ty) => ParamType::Declared(
                canonical_type(ty.as_str())
                    .ok_or_else(|| malformed(format!("`{}` is not a valid type", ty.as_str().trim())))?,
            ),
            None => ParamType::Unresolved,
        };

        params.push(Param {
            name: name.to_string(),
            ty,
            location,
        });
    }

    Ok(params)
}

/// True for Rust identifiers that aren't keywords
pub fn is_identifier(text: &str) -> bool {
    syn::parse_str::<syn::Ident>(text).is_ok()
}

/// Validate a Rust type and spell it with canonical spacing
///
/// `& 'a str` and `&'a str` both become `&'a str`, `Vec < i32 >` becomes
/// `Vec<i32>`.
pub fn canonical_type(text: &str) -> Option<String> {
    let ty: syn::Type = syn::parse_str(text.trim()).ok()?;

    Some(compact_tokens(&ty.to_token_stream().to_string()))
}

/// Drop the spaces a token stream puts between tokens, except between words
fn compact_tokens(tokens: &str) -> String {
    let chars: Vec<char> = tokens.chars().collect();
    let mut compact = String::with_capacity(tokens.len());

    for (i, c) in chars.iter().enumerate() {
        if *c != ' ' {
            compact.push(*c);
            continue;
        }

        let before = compact.chars().last().is_some_and(is_word_char);
        let after = chars.get(i + 1).copied().is_some_and(is_word_char);

        if before && after {
            compact.push(' ');
        }
    }

    compact
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

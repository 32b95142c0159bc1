use std::collections::BTreeMap;

use errors::{BbError, ErrorS, StructuralError};
use span::Location;

use crate::ast::{Directive, IMPORT_DIRECTIVE, NAME_DIRECTIVE, PARAMS_DIRECTIVE};

/// Directives that may appear more than once in a template
pub const REPEATABLE_DIRECTIVES: [&str; 1] = [IMPORT_DIRECTIVE];

/// Parse the trimmed text of a directive token
///
/// Forms:
///
/// - `name` with no attributes
/// - `name(a, b: T)`, stored as the `params` attribute
/// - `name key="value" other='value'`
/// - `name free text`, stored as the `value` attribute
pub fn parse_directive(text: &str, location: Location) -> Result<Directive, ErrorS> {
    let malformed = |message: String| -> ErrorS {
        BbError::from(StructuralError::MalformedDirective { message }).at(location)
    };

    let name_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(text.len());

    let (name, rest) = text.split_at(name_len);
    let rest = rest.trim();

    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(malformed(format!("expected a directive name, found `{text}`")));
    }

    let attributes = if rest.is_empty() {
        BTreeMap::new()
    } else if let Some(params) = rest.strip_prefix('(') {
        let params = params
            .strip_suffix(')')
            .ok_or_else(|| malformed(format!("parameter list of '{name}' is not closed")))?;

        BTreeMap::from([("params".to_string(), params.trim().to_string())])
    } else if starts_with_attribute(rest) {
        parse_attributes(rest).map_err(malformed)?
    } else {
        BTreeMap::from([("value".to_string(), rest.to_string())])
    };

    let directive = Directive {
        name: name.to_string(),
        attributes,
        location,
    };

    validate(&directive)?;

    Ok(directive)
}

fn validate(directive: &Directive) -> Result<(), ErrorS> {
    let required: &[&str] = match directive.name.as_str() {
        IMPORT_DIRECTIVE => &["path", "value"],
        PARAMS_DIRECTIVE => &["params"],
        NAME_DIRECTIVE => &["value"],
        _ => {
            return Err(BbError::from(StructuralError::UnknownDirective(
                directive.name.clone(),
            ))
            .at(directive.location))
        }
    };

    if required.iter().any(|key| directive.attribute(key).is_some()) {
        return Ok(());
    }

    Err(BbError::from(StructuralError::MalformedDirective {
        message: format!(
            "'{}' requires {}",
            directive.name,
            required
                .iter()
                .map(|key| format!("'{key}'"))
                .collect::<Vec<_>>()
                .join(" or ")
        ),
    })
    .at(directive.location))
}

/// `key="..."` or `key='...'` at the start of the text
fn starts_with_attribute(text: &str) -> bool {
    let key_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(text.len());

    key_len > 0
        && text[key_len..]
            .trim_start()
            .strip_prefix('=')
            .is_some_and(|value| value.trim_start().starts_with(['"', '\'']))
}

fn parse_attributes(text: &str) -> Result<BTreeMap<String, String>, String> {
    let mut attributes = BTreeMap::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.peek().is_none() {
            return Ok(attributes);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-') {
            key.push(c);
        }

        if key.is_empty() {
            return Err(format!("expected an attribute name in `{text}`"));
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.next() != Some('=') {
            return Err(format!("expected `=` after attribute '{key}'"));
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => return Err(format!("value of attribute '{key}' must be quoted")),
        };

        let mut value = String::new();

        loop {
            match chars.next() {
                Some('\\') => match chars.next() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(format!("value of attribute '{key}' is not closed")),
                },
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
                None => return Err(format!("value of attribute '{key}' is not closed")),
            }
        }

        if attributes.insert(key.clone(), value).is_some() {
            return Err(format!("attribute '{key}' is declared twice"));
        }
    }
}

use std::sync::LazyLock;

use regex::Regex;

static LET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^let\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*(.+?))?\s*(?:=\s*(.+))?$")
        .expect("valid let pattern")
});

static FOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^for\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)\s+in\s+(.*)$")
        .expect("valid for pattern")
});

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\(?\s*(.+?)\s*\.\.=?\s*(.+?)\s*\)?$").expect("valid range pattern")
});

static ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*=([^=].*)$").expect("valid assignment pattern")
});

/// Something a statement does to the locals in scope
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `let name: ty = init`, both parts optional
    Let {
        name: String,
        ty: Option<String>,
        init: Option<String>,
    },
    /// `for name in start..end {`, declared in the scope the loop opens
    For {
        name: String,
        bounds: Option<(String, String)>,
    },
    /// `name = value`
    Assign { name: String, value: String },
    OpenScope,
    CloseScope,
}

/// Scan a statement for local declarations, assignments and braces
///
/// Braces don't have to balance within one statement, a loop is usually
/// opened in one statement and closed in a later one.
pub fn scan(text: &str) -> Vec<Event> {
    let mut events = vec![];
    let mut segment = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                segment.push(c);
                while let Some(c) = chars.next() {
                    segment.push(c);
                    match c {
                        '\\' => segment.extend(chars.next()),
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                segment.push(c);
                skip_char_literal(&mut chars, &mut segment);
            }
            ';' => {
                events.extend(declaration(&segment));
                segment.clear();
            }
            '{' => {
                let pending = declaration(&segment);
                segment.clear();

                match pending {
                    Some(event @ Event::For { .. }) => {
                        events.push(Event::OpenScope);
                        events.push(event);
                    }
                    pending => {
                        events.extend(pending);
                        events.push(Event::OpenScope);
                    }
                }
            }
            '}' => {
                events.extend(declaration(&segment));
                segment.clear();
                events.push(Event::CloseScope);
            }
            _ => segment.push(c),
        }
    }

    events.extend(declaration(&segment));

    events
}

/// Copy a char literal, leave a lifetime or label in place
fn skip_char_literal(chars: &mut std::iter::Peekable<std::str::Chars>, segment: &mut String) {
    let mut lookahead = chars.clone();

    match (lookahead.next(), lookahead.next()) {
        (Some('\\'), _) => {
            while let Some(c) = chars.next() {
                segment.push(c);
                match c {
                    '\\' => segment.extend(chars.next()),
                    '\'' => break,
                    _ => {}
                }
            }
        }
        (Some(c), Some('\'')) => {
            segment.push(c);
            segment.push('\'');
            chars.next();
            chars.next();
        }
        _ => {}
    }
}

fn declaration(segment: &str) -> Option<Event> {
    let segment = segment.trim();

    if let Some(captures) = LET.captures(segment) {
        return Some(Event::Let {
            name: captures[1].to_string(),
            ty: captures.get(2).map(|ty| ty.as_str().trim().to_string()),
            init: captures.get(3).map(|init| init.as_str().trim().to_string()),
        });
    }

    if let Some(captures) = FOR.captures(segment) {
        let bounds = RANGE
            .captures(captures[2].trim())
            .map(|range| (range[1].to_string(), range[2].to_string()));

        return Some(Event::For {
            name: captures[1].to_string(),
            bounds,
        });
    }

    ASSIGN.captures(segment).map(|captures| Event::Assign {
        name: captures[1].to_string(),
        value: captures[2].trim().to_string(),
    })
}

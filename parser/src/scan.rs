/// Split call arguments on top level commas
///
/// Commas inside brackets, turbofish generics, string literals and char
/// literals don't split.
/// Returns `None` when brackets are unbalanced, a literal is unterminated or
/// an argument is empty. A single trailing comma is allowed.
pub fn split_arguments(text: &str) -> Option<Vec<String>> {
    split_top_level(text, false)
}

/// Split a parameter list on top level commas
///
/// Like [split_arguments] but angle brackets nest (`HashMap<K, V>`) and quotes
/// are not literals (`&'a str`).
pub fn split_params(text: &str) -> Option<Vec<String>> {
    split_top_level(text, true)
}

fn split_top_level(text: &str, in_types: bool) -> Option<Vec<String>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut parts = vec![];
    let mut closers = vec![];
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        let in_generics = in_types || closers.last() == Some(&'>');

        match c {
            '"' if !in_types => {
                i = skip_string(&chars, i)?;
                continue;
            }
            '\'' if !in_types => {
                if let Some(end) = skip_char_literal(&chars, i) {
                    i = end;
                    continue;
                }
            }
            // turbofish, angle brackets nest until its `>`
            ':' if !in_types && text[position..].starts_with("::<") => {
                closers.push('>');
                i += 3;
                continue;
            }
            '(' => closers.push(')'),
            '[' => closers.push(']'),
            '{' => closers.push('}'),
            '<' if in_generics => closers.push('>'),
            '>' if in_generics && i > 0 && chars[i - 1].1 == '-' => {}
            ')' | ']' | '}' | '>' if c != '>' || in_generics => {
                if closers.pop() != Some(c) {
                    return None;
                }
            }
            ',' if closers.is_empty() => {
                parts.push(text[start..position].trim().to_string());
                start = position + 1;
            }
            _ => {}
        }

        i += 1;
    }

    if !closers.is_empty() {
        return None;
    }

    let last = text[start..].trim().to_string();

    if parts.is_empty() && last.is_empty() {
        return Some(parts);
    }

    if !last.is_empty() {
        parts.push(last);
    }

    if parts.iter().any(String::is_empty) {
        return None;
    }

    Some(parts)
}

/// Index just past the string literal opening at `start`
fn skip_string(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 2,
            '"' => return Some(i + 1),
            _ => i += 1,
        }
    }

    None
}

/// Index just past the char literal opening at `start`, `None` for lifetimes
fn skip_char_literal(chars: &[(usize, char)], start: usize) -> Option<usize> {
    match chars.get(start + 1).map(|(_, c)| *c) {
        Some('\\') => (start + 3..chars.len())
            .find(|i| chars[*i].1 == '\'')
            .map(|i| i + 1),
        Some(_) if chars.get(start + 2).map(|(_, c)| *c) == Some('\'') => Some(start + 3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    macro_rules! split_test {
        ($test_name:ident, $split:ident, $text:expr, $parts:expr) => {
            #[test]
            fn $test_name() {
                let exp: Option<Vec<&str>> = $parts;
                let got = $split($text);
                assert_eq!(
                    exp.map(|parts| parts.into_iter().map(String::from).collect::<Vec<_>>()),
                    got
                );
            }
        };
    }

    split_test!(split_empty, split_arguments, "  ", Some(vec![]));

    split_test!(
        split_simple_arguments,
        split_arguments,
        r#""Edward", 19"#,
        Some(vec![r#""Edward""#, "19"])
    );

    split_test!(
        split_keeps_nested_commas,
        split_arguments,
        "f(a, b), [1, 2], { x }",
        Some(vec!["f(a, b)", "[1, 2]", "{ x }"])
    );

    split_test!(
        split_ignores_commas_in_literals,
        split_arguments,
        r#""a, b", ',', "\", )""#,
        Some(vec![r#""a, b""#, "','", r#""\", )""#])
    );

    split_test!(
        split_allows_trailing_comma,
        split_arguments,
        "a, b,",
        Some(vec!["a", "b"])
    );

    split_test!(split_rejects_empty_argument, split_arguments, "a,,b", None);

    split_test!(split_rejects_unbalanced, split_arguments, "a) + g(b", None);

    split_test!(
        split_arguments_comparisons,
        split_arguments,
        "a < b, c",
        Some(vec!["a < b", "c"])
    );

    split_test!(
        split_arguments_with_turbofish,
        split_arguments,
        "HashMap::<i32, i32>::new(), x",
        Some(vec!["HashMap::<i32, i32>::new()", "x"])
    );

    split_test!(
        split_arguments_with_nested_turbofish,
        split_arguments,
        "f::<Vec<u8>, fn() -> u8>(a, b), c < d, e > f",
        Some(vec!["f::<Vec<u8>, fn() -> u8>(a, b)", "c < d", "e > f"])
    );

    split_test!(split_rejects_unclosed_turbofish, split_arguments, "f::<u8(a)", None);

    split_test!(
        split_params_with_generics,
        split_params,
        "map: HashMap<String, i32>, name: &'a str",
        Some(vec!["map: HashMap<String, i32>", "name: &'a str"])
    );

    split_test!(
        split_params_with_fn_types,
        split_params,
        "f: fn(i32) -> i32, x",
        Some(vec!["f: fn(i32) -> i32", "x"])
    );
}

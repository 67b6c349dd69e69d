//! Splitting of comma-separated SQL expression lists
//!
//! Users pass lists like `price * qty AS total, IIF(a > 0, 'y', 'n')` as a
//! single argument. These helpers cut such lists at top-level commas and
//! peel off trailing `AS alias` clauses.

use regex::Regex;
use std::sync::OnceLock;

/// Split an expression list on commas outside parentheses and quotes
///
/// Segments are trimmed. Quote tracking is a plain toggle: the quote
/// character that opened a span is the only one that closes it, and there
/// is no escape handling. A trailing comma produces no empty tail, while a
/// leading comma keeps its empty head segment.
///
/// ```
/// use tabplot::parser::split_expressions;
///
/// assert_eq!(split_expressions("a, max(b, c)"), vec!["a", "max(b, c)"]);
/// assert_eq!(split_expressions(",a"), vec!["", "a"]);
/// assert_eq!(split_expressions("a,"), vec!["a"]);
/// ```
pub fn split_expressions(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth -= 1;
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }
    parts
}

fn alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+as\s+").expect("Invalid alias regex"))
}

fn strip_matching_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || first == '\'') => {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

/// Split `expr AS alias` at the last standalone `AS`
///
/// The alias loses one pair of surrounding quotes when it has them. Without
/// an `AS` the trimmed expression comes back with no alias.
pub fn parse_field_with_alias(field: &str) -> (String, Option<String>) {
    let field = field.trim();
    let Some(last) = alias_regex().find_iter(field).last() else {
        return (field.to_string(), None);
    };

    let expr = field[..last.start()].trim();
    let alias = strip_matching_quotes(field[last.end()..].trim());
    if alias.is_empty() {
        return (field.to_string(), None);
    }
    (expr.to_string(), Some(alias.to_string()))
}

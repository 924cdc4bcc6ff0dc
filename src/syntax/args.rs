//! Helpers for the raw argument text of directives: identifiers, shell-like
//! splitting, integers and quoted-string escapes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{err_msg, PreprocError};

static LEADING_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([_a-zA-Z][_a-zA-Z0-9]*)").expect("valid identifier regex"));

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-? *[0-9]+(?:[_0-9]*[0-9])?$").expect("valid integer regex"));

/// Splits a leading identifier off `text`.
///
/// Returns the identifier, the rest of the text and the offset of the rest
/// in `text`, or `None` when `text` does not start with an identifier.
pub fn split_identifier(text: &str) -> Option<(&str, &str, usize)> {
    let captures = LEADING_IDENTIFIER.captures(text)?;
    let ident = captures.get(1)?;
    Some((ident.as_str(), &text[ident.end()..], ident.end()))
}

pub fn is_identifier(text: &str) -> bool {
    matches!(split_identifier(text), Some((ident, "", _)) if ident.len() == text.len())
}

/// Parses an integer such as `12`, `-3`, `1_000` or `- 4`.
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if !INTEGER.is_match(text) {
        return None;
    }
    text.replace([' ', '_'], "").parse().ok()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True when the text at `at` can hold a whole word: nothing before it is a
/// letter or `_` (a digit may precede it, so `2c` holds the word `c`), and
/// nothing after `len` bytes is a letter, digit or `_`.
pub fn is_whole_word(text: &str, at: usize, len: usize) -> bool {
    let before = text[..at].chars().next_back();
    let after = text[at + len..].chars().next();
    before.map_or(true, |c| !(c.is_ascii_alphabetic() || c == '_'))
        && after.map_or(true, |c| !is_word_char(c))
}

/// Length of the run of word characters starting at `at`.
pub fn word_len(text: &str, at: usize) -> usize {
    text[at..]
        .find(|c: char| !is_word_char(c))
        .unwrap_or(text.len() - at)
}

/// Replaces escape sequences by the characters they stand for. Unknown
/// sequences are kept as written.
pub fn process_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits `text` on whitespace like a command line.
///
/// `"..."` groups words (escapes inside are processed), `\ ` and `\"` outside
/// quotes stand for a literal space and quote.
pub fn split_args(text: &str) -> Result<Vec<String>, PreprocError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(' ') => current.push(' '),
                    Some('"') => current.push('"'),
                    Some(other) => {
                        current.push('\\');
                        current.push(other);
                    }
                    None => current.push('\\'),
                }
            }
            '"' => {
                in_word = true;
                let mut quoted = String::new();
                let mut closed = false;
                while let Some(q) = chars.next() {
                    match q {
                        '\\' => {
                            quoted.push('\\');
                            if let Some(escaped) = chars.next() {
                                quoted.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => quoted.push(q),
                    }
                }
                if !closed {
                    return Err(err_msg!(Syntax, "unterminated string \"... in arguments"));
                }
                current.push_str(&process_string(&quoted));
            }
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

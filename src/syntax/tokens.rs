//! Token scanner: locates begin/end delimiter occurrences in a string.
//!
//! Delimiters are literal strings. An occurrence immediately preceded by the
//! escape marker is not a token; the interpreter strips those markers from its
//! output once the surrounding text is final.

use std::iter::Peekable;

use regex::{Matches, Regex};

use crate::err_msg;
use crate::PreprocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Open,
    Close,
}

/// A located delimiter occurrence. `start..end` is the delimiter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_open(&self) -> bool {
        self.kind == TokenKind::Open
    }

    pub fn is_close(&self) -> bool {
        self.kind == TokenKind::Close
    }
}

/// The configured delimiter pair and escape marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub begin: String,
    pub end: String,
    /// Empty disables escaping.
    pub escape: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            begin: "{% ".to_string(),
            end: " %}".to_string(),
            escape: "\\".to_string(),
        }
    }
}

/// Compiled scanner for one delimiter configuration.
#[derive(Debug, Clone)]
pub struct Scanner {
    delimiters: Delimiters,
    begin_re: Regex,
    end_re: Regex,
}

impl Scanner {
    pub fn new(delimiters: Delimiters) -> Result<Self, PreprocError> {
        if delimiters.begin.is_empty() || delimiters.end.is_empty() {
            return Err(err_msg!(Config, "delimiters must not be empty"));
        }
        let compile = |literal: &str| {
            Regex::new(&regex::escape(literal))
                .map_err(|e| err_msg!(Config, "invalid delimiter {:?}: {}", literal, e))
        };
        Ok(Self {
            begin_re: compile(&delimiters.begin)?,
            end_re: compile(&delimiters.end)?,
            delimiters,
        })
    }

    pub fn begin(&self) -> &str {
        &self.delimiters.begin
    }

    pub fn end(&self) -> &str {
        &self.delimiters.end
    }

    pub fn escape(&self) -> &str {
        &self.delimiters.escape
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Lazily yields every non-escaped token of `text` in offset order. On a
    /// tie the close token comes first.
    pub fn tokens<'s, 't>(&'s self, text: &'t str) -> Tokens<'s, 't> {
        Tokens {
            text,
            escape: &self.delimiters.escape,
            opens: self.begin_re.find_iter(text).peekable(),
            closes: self.end_re.find_iter(text).peekable(),
        }
    }

    /// Offsets of escape markers that suppress a delimiter in `text`.
    pub fn escapes(&self, text: &str) -> Vec<usize> {
        let escape = self.delimiters.escape.as_str();
        if escape.is_empty() {
            return Vec::new();
        }
        let mut found: Vec<usize> = self
            .begin_re
            .find_iter(text)
            .chain(self.end_re.find_iter(text))
            .filter(|m| text[..m.start()].ends_with(escape))
            .map(|m| m.start() - escape.len())
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Iterator returned by [`Scanner::tokens`].
pub struct Tokens<'s, 't> {
    text: &'t str,
    escape: &'s str,
    opens: Peekable<Matches<'s, 't>>,
    closes: Peekable<Matches<'s, 't>>,
}

impl Tokens<'_, '_> {
    fn escaped(&self, start: usize) -> bool {
        !self.escape.is_empty() && self.text[..start].ends_with(self.escape)
    }
}

impl Iterator for Tokens<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let take_open = match (self.opens.peek(), self.closes.peek()) {
                (None, None) => return None,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(open), Some(close)) => open.start() < close.start(),
            };
            let (found, kind) = if take_open {
                (self.opens.next()?, TokenKind::Open)
            } else {
                (self.closes.next()?, TokenKind::Close)
            };
            if self.escaped(found.start()) {
                continue;
            }
            return Some(Token {
                start: found.start(),
                end: found.end(),
                kind,
            });
        }
    }
}

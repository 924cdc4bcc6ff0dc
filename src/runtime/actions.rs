//! Final actions: transformations queued by a command and applied to the
//! whole output of the nesting level the command ran in, once that level is
//! fully expanded.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};

use crate::syntax::args::is_whole_word;
use crate::{err_msg, PreprocError};

static EMPTY_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static LEADING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*").expect("valid regex"));
static TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]*$").expect("valid regex"));

#[derive(Debug, Clone)]
pub enum FinalAction {
    StripEmptyLines,
    StripLeadingWhitespace,
    StripTrailingWhitespace,
    FixLastLine,
    FixFirstLine,
    Replace(Replacement),
    Upper,
    Lower,
    Capitalize,
}

impl FinalAction {
    pub fn apply(&self, text: &str) -> String {
        match self {
            FinalAction::StripEmptyLines => EMPTY_LINES.replace_all(text, "\n").into_owned(),
            FinalAction::StripLeadingWhitespace => LEADING_WS.replace_all(text, "").into_owned(),
            FinalAction::StripTrailingWhitespace => TRAILING_WS.replace_all(text, "").into_owned(),
            FinalAction::FixLastLine => fix_last_line(text),
            FinalAction::FixFirstLine => fix_first_line(text).to_string(),
            FinalAction::Replace(replacement) => replacement.apply(text),
            FinalAction::Upper => text.to_uppercase(),
            FinalAction::Lower => text.to_lowercase(),
            FinalAction::Capitalize => capitalize(text),
        }
    }
}

/// A compiled `replace` command.
#[derive(Debug, Clone)]
pub struct Replacement {
    regex: Regex,
    replacement: String,
    /// `0` replaces every match.
    count: usize,
    mode: ReplaceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplaceMode {
    Literal,
    /// Literal, and only where the match is a whole word.
    WholeWord,
    /// The replacement expands `$1`, `${name}` and `\1` group references.
    Regex,
}

static BACKREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([0-9]+)").expect("valid regex"));

impl Replacement {
    pub fn new(
        pattern: &str,
        replacement: &str,
        regex: bool,
        ignore_case: bool,
        whole_word: bool,
        count: usize,
    ) -> Result<Self, PreprocError> {
        let mode = match (regex, whole_word) {
            (true, true) => {
                return Err(err_msg!(Argument, "incompatible arguments: --regex and --whole-word"))
            }
            (true, false) => ReplaceMode::Regex,
            (false, true) => ReplaceMode::WholeWord,
            (false, false) => ReplaceMode::Literal,
        };
        let source = if regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let compiled = RegexBuilder::new(&source)
            .multi_line(true)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| err_msg!(Argument, "replace regex error: {}", e))?;
        let replacement = if regex {
            BACKREF.replace_all(replacement, "$${${1}}").into_owned()
        } else {
            replacement.to_string()
        };
        Ok(Self {
            regex: compiled,
            replacement,
            count,
            mode,
        })
    }

    pub fn apply(&self, text: &str) -> String {
        match self.mode {
            ReplaceMode::Literal => self
                .regex
                .replacen(text, self.count, NoExpand(&self.replacement))
                .into_owned(),
            ReplaceMode::Regex => self
                .regex
                .replacen(text, self.count, self.replacement.as_str())
                .into_owned(),
            ReplaceMode::WholeWord => self.replace_words(text),
        }
    }

    /// Matches may not overlap, but a rejected match is retried one
    /// character later.
    fn replace_words(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut from = 0;
        let mut replaced = 0;
        while self.count == 0 || replaced < self.count {
            let Some(found) = self.regex.find_at(text, from) else {
                break;
            };
            if found.is_empty() || !is_whole_word(text, found.start(), found.len()) {
                match text[found.start()..].chars().next() {
                    Some(c) => from = found.start() + c.len_utf8(),
                    None => break,
                }
                continue;
            }
            out.push_str(&text[copied..found.start()]);
            out.push_str(&self.replacement);
            copied = found.end();
            from = found.end();
            replaced += 1;
        }
        out.push_str(&text[copied..]);
        out
    }
}

fn fix_last_line(text: &str) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        return format!("{text}\n");
    }
    let trimmed = text.trim_end_matches('\n');
    if trimmed.len() == text.len() {
        text.to_string()
    } else {
        format!("{trimmed}\n")
    }
}

fn fix_first_line(mut text: &str) -> &str {
    while !text.is_empty() {
        match text.find('\n') {
            None => {
                return if text.chars().all(char::is_whitespace) {
                    ""
                } else {
                    text
                };
            }
            Some(pos) if text[..pos].chars().all(char::is_whitespace) => text = &text[pos + 1..],
            Some(_) => break,
        }
    }
    text
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

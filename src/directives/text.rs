//! # Text Transformations
//!
//! Commands that queue a [`FinalAction`] on the nesting level they run in.
//! The action runs on that level's whole output once it is expanded, so a
//! `block` limits it to the block's body. `replace`, `upper`, `lower` and
//! `capitalize` apply immediately when given a text.

use clap::Parser;

use crate::directives::{no_args, parse_flags};
use crate::runtime::actions::{FinalAction, Replacement};
use crate::runtime::registry::{CommandFn, DirectiveRegistry};

// ============================================================================
// WHITESPACE
// ============================================================================

/// Usage: strip_empty_lines
pub const CMD_STRIP_EMPTY_LINES: CommandFn = |pre, args| {
    no_args(pre, "strip_empty_lines", args)?;
    pre.queue_final_action(FinalAction::StripEmptyLines);
    Ok(String::new())
};

/// Usage: strip_leading_whitespace
pub const CMD_STRIP_LEADING_WHITESPACE: CommandFn = |pre, args| {
    no_args(pre, "strip_leading_whitespace", args)?;
    pre.queue_final_action(FinalAction::StripLeadingWhitespace);
    Ok(String::new())
};

/// Usage: strip_trailing_whitespace
pub const CMD_STRIP_TRAILING_WHITESPACE: CommandFn = |pre, args| {
    no_args(pre, "strip_trailing_whitespace", args)?;
    pre.queue_final_action(FinalAction::StripTrailingWhitespace);
    Ok(String::new())
};

/// Makes a non-empty output end with exactly one newline.
///
/// Usage: fix_last_line
pub const CMD_FIX_LAST_LINE: CommandFn = |pre, args| {
    no_args(pre, "fix_last_line", args)?;
    pre.queue_final_action(FinalAction::FixLastLine);
    Ok(String::new())
};

/// Drops the blank lines at the start of the output.
///
/// Usage: fix_first_line
pub const CMD_FIX_FIRST_LINE: CommandFn = |pre, args| {
    no_args(pre, "fix_first_line", args)?;
    pre.queue_final_action(FinalAction::FixFirstLine);
    Ok(String::new())
};

// ============================================================================
// REPLACE
// ============================================================================

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct ReplaceArgs {
    #[arg(short, long)]
    regex: bool,
    #[arg(short, long)]
    ignore_case: bool,
    #[arg(short, long)]
    whole_word: bool,
    /// Maximum number of replacements, 0 for all.
    #[arg(short, long, default_value_t = 0)]
    count: usize,
    #[arg(allow_hyphen_values = true)]
    pattern: String,
    #[arg(allow_hyphen_values = true)]
    replacement: String,
    text: Option<String>,
}

/// Replaces a pattern in the current level's output, or in `text`.
///
/// Usage: replace [-r|--regex] [-i|--ignore-case] [-w|--whole-word]
///                [-c|--count <n>] <pattern> <replacement> [<text>]
pub const CMD_REPLACE: CommandFn = |pre, args| {
    let flags: ReplaceArgs = parse_flags("replace", args)?;
    let replacement = Replacement::new(
        &flags.pattern,
        &flags.replacement,
        flags.regex,
        flags.ignore_case,
        flags.whole_word,
        flags.count,
    )?;
    match flags.text {
        Some(text) => Ok(replacement.apply(&text)),
        None => {
            pre.queue_final_action(FinalAction::Replace(replacement));
            Ok(String::new())
        }
    }
};

// ============================================================================
// CASE
// ============================================================================

/// The argument text of a case command, without surrounding quotes.
fn case_text(args: &str) -> Option<&str> {
    let text = args.trim();
    if text.is_empty() {
        return None;
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Some(&text[1..text.len() - 1]);
    }
    Some(text)
}

/// Usage: upper [<text>]
pub const CMD_UPPER: CommandFn = |pre, args| match case_text(args) {
    Some(text) => Ok(FinalAction::Upper.apply(text)),
    None => {
        pre.queue_final_action(FinalAction::Upper);
        Ok(String::new())
    }
};

/// Usage: lower [<text>]
pub const CMD_LOWER: CommandFn = |pre, args| match case_text(args) {
    Some(text) => Ok(FinalAction::Lower.apply(text)),
    None => {
        pre.queue_final_action(FinalAction::Lower);
        Ok(String::new())
    }
};

/// Uppercases the first character, lowercases the rest.
///
/// Usage: capitalize [<text>]
pub const CMD_CAPITALIZE: CommandFn = |pre, args| match case_text(args) {
    Some(text) => Ok(FinalAction::Capitalize.apply(text)),
    None => {
        pre.queue_final_action(FinalAction::Capitalize);
        Ok(String::new())
    }
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

pub fn register_text_commands(registry: &mut DirectiveRegistry) {
    // Whitespace
    registry.builtin_command(
        "strip_empty_lines",
        "Removes lines containing only whitespace from the current block.\n\
         Usage: strip_empty_lines",
        CMD_STRIP_EMPTY_LINES,
    );
    registry.builtin_command(
        "strip_leading_whitespace",
        "Removes indentation in the current block.\nUsage: strip_leading_whitespace",
        CMD_STRIP_LEADING_WHITESPACE,
    );
    registry.builtin_command(
        "strip_trailing_whitespace",
        "Removes whitespace at the end of lines in the current block.\n\
         Usage: strip_trailing_whitespace",
        CMD_STRIP_TRAILING_WHITESPACE,
    );
    registry.builtin_command(
        "fix_last_line",
        "Ends the current block with exactly one newline, unless it is empty.\n\
         Usage: fix_last_line",
        CMD_FIX_LAST_LINE,
    );
    registry.builtin_command(
        "fix_first_line",
        "Removes blank lines at the start of the current block.\nUsage: fix_first_line",
        CMD_FIX_FIRST_LINE,
    );

    // Replacement
    registry.builtin_command(
        "replace",
        "Replaces a pattern in the current block, or in <text>.\n\
         Usage: replace [-r|--regex] [-i|--ignore-case] [-w|--whole-word]\n\
         \x20              [-c|--count <n>] <pattern> <replacement> [<text>]",
        CMD_REPLACE,
    );

    // Case
    registry.builtin_command(
        "upper",
        "Switches the current block, or <text>, to upper case.\nUsage: upper [<text>]",
        CMD_UPPER,
    );
    registry.builtin_command(
        "lower",
        "Switches the current block, or <text>, to lower case.\nUsage: lower [<text>]",
        CMD_LOWER,
    );
    registry.builtin_command(
        "capitalize",
        "Capitalizes the current block, or <text>.\nUsage: capitalize [<text>]",
        CMD_CAPITALIZE,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_flags() {
        let flags: ReplaceArgs = parse_flags("replace", "-c 2 -i foo bar").unwrap();
        assert_eq!(flags.count, 2);
        assert!(flags.ignore_case && !flags.regex && !flags.whole_word);
        assert_eq!((flags.pattern.as_str(), flags.replacement.as_str()), ("foo", "bar"));
        assert_eq!(flags.text, None);

        let flags: ReplaceArgs = parse_flags("replace", "--whole-word \"a b\" c \"in text\"").unwrap();
        assert!(flags.whole_word);
        assert_eq!(flags.text.as_deref(), Some("in text"));

        assert!(parse_flags::<ReplaceArgs>("replace", "only_pattern").is_err());
        assert!(parse_flags::<ReplaceArgs>("replace", "-c -1 a b").is_err());
    }

    #[test]
    fn case_text_strips_quotes() {
        assert_eq!(case_text("  "), None);
        assert_eq!(case_text(" \"a b\" "), Some("a b"));
        assert_eq!(case_text("hello"), Some("hello"));
    }
}

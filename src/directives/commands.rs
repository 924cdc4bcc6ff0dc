//! # Simple Commands
//!
//! Commands that depend only on their arguments and the current position:
//! user diagnostics, introspection, the date, and printing the delimiters
//! themselves.

use chrono::{Datelike, Local, Timelike};

use crate::diagnostics::WarningCategory;
use crate::directives::no_args;
use crate::runtime::registry::{CommandFn, DirectiveRegistry};
use crate::syntax::args::parse_integer;
use crate::{err_msg, PreprocError, VERSION};

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Aborts the run.
///
/// Usage: error [<message>]
pub const CMD_ERROR: CommandFn = |_pre, args| {
    let args = args.trim();
    if args.is_empty() {
        Err(err_msg!(Raised, "raised by error command"))
    } else {
        Err(err_msg!(Raised, "raised by error command\n{}", args))
    }
};

/// Emits a `user` warning and prints nothing.
///
/// Usage: warning [<message>]
pub const CMD_WARNING: CommandFn = |pre, args| {
    let args = args.trim();
    let message = if args.is_empty() {
        "raised by warning command".to_string()
    } else {
        format!("raised by warning command\n{}", args)
    };
    pre.warn(WarningCategory::User, &message)?;
    Ok(String::new())
};

// ============================================================================
// INTROSPECTION
// ============================================================================

/// Usage: version
pub const CMD_VERSION: CommandFn = |pre, args| {
    no_args(pre, "version", args)?;
    Ok(VERSION.to_string())
};

/// Prints the name of the file being processed.
///
/// Usage: file
pub const CMD_FILE: CommandFn = |pre, args| {
    no_args(pre, "file", args)?;
    Ok(pre.current_position().map(|(name, _)| name).unwrap_or_default())
};

/// Prints the line the directive starts on, in the file being processed.
///
/// Usage: line
pub const CMD_LINE: CommandFn = |pre, args| {
    no_args(pre, "line", args)?;
    Ok(pre
        .current_position()
        .map(|(_, position)| position.line.to_string())
        .unwrap_or_default())
};

/// Prints the current local date and time.
///
/// Usage: date [<format>]
///   - <format>: defaults to YYYY-MM-DD. Placeholders are YYYY, YY or Y for
///     the year, MM or M for the month, DD or D for the day, hh or h for the
///     hour, mm or m for minutes, ss or s for seconds. Doubled letters are
///     zero-padded.
pub const CMD_DATE: CommandFn = |_pre, args| {
    let format = match args.trim() {
        "" => "YYYY-MM-DD",
        format => format,
    };
    let now = Local::now();
    Ok(render_date(
        format,
        &DateParts {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
        },
    ))
};

#[derive(Debug, Clone, Copy)]
struct DateParts {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

const DATE_PLACEHOLDERS: [&str; 13] = [
    "YYYY", "YY", "Y", "MM", "M", "DD", "D", "hh", "h", "mm", "m", "ss", "s",
];

/// Expands placeholders left to right, longest match first.
fn render_date(format: &str, date: &DateParts) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;
    while let Some(c) = rest.chars().next() {
        let Some(placeholder) = DATE_PLACEHOLDERS.iter().find(|p| rest.starts_with(**p)) else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        };
        let value = match *placeholder {
            "YYYY" => format!("{:04}", date.year),
            "YY" => format!("{:02}", date.year.rem_euclid(100)),
            "Y" => date.year.to_string(),
            "MM" => format!("{:02}", date.month),
            "M" => date.month.to_string(),
            "DD" => format!("{:02}", date.day),
            "D" => date.day.to_string(),
            "hh" => format!("{:02}", date.hour),
            "h" => date.hour.to_string(),
            "mm" => format!("{:02}", date.minute),
            "m" => date.minute.to_string(),
            "ss" => format!("{:02}", date.second),
            _ => date.second.to_string(),
        };
        out.push_str(&value);
        rest = &rest[placeholder.len()..];
    }
    out
}

// ============================================================================
// DELIMITERS
// ============================================================================

/// Nesting level argument of `begin`/`end`: a non-negative integer, 0 when absent.
fn level(name: &str, args: &str) -> Result<usize, PreprocError> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(0);
    }
    parse_integer(args)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| err_msg!(Argument, "invalid argument \"{}\"\nusage: {} [<uint>]", args, name))
}

/// Prints the begin delimiter.
///
/// Usage: begin [<n>]
///   - <n>: with n > 0, prints a `begin n-1` directive instead, which prints
///     the delimiter once parsed n more times.
pub const CMD_BEGIN: CommandFn = |pre, args| {
    let scanner = pre.scanner();
    Ok(match level("begin", args)? {
        0 => scanner.begin().to_string(),
        n => format!("{}begin {}{}", scanner.begin(), n - 1, scanner.end()),
    })
};

/// Prints the end delimiter.
///
/// Usage: end [<n>]
pub const CMD_END: CommandFn = |pre, args| {
    let scanner = pre.scanner();
    Ok(match level("end", args)? {
        0 => scanner.end().to_string(),
        n => format!("{}end {}{}", scanner.begin(), n - 1, scanner.end()),
    })
};

/// Prints its arguments between delimiters, making a directive of them.
///
/// Usage: call <text>
pub const CMD_CALL: CommandFn = |pre, args| {
    let scanner = pre.scanner();
    Ok(format!("{}{}{}", scanner.begin(), args.trim_start(), scanner.end()))
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

pub fn register_commands(registry: &mut DirectiveRegistry) {
    // Diagnostics
    registry.builtin_command(
        "error",
        "Raises a fatal error.\nUsage: error [<message>]",
        CMD_ERROR,
    );
    registry.builtin_command(
        "warning",
        "Raises a user warning.\nUsage: warning [<message>]",
        CMD_WARNING,
    );

    // Introspection
    registry.builtin_command("version", "Prints the preprocessor version.\nUsage: version", CMD_VERSION);
    registry.builtin_command("file", "Prints the current file name.\nUsage: file", CMD_FILE);
    registry.builtin_command("line", "Prints the current line number.\nUsage: line", CMD_LINE);
    registry.builtin_command(
        "date",
        "Prints the current date.\nUsage: date [<format>]\n\
         Placeholders: YYYY YY Y (year), MM M (month), DD D (day),\n\
         hh h (hour), mm m (minutes), ss s (seconds). Default: YYYY-MM-DD",
        CMD_DATE,
    );

    // Delimiters
    registry.builtin_command(
        "begin",
        "Prints the begin delimiter.\nUsage: begin [<n>]\n\
         With n > 0, prints a \"begin n-1\" directive.",
        CMD_BEGIN,
    );
    registry.builtin_command(
        "end",
        "Prints the end delimiter.\nUsage: end [<n>]\n\
         With n > 0, prints an \"end n-1\" directive.",
        CMD_END,
    );
    registry.builtin_command(
        "call",
        "Prints its arguments as a directive.\nUsage: call <text>",
        CMD_CALL,
    );
}

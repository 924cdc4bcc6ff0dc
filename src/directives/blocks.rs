//! # Blocks
//!
//! Control flow (`if`, `for`, `repeat`) and scoping (`void`, `block`,
//! `verbatim`). Every block receives its raw body; all of them but
//! `verbatim` parse it through [`Preprocessor::parse_body`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::directives::no_args;
use crate::runtime::interpreter::{closes_directive, Preprocessor};
use crate::runtime::registry::{BlockFn, DirectiveRegistry};
use crate::syntax::args::{parse_integer, split_args};
use crate::syntax::condition;
use crate::syntax::Token;
use crate::{err_msg, PreprocError};

static FOR_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([_a-zA-Z][_a-zA-Z0-9]*)\s+in\s+").expect("valid for regex")
});

static RANGE: Lazy<Regex> = Lazy::new(|| {
    let int = r"-? *[0-9]+(?:[_0-9]*[0-9])?";
    Regex::new(&format!(
        r"^range\((?:\s*({int})\s*,)?\s*({int})\s*(?:,\s*({int})\s*)?\)\s*$"
    ))
    .expect("valid range regex")
});

const FOR_USAGE: &str = "usage: for <ident> in range(stop)\n\
                         \x20                     range(start, stop)\n\
                         \x20                     range(start, stop, step)\n\
                         \x20      for <ident> in <items...>";

// ============================================================================
// SCOPING BLOCKS
// ============================================================================

/// Parses its body for its side effects, prints nothing.
///
/// Usage: void ... endvoid
pub const BLOCK_VOID: BlockFn = |pre, args, body| {
    no_args(pre, "void", args)?;
    pre.parse_body(0, body, "in void block")?;
    Ok(String::new())
};

/// Parses and prints its body. Final actions queued inside only apply to it.
///
/// Usage: block ... endblock
pub const BLOCK_BLOCK: BlockFn = |pre, args, body| {
    no_args(pre, "block", args)?;
    pre.parse_body(0, body, "in block block")
};

/// Prints its body without parsing it. Nested verbatim blocks are balanced,
/// so the body ends at the first unmatched endverbatim.
///
/// Usage: verbatim ... endverbatim
pub const BLOCK_VERBATIM: BlockFn = |pre, args, body| {
    no_args(pre, "verbatim", args)?;
    Ok(body.to_string())
};

/// Renders its body once and prints it `n` times.
///
/// Usage: repeat <n>
///   - <n>: a positive integer.
pub const BLOCK_REPEAT: BlockFn = |pre, args, body| {
    let args = args.trim();
    let count = parse_integer(args)
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| err_msg!(Argument, "invalid argument \"{}\"\nusage: repeat <uint > 0>", args))?;
    let rendered = pre.parse_body(0, body, "in repeat block")?;
    if rendered.len().checked_mul(count).is_none() {
        return Err(err_msg!(Argument, "repeat count {} is too large for its content", count));
    }
    Ok(rendered.repeat(count))
};

// ============================================================================
// FOR
// ============================================================================

/// Renders its body once per value, with `<ident>` printing the value.
///
/// Usage: for <ident> in range([<start>,] <stop> [, <step>])
///        for <ident> in <items...>
///   - The variable keeps its last value after the loop.
pub const BLOCK_FOR: BlockFn = |pre, args, body| {
    let Some(head) = FOR_HEAD.captures(args) else {
        return Err(err_msg!(Syntax, "invalid for syntax\n{}", FOR_USAGE));
    };
    let ident = head[1].to_string();
    let source = args[head[0].len()..].trim();
    let values: Vec<String> = if source.starts_with("range(") {
        range_values(source)?.into_iter().map(|n| n.to_string()).collect()
    } else {
        split_args(source)?
    };
    let mut out = String::new();
    for value in values {
        pre.bind(&ident, value);
        out.push_str(&pre.parse_body(0, body, "in for block")?);
    }
    Ok(out)
};

/// The values of a `range(...)` expression, with the semantics of a
/// half-open integer range.
fn range_values(text: &str) -> Result<Vec<i64>, PreprocError> {
    let invalid = || {
        err_msg!(
            Argument,
            "invalid range \"{}\"\nusage: range(stop), range(start, stop) or range(start, stop, step)",
            text
        )
        .with_help("start, stop and step are integers (digits and _, with an optional leading -)")
    };
    let captures = RANGE.captures(text).ok_or_else(invalid)?;
    let number = |i: usize| captures.get(i).and_then(|m| parse_integer(m.as_str()));
    let stop = number(2).ok_or_else(invalid)?;
    let start = number(1).unwrap_or(0);
    let step = number(3).unwrap_or(1);
    if step == 0 {
        return Err(err_msg!(Argument, "range step can't be zero"));
    }
    let mut values = Vec::new();
    let mut value = start;
    while (step > 0 && value < stop) || (step < 0 && value > stop) {
        values.push(value);
        match value.checked_add(step) {
            Some(next) => value = next,
            None => break,
        }
    }
    Ok(values)
}

// ============================================================================
// IF
// ============================================================================

/// An `elif` or `else` found at the top level of an if body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Branch {
    /// Offset of the directive in the searched text.
    begin: usize,
    /// Offset just after it, where the branch body starts.
    end: usize,
    /// For `elif`, the range of its condition text.
    condition: Option<(usize, usize)>,
}

/// `tail` starts (after whitespace) with the word `keyword`, followed by a
/// non-identifier character or the end delimiter. Returns the offset just
/// after the keyword.
fn keyword_at(tail: &str, keyword: &str, end_token: &str) -> Option<usize> {
    let skipped = tail.len() - tail.trim_start().len();
    let rest = tail[skipped..].strip_prefix(keyword)?;
    let boundary = rest.starts_with(end_token)
        || rest
            .chars()
            .next()
            .is_some_and(|c| !(c.is_ascii_alphanumeric() || c == '_'));
    boundary.then_some(skipped + keyword.len())
}

/// `tail` is `keyword` then only whitespace before the end delimiter.
fn closed_keyword(tail: &str, keyword: &str, end_token: &str) -> Option<usize> {
    let skipped = tail.len() - tail.trim_start().len();
    let rest = tail[skipped..].strip_prefix(keyword)?;
    closes_directive(rest, end_token).map(|len| skipped + keyword.len() + len)
}

/// Finds the next `elif`/`else` of `text` that belongs to this if block,
/// skipping nested if blocks.
fn next_branch(pre: &Preprocessor, text: &str) -> Result<Option<Branch>, PreprocError> {
    let scanner = pre.scanner();
    let end_token = scanner.end();
    let tokens: Vec<Token> = scanner.tokens(text).collect();
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_open() {
            continue;
        }
        let tail = &text[token.end..];
        if keyword_at(tail, "if", end_token).is_some() {
            depth += 1;
        } else if closed_keyword(tail, "endif", end_token).is_some() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            if let Some(len) = closed_keyword(tail, "else", end_token) {
                return Ok(Some(Branch {
                    begin: token.start,
                    end: token.end + len,
                    condition: None,
                }));
            }
            if let Some(len) = keyword_at(tail, "elif", end_token) {
                let close = matching_close(&tokens, i).ok_or_else(|| {
                    err_msg!(Syntax, "unmatched \"{}\" token in elif", scanner.begin()).with_help(
                        format!(
                            "add a matching \"{}\" or use \"{}begin{}\" to print it",
                            end_token,
                            scanner.begin(),
                            end_token
                        ),
                    )
                })?;
                return Ok(Some(Branch {
                    begin: token.start,
                    end: close.end,
                    condition: Some((token.end + len, close.start)),
                }));
            }
        }
    }
    Ok(None)
}

/// The close token balancing the open token at `open`, counting tokens like
/// parentheses.
fn matching_close(tokens: &[Token], open: usize) -> Option<Token> {
    let mut depth = 0usize;
    for token in &tokens[open..] {
        if token.is_open() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(*token);
            }
        }
    }
    None
}

/// Prints the first branch whose condition holds.
///
/// Usage: if <condition> ... [elif <condition> ...]* [else ...] endif
///   - <condition>: true, false, 1, 0, def <ident>, ndef <ident>,
///     <str> == <str>, <str> != <str>, a bare string (true if not empty),
///     combined with not, and, or and parentheses.
pub const BLOCK_IF: BlockFn = |pre, args, body| {
    let mut value = condition::evaluate(args, |name| pre.is_defined(name))?;
    let mut pos = 0;
    let mut description = "in if branch";
    loop {
        let branch = next_branch(pre, &body[pos..])?;
        if value {
            let end = branch.map_or(body.len(), |b| pos + b.begin);
            return pre.parse_body(pos, &body[pos..end], description);
        }
        let Some(branch) = branch else {
            return Ok(String::new());
        };
        match branch.condition {
            None => {
                value = true;
                description = "in else branch";
            }
            Some((start, end)) => {
                let text = pre.parse_body(pos + start, &body[pos + start..pos + end], "in elif condition")?;
                value = condition::evaluate(&text, |name| pre.is_defined(name))?;
                description = "in elif branch";
            }
        }
        pos += branch.end;
    }
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

pub fn register_blocks(registry: &mut DirectiveRegistry) {
    // Scoping
    registry.builtin_block(
        "void",
        "Parses its body but prints nothing.\nUsage: void ... endvoid",
        BLOCK_VOID,
    );
    registry.builtin_block(
        "block",
        "Parses and prints its body. Final actions declared inside only affect it.\n\
         Usage: block ... endblock",
        BLOCK_BLOCK,
    );
    registry.builtin_block(
        "verbatim",
        "Prints its body without parsing it.\nUsage: verbatim ... endverbatim",
        BLOCK_VERBATIM,
    );

    // Control flow
    registry.builtin_block(
        "repeat",
        "Renders its body once and prints it n times.\nUsage: repeat <n>",
        BLOCK_REPEAT,
    );
    registry.builtin_block(
        "for",
        "Renders its body once per value.\n\
         Usage: for <ident> in range([<start>,] <stop> [, <step>])\n\
         \x20      for <ident> in <items...>",
        BLOCK_FOR,
    );
    registry.builtin_block(
        "if",
        "Conditional rendering.\n\
         Usage: if <condition> ... [elif <condition> ...] [else ...] endif\n\
         Conditions: true false 1 0, def <ident>, ndef <ident>,\n\
         <str> == <str>, <str> != <str>, not, and, or, (...)",
        BLOCK_IF,
    );
}

//! # User Definitions
//!
//! `def`, `undef` and `deflist`, plus the expansion of the commands they
//! create. The interpreter calls [`expand_definition`] and [`index_list`]
//! when it dispatches to a defined command.

use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::interpreter::Preprocessor;
use crate::runtime::registry::{
    CommandFn, CommandHandler, Definition, DirectiveRegistry, ListDefinition,
};
use crate::syntax::args::{
    is_identifier, is_whole_word, parse_integer, process_string, split_args, split_identifier,
    word_len,
};
use crate::{err_msg, PreprocError};

// ============================================================================
// DEF / UNDEF
// ============================================================================

/// Defines a command, or a macro when a parameter list follows the name.
///
/// Usage: def <ident> <text>
///        def <ident> "<text with surrounding spaces>"
///        def <ident>(<param>, <param>...) <text>
///   - <text>: trimmed, unless quoted. Quoted text has its escapes processed.
///     Parsed every time the command is called.
pub const CMD_DEF: CommandFn = |pre, args| {
    let Some((name, rest, _)) = split_identifier(args) else {
        return Err(err_msg!(
            Argument,
            "invalid identifier\ndef needs a valid identifier, got \"{}\"",
            args.trim()
        ));
    };
    let (params, text) = parse_signature(name, rest.trim())?;
    let body = unquote(text);
    let description = match &params {
        Some(params) => format!("Macro defined in the document.\nUsage: {} {}", name, params.join(" ")),
        None => format!("Command defined in the document.\nUsage: {}", name),
    };
    pre.unbind(name);
    pre.registry_mut().register_command(
        name,
        description,
        CommandHandler::Defined(Rc::new(Definition {
            name: name.to_string(),
            params,
            body,
        })),
    )?;
    Ok(String::new())
};

/// Splits an optional `(a, b, c)` parameter list off the text of a `def`.
fn parse_signature<'a>(
    name: &str,
    text: &'a str,
) -> Result<(Option<Vec<String>>, &'a str), PreprocError> {
    let Some(list) = text.strip_prefix('(') else {
        return Ok((None, text));
    };
    let Some(close) = list.find(')') else {
        return Err(err_msg!(
            Argument,
            "no matching closing \")\" in macro definition"
        )
        .with_help("enclose the text in quotes to start it with a parenthesis"));
    };
    let mut params: Vec<String> = Vec::new();
    if !list[..close].trim().is_empty() {
        for param in list[..close].split(',').map(str::trim) {
            if !is_identifier(param) {
                return Err(err_msg!(
                    Argument,
                    "in def {}: invalid macro parameter name \"{}\"",
                    name,
                    param
                ));
            }
            if params.iter().any(|p| p == param) {
                return Err(err_msg!(
                    Argument,
                    "in def {}: multiple macro parameters with same name \"{}\"",
                    name,
                    param
                ));
            }
            params.push(param.to_string());
        }
    }
    Ok((Some(params), list[close + 1..].trim()))
}

/// Strips surrounding quotes and processes escapes; unquoted text is kept.
fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        process_string(&text[1..text.len() - 1])
    } else {
        text.to_string()
    }
}

/// Removes a command (and a loop variable of the same name).
///
/// Usage: undef <ident>
pub const CMD_UNDEF: CommandFn = |pre, args| {
    let name = match split_identifier(args) {
        Some((name, rest, _)) if rest.trim().is_empty() => name,
        _ => return Err(err_msg!(Argument, "invalid identifier \"{}\"", args.trim())),
    };
    pre.unbind(name);
    pre.registry_mut().unregister_command(name);
    Ok(String::new())
};

/// Expands a command created by `def`.
pub fn expand_definition(
    pre: &mut Preprocessor,
    definition: &Rc<Definition>,
    args: &str,
) -> Result<String, PreprocError> {
    let text = match &definition.params {
        None => {
            crate::directives::no_args(pre, &definition.name, args)?;
            definition.body.clone()
        }
        Some(params) => {
            let values = split_args(args)?;
            if values.len() != params.len() {
                return Err(err_msg!(
                    Argument,
                    "invalid number of arguments for macro (expected {} got {})\nusage: {} {}",
                    params.len(),
                    values.len(),
                    definition.name,
                    params.join(" ")
                ));
            }
            substitute(&definition.body, params, &values)
        }
    };
    pre.parse_generated(
        &text,
        &format!("in expansion of defined command {}", definition.name),
    )
}

/// Replaces every whole-word occurrence of a parameter in `body`, in one
/// pass, so substituted values are never substituted again.
fn substitute(body: &str, params: &[String], values: &[String]) -> String {
    let table: HashMap<&str, &str> = params
        .iter()
        .map(String::as_str)
        .zip(values.iter().map(String::as_str))
        .collect();
    let mut out = String::with_capacity(body.len());
    let mut at = 0;
    while let Some(c) = body[at..].chars().next() {
        let len = word_len(body, at);
        if len > 0 && is_whole_word(body, at, len) {
            if let Some(value) = table.get(&body[at..at + len]) {
                out.push_str(value);
                at += len;
                continue;
            }
        }
        out.push(c);
        at += c.len_utf8();
    }
    out
}

// ============================================================================
// DEFLIST
// ============================================================================

/// Defines a list command.
///
/// Usage: deflist <ident> <item> <item> "item with spaces"...
///   - `<ident>` prints the raw item text, `<ident> n` prints the n-th item.
///     Negative indexes count from the end.
pub const CMD_DEFLIST: CommandFn = |pre, args| {
    let Some((name, rest, _)) = split_identifier(args) else {
        return Err(err_msg!(
            Argument,
            "invalid identifier\ndeflist needs a valid identifier, got \"{}\"",
            args.trim()
        ));
    };
    let items = split_args(rest)?;
    pre.unbind(name);
    pre.registry_mut().register_command(
        name,
        format!("List defined in the document.\nUsage: {} [<index>]", name),
        CommandHandler::List(Rc::new(ListDefinition {
            name: name.to_string(),
            raw: rest.trim().to_string(),
            items,
        })),
    )?;
    Ok(String::new())
};

/// Runs a command created by `deflist`.
pub fn index_list(
    _pre: &mut Preprocessor,
    name: &str,
    list: &Rc<ListDefinition>,
    args: &str,
) -> Result<String, PreprocError> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(list.raw.clone());
    }
    let Some(index) = parse_integer(args) else {
        return Err(err_msg!(
            Argument,
            "invalid argument for defined list \"{}\"\nusage: {} [<index>]",
            args,
            name
        ));
    };
    let len = list.items.len() as i64;
    let resolved = if index < 0 { index + len } else { index };
    if !(0..len).contains(&resolved) {
        return Err(err_msg!(
            Argument,
            "invalid index\ndefined list {} has length {}, can't access element {}",
            name,
            len,
            index
        ));
    }
    Ok(list.items[resolved as usize].clone())
}

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

pub fn register_definition_commands(registry: &mut DirectiveRegistry) {
    registry.builtin_command(
        "def",
        "Defines a command or a macro.\n\
         Usage: def <ident> <text>\n\
         \x20      def <ident> \"<text>\"\n\
         \x20      def <ident>(<param>, ...) <text>",
        CMD_DEF,
    );
    registry.builtin_command("undef", "Removes a command.\nUsage: undef <ident>", CMD_UNDEF);
    registry.builtin_command(
        "deflist",
        "Defines a list command.\nUsage: deflist <ident> <items...>\n\
         \"<ident>\" prints the list, \"<ident> n\" its n-th item.",
        CMD_DEFLIST,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitution_is_whole_identifier() {
        let p = params(&["a", "b", "c"]);
        let v = params(&["1", "2", "3"]);
        assert_eq!(substitute("(a+b+2c)", &p, &v), "(1+2+23)");
        assert_eq!(substitute("abc a_b", &p, &v), "abc a_b");
        assert_eq!(substitute("a1c", &p, &v), "a13");

        let p = params(&["pha", "alpha", "lpha"]);
        assert_eq!(substitute("(pha,alpha)lpha", &p, &v), "(1,2)3");
    }

    #[test]
    fn substitution_does_not_rescan_values() {
        let p = params(&["x", "y"]);
        let v = params(&["y", "x"]);
        assert_eq!(substitute("x-y", &p, &v), "y-x");
    }

    #[test]
    fn signatures() {
        let (p, text) = parse_signature("f", "(a, b) a+b").unwrap();
        assert_eq!(p, Some(params(&["a", "b"])));
        assert_eq!(text, "a+b");
        assert_eq!(parse_signature("f", "()x").unwrap(), (Some(vec![]), "x"));
        assert_eq!(parse_signature("f", "plain (x)").unwrap(), (None, "plain (x)"));
        assert!(parse_signature("f", "(a, a) x").is_err());
        assert!(parse_signature("f", "(1a) x").is_err());
        assert!(parse_signature("f", "(a x").is_err());
    }

    #[test]
    fn quoted_text_keeps_spaces() {
        assert_eq!(unquote("\" jean\""), " jean");
        assert_eq!(unquote("\"a\\nb\""), "a\nb");
        assert_eq!(unquote("jean"), "jean");
        assert_eq!(unquote("\""), "\"");
    }
}

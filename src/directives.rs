//! # Built-in Directives
//!
//! Every command and block the preprocessor ships with.
//!
//! ## Module Structure
//!
//! - **`commands`**: Diagnostics and introspection (`error`, `warning`, `line`, `date`, ...)
//!   and delimiter printing (`begin`, `end`, `call`)
//! - **`defs`**: User definitions (`def`, `undef`, `deflist`) and their expansion
//! - **`deferred`**: Content resolved at finalization (`label`, `atlabel`, `cut`, `paste`)
//! - **`blocks`**: Control flow and scoping (`if`, `for`, `repeat`, `void`, `block`, `verbatim`)
//! - **`text`**: Final actions (`replace`, `upper`, `strip_empty_lines`, ...)
//! - **`include`**: File inclusion
//!
//! Handlers are plain `fn` pointers. They receive the interpreter by mutable
//! reference and the raw argument text, and return the text that replaces the
//! directive. Errors are returned bare; the interpreter attaches the location.

use clap::Parser;

use crate::diagnostics::WarningCategory;
use crate::runtime::interpreter::Preprocessor;
use crate::runtime::registry::DirectiveRegistry;
use crate::{err_msg, PreprocError};

pub mod blocks;
pub mod commands;
pub mod deferred;
pub mod defs;
pub mod include;
pub mod text;

// ============================================================================
// UNIFIED REGISTRATION FUNCTION
// ============================================================================

/// Registers every built-in command and block.
pub fn register_all_directives(registry: &mut DirectiveRegistry) {
    commands::register_commands(registry);
    defs::register_definition_commands(registry);
    deferred::register_deferred_directives(registry);
    blocks::register_blocks(registry);
    text::register_text_commands(registry);
    include::register_include(registry);
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Warns when a directive that takes no arguments was given some.
pub(crate) fn no_args(pre: &mut Preprocessor, name: &str, args: &str) -> Result<(), PreprocError> {
    if args.trim().is_empty() {
        return Ok(());
    }
    pre.warn(
        WarningCategory::ExtraArguments,
        &format!("{} takes no arguments, got \"{}\"", name, args.trim()),
    )
}

/// Parses directive flags with clap. The argument text is split like a
/// command line first; clap errors become `Argument` errors.
pub(crate) fn parse_flags<T: Parser>(name: &str, args: &str) -> Result<T, PreprocError> {
    let words = crate::syntax::args::split_args(args)?;
    T::try_parse_from(std::iter::once(name.to_string()).chain(words)).map_err(|e| {
        let rendered = e.to_string();
        let first = rendered.lines().next().unwrap_or("").trim_start_matches("error: ");
        err_msg!(Argument, "{}: {}", name, first)
    })
}

//! # Deferred Content
//!
//! Directives whose output depends on content found elsewhere in the
//! document:
//!
//! - **`label`** leaves a marker that finalization replaces with the content
//!   of the matching `atlabel` block, wherever that block is.
//! - **`cut`** stores its body in a clipboard, **`paste`** prints it. A paste
//!   of a clipboard nothing has been cut into yet is resolved at
//!   finalization, with the last content cut into it.

use clap::Parser;

use crate::diagnostics::WarningCategory;
use crate::directives::parse_flags;
use crate::runtime::interpreter::Preprocessor;
use crate::runtime::registry::{BlockFn, CommandFn, DirectiveRegistry};
use crate::runtime::store::{ClipboardEntry, DeferredPaste};
use crate::{err_msg, PreprocError};

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct PasteArgs {
    /// Print the clipboard without parsing it.
    #[arg(short, long)]
    verbatim: bool,
    #[arg(default_value = "")]
    clipboard: String,
}

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct CutArgs {
    /// Parse the body now and store the result.
    #[arg(short, long)]
    pre_render: bool,
    #[arg(default_value = "")]
    clipboard: String,
}

// ============================================================================
// LABELS
// ============================================================================

/// Usage: label <name>
pub const CMD_LABEL: CommandFn = |pre, args| {
    let label = args.trim();
    if label.is_empty() {
        return Err(err_msg!(Argument, "empty label name"));
    }
    Ok(pre.vars_mut().label_marker(label))
};

/// Renders its body and places it at every `label` with the same name.
///
/// Usage: atlabel <name> ... endatlabel
pub const BLOCK_ATLABEL: BlockFn = |pre, args, body| {
    let label = args.trim();
    if label.is_empty() {
        return Err(err_msg!(Argument, "empty label name"));
    }
    let content = pre.parse_body(0, body, "in block atlabel")?;
    pre.vars_mut().add_atlabel(label, content)?;
    Ok(String::new())
};

// ============================================================================
// CLIPBOARDS
// ============================================================================

/// Stores its body in a clipboard and prints nothing.
///
/// Usage: cut [-p|--pre-render] [<clipboard>] ... endcut
///   - --pre-render: the body is parsed now, paste prints the result as is.
///     Otherwise the body is parsed at every paste.
pub const BLOCK_CUT: BlockFn = |pre, args, body| {
    let flags: CutArgs = parse_flags("cut", args)?;
    let (content, rendered) = if flags.pre_render {
        (pre.parse_body(0, body, "in cut block")?, true)
    } else {
        (body.to_string(), false)
    };
    let start = pre.site().map_or(0, |site| site.end);
    let frame = pre.site_frame(start, "in pasted block");
    pre.vars_mut().cut(
        &flags.clipboard,
        ClipboardEntry {
            frame,
            content,
            rendered,
        },
    );
    Ok(String::new())
};

/// Prints a clipboard.
///
/// Usage: paste [-v|--verbatim] [<clipboard>]
pub const CMD_PASTE: CommandFn = |pre, args| {
    let flags: PasteArgs = parse_flags("paste", args)?;
    if pre.vars().clipboard(&flags.clipboard).is_some() {
        return render_clipboard(pre, &flags.clipboard, flags.verbatim);
    }
    if pre.is_finalizing() {
        pre.warn(
            WarningCategory::UndefinedClipboard,
            &format!("trying to paste undefined clipboard \"{}\"", flags.clipboard),
        )?;
        return Ok(String::new());
    }
    let at = pre.site().map_or(0, |site| site.begin);
    let frame = pre.site_frame(at, "in deferred paste");
    Ok(pre.vars_mut().defer_paste(DeferredPaste {
        clipboard: flags.clipboard,
        verbatim: flags.verbatim,
        frame,
    }))
};

fn render_clipboard(
    pre: &mut Preprocessor,
    clipboard: &str,
    verbatim: bool,
) -> Result<String, PreprocError> {
    let Some(entry) = pre.vars().clipboard(clipboard).cloned() else {
        return Ok(String::new());
    };
    if verbatim || entry.rendered {
        return Ok(entry.content);
    }
    pre.parse_in_frame(entry.frame, &entry.content)
}

/// Resolves the deferred paste with this index, once the document has been
/// expanded.
pub fn resolve_deferred(pre: &mut Preprocessor, index: usize) -> Result<String, PreprocError> {
    let Some(paste) = pre.vars().deferred_paste(index).cloned() else {
        return Ok(String::new());
    };
    if pre.vars().clipboard(&paste.clipboard).is_some() {
        return render_clipboard(pre, &paste.clipboard, paste.verbatim);
    }
    pre.with_frame(paste.frame, |pre| {
        pre.warn(
            WarningCategory::UndefinedClipboard,
            &format!("trying to paste undefined clipboard \"{}\"", paste.clipboard),
        )
    })?;
    Ok(String::new())
}

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

pub fn register_deferred_directives(registry: &mut DirectiveRegistry) {
    registry.builtin_command(
        "label",
        "Marks a place where atlabel blocks with the same name are printed.\n\
         Usage: label <name>",
        CMD_LABEL,
    );
    registry.builtin_command(
        "paste",
        "Prints the content of a clipboard.\n\
         Usage: paste [-v|--verbatim] [<clipboard>]\n\
         Clipboards cut later in the document are pasted once it is expanded.",
        CMD_PASTE,
    );
    registry.builtin_block(
        "atlabel",
        "Prints its rendered body at every label with the same name.\n\
         Usage: atlabel <name> ... endatlabel",
        BLOCK_ATLABEL,
    );
    registry.builtin_block(
        "cut",
        "Stores its body in a clipboard, prints nothing.\n\
         Usage: cut [-p|--pre-render] [<clipboard>] ... endcut",
        BLOCK_CUT,
    );
}

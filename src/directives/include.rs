//! File inclusion.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::debug;

use crate::directives::parse_flags;
use crate::runtime::context::Frame;
use crate::runtime::interpreter::Preprocessor;
use crate::runtime::registry::{CommandFn, DirectiveRegistry};
use crate::runtime::source::SourceFile;
use crate::syntax::{Delimiters, Scanner};
use crate::{err_msg, PreprocError};

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct IncludeArgs {
    /// Insert the file without parsing it.
    #[arg(short, long)]
    verbatim: bool,
    /// Begin delimiter used inside the file.
    #[arg(short, long, allow_hyphen_values = true)]
    begin: Option<String>,
    /// End delimiter used inside the file.
    #[arg(short, long, allow_hyphen_values = true)]
    end: Option<String>,
    path: PathBuf,
}

/// Inserts the contents of a file, parsed unless `--verbatim`.
///
/// Usage: include [-v|--verbatim] [-b|--begin <str>] [-e|--end <str>] <path>
///   - <path>: looked up as given, then in every configured include path.
pub const CMD_INCLUDE: CommandFn = |pre, args| {
    let flags: IncludeArgs = parse_flags("include", args)?;
    let (path, contents) = read_included(pre, &flags.path)?;
    debug!(path = %path.display(), bytes = contents.len(), "include");
    if flags.verbatim {
        return Ok(contents);
    }

    let current = pre.delimiters();
    let delimiters = Delimiters {
        begin: flags.begin.unwrap_or(current.begin),
        end: flags.end.unwrap_or(current.end),
        escape: current.escape,
    };
    let previous = pre.swap_scanner(Scanner::new(delimiters)?);
    let frame = Frame::root(
        SourceFile::new(path.display().to_string(), contents.as_str()),
        "in included file",
    );
    let result = pre.parse_in_frame(frame, &contents);
    pre.swap_scanner(previous);
    result
};

fn read_included(pre: &Preprocessor, path: &Path) -> Result<(PathBuf, String), PreprocError> {
    let candidates = std::iter::once(path.to_path_buf()).chain(
        pre.config()
            .include_paths
            .iter()
            .filter(|_| path.is_relative())
            .map(|dir| dir.join(path)),
    );
    let mut first_error = None;
    for candidate in candidates {
        match fs::read_to_string(&candidate) {
            Ok(contents) => return Ok((candidate, contents)),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    let shown = path.display();
    Err(match first_error.map(|e| e.kind()) {
        Some(ErrorKind::NotFound) | None => err_msg!(Io, "file not found \"{}\"", shown),
        Some(ErrorKind::PermissionDenied) => {
            err_msg!(Io, "can't open file \"{}\", permission denied", shown)
        }
        Some(_) => err_msg!(Io, "can't open file \"{}\"", shown),
    })
}

pub fn register_include(registry: &mut DirectiveRegistry) {
    registry.builtin_command(
        "include",
        "Inserts the contents of a file, parsed unless --verbatim.\n\
         Usage: include [-v|--verbatim] [-b|--begin <str>] [-e|--end <str>] <path>\n\
         --begin and --end set the delimiters used inside the file.",
        CMD_INCLUDE,
    );
}

//! Handles all user-facing output of the CLI that is not the document itself.
//!
//! The document goes to stdout or the `--output` file; everything here writes
//! to stderr so the two never mix.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

use crate::PreprocError;

// ============================================================================
// LOGGING
// ============================================================================

/// Installs the stderr `tracing` subscriber. `RUST_LOG` selects the level,
/// `--verbose` forces debug events of this crate.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("preproc=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("preproc=warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// ERRORS
// ============================================================================

/// Renders a preprocessing error with its source snippet and expansion trace.
pub fn report_error(err: PreprocError) {
    eprintln!("{:?}", miette::Report::new(err));
}

/// Prints a failure that happened outside of preprocessing (arguments,
/// configuration, reading or writing files).
pub fn print_failure(message: &str) {
    let mut stderr = StandardStream::stderr(color_choice());
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {}", message);
}

fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

//! Defines the command-line arguments of the `preproc` binary.
//!
//! This module uses the `clap` crate with its "derive" feature. Every option
//! left unset keeps the value of the `--config` file, or its default.

use std::path::PathBuf;

use clap::Parser;

use crate::diagnostics::{WarningCategory, WarningMode};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "preproc",
    version,
    about = "A delimiter-driven macro and templating preprocessor.",
    after_help = "Run with -H to list the available commands and blocks."
)]
pub struct PreprocArgs {
    /// File to preprocess. Reads stdin when absent or "-".
    pub input: Option<PathBuf>,

    /// File to write the output to. Writes to stdout when absent.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Begin delimiter of directives.
    #[arg(short, long, value_name = "STR", allow_hyphen_values = true)]
    pub begin: Option<String>,

    /// End delimiter of directives.
    #[arg(short, long, value_name = "STR", allow_hyphen_values = true)]
    pub end: Option<String>,

    /// Escape marker placed before a delimiter. An empty string disables escaping.
    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub escape: Option<String>,

    /// What to do with warnings.
    #[arg(short, long, value_enum, value_name = "MODE")]
    pub warnings: Option<WarningMode>,

    /// Drops every warning of a category. Can be repeated.
    #[arg(short, long, value_enum, value_name = "CATEGORY")]
    pub silence: Vec<WarningCategory>,

    /// Maximum nesting of expansions, -1 for no limit.
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub recursion_depth: Option<i64>,

    /// Defines a command printing VALUE (empty when omitted). Can be repeated.
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Adds a directory searched by the include command. Can be repeated.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_paths: Vec<PathBuf>,

    /// YAML configuration file. Command-line options take precedence.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Prints the help of a command or block, or lists them all, and exits.
    #[arg(short = 'H', long = "directives", value_name = "NAME", num_args = 0..=1)]
    pub directives: Option<Option<String>>,

    /// Logs every expanded directive to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl PreprocArgs {
    /// The input file, `None` for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PreprocArgs {
        PreprocArgs::try_parse_from(std::iter::once("preproc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn repeated_and_optional_values() {
        let args = parse(&["-D", "a=1", "-D", "b", "-s", "user", "-s", "extra-arguments", "in.txt"]);
        assert_eq!(args.defines, vec!["a=1", "b"]);
        assert_eq!(args.silence, vec![WarningCategory::User, WarningCategory::ExtraArguments]);
        assert_eq!(args.input_path(), Some(&PathBuf::from("in.txt")));
        assert_eq!(args.directives, None);
    }

    #[test]
    fn directives_topic_is_optional() {
        assert_eq!(parse(&["-H"]).directives, Some(None));
        assert_eq!(parse(&["-H", "for"]).directives, Some(Some("for".to_string())));
    }

    #[test]
    fn delimiters_and_depth_accept_leading_dashes() {
        let args = parse(&["-b", "-<", "-e", ">-", "-r", "-1", "-w", "error", "-"]);
        assert_eq!(args.begin.as_deref(), Some("-<"));
        assert_eq!(args.end.as_deref(), Some(">-"));
        assert_eq!(args.recursion_depth, Some(-1));
        assert_eq!(args.warnings, Some(WarningMode::Error));
        assert_eq!(args.input_path(), None);
    }
}

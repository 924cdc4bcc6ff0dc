//! The `preproc` command-line interface.
//!
//! Builds a [`Config`] from the `--config` file and the flags, runs one
//! document through a [`Preprocessor`] and maps the outcome to an exit code:
//! `0` on success, `2` when preprocessing fails, `1` for every other failure.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::debug;

use crate::cli::args::PreprocArgs;
use crate::cli::output::{init_tracing, print_failure, report_error};
use crate::runtime::{Config, Preprocessor};
use crate::{err_msg, PreprocError, PREPROCESSOR_NAME};

pub mod args;
pub mod output;

const EXIT_FAILURE: i32 = 1;
const EXIT_PREPROCESSING_ERROR: i32 = 2;

const STDIN_NAME: &str = "<stdin>";
const STDOUT_NAME: &str = "<stdout>";

/// The main entry point for the CLI.
pub fn run() {
    let args = PreprocArgs::parse();
    init_tracing(args.verbose);

    let mut pre = match setup(&args) {
        Ok(pre) => pre,
        Err(err) => {
            print_failure(&err.to_string());
            process::exit(EXIT_FAILURE);
        }
    };

    if let Some(topic) = &args.directives {
        print!("{}", pre.help(topic.as_deref().unwrap_or("")));
        return;
    }

    let (name, text) = match read_input(args.input_path()) {
        Ok(input) => input,
        Err(err) => {
            print_failure(&err.to_string());
            process::exit(EXIT_FAILURE);
        }
    };

    let output = match pre.process(&name, &text) {
        Ok(output) => output,
        Err(err) => {
            report_error(err);
            process::exit(EXIT_PREPROCESSING_ERROR);
        }
    };

    if let Err(err) = write_output(args.output.as_deref(), &output) {
        print_failure(&err.to_string());
        process::exit(EXIT_FAILURE);
    }
}

// ============================================================================
// SETUP
// ============================================================================

/// Layers the flags over the configuration file.
pub fn build_config(args: &PreprocArgs) -> Result<Config, PreprocError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(begin) = &args.begin {
        config.token_begin = begin.clone();
    }
    if let Some(end) = &args.end {
        config.token_end = end.clone();
    }
    if let Some(escape) = &args.escape {
        config.escape = escape.clone();
    }
    if let Some(mode) = args.warnings {
        config.warning_mode = mode;
    }
    if let Some(depth) = args.recursion_depth {
        config.max_recursion_depth = depth;
    }
    config.silence.extend(args.silence.iter().copied());
    config.defines.extend(args.defines.iter().cloned());
    config.include_paths.extend(args.include_paths.iter().cloned());
    // Files next to the input and output are found without -I.
    for path in [args.input_path(), args.output.as_ref()].into_iter().flatten() {
        if let Some(dir) = parent_dir(path) {
            if !config.include_paths.contains(&dir) {
                config.include_paths.push(dir);
            }
        }
    }
    config.validate()?;
    Ok(config)
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn setup(args: &PreprocArgs) -> Result<Preprocessor, PreprocError> {
    let config = build_config(args)?;
    debug!(?config, "configuration");
    let mut pre = Preprocessor::new(config)?;
    let input = args
        .input_path()
        .map_or(STDIN_NAME.to_string(), |p| p.display().to_string());
    let output = args
        .output
        .as_ref()
        .map_or(STDOUT_NAME.to_string(), |p| p.display().to_string());
    pre.define("input", &input, "Prints the name of the input file.\nUsage: input")?;
    pre.define("output", &output, "Prints the name of the output file.\nUsage: output")?;
    Ok(pre)
}

// ============================================================================
// I/O
// ============================================================================

fn read_input(path: Option<&PathBuf>) -> Result<(String, String), PreprocError> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| {
                err_msg!(Io, "{}: can't read \"{}\": {}", PREPROCESSOR_NAME, path.display(), e)
            })?;
            Ok((path.display().to_string(), text))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| err_msg!(Io, "{}: can't read stdin: {}", PREPROCESSOR_NAME, e))?;
            Ok((STDIN_NAME.to_string(), text))
        }
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<(), PreprocError> {
    match path {
        Some(path) => fs::write(path, text).map_err(|e| {
            err_msg!(Io, "{}: can't write \"{}\": {}", PREPROCESSOR_NAME, path.display(), e)
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| err_msg!(Io, "{}: can't write stdout: {}", PREPROCESSOR_NAME, e))
        }
    }
}

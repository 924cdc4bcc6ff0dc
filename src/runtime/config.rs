//! Run configuration: delimiters, recursion limit, warning policy and seed
//! definitions. Loadable from YAML; the CLI layers its flags on top.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::{WarningCategory, WarningMode};
use crate::syntax::args::split_identifier;
use crate::syntax::Delimiters;
use crate::{err_msg, PreprocError};

pub const DEFAULT_MAX_RECURSION_DEPTH: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    pub token_begin: String,
    pub token_end: String,
    /// Escape marker placed before a delimiter; empty disables escaping.
    pub escape: String,
    /// Maximum nesting of `parse` calls, `-1` for no limit.
    pub max_recursion_depth: i64,
    pub warning_mode: WarningMode,
    pub silence: Vec<WarningCategory>,
    pub warn_unmatched_close: bool,
    /// `name` or `name=value`, registered as commands before the run.
    pub defines: Vec<String>,
    pub include_paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let delimiters = Delimiters::default();
        Self {
            token_begin: delimiters.begin,
            token_end: delimiters.end,
            escape: delimiters.escape,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            warning_mode: WarningMode::default(),
            silence: Vec::new(),
            warn_unmatched_close: false,
            defines: Vec::new(),
            include_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Reads a YAML configuration file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, PreprocError> {
        let text = fs::read_to_string(path)
            .map_err(|e| err_msg!(Io, "can't read config file \"{}\": {}", path.display(), e))?;
        Self::from_yaml(&text)
            .map_err(|e| err_msg!(Config, "in config file \"{}\": {}", path.display(), e.message()))
    }

    pub fn from_yaml(text: &str) -> Result<Self, PreprocError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| err_msg!(Config, "invalid configuration: {}", e))
    }

    pub fn validate(&self) -> Result<(), PreprocError> {
        for (what, token) in [("begin", &self.token_begin), ("end", &self.token_end)] {
            if token.is_empty() {
                return Err(err_msg!(Config, "the {} delimiter can't be empty", what));
            }
            if matches!(token.as_str(), "\"" | "(" | ")") {
                return Err(err_msg!(Config, "the {} delimiter can't be {:?}", what, token));
            }
        }
        if self.token_begin == self.token_end {
            return Err(err_msg!(
                Config,
                "the begin and end delimiters must differ (both are {:?})",
                self.token_begin
            ));
        }
        if self.max_recursion_depth < -1 {
            return Err(err_msg!(
                Config,
                "invalid max recursion depth {} (use -1 for no limit)",
                self.max_recursion_depth
            ));
        }
        for define in &self.defines {
            parse_define(define)?;
        }
        Ok(())
    }

    /// `None` when unlimited.
    pub fn recursion_limit(&self) -> Option<usize> {
        usize::try_from(self.max_recursion_depth).ok()
    }

    pub fn delimiters(&self) -> Delimiters {
        Delimiters {
            begin: self.token_begin.clone(),
            end: self.token_end.clone(),
            escape: self.escape.clone(),
        }
    }

    pub fn is_silenced(&self, category: WarningCategory) -> bool {
        self.silence.contains(&category)
    }
}

/// Splits `name[=value]`. A missing value is the empty string.
pub fn parse_define(define: &str) -> Result<(&str, &str), PreprocError> {
    let (name, value) = match define.split_once('=') {
        Some((name, value)) => (name, value),
        None => (define, ""),
    };
    match split_identifier(name) {
        Some((ident, rest, _)) if rest.trim().is_empty() => Ok((ident, value)),
        _ => Err(err_msg!(
            Config,
            "invalid define \"{}\": expected <name>[=<value>]",
            define
        )),
    }
}

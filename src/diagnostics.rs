//!
//! Unified error and warning model for the preprocessor.
//!
//! # Overview
//!
//! Every failure is a [`PreprocError`]: a `thiserror` enum with one variant per
//! error category, each carrying an [`ErrorContext`]. The context holds the
//! full context-stack [`Trace`] captured when the error was raised, the
//! innermost source file as a `miette::NamedSource` and the byte span of the
//! innermost position, so the CLI can render a snippet with `miette`.
//!
//! Recoverable problems are [`Warning`]s. They are routed through the
//! interpreter, which drops silenced categories, then either hands them to a
//! [`WarningSink`], ignores them, or escalates them to
//! [`PreprocError::Escalated`] depending on the [`WarningMode`].
//!
//! # Error Construction
//!
//! - Use `err_msg!` for a bare error: `err_msg!(Argument, "invalid index {}", n)`.
//!   The context is filled in by the interpreter when the error leaves the
//!   directive that raised it.
//! - Use `err_ctx!` when the context is already known (a pre-built
//!   [`ErrorContext`]).

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use clap::ValueEnum;
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use serde::{Deserialize, Serialize};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

use crate::runtime::source::Position;

pub type SourceArc = Arc<NamedSource<String>>;

// ============================================================================
// LOCATIONS AND TRACES
// ============================================================================

/// Byte range inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One resolved context frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub source: String,
    pub position: Position,
    pub description: String,
}

/// The rendered context stack at the moment a diagnostic was raised,
/// outermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The innermost resolved location, if any.
    pub fn innermost(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}:{}:{}",
                entry.source, entry.position.line, entry.position.column
            )?;
            if !entry.description.is_empty() {
                write!(f, ": {}", entry.description)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Type-safe error classification, mirrors the [`PreprocError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Syntax,
    UnknownDirective,
    Condition,
    Argument,
    RecursionLimit,
    DuplicateLabel,
    Io,
    Raised,
    Escalated,
    Config,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Syntax => "syntax",
            ErrorType::UnknownDirective => "unknown-directive",
            ErrorType::Condition => "condition",
            ErrorType::Argument => "argument",
            ErrorType::RecursionLimit => "recursion-limit",
            ErrorType::DuplicateLabel => "duplicate-label",
            ErrorType::Io => "io",
            ErrorType::Raised => "raised",
            ErrorType::Escalated => "escalated-warning",
            ErrorType::Config => "config",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location information attached to an error.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// Context stack at raise time, outermost first.
    pub trace: Trace,
    /// The innermost source file.
    pub source: Option<SourceArc>,
    /// The innermost position inside `source`.
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..Self::default()
        }
    }

    /// True once the interpreter has resolved a location for this error.
    pub fn is_located(&self) -> bool {
        !self.trace.is_empty()
    }
}

/// Every fatal condition the preprocessor can raise.
#[derive(Debug, Error)]
pub enum PreprocError {
    /// Unmatched delimiters or block closes, invalid directive names, unterminated strings.
    #[error("{message}")]
    Syntax { message: String, ctx: ErrorContext },
    #[error("{message}")]
    UnknownDirective { message: String, ctx: ErrorContext },
    #[error("{message}")]
    Condition { message: String, ctx: ErrorContext },
    /// Malformed numeric, range, flag or identifier arguments.
    #[error("{message}")]
    Argument { message: String, ctx: ErrorContext },
    #[error("{message}")]
    RecursionLimit { message: String, ctx: ErrorContext },
    #[error("{message}")]
    DuplicateLabel { message: String, ctx: ErrorContext },
    #[error("{message}")]
    Io { message: String, ctx: ErrorContext },
    /// Raised on purpose by the `error` command.
    #[error("{message}")]
    Raised { message: String, ctx: ErrorContext },
    /// A warning promoted by the `error` warning mode.
    #[error("{message}")]
    Escalated { message: String, ctx: ErrorContext },
    #[error("{message}")]
    Config { message: String, ctx: ErrorContext },
}

impl PreprocError {
    pub fn ctx(&self) -> &ErrorContext {
        match self {
            PreprocError::Syntax { ctx, .. }
            | PreprocError::UnknownDirective { ctx, .. }
            | PreprocError::Condition { ctx, .. }
            | PreprocError::Argument { ctx, .. }
            | PreprocError::RecursionLimit { ctx, .. }
            | PreprocError::DuplicateLabel { ctx, .. }
            | PreprocError::Io { ctx, .. }
            | PreprocError::Raised { ctx, .. }
            | PreprocError::Escalated { ctx, .. }
            | PreprocError::Config { ctx, .. } => ctx,
        }
    }

    pub fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            PreprocError::Syntax { ctx, .. }
            | PreprocError::UnknownDirective { ctx, .. }
            | PreprocError::Condition { ctx, .. }
            | PreprocError::Argument { ctx, .. }
            | PreprocError::RecursionLimit { ctx, .. }
            | PreprocError::DuplicateLabel { ctx, .. }
            | PreprocError::Io { ctx, .. }
            | PreprocError::Raised { ctx, .. }
            | PreprocError::Escalated { ctx, .. }
            | PreprocError::Config { ctx, .. } => ctx,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PreprocError::Syntax { message, .. }
            | PreprocError::UnknownDirective { message, .. }
            | PreprocError::Condition { message, .. }
            | PreprocError::Argument { message, .. }
            | PreprocError::RecursionLimit { message, .. }
            | PreprocError::DuplicateLabel { message, .. }
            | PreprocError::Io { message, .. }
            | PreprocError::Raised { message, .. }
            | PreprocError::Escalated { message, .. }
            | PreprocError::Config { message, .. } => message,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            PreprocError::Syntax { .. } => ErrorType::Syntax,
            PreprocError::UnknownDirective { .. } => ErrorType::UnknownDirective,
            PreprocError::Condition { .. } => ErrorType::Condition,
            PreprocError::Argument { .. } => ErrorType::Argument,
            PreprocError::RecursionLimit { .. } => ErrorType::RecursionLimit,
            PreprocError::DuplicateLabel { .. } => ErrorType::DuplicateLabel,
            PreprocError::Io { .. } => ErrorType::Io,
            PreprocError::Raised { .. } => ErrorType::Raised,
            PreprocError::Escalated { .. } => ErrorType::Escalated,
            PreprocError::Config { .. } => ErrorType::Config,
        }
    }

    /// The context trace the error was raised under.
    pub fn trace(&self) -> &Trace {
        &self.ctx().trace
    }

    /// Attaches a help message, keeping any location already resolved.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.ctx_mut().help = Some(help.into());
        self
    }
}

impl Diagnostic for PreprocError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("preproc::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let ctx = self.ctx();
        match (&ctx.help, ctx.trace.entries.len() > 1) {
            (Some(help), true) => Some(Box::new(format!("{help}\nexpansion trace:\n{}", ctx.trace))),
            (Some(help), false) => Some(Box::new(help)),
            (None, true) => Some(Box::new(format!("expansion trace:\n{}", ctx.trace))),
            (None, false) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx().source.as_ref().map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.ctx();
        let span = ctx.span?;
        ctx.source.as_ref()?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = ctx
            .trace
            .innermost()
            .map(|entry| entry.description.clone())
            .filter(|d| !d.is_empty());
        Some(Box::new(std::iter::once(LabeledSpan::new(label, span.start, len))))
    }
}

/// Constructs a `PreprocError` variant with a formatted message and an empty context.
///
/// The interpreter resolves the location when the error propagates out of the
/// directive that raised it.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)+) => {
        $crate::PreprocError::$variant {
            message: format!($($arg)+),
            ctx: $crate::diagnostics::ErrorContext::none(),
        }
    };
}

/// Constructs a `PreprocError` variant with a message and a pre-built `ErrorContext`.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $ctx:expr) => {
        $crate::PreprocError::$variant {
            message: $msg.to_string(),
            ctx: $ctx,
        }
    };
}

// ============================================================================
// WARNINGS
// ============================================================================

/// What to do with a warning that is not silenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WarningMode {
    /// Report through the warning sink and continue.
    #[default]
    Print,
    /// Drop silently.
    Hide,
    /// Abort the run as if an error had been raised.
    Error,
}

/// Identifies a kind of warning so it can be silenced individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCategory {
    /// A command that takes no arguments was given some.
    ExtraArguments,
    /// An end delimiter with no begin delimiter before it.
    UnmatchedClose,
    /// An `atlabel` block whose label never occurs.
    NoMatchingLabel,
    /// A `paste` of a clipboard nothing was ever cut into.
    UndefinedClipboard,
    /// Raised by the `warning` command.
    User,
}

impl WarningCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCategory::ExtraArguments => "extra-arguments",
            WarningCategory::UnmatchedClose => "unmatched-close",
            WarningCategory::NoMatchingLabel => "no-matching-label",
            WarningCategory::UndefinedClipboard => "undefined-clipboard",
            WarningCategory::User => "user",
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recoverable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub category: WarningCategory,
    pub message: String,
    pub trace: Trace,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}]: {}", self.category, self.message)?;
        if !self.trace.is_empty() {
            write!(f, "\n{}", self.trace)?;
        }
        Ok(())
    }
}

/// Receives the warnings that survive silencing in `print` mode.
pub trait WarningSink {
    fn emit(&mut self, warning: &Warning);
}

/// Prints warnings to stderr, colored when stderr is a terminal.
pub struct StderrSink {
    stream: StandardStream,
}

impl StderrSink {
    pub fn new() -> Self {
        let choice = if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stream: StandardStream::stderr(choice),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningSink for StderrSink {
    fn emit(&mut self, warning: &Warning) {
        let stream = &mut self.stream;
        let _ = stream.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true));
        let _ = write!(stream, "warning");
        let _ = stream.reset();
        let _ = writeln!(stream, "[{}]: {}", warning.category, warning.message.replace('\n', "\n  "));
        for entry in &warning.trace.entries {
            let _ = write!(
                stream,
                "  --> {}:{}:{}",
                entry.source, entry.position.line, entry.position.column
            );
            if entry.description.is_empty() {
                let _ = writeln!(stream);
            } else {
                let _ = writeln!(stream, " ({})", entry.description);
            }
        }
    }
}

/// Collects warnings into a shared buffer, for tests and library callers.
#[derive(Clone, Default)]
pub struct CollectingSink(pub Rc<RefCell<Vec<Warning>>>);

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything collected so far.
    pub fn warnings(&self) -> Vec<Warning> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl WarningSink for CollectingSink {
    fn emit(&mut self, warning: &Warning) {
        self.0.borrow_mut().push(warning.clone());
    }
}

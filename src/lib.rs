//! A delimiter-driven macro and templating preprocessor.
//!
//! Text is copied through unchanged except for directives written between a
//! configurable begin and end delimiter (`{% ` and ` %}` by default):
//!
//! ```
//! use preproc::{CollectingSink, Config, Preprocessor};
//!
//! let mut pre = Preprocessor::new(Config::default())
//!     .unwrap()
//!     .with_sink(CollectingSink::new());
//! let out = pre
//!     .process("doc", "{% def name world %}hello {% name %}")
//!     .unwrap();
//! assert_eq!(out, "hello world");
//! ```

pub mod cli;
pub mod diagnostics;
pub mod directives;
pub mod runtime;
pub mod syntax;

pub use crate::diagnostics::{
    CollectingSink, ErrorContext, ErrorType, PreprocError, StderrSink, Warning, WarningCategory,
    WarningMode, WarningSink,
};
pub use crate::runtime::{Config, Preprocessor};

pub const PREPROCESSOR_NAME: &str = "preproc";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Runtime state of the preprocessor.
//!
//! The [`interpreter::Preprocessor`] owns everything a run mutates: the
//! directive registry, the context stack, the deferred resolution store and
//! the final actions of each nesting level.

pub mod actions;
pub mod config;
pub mod context;
pub mod interpreter;
pub mod registry;
pub mod source;
pub mod store;

pub use config::Config;
pub use interpreter::Preprocessor;

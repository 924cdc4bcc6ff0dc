//! Lexical layer of the preprocessor: delimiter scanning, argument splitting
//! and the condition grammar.

pub mod args;
pub mod condition;
pub mod tokens;

pub use tokens::{Delimiters, Scanner, Token, TokenKind};

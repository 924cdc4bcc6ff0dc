//! The directive registry: identifier to handler tables for commands and
//! blocks, with the descriptions shown by `--directives`.
//!
//! Commands and blocks live in separate namespaces, so one identifier can be
//! both. Registering an existing identifier replaces the previous entry; this
//! is how `-D` defines and in-document `def` shadow built-ins.

use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

use crate::runtime::interpreter::Preprocessor;
use crate::syntax::args::is_identifier;
use crate::{err_msg, PreprocError};

// ============================================================================
// HANDLER TYPES
// ============================================================================

/// Built-in command: receives the raw argument text.
pub type CommandFn = fn(pre: &mut Preprocessor, args: &str) -> Result<String, PreprocError>;

/// Built-in block: receives the raw argument text and the raw, unparsed body.
pub type BlockFn =
    fn(pre: &mut Preprocessor, args: &str, body: &str) -> Result<String, PreprocError>;

/// A command created by `def` (or `-D`). Without parameters the body is
/// printed (and parsed) as is; with parameters it is a macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub params: Option<Vec<String>>,
    pub body: String,
}

/// A command created by `deflist`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDefinition {
    pub name: String,
    pub raw: String,
    pub items: Vec<String>,
}

#[derive(Clone)]
pub enum CommandHandler {
    Builtin(CommandFn),
    Defined(Rc<Definition>),
    List(Rc<ListDefinition>),
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandHandler::Builtin(_) => write!(f, "Builtin(..)"),
            CommandHandler::Defined(def) => f.debug_tuple("Defined").field(def).finish(),
            CommandHandler::List(list) => f.debug_tuple("List").field(list).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Command,
    Block,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Command => "command",
            DirectiveKind::Block => "block",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub description: String,
    pub handler: CommandHandler,
}

#[derive(Clone)]
pub struct BlockEntry {
    pub description: String,
    pub handler: BlockFn,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Default, Clone)]
pub struct DirectiveRegistry {
    commands: HashMap<String, CommandEntry>,
    blocks: HashMap<String, BlockEntry>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a command.
    pub fn register_command(
        &mut self,
        name: &str,
        description: impl Into<String>,
        handler: CommandHandler,
    ) -> Result<(), PreprocError> {
        if !is_identifier(name) {
            return Err(err_msg!(Argument, "invalid identifier \"{}\"", name));
        }
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                description: description.into(),
                handler,
            },
        );
        Ok(())
    }

    /// Registers (or replaces) a block. Its close directive is `end<name>`.
    pub fn register_block(
        &mut self,
        name: &str,
        description: impl Into<String>,
        handler: BlockFn,
    ) -> Result<(), PreprocError> {
        if !is_identifier(name) {
            return Err(err_msg!(Argument, "invalid identifier \"{}\"", name));
        }
        self.blocks.insert(
            name.to_string(),
            BlockEntry {
                description: description.into(),
                handler,
            },
        );
        Ok(())
    }

    /// Registration for the built-in tables, whose names are known identifiers.
    pub(crate) fn builtin_command(&mut self, name: &str, description: &str, handler: CommandFn) {
        debug_assert!(is_identifier(name), "built-in name {name:?}");
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                description: description.to_string(),
                handler: CommandHandler::Builtin(handler),
            },
        );
    }

    pub(crate) fn builtin_block(&mut self, name: &str, description: &str, handler: BlockFn) {
        debug_assert!(is_identifier(name), "built-in name {name:?}");
        self.blocks.insert(
            name.to_string(),
            BlockEntry {
                description: description.to_string(),
                handler,
            },
        );
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&BlockEntry> {
        self.blocks.get(name)
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn unregister_command(&mut self, name: &str) -> Option<CommandEntry> {
        self.commands.remove(name)
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Renders help. An empty topic lists every directive with the first line
    /// of its description; a directive name shows its full description.
    pub fn help(&self, topic: &str) -> String {
        let topic = topic.trim();
        if topic.is_empty() {
            return self.overview();
        }
        let mut out = String::new();
        let found = [
            (DirectiveKind::Command, self.commands.get(topic).map(|e| &e.description)),
            (DirectiveKind::Block, self.blocks.get(topic).map(|e| &e.description)),
        ];
        for (kind, description) in found {
            let Some(description) = description else {
                continue;
            };
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{} {}:", kind.as_str(), topic);
            if description.trim().is_empty() {
                out.push_str("  no help available\n");
            }
            for line in description.trim().lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        if out.is_empty() {
            format!("unknown command or block \"{}\"\n", topic)
        } else {
            out
        }
    }

    fn overview(&self) -> String {
        let width = self
            .commands
            .keys()
            .chain(self.blocks.keys())
            .map(String::len)
            .max()
            .unwrap_or(0);
        let mut out = String::from("Commands:\n");
        for name in self.command_names() {
            let summary = first_line(&self.commands[name].description);
            let _ = writeln!(out, "  {:width$}  {}", name, summary, width = width);
        }
        out.push_str("\nBlocks:\n");
        for name in self.block_names() {
            let summary = first_line(&self.blocks[name].description);
            let _ = writeln!(out, "  {:width$}  {}", name, summary, width = width);
        }
        out
    }
}

fn first_line(description: &str) -> &str {
    description.trim().lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOOP: CommandFn = |_, _| Ok(String::new());
    const BODY: BlockFn = |_, _, body| Ok(body.to_string());

    fn registry() -> DirectiveRegistry {
        let mut registry = DirectiveRegistry::new();
        registry.builtin_command("line", "Prints the current line.\nUsage: line", NOOP);
        registry.builtin_block("void", "Parses its body, prints nothing.", BODY);
        registry.builtin_command("void", "", NOOP);
        registry
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = registry();
        registry
            .register_command(
                "line",
                "defined",
                CommandHandler::Defined(Rc::new(Definition {
                    name: "line".to_string(),
                    params: None,
                    body: "42".to_string(),
                })),
            )
            .unwrap();
        let entry = registry.command("line").unwrap();
        assert!(matches!(&entry.handler, CommandHandler::Defined(def) if def.body == "42"));
        assert!(registry.has_block("void") && registry.has_command("void"));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register_command("1abc", "", CommandHandler::Builtin(NOOP))
            .unwrap_err();
        assert_eq!(err.error_type(), crate::diagnostics::ErrorType::Argument);
        assert!(registry.register_block("a b", "", BODY).is_err());
    }

    #[test]
    fn help_lists_and_details() {
        let registry = registry();
        let all = registry.help("");
        assert!(all.starts_with("Commands:\n"));
        assert!(all.contains("line  Prints the current line."));
        assert!(!all.contains("Usage: line"));
        assert!(all.contains("\nBlocks:\n"));

        let one = registry.help("line");
        assert_eq!(one, "command line:\n  Prints the current line.\n  Usage: line\n");

        let both = registry.help("void");
        assert!(both.contains("command void:\n  no help available"));
        assert!(both.contains("block void:\n  Parses its body"));

        assert_eq!(registry.help("nope"), "unknown command or block \"nope\"\n");
    }
}

//! The recursive interpreter.
//!
//! `parse` repeatedly expands the innermost directive of its string: the
//! leftmost begin delimiter immediately followed by an end delimiter. The
//! directive text is replaced in place by the handler's output, which is never
//! rescanned at the same level. Block handlers receive their raw body and call
//! back into [`Preprocessor::parse_body`] themselves.
//!
//! Every nested parse pushes a [`Frame`] describing where its text came from,
//! and every splice is recorded in the frame of the string being spliced, so
//! errors and warnings raised at any depth resolve to a source location.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::diagnostics::{
    StderrSink, Trace, Warning, WarningCategory, WarningMode, WarningSink,
};
use crate::directives::register_all_directives;
use crate::runtime::actions::FinalAction;
use crate::runtime::config::{parse_define, Config};
use crate::runtime::context::{ContextStack, Frame};
use crate::runtime::registry::{CommandHandler, Definition, DirectiveKind, DirectiveRegistry};
use crate::runtime::source::{Position, SourceFile};
use crate::runtime::store::{rebuild, CommandVars, Marker};
use crate::syntax::args::split_identifier;
use crate::syntax::{Delimiters, Scanner, Token};
use crate::{err_msg, PreprocError};

// ============================================================================
// DIRECTIVE SITE
// ============================================================================

/// Offsets of the directive being expanded, relative to the string of the
/// level that found it.
///
/// ```text
/// {% name args %}body{% endname %}
/// ^begin   ^args  ^end  ^body_end  ^block_end
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSite {
    /// Index of that level's frame in the context stack.
    pub frame: usize,
    pub begin: usize,
    pub args_begin: usize,
    pub args_end: usize,
    pub end: usize,
    /// For blocks: start and end of the close directive.
    pub body_end: Option<usize>,
    pub block_end: Option<usize>,
}

// ============================================================================
// PREPROCESSOR
// ============================================================================

pub struct Preprocessor {
    config: Config,
    scanner: Scanner,
    registry: DirectiveRegistry,
    /// Loop variables. They shadow commands of the same name.
    bindings: HashMap<String, String>,
    vars: CommandVars,
    context: ContextStack,
    /// Final actions of the levels being expanded, innermost last.
    final_actions: Vec<FinalAction>,
    depth: usize,
    site: Option<DirectiveSite>,
    finalizing: bool,
    sink: Box<dyn WarningSink>,
}

impl Preprocessor {
    /// Builds a preprocessor with every built-in directive and the configured
    /// defines registered.
    pub fn new(config: Config) -> Result<Self, PreprocError> {
        config.validate()?;
        let scanner = Scanner::new(config.delimiters())?;
        let mut registry = DirectiveRegistry::new();
        register_all_directives(&mut registry);
        let defines = config.defines.clone();
        let mut pre = Self {
            config,
            scanner,
            registry,
            bindings: HashMap::new(),
            vars: CommandVars::new(),
            context: ContextStack::new(),
            final_actions: Vec::new(),
            depth: 0,
            site: None,
            finalizing: false,
            sink: Box::new(StderrSink::new()),
        };
        for define in &defines {
            let (name, value) = parse_define(define)?;
            pre.define(name, value, "defined on the command line")?;
        }
        Ok(pre)
    }

    /// Routes printed warnings to `sink` instead of stderr.
    pub fn with_sink(mut self, sink: impl WarningSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DirectiveRegistry {
        &mut self.registry
    }

    pub fn vars(&self) -> &CommandVars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut CommandVars {
        &mut self.vars
    }

    pub fn context(&self) -> &ContextStack {
        &self.context
    }

    /// Current number of nested `parse` calls.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The directive being expanded, if any.
    pub fn site(&self) -> Option<DirectiveSite> {
        self.site
    }

    /// True while the deferred pastes of a finished run are being resolved.
    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Expands a whole document. `name` is used in diagnostics.
    pub fn process(&mut self, name: &str, text: &str) -> Result<String, PreprocError> {
        self.vars = CommandVars::for_document(text);
        self.context = ContextStack::new();
        self.final_actions.clear();
        self.depth = 0;
        self.site = None;
        self.finalizing = false;
        let source = SourceFile::new(name, text);
        self.context.push(Frame::root(source, ""));
        let result = self.parse(text);
        self.context.pop();
        result
    }

    /// Expands `text` against the frame on top of the context stack (an
    /// anonymous one when the stack is empty). The outermost call also runs
    /// finalization.
    pub fn parse(&mut self, text: &str) -> Result<String, PreprocError> {
        let anonymous = self.context.is_empty();
        if anonymous {
            self.context.push(Frame::root(SourceFile::anonymous(text), ""));
        }
        self.depth += 1;
        let preserved = self.final_actions.len();
        let result = self.parse_level(text, preserved);
        self.final_actions.truncate(preserved);
        self.depth -= 1;
        if anonymous {
            self.context.pop();
        }
        result
    }

    fn parse_level(&mut self, text: &str, preserved: usize) -> Result<String, PreprocError> {
        let frame = self.context.depth() - 1;
        if let Some(limit) = self.config.recursion_limit() {
            if self.depth > limit {
                let err = err_msg!(
                    RecursionLimit,
                    "maximum recursion depth exceeded (limit is {})",
                    limit
                )
                .with_help("a directive probably expands to itself; the limit is set by max-recursion-depth");
                return Err(self.locate_at(err, frame, 0));
            }
        }
        trace!(depth = self.depth, len = text.len(), "parse");
        let mut out = self.expand(text, frame)?;
        if self.depth == 1 {
            out = self.finalize(out)?;
        }
        let actions: Vec<FinalAction> = self.final_actions.drain(preserved..).collect();
        if !actions.is_empty() {
            debug!(count = actions.len(), depth = self.depth, "running final actions");
        }
        for action in &actions {
            out = action.apply(&out);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Expansion loop
    // ------------------------------------------------------------------

    fn expand(&mut self, text: &str, frame: usize) -> Result<String, PreprocError> {
        let mut text = text.to_string();
        let mut tokens: Vec<Token> = self.scanner.tokens(&text).collect();
        let mut escapes = self.scanner.escapes(&text);
        self.drop_leading_closes(&mut tokens)?;

        while tokens.len() > 1 {
            let Some(index) = tokens
                .windows(2)
                .position(|pair| pair[0].is_open() && pair[1].is_close())
            else {
                break;
            };
            let (open, close) = (tokens[index], tokens[index + 1]);
            let (replacement, end) = self.dispatch(&text, frame, open, close)?;
            splice(&mut text, &mut tokens, &mut escapes, open.start, end, &replacement);
            self.context
                .frame_mut(frame)
                .record_splice(open.start, end - open.start, replacement.len());
            self.drop_leading_closes(&mut tokens)?;
        }

        if let Some(open) = tokens.iter().rev().find(|t| t.is_open()) {
            let begin = self.scanner.begin().to_string();
            let end = self.scanner.end().to_string();
            let err = err_msg!(Syntax, "unmatched \"{}\" token", begin).with_help(format!(
                "add a matching \"{end}\" or use \"{begin}begin{end}\" to print it"
            ));
            return Err(self.locate_at(err, frame, open.start));
        }

        let marker = self.scanner.escape().len();
        for &at in escapes.iter().rev() {
            text.replace_range(at..at + marker, "");
        }
        Ok(text)
    }

    fn drop_leading_closes(&mut self, tokens: &mut Vec<Token>) -> Result<(), PreprocError> {
        let leading = tokens.iter().take_while(|t| t.is_close()).count();
        if leading == 0 {
            return Ok(());
        }
        tokens.drain(..leading);
        if self.config.warn_unmatched_close {
            let message = format!("unmatched closing token \"{}\"", self.scanner.end());
            for _ in 0..leading {
                self.warn(WarningCategory::UnmatchedClose, &message)?;
            }
        }
        Ok(())
    }

    /// Runs the directive between `open` and `close`. Returns its output and
    /// the offset where the replaced text ends.
    fn dispatch(
        &mut self,
        text: &str,
        frame: usize,
        open: Token,
        close: Token,
    ) -> Result<(String, usize), PreprocError> {
        let inner = if close.start >= open.end {
            &text[open.end..close.start]
        } else {
            ""
        };
        let Some((name, _, rest_at)) = split_identifier(inner) else {
            let err = err_msg!(Syntax, "invalid command name \"{}\"", inner);
            return Err(self.locate_at(err, frame, open.start));
        };
        let args_begin = open.end + rest_at;
        let args = &text[args_begin..close.start];
        let mut site = DirectiveSite {
            frame,
            begin: open.start,
            args_begin,
            args_end: close.start,
            end: close.end,
            body_end: None,
            block_end: None,
        };

        if let Some(handler) = self.registry.block(name).map(|entry| entry.handler) {
            match self.find_endblock(name, &text[close.end..]) {
                Some((body_end, block_end)) => {
                    let body = &text[close.end..close.end + body_end];
                    site.body_end = Some(close.end + body_end);
                    site.block_end = Some(close.end + block_end);
                    let out = self.run_directive(site, DirectiveKind::Block, name, |pre| {
                        handler(pre, args, body)
                    })?;
                    return Ok((out, close.end + block_end));
                }
                None if !self.is_command(name) => {
                    let err = err_msg!(Syntax, "no matching endblock for {} block", name)
                        .with_help(format!(
                            "close it with \"{}end{}{}\"",
                            self.scanner.begin(),
                            name,
                            self.scanner.end()
                        ));
                    return Err(self.locate_at(err, frame, open.start));
                }
                None => {}
            }
        }

        if let Some(value) = self.bindings.get(name).cloned() {
            let out = self.run_directive(site, DirectiveKind::Command, name, |pre| {
                if !args.trim().is_empty() {
                    pre.warn(
                        WarningCategory::ExtraArguments,
                        &format!("the loop variable {} takes no arguments", name),
                    )?;
                }
                Ok(value)
            })?;
            return Ok((out, close.end));
        }

        if let Some(handler) = self.registry.command(name).map(|entry| entry.handler.clone()) {
            let out = self.run_directive(site, DirectiveKind::Command, name, |pre| {
                pre.call_command(name, &handler, args)
            })?;
            return Ok((out, close.end));
        }

        let err = err_msg!(UnknownDirective, "undefined command or block \"{}\"", name);
        Err(self.locate_at(err, frame, open.start))
    }

    fn call_command(
        &mut self,
        name: &str,
        handler: &CommandHandler,
        args: &str,
    ) -> Result<String, PreprocError> {
        match handler {
            CommandHandler::Builtin(f) => f(self, args),
            CommandHandler::Defined(definition) => {
                crate::directives::defs::expand_definition(self, definition, args)
            }
            CommandHandler::List(list) => crate::directives::defs::index_list(self, name, list, args),
        }
    }

    fn run_directive<F>(
        &mut self,
        site: DirectiveSite,
        kind: DirectiveKind,
        name: &str,
        f: F,
    ) -> Result<String, PreprocError>
    where
        F: FnOnce(&mut Self) -> Result<String, PreprocError>,
    {
        debug!(directive = name, kind = kind.as_str(), depth = self.depth, "dispatch");
        let frame = self
            .context
            .frame(site.frame)
            .copy_at(site.begin, format!("in {} {}", kind.as_str(), name));
        let saved = self.site.replace(site);
        let result = self.with_frame(frame, f);
        self.site = saved;
        result
    }

    /// Finds the `end<name>` directive closing a block whose body starts at
    /// `rest`, skipping nested blocks of the same name. Returns the start and
    /// end offsets of the close directive in `rest`.
    pub fn find_endblock(&self, name: &str, rest: &str) -> Option<(usize, usize)> {
        let end_token = self.scanner.end();
        let close_name = format!("end{name}");
        let mut depth = 0usize;
        for token in self.scanner.tokens(rest).filter(Token::is_open) {
            let after = &rest[token.end..];
            let skipped = after.len() - after.trim_start().len();
            let word = &after[skipped..];
            if let Some(tail) = word.strip_prefix(close_name.as_str()) {
                if let Some(len) = closes_directive(tail, end_token) {
                    if depth == 0 {
                        let end = token.end + skipped + close_name.len() + len;
                        return Some((token.start, end));
                    }
                    depth -= 1;
                    continue;
                }
            }
            if let Some(tail) = word.strip_prefix(name) {
                let boundary = tail
                    .chars()
                    .next()
                    .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
                if boundary || tail.starts_with(end_token) {
                    depth += 1;
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Nested parsing, used by handlers
    // ------------------------------------------------------------------

    /// Parses `text` under `frame`, popping it on every exit path.
    pub fn parse_in_frame(&mut self, frame: Frame, text: &str) -> Result<String, PreprocError> {
        self.with_frame(frame, |pre| pre.parse(text))
    }

    /// Parses text that is a slice of the current directive's string starting
    /// at `offset` in it.
    pub fn parse_at(
        &mut self,
        offset: usize,
        text: &str,
        description: &str,
    ) -> Result<String, PreprocError> {
        let frame = self.site_frame(offset, description);
        self.parse_in_frame(frame, text)
    }

    /// Parses a block body, or a slice of it starting `offset` bytes in.
    pub fn parse_body(
        &mut self,
        offset: usize,
        text: &str,
        description: &str,
    ) -> Result<String, PreprocError> {
        let body = self.site.map_or(0, |site| site.end);
        self.parse_at(body + offset, text, description)
    }

    /// Parses generated text (not a slice of any source), reported at the
    /// arguments of the current directive.
    pub fn parse_generated(&mut self, text: &str, description: &str) -> Result<String, PreprocError> {
        let args = self.site.map_or(0, |site| site.args_begin);
        let frame = self.site_frame(args, description).pinned();
        self.parse_in_frame(frame, text)
    }

    /// A snapshot of the current directive's level frame rebased at `offset`.
    pub fn site_frame(&self, offset: usize, description: &str) -> Frame {
        match self.site {
            Some(site) => self.context.frame(site.frame).copy_at(offset, description),
            None => self
                .context
                .copy_top(offset, description)
                .unwrap_or_else(|| Frame::root(SourceFile::anonymous(""), description)),
        }
    }

    /// Temporarily switches delimiters, returning the previous scanner.
    pub fn swap_scanner(&mut self, scanner: Scanner) -> Scanner {
        std::mem::replace(&mut self.scanner, scanner)
    }

    pub fn delimiters(&self) -> Delimiters {
        self.scanner.delimiters().clone()
    }

    // ------------------------------------------------------------------
    // Registry helpers
    // ------------------------------------------------------------------

    /// True when `name` is a command or a loop variable.
    pub fn is_command(&self, name: &str) -> bool {
        self.bindings.contains_key(name) || self.registry.has_command(name)
    }

    /// The test used by `def`/`ndef` conditions.
    pub fn is_defined(&self, name: &str) -> bool {
        self.is_command(name)
    }

    /// Registers `name` as a command printing `value`.
    pub fn define(&mut self, name: &str, value: &str, description: &str) -> Result<(), PreprocError> {
        self.bindings.remove(name);
        self.registry.register_command(
            name,
            description,
            CommandHandler::Defined(Rc::new(Definition {
                name: name.to_string(),
                params: None,
                body: value.to_string(),
            })),
        )
    }

    pub fn bind(&mut self, name: &str, value: String) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn unbind(&mut self, name: &str) -> Option<String> {
        self.bindings.remove(name)
    }

    pub fn queue_final_action(&mut self, action: FinalAction) {
        self.final_actions.push(action);
    }

    pub fn help(&self, topic: &str) -> String {
        self.registry.help(topic)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Source name and position of the directive being expanded.
    pub fn current_position(&self) -> Option<(String, Position)> {
        self.context.current_position()
    }

    /// Reports a warning according to the configured mode. Fails only in
    /// `error` mode.
    pub fn warn(&mut self, category: WarningCategory, message: &str) -> Result<(), PreprocError> {
        if self.config.is_silenced(category) {
            return Ok(());
        }
        match self.config.warning_mode {
            WarningMode::Hide => Ok(()),
            WarningMode::Print => {
                let warning = Warning {
                    category,
                    message: message.to_string(),
                    trace: self.context.trace(),
                };
                self.sink.emit(&warning);
                Ok(())
            }
            WarningMode::Error => {
                let err = err_msg!(Escalated, "{}", message).with_help(format!(
                    "this is a {} warning promoted to an error; silence it with --silence {}",
                    category, category
                ));
                Err(self.locate(err, None))
            }
        }
    }

    /// Runs `f` with `frame` pushed. An error leaving `f` without a location
    /// gets the trace of the stack as it was inside the frame.
    pub(crate) fn with_frame<T, F>(&mut self, frame: Frame, f: F) -> Result<T, PreprocError>
    where
        F: FnOnce(&mut Self) -> Result<T, PreprocError>,
    {
        self.context.push(frame);
        let result = f(self).map_err(|err| self.locate(err, None));
        self.context.pop();
        result
    }

    /// Attaches the current trace to an error that has no location yet.
    fn locate(&self, mut err: PreprocError, extra: Option<Frame>) -> PreprocError {
        if err.ctx().is_located() {
            return err;
        }
        let mut trace: Trace = self.context.trace();
        let innermost = match extra {
            Some(frame) => {
                trace.entries.push(frame.trace_entry());
                Some(frame)
            }
            None => self.context.top().cloned(),
        };
        let ctx = err.ctx_mut();
        ctx.trace = trace;
        if let Some(frame) = innermost {
            ctx.source = Some(frame.source().named_source());
            ctx.span = frame.source().span_at(frame.base_offset());
        }
        err
    }

    fn locate_at(&self, err: PreprocError, frame: usize, offset: usize) -> PreprocError {
        let at = self.context.frame(frame).copy_at(offset, "");
        self.locate(err, Some(at))
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Resolves deferred pastes, then places at-label content at every label.
    fn finalize(&mut self, text: String) -> Result<String, PreprocError> {
        let text = self.resolve_pastes(text)?;

        let atlabels = self.vars.take_atlabels();
        let markers = self.vars.scan_markers(&text);
        debug!(labels = markers.len(), atlabels = atlabels.len(), "resolving labels");
        let mut contents: HashMap<String, String> = HashMap::new();
        for (label, content) in atlabels {
            let used = markers.iter().any(|m| match m.marker {
                Marker::Label(index) => self.vars.label_name(index) == Some(label.as_str()),
                Marker::Paste(_) => false,
            });
            if !used {
                self.warn(
                    WarningCategory::NoMatchingLabel,
                    &format!("no matching label for atlabel block \"{}\"", label),
                )?;
            }
            let content = self.resolve_pastes(content)?;
            contents.insert(label, self.vars.strip_markers(&content)?);
        }
        let vars = &self.vars;
        rebuild(&text, &markers, |span| {
            Ok(match span.marker {
                Marker::Label(index) => vars
                    .label_name(index)
                    .map(|label| contents.get(label).cloned().unwrap_or_default()),
                Marker::Paste(_) => Some(String::new()),
            })
        })
    }

    /// Replaces every deferred paste marker in `text` with its clipboard.
    fn resolve_pastes(&mut self, text: String) -> Result<String, PreprocError> {
        if !self.vars.has_deferred_pastes() {
            return Ok(text);
        }
        let pastes: Vec<_> = self
            .vars
            .scan_markers(&text)
            .into_iter()
            .filter(|m| matches!(m.marker, Marker::Paste(_)))
            .collect();
        if pastes.is_empty() {
            return Ok(text);
        }
        debug!(count = pastes.len(), "resolving deferred pastes");
        self.finalizing = true;
        let resolved = rebuild(&text, &pastes, |span| match span.marker {
            Marker::Paste(index) => crate::directives::deferred::resolve_deferred(self, index).map(Some),
            Marker::Label(_) => Ok(None),
        });
        self.finalizing = false;
        resolved
    }
}

/// Length of `tail` up to and including the end delimiter, when `tail` is
/// only whitespace before it.
pub(crate) fn closes_directive(tail: &str, end_token: &str) -> Option<usize> {
    let mut offset = 0;
    loop {
        let rest = &tail[offset..];
        if rest.starts_with(end_token) {
            return Some(offset + end_token.len());
        }
        let c = rest.chars().next()?;
        if !c.is_whitespace() {
            return None;
        }
        offset += c.len_utf8();
    }
}

/// Replaces `text[start..end]`, dropping the tokens and escapes it covered
/// and shifting the ones after it.
fn splice(
    text: &mut String,
    tokens: &mut Vec<Token>,
    escapes: &mut Vec<usize>,
    start: usize,
    end: usize,
    replacement: &str,
) {
    let shift = |offset: usize| offset + replacement.len() - (end - start);
    tokens.retain(|t| t.end <= start || t.start >= end);
    for token in tokens.iter_mut().filter(|t| t.start >= end) {
        token.start = shift(token.start);
        token.end = shift(token.end);
    }
    escapes.retain(|&e| e < start || e >= end);
    for escape in escapes.iter_mut().filter(|e| **e >= end) {
        *escape = shift(*escape);
    }
    text.replace_range(start..end, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, ErrorType};

    fn run(text: &str) -> Result<String, PreprocError> {
        Preprocessor::new(Config::default())?
            .with_sink(CollectingSink::new())
            .process("test", text)
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(run("").unwrap(), "");
        assert_eq!(run("no directives at all\n").unwrap(), "no directives at all\n");
    }

    #[test]
    fn escaped_delimiters_are_printed_without_the_marker() {
        assert_eq!(run(r"a \{% b \ %} c").unwrap(), "a {% b  %} c");
    }

    #[test]
    fn leading_close_tokens_are_dropped() {
        assert_eq!(run(" %}x{% begin %}").unwrap(), " %}x{% ");
        let sink = CollectingSink::new();
        let config = Config {
            warn_unmatched_close: true,
            ..Config::default()
        };
        let mut pre = Preprocessor::new(config).unwrap().with_sink(sink.clone());
        pre.process("t", "a %} b").unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.warnings()[0].category, WarningCategory::UnmatchedClose);
    }

    #[test]
    fn endblock_search_skips_nested_blocks() {
        let pre = Preprocessor::new(Config::default()).unwrap();
        let rest = "a{% if x %}b{% endif %}c{% endif  %}d";
        let (start, end) = pre.find_endblock("if", rest).unwrap();
        assert_eq!(&rest[start..end], "{% endif  %}");
        assert_eq!(pre.find_endblock("if", "{% iffy %}{% endif %}"), Some((10, 21)));
        assert_eq!(pre.find_endblock("if", "{% if %}{% endif %}"), None);
    }

    #[test]
    fn errors_carry_the_expansion_trace() {
        let err = run("line one\n{% block %}\n  {% nope %}{% endblock %}").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownDirective);
        let trace = err.trace();
        let innermost = trace.innermost().unwrap();
        assert_eq!(innermost.position, Position { line: 3, column: 3 });
        assert!(trace.entries.iter().any(|e| e.description == "in block block"));
        assert!(err.ctx().source.is_some());
    }

    #[test]
    fn unmatched_open_is_a_syntax_error() {
        let err = run("text {% begin").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Syntax);
        assert!(err.to_string().contains("unmatched \"{% \" token"));
        assert_eq!(err.trace().innermost().unwrap().position.column, 6);
    }

    #[test]
    fn depth_and_context_are_restored_after_errors() {
        let mut pre = Preprocessor::new(Config::default())
            .unwrap()
            .with_sink(CollectingSink::new());
        assert!(pre.process("t", "{% void %}{% error %}{% endvoid %}").is_err());
        assert_eq!(pre.depth(), 0);
        assert!(pre.context().is_empty());
        assert_eq!(pre.process("t", "ok").unwrap(), "ok");
    }
}

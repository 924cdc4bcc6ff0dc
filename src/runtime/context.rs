//! The context stack: a chain of "where are we" frames used to map any nested
//! expansion back to a location in its source file.
//!
//! Each nested `parse` runs against a string that started life as a slice of
//! some source file (a block body, an included file, a macro body). A
//! [`Frame`] remembers which file and at which offset that slice started, and
//! records every splice the interpreter performs on the string so offsets in
//! the partially expanded text can be mapped back to the original text.

use std::rc::Rc;

use crate::diagnostics::{Trace, TraceEntry};
use crate::runtime::source::{Position, SourceFile};

/// One in-place replacement performed on the string a frame describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Splice {
    start: usize,
    old_len: usize,
    new_len: usize,
}

#[derive(Debug, Clone)]
pub struct Frame {
    source: Rc<SourceFile>,
    base: usize,
    description: String,
    splices: Vec<Splice>,
    /// Every offset resolves to `base`. Used for text that is not a slice of
    /// the source, like the body of a defined command.
    pinned: bool,
}

impl Frame {
    /// A frame covering a whole source file.
    pub fn root(source: Rc<SourceFile>, description: impl Into<String>) -> Self {
        Self {
            source,
            base: 0,
            description: description.into(),
            splices: Vec::new(),
            pinned: false,
        }
    }

    /// This frame with every offset resolving to its base.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn source(&self) -> &Rc<SourceFile> {
        &self.source
    }

    pub fn base_offset(&self) -> usize {
        self.base
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Maps an offset in the (partially expanded) string this frame describes
    /// back to a byte offset in the source file. Offsets inside replaced text
    /// map to the start of the directive that produced it.
    pub fn true_offset(&self, relative: usize) -> usize {
        if self.pinned {
            return self.base;
        }
        let mut offset = relative;
        for splice in self.splices.iter().rev() {
            if offset >= splice.start + splice.new_len {
                offset = offset - splice.new_len + splice.old_len;
            } else if offset > splice.start {
                offset = splice.start;
            }
        }
        self.base + offset
    }

    pub fn position(&self, relative: usize) -> Position {
        self.source.position(self.true_offset(relative))
    }

    /// Records that `old_len` bytes at `start` were replaced by `new_len` bytes.
    pub fn record_splice(&mut self, start: usize, old_len: usize, new_len: usize) {
        if !self.pinned && (old_len != 0 || new_len != 0) {
            self.splices.push(Splice {
                start,
                old_len,
                new_len,
            });
        }
    }

    /// A snapshot of this frame rebased at `relative`, for content that is
    /// parsed later (or deeper) but must be reported against this location.
    pub fn copy_at(&self, relative: usize, description: impl Into<String>) -> Frame {
        Frame {
            source: Rc::clone(&self.source),
            base: self.true_offset(relative),
            description: description.into(),
            splices: Vec::new(),
            pinned: self.pinned,
        }
    }

    pub(crate) fn trace_entry(&self) -> TraceEntry {
        TraceEntry {
            source: self.source.name().to_string(),
            position: self.source.position(self.base),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. Every push is paired with exactly one pop by
    /// the interpreter, so an empty stack here is a bug.
    pub fn pop(&mut self) -> Option<Frame> {
        debug_assert!(!self.frames.is_empty(), "context stack underflow");
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    pub fn frame_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }

    /// Non-mutating snapshot of the innermost frame rebased at `relative`.
    pub fn copy_top(&self, relative: usize, description: impl Into<String>) -> Option<Frame> {
        self.top().map(|frame| frame.copy_at(relative, description))
    }

    /// Source name and position of the innermost frame.
    pub fn current_position(&self) -> Option<(String, Position)> {
        self.top()
            .map(|frame| (frame.source.name().to_string(), frame.source.position(frame.base)))
    }

    /// Every frame resolved to a location, outermost first.
    pub fn trace(&self) -> Trace {
        Trace {
            entries: self.frames.iter().map(Frame::trace_entry).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(text: &str) -> Frame {
        Frame::root(SourceFile::new("doc", text), "")
    }

    #[test]
    fn splices_map_back_to_source_offsets() {
        // "{% line %}\n\n\n{% line %}" after the first directive became "1"
        let mut frame = root("{% line %}\n\n\n{% line %}");
        frame.record_splice(0, 10, 1);
        assert_eq!(frame.true_offset(4), 13);
        assert_eq!(frame.position(4), Position { line: 4, column: 1 });
        // inside the replacement maps to the directive start
        frame.record_splice(4, 10, 3);
        assert_eq!(frame.true_offset(5), 13);
    }

    #[test]
    fn copies_are_rebased_and_do_not_inherit_splices() {
        let mut frame = root("ab{% x %}cd\nef");
        frame.record_splice(2, 7, 0);
        let copy = frame.copy_at(3, "in pasted block");
        assert_eq!(copy.base_offset(), 10);
        assert_eq!(copy.true_offset(2), 12);
        assert_eq!(copy.position(2), Position { line: 2, column: 1 });
    }

    #[test]
    fn pinned_frames_resolve_to_their_base() {
        let frame = root("one\ntwo {% a %}").copy_at(4, "in expansion").pinned();
        assert_eq!(frame.true_offset(0), 4);
        assert_eq!(frame.true_offset(50), 4);
        assert_eq!(frame.copy_at(9, "nested").base_offset(), 4);
    }

    #[test]
    fn trace_lists_frames_outermost_first() {
        let mut stack = ContextStack::new();
        stack.push(root("line one\nline two {% if x %}"));
        let inner = stack.frame(0).copy_at(18, "in block if");
        stack.push(inner);
        let trace = stack.trace();
        assert_eq!(trace.entries.len(), 2);
        assert_eq!(trace.entries[1].position, Position { line: 2, column: 10 });
        assert_eq!(trace.entries[1].description, "in block if");
        assert!(stack.pop().is_some());
        assert_eq!(stack.depth(), 1);
    }
}

use std::rc::Rc;
use std::sync::Arc;

use miette::NamedSource;
use once_cell::unsync::OnceCell;

use crate::diagnostics::{SourceArc, Span};

/// A 1-based line and column, columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A named input text. Offsets handed to [`SourceFile::position`] are byte
/// offsets into `content`; the newline index is built on first use.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    content: String,
    line_starts: OnceCell<Vec<usize>>,
    named: OnceCell<SourceArc>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            content: content.into(),
            line_starts: OnceCell::new(),
            named: OnceCell::new(),
        })
    }

    /// Placeholder used when `parse` is called with no source pushed.
    pub fn anonymous(content: impl Into<String>) -> Rc<Self> {
        Self::new("<string>", content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Resolves a byte offset to a line and column. Offsets past the end
    /// resolve to the end of the text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = self.clamp(offset);
        let starts = self.line_starts.get_or_init(|| {
            std::iter::once(0)
                .chain(self.content.match_indices('\n').map(|(i, _)| i + 1))
                .collect()
        });
        let line = match starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = self.content[starts[line]..offset].chars().count() + 1;
        Position {
            line: line + 1,
            column,
        }
    }

    /// The content as a `miette` source, shared between errors.
    pub fn named_source(&self) -> SourceArc {
        Arc::clone(
            self.named
                .get_or_init(|| Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))),
        )
    }

    /// A one-character span at `offset`, for source snippets. `None` for an
    /// empty file.
    pub fn span_at(&self, offset: usize) -> Option<Span> {
        let last = self.content.chars().next_back()?;
        let start = if offset >= self.content.len() {
            self.content.len() - last.len_utf8()
        } else {
            self.clamp(offset)
        };
        let width = self.content[start..].chars().next().map_or(1, char::len_utf8);
        Some(Span {
            start,
            end: start + width,
        })
    }

    /// Largest char boundary not after `offset`.
    pub fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.content.len());
        while !self.content.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let file = SourceFile::new("f", "ab\ncd\n\nxyz");
        assert_eq!(file.position(0), Position { line: 1, column: 1 });
        assert_eq!(file.position(2), Position { line: 1, column: 3 });
        assert_eq!(file.position(3), Position { line: 2, column: 1 });
        assert_eq!(file.position(6), Position { line: 3, column: 1 });
        assert_eq!(file.position(9), Position { line: 4, column: 3 });
    }

    #[test]
    fn columns_count_characters_and_clamp() {
        let file = SourceFile::new("f", "µµx");
        assert_eq!(file.position(4), Position { line: 1, column: 3 });
        // inside the second µ
        assert_eq!(file.position(3), Position { line: 1, column: 2 });
        assert_eq!(file.position(100), Position { line: 1, column: 4 });
    }

    #[test]
    fn spans_cover_one_character() {
        let file = SourceFile::new("f", "aµ");
        assert_eq!(file.span_at(1), Some(Span { start: 1, end: 3 }));
        assert_eq!(file.span_at(9), Some(Span { start: 1, end: 3 }));
        assert_eq!(SourceFile::new("e", "").span_at(0), None);
    }
}

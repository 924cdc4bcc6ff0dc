//! Deferred resolution store: clipboards, at-label content and the markers
//! `label` and `paste` leave in the output until finalization.
//!
//! A marker is `KIND nonce:digits END`, where `KIND` and `END` are characters
//! from the Unicode private use area, so they survive every final action
//! (case changes, whitespace stripping) unharmed. The nonce is drawn per run
//! and never occurs in the document, so text that happens to contain the same
//! characters is left alone. Finalization scans the finished output once,
//! left to right, and rebuilds it from the recorded marker offsets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::runtime::context::Frame;
use crate::{err_msg, PreprocError};

const LABEL_MARK: char = '\u{E000}';
const PASTE_MARK: char = '\u{E001}';
const END_MARK: char = '\u{E002}';

// ============================================================================
// MARKERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Occurrence of the label with this index in [`CommandVars::label_name`].
    Label(usize),
    /// A paste waiting for finalization, index into the deferred pastes.
    Paste(usize),
}

/// A marker found in a string, `start..end` in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSpan {
    pub start: usize,
    pub end: usize,
    pub marker: Marker,
}

/// A fresh nonce: the clock mixed with a process-wide run counter.
fn draw_nonce() -> String {
    static RUNS: AtomicU64 = AtomicU64::new(0);
    let run = RUNS.fetch_add(1, Ordering::Relaxed);
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() ^ (u64::from(d.subsec_nanos()) << 20));
    format!("{clock:x}.{run:x}")
}

/// Rebuilds `text` left to right. For every marker, `replace` returns the
/// text to put in its place, or `None` to keep the marker as is.
pub fn rebuild<F>(text: &str, markers: &[MarkerSpan], mut replace: F) -> Result<String, PreprocError>
where
    F: FnMut(&MarkerSpan) -> Result<Option<String>, PreprocError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in markers {
        out.push_str(&text[last..span.start]);
        match replace(span)? {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&text[span.start..span.end]),
        }
        last = span.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

// ============================================================================
// COMMAND VARS
// ============================================================================

/// Content stored by `cut`.
#[derive(Debug, Clone)]
pub struct ClipboardEntry {
    /// Where the cut body starts, for diagnostics when it is parsed at paste time.
    pub frame: Frame,
    pub content: String,
    /// Set by `cut --pre-render`: the content is already expanded.
    pub rendered: bool,
}

/// A `paste` issued before anything was cut into its clipboard.
#[derive(Debug, Clone)]
pub struct DeferredPaste {
    pub clipboard: String,
    pub verbatim: bool,
    /// Where the paste directive was, for the undefined-clipboard warning.
    pub frame: Frame,
}

/// Run-scoped state owned by the deferred directives. Created empty by every
/// run, drained by finalization.
#[derive(Debug)]
pub struct CommandVars {
    nonce: String,
    clipboards: HashMap<String, ClipboardEntry>,
    atlabels: Vec<(String, String)>,
    labels: Vec<String>,
    deferred: Vec<DeferredPaste>,
}

impl CommandVars {
    pub fn new() -> Self {
        Self {
            nonce: draw_nonce(),
            clipboards: HashMap::new(),
            atlabels: Vec::new(),
            labels: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Empty vars whose markers can't be confused with anything in `text`.
    pub fn for_document(text: &str) -> Self {
        let mut vars = Self::new();
        while text.contains(&vars.nonce) {
            vars.nonce = draw_nonce();
        }
        vars
    }

    fn encode(&self, kind: char, index: usize) -> String {
        format!("{kind}{}:{index}{END_MARK}", self.nonce)
    }

    /// Every marker of this run in `text`, in order.
    pub fn scan_markers(&self, text: &str) -> Vec<MarkerSpan> {
        let mut found = Vec::new();
        let mut from = 0;
        while let Some(at) = text[from..].find([LABEL_MARK, PASTE_MARK]).map(|i| from + i) {
            let kind = text[at..].chars().next().unwrap_or(LABEL_MARK);
            from = at + kind.len_utf8();
            let Some(tail) = text[from..]
                .strip_prefix(self.nonce.as_str())
                .and_then(|tail| tail.strip_prefix(':'))
            else {
                continue;
            };
            let digits = tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if !tail[digits..].starts_with(END_MARK) {
                continue;
            }
            let Ok(index) = tail[..digits].parse::<usize>() else {
                continue;
            };
            let end = text.len() - tail.len() + digits + END_MARK.len_utf8();
            let marker = if kind == LABEL_MARK {
                Marker::Label(index)
            } else {
                Marker::Paste(index)
            };
            found.push(MarkerSpan { start: at, end, marker });
            from = end;
        }
        found
    }

    /// `text` with every marker of this run removed.
    pub fn strip_markers(&self, text: &str) -> Result<String, PreprocError> {
        let markers = self.scan_markers(text);
        rebuild(text, &markers, |_| Ok(Some(String::new())))
    }

    /// Stores a clipboard. Last write wins.
    pub fn cut(&mut self, name: &str, entry: ClipboardEntry) {
        self.clipboards.insert(name.to_string(), entry);
    }

    pub fn clipboard(&self, name: &str) -> Option<&ClipboardEntry> {
        self.clipboards.get(name)
    }

    /// Stores rendered at-label content. A label can be targeted only once
    /// per run.
    pub fn add_atlabel(&mut self, label: &str, content: String) -> Result<(), PreprocError> {
        if self.atlabels.iter().any(|(existing, _)| existing == label) {
            return Err(err_msg!(
                DuplicateLabel,
                "multiple atlabel blocks with the same label \"{}\"",
                label
            ));
        }
        self.atlabels.push((label.to_string(), content));
        Ok(())
    }

    pub fn has_atlabel(&self, label: &str) -> bool {
        self.atlabels.iter().any(|(existing, _)| existing == label)
    }

    /// Drains the at-label table, in declaration order.
    pub fn take_atlabels(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.atlabels)
    }

    /// The marker recording one occurrence of `label`.
    pub fn label_marker(&mut self, label: &str) -> String {
        let index = match self.labels.iter().position(|known| known == label) {
            Some(index) => index,
            None => {
                self.labels.push(label.to_string());
                self.labels.len() - 1
            }
        };
        self.encode(LABEL_MARK, index)
    }

    pub fn label_name(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Queues a paste for finalization and returns its marker.
    pub fn defer_paste(&mut self, paste: DeferredPaste) -> String {
        self.deferred.push(paste);
        self.encode(PASTE_MARK, self.deferred.len() - 1)
    }

    pub fn deferred_paste(&self, index: usize) -> Option<&DeferredPaste> {
        self.deferred.get(index)
    }

    pub fn has_deferred_pastes(&self) -> bool {
        !self.deferred.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::source::SourceFile;

    #[test]
    fn markers_round_trip_through_text() {
        let mut vars = CommandVars::new();
        let foo = vars.label_marker("foo");
        let bar = vars.label_marker("bar");
        assert_eq!(vars.label_marker("foo"), foo);
        let text = format!("a{foo}b{bar}c{foo}");
        let markers = vars.scan_markers(&text);
        let kinds: Vec<Marker> = markers.iter().map(|m| m.marker).collect();
        assert_eq!(kinds, vec![Marker::Label(0), Marker::Label(1), Marker::Label(0)]);
        assert_eq!(vars.strip_markers(&text).unwrap(), "abc");
        assert_eq!(vars.label_name(1), Some("bar"));
    }

    #[test]
    fn rebuild_inserts_in_document_order() {
        let mut vars = CommandVars::new();
        let m = vars.label_marker("x");
        let text = format!("{m}12{m}345{m}");
        let markers = vars.scan_markers(&text);
        let mut n = 0;
        let out = rebuild(&text, &markers, |_| {
            n += 1;
            Ok(Some(format!("<{n}>")))
        })
        .unwrap();
        assert_eq!(out, "<1>12<2>345<3>");
    }

    #[test]
    fn foreign_markers_are_plain_text() {
        let mut vars = CommandVars::new();
        let real = vars.label_marker("x");
        let other = CommandVars::new().label_marker("x");
        let forged = format!("{LABEL_MARK}0{END_MARK} {LABEL_MARK}12 and {PASTE_MARK}{END_MARK} {other}");
        assert!(vars.scan_markers(&forged).is_empty());
        assert_eq!(vars.strip_markers(&forged).unwrap(), forged);

        let text = format!("{forged}{real}");
        let markers = vars.scan_markers(&text);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start, forged.len());
    }

    #[test]
    fn document_nonce_avoids_the_text() {
        let first = CommandVars::new();
        let text = format!("contains {}", first.nonce);
        let vars = CommandVars::for_document(&text);
        assert!(!text.contains(&vars.nonce));
    }

    #[test]
    fn duplicate_atlabel_is_an_error_and_clipboards_overwrite() {
        let mut vars = CommandVars::new();
        vars.add_atlabel("foo", "a".to_string()).unwrap();
        let err = vars.add_atlabel("foo", "b".to_string()).unwrap_err();
        assert_eq!(err.error_type(), crate::diagnostics::ErrorType::DuplicateLabel);

        let frame = Frame::root(SourceFile::new("doc", ""), "");
        for content in ["first", "second"] {
            vars.cut(
                "",
                ClipboardEntry {
                    frame: frame.clone(),
                    content: content.to_string(),
                    rendered: false,
                },
            );
        }
        assert_eq!(vars.clipboard("").map(|c| c.content.as_str()), Some("second"));
        assert_eq!(vars.take_atlabels().len(), 1);
        assert!(!vars.has_atlabel("foo"));
    }
}

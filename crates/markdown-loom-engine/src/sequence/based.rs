use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::span::Span;
use crate::error::SequenceError;

/// Markdown's notion of whitespace for trimming purposes.
const BLANK_CHARS: [char; 4] = [' ', '\t', '\r', '\n'];

/// A zero-copy view `[start, end)` into an immutable shared source buffer.
///
/// Every AST node's text is a `BasedSequence`. Views are cheap to clone
/// (one `Arc` bump) and slicing never copies. Offsets are UTF-8 byte
/// offsets; every slice must land on a character boundary.
///
/// Equality is buffer identity plus range, which is what the parser needs
/// when deciding whether two views are "the same text". Compare
/// [`as_str`](Self::as_str) to compare content.
#[derive(Clone)]
pub struct BasedSequence {
    base: Arc<str>,
    start: usize,
    end: usize,
}

impl BasedSequence {
    /// Wraps `text` as a new root buffer spanning all of it.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let base = text.into();
        let end = base.len();
        Self {
            base,
            start: 0,
            end,
        }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_str(&self) -> &str {
        &self.base[self.start..self.end]
    }

    /// Absolute range of this view inside its buffer.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn start_offset(&self) -> usize {
        self.start
    }

    pub fn end_offset(&self) -> usize {
        self.end
    }

    /// The whole buffer this view was cut from.
    pub fn base_sequence(&self) -> BasedSequence {
        Self {
            base: Arc::clone(&self.base),
            start: 0,
            end: self.base.len(),
        }
    }

    pub fn base_str(&self) -> &str {
        &self.base
    }

    /// True when both views share the same root buffer.
    pub fn same_buffer(&self, other: &BasedSequence) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }

    /// Slices relative to this view's own `[0, len)` window.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<BasedSequence, SequenceError> {
        if start > end || end > self.len() {
            return Err(SequenceError::OutOfBounds {
                start,
                end,
                len: self.len(),
            });
        }
        self.base_sub_sequence(self.start + start, self.start + end)
    }

    /// Slices with absolute buffer offsets.
    ///
    /// Used when offsets were computed against the root buffer elsewhere,
    /// e.g. when an inline node spans several container-prefixed lines.
    pub fn base_sub_sequence(
        &self,
        abs_start: usize,
        abs_end: usize,
    ) -> Result<BasedSequence, SequenceError> {
        if abs_start > abs_end || abs_end > self.base.len() {
            return Err(SequenceError::OutOfBounds {
                start: abs_start,
                end: abs_end,
                len: self.base.len(),
            });
        }
        for offset in [abs_start, abs_end] {
            if !self.base.is_char_boundary(offset) {
                return Err(SequenceError::NotCharBoundary { offset });
            }
        }
        Ok(Self {
            base: Arc::clone(&self.base),
            start: abs_start,
            end: abs_end,
        })
    }

    /// Infallible [`sub_sequence`](Self::sub_sequence).
    ///
    /// # Panics
    /// Panics with the bounds diagnostic when the range is invalid, the same
    /// way indexing a `str` does.
    pub fn slice(&self, range: Range<usize>) -> BasedSequence {
        match self.sub_sequence(range.start, range.end) {
            Ok(seq) => seq,
            Err(e) => panic!("{e}"),
        }
    }

    /// Infallible [`base_sub_sequence`](Self::base_sub_sequence).
    ///
    /// # Panics
    /// Panics when the absolute range is not inside the buffer.
    pub fn base_slice(&self, span: Span) -> BasedSequence {
        match self.base_sub_sequence(span.start, span.end) {
            Ok(seq) => seq,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn sub_from(&self, start: usize) -> BasedSequence {
        self.slice(start..self.len())
    }

    pub fn sub_to(&self, end: usize) -> BasedSequence {
        self.slice(0..end)
    }

    /// Empty view positioned at this view's end.
    pub fn end_sequence(&self) -> BasedSequence {
        self.slice(self.len()..self.len())
    }

    /// Empty view positioned at this view's start.
    pub fn start_sequence(&self) -> BasedSequence {
        self.slice(0..0)
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.as_str().get(index..)?.chars().next()
    }

    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.as_str().as_bytes().get(index).copied()
    }

    /// The character ending at `index`, if any.
    pub fn char_before(&self, index: usize) -> Option<char> {
        self.as_str().get(..index)?.chars().next_back()
    }

    pub fn first_char(&self) -> Option<char> {
        self.as_str().chars().next()
    }

    pub fn last_char(&self) -> Option<char> {
        self.as_str().chars().next_back()
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.as_str().starts_with(pat)
    }

    pub fn ends_with(&self, pat: &str) -> bool {
        self.as_str().ends_with(pat)
    }

    pub fn index_of(&self, c: char) -> Option<usize> {
        self.as_str().find(c)
    }

    pub fn index_of_from(&self, c: char, from: usize) -> Option<usize> {
        self.as_str().get(from..)?.find(c).map(|i| i + from)
    }

    /// Byte length of the leading run of chars matching `pred`.
    pub fn count_leading(&self, pred: impl Fn(char) -> bool) -> usize {
        let s = self.as_str();
        s.len() - s.trim_start_matches(|c: char| pred(c)).len()
    }

    /// Byte length of the trailing run of chars matching `pred`.
    pub fn count_trailing(&self, pred: impl Fn(char) -> bool) -> usize {
        let s = self.as_str();
        s.len() - s.trim_end_matches(|c: char| pred(c)).len()
    }

    pub fn trim_start(&self) -> BasedSequence {
        self.sub_from(self.count_leading(|c| BLANK_CHARS.contains(&c)))
    }

    pub fn trim_end(&self) -> BasedSequence {
        self.sub_to(self.len() - self.count_trailing(|c| BLANK_CHARS.contains(&c)))
    }

    pub fn trim(&self) -> BasedSequence {
        self.trim_start().trim_end()
    }

    /// Byte length of the trailing line terminator (`\n`, `\r\n` or `\r`).
    pub fn eol_len(&self) -> usize {
        let s = self.as_str();
        if s.ends_with("\r\n") {
            2
        } else if s.ends_with('\n') || s.ends_with('\r') {
            1
        } else {
            0
        }
    }

    pub fn trim_eol(&self) -> BasedSequence {
        self.sub_to(self.len() - self.eol_len())
    }

    /// True for empty views and views holding only spaces, tabs and line
    /// terminators.
    pub fn is_blank(&self) -> bool {
        self.as_str().chars().all(|c| BLANK_CHARS.contains(&c))
    }

    /// Concatenates two views when `other` starts exactly where this one
    /// ends in the same buffer.
    pub fn spliced(&self, other: &BasedSequence) -> Option<BasedSequence> {
        (self.same_buffer(other) && self.end == other.start).then(|| Self {
            base: Arc::clone(&self.base),
            start: self.start,
            end: other.end,
        })
    }

    /// View from this view's start to `other`'s end.
    pub fn span_to(&self, other: &BasedSequence) -> Option<BasedSequence> {
        (self.same_buffer(other) && other.end >= self.start).then(|| Self {
            base: Arc::clone(&self.base),
            start: self.start,
            end: other.end,
        })
    }

    /// True when `other` lies within this view in the same buffer.
    pub fn encloses(&self, other: &BasedSequence) -> bool {
        self.same_buffer(other) && self.span().encloses(other.span())
    }
}

impl PartialEq for BasedSequence {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other) && self.start == other.start && self.end == other.end
    }
}

impl Eq for BasedSequence {}

impl Default for BasedSequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for BasedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} {:?}", self.start, self.end, self.as_str())
    }
}

impl fmt::Display for BasedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BasedSequence {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BasedSequence {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for BasedSequence {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_sequence_is_relative_to_view() {
        let root = BasedSequence::new("hello world");
        let world = root.sub_sequence(6, 11).unwrap();
        let orl = world.sub_sequence(1, 4).unwrap();
        assert_eq!(orl.as_str(), "orl");
        assert_eq!(orl.span(), Span::new(7, 10));
    }

    #[test]
    fn sub_sequence_rejects_reversed_range() {
        let root = BasedSequence::new("abc");
        assert_eq!(
            root.sub_sequence(2, 1),
            Err(SequenceError::OutOfBounds {
                start: 2,
                end: 1,
                len: 3
            })
        );
    }

    #[test]
    fn sub_sequence_rejects_end_past_view() {
        let root = BasedSequence::new("abcdef");
        let view = root.slice(1..3);
        assert_eq!(
            view.sub_sequence(0, 3),
            Err(SequenceError::OutOfBounds {
                start: 0,
                end: 3,
                len: 2
            })
        );
    }

    #[test]
    fn sub_sequence_rejects_split_character() {
        let root = BasedSequence::new("aé");
        assert_eq!(
            root.sub_sequence(0, 2),
            Err(SequenceError::NotCharBoundary { offset: 2 })
        );
    }

    #[test]
    fn base_sub_sequence_uses_absolute_offsets() {
        let root = BasedSequence::new("> quoted");
        let inner = root.slice(2..8);
        let marker = inner.base_sub_sequence(0, 1).unwrap();
        assert_eq!(marker.as_str(), ">");
        assert!(inner.base_sub_sequence(0, 99).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn slice_panics_with_diagnostic() {
        BasedSequence::new("abc").slice(1..7);
    }

    #[test]
    fn equality_is_identity_and_range() {
        let a = BasedSequence::new("same");
        let b = BasedSequence::new("same");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), b.as_str());
        assert_eq!(a.slice(0..2), a.slice(0..2));
    }

    #[test]
    fn trims_markdown_whitespace() {
        let seq = BasedSequence::new("  \tfoo \r\n");
        assert_eq!(seq.trim().as_str(), "foo");
        assert_eq!(seq.trim().span(), Span::new(3, 6));
        assert_eq!(seq.trim_eol().as_str(), "  \tfoo ");
    }

    #[test]
    fn spliced_requires_contiguity() {
        let root = BasedSequence::new("abcdef");
        let ab = root.slice(0..2);
        let cd = root.slice(2..4);
        let ef = root.slice(4..6);
        assert_eq!(ab.spliced(&cd).map(|s| s.to_string()), Some("abcd".into()));
        assert!(ab.spliced(&ef).is_none());
        assert_eq!(ab.span_to(&ef).unwrap().as_str(), "abcdef");
    }

    #[test]
    fn char_navigation() {
        let seq = BasedSequence::new("a*b");
        assert_eq!(seq.char_at(1), Some('*'));
        assert_eq!(seq.char_before(1), Some('a'));
        assert_eq!(seq.char_before(0), None);
        assert_eq!(seq.char_at(3), None);
        assert_eq!(seq.count_leading(|c| c == 'a'), 1);
    }
}

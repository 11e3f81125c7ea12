use std::fmt;

use xi_rope::delta::Builder as DeltaBuilder;
use xi_rope::{Delta, Rope, RopeInfo};

use super::based::BasedSequence;
use super::span::Span;
use crate::error::SequenceError;

/// One piece of a [`SegmentedSequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Absolute range into the builder's base buffer.
    Base(Span),
    /// Inserted text with no source location.
    Text(String),
}

impl Segment {
    pub fn len(&self) -> usize {
        match self {
            Segment::Base(span) => span.len(),
            Segment::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where an output offset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOffset {
    /// Absolute offset in the base buffer.
    Base(usize),
    /// Inside inserted text.
    Synthetic,
}

/// Decides how an incoming segment joins the accumulated list.
///
/// Implementations may coalesce but must never change the materialized
/// text or the output-to-source mapping.
pub trait SegmentOptimizer: Send + Sync {
    fn push(&self, segments: &mut Vec<Segment>, next: Segment);
}

/// Merges a base range starting where the previous range ended, and
/// consecutive inserted text.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeAdjacent;

impl SegmentOptimizer for MergeAdjacent {
    fn push(&self, segments: &mut Vec<Segment>, next: Segment) {
        match (segments.last_mut(), next) {
            (Some(Segment::Base(prev)), Segment::Base(span)) if prev.end == span.start => {
                prev.end = span.end;
            }
            (Some(Segment::Text(prev)), Segment::Text(s)) => prev.push_str(&s),
            (_, next) => segments.push(next),
        }
    }
}

/// Keeps every append as its own segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMerge;

impl SegmentOptimizer for NoMerge {
    fn push(&self, segments: &mut Vec<Segment>, next: Segment) {
        segments.push(next);
    }
}

/// Assembles a new logical sequence from ranges of a base buffer plus
/// inserted text.
pub struct SegmentBuilder {
    base: BasedSequence,
    segments: Vec<Segment>,
    len: usize,
    optimizer: Box<dyn SegmentOptimizer>,
}

impl SegmentBuilder {
    /// Targets the root buffer of `base`.
    pub fn new(base: &BasedSequence) -> Self {
        Self::with_optimizer(base, Box::new(MergeAdjacent))
    }

    pub fn with_optimizer(base: &BasedSequence, optimizer: Box<dyn SegmentOptimizer>) -> Self {
        Self {
            base: base.base_sequence(),
            segments: Vec::new(),
            len: 0,
            optimizer,
        }
    }

    fn push(&mut self, segment: Segment) {
        if segment.is_empty() {
            return;
        }
        self.len += segment.len();
        self.optimizer.push(&mut self.segments, segment);
    }

    /// Appends a view. Views of the base buffer are stored as ranges,
    /// anything else is copied as inserted text.
    pub fn append(&mut self, seq: &BasedSequence) -> &mut Self {
        if seq.same_buffer(&self.base) {
            self.push(Segment::Base(seq.span()));
        } else {
            self.push(Segment::Text(seq.as_str().to_string()));
        }
        self
    }

    pub fn append_str(&mut self, s: &str) -> &mut Self {
        self.push(Segment::Text(s.to_string()));
        self
    }

    pub fn append_char(&mut self, c: char, repeat: usize) -> &mut Self {
        self.push(Segment::Text(std::iter::repeat_n(c, repeat).collect()));
        self
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Last character appended so far.
    pub fn last_char(&self) -> Option<char> {
        match self.segments.last()? {
            Segment::Base(span) => self.base.base_str()[span.start..span.end].chars().next_back(),
            Segment::Text(s) => s.chars().next_back(),
        }
    }

    pub fn to_sequence(&self) -> SegmentedSequence {
        SegmentedSequence::from_segments(self.base.clone(), self.segments.clone())
    }
}

impl fmt::Debug for SegmentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentBuilder")
            .field("len", &self.len)
            .field("segments", &self.segments)
            .finish()
    }
}

/// Immutable view over ordered segments.
///
/// Lookups binary-search a cumulative offset index, so `char_at` and
/// `source_offset_for` are O(log n) in the number of segments.
#[derive(Clone)]
pub struct SegmentedSequence {
    base: BasedSequence,
    segments: Vec<Segment>,
    /// Output offset at which each segment starts.
    starts: Vec<usize>,
    len: usize,
}

impl SegmentedSequence {
    fn from_segments(base: BasedSequence, segments: Vec<Segment>) -> Self {
        let mut starts = Vec::with_capacity(segments.len());
        let mut len = 0;
        for segment in &segments {
            starts.push(len);
            len += segment.len();
        }
        Self {
            base,
            segments,
            starts,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The root buffer ranges refer to.
    pub fn base(&self) -> &BasedSequence {
        &self.base
    }

    /// Segment index and local offset for output offset `i`.
    fn locate(&self, i: usize) -> Option<(usize, usize)> {
        if i >= self.len {
            return None;
        }
        let idx = self.starts.partition_point(|&start| start <= i) - 1;
        Some((idx, i - self.starts[idx]))
    }

    fn segment_str<'s>(&'s self, segment: &'s Segment) -> &'s str {
        match segment {
            Segment::Base(span) => &self.base.base_str()[span.start..span.end],
            Segment::Text(s) => s,
        }
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        let (idx, local) = self.locate(i)?;
        self.segment_str(&self.segments[idx]).get(local..)?.chars().next()
    }

    pub fn byte_at(&self, i: usize) -> Option<u8> {
        let (idx, local) = self.locate(i)?;
        self.segment_str(&self.segments[idx]).as_bytes().get(local).copied()
    }

    /// Maps an output offset back to the base buffer.
    pub fn source_offset_for(&self, i: usize) -> Result<SourceOffset, SequenceError> {
        let (idx, local) = self.locate(i).ok_or(SequenceError::OutOfBounds {
            start: i,
            end: i + 1,
            len: self.len,
        })?;
        Ok(match &self.segments[idx] {
            Segment::Base(span) => SourceOffset::Base(span.start + local),
            Segment::Text(_) => SourceOffset::Synthetic,
        })
    }

    /// Smallest source range covering every base-backed byte of the output
    /// range `[start, end)`, or `None` when that range is all inserted text.
    pub fn base_span(&self, start: usize, end: usize) -> Option<Span> {
        let mut covered: Option<Span> = None;
        for (segment, &seg_start) in self.segments.iter().zip(&self.starts) {
            let seg_end = seg_start + segment.len();
            if seg_end <= start || seg_start >= end {
                continue;
            }
            if let Segment::Base(span) = segment {
                let lo = span.start + start.saturating_sub(seg_start);
                let hi = span.end - seg_end.saturating_sub(end);
                covered = Some(match covered {
                    Some(c) => Span::new(c.start.min(lo), c.end.max(hi)),
                    None => Span::new(lo, hi),
                });
            }
        }
        covered
    }

    /// Source view for the output range `[start, end)`.
    ///
    /// Falls back to an empty view at the mapped position when the range
    /// holds no base-backed bytes.
    pub fn source_view(&self, start: usize, end: usize) -> BasedSequence {
        if let Some(span) = self.base_span(start, end) {
            return self.base.base_slice(span);
        }
        match self.source_offset_for(start) {
            Ok(SourceOffset::Base(offset)) => self.base.base_slice(Span::new(offset, offset)),
            _ => self.base.end_sequence(),
        }
    }

    /// Slices the output range `[start, end)`, re-splitting the boundary
    /// segments.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<SegmentedSequence, SequenceError> {
        if start > end || end > self.len {
            return Err(SequenceError::OutOfBounds {
                start,
                end,
                len: self.len,
            });
        }
        let mut out = Vec::new();
        for (segment, &seg_start) in self.segments.iter().zip(&self.starts) {
            let seg_end = seg_start + segment.len();
            if seg_end <= start || seg_start >= end {
                continue;
            }
            let lo = start.saturating_sub(seg_start);
            let hi = segment.len() - seg_end.saturating_sub(end);
            let text = self.segment_str(segment);
            for offset in [lo, hi] {
                if !text.is_char_boundary(offset) {
                    return Err(SequenceError::NotCharBoundary {
                        offset: seg_start + offset,
                    });
                }
            }
            out.push(match segment {
                Segment::Base(span) => Segment::Base(Span::new(span.start + lo, span.start + hi)),
                Segment::Text(s) => Segment::Text(s[lo..hi].to_string()),
            });
        }
        Ok(Self::from_segments(self.base.clone(), out))
    }

    /// The content as one contiguous base view, when it is one.
    ///
    /// Returns `None` for content containing inserted text or
    /// non-contiguous ranges; callers use this opportunistically.
    pub fn single_based_sequence(&self) -> Option<BasedSequence> {
        let mut covered: Option<Span> = None;
        for segment in &self.segments {
            match (segment, covered) {
                (Segment::Base(span), None) => covered = Some(*span),
                (Segment::Base(span), Some(c)) if c.end == span.start => {
                    covered = Some(Span::new(c.start, span.end));
                }
                _ => return None,
            }
        }
        let span = covered.unwrap_or_default();
        self.base.base_sub_sequence(span.start, span.end).ok()
    }

    /// Edit script turning the base buffer into this sequence.
    ///
    /// Only available when base ranges appear in increasing source order,
    /// which is what a formatter produces. Pushing cursor positions through
    /// the delta keeps them attached to the same text after re-formatting.
    pub fn to_delta(&self) -> Option<Delta<RopeInfo>> {
        let base_len = self.base.len();
        let mut builder = DeltaBuilder::new(base_len);
        let mut pos = 0usize;
        let mut pending = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(s) => pending.push_str(s),
                Segment::Base(span) => {
                    if span.start < pos {
                        return None;
                    }
                    builder.replace(pos..span.start, Rope::from(std::mem::take(&mut pending)));
                    pos = span.end;
                }
            }
        }
        builder.replace(pos..base_len, Rope::from(pending));
        Some(builder.build())
    }
}

impl fmt::Display for SegmentedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str(self.segment_str(segment))?;
        }
        Ok(())
    }
}

impl fmt::Debug for SegmentedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedSequence")
            .field("text", &self.to_string())
            .field("segments", &self.segments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (BasedSequence, SegmentedSequence) {
        let base = BasedSequence::new("# Title\nbody text\n");
        let mut b = SegmentBuilder::new(&base);
        b.append(&base.slice(2..7))
            .append_str("!\n")
            .append(&base.slice(8..12))
            .append(&base.slice(12..18));
        (base, b.to_sequence())
    }

    #[test]
    fn builder_merges_contiguous_ranges() {
        let (_, seq) = sample();
        assert_eq!(
            seq.segments(),
            &[
                Segment::Base(Span::new(2, 7)),
                Segment::Text("!\n".into()),
                Segment::Base(Span::new(8, 18)),
            ]
        );
        assert_eq!(seq.to_string(), "Title!\nbody text\n");
    }

    #[test]
    fn merging_does_not_change_content() {
        let base = BasedSequence::new("abcdef");
        let build = |opt: Box<dyn SegmentOptimizer>| {
            let mut b = SegmentBuilder::with_optimizer(&base, opt);
            b.append(&base.slice(0..2))
                .append(&base.slice(2..4))
                .append_char('-', 2)
                .append_str("+")
                .append(&base.slice(4..6));
            b.to_sequence()
        };
        let merged = build(Box::new(MergeAdjacent));
        let plain = build(Box::new(NoMerge));
        assert_eq!(merged.to_string(), plain.to_string());
        assert!(merged.segments().len() < plain.segments().len());
        for i in 0..merged.len() {
            assert_eq!(merged.source_offset_for(i), plain.source_offset_for(i));
        }
    }

    #[test]
    fn foreign_buffer_becomes_text() {
        let base = BasedSequence::new("abc");
        let other = BasedSequence::new("abc");
        let mut b = SegmentBuilder::new(&base);
        b.append(&other);
        assert_eq!(b.segments(), &[Segment::Text("abc".into())]);
    }

    #[test]
    fn char_at_uses_cumulative_index() {
        let (_, seq) = sample();
        assert_eq!(seq.char_at(0), Some('T'));
        assert_eq!(seq.char_at(5), Some('!'));
        assert_eq!(seq.char_at(7), Some('b'));
        assert_eq!(seq.char_at(seq.len()), None);
    }

    #[test]
    fn source_offsets_point_at_same_char() {
        let (base, seq) = sample();
        for i in 0..seq.len() {
            match seq.source_offset_for(i).unwrap() {
                SourceOffset::Base(off) => {
                    assert_eq!(base.char_at(off), seq.char_at(i));
                }
                SourceOffset::Synthetic => assert!(matches!(i, 5 | 6)),
            }
        }
        assert!(seq.source_offset_for(seq.len()).is_err());
    }

    #[test]
    fn sub_sequence_resplits_boundaries() {
        let (_, seq) = sample();
        let sub = seq.sub_sequence(3, 9).unwrap();
        assert_eq!(sub.to_string(), "le!\nbo");
        assert_eq!(
            sub.segments(),
            &[
                Segment::Base(Span::new(5, 7)),
                Segment::Text("!\n".into()),
                Segment::Base(Span::new(8, 10)),
            ]
        );
        assert!(seq.sub_sequence(4, 99).is_err());
    }

    #[test]
    fn base_span_skips_inserted_text() {
        let (_, seq) = sample();
        assert_eq!(seq.base_span(3, 9), Some(Span::new(5, 10)));
        assert_eq!(seq.base_span(5, 7), None);
    }

    #[test]
    fn single_based_sequence_is_opportunistic() {
        let (base, seq) = sample();
        assert!(seq.single_based_sequence().is_none());
        let body = seq.sub_sequence(7, seq.len()).unwrap();
        assert_eq!(body.single_based_sequence(), Some(base.slice(8..18)));
    }

    #[test]
    fn delta_reproduces_output() {
        let (base, seq) = sample();
        let delta = seq.to_delta().unwrap();
        let rope = Rope::from(base.as_str());
        assert_eq!(String::from(delta.apply(&rope)), seq.to_string());
    }

    #[test]
    fn delta_requires_increasing_ranges() {
        let base = BasedSequence::new("ab");
        let mut b = SegmentBuilder::new(&base);
        b.append(&base.slice(1..2)).append(&base.slice(0..1));
        assert!(b.to_sequence().to_delta().is_none());
    }
}

//! Zero-copy text views and the segment builder.
//!
//! Every node in a parsed document points into the source through a
//! [`BasedSequence`]. Renderers that rewrite text assemble their output with a
//! [`SegmentBuilder`], which keeps track of which output bytes came from the
//! source and which were inserted.

pub mod based;
pub mod lines;
pub mod segment;
pub mod slice;
pub mod span;

pub use based::BasedSequence;
pub use lines::{LineRef, lines_with_spans};
pub use segment::{
    MergeAdjacent, NoMerge, Segment, SegmentBuilder, SegmentOptimizer, SegmentedSequence,
    SourceOffset,
};
pub use slice::preview;
pub use span::Span;

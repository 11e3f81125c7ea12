//! # Inline Parsing
//!
//! Resolves the content of paragraphs and headings into inline nodes.
//!
//! ## Architecture
//!
//! Inline parsing runs after the block tree is complete and reference
//! definitions are known. Each block's content lines are joined into a
//! [`SegmentedSequence`](crate::sequence::SegmentedSequence) so the resolver
//! sees contiguous text while every node it creates still points back into
//! the original source.
//!
//! The resolver scans the text once with a [`Cursor`]:
//! - Code spans, autolinks, raw HTML and entities are recognized eagerly
//! - Runs of registered delimiter characters become text nodes and enter
//!   the delimiter list
//! - `[` and `![` push brackets; `]` resolves links and images, then
//!   processes the delimiters inside them
//!
//! Once the scan ends, remaining delimiters are matched left to right by
//! their [`DelimiterProcessor`]s (the CommonMark "process emphasis"
//! procedure). Unmatched runs stay as text.
//!
//! ## Modules
//!
//! - **`cursor`**: byte cursor over the joined text
//! - **`link`**: label, destination and title scanners
//! - **`delimiter`**: delimiter runs, flanking and the processor trait
//! - **`emphasis`**: the `*` and `_` processors
//! - **`parser`**: [`InlineParser`] and the per-block resolver

pub mod cursor;
pub mod delimiter;
pub mod emphasis;
pub mod link;
pub mod parser;

pub use cursor::Cursor;
pub use delimiter::{Delimiter, DelimiterProcessor, Flanking, is_punctuation};
pub use emphasis::EmphasisProcessor;
pub use parser::{InlineContext, InlineParser};

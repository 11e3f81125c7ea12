//! # Core Block Kinds
//!
//! One module per CommonMark block, each holding the open-block parser and,
//! for blocks with a start marker, the factory that recognizes it.

pub mod block_quote;
pub mod document;
pub mod fenced_code;
pub mod heading;
pub mod html_block;
pub mod indented_code;
pub mod list;
pub mod paragraph;
pub mod thematic_break;

pub use block_quote::{BlockQuoteFactory, BlockQuoteParser};
pub use document::DocumentBlockParser;
pub use fenced_code::{FencedCodeFactory, FencedCodeParser};
pub use heading::{HeadingFactory, HeadingParser};
pub use html_block::{HtmlBlockFactory, HtmlBlockParser};
pub use indented_code::{IndentedCodeFactory, IndentedCodeParser};
pub use list::{ListBlockParser, ListFactory, ListItemParser};
pub use paragraph::ParagraphParser;
pub use thematic_break::{ThematicBreakFactory, ThematicBreakParser};

use std::sync::Arc;

use super::parser::BlockParserFactory;

/// Core factories in the order they are tried on each line.
pub fn core_factories() -> Vec<Arc<dyn BlockParserFactory>> {
    vec![
        Arc::new(BlockQuoteFactory),
        Arc::new(HeadingFactory),
        Arc::new(FencedCodeFactory),
        Arc::new(HtmlBlockFactory),
        Arc::new(ThematicBreakFactory),
        Arc::new(ListFactory),
        Arc::new(IndentedCodeFactory),
    ]
}

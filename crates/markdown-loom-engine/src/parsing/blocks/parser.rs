use crate::ast::{Ast, ContentLine, NodeKind, NodeType};
use crate::extension::Dependent;

use super::state::ParserState;

/// Outcome of offering a line to an open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// The block continues; its content starts at this line index.
    AtIndex(usize),
    /// The block continues; its content starts at this column.
    AtColumn(usize),
    /// The line completes the block (e.g. a closing fence).
    Finished,
}

/// One open block while the document is being parsed.
///
/// Parsers hold their block's data until [`close_block`](Self::close_block)
/// writes it into the node.
pub trait BlockParser {
    /// Kind of the block being built, as known so far.
    fn block(&self) -> &NodeKind;

    fn is_container(&self) -> bool {
        false
    }

    /// Whether a non-matching, non-blank line may still be appended.
    fn can_lazy_continue(&self) -> bool {
        false
    }

    fn can_contain(&self, _child: &NodeKind) -> bool {
        false
    }

    /// Asks whether the current line continues this block.
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue>;

    fn add_line(&mut self, _line: ContentLine) {}

    /// Called when a child block is opened inside this one.
    fn child_added(&mut self, _child: &NodeKind) {}

    /// Writes the finished block's kind and content into its node.
    fn close_block(&mut self, ast: &mut Ast);

    /// Lines collected so far, when this is a paragraph.
    fn paragraph_lines(&self) -> Option<&[ContentLine]> {
        None
    }

    fn is_paragraph(&self) -> bool {
        self.paragraph_lines().is_some()
    }
}

/// The deepest open block that matched the current line, as seen by
/// factories deciding whether to start a new block.
pub struct MatchedBlock<'a> {
    pub(crate) parser: &'a dyn BlockParser,
}

impl MatchedBlock<'_> {
    pub fn block(&self) -> &NodeKind {
        self.parser.block()
    }

    pub fn node_type(&self) -> NodeType {
        self.parser.block().node_type()
    }

    /// Lines of the matched paragraph, if it is one and it has content.
    pub fn paragraph_lines(&self) -> Option<&[ContentLine]> {
        self.parser.paragraph_lines().filter(|l| !l.is_empty())
    }
}

/// Result of a successful block start.
pub struct BlockStart {
    pub(crate) parsers: Vec<Box<dyn BlockParser>>,
    pub(crate) new_index: Option<usize>,
    pub(crate) new_column: Option<usize>,
    pub(crate) replace_active_block_parser: bool,
}

impl BlockStart {
    pub fn of(parser: Box<dyn BlockParser>) -> Self {
        Self::of_many(vec![parser])
    }

    /// Several nested blocks at once, outermost first.
    pub fn of_many(parsers: Vec<Box<dyn BlockParser>>) -> Self {
        Self {
            parsers,
            new_index: None,
            new_column: None,
            replace_active_block_parser: false,
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.new_index = Some(index);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.new_column = Some(column);
        self
    }

    /// The new block takes the place of the active paragraph.
    pub fn replace_active_block_parser(mut self) -> Self {
        self.replace_active_block_parser = true;
        self
    }
}

/// Recognizes the start of a block kind.
///
/// Factories are shared across parses and must not keep per-document
/// state; anything stateful lives in the [`BlockParser`] they create.
pub trait BlockParserFactory: Dependent + Send + Sync {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart>;
}

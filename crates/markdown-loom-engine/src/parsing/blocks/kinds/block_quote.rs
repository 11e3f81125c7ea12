use crate::ast::{Ast, NodeKind};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};

/// The blockquote prefix character.
pub const PREFIX: u8 = b'>';

/// Column just past `>` and its optional following space, if the line
/// carries a quote marker at the cursor.
fn marker_column(state: &ParserState<'_>) -> Option<usize> {
    let nns = state.next_non_space_index();
    if state.indent() >= CODE_BLOCK_INDENT || state.byte_at(nns) != Some(PREFIX) {
        return None;
    }
    let mut column = state.column() + state.indent() + 1;
    if matches!(state.byte_at(nns + 1), Some(b' ' | b'\t')) {
        column += 1;
    }
    Some(column)
}

pub struct BlockQuoteParser {
    block: NodeKind,
}

impl BlockQuoteParser {
    pub fn new() -> Self {
        Self {
            block: NodeKind::BlockQuote,
        }
    }
}

impl Default for BlockQuoteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockParser for BlockQuoteParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, _child: &NodeKind) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        marker_column(state).map(BlockContinue::AtColumn)
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = NodeKind::BlockQuote;
    }
}

pub struct BlockQuoteFactory;

impl Dependent for BlockQuoteFactory {
    fn dependency_key(&self) -> &'static str {
        "block_quote"
    }
}

impl BlockParserFactory for BlockQuoteFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        let column = marker_column(state)?;
        Some(BlockStart::of(Box::new(BlockQuoteParser::new())).at_column(column))
    }
}

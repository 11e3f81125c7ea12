use crate::ast::{Ast, NodeKind};
use crate::parsing::blocks::parser::{BlockContinue, BlockParser};
use crate::parsing::blocks::state::ParserState;

/// Root of the open-block stack. Always continues, contains anything.
pub struct DocumentBlockParser {
    block: NodeKind,
}

impl DocumentBlockParser {
    pub fn new() -> Self {
        Self {
            block: NodeKind::Document,
        }
    }
}

impl Default for DocumentBlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockParser for DocumentBlockParser {
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
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn close_block(&mut self, _ast: &mut Ast) {}
}

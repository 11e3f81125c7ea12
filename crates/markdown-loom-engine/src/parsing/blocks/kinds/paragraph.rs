use crate::ast::{Ast, ContentLine, NodeKind};
use crate::parsing::blocks::parser::{BlockContinue, BlockParser};
use crate::parsing::blocks::state::ParserState;

/// Fallback leaf: any non-blank line no factory claimed.
///
/// Paragraphs are the only core block that accepts lazy continuation lines.
pub struct ParagraphParser {
    block: NodeKind,
    lines: Vec<ContentLine>,
}

impl ParagraphParser {
    pub fn new() -> Self {
        Self {
            block: NodeKind::Paragraph,
            lines: Vec::new(),
        }
    }
}

impl Default for ParagraphParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockParser for ParagraphParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn can_lazy_continue(&self) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            None
        } else {
            Some(BlockContinue::AtIndex(state.index()))
        }
    }

    fn add_line(&mut self, line: ContentLine) {
        self.lines.push(line);
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = NodeKind::Paragraph;
        ast.content.lines = std::mem::take(&mut self.lines);
    }

    fn paragraph_lines(&self) -> Option<&[ContentLine]> {
        Some(&self.lines)
    }
}

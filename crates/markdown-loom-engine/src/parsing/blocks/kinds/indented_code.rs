use crate::ast::{Ast, ContentLine, NodeKind, NodeType};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};

pub struct IndentedCodeParser {
    block: NodeKind,
    lines: Vec<ContentLine>,
}

impl BlockParser for IndentedCodeParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() >= CODE_BLOCK_INDENT {
            Some(BlockContinue::AtColumn(state.column() + CODE_BLOCK_INDENT))
        } else if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: ContentLine) {
        self.lines.push(line);
    }

    fn close_block(&mut self, ast: &mut Ast) {
        while self.lines.last().is_some_and(ContentLine::is_blank) {
            self.lines.pop();
        }
        ast.kind = NodeKind::IndentedCodeBlock;
        ast.content.lines = std::mem::take(&mut self.lines);
    }
}

/// Four columns of indentation, except where it would continue a paragraph.
pub struct IndentedCodeFactory;

impl Dependent for IndentedCodeFactory {
    fn dependency_key(&self) -> &'static str {
        "indented_code_block"
    }
}

impl BlockParserFactory for IndentedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() < CODE_BLOCK_INDENT
            || state.is_blank()
            || state.active_block() == NodeType::Paragraph
        {
            return None;
        }
        let parser = IndentedCodeParser {
            block: NodeKind::IndentedCodeBlock,
            lines: Vec::new(),
        };
        Some(BlockStart::of(Box::new(parser)).at_column(state.column() + CODE_BLOCK_INDENT))
    }
}

use regex::Regex;

use crate::ast::{Ast, ContentLine, NodeKind, NodeType};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};
use crate::parsing::patterns::html_block_patterns;

pub struct HtmlBlockParser {
    block: NodeKind,
    closer: Option<&'static Regex>,
    finished: bool,
    lines: Vec<ContentLine>,
}

impl BlockParser for HtmlBlockParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if self.finished || (state.is_blank() && self.closer.is_none()) {
            return None;
        }
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: ContentLine) {
        if let Some(closer) = self.closer
            && closer.is_match(line.chars.as_str())
        {
            self.finished = true;
        }
        self.lines.push(line);
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = NodeKind::HtmlBlock;
        ast.content.lines = std::mem::take(&mut self.lines);
    }
}

/// The seven CommonMark HTML block start conditions.
pub struct HtmlBlockFactory;

impl Dependent for HtmlBlockFactory {
    fn dependency_key(&self) -> &'static str {
        "html_block"
    }
}

impl BlockParserFactory for HtmlBlockFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        let rest = state.rest();
        if state.indent() >= CODE_BLOCK_INDENT || rest.first_char() != Some('<') {
            return None;
        }
        let interrupts_paragraph = matched.paragraph_lines().is_some()
            || state.active_block() == NodeType::Paragraph;
        for (block_type, (opener, closer)) in html_block_patterns().iter().enumerate() {
            // Type 7 cannot interrupt a paragraph.
            if block_type == 6 && interrupts_paragraph {
                continue;
            }
            if opener.is_match(rest.as_str()) {
                let parser = HtmlBlockParser {
                    block: NodeKind::HtmlBlock,
                    closer: closer.as_ref(),
                    finished: false,
                    lines: Vec::new(),
                };
                return Some(BlockStart::of(Box::new(parser)).at_index(state.index()));
            }
        }
        None
    }
}

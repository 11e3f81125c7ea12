use crate::ast::{Ast, ContentLine, FencedCodeData, NodeKind};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};
use crate::sequence::BasedSequence;

pub const BACKTICK: char = '`';
pub const TILDE: char = '~';
const MIN_FENCE: usize = 3;

pub struct FencedCodeParser {
    data: FencedCodeData,
    block: NodeKind,
    saw_opening_line: bool,
    lines: Vec<ContentLine>,
}

impl FencedCodeParser {
    fn new(data: FencedCodeData) -> Self {
        Self {
            block: NodeKind::FencedCodeBlock(data.clone()),
            data,
            saw_opening_line: false,
            lines: Vec::new(),
        }
    }

    /// The closing fence on `rest`, if it closes this block.
    fn closing_fence(&self, rest: &BasedSequence) -> Option<BasedSequence> {
        let fence_char = self.data.fence_char;
        let run = rest.count_leading(|c| c == fence_char);
        let trailing_blank = rest
            .sub_from(run)
            .as_str()
            .chars()
            .all(|c| c == ' ' || c == '\t');
        (run >= self.data.fence_len && trailing_blank).then(|| rest.sub_to(run))
    }
}

impl BlockParser for FencedCodeParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() < CODE_BLOCK_INDENT
            && let Some(closing) = self.closing_fence(&state.rest())
        {
            self.data.closing = Some(closing);
            return Some(BlockContinue::Finished);
        }
        // Strip up to the opening fence's indentation.
        let line = state.line();
        let mut index = state.index();
        let mut remaining = self.data.fence_indent;
        while remaining > 0 && line.byte_at(index) == Some(b' ') {
            index += 1;
            remaining -= 1;
        }
        Some(BlockContinue::AtIndex(index))
    }

    fn add_line(&mut self, line: ContentLine) {
        // The first line handed over is the rest of the opening line, which
        // the factory already captured as the info string.
        if !self.saw_opening_line {
            self.saw_opening_line = true;
            return;
        }
        self.lines.push(line);
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = NodeKind::FencedCodeBlock(self.data.clone());
        ast.content.lines = std::mem::take(&mut self.lines);
    }
}

pub struct FencedCodeFactory;

impl Dependent for FencedCodeFactory {
    fn dependency_key(&self) -> &'static str {
        "fenced_code_block"
    }
}

impl BlockParserFactory for FencedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let rest = state.rest();
        let fence_char = rest.first_char().filter(|c| *c == BACKTICK || *c == TILDE)?;
        let fence_len = rest.count_leading(|c| c == fence_char);
        if fence_len < MIN_FENCE {
            return None;
        }
        let info = rest.sub_from(fence_len);
        if fence_char == BACKTICK && info.index_of(BACKTICK).is_some() {
            return None;
        }
        let data = FencedCodeData {
            fence_char,
            fence_len,
            fence_indent: state.indent(),
            opening: rest.sub_to(fence_len),
            info: info.trim(),
            closing: None,
        };
        Some(
            BlockStart::of(Box::new(FencedCodeParser::new(data)))
                .at_index(state.next_non_space_index() + fence_len),
        )
    }
}

use crate::ast::{Ast, NodeKind};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};
use crate::sequence::BasedSequence;

/// Three or more of `*`, `-` or `_`, optionally separated by spaces/tabs.
pub fn is_thematic_break(rest: &BasedSequence) -> bool {
    let Some(marker) = rest.first_char().filter(|c| matches!(c, '*' | '-' | '_')) else {
        return false;
    };
    let mut count = 0;
    for c in rest.as_str().chars() {
        match c {
            c if c == marker => count += 1,
            ' ' | '\t' => {}
            _ => return false,
        }
    }
    count >= 3
}

pub struct ThematicBreakParser {
    block: NodeKind,
}

impl BlockParser for ThematicBreakParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = NodeKind::ThematicBreak;
    }
}

pub struct ThematicBreakFactory;

impl Dependent for ThematicBreakFactory {
    fn dependency_key(&self) -> &'static str {
        "thematic_break"
    }
}

impl BlockParserFactory for ThematicBreakFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT || !is_thematic_break(&state.rest()) {
            return None;
        }
        let parser = ThematicBreakParser {
            block: NodeKind::ThematicBreak,
        };
        Some(BlockStart::of(Box::new(parser)).at_index(state.line().len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_breaks() {
        for ok in ["***", "- - -", "_____", "*\t*\t*  "] {
            assert!(is_thematic_break(&BasedSequence::new(ok)), "{ok}");
        }
        for no in ["**", "*-*", "--a", ""] {
            assert!(!is_thematic_break(&BasedSequence::new(no)), "{no}");
        }
    }
}

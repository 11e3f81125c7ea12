use std::sync::Arc;

use log::trace;

use crate::ast::{Ast, ContentLine, Document, NodeId, NodeKind, NodeType};
use crate::error::LoomError;
use crate::options::ParseOptions;
use crate::sequence::{BasedSequence, LineRef, Span, lines_with_spans};

use super::kinds::{DocumentBlockParser, ParagraphParser};
use super::parser::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock};
use super::state::{CODE_BLOCK_INDENT, ParserState};

/// An entry of the open-block stack.
struct OpenBlock {
    parser: Box<dyn BlockParser>,
    node: NodeId,
    /// Absolute source offset where the block starts.
    start: usize,
    /// Absolute source offset just past the last non-blank line seen.
    end: usize,
}

/// Builds the block tree line by line.
///
/// The open-block stack always mirrors the chain from the document node
/// down to the innermost open block; every closed block has its `chars`
/// set from the offsets recorded while it was open.
pub(crate) struct DocumentParser<'a> {
    doc: Document,
    open: Vec<OpenBlock>,
    state: ParserState<'a>,
    factories: &'a [Arc<dyn BlockParserFactory>],
}

/// Runs the block phase over `source`, returning the block tree.
pub(crate) fn parse_blocks(
    source: BasedSequence,
    factories: &[Arc<dyn BlockParserFactory>],
    options: &ParseOptions,
) -> Result<Document, LoomError> {
    let lines: Vec<LineRef> = lines_with_spans(&source).collect();
    let mut parser = DocumentParser::new(source, &lines, factories, options);
    for line_number in 0..lines.len() {
        parser.parse_line(line_number)?;
    }
    parser.finish()
}

impl<'a> DocumentParser<'a> {
    fn new(
        source: BasedSequence,
        lines: &'a [LineRef],
        factories: &'a [Arc<dyn BlockParserFactory>],
        options: &'a ParseOptions,
    ) -> Self {
        let doc = Document::new(source.clone());
        let root = OpenBlock {
            parser: Box::new(DocumentBlockParser::new()),
            node: doc.root(),
            start: source.start_offset(),
            end: source.end_offset(),
        };
        Self {
            doc,
            open: vec![root],
            state: ParserState::new(lines, options),
            factories,
        }
    }

    fn parse_line(&mut self, line_number: usize) -> Result<(), LoomError> {
        self.state.set_line(line_number);
        trace!(
            "line {}: {:?}",
            line_number + 1,
            crate::sequence::preview(self.state.line(), 40)
        );

        // Walk the open blocks from the outermost container inwards.
        let mut matches = 1;
        for i in 1..self.open.len() {
            self.state.find_next_non_space();
            let Some(result) = self.open[i].parser.try_continue(&self.state) else {
                break;
            };
            match result {
                BlockContinue::Finished => {
                    self.extend_ends();
                    let count = self.open.len() - i;
                    return self.close_blocks(count);
                }
                BlockContinue::AtIndex(index) => self.state.set_new_index(index)?,
                BlockContinue::AtColumn(column) => self.state.set_new_column(column)?,
            }
            matches += 1;
        }

        let mut unmatched = self.open.len() - matches;
        let mut matched = matches - 1;
        let mut started = false;
        let mut try_block_starts = {
            let parser = &self.open[matched].parser;
            parser.is_paragraph() || parser.is_container()
        };

        while try_block_starts {
            self.state.find_next_non_space();
            let nns = self.state.next_non_space_index();
            if self.state.is_blank()
                || (self.state.indent() < CODE_BLOCK_INDENT
                    && self.state.line().char_at(nns).is_some_and(char::is_alphabetic))
            {
                self.state.set_new_index(nns)?;
                break;
            }

            let Some(start) = self.find_block_start(matched) else {
                self.state.set_new_index(nns)?;
                break;
            };
            if start.parsers.is_empty() {
                return Err(LoomError::contract(
                    "block parser factory",
                    format!("empty block start on line {}", line_number + 1),
                ));
            }
            started = true;

            if unmatched > 0 {
                self.close_blocks(unmatched)?;
                unmatched = 0;
            }
            if let Some(index) = start.new_index {
                self.state.set_new_index(index)?;
            } else if let Some(column) = start.new_column {
                self.state.set_new_column(column)?;
            }
            let mut start_offset = self.state.offset_of(nns.min(self.state.index()));

            if start.replace_active_block_parser
                && let Some(replaced) = self.open.pop()
            {
                start_offset = replaced.start;
                self.doc.remove_subtree(replaced.node);
                self.sync_state();
            }

            for parser in start.parsers {
                try_block_starts = parser.is_container();
                self.add_child(parser, start_offset)?;
            }
            matched = self.open.len() - 1;
        }

        let top = self.open.len() - 1;
        if !started && !self.state.is_blank() && self.open[top].parser.can_lazy_continue() {
            // Lazy paragraph continuation: containers that failed to match
            // stay open.
            self.add_line();
        } else {
            if unmatched > 0 {
                self.close_blocks(unmatched)?;
            }
            let top = self.open.len() - 1;
            if !self.open[top].parser.is_container() {
                self.add_line();
            } else if !self.state.is_blank() {
                let start = self.state.offset_of(self.state.index());
                self.add_child(Box::new(ParagraphParser::new()), start)?;
                self.add_line();
            }
        }

        self.extend_ends();
        debug_assert!(self.stack_mirrors_tree());
        Ok(())
    }

    fn find_block_start(&self, matched: usize) -> Option<BlockStart> {
        let matched = MatchedBlock {
            parser: self.open[matched].parser.as_ref(),
        };
        self.factories
            .iter()
            .find_map(|factory| factory.try_start(&self.state, &matched))
    }

    fn add_line(&mut self) {
        let state = &self.state;
        let line = state.line();
        let (pad, chars) = if state.partially_consumed_tab() {
            (
                state.columns_to_next_tab_stop(state.column()),
                line.sub_from(state.index() + 1),
            )
        } else {
            (0, line.sub_from(state.index()))
        };
        let content = ContentLine {
            pad,
            chars,
            eol: state.eol().clone(),
        };
        if let Some(top) = self.open.last_mut() {
            top.parser.add_line(content);
        }
    }

    /// Pushes a new open block, closing blocks that cannot contain it.
    fn add_child(&mut self, parser: Box<dyn BlockParser>, start: usize) -> Result<(), LoomError> {
        while self
            .open
            .last()
            .is_some_and(|top| !top.parser.can_contain(parser.block()))
        {
            if self.open.len() == 1 {
                return Err(LoomError::contract(
                    "block parser",
                    format!("document cannot contain {:?}", parser.block().node_type()),
                ));
            }
            self.close_blocks(1)?;
        }
        let Some(parent) = self.open.last_mut() else {
            return Err(LoomError::contract("block parser", "open-block stack is empty"));
        };
        parent.parser.child_added(parser.block());
        let parent = parent.node;

        let chars = self.doc.source().base_slice(Span::new(start, start));
        let node = self.doc.append(parent, Ast::new(parser.block().clone(), chars));
        self.open.push(OpenBlock {
            parser,
            node,
            start,
            end: start,
        });
        self.sync_state();
        Ok(())
    }

    /// Non-blank lines extend every open block.
    fn extend_ends(&mut self) {
        let line = self.state.line();
        if line.is_blank() {
            return;
        }
        let end = line.end_offset();
        for block in &mut self.open {
            block.end = block.end.max(end);
        }
    }

    /// Closes the innermost `count` open blocks.
    fn close_blocks(&mut self, count: usize) -> Result<(), LoomError> {
        for _ in 0..count {
            if self.open.len() <= 1 {
                break;
            }
            if let Some(block) = self.open.pop() {
                self.finalize(block);
            }
        }
        self.sync_state();
        Ok(())
    }

    fn finalize(&mut self, mut block: OpenBlock) {
        let span = Span::new(block.start, block.end.max(block.start));
        let chars = self.doc.source().base_slice(span);
        let ast = self.doc.get_mut(block.node);
        ast.chars = chars;
        block.parser.close_block(ast);
    }

    fn sync_state(&mut self) {
        self.state.active_block = self
            .open
            .last()
            .map_or(NodeType::Document, |b| b.parser.block().node_type());
        self.state.list_depth = self
            .open
            .iter()
            .filter(|b| b.parser.block().list_data().is_some())
            .count();
    }

    fn stack_mirrors_tree(&self) -> bool {
        self.open
            .windows(2)
            .all(|pair| self.doc.parent(pair[1].node) == Some(pair[0].node))
    }

    fn finish(mut self) -> Result<Document, LoomError> {
        let count = self.open.len() - 1;
        self.close_blocks(count)?;
        let root = self.doc.root();
        if !matches!(self.doc.kind(root), NodeKind::Document) {
            return Err(LoomError::contract("block parser", "document node was replaced"));
        }
        Ok(self.doc)
    }
}

use crate::ast::{Ast, ListData, ListItemData, NodeKind, NodeType};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};
use crate::sequence::BasedSequence;

const MAX_ORDERED_DIGITS: usize = 9;

/// A list container; always continues and leaves the decision to its items.
pub struct ListBlockParser {
    block: NodeKind,
}

impl BlockParser for ListBlockParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, child: &NodeKind) -> bool {
        child.node_type() == NodeType::ListItem
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn close_block(&mut self, ast: &mut Ast) {
        // Tightness is settled later by the list pre-processor.
        ast.kind = self.block.clone();
    }
}

pub struct ListItemParser {
    block: NodeKind,
    content_indent: usize,
    has_children: bool,
}

impl BlockParser for ListItemParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, _child: &NodeKind) -> bool {
        true
    }

    fn child_added(&mut self, _child: &NodeKind) {
        self.has_children = true;
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            // An item that starts with a blank line cannot take a second one.
            return self
                .has_children
                .then(|| BlockContinue::AtIndex(state.next_non_space_index()));
        }
        (state.indent() >= self.content_indent)
            .then(|| BlockContinue::AtColumn(state.column() + self.content_indent))
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = self.block.clone();
    }
}

/// A recognized list marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    ordered: bool,
    /// Bullet char or ordered delimiter.
    marker: char,
    start: u64,
    /// Line index just past the marker.
    end: usize,
}

fn parse_marker(line: &BasedSequence, index: usize) -> Option<Marker> {
    let s = &line.as_str()[index..];
    let bytes = s.as_bytes();
    let followed_by_space = |i: usize| matches!(bytes.get(i), None | Some(b' ' | b'\t'));
    match bytes.first()? {
        c @ (b'-' | b'+' | b'*') => followed_by_space(1).then_some(Marker {
            ordered: false,
            marker: *c as char,
            start: 1,
            end: index + 1,
        }),
        _ => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 || digits > MAX_ORDERED_DIGITS {
                return None;
            }
            let delimiter = *bytes.get(digits).filter(|b| matches!(b, b'.' | b')'))?;
            if !followed_by_space(digits + 1) {
                return None;
            }
            Some(Marker {
                ordered: true,
                marker: delimiter as char,
                start: s[..digits].parse().ok()?,
                end: index + digits + 1,
            })
        }
    }
}

fn same_list(kind: &NodeKind, marker: &Marker) -> bool {
    match kind {
        NodeKind::BulletList(d) => !marker.ordered && d.marker == marker.marker,
        NodeKind::OrderedList(d) => marker.ordered && d.marker == marker.marker,
        _ => false,
    }
}

pub struct ListFactory;

impl Dependent for ListFactory {
    fn dependency_key(&self) -> &'static str {
        "list"
    }
}

impl BlockParserFactory for ListFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let marker_index = state.next_non_space_index();
        let marker_column = state.column() + state.indent();
        let marker = parse_marker(line, marker_index)?;

        let column_after_marker = marker_column + (marker.end - marker_index);
        let mut content_column = column_after_marker;
        let mut has_content = false;
        for c in line.as_str()[marker.end..].chars() {
            match c {
                '\t' => content_column += state.columns_to_next_tab_stop(content_column),
                ' ' => content_column += 1,
                _ => {
                    has_content = true;
                    break;
                }
            }
        }

        if matched.paragraph_lines().is_some() {
            // Interrupting a paragraph needs content and, for ordered
            // lists, a start of 1.
            if !has_content || (marker.ordered && marker.start != 1) {
                return None;
            }
        }
        if !has_content || content_column - column_after_marker > CODE_BLOCK_INDENT {
            content_column = column_after_marker + 1;
        }

        let item = ListItemParser {
            block: NodeKind::ListItem(ListItemData {
                marker: line.slice(marker_index..marker.end),
                content_indent: content_column - marker_column,
            }),
            content_indent: content_column - state.column(),
            has_children: false,
        };

        if same_list(matched.block(), &marker) {
            return Some(BlockStart::of(Box::new(item)).at_column(content_column));
        }
        if state.list_depth() >= state.options().max_list_depth {
            return None;
        }
        let data = ListData {
            marker: marker.marker,
            start: marker.start,
            tight: true,
        };
        let list = ListBlockParser {
            block: if marker.ordered {
                NodeKind::OrderedList(data)
            } else {
                NodeKind::BulletList(data)
            },
        };
        Some(BlockStart::of_many(vec![Box::new(list), Box::new(item)]).at_column(content_column))
    }
}

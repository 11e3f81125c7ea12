use crate::ast::NodeType;
use crate::error::LoomError;
use crate::options::ParseOptions;
use crate::sequence::{BasedSequence, LineRef};

/// Indentation at which a line becomes indented code.
pub const CODE_BLOCK_INDENT: usize = 4;

/// Per-line cursor shared with block parsers and factories.
///
/// `index` is a byte offset into the current line, `column` the visual
/// column after tab expansion. The two diverge inside a partially consumed
/// tab, which is flagged by `partially_consumed_tab`.
#[derive(Debug)]
pub struct ParserState<'a> {
    lines: &'a [LineRef],
    options: &'a ParseOptions,
    line_number: usize,
    line: BasedSequence,
    eol: BasedSequence,
    index: usize,
    column: usize,
    next_non_space: usize,
    next_non_space_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
    pub(crate) active_block: NodeType,
    pub(crate) list_depth: usize,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(lines: &'a [LineRef], options: &'a ParseOptions) -> Self {
        Self {
            lines,
            options,
            line_number: 0,
            line: BasedSequence::empty(),
            eol: BasedSequence::empty(),
            index: 0,
            column: 0,
            next_non_space: 0,
            next_non_space_column: 0,
            indent: 0,
            blank: true,
            partially_consumed_tab: false,
            active_block: NodeType::Document,
            list_depth: 0,
        }
    }

    /// Current line content, without its terminator.
    pub fn line(&self) -> &BasedSequence {
        &self.line
    }

    pub fn eol(&self) -> &BasedSequence {
        &self.eol
    }

    pub fn line_with_eol(&self) -> BasedSequence {
        self.line.spliced(&self.eol).unwrap_or_else(|| self.line.clone())
    }

    /// Zero-based number of the current line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn next_non_space_index(&self) -> usize {
        self.next_non_space
    }

    pub fn next_non_space_column(&self) -> usize {
        self.next_non_space_column
    }

    /// Columns between the cursor and the first non-space character.
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }

    pub fn partially_consumed_tab(&self) -> bool {
        self.partially_consumed_tab
    }

    /// Type of the innermost open block.
    pub fn active_block(&self) -> NodeType {
        self.active_block
    }

    /// Number of open lists enclosing the cursor.
    pub fn list_depth(&self) -> usize {
        self.list_depth
    }

    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    /// A following line, `n` lines below the current one.
    pub fn line_ahead(&self, n: usize) -> Option<&LineRef> {
        self.lines.get(self.line_number + n)
    }

    /// Byte at `index` of the current line.
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.line.byte_at(index)
    }

    /// Content from the first non-space character to the end of the line.
    pub fn rest(&self) -> BasedSequence {
        self.line.sub_from(self.next_non_space)
    }

    /// Absolute buffer offset of a line index.
    pub fn offset_of(&self, index: usize) -> usize {
        self.line.start_offset() + index
    }

    pub fn columns_to_next_tab_stop(&self, column: usize) -> usize {
        let stop = self.options.tab_stop.max(1);
        stop - column % stop
    }

    pub(crate) fn set_line(&mut self, line_number: usize) {
        self.line_number = line_number;
        if let Some(line) = self.lines.get(line_number) {
            self.line = line.line.clone();
            self.eol = line.eol.clone();
        }
        self.index = 0;
        self.column = 0;
        self.partially_consumed_tab = false;
        self.find_next_non_space();
    }

    pub(crate) fn find_next_non_space(&mut self) {
        let bytes = self.line.as_str().as_bytes();
        let mut i = self.index;
        let mut cols = self.column;
        self.blank = true;
        while i < bytes.len() {
            match bytes[i] {
                b' ' => {
                    i += 1;
                    cols += 1;
                }
                b'\t' => {
                    i += 1;
                    cols += self.columns_to_next_tab_stop(cols);
                }
                _ => {
                    self.blank = false;
                    break;
                }
            }
        }
        self.next_non_space = i;
        self.next_non_space_column = cols;
        self.indent = cols - self.column;
    }

    fn advance(&mut self) {
        let Some(b) = self.line.byte_at(self.index) else {
            return;
        };
        if b == b'\t' {
            self.index += 1;
            self.column += self.columns_to_next_tab_stop(self.column);
        } else {
            let width = self.line.char_at(self.index).map_or(1, char::len_utf8);
            self.index += width;
            self.column += 1;
        }
    }

    pub(crate) fn set_new_index(&mut self, new_index: usize) -> Result<(), LoomError> {
        if new_index > self.line.len() {
            return Err(LoomError::contract(
                "block parser",
                format!(
                    "index {new_index} beyond line {} of length {}",
                    self.line_number + 1,
                    self.line.len()
                ),
            ));
        }
        if new_index < self.index {
            return Err(LoomError::contract(
                "block parser",
                format!(
                    "index moved backwards from {} to {new_index} on line {}",
                    self.index,
                    self.line_number + 1
                ),
            ));
        }
        if new_index >= self.next_non_space {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.index < new_index && self.index < self.line.len() {
            self.advance();
        }
        self.partially_consumed_tab = false;
        Ok(())
    }

    pub(crate) fn set_new_column(&mut self, new_column: usize) -> Result<(), LoomError> {
        if new_column < self.column {
            return Err(LoomError::contract(
                "block parser",
                format!(
                    "column moved backwards from {} to {new_column} on line {}",
                    self.column,
                    self.line_number + 1
                ),
            ));
        }
        if new_column >= self.next_non_space_column {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        while self.column < new_column && self.index < self.line.len() {
            self.advance();
        }
        if self.column > new_column {
            // Stopped inside a tab: stay on it and remember the leftover.
            self.index -= 1;
            self.column = new_column;
            self.partially_consumed_tab = true;
        } else {
            self.partially_consumed_tab = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::lines_with_spans;

    fn with_state(text: &str, f: impl FnOnce(&mut ParserState<'_>)) {
        let seq = BasedSequence::new(text);
        let lines: Vec<LineRef> = lines_with_spans(&seq).collect();
        let options = ParseOptions::default();
        let mut state = ParserState::new(&lines, &options);
        state.set_line(0);
        f(&mut state);
    }

    #[test]
    fn measures_indent_with_tabs() {
        with_state("  \tfoo", |s| {
            assert_eq!(s.next_non_space_index(), 3);
            assert_eq!(s.next_non_space_column(), 4);
            assert_eq!(s.indent(), 4);
            assert!(!s.is_blank());
        });
    }

    #[test]
    fn column_inside_tab_is_partial() {
        with_state("\tfoo", |s| {
            s.set_new_column(2).unwrap();
            assert_eq!(s.index(), 0);
            assert_eq!(s.column(), 2);
            assert!(s.partially_consumed_tab());
            s.find_next_non_space();
            assert_eq!(s.indent(), 2);
        });
    }

    #[test]
    fn backwards_index_is_contract_violation() {
        with_state("abc", |s| {
            s.set_new_index(2).unwrap();
            assert!(matches!(
                s.set_new_index(1),
                Err(LoomError::ContractViolation { .. })
            ));
            assert!(s.set_new_index(9).is_err());
        });
    }

    #[test]
    fn lookahead_sees_following_lines() {
        with_state("a\nb\nc", |s| {
            assert_eq!(s.line_ahead(2).map(|l| l.line.as_str()), Some("c"));
            assert!(s.line_ahead(3).is_none());
        });
    }

    #[test]
    fn line_with_eol_keeps_terminator() {
        with_state("ab\r\ncd", |s| {
            assert_eq!(s.line().as_str(), "ab");
            assert_eq!(s.line_with_eol().as_str(), "ab\r\n");
        });
    }
}

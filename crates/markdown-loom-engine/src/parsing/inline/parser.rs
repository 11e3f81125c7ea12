use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::ast::{Ast, AutoLinkData, DelimitedData, Document, LinkData, LinkForm, NodeId, NodeKind};
use crate::error::LoomError;
use crate::parsing::patterns::{email_autolink, entity, html_tag, uri_autolink};
use crate::sequence::{BasedSequence, SegmentedSequence};

use super::cursor::Cursor;
use super::delimiter::{Delimiter, DelimiterProcessor, Flanking};
use super::link::{MAX_LABEL_CHARS, scan_destination, scan_label, scan_title};

/// What a [`DelimiterProcessor`] sees while building its node.
pub struct InlineContext<'a> {
    doc: &'a mut Document,
    block: NodeId,
}

impl InlineContext<'_> {
    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.doc
    }

    /// The paragraph or heading being resolved.
    pub fn block(&self) -> NodeId {
        self.block
    }

    pub fn text_of(&self, node: NodeId) -> &str {
        self.doc.chars(node).as_str()
    }

    /// Wraps everything between the opener's and the closer's text nodes in
    /// a new node built by `make`, inserted right after the opener.
    ///
    /// The markers are the `used` characters just trimmed from the two
    /// runs, so the new node's `chars` span from the opening marker through
    /// the closing marker.
    pub fn wrap(
        &mut self,
        opener: &Delimiter,
        closer: &Delimiter,
        used: usize,
        make: impl FnOnce(DelimitedData) -> NodeKind,
    ) -> NodeId {
        let open_text = self.doc.chars(opener.node).clone();
        let close_text = self.doc.chars(closer.node).clone();
        let open_end = open_text.end_offset() + used * opener.char.len_utf8();
        let close_start = close_text
            .start_offset()
            .saturating_sub(used * closer.char.len_utf8());
        let opening = open_text
            .base_sub_sequence(open_text.end_offset(), open_end)
            .unwrap_or_else(|_| open_text.end_sequence());
        let closing = close_text
            .base_sub_sequence(close_start, close_text.start_offset())
            .unwrap_or_else(|_| close_text.start_sequence());
        let chars = opening.span_to(&closing).unwrap_or_else(|| opening.clone());

        let node = self
            .doc
            .new_node(Ast::new(make(DelimitedData::between(opening, closing)), chars));
        let mut next = self.doc.next_sibling(opener.node);
        while let Some(id) = next {
            if id == closer.node {
                break;
            }
            next = self.doc.next_sibling(id);
            self.doc.append_node(node, id);
        }
        self.doc.insert_after(opener.node, node);
        node
    }
}

/// Resolves the inline content of paragraphs and headings.
pub struct InlineParser {
    processors: HashMap<char, Arc<dyn DelimiterProcessor>>,
}

impl InlineParser {
    /// Indexes processors by the characters they claim.
    pub fn new(
        processors: impl IntoIterator<Item = Arc<dyn DelimiterProcessor>>,
    ) -> Result<Self, LoomError> {
        let mut by_char: HashMap<char, Arc<dyn DelimiterProcessor>> = HashMap::new();
        for processor in processors {
            let mut chars = vec![processor.opening_char()];
            if processor.closing_char() != processor.opening_char() {
                chars.push(processor.closing_char());
            }
            for c in chars {
                if by_char.insert(c, Arc::clone(&processor)).is_some() {
                    return Err(LoomError::DuplicateRegistration {
                        key: format!("delimiter '{c}'"),
                    });
                }
            }
        }
        Ok(Self {
            processors: by_char,
        })
    }

    /// Replaces the raw lines of `block` with inline children.
    ///
    /// Fails when a delimiter processor claims more characters than a run
    /// has left.
    pub fn parse(&self, doc: &mut Document, block: NodeId) -> Result<(), LoomError> {
        let seq = doc.get(block).content.to_segmented(doc.source());
        let full = seq.to_string();
        let text = full.trim_end_matches([' ', '\t']);
        trace!("inlines of {:?}: {:?}", doc.kind(block).node_type(), text);
        {
            let mut run = InlineRun {
                ctx: InlineContext { doc, block },
                seq: &seq,
                cur: Cursor::new(text),
                processors: &self.processors,
                delimiters: Vec::new(),
                last_delimiter: None,
                brackets: Vec::new(),
                pending: None,
            };
            run.scan()?;
            run.process_delimiters(None)?;
        }
        merge_text_nodes(doc, block);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Bracket {
    /// Text node holding `[` or `![`.
    node: NodeId,
    image: bool,
    text_start: usize,
    content_start: usize,
    previous_delimiter: Option<usize>,
    active: bool,
    /// Another bracket opened after this one.
    bracket_after: bool,
}

/// Per-block resolver state. Offsets are into the block's joined text.
struct InlineRun<'a> {
    ctx: InlineContext<'a>,
    seq: &'a SegmentedSequence,
    cur: Cursor<'a>,
    processors: &'a HashMap<char, Arc<dyn DelimiterProcessor>>,
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    /// Start of literal text not yet turned into a node.
    pending: Option<usize>,
}

impl InlineRun<'_> {
    fn view(&self, start: usize, end: usize) -> BasedSequence {
        self.seq.source_view(start, end)
    }

    fn append(&mut self, kind: NodeKind, start: usize, end: usize) -> NodeId {
        let chars = self.view(start, end);
        let block = self.ctx.block;
        self.ctx.doc.append(block, Ast::new(kind, chars))
    }

    fn flush_text(&mut self, end: usize) {
        if let Some(start) = self.pending.take()
            && end > start
        {
            self.append(NodeKind::Text, start, end);
        }
    }

    /// Treats the next `n` bytes as literal text.
    fn literal(&mut self, n: usize) {
        self.pending.get_or_insert(self.cur.i);
        self.cur.bump_n(n);
    }

    fn scan(&mut self) -> Result<(), LoomError> {
        while let Some(b) = self.cur.peek() {
            let handled = match b {
                b'\n' | b'\r' => {
                    self.line_break();
                    true
                }
                b'\\' => self.backslash(),
                b'`' => {
                    self.code_span();
                    true
                }
                b'&' => self.entity(),
                b'<' => self.angle(),
                b'[' => {
                    self.open_bracket(false);
                    true
                }
                b'!' if self.cur.peek_at(1) == Some(b'[') => {
                    self.open_bracket(true);
                    true
                }
                b']' => {
                    self.close_bracket()?;
                    true
                }
                _ => match self.cur.peek_char() {
                    Some(c) if self.processors.contains_key(&c) => self.delimiter_run(c),
                    _ => false,
                },
            };
            if !handled {
                self.pending.get_or_insert(self.cur.i);
                self.cur.bump_char();
            }
        }
        self.flush_text(self.cur.i);
        Ok(())
    }

    fn line_break(&mut self) {
        let start = self.cur.i;
        let floor = self.pending.unwrap_or(start);
        let spaces_start = self.cur.s[..start].trim_end_matches(' ').len().max(floor);
        let hard = start - spaces_start >= 2;
        self.flush_text(spaces_start);
        let eol = if self.cur.starts_with(b"\r\n") { 2 } else { 1 };
        self.cur.bump_n(eol);
        let kind = if hard {
            NodeKind::HardLineBreak
        } else {
            NodeKind::SoftLineBreak
        };
        self.append(kind, spaces_start, self.cur.i);
        self.cur.bump_while(|b| b == b' ' || b == b'\t');
    }

    fn backslash(&mut self) -> bool {
        let start = self.cur.i;
        match self.cur.peek_at(1) {
            Some(b'\n' | b'\r') => {
                self.flush_text(start);
                self.cur.bump();
                let eol = if self.cur.starts_with(b"\r\n") { 2 } else { 1 };
                self.cur.bump_n(eol);
                self.append(NodeKind::HardLineBreak, start, self.cur.i);
                self.cur.bump_while(|b| b == b' ' || b == b'\t');
                true
            }
            Some(b) if b.is_ascii_punctuation() => {
                // Kept raw; renderers resolve the escape.
                self.flush_text(start);
                self.cur.bump_n(2);
                self.append(NodeKind::Text, start, self.cur.i);
                true
            }
            _ => false,
        }
    }

    fn code_span(&mut self) {
        let start = self.cur.i;
        let ticks = self.cur.bump_while(|b| b == b'`');
        let open_end = self.cur.i;

        let mut search = self.cur.clone();
        let (close_start, close_end) = loop {
            search.bump_while(|b| b != b'`');
            if search.eof() {
                // No closing run: the backticks are literal.
                self.pending.get_or_insert(start);
                return;
            }
            let run_start = search.i;
            if search.bump_while(|b| b == b'`') == ticks {
                break (run_start, search.i);
            }
        };

        self.flush_text(start);
        let opening = self.view(start, open_end);
        let closing = self.view(close_start, close_end);
        let chars = opening.span_to(&closing).unwrap_or_else(|| opening.clone());
        let code = self.ctx.doc.append(
            self.ctx.block,
            Ast::new(NodeKind::Code(DelimitedData::between(opening, closing)), chars),
        );

        let text: &str = self.cur.s;
        let bytes = text.as_bytes();
        let mut line_start = open_end;
        let mut i = open_end;
        while i < close_start {
            if matches!(bytes[i], b'\n' | b'\r') {
                let eol = if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                if i > line_start {
                    let text = self.view(line_start, i);
                    self.ctx.doc.append(code, Ast::new(NodeKind::Text, text));
                }
                let eol_chars = self.view(i, i + eol);
                self.ctx
                    .doc
                    .append(code, Ast::new(NodeKind::SoftLineBreak, eol_chars));
                i += eol;
                line_start = i;
            } else {
                i += 1;
            }
        }
        if close_start > line_start {
            let text = self.view(line_start, close_start);
            self.ctx.doc.append(code, Ast::new(NodeKind::Text, text));
        }
        self.cur.i = close_end;
    }

    fn entity(&mut self) -> bool {
        let Some(m) = entity().find(self.cur.rest()) else {
            return false;
        };
        let start = self.cur.i;
        let end = start + m.end();
        self.flush_text(start);
        self.append(NodeKind::HtmlEntity, start, end);
        self.cur.i = end;
        true
    }

    fn angle(&mut self) -> bool {
        let rest = self.cur.rest();
        let start = self.cur.i;
        let autolink = [(uri_autolink(), false), (email_autolink(), true)]
            .into_iter()
            .find_map(|(re, email)| {
                let caps = re.captures(rest)?;
                let url = caps.get(1)?;
                Some((caps.get(0)?.end(), url.range(), email))
            });

        let (end, kind) = if let Some((len, url, email)) = autolink {
            let url = self.view(start + url.start, start + url.end);
            (start + len, NodeKind::AutoLink(AutoLinkData { url, email }))
        } else if let Some(m) = html_tag().find(rest) {
            (start + m.end(), NodeKind::HtmlInline)
        } else {
            return false;
        };
        self.flush_text(start);
        self.append(kind, start, end);
        self.cur.i = end;
        true
    }

    fn open_bracket(&mut self, image: bool) {
        let start = self.cur.i;
        self.flush_text(start);
        self.cur.bump_n(if image { 2 } else { 1 });
        let node = self.append(NodeKind::Text, start, self.cur.i);
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            image,
            text_start: start,
            content_start: self.cur.i,
            previous_delimiter: self.last_delimiter,
            active: true,
            bracket_after: false,
        });
    }

    fn close_bracket(&mut self) -> Result<(), LoomError> {
        let start = self.cur.i;
        let Some(opener) = self.brackets.last().cloned() else {
            self.literal(1);
            return Ok(());
        };
        if !opener.active {
            self.brackets.pop();
            self.literal(1);
            return Ok(());
        }
        let Some((end, data)) = self
            .inline_link(&opener, start)
            .or_else(|| self.reference_link(&opener, start))
        else {
            self.brackets.pop();
            self.literal(1);
            return Ok(());
        };

        self.flush_text(start);
        self.brackets.pop();
        self.cur.i = end;
        let chars = self.view(opener.text_start, end);
        let kind = if opener.image {
            NodeKind::Image(data)
        } else {
            NodeKind::Link(data)
        };
        let doc = &mut *self.ctx.doc;
        let link = doc.new_node(Ast::new(kind, chars));
        let mut next = doc.next_sibling(opener.node);
        while let Some(id) = next {
            next = doc.next_sibling(id);
            doc.append_node(link, id);
        }
        doc.insert_after(opener.node, link);

        self.process_delimiters(opener.previous_delimiter)?;
        self.ctx.doc.remove_subtree(opener.node);
        if !opener.image {
            // No links inside links.
            for bracket in self.brackets.iter_mut().filter(|b| !b.image) {
                bracket.active = false;
            }
        }
        Ok(())
    }

    /// `](destination "title")` after the bracket text.
    fn inline_link(&self, opener: &Bracket, close: usize) -> Option<(usize, LinkData)> {
        let mut c = self.cur.clone();
        c.i = close + 1;
        if c.bump()? != b'(' {
            return None;
        }
        c.skip_spnl();
        let url = if c.peek() == Some(b')') {
            c.i..c.i
        } else {
            scan_destination(&mut c)?
        };
        let title = if c.skip_spnl() { scan_title(&mut c) } else { None };
        if title.is_some() {
            c.skip_spnl();
        }
        if c.bump()? != b')' {
            return None;
        }
        let data = LinkData {
            form: LinkForm::Inline,
            text: self.view(opener.content_start, close),
            url: self.view(url.start, url.end),
            title: title.map(|t| self.view(t.start, t.end)),
            reference: None,
        };
        Some((c.i, data))
    }

    /// `][label]`, `][]` or a bare `]` resolved against the definitions.
    fn reference_link(&self, opener: &Bracket, close: usize) -> Option<(usize, LinkData)> {
        let mut c = self.cur.clone();
        c.i = close + 1;
        let (form, label) = if let Some(label) = scan_label(&mut c) {
            (LinkForm::Full, label)
        } else if opener.bracket_after {
            return None;
        } else if c.starts_with(b"[]") {
            c.bump_n(2);
            (LinkForm::Collapsed, opener.content_start..close)
        } else {
            (LinkForm::Shortcut, opener.content_start..close)
        };
        let label_text = &self.cur.s[label.clone()];
        if label_text.chars().count() > MAX_LABEL_CHARS {
            return None;
        }
        let target = self.ctx.document().references().get(label_text)?;
        let data = LinkData {
            form,
            text: self.view(opener.content_start, close),
            url: target.url.clone(),
            title: target.title.clone(),
            reference: Some(self.view(label.start, label.end)),
        };
        Some((c.i, data))
    }

    fn delimiter_run(&mut self, c: char) -> bool {
        let Some(processor) = self.processors.get(&c).cloned() else {
            return false;
        };
        let start = self.cur.i;
        let before = self.cur.char_before();
        let mut length = 0;
        while self.cur.peek_char() == Some(c) {
            self.cur.bump_char();
            length += 1;
        }
        if length < processor.min_length() {
            self.pending.get_or_insert(start);
            return true;
        }
        let flanking = Flanking::new(before, self.cur.peek_char());
        let can_open = c == processor.opening_char() && processor.can_be_opener(&flanking);
        let can_close = c == processor.closing_char() && processor.can_be_closer(&flanking);

        self.flush_text(start);
        let node = self.append(NodeKind::Text, start, self.cur.i);
        if !can_open && !can_close && processor.skip_non_opener_closer() {
            return true;
        }
        let index = self.delimiters.len();
        self.delimiters.push(Delimiter {
            node,
            char: c,
            length,
            original_length: length,
            can_open,
            can_close,
            flanking,
            prev: self.last_delimiter,
            next: None,
        });
        if let Some(last) = self.last_delimiter {
            self.delimiters[last].next = Some(index);
        }
        self.last_delimiter = Some(index);
        true
    }

    /// Matches closers above `stack_bottom` with openers, left to right.
    ///
    /// Delimiters are numbered in document order, so "above the bottom"
    /// is a plain index comparison even after removals.
    fn process_delimiters(&mut self, stack_bottom: Option<usize>) -> Result<(), LoomError> {
        let above = |i: usize| stack_bottom.is_none_or(|b| i > b);
        let mut openers_bottom: HashMap<char, Option<usize>> = HashMap::new();

        let mut closer = None;
        let mut walk = self.last_delimiter;
        while let Some(i) = walk {
            if !above(i) {
                break;
            }
            closer = Some(i);
            walk = self.delimiters[i].prev;
        }

        while let Some(ci) = closer {
            let c = self.delimiters[ci].char;
            let next = self.delimiters[ci].next;
            let processor = match self.processors.get(&c) {
                Some(p) if self.delimiters[ci].can_close => Arc::clone(p),
                _ => {
                    closer = next;
                    continue;
                }
            };
            let opening_char = processor.opening_char();
            let bottom = openers_bottom.get(&c).copied().flatten();

            let mut used = 0;
            let mut found = None;
            let mut potential = false;
            let mut walk = self.delimiters[ci].prev;
            while let Some(oi) = walk {
                if !above(oi) || bottom.is_some_and(|b| oi <= b) {
                    break;
                }
                let opener = &self.delimiters[oi];
                if opener.can_open && opener.char == opening_char {
                    potential = true;
                    used = processor.delimiter_use(opener, &self.delimiters[ci]);
                    if used > 0 {
                        found = Some(oi);
                        break;
                    }
                }
                walk = opener.prev;
            }

            let Some(oi) = found else {
                // Openers that were offered and refused stay searchable, so a
                // processor refusing every pair costs a walk per closer.
                if !potential {
                    openers_bottom.insert(c, self.delimiters[ci].prev);
                    if !self.delimiters[ci].can_open {
                        self.remove_delimiter(ci);
                    }
                }
                closer = next;
                continue;
            };

            let available = self.delimiters[oi].length.min(self.delimiters[ci].length);
            if used > available {
                return Err(LoomError::contract(
                    format!("delimiter processor '{opening_char}'"),
                    format!("used {used} characters of runs with {available} left"),
                ));
            }
            self.delimiters[oi].length -= used;
            self.delimiters[ci].length -= used;
            self.trim_run(oi, used, true);
            self.trim_run(ci, used, false);
            self.remove_delimiters_between(oi, ci);

            let opener = self.delimiters[oi].clone();
            let closer_delim = self.delimiters[ci].clone();
            processor.process(&mut self.ctx, &opener, &closer_delim, used);

            if self.delimiters[oi].length == 0 {
                self.remove_delimiter_and_node(oi);
            }
            if self.delimiters[ci].length == 0 {
                let next = self.delimiters[ci].next;
                self.remove_delimiter_and_node(ci);
                closer = next;
            }
        }

        while let Some(last) = self.last_delimiter {
            if !above(last) {
                break;
            }
            self.remove_delimiter(last);
        }
        Ok(())
    }

    /// Drops `used` characters from the end (opener) or start (closer) of
    /// a run's text node.
    fn trim_run(&mut self, index: usize, used: usize, from_end: bool) {
        let delimiter = &self.delimiters[index];
        let width = used * delimiter.char.len_utf8();
        let node = delimiter.node;
        let chars = self.ctx.doc.chars(node).clone();
        let width = width.min(chars.len());
        let trimmed = if from_end {
            chars.sub_to(chars.len() - width)
        } else {
            chars.sub_from(width)
        };
        self.ctx.doc.get_mut(node).chars = trimmed;
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = (self.delimiters[index].prev, self.delimiters[index].next);
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
        match next {
            Some(n) => self.delimiters[n].prev = prev,
            None => self.last_delimiter = prev,
        }
    }

    /// Gives up on a run, leaving its characters in place.
    fn remove_delimiter(&mut self, index: usize) {
        let delimiter = self.delimiters[index].clone();
        if let Some(processor) = self.processors.get(&delimiter.char)
            && let Some(kind) = processor.unmatched_delimiter_node(&self.ctx, &delimiter)
            && !self.ctx.doc.is_removed(delimiter.node)
        {
            self.ctx.doc.get_mut(delimiter.node).kind = kind;
        }
        self.unlink(index);
    }

    fn remove_delimiter_and_node(&mut self, index: usize) {
        let node = self.delimiters[index].node;
        self.ctx.doc.remove_subtree(node);
        self.unlink(index);
    }

    fn remove_delimiters_between(&mut self, opener: usize, closer: usize) {
        let mut walk = self.delimiters[closer].prev;
        while let Some(i) = walk {
            if i == opener {
                break;
            }
            walk = self.delimiters[i].prev;
            self.remove_delimiter(i);
        }
    }
}

/// Joins adjacent text nodes that are contiguous in the source.
fn merge_text_nodes(doc: &mut Document, root: NodeId) {
    let parents: Vec<NodeId> = doc.descendants(root).collect();
    for parent in parents {
        let mut child = doc.first_child(parent);
        while let Some(id) = child {
            let next = doc.next_sibling(id);
            if matches!(doc.kind(id), NodeKind::Text)
                && let Some(n) = next
                && matches!(doc.kind(n), NodeKind::Text)
                && let Some(joined) = doc.chars(id).spliced(doc.chars(n))
            {
                doc.get_mut(id).chars = joined;
                doc.remove_subtree(n);
                continue;
            }
            child = next;
        }
    }
}

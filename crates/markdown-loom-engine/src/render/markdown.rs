use crate::ast::{Document, LinkData, LinkForm, NodeId, NodeKind};
use crate::options::FormatOptions;
use crate::sequence::{BasedSequence, SegmentBuilder, SegmentedSequence};

/// Writes a [`Document`] back out as normalized Markdown.
///
/// Text, code and raw HTML are copied from the source, so most of the
/// output maps back to source offsets; markers, indentation and blank
/// lines are inserted.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    options: FormatOptions,
}

impl MarkdownFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn format(&self, doc: &Document) -> SegmentedSequence {
        let mut writer = Writer {
            doc,
            options: &self.options,
            out: SegmentBuilder::new(doc.source()),
            prefixes: Vec::new(),
            at_line_start: true,
            line_bullet: None,
            lead: Lead::Inside,
        };
        writer.blocks(doc.root(), false);
        writer.line();
        writer.out.to_sequence()
    }
}

/// Formats with default options.
pub fn format_markdown(doc: &Document) -> String {
    MarkdownFormatter::default().format(doc).to_string()
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a FormatOptions,
    out: SegmentBuilder,
    /// Container prefixes, outermost first, written at each line start.
    prefixes: Vec<String>,
    at_line_start: bool,
    /// Bullet written on the current line with nothing after it yet.
    line_bullet: Option<char>,
    /// Where the next inline node of a paragraph starts.
    lead: Lead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    /// First line of a paragraph.
    First,
    /// Line following a break inside a paragraph.
    Continuation,
    Inside,
}

/// Indent that keeps a continuation line from opening a block.
const CONTINUATION_INDENT: &str = "    ";

impl Writer<'_> {
    fn prefix(&mut self) {
        if self.at_line_start {
            let prefix = self.prefixes.concat();
            if !prefix.is_empty() {
                self.out.append_str(&prefix);
            }
            self.at_line_start = false;
        }
    }

    fn source(&mut self, seq: &BasedSequence) {
        if !seq.is_empty() {
            self.prefix();
            self.out.append(seq);
            self.lead = Lead::Inside;
        }
    }

    fn text(&mut self, s: &str) {
        if !s.is_empty() {
            self.prefix();
            self.out.append_str(s);
            self.lead = Lead::Inside;
        }
    }

    fn line(&mut self) {
        if !self.at_line_start {
            self.out.append_char('\n', 1);
            self.at_line_start = true;
        }
        self.line_bullet = None;
    }

    fn blank_line(&mut self) {
        self.line();
        let prefix = self.prefixes.concat();
        self.out.append_str(prefix.trim_end());
        self.out.append_char('\n', 1);
    }

    /// Child blocks of `parent`, separated by blank lines unless `tight`.
    fn blocks(&mut self, parent: NodeId, tight: bool) {
        let doc = self.doc;
        let mut previous: Option<NodeId> = None;
        for child in doc.children(parent) {
            if let Some(prev) = previous {
                let references = matches!(doc.kind(prev), NodeKind::Reference(_))
                    && matches!(doc.kind(child), NodeKind::Reference(_));
                if tight || references {
                    self.line();
                } else {
                    self.blank_line();
                }
            }
            self.block(child);
            previous = Some(child);
        }
    }

    fn block(&mut self, node: NodeId) {
        let doc = self.doc;
        match doc.kind(node) {
            NodeKind::Paragraph => {
                self.lead = Lead::First;
                self.inlines(node, false);
                self.lead = Lead::Inside;
            }
            NodeKind::Heading(h) => {
                self.text(&"#".repeat(usize::from(h.level)));
                if doc.first_child(node).is_some() {
                    self.text(" ");
                    self.heading_content(node);
                }
            }
            NodeKind::ThematicBreak => {
                let after_paragraph = doc
                    .previous_sibling(node)
                    .is_some_and(|p| matches!(doc.kind(p), NodeKind::Paragraph));
                let rule = if !self.at_line_start {
                    // Behind list markers, a `-` or `*` rule reads as more markers.
                    "___".to_string()
                } else if after_paragraph && self.options.thematic_break.starts_with('-') {
                    "***".to_string()
                } else {
                    self.options.thematic_break.clone()
                };
                self.text(&rule);
            }
            NodeKind::BlockQuote => {
                if doc.first_child(node).is_none() {
                    self.text(">");
                    return;
                }
                if !self.at_line_start {
                    self.text("> ");
                }
                self.prefixes.push("> ".to_string());
                self.blocks(node, false);
                self.prefixes.pop();
            }
            NodeKind::BulletList(_) | NodeKind::OrderedList(_) => self.list(node),
            NodeKind::FencedCodeBlock(data) => {
                self.code_block(node, Some(&data.info));
            }
            NodeKind::IndentedCodeBlock => self.code_block(node, None),
            NodeKind::HtmlBlock => {
                let lines = doc.get(node).content.lines.clone();
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        self.line();
                    }
                    if line.is_blank() {
                        self.blank_line();
                        continue;
                    }
                    self.text(&" ".repeat(line.pad));
                    self.source(&line.chars);
                }
            }
            NodeKind::Reference(data) => {
                self.text("[");
                self.source(&data.label);
                self.text("]: ");
                self.destination(&data.url);
                if let Some(title) = &data.title {
                    self.text(" ");
                    self.title(title);
                }
            }
            NodeKind::Custom(custom) if custom.block && !custom.leaf => self.blocks(node, false),
            _ => self.inline(node, false),
        }
    }

    fn list(&mut self, list: NodeId) {
        let doc = self.doc;
        let Some(data) = doc.kind(list).list_data() else {
            return;
        };
        let ordered = matches!(doc.kind(list), NodeKind::OrderedList(_));
        let previous = doc.previous_sibling(list).filter(|&p| {
            matches!(
                (doc.kind(p), ordered),
                (NodeKind::BulletList(_), false) | (NodeKind::OrderedList(_), true)
            )
        });
        let marker_char = self.list_marker(list, ordered);
        // Adjacent lists of one type must not share a marker or they merge.
        let marker_char = match previous {
            Some(p) if self.list_marker(p, ordered) == marker_char => {
                alternate(marker_char, ordered)
            }
            _ => marker_char,
        };
        // Three equal bullets on one line would form a thematic break.
        let shares_line = !self.at_line_start && self.line_bullet == Some(marker_char);
        let marker_char = if !ordered && shares_line {
            alternate(marker_char, ordered)
        } else {
            marker_char
        };

        for (i, item) in doc.children(list).enumerate() {
            if i > 0 {
                if data.tight {
                    self.line();
                } else {
                    self.blank_line();
                }
            }
            let marker = if ordered {
                format!("{}{}", data.start + i as u64, marker_char)
            } else {
                marker_char.to_string()
            };
            if doc.first_child(item).is_none() {
                self.text(&marker);
                continue;
            }
            self.text(&marker);
            self.text(" ");
            self.line_bullet = (!ordered).then_some(marker_char);
            self.prefixes.push(" ".repeat(marker.len() + 1));
            self.blocks(item, data.tight);
            self.prefixes.pop();
        }
    }

    /// The marker a list is written with before adjacent-list alternation.
    fn list_marker(&self, list: NodeId, ordered: bool) -> char {
        let Some(data) = self.doc.kind(list).list_data() else {
            return '-';
        };
        match self.options.bullet_marker {
            Some(forced) if !ordered => forced,
            _ => data.marker,
        }
    }

    fn code_block(&mut self, node: NodeId, info: Option<&BasedSequence>) {
        let doc = self.doc;
        let lines = &doc.get(node).content.lines;
        let use_tildes = info.is_some_and(|i| i.as_str().contains('`'));
        let fence_char = if use_tildes { '~' } else { '`' };
        let longest = lines
            .iter()
            .map(|l| longest_run(l.chars.as_str(), fence_char))
            .max()
            .unwrap_or(0);
        let fence = fence_char.to_string().repeat((longest + 1).max(3));

        self.text(&fence);
        if let Some(info) = info {
            if info.first_char() == Some(fence_char) {
                self.text(" ");
            }
            self.source(info);
        }
        for line in lines {
            self.line();
            if line.is_blank() {
                self.blank_line();
                continue;
            }
            self.text(&" ".repeat(line.pad));
            self.source(&line.chars);
        }
        self.line();
        self.text(&fence);
    }

    /// ATX heading text; a trailing `#` run standing alone is escaped so it
    /// is not taken for a closing sequence.
    fn heading_content(&mut self, node: NodeId) {
        let doc = self.doc;
        let last = doc.last_child(node);
        for child in doc.children(node) {
            if Some(child) == last && matches!(doc.kind(child), NodeKind::Text) {
                let seq = doc.chars(child);
                let s = seq.as_str();
                let body = s.trim_end_matches('#');
                if body.len() < s.len() && (body.is_empty() || body.ends_with([' ', '\t'])) {
                    self.source(&seq.sub_to(body.len()));
                    self.text("\\");
                    self.source(&seq.sub_from(body.len()));
                    continue;
                }
            }
            self.inline(child, true);
        }
    }

    fn inlines(&mut self, parent: NodeId, in_heading: bool) {
        let doc = self.doc;
        for child in doc.children(parent) {
            self.inline(child, in_heading);
        }
    }

    fn inline(&mut self, node: NodeId, in_heading: bool) {
        let doc = self.doc;
        let lead = std::mem::replace(&mut self.lead, Lead::Inside);
        match doc.kind(node) {
            NodeKind::SoftLineBreak | NodeKind::HardLineBreak if in_heading => self.text(" "),
            NodeKind::SoftLineBreak => {
                self.line();
                self.lead = Lead::Continuation;
            }
            NodeKind::HardLineBreak => {
                // A lone trailing backslash would escape a backslash break.
                let dangling = doc
                    .previous_sibling(node)
                    .filter(|&p| matches!(doc.kind(p), NodeKind::Text))
                    .is_some_and(|p| doc.chars(p).count_trailing(|c| c == '\\') % 2 == 1);
                self.text(if dangling { "  " } else { "\\" });
                self.line();
                self.lead = Lead::Continuation;
            }
            NodeKind::Code(data) => {
                self.source(&data.opening);
                // Line endings inside code spans render as spaces.
                for child in doc.children(node) {
                    match doc.kind(child) {
                        NodeKind::SoftLineBreak => self.text(" "),
                        _ => self.source(doc.chars(child)),
                    }
                }
                self.source(&data.closing);
            }
            NodeKind::Text if lead != Lead::Inside => self.leading_text(doc.chars(node), lead),
            NodeKind::HtmlInline if lead == Lead::Continuation => {
                self.text(CONTINUATION_INDENT);
                self.source(doc.chars(node));
            }
            NodeKind::Emphasis(data) => {
                let marker = match self.options.emphasis_marker {
                    Some(c) => c.to_string(),
                    None => data.opening.as_str().to_string(),
                };
                self.text(&marker);
                self.inlines(node, in_heading);
                self.text(&marker);
            }
            NodeKind::StrongEmphasis(data) => {
                let marker = match self.options.strong_marker {
                    Some(c) => c.to_string().repeat(2),
                    None => data.opening.as_str().to_string(),
                };
                self.text(&marker);
                self.inlines(node, in_heading);
                self.text(&marker);
            }
            NodeKind::Link(link) => self.link(node, link, "[", in_heading),
            NodeKind::Image(link) => self.link(node, link, "![", in_heading),
            NodeKind::Custom(custom) => {
                self.source(&custom.data.opening);
                self.inlines(node, in_heading);
                self.source(&custom.data.closing);
            }
            _ => self.source(doc.chars(node)),
        }
    }

    /// Text at the start of a paragraph line, kept from reading as block
    /// syntax once the line sits in its new container.
    fn leading_text(&mut self, seq: &BasedSequence, lead: Lead) {
        let s = seq.as_str();
        if lead == Lead::Continuation {
            if opens_block(s) {
                self.text(CONTINUATION_INDENT);
            }
            self.source(seq);
            return;
        }
        if let Some(end) = ordered_marker_end(s) {
            self.source(&seq.sub_to(end));
            self.text("\\");
            self.source(&seq.sub_from(end));
            return;
        }
        match s.as_bytes().first() {
            Some(&b @ (b'*' | b'_' | b'`')) => {
                // Every character of the run, so what is left cannot pair up.
                let run = s.bytes().take_while(|&c| c == b).count();
                for i in 0..run {
                    self.text("\\");
                    self.source(&seq.slice(i..i + 1));
                }
                self.source(&seq.sub_from(run));
            }
            Some(b'#' | b'>' | b'-' | b'+' | b'~' | b'<' | b'[') => {
                self.text("\\");
                self.source(seq);
            }
            _ => self.source(seq),
        }
    }

    fn link(&mut self, node: NodeId, link: &LinkData, open: &str, in_heading: bool) {
        self.text(open);
        self.inlines(node, in_heading);
        self.text("]");
        match link.form {
            LinkForm::Inline => {
                self.text("(");
                self.destination(&link.url);
                if let Some(title) = &link.title {
                    self.text(" ");
                    self.title(title);
                }
                self.text(")");
            }
            LinkForm::Full => {
                self.text("[");
                if let Some(reference) = &link.reference {
                    self.source(reference);
                }
                self.text("]");
            }
            LinkForm::Collapsed => self.text("[]"),
            LinkForm::Shortcut => {}
        }
    }

    fn destination(&mut self, url: &BasedSequence) {
        let s = url.as_str();
        if s.is_empty() || s.contains([' ', '\t']) {
            self.text("<");
            self.source(url);
            self.text(">");
        } else {
            self.source(url);
        }
    }

    fn title(&mut self, title: &BasedSequence) {
        let s = title.as_str();
        let (open, close) = if !s.contains('"') {
            ("\"", "\"")
        } else if !s.contains('\'') {
            ("'", "'")
        } else {
            ("(", ")")
        };
        self.text(open);
        self.source(title);
        self.text(close);
    }
}

fn alternate(marker: char, ordered: bool) -> char {
    match (ordered, marker) {
        (true, '.') => ')',
        (true, _) => '.',
        (false, '-') => '*',
        (false, _) => '-',
    }
}

/// Whether a line starting with `s` could open a block or underline the
/// paragraph above it.
fn opens_block(s: &str) -> bool {
    match s.as_bytes().first() {
        Some(b'#' | b'>' | b'-' | b'+' | b'*' | b'_' | b'=' | b'`' | b'~' | b'<') => true,
        Some(b'0'..=b'9') => ordered_marker_end(s).is_some(),
        _ => false,
    }
}

/// Offset of the `.` or `)` after a leading digit run.
fn ordered_marker_end(s: &str) -> Option<usize> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    matches!(s.as_bytes().get(digits), Some(b'.' | b')')).then_some(digits)
}

fn longest_run(s: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in s.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

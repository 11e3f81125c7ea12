//! Hooks that run over the finished block tree before inline parsing.

use log::debug;

use crate::ast::{
    Ast, ContentLine, Document, NodeId, NodeKind, NodeType, ReferenceData, ReferenceTarget,
};
use crate::extension::Dependent;
use crate::parsing::inline::cursor::Cursor;
use crate::parsing::inline::link::{scan_destination, scan_label, scan_title};
use crate::sequence::{SegmentedSequence, Span};

/// Rewrites one paragraph; may insert siblings before it, shrink it or
/// remove it.
pub trait ParagraphPreProcessor {
    fn pre_process(&mut self, doc: &mut Document, paragraph: NodeId);
}

pub trait ParagraphPreProcessorFactory: Dependent + Send + Sync {
    fn create(&self, doc: &Document) -> Box<dyn ParagraphPreProcessor>;
}

/// Adjusts one block of a registered type.
pub trait BlockPreProcessor {
    fn pre_process(&mut self, doc: &mut Document, block: NodeId);
}

pub trait BlockPreProcessorFactory: Dependent + Send + Sync {
    /// Block types handed to the processor.
    fn node_types(&self) -> Vec<NodeType>;

    fn create(&self, doc: &Document) -> Box<dyn BlockPreProcessor>;
}

/// Extracts `[label]: destination "title"` definitions from the start of
/// paragraphs.
pub struct ReferenceDefinitions;

impl Dependent for ReferenceDefinitions {
    fn dependency_key(&self) -> &'static str {
        "reference_definitions"
    }
}

impl ParagraphPreProcessorFactory for ReferenceDefinitions {
    fn create(&self, _doc: &Document) -> Box<dyn ParagraphPreProcessor> {
        Box::new(ReferenceDefinitionParser)
    }
}

struct ReferenceDefinitionParser;

/// Offsets of one definition within the joined paragraph text.
struct RawDefinition {
    whole: std::ops::Range<usize>,
    label: std::ops::Range<usize>,
    url: std::ops::Range<usize>,
    title: Option<std::ops::Range<usize>>,
}

/// Consumes trailing spaces and one line ending, or fails if anything else
/// follows on the line.
fn at_line_end(cur: &mut Cursor<'_>) -> bool {
    cur.bump_while(|b| b == b' ' || b == b'\t');
    if cur.starts_with(b"\r\n") {
        cur.bump_n(2);
        true
    } else if matches!(cur.peek(), Some(b'\n' | b'\r')) {
        cur.bump();
        true
    } else {
        cur.eof()
    }
}

fn parse_definition(cur: &mut Cursor<'_>) -> Option<RawDefinition> {
    let start = cur.i;
    let parsed = parse_definition_at(cur);
    if parsed.is_none() {
        cur.i = start;
    }
    parsed
}

fn parse_definition_at(cur: &mut Cursor<'_>) -> Option<RawDefinition> {
    if cur.bump_while(|b| b == b' ') > 3 {
        return None;
    }
    let def_start = cur.i;
    let label = scan_label(cur)?;
    if cur.bump()? != b':' {
        return None;
    }
    cur.skip_spnl();
    let url = scan_destination(cur)?;
    let after_url = cur.i;

    if cur.skip_spnl()
        && let Some(title) = scan_title(cur)
    {
        let after_title = cur.i;
        if at_line_end(cur) {
            return Some(RawDefinition {
                whole: def_start..after_title,
                label,
                url,
                title: Some(title),
            });
        }
    }
    // The title, if any, did not work out; the definition may still end
    // after the destination.
    cur.i = after_url;
    at_line_end(cur).then_some(RawDefinition {
        whole: def_start..after_url,
        label,
        url,
        title: None,
    })
}

/// Number of lines fully covered by the first `consumed` bytes of the
/// joined text.
fn lines_consumed(lines: &[ContentLine], consumed: usize) -> usize {
    let last = lines.len().saturating_sub(1);
    let mut end = 0;
    for (i, line) in lines.iter().enumerate() {
        end += line.pad + line.chars.len();
        if i < last {
            end += line.eol.len().max(1);
        }
        if end > consumed {
            return i;
        }
    }
    lines.len()
}

impl ParagraphPreProcessor for ReferenceDefinitionParser {
    fn pre_process(&mut self, doc: &mut Document, paragraph: NodeId) {
        let seq: SegmentedSequence = doc.get(paragraph).content.to_segmented(doc.source());
        let text = seq.to_string();
        let mut cur = Cursor::new(&text);
        let mut definitions = Vec::new();
        while let Some(def) = parse_definition(&mut cur) {
            definitions.push(def);
        }
        if definitions.is_empty() {
            return;
        }

        for def in &definitions {
            let label = seq.source_view(def.label.start, def.label.end);
            let url = seq.source_view(def.url.start, def.url.end);
            let title = def.title.as_ref().map(|t| seq.source_view(t.start, t.end));
            let chars = seq.source_view(def.whole.start, def.whole.end);
            let target = ReferenceTarget {
                url: url.clone(),
                title: title.clone(),
            };
            if !doc.references_mut().insert(label.as_str(), target) {
                debug!("duplicate reference definition [{}] ignored", label);
            }
            let data = ReferenceData { label, url, title };
            let node = doc.new_node(Ast::new(NodeKind::Reference(data), chars));
            doc.insert_before(paragraph, node);
        }

        let consumed = lines_consumed(&doc.get(paragraph).content.lines, cur.i);
        let ast = doc.get_mut(paragraph);
        ast.content.lines.drain(..consumed);
        match ast.content.lines.first().map(|l| l.chars.start_offset()) {
            Some(start) => {
                let span = Span::new(start, ast.chars.end_offset());
                ast.chars = ast.chars.base_slice(span);
            }
            None => doc.remove_subtree(paragraph),
        }
    }
}

/// Marks lists loose when blank lines separate their items or the blocks
/// inside an item.
pub struct ListTightness;

impl Dependent for ListTightness {
    fn dependency_key(&self) -> &'static str {
        "list_tightness"
    }
}

impl BlockPreProcessorFactory for ListTightness {
    fn node_types(&self) -> Vec<NodeType> {
        vec![NodeType::BulletList, NodeType::OrderedList]
    }

    fn create(&self, _doc: &Document) -> Box<dyn BlockPreProcessor> {
        Box::new(ListTightnessProcessor)
    }
}

struct ListTightnessProcessor;

/// Whether a blank line sits between the end of `a` and the start of `b`.
fn blank_line_between(doc: &Document, a: NodeId, b: NodeId) -> bool {
    let end = doc.chars(a).end_offset();
    let start = doc.chars(b).start_offset();
    let source = doc.source().base_str();
    let Some(gap) = source.get(end..start.max(end)) else {
        return false;
    };
    let terminators = gap.matches('\n').count() + gap.matches('\r').count()
        - gap.matches("\r\n").count();
    terminators >= 2
}

fn is_tight(doc: &Document, list: NodeId) -> bool {
    for item in doc.children(list) {
        let next_item = doc.next_sibling(item);
        if let Some(next) = next_item
            && blank_line_between(doc, item, next)
        {
            return false;
        }
        for child in doc.children(item) {
            let next = doc.next_sibling(child).or(next_item);
            if let Some(next) = next
                && blank_line_between(doc, child, next)
            {
                return false;
            }
        }
    }
    true
}

impl BlockPreProcessor for ListTightnessProcessor {
    fn pre_process(&mut self, doc: &mut Document, list: NodeId) {
        let tight = is_tight(doc, list);
        if let NodeKind::BulletList(data) | NodeKind::OrderedList(data) = &mut doc.get_mut(list).kind {
            data.tight = tight;
        }
    }
}

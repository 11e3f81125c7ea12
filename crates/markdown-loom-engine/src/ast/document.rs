use indextree::{Arena, NodeId};

use super::node::{NodeKind, NodeType};
use super::references::ReferenceMap;
use crate::sequence::{BasedSequence, SegmentBuilder, SegmentedSequence};

/// One raw line accumulated by a leaf block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Columns of a partially consumed tab, rendered as spaces before `chars`.
    pub pad: usize,
    /// Line content, without its terminator.
    pub chars: BasedSequence,
    pub eol: BasedSequence,
}

impl ContentLine {
    pub fn new(chars: BasedSequence, eol: BasedSequence) -> Self {
        Self { pad: 0, chars, eol }
    }

    /// The logical text of the line: padding plus content.
    pub fn text(&self) -> String {
        let mut s = " ".repeat(self.pad);
        s.push_str(self.chars.as_str());
        s
    }

    pub fn is_blank(&self) -> bool {
        self.chars.is_blank()
    }
}

/// Raw lines of a leaf block, kept until inline parsing or rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContent {
    pub lines: Vec<ContentLine>,
}

impl BlockContent {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`, each terminated.
    pub fn to_text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut acc, line| {
            acc.push_str(&line.text());
            acc.push('\n');
            acc
        })
    }

    /// Lines joined into one logical sequence over `base`, keeping each
    /// line's source terminator. Tab padding becomes inserted spaces.
    pub fn to_segmented(&self, base: &BasedSequence) -> SegmentedSequence {
        let mut builder = SegmentBuilder::new(base);
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            if line.pad > 0 {
                builder.append_char(' ', line.pad);
            }
            builder.append(&line.chars);
            if i < last {
                if line.eol.is_empty() {
                    builder.append_char('\n', 1);
                } else {
                    builder.append(&line.eol);
                }
            }
        }
        builder.to_sequence()
    }
}

/// Arena payload of one node.
#[derive(Debug, Clone)]
pub struct Ast {
    pub kind: NodeKind,
    /// Full source extent of the node.
    pub chars: BasedSequence,
    /// Raw lines for leaf blocks; empty for everything else.
    pub content: BlockContent,
}

impl Ast {
    pub fn new(kind: NodeKind, chars: BasedSequence) -> Self {
        Self {
            kind,
            chars,
            content: BlockContent::default(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}

/// A parsed document: the source buffer, the node arena and the link
/// reference definitions found in it.
#[derive(Debug, Clone)]
pub struct Document {
    source: BasedSequence,
    arena: Arena<Ast>,
    root: NodeId,
    references: ReferenceMap,
}

impl Document {
    pub fn new(source: BasedSequence) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Ast::new(NodeKind::Document, source.clone()));
        Self {
            source,
            arena,
            root,
            references: ReferenceMap::default(),
        }
    }

    pub fn source(&self) -> &BasedSequence {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn references(&self) -> &ReferenceMap {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut ReferenceMap {
        &mut self.references
    }

    pub fn get(&self, id: NodeId) -> &Ast {
        self.arena[id].get()
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Ast {
        self.arena[id].get_mut()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn chars(&self, id: NodeId) -> &BasedSequence {
        &self.get(id).chars
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// `id` followed by all of its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Strict ancestors of `id`, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.arena[id].is_removed()
    }

    /// Allocates a detached node.
    pub fn new_node(&mut self, ast: Ast) -> NodeId {
        self.arena.new_node(ast)
    }

    /// Allocates a node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, ast: Ast) -> NodeId {
        let id = self.arena.new_node(ast);
        parent.append(id, &mut self.arena);
        id
    }

    /// Moves an existing node (and its subtree) to the end of `parent`.
    pub fn append_node(&mut self, parent: NodeId, child: NodeId) {
        child.detach(&mut self.arena);
        parent.append(child, &mut self.arena);
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        sibling.insert_after(node, &mut self.arena);
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        sibling.insert_before(node, &mut self.arena);
    }

    /// Unlinks `id` from its parent, keeping its subtree.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Puts `new` where `old` was and drops the old subtree.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_after(old, new);
        old.remove_subtree(&mut self.arena);
    }

    pub fn remove_subtree(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    /// Concatenated source text of every `Text` descendant.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter(|&d| matches!(self.kind(d), NodeKind::Text))
            .map(|d| self.chars(d).as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_children() -> (Document, NodeId, NodeId) {
        let source = BasedSequence::new("a b");
        let mut doc = Document::new(source.clone());
        let root = doc.root();
        let para = doc.append(root, Ast::new(NodeKind::Paragraph, source.clone()));
        let a = doc.append(para, Ast::new(NodeKind::Text, source.slice(0..1)));
        doc.append(para, Ast::new(NodeKind::Text, source.slice(2..3)));
        (doc, para, a)
    }

    #[test]
    fn traversal_follows_arena_links() {
        let (doc, para, a) = doc_with_children();
        assert_eq!(doc.parent(para), Some(doc.root()));
        assert_eq!(doc.children(para).count(), 2);
        assert_eq!(doc.ancestors(a).collect::<Vec<_>>(), vec![para, doc.root()]);
        assert_eq!(doc.text_content(para), "ab");
    }

    #[test]
    fn replace_swaps_subtree_in_place() {
        let (mut doc, para, a) = doc_with_children();
        let chars = doc.chars(a).clone();
        let replacement = doc.new_node(Ast::new(NodeKind::HtmlInline, chars));
        doc.replace(a, replacement);
        assert!(doc.is_removed(a));
        assert_eq!(doc.first_child(para), Some(replacement));
        assert_eq!(doc.children(para).count(), 2);
    }

    #[test]
    fn content_text_applies_padding() {
        let line = BasedSequence::new("code");
        let mut content_line = ContentLine::new(line.clone(), line.end_sequence());
        content_line.pad = 2;
        let content = BlockContent {
            lines: vec![content_line],
        };
        assert_eq!(content.to_text(), "  code\n");
    }

    #[test]
    fn segmented_content_skips_container_prefixes() {
        let source = BasedSequence::new("> a\n> b\n");
        let lines = vec![
            ContentLine::new(source.slice(2..3), source.slice(3..4)),
            ContentLine::new(source.slice(6..7), source.slice(7..8)),
        ];
        let seq = BlockContent { lines }.to_segmented(&source);
        assert_eq!(seq.to_string(), "a\nb");
        assert_eq!(seq.base_span(2, 3).map(|s| s.start), Some(6));
    }
}

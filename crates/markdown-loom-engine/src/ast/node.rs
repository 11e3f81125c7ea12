use crate::sequence::BasedSequence;

/// Shared payload of nodes delimited by an opening and a closing marker.
///
/// `opening`, `text` and `closing` are views into the source, so
/// `opening + text + closing` reproduces the node's text for single-line
/// nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelimitedData {
    pub opening: BasedSequence,
    pub text: BasedSequence,
    pub closing: BasedSequence,
}

impl DelimitedData {
    /// Builds the payload from the two marker views, taking the text
    /// between them from the shared buffer.
    pub fn between(opening: BasedSequence, closing: BasedSequence) -> Self {
        let text = opening
            .base_sub_sequence(opening.end_offset(), closing.start_offset().max(opening.end_offset()))
            .unwrap_or_else(|_| opening.end_sequence());
        Self {
            opening,
            text,
            closing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListData {
    /// Bullet char (`-`, `+`, `*`) or ordered delimiter (`.`, `)`).
    pub marker: char,
    pub start: u64,
    pub tight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemData {
    /// The marker as written, e.g. `-` or `12.`.
    pub marker: BasedSequence,
    /// Columns from the marker's start to the item's content.
    pub content_indent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingData {
    pub level: u8,
    pub setext: bool,
    /// `###` for ATX headings, the underline for setext headings.
    pub marker: BasedSequence,
    /// Optional closing `#` run of an ATX heading.
    pub closing: Option<BasedSequence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedCodeData {
    pub fence_char: char,
    pub fence_len: usize,
    pub fence_indent: usize,
    pub opening: BasedSequence,
    pub info: BasedSequence,
    pub closing: Option<BasedSequence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub label: BasedSequence,
    pub url: BasedSequence,
    pub title: Option<BasedSequence>,
}

/// How a link found its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkForm {
    /// `[text](url "title")`
    Inline,
    /// `[text][label]`
    Full,
    /// `[text][]`
    Collapsed,
    /// `[text]`
    Shortcut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkData {
    pub form: LinkForm,
    /// Raw text between the brackets.
    pub text: BasedSequence,
    /// Raw destination, without angle brackets.
    pub url: BasedSequence,
    /// Raw title, without its quotes.
    pub title: Option<BasedSequence>,
    /// Reference label for reference links.
    pub reference: Option<BasedSequence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoLinkData {
    pub url: BasedSequence,
    pub email: bool,
}

/// Extension-defined node kind, identified by its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomNode {
    pub tag: &'static str,
    pub block: bool,
    /// Block whose content lines are parsed for inlines instead of holding
    /// child blocks.
    pub leaf: bool,
    pub data: DelimitedData,
}

impl CustomNode {
    /// Inline custom node wrapping delimited content.
    pub fn inline(tag: &'static str, data: DelimitedData) -> Self {
        Self {
            tag,
            block: false,
            leaf: false,
            data,
        }
    }

    /// Block custom node holding child blocks.
    pub fn block(tag: &'static str, data: DelimitedData) -> Self {
        Self {
            tag,
            block: true,
            leaf: false,
            data,
        }
    }

    /// Leaf block custom node; its parser's content lines get inline
    /// parsing like a paragraph.
    pub fn leaf(tag: &'static str, data: DelimitedData) -> Self {
        Self {
            tag,
            block: true,
            leaf: true,
            data,
        }
    }
}

/// Every node kind the engine knows about, plus an open extension variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    BlockQuote,
    BulletList(ListData),
    OrderedList(ListData),
    ListItem(ListItemData),
    Paragraph,
    Heading(HeadingData),
    FencedCodeBlock(FencedCodeData),
    IndentedCodeBlock,
    HtmlBlock,
    ThematicBreak,
    Reference(ReferenceData),

    Text,
    SoftLineBreak,
    HardLineBreak,
    Code(DelimitedData),
    Emphasis(DelimitedData),
    StrongEmphasis(DelimitedData),
    Link(LinkData),
    Image(LinkData),
    AutoLink(AutoLinkData),
    HtmlInline,
    HtmlEntity,

    Custom(CustomNode),
}

/// Fieldless discriminant of [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Document,
    BlockQuote,
    BulletList,
    OrderedList,
    ListItem,
    Paragraph,
    Heading,
    FencedCodeBlock,
    IndentedCodeBlock,
    HtmlBlock,
    ThematicBreak,
    Reference,
    Text,
    SoftLineBreak,
    HardLineBreak,
    Code,
    Emphasis,
    StrongEmphasis,
    Link,
    Image,
    AutoLink,
    HtmlInline,
    HtmlEntity,
    Custom(&'static str),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Document => NodeType::Document,
            NodeKind::BlockQuote => NodeType::BlockQuote,
            NodeKind::BulletList(_) => NodeType::BulletList,
            NodeKind::OrderedList(_) => NodeType::OrderedList,
            NodeKind::ListItem(_) => NodeType::ListItem,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading(_) => NodeType::Heading,
            NodeKind::FencedCodeBlock(_) => NodeType::FencedCodeBlock,
            NodeKind::IndentedCodeBlock => NodeType::IndentedCodeBlock,
            NodeKind::HtmlBlock => NodeType::HtmlBlock,
            NodeKind::ThematicBreak => NodeType::ThematicBreak,
            NodeKind::Reference(_) => NodeType::Reference,
            NodeKind::Text => NodeType::Text,
            NodeKind::SoftLineBreak => NodeType::SoftLineBreak,
            NodeKind::HardLineBreak => NodeType::HardLineBreak,
            NodeKind::Code(_) => NodeType::Code,
            NodeKind::Emphasis(_) => NodeType::Emphasis,
            NodeKind::StrongEmphasis(_) => NodeType::StrongEmphasis,
            NodeKind::Link(_) => NodeType::Link,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::AutoLink(_) => NodeType::AutoLink,
            NodeKind::HtmlInline => NodeType::HtmlInline,
            NodeKind::HtmlEntity => NodeType::HtmlEntity,
            NodeKind::Custom(c) => NodeType::Custom(c.tag),
        }
    }

    pub fn is_block(&self) -> bool {
        match self {
            NodeKind::Custom(c) => c.block,
            _ => self.node_type().is_block(),
        }
    }

    /// Blocks whose children are blocks.
    pub fn is_container(&self) -> bool {
        match self {
            NodeKind::Custom(c) => c.block && !c.leaf,
            _ => matches!(
                self.node_type(),
                NodeType::Document
                    | NodeType::BlockQuote
                    | NodeType::BulletList
                    | NodeType::OrderedList
                    | NodeType::ListItem
            ),
        }
    }

    /// Leaf blocks whose content is parsed for inlines.
    pub fn is_inline_bearing(&self) -> bool {
        match self {
            NodeKind::Custom(c) => c.leaf,
            _ => matches!(self, NodeKind::Paragraph | NodeKind::Heading(_)),
        }
    }

    pub fn list_data(&self) -> Option<&ListData> {
        match self {
            NodeKind::BulletList(d) | NodeKind::OrderedList(d) => Some(d),
            _ => None,
        }
    }

    pub fn delimited(&self) -> Option<&DelimitedData> {
        match self {
            NodeKind::Code(d) | NodeKind::Emphasis(d) | NodeKind::StrongEmphasis(d) => Some(d),
            NodeKind::Custom(c) => Some(&c.data),
            _ => None,
        }
    }

    /// Named sub-ranges of the node, in source order.
    ///
    /// Reassembling these (plus children for containers) reproduces the
    /// node's source text; formatters use them to write markers back
    /// unchanged.
    pub fn segments(&self) -> Vec<(&'static str, BasedSequence)> {
        let mut out = Vec::new();
        match self {
            NodeKind::Code(d)
            | NodeKind::Emphasis(d)
            | NodeKind::StrongEmphasis(d)
            | NodeKind::Custom(CustomNode { data: d, .. }) => {
                out.push(("opening", d.opening.clone()));
                out.push(("text", d.text.clone()));
                out.push(("closing", d.closing.clone()));
            }
            NodeKind::ListItem(d) => out.push(("marker", d.marker.clone())),
            NodeKind::Heading(d) => {
                out.push(("marker", d.marker.clone()));
                if let Some(c) = &d.closing {
                    out.push(("closing", c.clone()));
                }
            }
            NodeKind::FencedCodeBlock(d) => {
                out.push(("opening", d.opening.clone()));
                out.push(("info", d.info.clone()));
                if let Some(c) = &d.closing {
                    out.push(("closing", c.clone()));
                }
            }
            NodeKind::Reference(d) => {
                out.push(("label", d.label.clone()));
                out.push(("url", d.url.clone()));
                if let Some(t) = &d.title {
                    out.push(("title", t.clone()));
                }
            }
            NodeKind::Link(d) | NodeKind::Image(d) => {
                out.push(("text", d.text.clone()));
                if d.form == LinkForm::Inline {
                    out.push(("url", d.url.clone()));
                    if let Some(t) = &d.title {
                        out.push(("title", t.clone()));
                    }
                }
                if let Some(r) = &d.reference {
                    out.push(("reference", r.clone()));
                }
            }
            NodeKind::AutoLink(d) => out.push(("url", d.url.clone())),
            _ => {}
        }
        out
    }
}

impl NodeType {
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeType::Document
                | NodeType::BlockQuote
                | NodeType::BulletList
                | NodeType::OrderedList
                | NodeType::ListItem
                | NodeType::Paragraph
                | NodeType::Heading
                | NodeType::FencedCodeBlock
                | NodeType::IndentedCodeBlock
                | NodeType::HtmlBlock
                | NodeType::ThematicBreak
                | NodeType::Reference
        )
    }
}

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{Document, LinkData, NodeId, NodeKind};
use crate::error::LoomError;
use crate::extension::Extension;
use crate::options::HtmlOptions;
use crate::parsing::patterns::entity;

/// Renders extension nodes, looked up by their custom tag.
pub trait NodeRenderer: Send + Sync {
    /// Custom node tags this renderer handles.
    fn tags(&self) -> Vec<&'static str>;

    fn render(&self, node: NodeId, ctx: &mut HtmlContext<'_>);
}

#[derive(Default)]
pub struct HtmlRendererBuilder {
    options: HtmlOptions,
    renderers: Vec<Arc<dyn NodeRenderer>>,
}

impl HtmlRendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&mut self, options: HtmlOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn extension(&mut self, extension: &dyn Extension) -> &mut Self {
        extension.extend_html(self);
        self
    }

    pub fn node_renderer(&mut self, renderer: Arc<dyn NodeRenderer>) -> &mut Self {
        self.renderers.push(renderer);
        self
    }

    /// Fails when two renderers claim the same tag.
    pub fn build(&self) -> Result<HtmlRenderer, LoomError> {
        let mut renderers: HashMap<&'static str, Arc<dyn NodeRenderer>> = HashMap::new();
        for renderer in &self.renderers {
            for tag in renderer.tags() {
                if renderers.insert(tag, Arc::clone(renderer)).is_some() {
                    return Err(LoomError::DuplicateRegistration {
                        key: format!("renderer '{tag}'"),
                    });
                }
            }
        }
        Ok(HtmlRenderer {
            options: self.options.clone(),
            renderers,
        })
    }
}

/// CommonMark-style HTML output.
pub struct HtmlRenderer {
    options: HtmlOptions,
    renderers: HashMap<&'static str, Arc<dyn NodeRenderer>>,
}

impl fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.renderers.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("HtmlRenderer")
            .field("options", &self.options)
            .field("tags", &tags)
            .finish()
    }
}

impl HtmlRenderer {
    pub fn builder() -> HtmlRendererBuilder {
        HtmlRendererBuilder::new()
    }

    pub fn render(&self, doc: &Document) -> String {
        let mut ctx = HtmlContext {
            doc,
            renderer: self,
            out: String::new(),
        };
        ctx.render(doc.root());
        ctx.out
    }
}

/// Output buffer plus access to the document, handed to node renderers.
pub struct HtmlContext<'a> {
    doc: &'a Document,
    renderer: &'a HtmlRenderer,
    out: String,
}

impl<'a> HtmlContext<'a> {
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn options(&self) -> &HtmlOptions {
        &self.renderer.options
    }

    /// Appends markup as is.
    pub fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn text(&mut self, s: &str) {
        self.out.push_str(&escape(s));
    }

    /// Starts a new output line unless already at one.
    pub fn line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    pub fn render_children(&mut self, node: NodeId) {
        let doc = self.doc;
        for child in doc.children(node) {
            self.render(child);
        }
    }

    pub fn render(&mut self, node: NodeId) {
        let doc = self.doc;
        match doc.kind(node) {
            NodeKind::Document => self.render_children(node),
            NodeKind::Paragraph => {
                if in_tight_list(doc, node) {
                    self.render_children(node);
                } else {
                    self.block_tag("p", node);
                }
            }
            NodeKind::Heading(h) => self.block_tag(&format!("h{}", h.level), node),
            NodeKind::BlockQuote => {
                self.line();
                self.raw("<blockquote>\n");
                self.render_children(node);
                self.line();
                self.raw("</blockquote>\n");
            }
            NodeKind::BulletList(_) => self.list("<ul>\n", "</ul>\n", node),
            NodeKind::OrderedList(data) => {
                let open = if data.start == 1 {
                    "<ol>\n".to_string()
                } else {
                    format!("<ol start=\"{}\">\n", data.start)
                };
                self.list(&open, "</ol>\n", node);
            }
            NodeKind::ListItem(_) => {
                self.line();
                self.raw("<li>");
                self.render_children(node);
                self.raw("</li>\n");
            }
            NodeKind::ThematicBreak => {
                self.line();
                self.raw("<hr />\n");
            }
            NodeKind::FencedCodeBlock(data) => {
                let info = unescape(data.info.as_str());
                let language = info.split_whitespace().next().unwrap_or_default();
                self.code_block(node, language);
            }
            NodeKind::IndentedCodeBlock => self.code_block(node, ""),
            NodeKind::HtmlBlock => {
                self.line();
                let html = doc.get(node).content.to_text();
                self.html(&html);
            }
            NodeKind::Reference(_) => {}
            NodeKind::Text => self.text(&unescape_backslashes(doc.chars(node).as_str())),
            NodeKind::SoftLineBreak => {
                let soft_break = self.renderer.options.soft_break.clone();
                self.raw(&soft_break);
            }
            NodeKind::HardLineBreak => self.raw("<br />\n"),
            NodeKind::Code(_) => {
                self.raw("<code>");
                self.text(&code_span_content(doc, node));
                self.raw("</code>");
            }
            NodeKind::Emphasis(_) => self.inline_tag("em", node),
            NodeKind::StrongEmphasis(_) => self.inline_tag("strong", node),
            NodeKind::Link(link) => {
                self.raw("<a href=\"");
                self.raw(&escape(&encode_url(&unescape(link.url.as_str()))));
                self.raw("\"");
                self.title_attribute(link);
                self.raw(">");
                self.render_children(node);
                self.raw("</a>");
            }
            NodeKind::Image(link) => {
                self.raw("<img src=\"");
                self.raw(&escape(&encode_url(&unescape(link.url.as_str()))));
                self.raw("\" alt=\"");
                self.text(&plain_text(doc, node));
                self.raw("\"");
                self.title_attribute(link);
                self.raw(" />");
            }
            NodeKind::AutoLink(data) => {
                let url = data.url.as_str();
                let href = if data.email {
                    format!("mailto:{url}")
                } else {
                    url.to_string()
                };
                self.raw("<a href=\"");
                self.raw(&escape(&encode_url(&href)));
                self.raw("\">");
                self.text(url);
                self.raw("</a>");
            }
            NodeKind::HtmlInline => self.html(doc.chars(node).as_str()),
            NodeKind::HtmlEntity => {
                let decoded = html_escape::decode_html_entities(doc.chars(node).as_str());
                self.text(&decoded);
            }
            NodeKind::Custom(custom) => {
                let registry = self.renderer;
                if let Some(renderer) = registry.renderers.get(custom.tag) {
                    renderer.render(node, self);
                } else if custom.block {
                    self.render_children(node);
                } else {
                    self.text(&unescape_backslashes(custom.data.opening.as_str()));
                    self.render_children(node);
                    self.text(&unescape_backslashes(custom.data.closing.as_str()));
                }
            }
        }
    }

    fn block_tag(&mut self, tag: &str, node: NodeId) {
        self.line();
        self.raw(&format!("<{tag}>"));
        self.render_children(node);
        self.raw(&format!("</{tag}>\n"));
    }

    fn inline_tag(&mut self, tag: &str, node: NodeId) {
        self.raw(&format!("<{tag}>"));
        self.render_children(node);
        self.raw(&format!("</{tag}>"));
    }

    fn list(&mut self, open: &str, close: &str, node: NodeId) {
        self.line();
        self.raw(open);
        self.render_children(node);
        self.line();
        self.raw(close);
    }

    fn code_block(&mut self, node: NodeId, language: &str) {
        self.line();
        if language.is_empty() {
            self.raw("<pre><code>");
        } else {
            self.raw("<pre><code class=\"language-");
            self.text(language);
            self.raw("\">");
        }
        let code = self.doc.get(node).content.to_text();
        self.text(&code);
        self.raw("</code></pre>\n");
    }

    fn html(&mut self, html: &str) {
        if self.renderer.options.escape_html {
            self.text(html);
        } else {
            self.raw(html);
        }
    }

    fn title_attribute(&mut self, link: &LinkData) {
        if let Some(title) = &link.title {
            self.raw(" title=\"");
            self.text(&unescape(title.as_str()));
            self.raw("\"");
        }
    }
}

fn in_tight_list(doc: &Document, paragraph: NodeId) -> bool {
    let Some(item) = doc.parent(paragraph) else {
        return false;
    };
    matches!(doc.kind(item), NodeKind::ListItem(_))
        && doc
            .parent(item)
            .and_then(|list| doc.kind(list).list_data())
            .is_some_and(|data| data.tight)
}

/// Escapes `&`, `<`, `>` and `"`.
pub fn escape(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Resolves backslash escapes only.
fn unescape_backslashes(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Resolves backslash escapes and entity references, as in link
/// destinations, titles and info strings.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while let Some(c) = s[i..].chars().next() {
        let rest = &s[i..];
        if c == '\\'
            && let Some(next) = rest[1..].chars().next()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            i += 2;
        } else if c == '&'
            && let Some(m) = entity().find(rest)
        {
            out.push_str(&html_escape::decode_html_entities(m.as_str()));
            i += m.end();
        } else {
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

/// Percent-encodes bytes that may not appear in an `href`, leaving
/// existing escapes alone.
fn encode_url(url: &str) -> String {
    const SAFE: &[u8] = b"-_.!~*'();/?:@&=+$,%#";
    let mut out = String::with_capacity(url.len());
    for &b in url.as_bytes() {
        if b.is_ascii_alphanumeric() || SAFE.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Code span text: line endings become spaces, then one surrounding space
/// is stripped when both ends have one and the content is not all spaces.
fn code_span_content(doc: &Document, code: NodeId) -> String {
    let mut text = String::new();
    for child in doc.children(code) {
        match doc.kind(child) {
            NodeKind::SoftLineBreak => text.push(' '),
            _ => text.push_str(doc.chars(child).as_str()),
        }
    }
    if text.len() >= 2
        && text.starts_with(' ')
        && text.ends_with(' ')
        && !text.bytes().all(|b| b == b' ')
    {
        text = text[1..text.len() - 1].to_string();
    }
    text
}

/// Text of the inline subtree without markup, for `alt` attributes.
fn plain_text(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(node) {
        match doc.kind(child) {
            NodeKind::Text => out.push_str(&unescape_backslashes(doc.chars(child).as_str())),
            NodeKind::SoftLineBreak | NodeKind::HardLineBreak => out.push(' '),
            NodeKind::Code(_) => out.push_str(&code_span_content(doc, child)),
            NodeKind::HtmlEntity => {
                out.push_str(&html_escape::decode_html_entities(doc.chars(child).as_str()))
            }
            NodeKind::AutoLink(data) => out.push_str(data.url.as_str()),
            NodeKind::HtmlInline => out.push_str(doc.chars(child).as_str()),
            _ => out.push_str(&plain_text(doc, child)),
        }
    }
    out
}

/// Renders with default options and no extensions.
pub fn render_html(doc: &Document) -> String {
    HtmlRenderer {
        options: HtmlOptions::default(),
        renderers: HashMap::new(),
    }
    .render(doc)
}

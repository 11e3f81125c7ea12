use std::sync::Arc;

use markdown_loom_engine::ast::{
    Ast, ContentLine, CustomNode, DelimitedData, NodeId, NodeKind, NodeType,
};
use markdown_loom_engine::extension::{
    BlockParser, BlockParserFactory, BlockStart, Delimiter, DelimiterProcessor, Dependent,
    Extension, InlineContext, MatchedBlock, ParserState, PostProcessor, PostProcessorFactory,
};
use markdown_loom_engine::parsing::blocks::{BlockContinue, CODE_BLOCK_INDENT};
use markdown_loom_engine::render::{HtmlContext, NodeRenderer};
use markdown_loom_engine::{
    Document, HtmlRenderer, HtmlRendererBuilder, LoomError, Parser, ParserBuilder,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// `{text}` renders its text upper-cased.
struct Upper;

impl Dependent for Upper {
    fn dependency_key(&self) -> &'static str {
        "upper"
    }
}

impl DelimiterProcessor for Upper {
    fn opening_char(&self) -> char {
        '{'
    }

    fn closing_char(&self) -> char {
        '}'
    }

    fn delimiter_use(&self, opener: &Delimiter, closer: &Delimiter) -> usize {
        usize::from(opener.length >= 1 && closer.length >= 1)
    }

    fn process(&self, ctx: &mut InlineContext<'_>, opener: &Delimiter, closer: &Delimiter, used: usize) {
        ctx.wrap(opener, closer, used, |data| {
            NodeKind::Custom(CustomNode::inline("upper", data))
        });
    }
}

impl NodeRenderer for Upper {
    fn tags(&self) -> Vec<&'static str> {
        vec!["upper"]
    }

    fn render(&self, node: NodeId, ctx: &mut HtmlContext<'_>) {
        let text = ctx.document().text_content(node).to_uppercase();
        ctx.text(&text);
    }
}

impl Extension for Upper {
    fn extend_parser(&self, builder: &mut ParserBuilder) {
        builder.custom_delimiter_processor(Arc::new(Upper));
    }

    fn extend_html(&self, builder: &mut HtmlRendererBuilder) {
        builder.node_renderer(Arc::new(Upper));
    }
}

/// Claims `:` but never matches.
struct Veto;

impl Dependent for Veto {
    fn dependency_key(&self) -> &'static str {
        "veto"
    }
}

impl DelimiterProcessor for Veto {
    fn opening_char(&self) -> char {
        ':'
    }

    fn closing_char(&self) -> char {
        ':'
    }

    fn delimiter_use(&self, _opener: &Delimiter, _closer: &Delimiter) -> usize {
        0
    }

    fn process(&self, _ctx: &mut InlineContext<'_>, _opener: &Delimiter, _closer: &Delimiter, _used: usize) {}
}

fn render_with(extension: &dyn Extension, input: &str) -> String {
    let parser = Parser::builder().extension(extension).build().unwrap();
    let renderer = HtmlRenderer::builder().extension(extension).build().unwrap();
    renderer.render(&parser.parse(input).unwrap())
}

#[rstest]
#[case("{foo} bar\n", "<p>FOO bar</p>\n")]
#[case("{foo bar\n", "<p>{foo bar</p>\n")]
#[case("{{foo} bar\n", "<p>{FOO bar</p>\n")]
#[case("{{foo} bar}\n", "<p>FOO BAR</p>\n")]
#[case("*{a}* b\n", "<p><em>A</em> b</p>\n")]
fn custom_delimiters(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(render_with(&Upper, input), expected);
}

#[test]
fn zero_use_leaves_runs_literal() {
    let parser = Parser::builder()
        .custom_delimiter_processor(Arc::new(Veto))
        .build()
        .unwrap();
    let doc = parser.parse(":test:\n").unwrap();
    assert_eq!(markdown_loom_engine::render_html(&doc), "<p>:test:</p>\n");
}

#[test]
fn custom_node_without_renderer_keeps_markers() {
    let parser = Parser::builder().extension(&Upper).build().unwrap();
    let doc = parser.parse("{a<b}\n").unwrap();
    assert_eq!(markdown_loom_engine::render_html(&doc), "<p>{a&lt;b}</p>\n");
}

#[test]
fn delimiter_char_claimed_twice_is_rejected() {
    struct Star;
    impl Dependent for Star {
        fn dependency_key(&self) -> &'static str {
            "star"
        }
    }
    impl DelimiterProcessor for Star {
        fn opening_char(&self) -> char {
            '*'
        }
        fn closing_char(&self) -> char {
            '*'
        }
        fn delimiter_use(&self, _: &Delimiter, _: &Delimiter) -> usize {
            1
        }
        fn process(&self, _: &mut InlineContext<'_>, _: &Delimiter, _: &Delimiter, _: usize) {}
    }

    let err = Parser::builder()
        .custom_delimiter_processor(Arc::new(Star))
        .build()
        .unwrap_err();
    assert!(matches!(err, LoomError::DuplicateRegistration { .. }));
}

#[test]
fn renderer_tag_claimed_twice_is_rejected() {
    let err = HtmlRenderer::builder()
        .node_renderer(Arc::new(Upper))
        .node_renderer(Arc::new(Upper))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("upper"));
}

/// Wraps the first heading of the document in a `section` block, once
/// `shout` has visited the inline nodes.
struct Sections;

impl Dependent for Sections {
    fn dependency_key(&self) -> &'static str {
        "sections"
    }

    fn after_dependents(&self) -> Option<Vec<&'static str>> {
        Some(vec!["shout"])
    }

    fn affects_global_scope(&self) -> bool {
        true
    }
}

struct SectionRun;

impl PostProcessor for SectionRun {
    fn process(&mut self, doc: &mut Document, node: NodeId) -> Option<NodeId> {
        let heading = doc
            .descendants(node)
            .find(|&id| doc.kind(id).node_type() == NodeType::Heading)?;
        let chars = doc.chars(heading).clone();
        let data = DelimitedData::between(chars.start_sequence(), chars.end_sequence());
        let section = doc.new_node(markdown_loom_engine::ast::Ast::new(
            NodeKind::Custom(CustomNode::block("section", data)),
            chars,
        ));
        doc.insert_before(heading, section);
        doc.append_node(section, heading);
        None
    }
}

impl PostProcessorFactory for Sections {
    fn create(&self, _doc: &Document) -> Box<dyn PostProcessor> {
        Box::new(SectionRun)
    }
}

/// Visits every `upper` node.
struct Shout;

impl Dependent for Shout {
    fn dependency_key(&self) -> &'static str {
        "shout"
    }
}

struct ShoutRun;

impl PostProcessor for ShoutRun {
    fn process(&mut self, doc: &mut Document, node: NodeId) -> Option<NodeId> {
        let text = doc.text_content(node);
        assert!(!text.is_empty());
        None
    }
}

impl PostProcessorFactory for Shout {
    fn node_types(&self) -> Vec<(NodeType, Vec<NodeType>)> {
        vec![(NodeType::Custom("upper"), Vec::new())]
    }

    fn create(&self, _doc: &Document) -> Box<dyn PostProcessor> {
        Box::new(ShoutRun)
    }
}

struct SectionRenderer;

impl NodeRenderer for SectionRenderer {
    fn tags(&self) -> Vec<&'static str> {
        vec!["section"]
    }

    fn render(&self, node: NodeId, ctx: &mut HtmlContext<'_>) {
        ctx.line();
        ctx.raw("<section>\n");
        ctx.render_children(node);
        ctx.line();
        ctx.raw("</section>\n");
    }
}

#[test]
fn post_processors_run_in_dependency_order() {
    let parser = Parser::builder()
        .extension(&Upper)
        .post_processor_factory(Arc::new(Sections))
        .post_processor_factory(Arc::new(Shout))
        .build()
        .unwrap();
    let renderer = HtmlRenderer::builder()
        .extension(&Upper)
        .node_renderer(Arc::new(SectionRenderer))
        .build()
        .unwrap();
    let html = renderer.render(&parser.parse("# {hi}\n\ntext\n").unwrap());
    assert_eq!(html, "<section>\n<h1>HI</h1>\n</section>\n<p>text</p>\n");
}

#[test]
fn post_processor_dependency_cycle_is_rejected() {
    struct Loop;
    impl Dependent for Loop {
        fn dependency_key(&self) -> &'static str {
            "shout"
        }
        fn after_dependents(&self) -> Option<Vec<&'static str>> {
            Some(vec!["sections"])
        }
    }
    impl PostProcessorFactory for Loop {
        fn create(&self, _doc: &Document) -> Box<dyn PostProcessor> {
            Box::new(ShoutRun)
        }
    }

    let result = Parser::builder()
        .post_processor_factory(Arc::new(Sections))
        .post_processor_factory(Arc::new(Loop))
        .build();
    assert!(result.is_err());
}

/// Renders a custom node as `<tag>children</tag>`, or its source text when
/// it has no children.
struct Element {
    tag: &'static str,
    html: &'static str,
}

impl NodeRenderer for Element {
    fn tags(&self) -> Vec<&'static str> {
        vec![self.tag]
    }

    fn render(&self, node: NodeId, ctx: &mut HtmlContext<'_>) {
        ctx.raw(&format!("<{}>", self.html));
        if ctx.document().first_child(node).is_none() {
            let text = ctx.document().chars(node).as_str().to_string();
            ctx.text(&text);
        } else {
            ctx.render_children(node);
        }
        ctx.raw(&format!("</{}>", self.html));
    }
}

/// `~~text~~`; single tildes are plain text.
struct Strike;

impl Dependent for Strike {
    fn dependency_key(&self) -> &'static str {
        "strike"
    }
}

impl DelimiterProcessor for Strike {
    fn opening_char(&self) -> char {
        '~'
    }

    fn closing_char(&self) -> char {
        '~'
    }

    fn min_length(&self) -> usize {
        2
    }

    fn delimiter_use(&self, opener: &Delimiter, closer: &Delimiter) -> usize {
        if opener.length >= 2 && closer.length >= 2 { 2 } else { 0 }
    }

    fn process(&self, ctx: &mut InlineContext<'_>, opener: &Delimiter, closer: &Delimiter, used: usize) {
        ctx.wrap(opener, closer, used, |data| {
            NodeKind::Custom(CustomNode::inline("strike", data))
        });
    }
}

#[rstest]
#[case::pair("~~a~~ b\n", "<p><del>a</del> b</p>\n")]
#[case::single_tildes("~a~ b\n", "<p>~a~ b</p>\n")]
#[case::short_closer("~~a~ b\n", "<p>~~a~ b</p>\n")]
fn runs_below_min_length_are_text(#[case] input: &str, #[case] expected: &str) {
    let parser = Parser::builder()
        .custom_delimiter_processor(Arc::new(Strike))
        .build()
        .unwrap();
    let renderer = HtmlRenderer::builder()
        .node_renderer(Arc::new(Element { tag: "strike", html: "del" }))
        .build()
        .unwrap();
    assert_eq!(renderer.render(&parser.parse(input).unwrap()), expected);
}

/// `~~` runs that never match become `lonely` nodes.
struct Marks {
    skip: bool,
}

impl Dependent for Marks {
    fn dependency_key(&self) -> &'static str {
        "marks"
    }
}

impl DelimiterProcessor for Marks {
    fn opening_char(&self) -> char {
        '~'
    }

    fn closing_char(&self) -> char {
        '~'
    }

    fn skip_non_opener_closer(&self) -> bool {
        self.skip
    }

    fn delimiter_use(&self, _opener: &Delimiter, _closer: &Delimiter) -> usize {
        0
    }

    fn process(&self, _ctx: &mut InlineContext<'_>, _opener: &Delimiter, _closer: &Delimiter, _used: usize) {}

    fn unmatched_delimiter_node(
        &self,
        ctx: &InlineContext<'_>,
        delimiter: &Delimiter,
    ) -> Option<NodeKind> {
        let chars = ctx.document().chars(delimiter.node);
        let data = DelimitedData::between(chars.start_sequence(), chars.end_sequence());
        Some(NodeKind::Custom(CustomNode::inline("lonely", data)))
    }
}

#[rstest]
#[case::listed(false, "a ~~ b\n", "<p>a <mark>~~</mark> b</p>\n")]
#[case::skipped(true, "a ~~ b\n", "<p>a ~~ b</p>\n")]
#[case::skip_keeps_flanking_runs(true, "~~a\n", "<p><mark>~~</mark>a</p>\n")]
fn unmatched_runs_get_their_own_node(
    #[case] skip: bool,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let parser = Parser::builder()
        .custom_delimiter_processor(Arc::new(Marks { skip }))
        .build()
        .unwrap();
    let renderer = HtmlRenderer::builder()
        .node_renderer(Arc::new(Element { tag: "lonely", html: "mark" }))
        .build()
        .unwrap();
    assert_eq!(renderer.render(&parser.parse(input).unwrap()), expected);
}

/// Claims more characters than either run holds.
struct Greedy;

impl Dependent for Greedy {
    fn dependency_key(&self) -> &'static str {
        "greedy"
    }
}

impl DelimiterProcessor for Greedy {
    fn opening_char(&self) -> char {
        '{'
    }

    fn closing_char(&self) -> char {
        '}'
    }

    fn delimiter_use(&self, _opener: &Delimiter, _closer: &Delimiter) -> usize {
        2
    }

    fn process(&self, _ctx: &mut InlineContext<'_>, _opener: &Delimiter, _closer: &Delimiter, _used: usize) {}
}

#[test]
fn overlong_delimiter_use_is_a_contract_violation() {
    let parser = Parser::builder()
        .custom_delimiter_processor(Arc::new(Greedy))
        .build()
        .unwrap();
    let err = parser.parse("{a}\n").unwrap_err();
    assert!(matches!(err, LoomError::ContractViolation { .. }));
}

/// `# !text` lines become `aside` leaf blocks whose text is parsed for
/// inlines.
struct AsideFactory {
    before_heading: bool,
}

impl Dependent for AsideFactory {
    fn dependency_key(&self) -> &'static str {
        "aside"
    }

    fn before_dependents(&self) -> Option<Vec<&'static str>> {
        self.before_heading.then(|| vec!["heading"])
    }
}

impl BlockParserFactory for AsideFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        let rest = state.rest();
        if state.indent() >= CODE_BLOCK_INDENT || !rest.starts_with("# !") {
            return None;
        }
        let marker = rest.sub_to(3);
        let data = DelimitedData::between(marker.clone(), marker.end_sequence());
        let parser = AsideParser {
            block: NodeKind::Custom(CustomNode::leaf("aside", data)),
            lines: Vec::new(),
        };
        Some(BlockStart::of(Box::new(parser)).at_index(state.next_non_space_index() + 3))
    }
}

struct AsideParser {
    block: NodeKind,
    lines: Vec<ContentLine>,
}

impl BlockParser for AsideParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }

    fn add_line(&mut self, line: ContentLine) {
        self.lines.push(line);
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = self.block.clone();
        ast.content.lines = std::mem::take(&mut self.lines);
    }
}

#[test]
fn custom_leaf_block_ordered_before_headings() {
    let parser = Parser::builder()
        .custom_block_parser_factory(Arc::new(AsideFactory { before_heading: true }))
        .build()
        .unwrap();
    let doc = parser.parse("# !hello *there*\n").unwrap();
    let block = doc.first_child(doc.root()).unwrap();
    assert_eq!(doc.kind(block).node_type(), NodeType::Custom("aside"));
    let children: Vec<NodeType> = doc.children(block).map(|id| doc.kind(id).node_type()).collect();
    assert_eq!(children, vec![NodeType::Text, NodeType::Emphasis]);

    let renderer = HtmlRenderer::builder()
        .node_renderer(Arc::new(Element { tag: "aside", html: "aside" }))
        .build()
        .unwrap();
    assert_eq!(renderer.render(&doc), "<aside>hello <em>there</em></aside>");
}

#[test]
fn custom_block_factory_runs_after_core_factories_by_default() {
    let parser = Parser::builder()
        .custom_block_parser_factory(Arc::new(AsideFactory { before_heading: false }))
        .build()
        .unwrap();
    let doc = parser.parse("# !hello\n\n# !there\n").unwrap();
    let kinds: Vec<NodeType> = doc
        .children(doc.root())
        .map(|id| doc.kind(id).node_type())
        .collect();
    assert_eq!(kinds, vec![NodeType::Heading, NodeType::Heading]);
}

//! # Parsing
//!
//! Turns Markdown source into a [`Document`].
//!
//! A [`Parser`] is built once from its registered hooks and reused for any
//! number of documents. Each parse walks the same phases in order:
//!
//! 1. **Blocks**: the open-block state machine builds the block tree
//! 2. **Paragraph pre-processing**: e.g. link reference definitions
//! 3. **Block pre-processing**: e.g. list tightness
//! 4. **Inlines**: paragraphs and headings get their inline children
//! 5. **Post-processing**: extension rewrites of the finished tree

pub mod blocks;
pub mod inline;
pub mod patterns;
pub mod post_process;
pub mod snapshot;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use log::{debug, error};
use xi_rope::Rope;

use crate::ast::{Document, NodeId, NodeType};
use crate::error::LoomError;
use crate::extension::{Dependent, DependencyResolver, Extension};
use crate::options::ParseOptions;
use crate::sequence::BasedSequence;

use blocks::document_parser::parse_blocks;
use blocks::{
    BlockParserFactory, BlockPreProcessorFactory, ListTightness, ParagraphPreProcessorFactory,
    ReferenceDefinitions, core_factories,
};
use inline::{DelimiterProcessor, EmphasisProcessor, InlineParser};
use post_process::{PostProcessorFactory, run_post_processors};

/// Stages of a single parse, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParsePhase {
    Starting,
    ParseBlocks,
    PreProcessParagraphs,
    PreProcessBlocks,
    ParseInlines,
    PostProcess,
    Done,
}

impl fmt::Display for ParsePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParsePhase::Starting => "starting",
            ParsePhase::ParseBlocks => "parse blocks",
            ParsePhase::PreProcessParagraphs => "pre-process paragraphs",
            ParsePhase::PreProcessBlocks => "pre-process blocks",
            ParsePhase::ParseInlines => "parse inlines",
            ParsePhase::PostProcess => "post-process",
            ParsePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Collects hooks and options for a [`Parser`].
///
/// Core block factories and emphasis processors are always present; custom
/// hooks are ordered after them unless their dependencies say otherwise.
#[derive(Default)]
pub struct ParserBuilder {
    options: ParseOptions,
    block_factories: Vec<Arc<dyn BlockParserFactory>>,
    delimiter_processors: Vec<Arc<dyn DelimiterProcessor>>,
    paragraph_pre_processors: Vec<Arc<dyn ParagraphPreProcessorFactory>>,
    block_pre_processors: Vec<Arc<dyn BlockPreProcessorFactory>>,
    post_processors: Vec<Arc<dyn PostProcessorFactory>>,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&mut self, options: ParseOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Lets an extension register its hooks.
    pub fn extension(&mut self, extension: &dyn Extension) -> &mut Self {
        extension.extend_parser(self);
        self
    }

    pub fn custom_block_parser_factory(
        &mut self,
        factory: Arc<dyn BlockParserFactory>,
    ) -> &mut Self {
        self.block_factories.push(factory);
        self
    }

    pub fn custom_delimiter_processor(
        &mut self,
        processor: Arc<dyn DelimiterProcessor>,
    ) -> &mut Self {
        self.delimiter_processors.push(processor);
        self
    }

    pub fn paragraph_pre_processor(
        &mut self,
        factory: Arc<dyn ParagraphPreProcessorFactory>,
    ) -> &mut Self {
        self.paragraph_pre_processors.push(factory);
        self
    }

    pub fn block_pre_processor(&mut self, factory: Arc<dyn BlockPreProcessorFactory>) -> &mut Self {
        self.block_pre_processors.push(factory);
        self
    }

    pub fn post_processor_factory(&mut self, factory: Arc<dyn PostProcessorFactory>) -> &mut Self {
        self.post_processors.push(factory);
        self
    }

    /// Resolves hook order and checks registrations.
    ///
    /// Fails on dependency cycles, on two hooks sharing a key and on two
    /// delimiter processors claiming the same character.
    pub fn build(&self) -> Result<Parser, LoomError> {
        let mut block_factories = core_factories();
        block_factories.extend(self.block_factories.iter().cloned());
        debug!("resolving {} block parser factories", block_factories.len());
        let block_factories = DependencyResolver::resolve(block_factories)?.into_order();

        let mut delimiters: Vec<Arc<dyn DelimiterProcessor>> = vec![
            Arc::new(EmphasisProcessor::asterisk()),
            Arc::new(EmphasisProcessor::underscore()),
        ];
        delimiters.extend(self.delimiter_processors.iter().cloned());
        let delimiters = DependencyResolver::resolve(delimiters)?.into_order();
        let inline = InlineParser::new(delimiters)?;

        let mut paragraph_pre_processors: Vec<Arc<dyn ParagraphPreProcessorFactory>> =
            Vec::new();
        if self.options.reference_definitions {
            paragraph_pre_processors.push(Arc::new(ReferenceDefinitions));
        }
        paragraph_pre_processors.extend(self.paragraph_pre_processors.iter().cloned());
        let paragraph_pre_processors =
            DependencyResolver::resolve(paragraph_pre_processors)?.into_order();

        let mut block_pre_processors: Vec<Arc<dyn BlockPreProcessorFactory>> =
            vec![Arc::new(ListTightness)];
        block_pre_processors.extend(self.block_pre_processors.iter().cloned());
        let block_pre_processors = DependencyResolver::resolve(block_pre_processors)?.into_order();

        let post_processors = DependencyResolver::resolve(self.post_processors.clone())?.into_stages();

        Ok(Parser {
            options: self.options.clone(),
            block_factories,
            inline,
            paragraph_pre_processors,
            block_pre_processors,
            post_processors,
        })
    }
}

/// A configured Markdown parser.
///
/// Holds no per-document state, so one parser can be shared across threads.
pub struct Parser {
    options: ParseOptions,
    block_factories: Vec<Arc<dyn BlockParserFactory>>,
    inline: InlineParser,
    paragraph_pre_processors: Vec<Arc<dyn ParagraphPreProcessorFactory>>,
    block_pre_processors: Vec<Arc<dyn BlockPreProcessorFactory>>,
    post_processors: Vec<Vec<Arc<dyn PostProcessorFactory>>>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |keys: Vec<&'static str>| keys.join(", ");
        f.debug_struct("Parser")
            .field("options", &self.options)
            .field(
                "block_factories",
                &keys(self.block_factories.iter().map(|f| f.dependency_key()).collect()),
            )
            .finish_non_exhaustive()
    }
}

fn enter(phase: ParsePhase) {
    debug!("parse phase: {phase}");
}

impl Parser {
    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, input: &str) -> Result<Document, LoomError> {
        self.parse_sequence(BasedSequence::new(input))
    }

    /// Reads the whole input, then parses it.
    pub fn parse_reader(&self, mut reader: impl Read) -> Result<Document, LoomError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes)?;
        self.parse(&text)
    }

    pub fn parse_rope(&self, rope: &Rope) -> Result<Document, LoomError> {
        self.parse(&rope.slice_to_cow(0..rope.len()))
    }

    pub fn parse_sequence(&self, source: BasedSequence) -> Result<Document, LoomError> {
        enter(ParsePhase::Starting);

        enter(ParsePhase::ParseBlocks);
        let mut doc = parse_blocks(source, &self.block_factories, &self.options)?;

        enter(ParsePhase::PreProcessParagraphs);
        for factory in &self.paragraph_pre_processors {
            let mut processor = factory.create(&doc);
            for paragraph in nodes_of(&doc, |t| t == NodeType::Paragraph) {
                if !doc.is_removed(paragraph) {
                    processor.pre_process(&mut doc, paragraph);
                }
            }
        }

        enter(ParsePhase::PreProcessBlocks);
        for factory in &self.block_pre_processors {
            let types = factory.node_types();
            let mut processor = factory.create(&doc);
            for block in nodes_of(&doc, |t| types.contains(&t)) {
                if !doc.is_removed(block) {
                    processor.pre_process(&mut doc, block);
                }
            }
        }

        enter(ParsePhase::ParseInlines);
        let leaves: Vec<NodeId> = doc
            .descendants(doc.root())
            .filter(|&id| doc.kind(id).is_inline_bearing())
            .collect();
        for leaf in leaves {
            self.inline.parse(&mut doc, leaf)?;
        }

        enter(ParsePhase::PostProcess);
        run_post_processors(&mut doc, &self.post_processors);

        enter(ParsePhase::Done);
        Ok(doc)
    }
}

fn nodes_of(doc: &Document, wanted: impl Fn(NodeType) -> bool) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .filter(|&id| wanted(doc.kind(id).node_type()))
        .collect()
}

/// Parses with the core-only parser.
///
/// The core configuration has no hooks that can violate a contract, so
/// this only logs if something goes wrong and returns an empty document.
pub fn parse(input: &str) -> Document {
    let source = BasedSequence::new(input);
    Parser::builder()
        .build()
        .and_then(|parser| parser.parse_sequence(source.clone()))
        .unwrap_or_else(|e| {
            error!("core parse failed: {e}");
            Document::new(source)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parsing::blocks::{BlockStart, MatchedBlock, ParserState};
    use std::io::Cursor;

    #[test]
    fn phases_are_ordered() {
        assert!(ParsePhase::Starting < ParsePhase::ParseBlocks);
        assert!(ParsePhase::ParseInlines < ParsePhase::PostProcess);
        assert_eq!(ParsePhase::PreProcessBlocks.to_string(), "pre-process blocks");
    }

    #[test]
    fn reader_and_rope_match_str() {
        let input = "# Title\n\nSome *text*.\n";
        let parser = Parser::builder().build().unwrap();
        let from_str = parser.parse(input).unwrap();
        let from_reader = parser.parse_reader(Cursor::new(input.as_bytes())).unwrap();
        let from_rope = parser.parse_rope(&Rope::from(input)).unwrap();
        let count = |d: &Document| d.descendants(d.root()).count();
        assert_eq!(count(&from_str), count(&from_reader));
        assert_eq!(count(&from_str), count(&from_rope));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let parser = Parser::builder().build().unwrap();
        let err = parser.parse_reader(Cursor::new(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, LoomError::Utf8(_)));
    }

    #[test]
    fn reference_definitions_can_be_disabled() {
        let mut options = ParseOptions::default();
        options.reference_definitions = false;
        let parser = Parser::builder().options(options).build().unwrap();
        let doc = parser.parse("[a]: /x\n").unwrap();
        assert!(doc.references().is_empty());
        let para = doc.first_child(doc.root()).unwrap();
        assert_eq!(doc.kind(para), &NodeKind::Paragraph);
    }

    struct Clash(&'static str);

    impl Dependent for Clash {
        fn dependency_key(&self) -> &'static str {
            self.0
        }
    }

    impl BlockParserFactory for Clash {
        fn try_start(&self, _: &ParserState<'_>, _: &MatchedBlock<'_>) -> Option<BlockStart> {
            None
        }
    }

    #[test]
    fn duplicate_factory_keys_fail_build() {
        let err = Parser::builder()
            .custom_block_parser_factory(Arc::new(Clash("heading")))
            .build()
            .unwrap_err();
        assert!(matches!(err, LoomError::DuplicateRegistration { .. }));
    }

    #[test]
    fn parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser>();
    }
}

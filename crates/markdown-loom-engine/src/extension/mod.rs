//! # Extensions
//!
//! Everything pluggable in the pipeline registers through the traits
//! re-exported here. Each hook carries a [`Dependent`] key so that
//! [`DependencyResolver`] can order hooks of the same kind; an
//! [`Extension`] bundles related hooks for the parser and the HTML
//! renderer.

pub mod dependency;

pub use dependency::{DependencyResolver, Dependent, EVERYTHING, ResolvedDependencies};

pub use crate::parsing::blocks::{
    BlockParser, BlockParserFactory, BlockPreProcessor, BlockPreProcessorFactory, BlockStart,
    MatchedBlock, ParagraphPreProcessor, ParagraphPreProcessorFactory, ParserState,
};
pub use crate::parsing::inline::{Delimiter, DelimiterProcessor, Flanking, InlineContext};
pub use crate::parsing::post_process::{PostProcessor, PostProcessorFactory};

use crate::parsing::ParserBuilder;
use crate::render::html::HtmlRendererBuilder;

/// A bundle of parser and renderer hooks registered together.
pub trait Extension: Send + Sync {
    fn extend_parser(&self, _builder: &mut ParserBuilder) {}

    fn extend_html(&self, _builder: &mut HtmlRendererBuilder) {}
}

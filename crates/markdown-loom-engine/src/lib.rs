pub mod ast;
pub mod error;
pub mod extension;
pub mod options;
pub mod parsing;
pub mod render;
pub mod sequence;

// Re-export key types for easier usage
pub use ast::{Document, NodeId, NodeKind, NodeType};
pub use error::{LoomError, SequenceError};
pub use extension::Extension;
pub use options::{FormatOptions, HtmlOptions, LoomOptions, ParseOptions};
pub use parsing::{ParsePhase, Parser, ParserBuilder, parse};
pub use render::{HtmlRenderer, HtmlRendererBuilder, MarkdownFormatter, format_markdown, render_html};
pub use sequence::{BasedSequence, SegmentBuilder, SegmentedSequence, SourceOffset, Span};

//! # Renderers
//!
//! [`html`] turns a document into HTML through a registry of per-tag
//! [`NodeRenderer`]s; [`markdown`] writes normalized Markdown back out as a
//! segmented sequence that still maps to the source.

pub mod html;
pub mod markdown;

pub use html::{HtmlContext, HtmlRenderer, HtmlRendererBuilder, NodeRenderer, render_html};
pub use markdown::{MarkdownFormatter, format_markdown};

//! Immutable configuration, built once and passed by reference.

use serde::{Deserialize, Serialize};

/// Every option the engine reads, grouped by pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomOptions {
    pub parse: ParseOptions,
    pub html: HtmlOptions,
    pub format: FormatOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Column width of a tab when computing indentation.
    pub tab_stop: usize,
    /// Deeper lists are not started; their markers stay paragraph text.
    pub max_list_depth: usize,
    /// Extract `[label]: url` definitions from paragraphs.
    pub reference_definitions: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tab_stop: 4,
            max_list_depth: 32,
            reference_definitions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    /// Emitted for soft line breaks.
    pub soft_break: String,
    /// Escape raw HTML instead of passing it through.
    pub escape_html: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            soft_break: "\n".to_string(),
            escape_html: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub thematic_break: String,
    /// Force `*` or `_` for emphasis; `None` keeps the source marker.
    pub emphasis_marker: Option<char>,
    /// Force `*` or `_` for strong emphasis; `None` keeps the source marker.
    pub strong_marker: Option<char>,
    /// Force the bullet list marker; `None` keeps the source marker.
    pub bullet_marker: Option<char>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            thematic_break: "---".to_string(),
            emphasis_marker: None,
            strong_marker: None,
            bullet_marker: None,
        }
    }
}

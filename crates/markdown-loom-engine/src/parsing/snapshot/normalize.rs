use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::{Document, NodeType};
use crate::sequence::preview;

#[derive(Debug, Serialize)]
pub struct Snap {
    pub nodes: Vec<NodeSnap>,
}

#[derive(Debug, Serialize)]
pub struct NodeSnap {
    pub depth: usize,
    pub kind: String,
    pub span: (usize, usize),
    pub text: String,
    pub parts: BTreeMap<String, (usize, usize)>,
}

pub fn kind_name(node_type: NodeType) -> String {
    match node_type {
        NodeType::Custom(tag) => tag.to_string(),
        other => format!("{other:?}"),
    }
}

/// Every node below the root, in document order.
pub fn normalize(doc: &Document) -> Snap {
    let root = doc.root();
    let nodes = doc
        .descendants(root)
        .skip(1)
        .map(|id| {
            let chars = doc.chars(id);
            let span = chars.span();
            let parts = doc
                .kind(id)
                .segments()
                .into_iter()
                .map(|(name, seq)| {
                    let s = seq.span();
                    (name.to_string(), (s.start, s.end))
                })
                .collect();
            NodeSnap {
                depth: doc.ancestors(id).count() - 1,
                kind: kind_name(doc.kind(id).node_type()),
                span: (span.start, span.end),
                text: preview(chars, 60),
                parts,
            }
        })
        .collect();
    Snap { nodes }
}

impl Snap {
    /// One `Kind@start..end "text"` line per node, indented by depth.
    pub fn outline(&self) -> String {
        self.nodes
            .iter()
            .map(|n| {
                format!(
                    "{}{}@{}..{} {:?}\n",
                    "  ".repeat(n.depth),
                    n.kind,
                    n.span.0,
                    n.span.1,
                    n.text
                )
            })
            .collect()
    }
}

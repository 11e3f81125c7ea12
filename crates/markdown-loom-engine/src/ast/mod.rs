//! # Document Tree
//!
//! Nodes live in an `indextree` arena owned by [`Document`]; parent, child
//! and sibling links are `NodeId` handles. Core node kinds are a closed
//! enum, extensions add kinds through [`NodeKind::Custom`].

pub mod document;
pub mod node;
pub mod references;

pub use document::{Ast, BlockContent, ContentLine, Document};
pub use indextree::NodeId;
pub use node::{
    AutoLinkData, CustomNode, DelimitedData, FencedCodeData, HeadingData, LinkData, LinkForm,
    ListData, ListItemData, NodeKind, NodeType, ReferenceData,
};
pub use references::{ReferenceMap, ReferenceTarget, normalize_label};

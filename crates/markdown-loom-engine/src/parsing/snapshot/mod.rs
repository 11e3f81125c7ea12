//! # Snapshot Testing Support
//!
//! Utilities for testing the parser via snapshot assertions and invariant checks.
//!
//! - **`normalize`**: flattens a parsed [`Document`](crate::ast::Document)
//!   into a serializable [`Snap`] and a readable outline
//! - **`invariants`**: structural checks every parse must satisfy (spans
//!   inside the source, children inside their parent, siblings in order)

pub mod invariants;
pub mod normalize;

pub use invariants::check as invariants;
pub use normalize::{NodeSnap, Snap, normalize};

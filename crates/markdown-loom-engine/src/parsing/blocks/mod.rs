//! # Block Parsing
//!
//! Line-by-line construction of the block tree, following the CommonMark
//! open-block stack model.
//!
//! ## Parsing Phases
//!
//! 1. **Continuation**: each line is offered to the open blocks from the
//!    outermost container inwards; the first block that refuses it ends
//!    the matched chain.
//! 2. **Block starts**: factories are tried at the first non-space
//!    character until none starts a block. New blocks close the unmatched
//!    tail of the stack.
//! 3. **Line content**: what is left of the line goes to the innermost
//!    block, or lazily to an open paragraph.
//!
//! ## Modules
//!
//! - **`state`**: `ParserState`, the per-line cursor factories read
//! - **`parser`**: `BlockParser`, `BlockParserFactory` and `BlockStart`
//! - **`kinds`**: one parser and factory per core block
//! - **`document_parser`**: the open-block stack driving everything
//! - **`pre_process`**: paragraph and block hooks that run before inlines
//!
//! ## Key Invariants
//!
//! - Nesting depth of containers is unbounded; list nesting stops at
//!   `ParseOptions::max_list_depth`
//! - Fenced and indented code, HTML blocks are never parsed for inlines
//! - Every block node's `chars` is a view of the source buffer

pub mod document_parser;
pub mod kinds;
pub mod parser;
pub mod pre_process;
pub mod state;

pub use kinds::core_factories;
pub use parser::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock};
pub use pre_process::{
    BlockPreProcessor, BlockPreProcessorFactory, ListTightness, ParagraphPreProcessor,
    ParagraphPreProcessorFactory, ReferenceDefinitions,
};
pub use state::{CODE_BLOCK_INDENT, ParserState};

use thiserror::Error;

/// Bounds failures raised by [`BasedSequence`](crate::sequence::BasedSequence)
/// and [`SegmentedSequence`](crate::sequence::SegmentedSequence).
///
/// These always indicate a bug in the caller (core pipeline or an extension
/// computing offsets), never malformed Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("range {start}..{end} out of bounds for sequence of length {len}")]
    OutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("offset {offset} does not fall on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
}

/// Errors surfaced by building a [`Parser`](crate::parsing::Parser) or
/// running it.
///
/// Markdown input itself never fails to parse; everything here is either a
/// programming error in extension code or a failure to read the input.
#[derive(Debug, Error)]
pub enum LoomError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("contract violation in {component}: {reason}")]
    ContractViolation { component: String, reason: String },

    #[error("dependency cycle between: {}", members.join(", "))]
    DependencyCycle { members: Vec<String> },

    #[error("duplicate registration for {key}")]
    DuplicateRegistration { key: String },

    #[error("failed to read markdown input: {0}")]
    Io(#[from] std::io::Error),

    #[error("markdown input is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoomError {
    pub(crate) fn contract(component: impl Into<String>, reason: impl Into<String>) -> Self {
        LoomError::ContractViolation {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

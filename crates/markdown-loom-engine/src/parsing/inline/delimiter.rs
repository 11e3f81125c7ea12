use unicode_categories::UnicodeCategories;

use crate::ast::{NodeId, NodeKind};
use crate::extension::Dependent;

use super::parser::InlineContext;

/// Whether `c` counts as punctuation for flanking rules: ASCII punctuation
/// or any Unicode punctuation or symbol character.
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || c.is_punctuation() || c.is_symbol()
}

/// Surroundings of a delimiter run, computed from the original text.
///
/// Start and end of the block count as whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flanking {
    pub before: Option<char>,
    pub after: Option<char>,
    pub left_flanking: bool,
    pub right_flanking: bool,
    pub before_is_punctuation: bool,
    pub after_is_punctuation: bool,
    pub before_is_whitespace: bool,
    pub after_is_whitespace: bool,
}

impl Flanking {
    pub fn new(before: Option<char>, after: Option<char>) -> Self {
        let before_is_whitespace = before.is_none_or(char::is_whitespace);
        let after_is_whitespace = after.is_none_or(char::is_whitespace);
        let before_is_punctuation = before.is_some_and(is_punctuation);
        let after_is_punctuation = after.is_some_and(is_punctuation);
        let left_flanking = !after_is_whitespace
            && (!after_is_punctuation || before_is_whitespace || before_is_punctuation);
        let right_flanking = !before_is_whitespace
            && (!before_is_punctuation || after_is_whitespace || after_is_punctuation);
        Self {
            before,
            after,
            left_flanking,
            right_flanking,
            before_is_punctuation,
            after_is_punctuation,
            before_is_whitespace,
            after_is_whitespace,
        }
    }
}

/// One run of delimiter characters awaiting a match.
///
/// Runs form a doubly linked list in document order while a block's inlines
/// are resolved; `node` is the text node holding the run's remaining
/// characters.
#[derive(Debug, Clone)]
pub struct Delimiter {
    pub node: NodeId,
    pub char: char,
    /// Characters still available for matching.
    pub length: usize,
    pub original_length: usize,
    pub can_open: bool,
    pub can_close: bool,
    pub flanking: Flanking,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

/// Matches runs of a delimiter character into nodes.
///
/// A processor owns its opening and closing characters; no other processor
/// may claim them.
pub trait DelimiterProcessor: Dependent + Send + Sync {
    fn opening_char(&self) -> char;

    fn closing_char(&self) -> char;

    /// Shorter runs are plain text.
    fn min_length(&self) -> usize {
        1
    }

    fn can_be_opener(&self, flanking: &Flanking) -> bool {
        flanking.left_flanking
    }

    fn can_be_closer(&self, flanking: &Flanking) -> bool {
        flanking.right_flanking
    }

    /// Keep runs that can neither open nor close out of the delimiter list.
    fn skip_non_opener_closer(&self) -> bool {
        false
    }

    /// How many characters to consume matching `opener` with `closer`;
    /// zero means they do not match.
    fn delimiter_use(&self, opener: &Delimiter, closer: &Delimiter) -> usize;

    /// Builds the node for a match. The used characters have already been
    /// trimmed from the opener's and closer's text nodes.
    fn process(&self, ctx: &mut InlineContext<'_>, opener: &Delimiter, closer: &Delimiter, used: usize);

    /// Replacement kind for a run left unmatched, instead of plain text.
    fn unmatched_delimiter_node(
        &self,
        _ctx: &InlineContext<'_>,
        _delimiter: &Delimiter,
    ) -> Option<NodeKind> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, Some('a'), true, false)]
    #[case(Some('a'), None, false, true)]
    #[case(Some('a'), Some('b'), true, true)]
    #[case(Some(' '), Some(' '), false, false)]
    #[case(Some('a'), Some('"'), false, true)]
    #[case(Some('"'), Some('a'), true, false)]
    #[case(Some(' '), Some('"'), true, false)]
    fn flanking_rules(
        #[case] before: Option<char>,
        #[case] after: Option<char>,
        #[case] left: bool,
        #[case] right: bool,
    ) {
        let f = Flanking::new(before, after);
        assert_eq!((f.left_flanking, f.right_flanking), (left, right));
    }

    #[test]
    fn unicode_symbols_are_punctuation() {
        assert!(is_punctuation('€'));
        assert!(is_punctuation('«'));
        assert!(!is_punctuation('é'));
    }
}

use crate::ast::NodeKind;
use crate::extension::Dependent;

use super::delimiter::{Delimiter, DelimiterProcessor, Flanking};
use super::parser::InlineContext;

/// `*` and `_` emphasis and strong emphasis.
pub struct EmphasisProcessor {
    marker: char,
}

impl EmphasisProcessor {
    pub fn asterisk() -> Self {
        Self { marker: '*' }
    }

    pub fn underscore() -> Self {
        Self { marker: '_' }
    }
}

impl Dependent for EmphasisProcessor {
    fn dependency_key(&self) -> &'static str {
        match self.marker {
            '*' => "emphasis_asterisk",
            _ => "emphasis_underscore",
        }
    }
}

impl DelimiterProcessor for EmphasisProcessor {
    fn opening_char(&self) -> char {
        self.marker
    }

    fn closing_char(&self) -> char {
        self.marker
    }

    fn can_be_opener(&self, f: &Flanking) -> bool {
        if self.marker == '_' {
            f.left_flanking && (!f.right_flanking || f.before_is_punctuation)
        } else {
            f.left_flanking
        }
    }

    fn can_be_closer(&self, f: &Flanking) -> bool {
        if self.marker == '_' {
            f.right_flanking && (!f.left_flanking || f.after_is_punctuation)
        } else {
            f.right_flanking
        }
    }

    fn delimiter_use(&self, opener: &Delimiter, closer: &Delimiter) -> usize {
        // Both-sided runs may not match when their lengths sum to a multiple
        // of three, unless both are.
        if (opener.can_close || closer.can_open)
            && closer.original_length % 3 != 0
            && (opener.original_length + closer.original_length) % 3 == 0
        {
            return 0;
        }
        if opener.length >= 2 && closer.length >= 2 { 2 } else { 1 }
    }

    fn process(&self, ctx: &mut InlineContext<'_>, opener: &Delimiter, closer: &Delimiter, used: usize) {
        ctx.wrap(opener, closer, used, |data| {
            if used == 2 {
                NodeKind::StrongEmphasis(data)
            } else {
                NodeKind::Emphasis(data)
            }
        });
    }
}

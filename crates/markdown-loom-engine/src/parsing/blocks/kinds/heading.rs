use crate::ast::{Ast, ContentLine, HeadingData, NodeKind};
use crate::extension::Dependent;
use crate::parsing::blocks::parser::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock,
};
use crate::parsing::blocks::state::{CODE_BLOCK_INDENT, ParserState};
use crate::sequence::BasedSequence;

/// Single-line leaf built from either an ATX line or a setext paragraph.
pub struct HeadingParser {
    block: NodeKind,
    content: Vec<ContentLine>,
}

impl HeadingParser {
    fn new(data: HeadingData, content: Vec<ContentLine>) -> Self {
        Self {
            block: NodeKind::Heading(data),
            content,
        }
    }
}

impl BlockParser for HeadingParser {
    fn block(&self) -> &NodeKind {
        &self.block
    }

    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }

    fn close_block(&mut self, ast: &mut Ast) {
        ast.kind = self.block.clone();
        ast.content.lines = std::mem::take(&mut self.content);
    }
}

/// Splits `# text ##` into marker, text and optional closing run.
fn parse_atx(rest: &BasedSequence) -> Option<(HeadingData, BasedSequence)> {
    let level = rest.count_leading(|c| c == '#');
    if !(1..=6).contains(&level) || !matches!(rest.byte_at(level), None | Some(b' ' | b'\t')) {
        return None;
    }
    let marker = rest.sub_to(level);
    let content = rest.sub_from(level).trim();
    let hashes = content.count_trailing(|c| c == '#');

    let (text, closing) = if hashes == content.len() {
        let closing = (hashes > 0).then(|| content.clone());
        (content.start_sequence(), closing)
    } else {
        let before = content.sub_to(content.len() - hashes);
        if hashes > 0 && matches!(before.last_char(), Some(' ' | '\t')) {
            (before.trim_end(), Some(content.sub_from(content.len() - hashes)))
        } else {
            (content, None)
        }
    };
    let data = HeadingData {
        level: level as u8,
        setext: false,
        marker,
        closing,
    };
    Some((data, text))
}

/// Underline level for a setext underline line, if it is one.
fn setext_level(rest: &BasedSequence) -> Option<u8> {
    let level = match rest.first_char()? {
        '=' => 1,
        '-' => 2,
        _ => return None,
    };
    let marker = rest.first_char()?;
    let run = rest.count_leading(|c| c == marker);
    rest.sub_from(run)
        .as_str()
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(level)
}

/// ATX headings, and setext underlines below a matched paragraph.
pub struct HeadingFactory;

impl Dependent for HeadingFactory {
    fn dependency_key(&self) -> &'static str {
        "heading"
    }
}

impl BlockParserFactory for HeadingFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let rest = state.rest();
        let end = state.line().len();

        if let Some((data, text)) = parse_atx(&rest) {
            let line = ContentLine::new(text.clone(), text.end_sequence());
            return Some(BlockStart::of(Box::new(HeadingParser::new(data, vec![line]))).at_index(end));
        }

        let lines = matched.paragraph_lines()?;
        let level = setext_level(&rest)?;
        let data = HeadingData {
            level,
            setext: true,
            marker: rest.trim_end(),
            closing: None,
        };
        Some(
            BlockStart::of(Box::new(HeadingParser::new(data, lines.to_vec())))
                .at_index(end)
                .replace_active_block_parser(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# foo", Some((1, "foo", None)))]
    #[case("### foo ###", Some((3, "foo", Some("###"))))]
    #[case("## foo#", Some((2, "foo#", None)))]
    #[case("# #", Some((1, "", Some("#"))))]
    #[case("#", Some((1, "", None)))]
    #[case("####### foo", None)]
    #[case("#5 bolt", None)]
    fn atx_parts(#[case] input: &str, #[case] expected: Option<(u8, &str, Option<&str>)>) {
        let got = parse_atx(&BasedSequence::new(input)).map(|(d, text)| {
            (
                d.level,
                text.to_string(),
                d.closing.map(|c| c.to_string()),
            )
        });
        let expected = expected.map(|(l, t, c)| (l, t.to_string(), c.map(str::to_string)));
        assert_eq!(got, expected);
    }

    #[test]
    fn setext_underlines() {
        assert_eq!(setext_level(&BasedSequence::new("===  ")), Some(1));
        assert_eq!(setext_level(&BasedSequence::new("--")), Some(2));
        assert_eq!(setext_level(&BasedSequence::new("-- -")), None);
        assert_eq!(setext_level(&BasedSequence::new("=a")), None);
    }
}

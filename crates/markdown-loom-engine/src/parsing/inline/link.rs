//! Scanners for the pieces of links and link reference definitions.
//!
//! Every scanner starts at the cursor and, on success, leaves the cursor
//! just past what it recognized. Returned ranges are byte offsets into the
//! cursor's text. On failure the cursor is left where it was.

use std::ops::Range;

use super::cursor::Cursor;

/// Longest label content accepted between the brackets.
pub const MAX_LABEL_CHARS: usize = 999;

/// `[label]`, returning the range of the content between the brackets.
pub fn scan_label(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    let start = cur.i;
    let result = scan_label_inner(cur);
    if result.is_none() {
        cur.i = start;
    }
    result
}

fn scan_label_inner(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    if cur.bump()? != b'[' {
        return None;
    }
    let content_start = cur.i;
    let mut chars = 0;
    loop {
        match cur.peek()? {
            b'[' => return None,
            b']' => break,
            b'\\' if cur.peek_at(1).is_some_and(|b| b.is_ascii_punctuation()) => {
                cur.bump_n(2);
                chars += 2;
            }
            _ => {
                cur.bump_char();
                chars += 1;
            }
        }
        if chars > MAX_LABEL_CHARS {
            return None;
        }
    }
    let content = content_start..cur.i;
    cur.bump();
    if cur.s[content.clone()].trim().is_empty() {
        return None;
    }
    Some(content)
}

/// A link destination, either `<...>` or a run of non-space characters
/// with balanced parentheses. The returned range excludes angle brackets.
pub fn scan_destination(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    let start = cur.i;
    let result = if cur.peek() == Some(b'<') {
        scan_angle_destination(cur)
    } else {
        scan_bare_destination(cur)
    };
    if result.is_none() {
        cur.i = start;
    }
    result
}

fn scan_angle_destination(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    cur.bump();
    let content_start = cur.i;
    loop {
        match cur.peek()? {
            b'>' => {
                let range = content_start..cur.i;
                cur.bump();
                return Some(range);
            }
            b'<' | b'\n' | b'\r' => return None,
            b'\\' if cur.peek_at(1).is_some_and(|b| b.is_ascii_punctuation()) => cur.bump_n(2),
            _ => {
                cur.bump_char();
            }
        }
    }
}

fn scan_bare_destination(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    let content_start = cur.i;
    let mut depth = 0usize;
    while let Some(b) = cur.peek() {
        match b {
            b'\\' if cur.peek_at(1).is_some_and(|b| b.is_ascii_punctuation()) => {
                cur.bump_n(2);
                continue;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b if b.is_ascii_whitespace() || b.is_ascii_control() => break,
            _ => {}
        }
        cur.bump_char();
    }
    (cur.i > content_start && depth == 0).then_some(content_start..cur.i)
}

/// A link title in `"..."`, `'...'` or `(...)`. The returned range excludes
/// the delimiters.
pub fn scan_title(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    let start = cur.i;
    let result = scan_title_inner(cur);
    if result.is_none() {
        cur.i = start;
    }
    result
}

fn scan_title_inner(cur: &mut Cursor<'_>) -> Option<Range<usize>> {
    let closer = match cur.bump()? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let content_start = cur.i;
    loop {
        match cur.peek()? {
            b if b == closer => {
                let range = content_start..cur.i;
                cur.bump();
                return Some(range);
            }
            b'(' if closer == b')' => return None,
            b'\\' if cur.peek_at(1).is_some_and(|b| b.is_ascii_punctuation()) => cur.bump_n(2),
            _ => {
                cur.bump_char();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scanned(
        input: &str,
        scan: fn(&mut Cursor<'_>) -> Option<Range<usize>>,
    ) -> Option<(String, usize)> {
        let mut cur = Cursor::new(input);
        scan(&mut cur).map(|r| (input[r].to_string(), cur.i))
    }

    #[rstest]
    #[case("[foo]: x", Some(("foo", 5)))]
    #[case("[a\\]b]", Some(("a\\]b", 6)))]
    #[case("[ ]", None)]
    #[case("[a[b]", None)]
    #[case("[open", None)]
    fn labels(#[case] input: &str, #[case] expected: Option<(&str, usize)>) {
        let expected = expected.map(|(s, n)| (s.to_string(), n));
        assert_eq!(scanned(input, scan_label), expected);
    }

    #[test]
    fn label_length_is_capped() {
        let long = format!("[{}]", "a".repeat(MAX_LABEL_CHARS + 1));
        assert_eq!(scanned(&long, scan_label), None);
        let ok = format!("[{}]", "a".repeat(MAX_LABEL_CHARS));
        assert!(scanned(&ok, scan_label).is_some());
    }

    #[rstest]
    #[case("/url rest", Some(("/url", 4)))]
    #[case("<a b> rest", Some(("a b", 5)))]
    #[case("a(b(c))d)", Some(("a(b(c))d", 8)))]
    #[case("a(b", None)]
    #[case("<a\nb>", None)]
    #[case("", None)]
    fn destinations(#[case] input: &str, #[case] expected: Option<(&str, usize)>) {
        let expected = expected.map(|(s, n)| (s.to_string(), n));
        assert_eq!(scanned(input, scan_destination), expected);
    }

    #[rstest]
    #[case("\"t\\\"x\" y", Some(("t\\\"x", 6)))]
    #[case("'single'", Some(("single", 8)))]
    #[case("(paren)", Some(("paren", 7)))]
    #[case("(a(b)", None)]
    #[case("\"open", None)]
    fn titles(#[case] input: &str, #[case] expected: Option<(&str, usize)>) {
        let expected = expected.map(|(s, n)| (s.to_string(), n));
        assert_eq!(scanned(input, scan_title), expected);
    }

    #[test]
    fn failed_scan_restores_cursor() {
        let mut cur = Cursor::new("x[open");
        cur.bump();
        assert!(scan_label(&mut cur).is_none());
        assert_eq!(cur.i, 1);
    }
}

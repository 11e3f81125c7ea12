//! Regular expressions shared by block and inline HTML recognition.

use std::sync::OnceLock;

use regex::Regex;

const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE: &str = concat!(
    r#"(?:\s+[a-zA-Z_:][a-zA-Z0-9:._-]*"#,
    r#"(?:\s*=\s*(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*"))?)"#
);

fn open_tag() -> String {
    format!(r"<{TAG_NAME}{ATTRIBUTE}*\s*/?>")
}

fn close_tag() -> String {
    format!(r"</{TAG_NAME}\s*[>]")
}

/// Raw inline HTML at the start of the input.
pub fn html_tag() -> &'static Regex {
    static HTML_TAG: OnceLock<Regex> = OnceLock::new();
    HTML_TAG.get_or_init(|| {
        let pattern = format!(
            r"^(?:{}|{}|<!-->|<!--->|<!--[\s\S]*?-->|[<][?][\s\S]*?[?][>]|<![A-Za-z]+[^>]*>|<!\[CDATA\[[\s\S]*?\]\]>)",
            open_tag(),
            close_tag()
        );
        Regex::new(&pattern).expect("Invalid inline HTML regex")
    })
}

/// `&name;`, `&#123;` or `&#x1F;` at the start of the input.
pub fn entity() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| {
        Regex::new(r"^&(?:#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});")
            .expect("Invalid entity regex")
    })
}

pub fn uri_autolink() -> &'static Regex {
    static URI: OnceLock<Regex> = OnceLock::new();
    URI.get_or_init(|| {
        Regex::new(r"^<([A-Za-z][A-Za-z0-9.+-]{1,31}:[^<>\x00-\x20]*)>")
            .expect("Invalid URI autolink regex")
    })
}

pub fn email_autolink() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
        )
        .expect("Invalid email autolink regex")
    })
}

const BLOCK_TAGS: &str = "address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul";

/// Start conditions of the seven HTML block types, paired with the pattern
/// that ends the block (`None`: ends at a blank line).
pub fn html_block_patterns() -> &'static [(Regex, Option<Regex>); 7] {
    static PATTERNS: OnceLock<[(Regex, Option<Regex>); 7]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("Invalid HTML block regex");
        [
            (
                re(r"(?i)^<(?:script|pre|style|textarea)(?:\s|>|$)"),
                Some(re(r"(?i)</(?:script|pre|style|textarea)>")),
            ),
            (re(r"^<!--"), Some(re(r"-->"))),
            (re(r"^<[?]"), Some(re(r"\?>"))),
            (re(r"^<![A-Za-z]"), Some(re(r">"))),
            (re(r"^<!\[CDATA\["), Some(re(r"\]\]>"))),
            (re(&format!(r"(?i)^</?(?:{BLOCK_TAGS})(?:\s|/?>|$)")), None),
            (
                re(&format!(r"(?i)^(?:{}|{})\s*$", open_tag(), close_tag())),
                None,
            ),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_html_variants() {
        for ok in [
            "<a href=\"x\">",
            "</div >",
            "<!-- c -->",
            "<?php ?>",
            "<!DOCTYPE html>",
            "<![CDATA[x]]>",
            "<br/>",
        ] {
            assert!(html_tag().is_match(ok), "{ok}");
        }
        assert!(!html_tag().is_match("<a href=\"x>"));
        assert!(!html_tag().is_match("< a>"));
    }

    #[test]
    fn entities() {
        assert!(entity().is_match("&amp;"));
        assert!(entity().is_match("&#x1F600;"));
        assert!(!entity().is_match("&#12345678;"));
        assert!(!entity().is_match("& amp;"));
    }

    #[test]
    fn autolinks() {
        assert!(uri_autolink().is_match("<https://example.com/a?b>"));
        assert!(!uri_autolink().is_match("<https://exa mple.com>"));
        assert!(email_autolink().is_match("<foo@bar.example.com>"));
    }

    #[test]
    fn html_block_seven_only_on_complete_tag_lines() {
        let (open, close) = &html_block_patterns()[6];
        assert!(open.is_match("<custom-tag attr=\"1\">"));
        assert!(!open.is_match("<custom-tag> trailing"));
        assert!(close.is_none());
    }
}

use markdown_loom_engine::parsing::snapshot;
use markdown_loom_engine::{Parser, parse, render_html};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn reference_html(input: &str) -> String {
    let mut out = String::new();
    pulldown_cmark::html::push_html(&mut out, pulldown_cmark::Parser::new(input));
    out
}

/// Inputs where both engines produce byte-identical CommonMark HTML.
#[rstest]
#[case("# Heading\n\nSome *emphasis* and **strong** text.\n")]
#[case("Setext\n------\n")]
#[case("a\nb\n")]
#[case("> quoted\n> > nested\n")]
#[case("- one\n- two\n  - three\n")]
#[case("1. first\n2. second\n")]
#[case("7) seven\n")]
#[case("```rust\nfn main() {}\n```\n")]
#[case("    indented\n    code\n")]
#[case("---\n")]
#[case("`code` and ``co`de``\n")]
#[case("[link](/url \"title\") and ![img](/i.png)\n")]
#[case("[ref]\n\n[ref]: /target\n")]
#[case("<http://example.com>\n")]
#[case("*a **b** c*\n")]
#[case("**foo*\n")]
#[case("foo_bar_baz\n")]
#[case("hard  \nbreak\n")]
#[case("a &amp; b &lt; c\n")]
#[case("<div>\nraw\n</div>\n")]
fn matches_reference_renderer(#[case] input: &str) {
    assert_eq!(render_html(&parse(input)), reference_html(input));
}

#[rstest]
#[case("")]
#[case("*foo")]
#[case("foo*")]
#[case("***")]
#[case("[")]
#[case("]")]
#[case("![")]
#[case("`")]
#[case("<")]
#[case("&")]
#[case("\\")]
#[case("> ")]
#[case("- ")]
#[case("1.")]
#[case("```")]
#[case("\t\t- \tx")]
#[case("[a]: <")]
#[case("**_*_**")]
fn every_input_parses(#[case] input: &str) {
    let doc = Parser::builder().build().unwrap().parse(input).unwrap();
    snapshot::invariants(&doc);
    render_html(&doc);
}

#[test]
fn fixture_document_keeps_structural_invariants() {
    let input = "# Notes\n\n\
                 > - item with `code`\n\
                 >   continued *lazily*\n\
                 \n\
                 1. [link][ref]\n\
                 2. <b>inline html</b>\n\
                 \n\
                 [ref]: /somewhere 'Title'\n";
    let doc = parse(input);
    snapshot::invariants(&doc);
    let snap = snapshot::normalize(&doc);
    assert!(snap.nodes.iter().any(|n| n.kind == "Link"));
    assert!(snap.nodes.iter().any(|n| n.kind == "Reference"));
}

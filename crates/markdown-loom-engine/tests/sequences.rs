use markdown_loom_engine::{BasedSequence, SegmentBuilder, SourceOffset, parse};
use proptest::prelude::*;

proptest! {
    #[test]
    fn sub_sequences_slice_the_base(text in "[a-z \n]{0,40}", a in 0usize..40, b in 0usize..40) {
        let seq = BasedSequence::new(text.as_str());
        let (start, end) = (a.min(b).min(text.len()), a.max(b).min(text.len()));
        let sub = seq.sub_sequence(start, end).unwrap();
        prop_assert_eq!(sub.as_str(), &text[start..end]);
        let base = sub.base_sequence();
        prop_assert_eq!(base.as_str(), text.as_str());
        prop_assert!(seq.encloses(&sub));
    }

    #[test]
    fn builder_maps_every_output_byte(text in "[a-z]{1,30}", cuts in proptest::collection::vec(0usize..30, 0..6)) {
        let base = BasedSequence::new(text.as_str());
        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(text.len())).collect();
        cuts.push(0);
        cuts.push(text.len());
        cuts.sort_unstable();

        let mut builder = SegmentBuilder::new(&base);
        let mut expected = String::new();
        for pair in cuts.windows(2) {
            builder.append(&base.slice(pair[0]..pair[1]));
            builder.append_str("|");
            expected.push_str(&text[pair[0]..pair[1]]);
            expected.push('|');
        }
        let out = builder.to_sequence();
        prop_assert_eq!(out.to_string(), expected.clone());
        for (i, c) in expected.char_indices() {
            let offset = out.source_offset_for(i).unwrap();
            if c == '|' {
                prop_assert_eq!(offset, SourceOffset::Synthetic);
            } else {
                let SourceOffset::Base(at) = offset else {
                    return Err(TestCaseError::fail("text byte mapped to inserted text"));
                };
                prop_assert_eq!(text.as_bytes()[at], c as u8);
            }
        }
    }

    #[test]
    fn parsing_never_panics(text in "[-*_`#>\\[\\]()!<&a-z0-9 \n\t]{0,80}") {
        let doc = parse(&text);
        markdown_loom_engine::render_html(&doc);
        markdown_loom_engine::format_markdown(&doc);
    }
}

use crate::ast::Document;

use super::normalize::kind_name;

/// Panics if the tree breaks a structural invariant.
pub fn check(doc: &Document) {
    let source = doc.source();
    let n = source.len();
    for id in doc.descendants(doc.root()) {
        let chars = doc.chars(id);
        let span = chars.span();
        let kind = kind_name(doc.kind(id).node_type());
        assert!(
            chars.same_buffer(source) && span.start <= span.end && span.end <= n,
            "{kind} span out of bounds: {span:?} (source len: {n})"
        );
        if let Some(parent) = doc.parent(id) {
            let outer = doc.chars(parent).span();
            assert!(
                outer.encloses(span),
                "{kind} span {span:?} not contained in parent span {outer:?}"
            );
        }
        if let Some(next) = doc.next_sibling(id) {
            let after = doc.chars(next).span();
            assert!(
                after.start >= span.start,
                "{kind} at {span:?} followed by sibling starting earlier at {after:?}"
            );
        }
    }
}

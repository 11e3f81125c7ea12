use super::based::BasedSequence;

/// One source line split into content and terminator.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// Line content without its terminator.
    pub line: BasedSequence,
    /// The terminator itself: `\n`, `\r\n`, `\r`, or empty on the last line.
    pub eol: BasedSequence,
}

impl LineRef {
    /// Content plus terminator as one view.
    pub fn with_eol(&self) -> BasedSequence {
        self.line.spliced(&self.eol).unwrap_or_else(|| self.line.clone())
    }
}

/// Returns an iterator over the lines of `seq` as zero-copy views.
///
/// All three terminator styles are recognized so spans stay accurate for
/// files with mixed line endings. A trailing terminator does not produce an
/// extra empty line.
pub fn lines_with_spans(seq: &BasedSequence) -> impl Iterator<Item = LineRef> + '_ {
    let bytes = seq.as_str().as_bytes();
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        let mut content_end = bytes.len();
        let mut next = bytes.len();
        while pos < bytes.len() {
            match bytes[pos] {
                b'\n' => {
                    content_end = pos;
                    next = pos + 1;
                    break;
                }
                b'\r' => {
                    content_end = pos;
                    next = if bytes.get(pos + 1) == Some(&b'\n') {
                        pos + 2
                    } else {
                        pos + 1
                    };
                    break;
                }
                _ => pos += 1,
            }
        }
        pos = next;
        Some(LineRef {
            line: seq.slice(start..content_end),
            eol: seq.slice(content_end..next),
        })
    })
}

use super::based::BasedSequence;

/// Renders `seq` for human-readable output, truncating to `max` bytes with a
/// `...` suffix.
///
/// Truncation backs off to the previous character boundary so multi-byte
/// text never panics.
pub fn preview(seq: &BasedSequence, max: usize) -> String {
    let s = seq.as_str();
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_text_unchanged() {
        assert_eq!(preview(&BasedSequence::new("hello"), 10), "hello");
    }

    #[test]
    fn preview_exact_length_unchanged() {
        assert_eq!(preview(&BasedSequence::new("hello"), 5), "hello");
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview(&BasedSequence::new("hello world"), 5), "hello...");
    }

    #[test]
    fn preview_truncates_to_zero() {
        assert_eq!(preview(&BasedSequence::new("hello"), 0), "...");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview(&BasedSequence::new("héllo"), 2), "h...");
    }
}

/// A cursor for byte-wise scanning of inline content.
///
/// Operates over the joined text of a leaf block; offsets are local to
/// that text and are mapped back to the source by the caller.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The text being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    pub fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + ahead).copied()
    }

    /// The character at the cursor.
    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character just before the cursor.
    pub fn char_before(&self) -> Option<char> {
        self.s[..self.i].chars().next_back()
    }

    pub fn rest(&self) -> &'a str {
        self.s.get(self.i..).unwrap_or_default()
    }

    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.rest().as_bytes().starts_with(pat)
    }

    /// Advances by one byte, returning the consumed byte.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    /// Advances past the whole character at the cursor.
    pub fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.i += c.len_utf8();
        Some(c)
    }

    /// Advances by `n` bytes, clamped to the end of the text.
    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    /// Consumes bytes while `pred` holds, returning how many were consumed.
    pub fn bump_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let start = self.i;
        while self.peek().is_some_and(&pred) {
            self.i += 1;
        }
        self.i - start
    }

    /// Skips spaces, tabs and at most one line ending.
    pub fn skip_spnl(&mut self) -> bool {
        let start = self.i;
        self.bump_while(|b| b == b' ' || b == b'\t');
        if self.starts_with(b"\r\n") {
            self.i += 2;
        } else if matches!(self.peek(), Some(b'\n' | b'\r')) {
            self.i += 1;
        }
        self.bump_while(|b| b == b' ' || b == b'\t');
        self.i > start
    }
}

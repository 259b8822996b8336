//! Character cursor over the input buffer.

use tracing::trace;

const BOM: char = '\u{FEFF}';

/// A cursor over the Unicode scalar values of a document.
///
/// The scanner never fails. Once the input is exhausted every `peek` returns
/// `None`. Input handed over as bytes is validated up front: the longest valid
/// UTF-8 prefix is scanned normally and the offset of the first bad sequence
/// is kept so the tokenizer can report it when the cursor gets there.
#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    /// The text being scanned (the whole buffer, or its valid prefix).
    source: &'src str,
    /// The unscanned suffix of `source`.
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Offset of the first invalid UTF-8 sequence, if the input had one.
    invalid_at: Option<u32>,
}

impl<'src> Scanner<'src> {
    /// Create a scanner over text, skipping one leading byte-order mark.
    pub fn new(source: &'src str) -> Self {
        let mut scanner = Self {
            source,
            remaining: source,
            pos: 0,
            invalid_at: None,
        };
        if scanner.peek() == Some(BOM) {
            trace!("Skipping byte-order mark");
            scanner.advance();
        }
        scanner
    }

    /// Create a scanner over raw bytes that are expected to be UTF-8.
    pub fn from_bytes(bytes: &'src [u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::new(text),
            Err(err) => {
                let valid = err.valid_up_to();
                // The prefix up to `valid_up_to` is always well-formed.
                let text = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                let mut scanner = Self::new(text);
                scanner.invalid_at = Some(valid as u32);
                scanner
            }
        }
    }

    /// The unscanned remainder of the text.
    #[inline]
    pub fn rest(&self) -> &'src str {
        self.remaining
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Check if there is nothing left to scan.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    /// The offset of a bad UTF-8 sequence, once the cursor has reached it.
    #[inline]
    pub fn invalid_encoding(&self) -> Option<u32> {
        self.invalid_at.filter(|_| self.is_eof())
    }

    /// Peek at the next character without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peek at the nth character (0-indexed) without consuming.
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.chars().nth(n)
    }

    /// Advance by one character and return it.
    #[inline]
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance_by(c.len_utf8());
        Some(c)
    }

    /// Advance by `n` bytes, which must land on a character boundary.
    #[inline]
    pub fn advance_by(&mut self, n: usize) {
        self.pos += n as u32;
        self.remaining = &self.remaining[n..];
    }

    /// Advance while `pred` holds; returns how many characters were consumed.
    pub fn advance_while(&mut self, mut pred: impl FnMut(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
            count += 1;
        }
        count
    }

    /// Check if the remaining text starts with the given prefix.
    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.remaining.starts_with(prefix)
    }

    /// The source text between two byte offsets.
    #[inline]
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_skips_leading_bom() {
        let mut scanner = Scanner::new("\u{FEFF}node");
        assert_eq!(scanner.position(), 3);
        assert_eq!(scanner.advance(), Some('n'));
        assert_eq!(scanner.rest(), "ode");
    }

    #[test]
    fn test_only_one_bom_is_skipped() {
        let scanner = Scanner::new("\u{FEFF}\u{FEFF}x");
        assert_eq!(scanner.peek(), Some('\u{FEFF}'));
    }

    #[test]
    fn test_exhausted_scanner_stays_exhausted() {
        let mut scanner = Scanner::new("a");
        assert_eq!(scanner.advance(), Some('a'));
        assert_eq!(scanner.advance(), None);
        assert_eq!(scanner.peek(), None);
        assert_eq!(scanner.position(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_reported_at_its_offset() {
        let mut scanner = Scanner::from_bytes(b"ab\xFFcd");
        assert_eq!(scanner.invalid_encoding(), None);
        assert_eq!(scanner.advance_while(|_| true), 2);
        assert_eq!(scanner.invalid_encoding(), Some(2));
    }

    #[test]
    fn test_peek_nth_counts_characters() {
        let scanner = Scanner::new("gar\u{e7}on");
        assert_eq!(scanner.peek_nth(3), Some('\u{e7}'));
        assert_eq!(scanner.peek_nth(4), Some('o'));
    }
}

//! Tokenizer for KDL documents.

use crate::{Scanner, Span, Token, TokenError, TokenKind, Version};
use tracing::trace;

/// A tokenizer that produces tokens from KDL source text.
///
/// The tokenizer only finds token boundaries; decoding escapes and numbers is
/// left to the lexer. Because the two KDL versions disagree on what `#` and
/// `r"` mean, the tokenizer needs to know the version once it is known.
#[derive(Clone)]
pub struct Tokenizer<'src> {
    scanner: Scanner<'src>,
    /// The resolved version, or `None` while it is still being detected.
    version: Option<Version>,
    /// Set once the bad-encoding error has been handed out.
    encoding_reported: bool,
}

impl<'src> Tokenizer<'src> {
    /// Create a new tokenizer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self::with_scanner(Scanner::new(source))
    }

    /// Create a new tokenizer for bytes that should be UTF-8.
    pub fn from_bytes(source: &'src [u8]) -> Self {
        Self::with_scanner(Scanner::from_bytes(source))
    }

    fn with_scanner(scanner: Scanner<'src>) -> Self {
        Self {
            scanner,
            version: None,
            encoding_reported: false,
        }
    }

    /// The version the tokenizer currently follows.
    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Switch to the rules of a specific version.
    pub fn set_version(&mut self, version: Option<Version>) {
        self.version = version;
    }

    /// Create a token from the given start position to current position.
    fn token(&self, kind: TokenKind, start: u32) -> Token<'src> {
        let span = Span::new(start, self.scanner.position());
        let text = self.scanner.slice(start, span.end);
        trace!("Token {:?} at {:?}: {:?}", kind, span, text);
        Token::new(kind, span, text)
    }

    fn error(&self, error: TokenError, start: u32) -> Token<'src> {
        self.token(TokenKind::Error(error), start)
    }

    /// Consume one character and produce a token of `kind` for it.
    fn single(&mut self, kind: TokenKind) -> Token<'src> {
        let start = self.scanner.position();
        self.scanner.advance();
        self.token(kind, start)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        let Some(c) = self.scanner.peek() else {
            if self.scanner.invalid_encoding().is_some() && !self.encoding_reported {
                self.encoding_reported = true;
                return self.error(TokenError::InvalidEncoding, start);
            }
            return self.token(TokenKind::Eof, start);
        };

        match c {
            // Structural tokens
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ';' => self.single(TokenKind::Semicolon),
            '=' => self.single(TokenKind::Equals),

            '"' => self.tokenize_quoted_string(),

            // Comments and slashdash; a lone `/` is never valid
            '/' if self.scanner.starts_with("//") => self.tokenize_line_comment(),
            '/' if self.scanner.starts_with("/*") => self.tokenize_block_comment(),
            '/' if self.scanner.starts_with("/-") => {
                self.scanner.advance_by(2);
                self.token(TokenKind::SlashDash, start)
            }

            '\\' => self.tokenize_line_continuation(),

            // Raw strings of either version; the lexer checks the spelling
            'r' if self.at_v1_raw_string() => self.tokenize_raw_string(),
            '#' if self.at_v2_raw_string() => self.tokenize_raw_string(),
            // v2 keyword: #true
            '#' if self.version != Some(Version::V1) => self.tokenize_hash(),

            _ if is_newline(c) => self.tokenize_newline(),
            _ if is_whitespace(c) => self.tokenize_whitespace(),
            _ if is_disallowed(c) => {
                self.scanner.advance();
                self.error(TokenError::DisallowedCharacter(c), start)
            }

            // Number-like runs are decided here, validated by the lexer
            '0'..='9' => self.tokenize_bare(TokenKind::Number),
            '+' | '-' if matches!(self.scanner.peek_nth(1), Some('0'..='9')) => {
                self.tokenize_bare(TokenKind::Number)
            }
            _ if is_identifier_char(c, self.version) => self.tokenize_bare(TokenKind::Identifier),

            // `[`, `]`, a lone `/`, and characters excluded by the version
            _ => {
                self.scanner.advance();
                self.error(TokenError::DisallowedCharacter(c), start)
            }
        }
    }

    /// Tokenize horizontal whitespace.
    fn tokenize_whitespace(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        self.scanner.advance_while(is_whitespace);
        self.token(TokenKind::Whitespace, start)
    }

    /// Tokenize one line terminator; `\r\n` is a single newline.
    fn tokenize_newline(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        self.consume_newline();
        self.token(TokenKind::Newline, start)
    }

    fn consume_newline(&mut self) -> bool {
        match self.scanner.peek() {
            Some('\r') => {
                self.scanner.advance();
                if self.scanner.peek() == Some('\n') {
                    self.scanner.advance();
                }
                true
            }
            Some(c) if is_newline(c) => {
                self.scanner.advance();
                true
            }
            _ => false,
        }
    }

    /// Tokenize an identifier or number-like run.
    fn tokenize_bare(&mut self, kind: TokenKind) -> Token<'src> {
        let start = self.scanner.position();
        self.scanner.advance();
        let version = self.version;
        let hash = kind == TokenKind::Identifier && version.is_none();
        self.scanner
            .advance_while(|c| is_identifier_char(c, version) || (hash && c == '#'));
        self.token(kind, start)
    }

    /// Tokenize a line comment: `// ...`.
    fn tokenize_line_comment(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        self.scanner.advance_by(2);
        self.scanner.advance_while(|c| !is_newline(c));
        self.token(TokenKind::LineComment, start)
    }

    /// Tokenize a block comment: `/* ... */`, which may nest.
    fn tokenize_block_comment(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        if self.skip_block_comment() {
            self.token(TokenKind::BlockComment, start)
        } else {
            self.error(TokenError::UnterminatedBlockComment, start)
        }
    }

    /// Skip a block comment starting at the cursor; false if it never ends.
    fn skip_block_comment(&mut self) -> bool {
        self.scanner.advance_by(2);
        let mut depth = 1usize;
        loop {
            if self.scanner.starts_with("*/") {
                self.scanner.advance_by(2);
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            } else if self.scanner.starts_with("/*") {
                self.scanner.advance_by(2);
                depth += 1;
            } else if self.scanner.advance().is_none() {
                return false;
            }
        }
    }

    /// Tokenize `\` followed by the rest of the line, as whitespace.
    ///
    /// Only whitespace and block comments may sit between the backslash and
    /// the line comment, newline, or end of input that finishes it.
    fn tokenize_line_continuation(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        self.scanner.advance();
        loop {
            self.scanner.advance_while(is_whitespace);
            if !self.scanner.starts_with("/*") {
                break;
            }
            if !self.skip_block_comment() {
                return self.error(TokenError::UnterminatedBlockComment, start);
            }
        }

        if self.scanner.starts_with("//") {
            self.scanner.advance_while(|c| !is_newline(c));
            self.consume_newline();
        } else if !self.consume_newline() && !self.scanner.is_eof() {
            return self.error(TokenError::InvalidLineContinuation, start);
        }
        self.token(TokenKind::Whitespace, start)
    }

    /// Tokenize a quoted string: `"..."` or a v2 `"""` multi-line string.
    fn tokenize_quoted_string(&mut self) -> Token<'src> {
        let start = self.scanner.position();

        let delimiter = if self.version != Some(Version::V1) && self.scanner.starts_with("\"\"\"") {
            "\"\"\""
        } else {
            "\""
        };
        self.scanner.advance_by(delimiter.len());

        loop {
            if self.scanner.starts_with(delimiter) {
                self.scanner.advance_by(delimiter.len());
                return self.token(TokenKind::QuotedString, start);
            }
            match self.scanner.advance() {
                // Escape sequence - the escaped character can't close the string
                Some('\\') => {
                    self.scanner.advance();
                }
                Some(_) => {}
                None => return self.error(TokenError::UnterminatedString, start),
            }
        }
    }

    /// Whether the cursor sits on `r"` or `r#...#"`.
    fn at_v1_raw_string(&self) -> bool {
        self.scanner.rest()[1..]
            .trim_start_matches('#')
            .starts_with('"')
    }

    /// Whether the cursor sits on `#"` or `##...#"`.
    fn at_v2_raw_string(&self) -> bool {
        self.scanner.rest().trim_start_matches('#').starts_with('"')
    }

    /// Tokenize a `#` that doesn't start a raw string.
    ///
    /// While the version is unknown, `#` may also be part of a KDL 1.0
    /// identifier, so the run takes in further `#`s and a lone `#` is an
    /// identifier. The lexer settles which one it was.
    fn tokenize_hash(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        let version = self.version;
        let hash = version.is_none();
        match self.scanner.peek_nth(1) {
            Some(c) if is_identifier_char(c, version) || (hash && c == '#') => {
                self.scanner.advance();
                self.scanner
                    .advance_while(|c| is_identifier_char(c, version) || (hash && c == '#'));
                self.token(TokenKind::Keyword, start)
            }
            _ if hash => {
                self.scanner.advance();
                self.token(TokenKind::Identifier, start)
            }
            _ => {
                self.scanner.advance();
                self.error(TokenError::DisallowedCharacter('#'), start)
            }
        }
    }

    /// Tokenize a raw string: `r#*"..."#*` (v1) or `#+"..."#+` (v2).
    /// Returns the entire raw string including delimiters.
    fn tokenize_raw_string(&mut self) -> Token<'src> {
        let start = self.scanner.position();
        let v1_style = self.scanner.peek() == Some('r');
        if v1_style {
            self.scanner.advance();
        }
        let hashes = self.scanner.advance_while(|c| c == '#');

        let quote = if !v1_style && self.scanner.starts_with("\"\"\"") {
            "\"\"\""
        } else {
            "\""
        };
        self.scanner.advance_by(quote.len());

        loop {
            if self.at_raw_close(quote, hashes) {
                self.scanner.advance_by(quote.len() + hashes);
                return self.token(TokenKind::RawString, start);
            }
            if self.scanner.advance().is_none() {
                return self.error(TokenError::UnterminatedRawString, start);
            }
        }
    }

    fn at_raw_close(&self, quote: &str, hashes: usize) -> bool {
        self.scanner.rest().strip_prefix(quote).is_some_and(|tail| {
            tail.len() >= hashes && tail.as_bytes()[..hashes].iter().all(|&b| b == b'#')
        })
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Check for a code point that may never appear in a document.
pub fn is_disallowed(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}'
            | '\u{E}'..='\u{1F}'
            | '\u{7F}'
            | '\u{200E}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

/// Check for non-newline whitespace.
pub fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{20}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Check for a line terminator character.
pub fn is_newline(c: char) -> bool {
    matches!(
        c,
        '\u{A}'..='\u{D}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Check if a character can be part of a bare identifier.
///
/// `#` belongs to identifiers only in v1; `<`, `>` and `,` only outside v1.
pub fn is_identifier_char(c: char, version: Option<Version>) -> bool {
    if is_whitespace(c) || is_newline(c) || is_disallowed(c) {
        return false;
    }
    match c {
        '\\' | '/' | '(' | ')' | '{' | '}' | ';' | '[' | ']' | '"' | '=' => false,
        '#' => version == Some(Version::V1),
        '<' | '>' | ',' => version != Some(Version::V1),
        _ => true,
    }
}

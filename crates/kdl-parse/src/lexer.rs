//! Lexer: decodes tokens into lexemes and tracks the document version.

use std::borrow::Cow;

use kdl_tokenizer::{Token, TokenKind, Tokenizer, is_newline};
use tracing::debug;

use crate::number::parse_number;
use crate::unescape::{Decoded, dedent, unescape};
use crate::{Number, ParseError, ParseErrorKind, Span, Value, Version};

/// Bare identifiers that KDL 1.0 reads as values.
pub const V1_KEYWORDS: &[&str] = &["true", "false", "null"];

/// Bare identifiers that can't be used as names or string values.
pub const RESERVED_IDENTIFIERS: &[&str] = &["true", "false", "null", "inf", "-inf", "nan"];

/// How a string was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// `"..."` or `"""..."""`, escapes resolved.
    Quoted,
    /// `r#"..."#` or `#"..."#`, taken literally.
    Raw,
}

/// A decoded token.
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme<'src> {
    /// Bare identifier. Whether it names something or is a value is up to the parser.
    Identifier { span: Span, text: &'src str },
    /// A string of any kind.
    String {
        span: Span,
        value: Cow<'src, str>,
        kind: StringKind,
    },
    Number { span: Span, value: Number<'src> },
    /// `#true`, `#null`, `#inf`, ...
    Keyword { span: Span, value: Value<'src> },
    LBrace(Span),
    RBrace(Span),
    LParen(Span),
    RParen(Span),
    Semicolon(Span),
    Equals(Span),
    SlashDash(Span),
    Whitespace(Span),
    Newline(Span),
    LineComment { span: Span, text: &'src str },
    BlockComment { span: Span, text: &'src str },
    Eof(Span),
    Error(ParseError),
}

impl Lexeme<'_> {
    pub fn span(&self) -> Span {
        match self {
            Lexeme::Identifier { span, .. }
            | Lexeme::String { span, .. }
            | Lexeme::Number { span, .. }
            | Lexeme::Keyword { span, .. }
            | Lexeme::LineComment { span, .. }
            | Lexeme::BlockComment { span, .. } => *span,
            Lexeme::LBrace(span)
            | Lexeme::RBrace(span)
            | Lexeme::LParen(span)
            | Lexeme::RParen(span)
            | Lexeme::Semicolon(span)
            | Lexeme::Equals(span)
            | Lexeme::SlashDash(span)
            | Lexeme::Whitespace(span)
            | Lexeme::Newline(span)
            | Lexeme::Eof(span) => *span,
            Lexeme::Error(error) => error.span,
        }
    }

    /// Whitespace that may separate the entries of a node.
    pub fn is_node_space(&self) -> bool {
        matches!(self, Lexeme::Whitespace(_) | Lexeme::BlockComment { .. })
    }
}

/// Turns tokens into lexemes, and settles which KDL version is being read.
///
/// Until the version is known the tokenizer accepts the syntax of both.
/// The first construct that only one version has decides it, and from
/// then on the other version's syntax is an error.
#[derive(Clone)]
pub struct Lexer<'src> {
    tokenizer: Tokenizer<'src>,
    /// Whether the version was fixed by the caller rather than detected.
    pinned: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            pinned: false,
        }
    }

    /// Create a new lexer for bytes that should be UTF-8.
    pub fn from_bytes(source: &'src [u8]) -> Self {
        Self {
            tokenizer: Tokenizer::from_bytes(source),
            pinned: false,
        }
    }

    /// Fix the version instead of detecting it; `None` means detect.
    pub fn pin(&mut self, version: Option<Version>) {
        self.pinned = version.is_some();
        self.tokenizer.set_version(version);
    }

    /// The version being read, if known yet.
    pub fn version(&self) -> Option<Version> {
        self.tokenizer.version()
    }

    /// Note that the construct at `span` only exists in `required`.
    ///
    /// Settles the version if it wasn't known yet.
    pub fn require(&mut self, required: Version, span: Span) -> Result<(), ParseError> {
        match self.tokenizer.version() {
            None => {
                debug!("Detected {} from syntax at {:?}", required, span);
                self.tokenizer.set_version(Some(required));
                Ok(())
            }
            Some(current) if current == required => Ok(()),
            Some(current) => {
                let kind = if self.pinned {
                    ParseErrorKind::VersionMismatch { required }
                } else {
                    ParseErrorKind::MixedVersions { detected: current }
                };
                Err(ParseError::new(kind, span))
            }
        }
    }

    /// Get the next lexeme.
    pub fn next_lexeme(&mut self) -> Lexeme<'src> {
        let token = self.tokenizer.next_token();
        self.decode(token).unwrap_or_else(Lexeme::Error)
    }

    fn decode(&mut self, token: Token<'src>) -> Result<Lexeme<'src>, ParseError> {
        let span = token.span;
        Ok(match token.kind {
            TokenKind::LBrace => Lexeme::LBrace(span),
            TokenKind::RBrace => Lexeme::RBrace(span),
            TokenKind::LParen => Lexeme::LParen(span),
            TokenKind::RParen => Lexeme::RParen(span),
            TokenKind::Semicolon => Lexeme::Semicolon(span),
            TokenKind::Equals => Lexeme::Equals(span),
            TokenKind::SlashDash => Lexeme::SlashDash(span),
            TokenKind::Whitespace => Lexeme::Whitespace(span),
            TokenKind::Newline => Lexeme::Newline(span),
            TokenKind::LineComment => Lexeme::LineComment {
                span,
                text: token.text,
            },
            TokenKind::BlockComment => Lexeme::BlockComment {
                span,
                text: token.text,
            },
            TokenKind::Identifier => self.identifier(token)?,
            TokenKind::Number => match parse_number(token.text) {
                Some(value) => Lexeme::Number { span, value },
                None => return Err(ParseError::new(ParseErrorKind::InvalidNumber, span)),
            },
            TokenKind::Keyword => match keyword_value(&token.text[1..]) {
                Some(value) => {
                    self.require(Version::V2, span)?;
                    Lexeme::Keyword { span, value }
                }
                // Not a keyword, so a KDL 1.0 identifier like `#tag`
                None if self.version().is_none() => self.identifier(token)?,
                None => return Err(ParseError::new(ParseErrorKind::InvalidKeyword, span)),
            },
            TokenKind::QuotedString => self.quoted_string(token)?,
            TokenKind::RawString => self.raw_string(token)?,
            TokenKind::Eof => Lexeme::Eof(span),
            TokenKind::Error(error) => return Err(ParseError::new(error.into(), span)),
        })
    }

    fn identifier(&mut self, token: Token<'src>) -> Result<Lexeme<'src>, ParseError> {
        let span = token.span;
        if looks_numeric(token.text) {
            return Err(ParseError::new(ParseErrorKind::AmbiguousIdentifier, span));
        }
        if token.text.contains('#') {
            self.require(Version::V1, span)?;
        }
        Ok(Lexeme::Identifier {
            span,
            text: token.text,
        })
    }

    fn quoted_string(&mut self, token: Token<'src>) -> Result<Lexeme<'src>, ParseError> {
        let span = token.span;
        let text = token.text;

        // The tokenizer only produces these when the version allows them
        if text.len() >= 6 && text.starts_with("\"\"\"") {
            self.require(Version::V2, span)?;
            let dedented = dedent(&text[3..text.len() - 3]).ok_or_else(|| {
                ParseError::new(ParseErrorKind::InvalidMultilineString, span)
            })?;
            let decoded = unescape(&dedented, false)
                .map_err(|e| ParseError::new(ParseErrorKind::InvalidEscape(e.sequence), span))?;
            if decoded.v1_at.is_some() {
                self.require(Version::V1, span)?;
            }
            return Ok(Lexeme::String {
                span,
                value: Cow::Owned(decoded.text.into_owned()),
                kind: StringKind::Quoted,
            });
        }

        let body = &text[1..text.len() - 1];
        let base = span.start + 1;
        let decoded = unescape(body, true).map_err(|e| {
            let start = base + e.offset as u32;
            let end = start + e.sequence.len() as u32;
            ParseError::new(
                ParseErrorKind::InvalidEscape(e.sequence),
                Span::new(start, end),
            )
        })?;
        self.check_markers(&decoded, body, base)?;
        Ok(Lexeme::String {
            span,
            value: decoded.text,
            kind: StringKind::Quoted,
        })
    }

    /// Apply what a single-line string body says about the version.
    fn check_markers(
        &mut self,
        decoded: &Decoded<'_>,
        body: &str,
        base: u32,
    ) -> Result<(), ParseError> {
        let at = |offset: usize, len: usize| {
            Span::new(base + offset as u32, base + (offset + len) as u32)
        };

        if let Some(offset) = decoded.newline_at {
            let len = body[offset..].chars().next().map_or(1, char::len_utf8);
            let span = at(offset, len);
            if self.version() == Some(Version::V2) {
                return Err(ParseError::new(ParseErrorKind::NewlineInString, span));
            }
            self.require(Version::V1, span)?;
        }
        if let Some(offset) = decoded.v1_at {
            self.require(Version::V1, at(offset, 2))?;
        }
        if let Some(offset) = decoded.v2_at {
            self.require(Version::V2, at(offset, 2))?;
        }
        Ok(())
    }

    fn raw_string(&mut self, token: Token<'src>) -> Result<Lexeme<'src>, ParseError> {
        let span = token.span;
        let (fenced, version) = match token.text.strip_prefix('r') {
            Some(rest) => (rest, Version::V1),
            None => (token.text, Version::V2),
        };
        self.require(version, span)?;

        let hashes = fenced.len() - fenced.trim_start_matches('#').len();
        let quoted = &fenced[hashes..fenced.len() - hashes];

        if version == Version::V2 && quoted.len() >= 6 && quoted.starts_with("\"\"\"") {
            let value = dedent(&quoted[3..quoted.len() - 3]).ok_or_else(|| {
                ParseError::new(ParseErrorKind::InvalidMultilineString, span)
            })?;
            return Ok(Lexeme::String {
                span,
                value: Cow::Owned(value),
                kind: StringKind::Raw,
            });
        }

        let body = &quoted[1..quoted.len() - 1];
        if version == Version::V2 && body.contains(is_newline) {
            return Err(ParseError::new(ParseErrorKind::NewlineInString, span));
        }
        Ok(Lexeme::String {
            span,
            value: Cow::Borrowed(body),
            kind: StringKind::Raw,
        })
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Lexeme<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_lexeme() {
            Lexeme::Eof(_) => None,
            lexeme => Some(lexeme),
        }
    }
}

/// The value of a keyword, without its `#`.
pub(crate) fn keyword_value(name: &str) -> Option<Value<'static>> {
    Some(match name {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        "inf" => Value::Number(Number::Float(f64::INFINITY)),
        "-inf" => Value::Number(Number::Float(f64::NEG_INFINITY)),
        "nan" => Value::Number(Number::Float(f64::NAN)),
        _ => return None,
    })
}

/// `.5`, `+.5`, `-.5`: identifiers that read like a number missing its zero.
fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned
        .strip_prefix('.')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    /// Lex everything, dropping trivia.
    fn lex(source: &str) -> Vec<Lexeme<'_>> {
        Lexer::new(source)
            .filter(|l| !l.is_node_space() && !matches!(l, Lexeme::Newline(_)))
            .collect()
    }

    fn lex_with_version(source: &str) -> (Vec<Lexeme<'_>>, Option<Version>) {
        let mut lexer = Lexer::new(source);
        let lexemes = lexer.by_ref().filter(|l| !l.is_node_space()).collect();
        (lexemes, lexer.version())
    }

    fn errors(source: &str) -> Vec<ParseErrorKind> {
        Lexer::new(source)
            .filter_map(|l| match l {
                Lexeme::Error(e) => Some(e.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_quoted_string_with_escape() {
        let lexemes = lex(r#""gar\u{e7}on""#);
        assert_eq!(
            lexemes,
            vec![Lexeme::String {
                span: Span::new(0, 13),
                value: Cow::Owned("garçon".to_string()),
                kind: StringKind::Quoted,
            }]
        );
    }

    #[test]
    fn test_plain_string_borrows() {
        match &lex(r#""plain""#)[0] {
            Lexeme::String { value, .. } => assert!(matches!(value, Cow::Borrowed("plain"))),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn test_numbers_and_keywords() {
        assert_eq!(
            lex("0x123 #true #-inf"),
            vec![
                Lexeme::Number {
                    span: Span::new(0, 5),
                    value: Number::Integer(0x123),
                },
                Lexeme::Keyword {
                    span: Span::new(6, 11),
                    value: Value::Bool(true),
                },
                Lexeme::Keyword {
                    span: Span::new(12, 17),
                    value: Value::Number(Number::Float(f64::NEG_INFINITY)),
                },
            ]
        );
    }

    #[test]
    fn test_invalid_number_and_keyword() {
        assert_eq!(errors("1abc"), vec![ParseErrorKind::InvalidNumber]);
        let mut lexer = Lexer::new("#yes");
        lexer.pin(Some(Version::V2));
        assert_eq!(
            lexer.next_lexeme(),
            Lexeme::Error(ParseError::new(
                ParseErrorKind::InvalidKeyword,
                Span::new(0, 4)
            ))
        );
    }

    #[test]
    fn test_hash_identifiers_detect_v1() {
        let (lexemes, version) = lex_with_version("a#b #tag");
        assert_eq!(version, Some(Version::V1));
        assert_eq!(
            lexemes,
            vec![
                Lexeme::Identifier {
                    span: Span::new(0, 3),
                    text: "a#b"
                },
                Lexeme::Identifier {
                    span: Span::new(4, 8),
                    text: "#tag"
                },
            ]
        );
        assert_eq!(lex_with_version("#true").1, Some(Version::V2));
    }

    #[test]
    fn test_ambiguous_identifiers() {
        assert_eq!(errors(".5"), vec![ParseErrorKind::AmbiguousIdentifier]);
        assert_eq!(errors("-.5"), vec![ParseErrorKind::AmbiguousIdentifier]);
        assert_eq!(errors(".foo -bar"), vec![]);
    }

    #[test]
    fn test_escape_error_span() {
        let lexemes = lex(r#""ab\qc""#);
        assert_eq!(
            lexemes,
            vec![Lexeme::Error(ParseError::new(
                ParseErrorKind::InvalidEscape(r"\q".to_string()),
                Span::new(3, 5)
            ))]
        );
    }

    #[test]
    fn test_detects_v1_from_raw_string() {
        let (lexemes, version) = lex_with_version(r##"r#"node"#"##);
        assert_eq!(version, Some(Version::V1));
        assert_eq!(
            lexemes,
            vec![Lexeme::String {
                span: Span::new(0, 9),
                value: Cow::Borrowed("node"),
                kind: StringKind::Raw,
            }]
        );
    }

    #[test]
    fn test_detects_v2_from_raw_string() {
        let (lexemes, version) = lex_with_version(r##"#"node"#"##);
        assert_eq!(version, Some(Version::V2));
        assert_eq!(
            lexemes,
            vec![Lexeme::String {
                span: Span::new(0, 8),
                value: Cow::Borrowed("node"),
                kind: StringKind::Raw,
            }]
        );
    }

    #[test]
    fn test_common_syntax_leaves_version_open() {
        let (_, version) = lex_with_version("node 1 \"two\" { child; }");
        assert_eq!(version, None);
    }

    #[test]
    fn test_escape_markers_detect_version() {
        assert_eq!(lex_with_version(r#""a\/b""#).1, Some(Version::V1));
        assert_eq!(lex_with_version(r#""a\sb""#).1, Some(Version::V2));
        assert_eq!(lex_with_version("\"a\nb\"").1, Some(Version::V1));
    }

    #[test]
    fn test_mixed_versions() {
        assert_eq!(
            errors(r#"r"one" "\s""#),
            vec![ParseErrorKind::MixedVersions {
                detected: Version::V1
            }]
        );
    }

    #[test]
    fn test_pinned_version_mismatch() {
        let mut lexer = Lexer::new("#\"raw\"#");
        lexer.pin(Some(Version::V1));
        assert_eq!(
            lexer.next_lexeme(),
            Lexeme::Error(ParseError::new(
                ParseErrorKind::VersionMismatch {
                    required: Version::V2
                },
                Span::new(0, 7)
            ))
        );

        let mut lexer = Lexer::new(r##"r#"raw"#"##);
        lexer.pin(Some(Version::V2));
        assert_eq!(
            lexer.next_lexeme(),
            Lexeme::Error(ParseError::new(
                ParseErrorKind::VersionMismatch {
                    required: Version::V1
                },
                Span::new(0, 8)
            ))
        );

        let mut lexer = Lexer::new(r#""a\sb""#);
        lexer.pin(Some(Version::V1));
        assert_eq!(
            lexer.next_lexeme(),
            Lexeme::Error(ParseError::new(
                ParseErrorKind::VersionMismatch {
                    required: Version::V2
                },
                Span::new(2, 4)
            ))
        );
    }

    #[test]
    fn test_newline_in_v2_string() {
        let mut lexer = Lexer::new("\"a\nb\"");
        lexer.pin(Some(Version::V2));
        assert_eq!(
            lexer.next_lexeme(),
            Lexeme::Error(ParseError::new(
                ParseErrorKind::NewlineInString,
                Span::new(2, 3)
            ))
        );
    }

    #[test]
    fn test_multiline_strings() {
        let source = "\"\"\"\n    hello\n      world\n    \"\"\"";
        let (lexemes, version) = lex_with_version(source);
        assert_eq!(version, Some(Version::V2));
        assert!(matches!(
            &lexemes[0],
            Lexeme::String { value, kind: StringKind::Quoted, .. } if value == "hello\n  world"
        ));

        let raw = "#\"\"\"\n  a\\n\n  \"\"\"#";
        assert!(matches!(
            &lex(raw)[0],
            Lexeme::String { value, kind: StringKind::Raw, .. } if value == "a\\n"
        ));

        assert_eq!(
            errors("\"\"\"text\"\"\""),
            vec![ParseErrorKind::InvalidMultilineString]
        );
    }
}

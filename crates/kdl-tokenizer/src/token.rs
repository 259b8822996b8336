//! Token types for the KDL tokenizer.

use std::fmt;

use crate::Span;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Structural tokens
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `/-`
    SlashDash,

    // Value tokens
    /// Bare identifier: `node`, `key`, `-foo`
    Identifier,
    /// Anything that starts like a number: `42`, `-1.5e3`, `0x_ff`
    Number,
    /// `#true`, `#null`, `#-inf`, ...
    Keyword,
    /// Quoted string: `"hello"`, or `"""` multi-line
    QuotedString,
    /// Raw string: `r#"..."#` or `#"..."#`
    RawString,

    // Trivia
    /// Horizontal whitespace, including `\` line continuations
    Whitespace,
    /// A single line terminator (`\r\n` counts as one)
    Newline,
    /// Line comment: `// ...`, not including the newline
    LineComment,
    /// Block comment: `/* ... */`, possibly nested
    BlockComment,

    // Special tokens
    /// End of input
    Eof,
    /// Lexical error
    Error(TokenError),
}

/// Why the tokenizer gave up on a piece of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenError {
    /// The input is not valid UTF-8 from here on.
    InvalidEncoding,
    /// A code point that may never appear in a KDL document.
    DisallowedCharacter(char),
    /// A quoted string without its closing quote.
    UnterminatedString,
    /// A raw string without a closing quote and matching fence.
    UnterminatedRawString,
    /// A `/*` without its matching `*/`.
    UnterminatedBlockComment,
    /// A `\` outside a string that is not followed by the end of the line.
    InvalidLineContinuation,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidEncoding => write!(f, "invalid UTF-8"),
            TokenError::DisallowedCharacter(c) => {
                write!(f, "disallowed character U+{:04X}", *c as u32)
            }
            TokenError::UnterminatedString => write!(f, "unterminated string"),
            TokenError::UnterminatedRawString => write!(f, "unterminated raw string"),
            TokenError::UnterminatedBlockComment => write!(f, "unterminated block comment"),
            TokenError::InvalidLineContinuation => write!(f, "invalid line continuation"),
        }
    }
}

/// A token with its kind, span, and source text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the source text.
    pub span: Span,
    /// The source text of this token.
    pub text: &'src str,
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, text: &'src str) -> Self {
        Self { kind, span, text }
    }
}

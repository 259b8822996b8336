//! Event types for the KDL event-based parser.

use std::borrow::Cow;

use crate::{ParseError, Span, Value, Version};

/// Events emitted by the parser.
///
/// Names, annotations, and string values borrow from the input unless
/// escape processing forced a copy.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'src> {
    /// A node begins.
    StartNode {
        /// Span of the annotation (if any) and the name.
        span: Span,
        /// Node name.
        name: Cow<'src, str>,
        /// Type annotation, without the parentheses.
        annotation: Option<Cow<'src, str>>,
        /// Whether the node is slashdashed, itself or through an ancestor.
        commented: bool,
    },
    /// The most recently started node ends.
    EndNode {
        /// Span of the name of the node that ends.
        span: Span,
        /// Whether the node is slashdashed, itself or through an ancestor.
        commented: bool,
    },
    /// A positional value of the current node.
    Argument {
        /// Span of the annotation (if any) and the value.
        span: Span,
        /// Type annotation, without the parentheses.
        annotation: Option<Cow<'src, str>>,
        /// The decoded value.
        value: Value<'src>,
        /// Whether the argument is slashdashed, itself or through its node.
        commented: bool,
    },
    /// A `key=value` pair of the current node.
    Property {
        /// Span from the key to the end of the value.
        span: Span,
        /// Property key.
        name: Cow<'src, str>,
        /// Type annotation of the value, without the parentheses.
        annotation: Option<Cow<'src, str>>,
        /// The decoded value.
        value: Value<'src>,
        /// Whether the property is slashdashed, itself or through its node.
        commented: bool,
    },
    /// The whole document was parsed.
    EndOfInput,
    /// Parsing stopped; no further structure is available.
    ParseError(ParseError),
}

/// The kind of an [`Event`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartNode,
    EndNode,
    Argument,
    Property,
    EndOfInput,
    ParseError,
}

impl<'src> Event<'src> {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartNode { .. } => EventKind::StartNode,
            Event::EndNode { .. } => EventKind::EndNode,
            Event::Argument { .. } => EventKind::Argument,
            Event::Property { .. } => EventKind::Property,
            Event::EndOfInput => EventKind::EndOfInput,
            Event::ParseError(_) => EventKind::ParseError,
        }
    }

    /// Whether this event comes from slashdashed input.
    ///
    /// Only ever true when the parser was asked to emit comments.
    pub fn is_commented(&self) -> bool {
        match self {
            Event::StartNode { commented, .. }
            | Event::EndNode { commented, .. }
            | Event::Argument { commented, .. }
            | Event::Property { commented, .. } => *commented,
            Event::EndOfInput | Event::ParseError(_) => false,
        }
    }

    /// Whether no further events will follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::EndOfInput | Event::ParseError(_))
    }

    /// The source span of this event, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Event::StartNode { span, .. }
            | Event::EndNode { span, .. }
            | Event::Argument { span, .. }
            | Event::Property { span, .. } => Some(*span),
            Event::ParseError(error) => Some(error.span),
            Event::EndOfInput => None,
        }
    }

    /// Detach the event from the input buffer.
    pub fn into_owned(self) -> Event<'static> {
        fn own(text: Cow<'_, str>) -> Cow<'static, str> {
            Cow::Owned(text.into_owned())
        }

        match self {
            Event::StartNode {
                span,
                name,
                annotation,
                commented,
            } => Event::StartNode {
                span,
                name: own(name),
                annotation: annotation.map(own),
                commented,
            },
            Event::EndNode { span, commented } => Event::EndNode { span, commented },
            Event::Argument {
                span,
                annotation,
                value,
                commented,
            } => Event::Argument {
                span,
                annotation: annotation.map(own),
                value: value.into_owned(),
                commented,
            },
            Event::Property {
                span,
                name,
                annotation,
                value,
                commented,
            } => Event::Property {
                span,
                name: own(name),
                annotation: annotation.map(own),
                value: value.into_owned(),
                commented,
            },
            Event::EndOfInput => Event::EndOfInput,
            Event::ParseError(error) => Event::ParseError(error),
        }
    }
}

/// Parse error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    // Encoding and lexical errors
    /// The input is not valid UTF-8.
    InvalidEncoding,
    /// A code point that may not appear in a document.
    DisallowedCharacter(char),
    /// A quoted string without its closing quote.
    UnterminatedString,
    /// A raw string without its closing quote and fence.
    UnterminatedRawString,
    /// A `/*` without its matching `*/`.
    UnterminatedBlockComment,
    /// A `\` outside a string that isn't followed by the end of the line.
    InvalidLineContinuation,
    /// Invalid escape sequence in a quoted string.
    InvalidEscape(String),
    /// A single-line string containing a newline.
    NewlineInString,
    /// A multi-line string whose lines don't share the closing indentation.
    InvalidMultilineString,
    /// A malformed numeric literal.
    InvalidNumber,
    /// A `#` keyword that doesn't exist.
    InvalidKeyword,
    /// An identifier that starts like a number (`.5`, `-.5`).
    AmbiguousIdentifier,

    // Structural errors
    /// A token that makes no sense here.
    UnexpectedToken,
    /// Expected a node name (identifier or string).
    ExpectedNodeName,
    /// Expected a value.
    ExpectedValue,
    /// `true`, `null`, `inf`, ... used as a bare identifier.
    BareKeyword,
    /// `(12)` - a type annotation must be an identifier or string.
    NumericTypeAnnotation,
    /// A type annotation without a name.
    ExpectedTypeName,
    /// A type annotation without its closing `)`.
    UnclosedTypeAnnotation,
    /// Two entries of a node that aren't separated by whitespace.
    MissingWhitespace,
    /// A child block without its closing `}`.
    UnclosedBlock,
    /// A `}` with no open child block.
    UnexpectedCloseBrace,
    /// A node with more than one child block.
    MultipleChildBlocks,
    /// An argument or property after the node's child block.
    EntryAfterChildren,

    // Version errors
    /// Syntax from `required` while parsing is pinned to the other version.
    VersionMismatch {
        /// The version the offending syntax belongs to.
        required: Version,
    },
    /// Syntax from the other version after the document was detected as `detected`.
    MixedVersions {
        /// The version the document was detected as.
        detected: Version,
    },
}

impl From<kdl_tokenizer::TokenError> for ParseErrorKind {
    fn from(error: kdl_tokenizer::TokenError) -> Self {
        use kdl_tokenizer::TokenError;
        match error {
            TokenError::InvalidEncoding => ParseErrorKind::InvalidEncoding,
            TokenError::DisallowedCharacter(c) => ParseErrorKind::DisallowedCharacter(c),
            TokenError::UnterminatedString => ParseErrorKind::UnterminatedString,
            TokenError::UnterminatedRawString => ParseErrorKind::UnterminatedRawString,
            TokenError::UnterminatedBlockComment => ParseErrorKind::UnterminatedBlockComment,
            TokenError::InvalidLineContinuation => ParseErrorKind::InvalidLineContinuation,
        }
    }
}

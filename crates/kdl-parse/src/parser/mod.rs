//! Pull-based event parser for KDL.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::lexer::{RESERVED_IDENTIFIERS, V1_KEYWORDS, keyword_value};
use crate::{
    Event, Lexeme, Lexer, ParseError, ParseErrorKind, ParseOptions, Span, Value, Version,
};

/// Wraps lexer with a single pending slot for stashing boundary lexemes.
#[derive(Clone)]
struct LexemeSource<'src> {
    lexer: Lexer<'src>,
    /// Single pending lexeme slot. When a node or an argument ends at a
    /// lexeme that belongs to whatever comes next (`}`, end of input, the
    /// lookahead past an argument), it is stashed here instead of being
    /// discarded. Limited to exactly one slot - if we ever need more,
    /// that's a bug in our logic.
    pending: Option<Lexeme<'src>>,
}

impl<'src> LexemeSource<'src> {
    fn new(lexer: Lexer<'src>) -> Self {
        Self {
            lexer,
            pending: None,
        }
    }

    fn next(&mut self) -> Lexeme<'src> {
        self.pending
            .take()
            .unwrap_or_else(|| self.lexer.next_lexeme())
    }

    fn stash(&mut self, lexeme: Lexeme<'src>) {
        assert!(self.pending.is_none(), "double stash - this is a bug");
        self.pending = Some(lexeme);
    }
}

/// Pull-based event parser for KDL.
///
/// Each call to [`Parser::next_event`] reads just enough input to produce
/// one event. The stream ends with exactly one [`Event::EndOfInput`] or
/// [`Event::ParseError`]; asking for more after that repeats it.
#[derive(Clone)]
pub struct Parser<'src> {
    source: LexemeSource<'src>,
    options: ParseOptions,
    state: State,
    /// Nodes that have started but not ended, innermost last.
    scopes: Vec<Scope>,
    /// Set once the iterator has handed out the terminal event.
    exhausted: bool,
}

/// Parser state machine states.
#[derive(Debug, Clone)]
enum State {
    /// Between nodes: expecting a node, `}`, or the end of input.
    NodeStart,

    /// Inside the current node, after its name or one of its entries.
    Entries {
        /// Whether node space separates the last entry from what follows.
        spaced: bool,
    },

    /// After a child block of the current node closed.
    AfterChildren,

    /// The document ended.
    Finished,

    /// Parsing stopped at an error.
    Failed(ParseError),
}

/// A node that has started but not ended.
#[derive(Debug, Clone)]
struct Scope {
    span: Span,
    /// Slashdashed, itself or through an ancestor.
    commented: bool,
    /// A child block that isn't slashdashed has been opened.
    has_children: bool,
    /// The child block being read right now.
    block: Option<Block>,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    span: Span,
    commented: bool,
}

impl<'src> Parser<'src> {
    /// Create a new parser for the given source.
    pub fn new(source: &'src str) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    /// Create a new parser with options.
    pub fn with_options(source: &'src str, options: ParseOptions) -> Self {
        Self::from_lexer(Lexer::new(source), options)
    }

    /// Create a new parser for bytes that should be UTF-8.
    ///
    /// Bad encoding is reported as a parse error when the parser reaches it.
    pub fn from_bytes(source: &'src [u8]) -> Self {
        Self::from_bytes_with_options(source, ParseOptions::default())
    }

    /// Create a new parser for bytes that should be UTF-8, with options.
    pub fn from_bytes_with_options(source: &'src [u8], options: ParseOptions) -> Self {
        Self::from_lexer(Lexer::from_bytes(source), options)
    }

    fn from_lexer(mut lexer: Lexer<'src>, options: ParseOptions) -> Self {
        lexer.pin(options.version);
        Self {
            source: LexemeSource::new(lexer),
            options,
            state: State::NodeStart,
            scopes: Vec::new(),
            exhausted: false,
        }
    }

    /// The version of the document, once known.
    ///
    /// Stays `None` for documents that only use syntax both versions share.
    pub fn version(&self) -> Option<Version> {
        self.source.lexer.version()
    }

    /// Get the next event from the parser.
    pub fn next_event(&mut self) -> Event<'src> {
        loop {
            let event = match self.advance() {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(error) => {
                    debug!("Parse error: {}", error);
                    self.state = State::Failed(error.clone());
                    Event::ParseError(error)
                }
            };
            if event.is_commented() && !self.options.emit_comments {
                continue;
            }
            trace!("Event {:?}", event);
            return event;
        }
    }

    /// Parse all events into a vector, up to and including the terminal one.
    pub fn parse_to_vec(self) -> Vec<Event<'src>> {
        self.collect()
    }

    /// Advance the state machine; `None` means no event was produced yet.
    fn advance(&mut self) -> Result<Option<Event<'src>>, ParseError> {
        match &self.state {
            State::NodeStart => self.advance_node_start(),
            State::Entries { spaced } => {
                let spaced = *spaced;
                self.advance_entries(spaced)
            }
            State::AfterChildren => self.advance_after_children(),
            State::Finished => Ok(Some(Event::EndOfInput)),
            State::Failed(error) => Ok(Some(Event::ParseError(error.clone()))),
        }
    }

    fn advance_node_start(&mut self) -> Result<Option<Event<'src>>, ParseError> {
        match self.skip_line_space()? {
            Lexeme::Eof(_) => {
                if let Some(block) = self.scopes.last().and_then(|scope| scope.block) {
                    return Err(ParseError::new(ParseErrorKind::UnclosedBlock, block.span));
                }
                self.state = State::Finished;
                Ok(Some(Event::EndOfInput))
            }
            Lexeme::RBrace(span) => {
                let Some(scope) = self.scopes.last_mut().filter(|s| s.block.is_some()) else {
                    return Err(ParseError::new(ParseErrorKind::UnexpectedCloseBrace, span));
                };
                scope.block = None;
                self.state = State::AfterChildren;
                Ok(None)
            }
            Lexeme::SlashDash(_) => {
                let first = self.skip_line_space()?;
                self.start_node(first, true)
            }
            Lexeme::Semicolon(span) => Err(ParseError::new(ParseErrorKind::UnexpectedToken, span)),
            first => self.start_node(first, false),
        }
    }

    fn start_node(
        &mut self,
        first: Lexeme<'src>,
        slashdashed: bool,
    ) -> Result<Option<Event<'src>>, ParseError> {
        let start = first.span();
        let (annotation, lexeme) = match first {
            Lexeme::LParen(open) => {
                let annotation = self.type_annotation(open)?;
                (Some(annotation), self.skip_node_space()?)
            }
            other => (None, other),
        };

        let (name_span, name) = match lexeme {
            Lexeme::Identifier { span, text } => {
                self.check_name(span, text)?;
                (span, Cow::Borrowed(text))
            }
            Lexeme::String { span, value, .. } => (span, value),
            Lexeme::Error(error) => return Err(error),
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedNodeName,
                    other.span(),
                ));
            }
        };

        let span = start.to(name_span);
        let commented = slashdashed
            || self.scopes.last().is_some_and(|parent| {
                parent.commented || parent.block.is_some_and(|block| block.commented)
            });
        self.scopes.push(Scope {
            span,
            commented,
            has_children: false,
            block: None,
        });
        self.state = State::Entries { spaced: false };

        Ok(Some(Event::StartNode {
            span,
            name,
            annotation,
            commented,
        }))
    }

    fn advance_entries(&mut self, spaced: bool) -> Result<Option<Event<'src>>, ParseError> {
        let lexeme = self.source.next();
        match lexeme {
            Lexeme::Whitespace(_) | Lexeme::BlockComment { .. } => {
                self.state = State::Entries { spaced: true };
                Ok(None)
            }
            // The newline after it ends the node
            Lexeme::LineComment { .. } => Ok(None),
            Lexeme::Newline(_) | Lexeme::Semicolon(_) => self.end_node(),
            Lexeme::Eof(_) | Lexeme::RBrace(_) => {
                self.source.stash(lexeme);
                self.end_node()
            }
            Lexeme::LBrace(span) => self.open_block(span, false),
            Lexeme::SlashDash(span) => match self.skip_line_space()? {
                Lexeme::LBrace(span) => self.open_block(span, true),
                entry => {
                    if !spaced {
                        return Err(ParseError::new(ParseErrorKind::MissingWhitespace, span));
                    }
                    self.entry(entry, true)
                }
            },
            Lexeme::Error(error) => Err(error),
            entry => {
                if !spaced {
                    return Err(ParseError::new(
                        ParseErrorKind::MissingWhitespace,
                        entry.span(),
                    ));
                }
                self.entry(entry, false)
            }
        }
    }

    fn advance_after_children(&mut self) -> Result<Option<Event<'src>>, ParseError> {
        let lexeme = self.source.next();
        match lexeme {
            Lexeme::Whitespace(_) | Lexeme::BlockComment { .. } | Lexeme::LineComment { .. } => {
                Ok(None)
            }
            Lexeme::Newline(_) | Lexeme::Semicolon(_) => self.end_node(),
            Lexeme::Eof(_) | Lexeme::RBrace(_) => {
                self.source.stash(lexeme);
                self.end_node()
            }
            Lexeme::LBrace(span) => self.open_block(span, false),
            Lexeme::SlashDash(_) => match self.skip_line_space()? {
                Lexeme::LBrace(span) => self.open_block(span, true),
                other => Err(ParseError::new(
                    ParseErrorKind::EntryAfterChildren,
                    other.span(),
                )),
            },
            Lexeme::Error(error) => Err(error),
            other => Err(ParseError::new(
                ParseErrorKind::EntryAfterChildren,
                other.span(),
            )),
        }
    }

    /// Open a child block of the current node.
    fn open_block(
        &mut self,
        span: Span,
        commented: bool,
    ) -> Result<Option<Event<'src>>, ParseError> {
        let has_children = self.scopes.last().is_some_and(|scope| scope.has_children);
        if has_children && !commented {
            return Err(ParseError::new(ParseErrorKind::MultipleChildBlocks, span));
        }
        // KDL 1.0 has room for one block, slashdashed or not
        if matches!(self.state, State::AfterChildren) {
            if self.version() == Some(Version::V1) {
                return Err(ParseError::new(ParseErrorKind::MultipleChildBlocks, span));
            }
            self.source.lexer.require(Version::V2, span)?;
        }

        let Some(scope) = self.scopes.last_mut() else {
            return Err(ParseError::new(ParseErrorKind::UnexpectedToken, span));
        };
        scope.has_children |= !commented;
        scope.block = Some(Block { span, commented });
        self.state = State::NodeStart;
        Ok(None)
    }

    fn end_node(&mut self) -> Result<Option<Event<'src>>, ParseError> {
        self.state = State::NodeStart;
        Ok(self.scopes.pop().map(|scope| Event::EndNode {
            span: scope.span,
            commented: scope.commented,
        }))
    }

    /// Parse an argument or property of the current node.
    fn entry(
        &mut self,
        first: Lexeme<'src>,
        slashdashed: bool,
    ) -> Result<Option<Event<'src>>, ParseError> {
        let commented = slashdashed || self.scopes.last().is_some_and(|scope| scope.commented);
        match first {
            Lexeme::LParen(open) => {
                let annotation = self.type_annotation(open)?;
                let lexeme = self.skip_node_space()?;
                let (span, value) = self.value(lexeme)?;
                self.state = State::Entries { spaced: false };
                Ok(Some(Event::Argument {
                    span: open.to(span),
                    annotation: Some(annotation),
                    value,
                    commented,
                }))
            }
            Lexeme::Identifier { .. } | Lexeme::String { .. } => {
                self.argument_or_property(first, commented)
            }
            other => {
                let (span, value) = self.value(other)?;
                self.state = State::Entries { spaced: false };
                Ok(Some(Event::Argument {
                    span,
                    annotation: None,
                    value,
                    commented,
                }))
            }
        }
    }

    /// An identifier or string is a property key if `=` follows it.
    fn argument_or_property(
        &mut self,
        first: Lexeme<'src>,
        commented: bool,
    ) -> Result<Option<Event<'src>>, ParseError> {
        let mut spaced = false;
        let next = loop {
            let lexeme = self.source.next();
            if !lexeme.is_node_space() {
                break lexeme;
            }
            spaced = true;
        };

        if !matches!(next, Lexeme::Equals(_)) {
            self.source.stash(next);
            self.state = State::Entries { spaced };
            let (span, value) = self.value(first)?;
            return Ok(Some(Event::Argument {
                span,
                annotation: None,
                value,
                commented,
            }));
        }

        let (key_span, name) = match first {
            Lexeme::Identifier { span, text } => {
                self.check_name(span, text)?;
                (span, Cow::Borrowed(text))
            }
            Lexeme::String { span, value, .. } => (span, value),
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedToken,
                    other.span(),
                ));
            }
        };

        let (annotation, lexeme) = match self.skip_node_space()? {
            Lexeme::LParen(open) => {
                let annotation = self.type_annotation(open)?;
                (Some(annotation), self.skip_node_space()?)
            }
            other => (None, other),
        };
        let (value_span, value) = self.value(lexeme)?;
        self.state = State::Entries { spaced: false };

        Ok(Some(Event::Property {
            span: key_span.to(value_span),
            name,
            annotation,
            value,
            commented,
        }))
    }

    /// Read a value: string, number, keyword, or a bare identifier where allowed.
    fn value(&mut self, lexeme: Lexeme<'src>) -> Result<(Span, Value<'src>), ParseError> {
        match lexeme {
            Lexeme::String { span, value, .. } => Ok((span, Value::String(value))),
            Lexeme::Number { span, value } => Ok((span, Value::Number(value))),
            Lexeme::Keyword { span, value } => Ok((span, value)),
            Lexeme::Identifier { span, text } => self.bare_value(span, text),
            Lexeme::Error(error) => Err(error),
            other => Err(ParseError::new(ParseErrorKind::ExpectedValue, other.span())),
        }
    }

    /// KDL 1.0 reads bare `true`, `false` and `null` as values; KDL 2.0
    /// reads any other bare identifier as a string.
    fn bare_value(
        &mut self,
        span: Span,
        text: &'src str,
    ) -> Result<(Span, Value<'src>), ParseError> {
        if let Some(value) = keyword_value(text).filter(|_| V1_KEYWORDS.contains(&text)) {
            if self.version() == Some(Version::V2) {
                return Err(ParseError::new(ParseErrorKind::BareKeyword, span));
            }
            self.source.lexer.require(Version::V1, span)?;
            return Ok((span, value));
        }
        if RESERVED_IDENTIFIERS.contains(&text) {
            return Err(ParseError::new(ParseErrorKind::BareKeyword, span));
        }
        self.source.lexer.require(Version::V2, span)?;
        Ok((span, Value::String(Cow::Borrowed(text))))
    }

    /// Check a bare identifier used as a node name, property key, or type.
    fn check_name(&mut self, span: Span, text: &str) -> Result<(), ParseError> {
        if V1_KEYWORDS.contains(&text) {
            return Err(ParseError::new(ParseErrorKind::BareKeyword, span));
        }
        // `inf`, `-inf` and `nan` are ordinary identifiers in KDL 1.0
        if RESERVED_IDENTIFIERS.contains(&text) {
            if self.version() == Some(Version::V2) {
                return Err(ParseError::new(ParseErrorKind::BareKeyword, span));
            }
            self.source.lexer.require(Version::V1, span)?;
        }
        Ok(())
    }

    /// Read the rest of a type annotation after its `(`.
    fn type_annotation(&mut self, open: Span) -> Result<Cow<'src, str>, ParseError> {
        let name = match self.skip_node_space()? {
            Lexeme::Identifier { span, text } => {
                self.check_name(span, text)?;
                Cow::Borrowed(text)
            }
            Lexeme::String { value, .. } => value,
            Lexeme::Number { span, .. } => {
                return Err(ParseError::new(ParseErrorKind::NumericTypeAnnotation, span));
            }
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedTypeName,
                    other.span(),
                ));
            }
        };
        match self.skip_node_space()? {
            Lexeme::RParen(_) => Ok(name),
            _ => Err(ParseError::new(ParseErrorKind::UnclosedTypeAnnotation, open)),
        }
    }

    /// Next lexeme that isn't whitespace or a block comment.
    fn skip_node_space(&mut self) -> Result<Lexeme<'src>, ParseError> {
        loop {
            match self.source.next() {
                lexeme if lexeme.is_node_space() => continue,
                Lexeme::Error(error) => return Err(error),
                lexeme => return Ok(lexeme),
            }
        }
    }

    /// Next lexeme that isn't whitespace, a newline, or a comment.
    fn skip_line_space(&mut self) -> Result<Lexeme<'src>, ParseError> {
        loop {
            match self.source.next() {
                Lexeme::Whitespace(_)
                | Lexeme::Newline(_)
                | Lexeme::LineComment { .. }
                | Lexeme::BlockComment { .. } => continue,
                Lexeme::Error(error) => return Err(error),
                lexeme => return Ok(lexeme),
            }
        }
    }
}

impl<'src> Iterator for Parser<'src> {
    type Item = Event<'src>;

    /// Yields events up to and including the terminal one, then `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let event = self.next_event();
        self.exhausted = event.is_terminal();
        Some(event)
    }
}

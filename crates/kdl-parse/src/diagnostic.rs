//! Parse errors and their rendering.

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::{ParseErrorKind, Span};

/// A parser error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Source location.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename);
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
    ) -> ariadne::ReportBuilder<'static, (&'a str, std::ops::Range<usize>)> {
        let range: std::ops::Range<usize> = self.span.into();
        let report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((filename, range))
                    .with_message(self.kind.label())
                    .with_color(Color::Red),
            );
        match self.kind.help() {
            Some(help) => report.with_help(help),
            None => report,
        }
    }
}

impl ParseErrorKind {
    /// Short text for the label under the offending source.
    fn label(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidEncoding => "invalid UTF-8 starts here",
            ParseErrorKind::DisallowedCharacter(_) => "not allowed here",
            ParseErrorKind::UnterminatedString | ParseErrorKind::UnterminatedRawString => {
                "string starts here"
            }
            ParseErrorKind::UnterminatedBlockComment => "comment starts here",
            ParseErrorKind::InvalidLineContinuation => "continuation starts here",
            ParseErrorKind::InvalidEscape(_) => "invalid escape",
            ParseErrorKind::NewlineInString => "newline inside the string",
            ParseErrorKind::InvalidMultilineString => "in this string",
            ParseErrorKind::InvalidNumber => "not a number",
            ParseErrorKind::InvalidKeyword => "unknown keyword",
            ParseErrorKind::AmbiguousIdentifier => "looks like a number",
            ParseErrorKind::UnexpectedToken => "unexpected",
            ParseErrorKind::ExpectedNodeName => "expected a node name here",
            ParseErrorKind::ExpectedValue => "expected a value here",
            ParseErrorKind::BareKeyword => "reserved word",
            ParseErrorKind::NumericTypeAnnotation => "number used as a type",
            ParseErrorKind::ExpectedTypeName => "expected a type name here",
            ParseErrorKind::UnclosedTypeAnnotation => "annotation opened here",
            ParseErrorKind::MissingWhitespace => "add whitespace before this",
            ParseErrorKind::UnclosedBlock => "block opened here",
            ParseErrorKind::UnexpectedCloseBrace => "nothing to close",
            ParseErrorKind::MultipleChildBlocks => "second child block",
            ParseErrorKind::EntryAfterChildren => "after the child block",
            ParseErrorKind::VersionMismatch { .. } | ParseErrorKind::MixedVersions { .. } => {
                "from the other version"
            }
        }
    }

    fn help(&self) -> Option<&'static str> {
        Some(match self {
            ParseErrorKind::UnterminatedString => "add a closing '\"'",
            ParseErrorKind::UnterminatedRawString => {
                "close the string with a quote followed by as many '#' as it opened with"
            }
            ParseErrorKind::UnterminatedBlockComment => "add a closing '*/'",
            ParseErrorKind::InvalidLineContinuation => {
                "only whitespace or a comment may follow '\\' on the same line"
            }
            ParseErrorKind::InvalidEscape(_) => {
                "valid escapes are: \\n, \\r, \\t, \\\\, \\\", \\b, \\f, \\s, \\u{X...}"
            }
            ParseErrorKind::NewlineInString => "use \\n, or a \"\"\" multi-line string",
            ParseErrorKind::InvalidMultilineString => {
                "the text must start on a new line, and every line must start with the indentation of the closing line"
            }
            ParseErrorKind::AmbiguousIdentifier => "quote it, or add a leading zero for a number",
            ParseErrorKind::BareKeyword => "quote it to use it as a string, or prefix it with '#'",
            ParseErrorKind::NumericTypeAnnotation => "quote the type name",
            ParseErrorKind::UnclosedTypeAnnotation => "add a closing ')'",
            ParseErrorKind::MissingWhitespace => {
                "arguments and properties must be separated by whitespace"
            }
            ParseErrorKind::UnclosedBlock => "add a closing '}'",
            ParseErrorKind::MultipleChildBlocks => {
                "a node has at most one child block; comment out the others with '/-'"
            }
            ParseErrorKind::EntryAfterChildren => {
                "arguments and properties must come before the child block"
            }
            ParseErrorKind::VersionMismatch { .. } | ParseErrorKind::MixedVersions { .. } => {
                "KDL v1 and KDL v2 syntax can't be mixed in one document"
            }
            _ => return None,
        })
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::InvalidEncoding => write!(f, "invalid UTF-8"),
            ParseErrorKind::DisallowedCharacter(c) => {
                write!(f, "disallowed character U+{:04X}", *c as u32)
            }
            ParseErrorKind::UnterminatedString => write!(f, "unterminated string"),
            ParseErrorKind::UnterminatedRawString => write!(f, "unterminated raw string"),
            ParseErrorKind::UnterminatedBlockComment => write!(f, "unterminated block comment"),
            ParseErrorKind::InvalidLineContinuation => write!(f, "invalid line continuation"),
            ParseErrorKind::InvalidEscape(seq) => write!(f, "invalid escape sequence '{}'", seq),
            ParseErrorKind::NewlineInString => write!(f, "newline in single-line string"),
            ParseErrorKind::InvalidMultilineString => write!(f, "malformed multi-line string"),
            ParseErrorKind::InvalidNumber => write!(f, "invalid number"),
            ParseErrorKind::InvalidKeyword => write!(f, "invalid keyword"),
            ParseErrorKind::AmbiguousIdentifier => write!(f, "ambiguous identifier"),
            ParseErrorKind::UnexpectedToken => write!(f, "unexpected token"),
            ParseErrorKind::ExpectedNodeName => write!(f, "expected node name"),
            ParseErrorKind::ExpectedValue => write!(f, "expected value"),
            ParseErrorKind::BareKeyword => write!(f, "keyword used as an identifier"),
            ParseErrorKind::NumericTypeAnnotation => write!(f, "type annotation is a number"),
            ParseErrorKind::ExpectedTypeName => write!(f, "expected type name"),
            ParseErrorKind::UnclosedTypeAnnotation => write!(f, "unclosed type annotation"),
            ParseErrorKind::MissingWhitespace => write!(f, "missing whitespace"),
            ParseErrorKind::UnclosedBlock => write!(f, "unclosed child block"),
            ParseErrorKind::UnexpectedCloseBrace => write!(f, "unexpected '}}'"),
            ParseErrorKind::MultipleChildBlocks => write!(f, "node has more than one child block"),
            ParseErrorKind::EntryAfterChildren => write!(f, "entry after child block"),
            ParseErrorKind::VersionMismatch { required } => {
                write!(f, "{} syntax while parsing {}", required, required.other())
            }
            ParseErrorKind::MixedVersions { detected } => write!(
                f,
                "{} syntax in a document detected as {}",
                detected.other(),
                detected
            ),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.span.start)
    }
}

impl std::error::Error for ParseError {}

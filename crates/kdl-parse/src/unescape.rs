//! String body decoding: escape sequences and multi-line dedent.

use std::borrow::Cow;

use kdl_tokenizer::{is_newline, is_whitespace};

/// A decoded string body, plus where it used version-specific syntax.
///
/// All offsets are byte offsets into the body that was decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    /// First `\/` escape, which only KDL 1.0 has.
    pub v1_at: Option<usize>,
    /// First `\s` or whitespace escape, which only KDL 2.0 has.
    pub v2_at: Option<usize>,
    /// First unescaped newline in a single-line string.
    pub newline_at: Option<usize>,
}

/// An escape sequence that means nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeError {
    pub offset: usize,
    pub sequence: String,
}

impl EscapeError {
    fn new(body: &str, start: usize, end: usize) -> Self {
        Self {
            offset: start,
            sequence: body[start..end].to_string(),
        }
    }
}

/// Resolve the escape sequences in a string body.
///
/// The body is borrowed unchanged when it holds no escapes.
pub fn unescape(body: &str, single_line: bool) -> Result<Decoded<'_>, EscapeError> {
    let Some(first) = body.find('\\') else {
        return Ok(Decoded {
            text: Cow::Borrowed(body),
            v1_at: None,
            v2_at: None,
            newline_at: body.find(is_newline).filter(|_| single_line),
        });
    };

    let mut decoded = Decoded {
        text: Cow::Borrowed(""),
        v1_at: None,
        v2_at: None,
        newline_at: body[..first].find(is_newline).filter(|_| single_line),
    };
    let mut out = String::with_capacity(body.len());
    out.push_str(&body[..first]);

    let mut pos = first;
    while let Some(c) = body[pos..].chars().next() {
        if c != '\\' {
            if single_line && is_newline(c) {
                decoded.newline_at.get_or_insert(pos);
            }
            out.push(c);
            pos += c.len_utf8();
            continue;
        }

        let at = pos;
        pos += 1;
        let Some(escape) = body[pos..].chars().next() else {
            return Err(EscapeError::new(body, at, pos));
        };
        pos += escape.len_utf8();

        match escape {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{C}'),
            '/' => {
                decoded.v1_at.get_or_insert(at);
                out.push('/');
            }
            's' => {
                decoded.v2_at.get_or_insert(at);
                out.push(' ');
            }
            'u' => {
                let Some((ch, len)) = unicode_escape(&body[pos..]) else {
                    let end = body[pos..]
                        .find('}')
                        .filter(|&i| i <= 8)
                        .map_or(pos, |i| pos + i + 1);
                    return Err(EscapeError::new(body, at, end));
                };
                out.push(ch);
                pos += len;
            }
            c if is_whitespace(c) || is_newline(c) => {
                decoded.v2_at.get_or_insert(at);
                let tail = &body[pos..];
                pos += tail
                    .find(|c: char| !is_whitespace(c) && !is_newline(c))
                    .unwrap_or(tail.len());
            }
            _ => return Err(EscapeError::new(body, at, pos)),
        }
    }

    decoded.text = Cow::Owned(out);
    Ok(decoded)
}

/// Decode `{XXXX}` following a `\u`; returns the character and bytes consumed.
fn unicode_escape(tail: &str) -> Option<(char, usize)> {
    let inner = tail.strip_prefix('{')?;
    let close = inner.find('}')?;
    let hex = &inner[..close];
    if hex.is_empty() || hex.len() > 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let code = u32::from_str_radix(hex, 16).ok()?;
    Some((char::from_u32(code)?, close + 2))
}

/// Strip the shared indentation of a multi-line string body.
///
/// The body must start with a newline and end with a line of whitespace,
/// which sets the indentation every other non-blank line has to start with.
/// Returns `None` when the body doesn't have that shape.
pub fn dedent(body: &str) -> Option<String> {
    let lines = split_lines(body);
    let (first, rest) = lines.split_first()?;
    let (last, content) = rest.split_last()?;
    if !first.is_empty() || !last.chars().all(is_whitespace) {
        return None;
    }

    let mut out = Vec::with_capacity(content.len());
    for line in content {
        if line.chars().all(is_whitespace) {
            out.push("");
        } else {
            out.push(line.strip_prefix(last)?);
        }
    }
    Some(out.join("\n"))
}

/// Split on any newline, with `\r\n` counting as one.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_newline(c) {
            lines.push(&text[start..i]);
            start = i + c.len_utf8();
            if c == '\r' && chars.peek().is_some_and(|&(_, next)| next == '\n') {
                chars.next();
                start += 1;
            }
        }
    }
    lines.push(&text[start..]);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_plain_body_is_borrowed() {
        let decoded = unescape("garçon", true).unwrap();
        assert!(matches!(decoded.text, Cow::Borrowed("garçon")));
        assert_eq!(decoded.v1_at, None);
        assert_eq!(decoded.v2_at, None);
    }

    #[test]
    fn test_simple_escapes() {
        let decoded = unescape(r#"a\n\t\"\\b"#, true).unwrap();
        assert_eq!(decoded.text, "a\n\t\"\\b");
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(unescape(r"gar\u{e7}on", true).unwrap().text, "garçon");
        assert_eq!(unescape(r"\u{1F600}", true).unwrap().text, "\u{1F600}");
    }

    #[test]
    fn test_bad_unicode_escapes() {
        assert_eq!(
            unescape(r"x\u{D800}", true).unwrap_err(),
            EscapeError {
                offset: 1,
                sequence: r"\u{D800}".to_string()
            }
        );
        assert_eq!(unescape(r"\u{1234567}", true).unwrap_err().offset, 0);
        assert_eq!(unescape(r"\uç", true).unwrap_err().sequence, r"\u");
    }

    #[test]
    fn test_unknown_escape() {
        assert_eq!(
            unescape(r"ab\q", true).unwrap_err(),
            EscapeError {
                offset: 2,
                sequence: r"\q".to_string()
            }
        );
    }

    #[test]
    fn test_version_markers() {
        let decoded = unescape(r"a\/b", true).unwrap();
        assert_eq!(decoded.text, "a/b");
        assert_eq!(decoded.v1_at, Some(1));

        let decoded = unescape(r"a\sb", true).unwrap();
        assert_eq!(decoded.text, "a b");
        assert_eq!(decoded.v2_at, Some(1));
    }

    #[test]
    fn test_whitespace_escape_joins_lines() {
        let decoded = unescape("one \\\n    two", true).unwrap();
        assert_eq!(decoded.text, "one two");
        assert_eq!(decoded.v2_at, Some(4));
        assert_eq!(decoded.newline_at, None);
    }

    #[test]
    fn test_literal_newline_is_recorded() {
        assert_eq!(unescape("a\nb", true).unwrap().newline_at, Some(1));
        assert_eq!(unescape("a\\tb\nc", true).unwrap().newline_at, Some(4));
        assert_eq!(unescape("a\nb", false).unwrap().newline_at, None);
    }

    #[test]
    fn test_dedent() {
        assert_eq!(
            dedent("\n    hello\n      world\n\n    ").as_deref(),
            Some("hello\n  world\n")
        );
        assert_eq!(dedent("\r\n  a\r\n  ").as_deref(), Some("a"));
        assert_eq!(dedent("\n").as_deref(), Some(""));
    }

    #[test]
    fn test_dedent_rejects_bad_shapes() {
        // Text on the opening line
        assert_eq!(dedent("hello\n"), None);
        // Text on the closing line
        assert_eq!(dedent("\n  hello\n  x"), None);
        // Line indented less than the closing line
        assert_eq!(dedent("\n  a\n b\n  "), None);
        // No newline at all
        assert_eq!(dedent(""), None);
    }
}

//! Numeric literal decoding.

use std::borrow::Cow;

use crate::Number;

/// Decode the text of a number token.
///
/// Returns `None` if the text is not a well-formed number.
pub fn parse_number(text: &str) -> Option<Number<'_>> {
    let (sign, unsigned) = match text.as_bytes().first()? {
        b'+' => ("+", &text[1..]),
        b'-' => ("-", &text[1..]),
        _ => ("", text),
    };

    let radix = match unsigned.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &unsigned[2..];
        if !digits_ok(digits, radix) {
            return None;
        }
        let cleaned = format!("{sign}{}", digits.replace('_', ""));
        return Some(match i64::from_str_radix(&cleaned, radix) {
            Ok(n) => Number::Integer(n),
            Err(_) => Number::Literal(strip_separators(text)),
        });
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let (integer, fraction) = match mantissa.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (mantissa, None),
    };

    if !digits_ok(integer, 10) {
        return None;
    }
    if fraction.is_some_and(|f| !digits_ok(f, 10)) {
        return None;
    }
    if let Some(exponent) = exponent {
        let exponent = exponent
            .strip_prefix(['+', '-'])
            .unwrap_or(exponent);
        if !digits_ok(exponent, 10) {
            return None;
        }
    }

    let cleaned = strip_separators(text);
    if fraction.is_none() && exponent.is_none() {
        return Some(match cleaned.parse::<i64>() {
            Ok(n) => Number::Integer(n),
            Err(_) => Number::Literal(cleaned),
        });
    }
    cleaned.parse::<f64>().ok().map(Number::Float)
}

/// A digit first, then digits or `_` separators.
fn digits_ok(digits: &str, radix: u32) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(c) if c.is_digit(radix) => chars.all(|c| c == '_' || c.is_digit(radix)),
        _ => false,
    }
}

fn strip_separators(text: &str) -> Cow<'_, str> {
    if text.contains('_') {
        Cow::Owned(text.replace('_', ""))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_integers() {
        assert_eq!(parse_number("0"), Some(Number::Integer(0)));
        assert_eq!(parse_number("-42"), Some(Number::Integer(-42)));
        assert_eq!(parse_number("+7"), Some(Number::Integer(7)));
        assert_eq!(parse_number("1_000_000"), Some(Number::Integer(1_000_000)));
    }

    #[test]
    fn test_radix_integers() {
        assert_eq!(parse_number("0x123"), Some(Number::Integer(0x123)));
        assert_eq!(parse_number("0xdead_BEEF"), Some(Number::Integer(0xdead_beef)));
        assert_eq!(parse_number("-0o17"), Some(Number::Integer(-0o17)));
        assert_eq!(parse_number("0b1010"), Some(Number::Integer(10)));
    }

    #[test]
    fn test_floats() {
        assert_eq!(parse_number("1.5"), Some(Number::Float(1.5)));
        assert_eq!(parse_number("-1.5e3"), Some(Number::Float(-1500.0)));
        assert_eq!(parse_number("1E-2"), Some(Number::Float(0.01)));
        assert_eq!(parse_number("1_0.0_1"), Some(Number::Float(10.01)));
    }

    #[test]
    fn test_out_of_range_integers_keep_their_text() {
        assert_eq!(
            parse_number("99_999_999_999_999_999_999"),
            Some(Number::Literal("99999999999999999999".into()))
        );
        assert_eq!(
            parse_number("0xffff_ffff_ffff_ffff_ff"),
            Some(Number::Literal("0xffffffffffffffffff".into()))
        );
    }

    #[test]
    fn test_malformed() {
        for text in [
            "1abc", "0x", "0xg", "0b2", "1.", ".5", "1._5", "1e", "1e+", "_1", "0x_1", "1.2.3",
            "--1",
        ] {
            assert_eq!(parse_number(text), None, "{text}");
        }
    }
}

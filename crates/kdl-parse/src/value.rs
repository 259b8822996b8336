//! Decoded KDL values.

use std::borrow::Cow;
use std::fmt;

/// A decoded number.
#[derive(Debug, Clone, PartialEq)]
pub enum Number<'src> {
    /// An integer that fits in an `i64`, whatever radix it was written in.
    Integer(i64),
    /// A decimal number with a fraction or exponent, or one of `#inf`,
    /// `#-inf`, and `#nan`.
    Float(f64),
    /// A well-formed number that doesn't fit either representation, with
    /// digit separators removed.
    Literal(Cow<'src, str>),
}

impl Number<'_> {
    /// Detach the number from the input buffer.
    pub fn into_owned(self) -> Number<'static> {
        match self {
            Number::Integer(n) => Number::Integer(n),
            Number::Float(n) => Number::Float(n),
            Number::Literal(text) => Number::Literal(Cow::Owned(text.into_owned())),
        }
    }
}

impl fmt::Display for Number<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{n}"),
            Number::Float(n) if n.is_nan() => write!(f, "#nan"),
            Number::Float(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "#inf" } else { "#-inf" })
            }
            Number::Float(n) => write!(f, "{n:?}"),
            Number::Literal(text) => write!(f, "{text}"),
        }
    }
}

/// The value of an argument or property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'src> {
    /// `#null` (or bare `null` in KDL 1.0)
    Null,
    /// `#true`/`#false` (or bare `true`/`false` in KDL 1.0)
    Bool(bool),
    /// Any kind of string, with escapes resolved.
    String(Cow<'src, str>),
    /// A number.
    Number(Number<'src>),
}

impl<'src> Value<'src> {
    /// Returns the string content if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number as a float if this is any decimal-representable number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(Number::Float(n)) => Some(*n),
            Value::Number(Number::Integer(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Detach the value from the input buffer.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Number(n) => Value::Number(n.into_owned()),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "#null"),
            Value::Bool(b) => write!(f, "#{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "#null");
        assert_eq!(Value::Bool(false).to_string(), "#false");
        assert_eq!(Value::String("a\"b".into()).to_string(), r#""a\"b""#);
        assert_eq!(Value::Number(Number::Integer(-3)).to_string(), "-3");
        assert_eq!(Value::Number(Number::Float(1.0)).to_string(), "1.0");
        assert_eq!(
            Value::Number(Number::Float(f64::NEG_INFINITY)).to_string(),
            "#-inf"
        );
        assert_eq!(Value::Number(Number::Float(f64::NAN)).to_string(), "#nan");
    }

    #[test]
    fn test_accessors() {
        let value = Value::Number(Number::Integer(291));
        assert_eq!(value.as_i64(), Some(291));
        assert_eq!(value.as_f64(), Some(291.0));
        assert_eq!(value.as_str(), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
    }
}

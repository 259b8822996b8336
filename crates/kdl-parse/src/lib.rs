#![doc = include_str!("../README.md")]

pub use kdl_tokenizer::{Span, Token, TokenKind, Tokenizer, Version};

mod diagnostic;
pub use diagnostic::ParseError;

mod event;
pub use event::{Event, EventKind, ParseErrorKind};

mod value;
pub use value::{Number, Value};

mod options;
pub use options::ParseOptions;

mod number;
pub use number::parse_number;

mod unescape;

mod lexer;
pub use lexer::{Lexeme, Lexer, RESERVED_IDENTIFIERS, StringKind, V1_KEYWORDS};

mod parser;
pub use parser::Parser;

//! A tokenizer for KDL documents

mod span;
pub use span::Span;

mod scanner;
pub use scanner::Scanner;

mod token;
pub use token::{Token, TokenError, TokenKind};

mod tokenizer;
pub use tokenizer::{Tokenizer, is_disallowed, is_identifier_char, is_newline, is_whitespace};

mod version;
pub use version::Version;

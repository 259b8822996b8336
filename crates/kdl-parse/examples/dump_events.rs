use std::io::Read;

use kdl_parse::{Event, Lexer, ParseOptions, Parser, Version};

/// Reads a document from stdin and prints its lexemes and events.
///
/// Flags: `--v1` or `--v2` to pin the version, `--comments` to show
/// slashdashed input.
fn main() {
    let mut options = ParseOptions::new();
    for arg in std::env::args().skip(1) {
        options = match arg.as_str() {
            "--v1" => options.version(Version::V1),
            "--v2" => options.version(Version::V2),
            "--comments" => options.emit_comments(true),
            other => {
                eprintln!("unknown flag {other}");
                std::process::exit(2);
            }
        };
    }

    let mut source = Vec::new();
    std::io::stdin().read_to_end(&mut source).unwrap();

    println!("=== Lexemes ===");
    let mut lexer = Lexer::from_bytes(&source);
    lexer.pin(options.version);
    for lexeme in lexer {
        println!("{:?}", lexeme);
    }

    println!("\n=== Events ===");
    let text = String::from_utf8_lossy(&source);
    let mut parser = Parser::from_bytes_with_options(&source, options);
    for event in parser.by_ref() {
        match &event {
            Event::ParseError(error) => eprint!("{}", error.render("<stdin>", &text)),
            _ => println!("{:?}", event),
        }
    }
    println!("\nversion: {:?}", parser.version());
}

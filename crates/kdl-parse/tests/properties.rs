use kdl_parse::{Event, Number, ParseOptions, Parser, RESERVED_IDENTIFIERS, Value};
use proptest::prelude::*;

/// A node name both versions accept as a bare identifier.
fn identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,8}")
        .unwrap()
        .prop_filter("reserved", |s| !RESERVED_IDENTIFIERS.contains(&s.as_str()))
}

/// An argument both versions accept, with the value it decodes to.
fn argument() -> impl Strategy<Value = (String, Value<'static>)> {
    prop_oneof![
        any::<i32>().prop_map(|n| (n.to_string(), Value::Number(Number::Integer(n.into())))),
        prop::string::string_regex("[a-zA-Z0-9 _-]{0,12}")
            .unwrap()
            .prop_map(|s| (format!("\"{s}\""), Value::String(s.into()))),
    ]
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    args: Vec<(String, Value<'static>)>,
    children: Vec<String>,
}

fn node() -> impl Strategy<Value = Node> {
    (
        identifier(),
        prop::collection::vec(argument(), 0..4),
        prop::collection::vec(identifier(), 0..3),
    )
        .prop_map(|(name, args, children)| Node {
            name,
            args,
            children,
        })
}

fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&node.name);
        for (text, _) in &node.args {
            out.push(' ');
            out.push_str(text);
        }
        if !node.children.is_empty() {
            out.push_str(" {\n");
            for child in &node.children {
                out.push_str("    ");
                out.push_str(child);
                out.push('\n');
            }
            out.push('}');
        }
        out.push('\n');
    }
    out
}

/// Every stream ends with exactly one terminal event and never closes more
/// nodes than it opened.
fn check_stream(events: &[Event<'_>]) -> Result<(), TestCaseError> {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    prop_assert_eq!(terminals, 1);
    prop_assert!(events.last().is_some_and(Event::is_terminal));

    let mut depth = 0usize;
    for event in events {
        match event {
            Event::StartNode { .. } => depth += 1,
            Event::EndNode { .. } => {
                prop_assert!(depth > 0, "EndNode without StartNode");
                depth -= 1;
            }
            _ => {}
        }
    }
    if events.last() == Some(&Event::EndOfInput) {
        prop_assert_eq!(depth, 0);
    }
    Ok(())
}

proptest! {
    #[test]
    fn arbitrary_text_gives_a_well_formed_stream(source in "\\PC{0,64}") {
        check_stream(&Parser::new(&source).parse_to_vec())?;
    }

    #[test]
    fn kdl_like_text_gives_a_well_formed_stream(
        source in r##"[a-z0-9 {}();="#\\/\-*\n]{0,48}"##
    ) {
        check_stream(&Parser::new(&source).parse_to_vec())?;
    }

    #[test]
    fn arbitrary_bytes_give_a_well_formed_stream(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        check_stream(&Parser::from_bytes(&bytes).parse_to_vec())?;
    }

    /// Emitting comments only adds commented events; the rest is unchanged.
    #[test]
    fn emitting_comments_only_adds_commented_events(
        source in r#"[a-z0-9 {}/\-;"\n]{0,48}"#
    ) {
        let plain = Parser::new(&source).parse_to_vec();
        let emitted: Vec<_> = Parser::with_options(&source, ParseOptions::new().emit_comments(true))
            .parse_to_vec()
            .into_iter()
            .filter(|e| !e.is_commented())
            .collect();
        prop_assert_eq!(plain, emitted);
    }

    #[test]
    fn generated_documents_parse(nodes in prop::collection::vec(node(), 0..6)) {
        let source = render(&nodes);
        let mut parser = Parser::new(&source);
        let events: Vec<_> = parser.by_ref().collect();
        prop_assert_eq!(events.last(), Some(&Event::EndOfInput), "{}", source);
        prop_assert_eq!(parser.version(), None);

        let mut expected = Vec::new();
        for node in &nodes {
            expected.push(format!("start {}", node.name));
            for (_, value) in &node.args {
                expected.push(format!("arg {value}"));
            }
            for child in &node.children {
                expected.push(format!("start {child}"));
                expected.push("end".to_string());
            }
            expected.push("end".to_string());
        }
        let actual: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::StartNode { name, .. } => Some(format!("start {name}")),
                Event::Argument { value, .. } => Some(format!("arg {value}")),
                Event::EndNode { .. } => Some("end".to_string()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(actual, expected);
    }
}

//! Integration tests for the tinymark block and inline parsers

use pretty_assertions::assert_eq;
use rstest::rstest;
use tinymark_core::ast::{CodeBlock, Heading, Image, Link, List};
use tinymark_core::{parse, Arena, Node, ParseErrorKind, Parser, Span};

fn kinds(nodes: &[Node]) -> Vec<&'static str> {
    nodes.iter().map(Node::kind_name).collect()
}

/// Concatenated text of all Text descendants.
fn text_content(node: &Node) -> String {
    match node {
        Node::Text(t) => t.value.to_string(),
        other => other.children().iter().map(text_content).collect(),
    }
}

fn parse_err(input: &str) -> tinymark_core::ParseError {
    let arena = Arena::new();
    parse(&arena, input.as_bytes()).unwrap_err()
}

// ============================================================================
// Document Tests
// ============================================================================

#[rstest]
#[case::empty("")]
#[case::blank_lines("\n\n\n")]
#[case::whitespace_lines("   \n\t\n")]
fn test_empty_documents(#[case] input: &str) {
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    assert!(matches!(doc, Node::Document(_)));
    assert!(doc.children().is_empty());
}

#[test]
fn test_block_sequence() {
    let input = "# Title\n\nSome text.\n\n> quoted\n\n- item\n\n```\ncode\n```\n\n---\n";
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    assert_eq!(
        kinds(doc.children()),
        vec!["heading", "paragraph", "blockquote", "list", "code_block", "horizontal_rule"]
    );
}

#[test]
fn test_parser_struct_matches_parse_fn() {
    let arena = Arena::new();
    let input = b"# A\n\n*b*";
    let via_fn = parse(&arena, input).unwrap();
    let via_struct = Parser::new(&arena).parse(input).unwrap();
    assert_eq!(via_fn, via_struct);
}

// ============================================================================
// Heading Tests
// ============================================================================

#[rstest]
#[case("# One", 1)]
#[case("## Two", 2)]
#[case("### Three", 3)]
#[case("#### Four", 4)]
#[case("##### Five", 5)]
#[case("###### Six", 6)]
fn test_heading_levels(#[case] input: &str, #[case] level: u8) {
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    match doc.children()[0] {
        Node::Heading(Heading { level: got, .. }) => assert_eq!(got, level),
        other => panic!("expected heading, got {:?}", other),
    }
}

#[test]
fn test_heading_skips_extra_spaces() {
    let arena = Arena::new();
    let doc = parse(&arena, b"#    Spaced out").unwrap();
    assert_eq!(text_content(&doc.children()[0]), "Spaced out");
}

#[test]
fn test_heading_inline_content() {
    let arena = Arena::new();
    let doc = parse(&arena, b"## A **bold** move").unwrap();
    let heading = doc.children()[0];
    assert_eq!(kinds(heading.children()), vec!["text", "bold", "text"]);
}

#[rstest]
#[case::seven_hashes("####### Too many")]
#[case::no_space("#NoSpace")]
#[case::bare_hash("#")]
fn test_invalid_headings(#[case] input: &str) {
    assert_eq!(parse_err(input).kind, ParseErrorKind::InvalidSyntax);
}

#[test]
fn test_heading_error_span_covers_marker() {
    let err = parse_err("####### Too many");
    assert_eq!(err.span, Some(Span::new(0, 7)));
}

// ============================================================================
// Paragraph Tests
// ============================================================================

#[test]
fn test_paragraph_joins_lines() {
    let arena = Arena::new();
    let doc = parse(&arena, b"line one\nline two\n\nnext").unwrap();
    assert_eq!(kinds(doc.children()), vec!["paragraph", "paragraph"]);
    assert_eq!(text_content(&doc.children()[0]), "line one\nline two");
    assert_eq!(text_content(&doc.children()[1]), "next");
}

#[test]
fn test_paragraph_at_end_keeps_trailing_newline() {
    let arena = Arena::new();
    let doc = parse(&arena, b"Hello\n").unwrap();
    assert_eq!(text_content(&doc.children()[0]), "Hello\n");
}

#[test]
fn test_crlf_line_endings() {
    let arena = Arena::new();
    let doc = parse(&arena, b"# A\r\n\r\nb").unwrap();
    assert_eq!(kinds(doc.children()), vec!["heading", "paragraph"]);
    assert_eq!(text_content(&doc.children()[0]), "A");
}

// ============================================================================
// Blockquote Tests
// ============================================================================

#[test]
fn test_blockquote_contains_blocks() {
    let arena = Arena::new();
    let doc = parse(&arena, b"> # Title\n> body").unwrap();
    let quote = doc.children()[0];
    assert_eq!(quote.kind_name(), "blockquote");
    assert_eq!(kinds(quote.children()), vec!["heading", "paragraph"]);
    assert_eq!(text_content(&quote.children()[1]), "body\n");
}

#[test]
fn test_nested_blockquote() {
    let arena = Arena::new();
    let doc = parse(&arena, b"> outer\n>\n> > inner").unwrap();
    let quote = doc.children()[0];
    assert_eq!(kinds(quote.children()), vec!["paragraph", "blockquote"]);
    let inner = quote.children()[1];
    assert_eq!(text_content(&inner), "inner\n");
}

#[test]
fn test_blockquote_ends_at_blank_line() {
    let arena = Arena::new();
    let doc = parse(&arena, b"> quoted\n\nafter").unwrap();
    assert_eq!(kinds(doc.children()), vec!["blockquote", "paragraph"]);
}

#[test]
fn test_blockquote_nesting_limit() {
    let input = format!("{}deep", ">".repeat(100));
    assert_eq!(parse_err(&input).kind, ParseErrorKind::InvalidSyntax);
}

// ============================================================================
// Code Block Tests
// ============================================================================

#[test]
fn test_fenced_code_with_language() {
    let arena = Arena::new();
    let doc = parse(&arena, b"```rust\nfn main() {}\n```").unwrap();
    match doc.children()[0] {
        Node::CodeBlock(CodeBlock { language, value }) => {
            assert_eq!(language.map(|l| l.to_string()), Some("rust".to_string()));
            assert_eq!(value, "fn main() {}");
        }
        other => panic!("expected code block, got {:?}", other),
    }
}

#[rstest]
#[case::backticks("```\n*not emphasis*\n[x]\n```", "*not emphasis*\n[x]")]
#[case::tildes("~~~\na\n\nb\n~~~", "a\n\nb")]
#[case::longer_close("```\ncode\n`````", "code")]
#[case::empty("```\n```", "")]
fn test_fenced_code_content_is_verbatim(#[case] input: &str, #[case] expected: &str) {
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    match doc.children()[0] {
        Node::CodeBlock(CodeBlock { language, value }) => {
            assert_eq!(language, None);
            assert_eq!(value, expected);
        }
        other => panic!("expected code block, got {:?}", other),
    }
}

#[test]
fn test_unclosed_fence() {
    let err = parse_err("```\nnever closed\n");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEndOfInput);
}

#[test]
fn test_tilde_fence_not_closed_by_backticks() {
    let err = parse_err("~~~\ncode\n```\n");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEndOfInput);
}

// ============================================================================
// Horizontal Rule Tests
// ============================================================================

#[rstest]
#[case("---")]
#[case("***")]
#[case("___")]
#[case("* * *")]
#[case("- - - -")]
fn test_horizontal_rules(#[case] input: &str) {
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    assert_eq!(doc.children(), &[Node::HorizontalRule]);
}

// ============================================================================
// List Tests
// ============================================================================

#[test]
fn test_unordered_list() {
    let arena = Arena::new();
    let doc = parse(&arena, b"- Item 1\n- Item 2").unwrap();
    match doc.children()[0] {
        Node::List(List {
            ordered,
            marker,
            children,
        }) => {
            assert!(!ordered);
            assert_eq!(marker, b'-');
            assert_eq!(kinds(children), vec!["list_item", "list_item"]);
            assert_eq!(kinds(children[0].children()), vec!["paragraph"]);
            assert_eq!(text_content(&children[1]), "Item 2");
        }
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn test_ordered_list_marker_is_first_digit() {
    let arena = Arena::new();
    let doc = parse(&arena, b"42. answer\n7. seven").unwrap();
    match doc.children()[0] {
        Node::List(List {
            ordered,
            marker,
            children,
        }) => {
            assert!(ordered);
            assert_eq!(marker, b'4');
            assert_eq!(children.len(), 2);
        }
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn test_nested_list_attaches_to_previous_item() {
    let arena = Arena::new();
    let doc = parse(&arena, b"- a\n    - b\n    - c\n- d").unwrap();
    let list = doc.children()[0];
    assert_eq!(list.children().len(), 2);

    let first = list.children()[0];
    assert_eq!(kinds(first.children()), vec!["paragraph", "list"]);
    assert_eq!(first.children()[1].children().len(), 2);
    assert_eq!(text_content(&list.children()[1]), "d");
}

#[test]
fn test_nested_ordered_inside_unordered() {
    let arena = Arena::new();
    let doc = parse(&arena, b"- a\n    1. one\n    2. two").unwrap();
    let item = doc.children()[0].children()[0];
    match item.children()[1] {
        Node::List(List { ordered, .. }) => assert!(ordered),
        other => panic!("expected nested list, got {:?}", other),
    }
}

#[rstest]
#[case::blank_line("- a\n\n- b", vec!["list", "list"])]
#[case::marker_change("- a\n* b", vec!["list", "list"])]
#[case::ordered_after_unordered("- a\n1. b", vec!["list", "list"])]
#[case::plain_line("- a\nplain", vec!["list", "paragraph"])]
fn test_list_boundaries(#[case] input: &str, #[case] expected: Vec<&str>) {
    let arena = Arena::new();
    let doc = parse(&arena, input.as_bytes()).unwrap();
    assert_eq!(kinds(doc.children()), expected);
}

#[test]
fn test_ordered_items_continue_with_any_number() {
    let arena = Arena::new();
    let doc = parse(&arena, b"1. a\n1. b\n9. c").unwrap();
    assert_eq!(doc.children()[0].children().len(), 3);
}

// ============================================================================
// Inline Tests
// ============================================================================

#[test]
fn test_link_with_title() {
    let arena = Arena::new();
    let doc = parse(&arena, br#"[the site](https://example.com "Example")"#).unwrap();
    match doc.children()[0].children()[0] {
        Node::Link(Link {
            children,
            href,
            title,
        }) => {
            assert_eq!(href, "https://example.com");
            assert_eq!(title.map(|t| t.to_string()), Some("Example".to_string()));
            assert_eq!(kinds(children), vec!["text"]);
        }
        other => panic!("expected link, got {:?}", other),
    }
}

#[test]
fn test_image() {
    let arena = Arena::new();
    let doc = parse(&arena, b"![a cat](cat.png)").unwrap();
    match doc.children()[0].children()[0] {
        Node::Image(Image { alt, src, title }) => {
            assert_eq!(alt, "a cat");
            assert_eq!(src, "cat.png");
            assert_eq!(title, None);
        }
        other => panic!("expected image, got {:?}", other),
    }
}

#[test]
fn test_hard_line_break() {
    let arena = Arena::new();
    let doc = parse(&arena, b"first  \nsecond").unwrap();
    assert_eq!(
        kinds(doc.children()[0].children()),
        vec!["text", "line_break", "text"]
    );
}

#[test]
fn test_escaped_markers_are_text() {
    let arena = Arena::new();
    let doc = parse(&arena, br"\*not emphasis\*").unwrap();
    let para = doc.children()[0];
    assert!(para.children().iter().all(|n| n.kind_name() == "text"));
    assert_eq!(text_content(&para), "*not emphasis*");
}

#[rstest]
#[case::unclosed_code("`unclosed", ParseErrorKind::UnexpectedEndOfInput)]
#[case::unclosed_bold("Hi **", ParseErrorKind::UnexpectedEndOfInput)]
#[case::unclosed_italics("*open", ParseErrorKind::UnexpectedEndOfInput)]
#[case::unclosed_link_text("[never", ParseErrorKind::UnexpectedEndOfInput)]
#[case::unclosed_title(r#"[a](b "title)"#, ParseErrorKind::UnexpectedEndOfInput)]
#[case::bracket_without_destination("[just brackets]", ParseErrorKind::InvalidSyntax)]
#[case::missing_paren("[a](b", ParseErrorKind::InvalidSyntax)]
#[case::image_without_destination("![alt] text", ParseErrorKind::InvalidSyntax)]
fn test_inline_errors(#[case] input: &str, #[case] kind: ParseErrorKind) {
    assert_eq!(parse_err(input).kind, kind);
}

#[test]
fn test_inline_error_span_is_absolute() {
    // The code span opens at byte 10 of the buffer.
    let err = parse_err("# Heading\n`unclosed");
    assert_eq!(err.span, Some(Span::new(10, 19)));
}

#[test]
fn test_inline_nesting_limit() {
    // Alternating italics and bold, two levels per repetition.
    let input = format!("{}end", "*x**x".repeat(100));
    assert_eq!(parse_err(&input).kind, ParseErrorKind::InvalidSyntax);
}

#[test]
fn test_errors_in_list_items_propagate() {
    assert_eq!(
        parse_err("- fine\n- `broken").kind,
        ParseErrorKind::UnexpectedEndOfInput
    );
}

// ============================================================================
// Arena Tests
// ============================================================================

#[test]
fn test_arena_budget_exhaustion() {
    let arena = Arena::with_limit(16);
    let err = parse(&arena, b"# Hello").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OutOfMemory);
    assert_eq!(err.span, None);
}

#[test]
fn test_arena_exhaustion_inside_quote_points_at_quote() {
    // Room for the quoted text only, not for its nodes.
    let arena = Arena::with_limit(2);
    let err = parse(&arena, b"> x").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OutOfMemory);
    assert_eq!(err.span, Some(Span::new(0, 3)));
}

#[test]
fn test_arena_reuse_after_reset() {
    let mut arena = Arena::with_limit(1 << 16);
    for _ in 0..3 {
        {
            let doc = parse(&arena, b"- a\n- b\n\n> c").unwrap();
            assert_eq!(doc.children().len(), 2);
        }
        assert!(arena.used_bytes() > 0);
        arena.reset();
    }
    assert_eq!(arena.used_bytes(), 0);
}

#[test]
fn test_text_borrows_from_input() {
    let arena = Arena::new();
    let input = b"plain words".to_vec();
    let doc = parse(&arena, &input).unwrap();
    match doc.children()[0].children()[0] {
        Node::Text(t) => assert_eq!(t.value.as_ptr(), input.as_ptr()),
        other => panic!("expected text, got {:?}", other),
    }
}

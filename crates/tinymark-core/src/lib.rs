//! # tinymark Core
//!
//! A small, strict Markdown to HTML converter.
//!
//! tinymark accepts a deliberately narrow Markdown dialect (ATX headings,
//! paragraphs, blockquotes, lists, fenced code, emphasis, code spans, links,
//! images) and fails loudly on anything it cannot interpret instead of
//! guessing. The parsed tree lives in an [`Arena`] that is released in one
//! action after rendering.
//!
//! ## Quick Start
//!
//! ```rust
//! use tinymark_core::markdown_to_html;
//!
//! let html = markdown_to_html(b"# Hello World").unwrap();
//! assert_eq!(html, b"<h1>Hello World</h1>");
//! ```
//!
//! ## Working with the tree
//!
//! ```rust
//! use tinymark_core::{parse, render_to_string, Arena, Node};
//!
//! let arena = Arena::new();
//! let doc = parse(&arena, b"- Item 1\n- Item 2").unwrap();
//!
//! assert!(matches!(doc.children()[0], Node::List(_)));
//! assert_eq!(
//!     render_to_string(&doc).unwrap(),
//!     "<ul><li><p>Item 1</p></li><li><p>Item 2</p></li></ul>"
//! );
//! ```
//!
//! ## Errors
//!
//! ```rust
//! use tinymark_core::{markdown_to_html, ParseErrorKind};
//!
//! let err = markdown_to_html(b"####### Too many").unwrap_err();
//! assert_eq!(err.parse_kind(), Some(ParseErrorKind::InvalidSyntax));
//! ```
//!
//! ## Worker mode
//!
//! [`Worker`] serves length-prefixed requests (`<len>\n<markdown>`) over any
//! reader/writer pair, answering each with `<len>\n<html>`.

pub mod arena;
pub mod ast;
pub mod error;
pub mod escape;
pub mod inline;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod span;
pub mod worker;

pub use arena::Arena;
pub use ast::Node;
pub use error::{Error, ParseError, ParseErrorKind, RenderError};
pub use parser::{parse, Parser};
pub use render::{render, render_to_string, render_to_vec};
pub use span::Span;
pub use worker::{Worker, WorkerConfig, WorkerError, WorkerState};

/// Convert Markdown to HTML using a fresh arena.
pub fn markdown_to_html(markdown: &[u8]) -> Result<Vec<u8>, Error> {
    let arena = Arena::new();
    markdown_to_html_in(&arena, markdown)
}

/// Convert Markdown to HTML, allocating the tree in `arena`.
///
/// The tree is dropped before returning, so the caller may
/// [`reset`](Arena::reset) the arena right after.
pub fn markdown_to_html_in(arena: &Arena, markdown: &[u8]) -> Result<Vec<u8>, Error> {
    let doc = parse(arena, markdown)?;
    Ok(render_to_vec(&doc)?)
}

//! Block parser for tinymark.
//!
//! Walks the buffer line by line through the [`Lexer`] cursor, classifies
//! each block from the first line, and hands inline content to
//! [`parse_inlines`]. Node slices are frozen into the [`Arena`]; text borrows
//! from the input. Any error aborts the whole parse.

use bstr::{BStr, ByteSlice};
use memchr::memchr;

use crate::arena::Arena;
use crate::ast::{Blockquote, CodeBlock, Document, Heading, List, ListItem, Node, Paragraph};
use crate::error::ParseError;
use crate::inline::parse_inlines;
use crate::lexer::{Lexer, Line};
use crate::span::Span;

/// Maximum depth of nested blockquotes and lists.
pub const MAX_BLOCK_NESTING: usize = 64;

/// Maximum heading level.
pub const MAX_HEADING_LEVEL: usize = 6;

/// Indentation (in columns) that opens a nested list.
pub const NESTED_LIST_INDENT: usize = 4;

/// Block type decided from the first line of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStart {
    Heading,
    Blockquote,
    /// Fence byte and opening run length.
    Fence(u8, usize),
    HorizontalRule,
    List(ListMarker),
    Paragraph,
}

/// A list item marker at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    /// `-`, `*`, `+`, or the first digit of an ordered marker.
    pub marker: u8,
    /// Offset of the item content after the marker and its space.
    pub content_offset: usize,
}

impl ListMarker {
    /// Whether another item may join a list that started with `self`.
    fn continues(&self, other: &ListMarker) -> bool {
        if self.ordered {
            other.ordered
        } else {
            !other.ordered && other.marker == self.marker
        }
    }
}

/// Classify a line, in priority order: heading, blockquote, fence,
/// horizontal rule, unordered list, ordered list, paragraph.
///
/// The rule check runs before list detection so `---` and `* * *` are never
/// taken for list items.
pub fn classify(text: &[u8]) -> BlockStart {
    match text.first().copied() {
        Some(b'#') => return BlockStart::Heading,
        Some(b'>') => return BlockStart::Blockquote,
        Some(fence @ (b'`' | b'~')) => {
            let run = run_len(text, fence);
            if run >= 3 {
                return BlockStart::Fence(fence, run);
            }
        }
        _ => {}
    }

    if is_horizontal_rule(text) {
        return BlockStart::HorizontalRule;
    }

    match list_marker(text) {
        Some(marker) => BlockStart::List(marker),
        None => BlockStart::Paragraph,
    }
}

/// Three or more of one of `-`, `*`, `_`, optionally separated by spaces,
/// and nothing else on the line.
pub fn is_horizontal_rule(text: &[u8]) -> bool {
    let rule = match text.first().copied() {
        Some(b @ (b'-' | b'*' | b'_')) => b,
        _ => return false,
    };

    let mut count = 0;
    for &b in text {
        if b == rule {
            count += 1;
        } else if b != b' ' {
            return false;
        }
    }
    count >= 3
}

/// Recognize `- `, `* `, `+ ` or `<digits>. ` at the start of `text`.
pub fn list_marker(text: &[u8]) -> Option<ListMarker> {
    let first = *text.first()?;
    match first {
        b'-' | b'*' | b'+' if text.get(1) == Some(&b' ') => Some(ListMarker {
            ordered: false,
            marker: first,
            content_offset: 2,
        }),
        b'0'..=b'9' => {
            let digits = text.iter().take_while(|b| b.is_ascii_digit()).count();
            if text.get(digits) == Some(&b'.') && text.get(digits + 1) == Some(&b' ') {
                Some(ListMarker {
                    ordered: true,
                    marker: first,
                    content_offset: digits + 2,
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

#[inline]
fn run_len(text: &[u8], byte: u8) -> usize {
    text.iter().take_while(|&&b| b == byte).count()
}

#[inline]
fn skip_spaces(text: &[u8]) -> &[u8] {
    let n = run_len(text, b' ');
    &text[n..]
}

/// Parse `input` into a Document allocated in `arena`.
///
/// # Example
///
/// ```rust
/// use tinymark_core::{parse, Arena, Node};
///
/// let arena = Arena::new();
/// let doc = parse(&arena, b"# Hello\n\n- a\n- b").unwrap();
/// assert!(matches!(doc, Node::Document(_)));
/// assert_eq!(doc.children().len(), 2);
/// ```
pub fn parse<'a>(arena: &'a Arena, input: &'a [u8]) -> Result<Node<'a>, ParseError> {
    Parser::new(arena).parse(input)
}

/// Recursive-descent block parser bound to one arena.
pub struct Parser<'a> {
    arena: &'a Arena,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser that allocates into `arena`.
    #[inline]
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena, depth: 0 }
    }

    /// Parse a whole buffer into a Document node.
    pub fn parse(&mut self, input: &'a [u8]) -> Result<Node<'a>, ParseError> {
        let mut lexer = Lexer::new(input);
        let children = self.parse_blocks(&mut lexer)?;
        Ok(Node::Document(Document { children }))
    }

    fn parse_blocks(&mut self, lexer: &mut Lexer<'a>) -> Result<&'a [Node<'a>], ParseError> {
        let mut blocks = Vec::with_capacity(16);

        loop {
            lexer.skip_blank();
            let line = match lexer.peek() {
                Some(line) => line,
                None => break,
            };
            blocks.push(self.parse_block(lexer, line)?);
        }

        self.arena.alloc_nodes(&blocks)
    }

    fn parse_block(
        &mut self,
        lexer: &mut Lexer<'a>,
        line: Line<'a>,
    ) -> Result<Node<'a>, ParseError> {
        match classify(line.text) {
            BlockStart::Heading => self.parse_heading(lexer, line),
            BlockStart::Blockquote => self.parse_blockquote(lexer, line),
            BlockStart::Fence(fence, run) => self.parse_code_block(lexer, line, fence, run),
            BlockStart::HorizontalRule => {
                lexer.next();
                Ok(Node::HorizontalRule)
            }
            BlockStart::List(marker) => self.parse_list(lexer, 0, marker),
            BlockStart::Paragraph => self.parse_paragraph(lexer, line),
        }
    }

    /// Run `f` one nesting level deeper. Errors that carry no position are
    /// located at `span`.
    fn nested<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_BLOCK_NESTING {
            return Err(ParseError::invalid_syntax("blocks nested too deeply", Some(span)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result.map_err(|err| err.or_span(span))
    }

    fn parse_heading(
        &mut self,
        lexer: &mut Lexer<'a>,
        line: Line<'a>,
    ) -> Result<Node<'a>, ParseError> {
        let text = line.text;
        let level = run_len(text, b'#');
        let marker_span = Span::new(line.span.start, line.span.start + level);

        if level > MAX_HEADING_LEVEL {
            return Err(ParseError::invalid_syntax(
                "heading: more than six '#'",
                Some(marker_span),
            ));
        }
        if text.get(level) != Some(&b' ') {
            return Err(ParseError::invalid_syntax(
                "heading: missing space after '#'",
                Some(marker_span),
            ));
        }

        lexer.next();
        let content = skip_spaces(&text[level..]);
        let children = parse_inlines(self.arena, content, line.offset_of(content))?;

        Ok(Node::Heading(Heading {
            level: level as u8,
            children,
        }))
    }

    /// Strip one `>` (and one optional space) per line, collect the quoted
    /// lines into an arena buffer, and parse that buffer as blocks.
    ///
    /// Every collected line keeps a trailing newline, so a quoted paragraph
    /// that runs to the end of the buffer renders with it:
    /// `> quote` becomes `<blockquote><p>quote\n</p></blockquote>`.
    fn parse_blockquote(
        &mut self,
        lexer: &mut Lexer<'a>,
        first: Line<'a>,
    ) -> Result<Node<'a>, ParseError> {
        let mut buffer = Vec::with_capacity(first.text.len() + 1);
        let mut end = first.span.end;

        while let Some(line) = lexer.peek() {
            if line.is_blank() || !line.starts_with(b'>') {
                break;
            }
            let rest = &line.text[1..];
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            buffer.extend_from_slice(rest);
            buffer.push(b'\n');
            end = line.span.end;
            lexer.next();
        }

        let quoted = self.arena.alloc_bytes(&buffer)?;
        let children = self.nested(Span::new(first.span.start, end), |parser| {
            parser.parse_blocks(&mut Lexer::new(quoted))
        })?;

        Ok(Node::Blockquote(Blockquote { children }))
    }

    /// Fenced code block closed by a run of at least `run` `fence` bytes at
    /// the start of a line.
    fn parse_code_block(
        &mut self,
        lexer: &mut Lexer<'a>,
        open: Line<'a>,
        fence: u8,
        run: usize,
    ) -> Result<Node<'a>, ParseError> {
        lexer.next();

        let info = open.text[run..].trim();
        let language = if info.is_empty() {
            None
        } else {
            Some(BStr::new(info))
        };

        let content_start = open.next;
        loop {
            let line = lexer.next().ok_or_else(|| {
                ParseError::unexpected_eof(
                    "fenced code block",
                    Some(Span::new(open.span.start, lexer.len())),
                )
            })?;

            if run_len(line.text, fence) >= run {
                // The newline before the closing fence is not content.
                let content_end = line.span.start.saturating_sub(1).max(content_start);
                let raw = lexer.slice(content_start, content_end);
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                let value = self.without_cr(raw)?;
                return Ok(Node::CodeBlock(CodeBlock {
                    language,
                    value: BStr::new(value),
                }));
            }
        }
    }

    /// Parse a list whose items sit at `indent` columns.
    ///
    /// Lines indented by [`NESTED_LIST_INDENT`] or more past `indent` that
    /// carry a list marker open a nested list, attached to the most recent
    /// item. A blank line, a shallower line, a horizontal rule, or a marker
    /// that does not match the first item ends the list.
    fn parse_list(
        &mut self,
        lexer: &mut Lexer<'a>,
        indent: usize,
        first: ListMarker,
    ) -> Result<Node<'a>, ParseError> {
        let mut items = Vec::with_capacity(8);
        let mut item: Vec<Node<'a>> = Vec::with_capacity(2);

        loop {
            let line = match lexer.peek() {
                Some(line) if !line.is_blank() => line,
                _ => break,
            };
            let (columns, rest) = line.indent();
            if columns < indent || is_horizontal_rule(rest) {
                break;
            }
            let marker = match list_marker(rest) {
                Some(marker) => marker,
                None => break,
            };

            if columns >= indent + NESTED_LIST_INDENT {
                if item.is_empty() {
                    break;
                }
                let sublist = self.nested(line.span, |parser| {
                    parser.parse_list(lexer, columns, marker)
                })?;
                item.push(sublist);
                continue;
            }

            if !first.continues(&marker) {
                break;
            }

            if !item.is_empty() {
                items.push(self.finish_item(&item)?);
                item.clear();
            }

            lexer.next();
            let content = skip_spaces(&rest[marker.content_offset..]);
            let children = parse_inlines(self.arena, content, line.offset_of(content))?;
            item.push(Node::Paragraph(Paragraph { children }));
        }

        if !item.is_empty() {
            items.push(self.finish_item(&item)?);
        }

        Ok(Node::List(List {
            ordered: first.ordered,
            marker: first.marker,
            children: self.arena.alloc_nodes(&items)?,
        }))
    }

    fn finish_item(&self, children: &[Node<'a>]) -> Result<Node<'a>, ParseError> {
        Ok(Node::ListItem(ListItem {
            children: self.arena.alloc_nodes(children)?,
        }))
    }

    /// Consecutive non-blank lines. A paragraph that runs to the end of the
    /// buffer keeps its final newline.
    fn parse_paragraph(
        &mut self,
        lexer: &mut Lexer<'a>,
        first: Line<'a>,
    ) -> Result<Node<'a>, ParseError> {
        lexer.next();
        let mut last = first;

        while let Some(line) = lexer.peek() {
            if line.is_blank() {
                break;
            }
            last = line;
            lexer.next();
        }

        let end = if lexer.at_end() {
            last.next
        } else {
            last.span.end
        };
        let content = self.without_cr(lexer.slice(first.span.start, end))?;
        let children = parse_inlines(self.arena, content, first.span.start)?;

        Ok(Node::Paragraph(Paragraph { children }))
    }

    /// `bytes` with every `\r\n` turned into `\n`. Copies into the arena
    /// only when a CRLF is present.
    fn without_cr(&self, bytes: &'a [u8]) -> Result<&'a [u8], ParseError> {
        if !bytes.contains_str("\r\n") {
            return Ok(bytes);
        }
        let mut normalized = Vec::with_capacity(bytes.len());
        let mut rest = bytes;
        while let Some(cr) = memchr(b'\r', rest) {
            normalized.extend_from_slice(&rest[..cr]);
            if rest.get(cr + 1) != Some(&b'\n') {
                normalized.push(b'\r');
            }
            rest = &rest[cr + 1..];
        }
        normalized.extend_from_slice(rest);
        self.arena.alloc_bytes(&normalized)
    }
}

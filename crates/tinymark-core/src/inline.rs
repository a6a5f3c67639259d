//! Recursive-descent inline parser.
//!
//! Parses a flat span (no block structure) into inline nodes. Text, code and
//! link destinations borrow directly from the span; only node slices are
//! frozen into the arena. Bold, italics and links recurse into
//! [`InlineParser::parse_sequence`], which is the only loop in the module.
//!
//! Dispatch order at each position: backslash escape, closing delimiter of
//! the enclosing emphasis, `**`, `*`, backtick code span, `![` image, `[` link,
//! hard line break, plain text.

use bstr::BStr;
use memchr::{memchr, memchr3};

use crate::arena::Arena;
use crate::ast::{Code, Image, InlineBold, InlineItalics, Link, Node, Text};
use crate::error::ParseError;
use crate::span::Span;

/// Maximum depth of nested emphasis and link text.
pub const MAX_INLINE_NESTING: usize = 128;

/// Parse inline elements from a flat span.
///
/// `base_offset` is the position of `text` in the enclosing buffer and is
/// only used to report error spans.
pub fn parse_inlines<'a>(
    arena: &'a Arena,
    text: &'a [u8],
    base_offset: usize,
) -> Result<&'a [Node<'a>], ParseError> {
    if text.is_empty() {
        return Ok(&[]);
    }

    InlineParser::new(arena, text, base_offset, 0).parse_sequence(None)
}

/// Emphasis whose closing delimiter ends the current sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Bold,
    Italics,
}

impl Closer {
    fn len(self) -> usize {
        match self {
            Closer::Bold => 2,
            Closer::Italics => 1,
        }
    }

    fn construct(self) -> &'static str {
        match self {
            Closer::Bold => "bold text",
            Closer::Italics => "italic text",
        }
    }
}

struct InlineParser<'a> {
    arena: &'a Arena,
    bytes: &'a [u8],
    pos: usize,
    base_offset: usize,
    depth: usize,
}

impl<'a> InlineParser<'a> {
    #[inline]
    fn new(arena: &'a Arena, bytes: &'a [u8], base_offset: usize, depth: usize) -> Self {
        Self {
            arena,
            bytes,
            pos: 0,
            base_offset,
            depth,
        }
    }

    #[inline(always)]
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    #[inline(always)]
    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.base_offset + start, self.base_offset + end)
    }

    /// Length of the run of `byte` starting at `at`.
    #[inline]
    fn run_len(&self, at: usize, byte: u8) -> usize {
        self.bytes[at..].iter().take_while(|&&b| b == byte).count()
    }

    /// Parse nodes until the end of the span, or until `closer` when inside
    /// emphasis opened at `open`.
    fn parse_sequence(
        &mut self,
        closer: Option<(Closer, usize)>,
    ) -> Result<&'a [Node<'a>], ParseError> {
        let mut nodes = Vec::with_capacity(8);

        loop {
            if self.pos >= self.bytes.len() {
                if let Some((closer, open)) = closer {
                    return Err(ParseError::unexpected_eof(
                        closer.construct(),
                        Some(self.span(open, self.bytes.len())),
                    ));
                }
                break;
            }

            let c = self.bytes[self.pos];

            if c == b'\\' {
                nodes.push(self.parse_escape());
                continue;
            }

            if let Some((closer, _)) = closer {
                if self.at_closer(closer) {
                    self.pos += closer.len();
                    break;
                }
            }

            let node = match c {
                b'*' if self.peek(1) == Some(b'*') => self.parse_bold()?,
                b'*' => self.parse_italics()?,
                b'`' => self.parse_code_span()?,
                b'!' if self.peek(1) == Some(b'[') => self.parse_image()?,
                b'[' => self.parse_link()?,
                b' ' if self.hard_break_len(self.pos).is_some() => self.parse_line_break(),
                _ => self.parse_text()?,
            };
            nodes.push(node);
        }

        self.arena.alloc_nodes(&nodes)
    }

    #[inline]
    fn at_closer(&self, closer: Closer) -> bool {
        match closer {
            Closer::Bold => self.bytes[self.pos..].starts_with(b"**"),
            Closer::Italics => self.bytes[self.pos] == b'*' && self.peek(1) != Some(b'*'),
        }
    }

    fn enter(&self, open: usize) -> Result<usize, ParseError> {
        if self.depth >= MAX_INLINE_NESTING {
            return Err(ParseError::invalid_syntax(
                "inline content nested too deeply",
                Some(self.span(open, open + 1)),
            ));
        }
        Ok(self.depth + 1)
    }

    /// `\x` yields `x` literally; a trailing lone backslash is kept as is.
    #[inline]
    fn parse_escape(&mut self) -> Node<'a> {
        let start = self.pos;
        let value = if start + 1 < self.bytes.len() {
            self.pos += 2;
            &self.bytes[start + 1..start + 2]
        } else {
            self.pos += 1;
            &self.bytes[start..start + 1]
        };
        Node::Text(Text {
            value: BStr::new(value),
        })
    }

    fn parse_bold(&mut self) -> Result<Node<'a>, ParseError> {
        let open = self.pos;
        let depth = self.enter(open)?;
        self.pos += 2;

        let outer = std::mem::replace(&mut self.depth, depth);
        let children = self.parse_sequence(Some((Closer::Bold, open)));
        self.depth = outer;

        Ok(Node::InlineBold(InlineBold {
            children: children?,
        }))
    }

    fn parse_italics(&mut self) -> Result<Node<'a>, ParseError> {
        let open = self.pos;
        let depth = self.enter(open)?;
        self.pos += 1;

        let outer = std::mem::replace(&mut self.depth, depth);
        let children = self.parse_sequence(Some((Closer::Italics, open)));
        self.depth = outer;

        Ok(Node::InlineItalics(InlineItalics {
            children: children?,
        }))
    }

    /// Backtick code span.
    ///
    /// An even run of two or more backticks ending the span is an empty code
    /// span. Otherwise the closing run must be at least two backticks long
    /// when the opening run was, else at least one; the whole closing run is
    /// consumed.
    fn parse_code_span(&mut self) -> Result<Node<'a>, ParseError> {
        let start = self.pos;
        let run = self.run_len(start, b'`');
        let content_start = start + run;

        if run >= 2 && run % 2 == 0 && content_start == self.bytes.len() {
            self.pos = content_start;
            return Ok(Node::Code(Code {
                value: BStr::new(b""),
            }));
        }

        let wanted = if run >= 2 { 2 } else { 1 };
        let mut search = content_start;

        while let Some(offset) = memchr(b'`', &self.bytes[search..]) {
            let close = search + offset;
            let close_run = self.run_len(close, b'`');

            if close_run >= wanted {
                self.pos = close + close_run;
                return Ok(Node::Code(Code {
                    value: BStr::new(&self.bytes[content_start..close]),
                }));
            }
            search = close + close_run;
        }

        Err(ParseError::unexpected_eof(
            "code span",
            Some(self.span(start, self.bytes.len())),
        ))
    }

    fn parse_image(&mut self) -> Result<Node<'a>, ParseError> {
        let start = self.pos;
        let alt_start = start + 2;
        let alt_end = self.find_closing_bracket(alt_start).ok_or_else(|| {
            ParseError::unexpected_eof("image alt text", Some(self.span(start, self.bytes.len())))
        })?;

        self.pos = alt_end + 1;
        let (src, title) = self.parse_destination(start, "image")?;

        Ok(Node::Image(Image {
            alt: BStr::new(&self.bytes[alt_start..alt_end]),
            src,
            title,
        }))
    }

    fn parse_link(&mut self) -> Result<Node<'a>, ParseError> {
        let start = self.pos;
        let text_start = start + 1;
        let text_end = self.find_closing_bracket(text_start).ok_or_else(|| {
            ParseError::unexpected_eof("link text", Some(self.span(start, self.bytes.len())))
        })?;

        self.pos = text_end + 1;
        let (href, title) = self.parse_destination(start, "link")?;

        let depth = self.enter(start)?;
        let children = InlineParser::new(
            self.arena,
            &self.bytes[text_start..text_end],
            self.base_offset + text_start,
            depth,
        )
        .parse_sequence(None)?;

        Ok(Node::Link(Link {
            children,
            href,
            title,
        }))
    }

    /// Find the `]` matching an already consumed `[`, honoring nesting and
    /// backslash escapes.
    fn find_closing_bracket(&self, from: usize) -> Option<usize> {
        let mut depth = 1usize;
        let mut i = from;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 1,
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        None
    }

    /// Parse `(destination "title")` right after the closing bracket.
    fn parse_destination(
        &mut self,
        start: usize,
        what: &str,
    ) -> Result<(&'a BStr, Option<&'a BStr>), ParseError> {
        if self.peek(0) != Some(b'(') {
            return Err(ParseError::invalid_syntax(
                &format!("{}: expected '(' after ']'", what),
                Some(self.span(start, self.pos)),
            ));
        }
        self.pos += 1;
        self.skip_spaces();

        let dest_start = self.pos;
        while let Some(b) = self.peek(0) {
            if matches!(b, b')' | b' ' | b'"') {
                break;
            }
            self.pos += 1;
        }
        let destination = BStr::new(&self.bytes[dest_start..self.pos]);
        self.skip_spaces();

        let title = if self.peek(0) == Some(b'"') {
            let title_start = self.pos + 1;
            let offset = memchr(b'"', &self.bytes[title_start..]).ok_or_else(|| {
                ParseError::unexpected_eof(
                    &format!("{} title", what),
                    Some(self.span(start, self.bytes.len())),
                )
            })?;
            self.pos = title_start + offset + 1;
            self.skip_spaces();
            Some(BStr::new(&self.bytes[title_start..title_start + offset]))
        } else {
            None
        };

        if self.peek(0) != Some(b')') {
            return Err(ParseError::invalid_syntax(
                &format!("{}: missing closing ')'", what),
                Some(self.span(start, self.pos)),
            ));
        }
        self.pos += 1;

        Ok((destination, title))
    }

    #[inline]
    fn skip_spaces(&mut self) {
        while self.peek(0) == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Length of a hard break (two or more spaces, then a newline) at `at`.
    #[inline]
    fn hard_break_len(&self, at: usize) -> Option<usize> {
        let spaces = self.run_len(at, b' ');
        if spaces >= 2 && self.bytes.get(at + spaces) == Some(&b'\n') {
            Some(spaces + 1)
        } else {
            None
        }
    }

    fn parse_line_break(&mut self) -> Node<'a> {
        if let Some(len) = self.hard_break_len(self.pos) {
            self.pos += len;
        }
        Node::LineBreak
    }

    /// Plain text up to the next special byte or hard break.
    fn parse_text(&mut self) -> Result<Node<'a>, ParseError> {
        let start = self.pos;
        let end = self.find_text_end(start);

        if end == start {
            return Err(ParseError::invalid_syntax(
                "text run consumed no input",
                Some(self.span(start, start)),
            ));
        }

        self.pos = end;
        Ok(Node::Text(Text {
            value: BStr::new(&self.bytes[start..end]),
        }))
    }

    #[inline]
    fn find_text_end(&self, start: usize) -> usize {
        let mut i = start;

        while i < self.bytes.len() {
            let next = match self.find_next_special(i) {
                Some(next) => next,
                None => return self.bytes.len(),
            };

            match self.bytes[next] {
                b'!' if self.bytes.get(next + 1) != Some(&b'[') => i = next + 1,
                b'!' => return next,
                b'\n' => {
                    let spaces = self.bytes[start..next]
                        .iter()
                        .rev()
                        .take_while(|&&b| b == b' ')
                        .count();
                    if spaces >= 2 {
                        return next - spaces;
                    }
                    i = next + 1;
                }
                _ => return next,
            }
        }

        self.bytes.len()
    }

    /// Next candidate stop byte at or after `from`.
    #[inline(always)]
    fn find_next_special(&self, from: usize) -> Option<usize> {
        let remaining = &self.bytes[from..];

        // memchr3 is SIMD-accelerated so two calls are still fast.
        let common = memchr3(b'*', b'`', b'[', remaining);
        let rare = memchr3(b'\\', b'!', b'\n', remaining);

        match (common, rare) {
            (Some(a), Some(b)) => Some(from + a.min(b)),
            (Some(a), None) => Some(from + a),
            (None, Some(b)) => Some(from + b),
            (None, None) => None,
        }
    }
}

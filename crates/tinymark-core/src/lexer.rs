//! Line cursor for the block parser.
//!
//! [`Lexer`] is an iterator of [`Line`]s over one parse buffer with a single
//! line of lookahead, so the block parser can look at a line before deciding
//! whether the current block owns it. Lines borrow from the buffer; newline
//! search uses `memchr`.

use memchr::memchr;

use crate::span::Span;

/// Columns a tab advances when measuring indentation.
pub const TAB_WIDTH: usize = 4;

/// One line of the buffer, without its `\n` or `\r\n` terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a [u8],
    /// Position of `text` in the buffer.
    pub span: Span,
    /// Start of the following line, i.e. past the terminator.
    pub next: usize,
}

impl<'a> Line<'a> {
    /// Empty or only spaces and tabs.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.iter().all(|b| matches!(b, b' ' | b'\t'))
    }

    #[inline]
    pub fn starts_with(&self, byte: u8) -> bool {
        self.text.first() == Some(&byte)
    }

    /// Leading whitespace width in columns (tabs count [`TAB_WIDTH`]) and the
    /// text after it.
    pub fn indent(&self) -> (usize, &'a [u8]) {
        let ws = self
            .text
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();
        let columns = self.text[..ws]
            .iter()
            .map(|&b| if b == b'\t' { TAB_WIDTH } else { 1 })
            .sum();
        (columns, &self.text[ws..])
    }

    /// Buffer offset of `rest`, a suffix of `text`.
    #[inline]
    pub fn offset_of(&self, rest: &[u8]) -> usize {
        self.span.end - rest.len()
    }
}

/// Peekable line iterator over a parse buffer.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    lookahead: Option<Line<'a>>,
}

impl<'a> Lexer<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            lookahead: None,
        }
    }

    /// The next line, without consuming it.
    #[inline]
    pub fn peek(&mut self) -> Option<Line<'a>> {
        if self.lookahead.is_none() {
            self.lookahead = self.scan_line();
        }
        self.lookahead
    }

    /// True once every line, including a peeked one, has been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.lookahead.is_none() && self.pos >= self.bytes.len()
    }

    /// Buffer offset of the next unconsumed line.
    #[inline]
    pub fn position(&self) -> usize {
        self.lookahead.map_or(self.pos, |line| line.span.start)
    }

    pub fn skip_blank(&mut self) {
        while self.peek().is_some_and(|line| line.is_blank()) {
            self.lookahead = None;
        }
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.bytes[start..end]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn scan_line(&mut self) -> Option<Line<'a>> {
        let start = self.pos;
        let rest = self.bytes.get(start..).filter(|rest| !rest.is_empty())?;

        let (text, next) = match memchr(b'\n', rest) {
            Some(nl) => (&rest[..nl], start + nl + 1),
            None => (rest, self.bytes.len()),
        };
        let text = text.strip_suffix(b"\r").unwrap_or(text);

        self.pos = next;
        Some(Line {
            text,
            span: Span::new(start, start + text.len()),
            next,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    #[inline]
    fn next(&mut self) -> Option<Line<'a>> {
        self.lookahead.take().or_else(|| self.scan_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_offsets() {
        let mut lexer = Lexer::new(b"one\r\ntwo\nthree");
        let first = lexer.next().unwrap();
        assert_eq!(first.text, b"one");
        assert_eq!(first.span, Span::new(0, 3));
        assert_eq!(first.next, 5);

        let second = lexer.peek().unwrap();
        assert_eq!(second.text, b"two");
        assert_eq!(lexer.position(), 5);
        assert_eq!(lexer.next(), Some(second));

        let third = lexer.next().unwrap();
        assert_eq!(third.text, b"three");
        assert_eq!(third.next, 14);
        assert!(lexer.at_end());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_skip_blank() {
        let mut lexer = Lexer::new(b"\n  \n\t\r\nbody");
        lexer.skip_blank();
        assert_eq!(lexer.peek().unwrap().text, b"body");
        assert_eq!(lexer.position(), 7);
    }

    #[test]
    fn test_indent_counts_tabs_as_four() {
        let line = Lexer::new(b"\t  - nested").next().unwrap();
        let (columns, rest) = line.indent();
        assert_eq!(columns, 6);
        assert_eq!(rest, b"- nested");
        assert_eq!(line.offset_of(rest), 3);
    }

    #[test]
    fn test_trailing_newline_yields_no_extra_line() {
        let mut lexer = Lexer::new(b"only\n");
        assert_eq!(lexer.next().unwrap().next, 5);
        assert!(lexer.at_end());
        assert_eq!(lexer.count(), 0);
    }
}

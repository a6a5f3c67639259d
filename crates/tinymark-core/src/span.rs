//! Byte ranges used to locate parse errors.
//!
//! Offsets are relative to the buffer being parsed. For top-level content that
//! is the caller's input; inside a blockquote it is the de-prefixed quote
//! buffer the block parser recursed into.

/// A byte range `[start, end)` in a parse buffer.
///
/// # Example
///
/// ```rust
/// use tinymark_core::span::Span;
///
/// let span = Span::new(4, 10);
/// assert_eq!(span.len(), 6);
/// assert!(span.contains(4));
/// assert_eq!(span.line_in(b"one\ntwo\nthree"), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// 1-based line number of `start` within `buffer`.
    ///
    /// Offsets past the end of `buffer` count every line in it.
    pub fn line_in(&self, buffer: &[u8]) -> usize {
        let end = self.start.min(buffer.len());
        memchr::memchr_iter(b'\n', &buffer[..end]).count() + 1
    }
}

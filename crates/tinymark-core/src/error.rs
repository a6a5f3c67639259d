use crate::span::Span;
use std::fmt;
use std::io;

/// Error kinds for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Grammar violated with no valid interpretation (bad heading, malformed
    /// link or image).
    InvalidSyntax,
    /// A construct was opened but its terminator never appeared.
    UnexpectedEndOfInput,
    /// The arena refused an allocation.
    OutOfMemory,
}

/// A parse error with its location in the parsed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,
    /// Byte range where the error was detected
    pub span: Option<Span>,
    /// Error categorization
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create an error for invalid syntax.
    pub fn invalid_syntax(context: &str, span: Option<Span>) -> Self {
        Self {
            message: format!("invalid syntax in {}", context),
            span,
            kind: ParseErrorKind::InvalidSyntax,
        }
    }

    /// Create an error for a construct whose closing delimiter is missing.
    pub fn unexpected_eof(construct: &str, span: Option<Span>) -> Self {
        Self {
            message: format!("unexpected end of input in {}", construct),
            span,
            kind: ParseErrorKind::UnexpectedEndOfInput,
        }
    }

    /// Create an error for an exhausted arena.
    pub fn out_of_memory(requested: usize) -> Self {
        Self {
            message: format!("arena budget exhausted allocating {} bytes", requested),
            span: None,
            kind: ParseErrorKind::OutOfMemory,
        }
    }

    /// Set the span if none was recorded yet.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(span) = self.span {
            write!(f, " at bytes {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Errors produced while writing HTML.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The sink rejected a write.
    #[error("failed to write HTML output: {0}")]
    WriteFailed(#[source] io::Error),
    /// The owned output buffer could not grow.
    #[error("out of memory while buffering HTML output")]
    OutOfMemory,
    /// The rendered bytes are not UTF-8 because the input was not.
    #[error("rendered HTML is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl From<io::Error> for RenderError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::OutOfMemory {
            RenderError::OutOfMemory
        } else {
            RenderError::WriteFailed(err)
        }
    }
}

/// Any failure of the parse + render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

impl Error {
    /// The parse error kind, if this is a parse failure.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Error::Parse(e) => Some(e.kind),
            Error::Render(_) => None,
        }
    }
}

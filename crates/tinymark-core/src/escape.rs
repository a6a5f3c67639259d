//! HTML escaping for text content and attribute values.
//!
//! Text mode escapes `<`, `>` and `&`. Attribute mode also escapes `"`.
//! Quotes in text content pass through unchanged. Input is treated as raw
//! text, never as pre-escaped HTML, so `&amp;` becomes `&amp;amp;`.

use std::io::{self, Write};

use memchr::{memchr, memchr3};

/// Escaping context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// Element content.
    Text,
    /// Double-quoted attribute value.
    Attribute,
}

/// Write `bytes` escaped for element content.
#[inline]
pub fn escape_text<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    escape(out, bytes, EscapeMode::Text)
}

/// Write `bytes` escaped for a double-quoted attribute value.
#[inline]
pub fn escape_attr<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    escape(out, bytes, EscapeMode::Attribute)
}

/// Write `bytes` escaped for `mode`, copying unescaped runs in one write.
pub fn escape<W: Write + ?Sized>(out: &mut W, bytes: &[u8], mode: EscapeMode) -> io::Result<()> {
    let mut rest = bytes;

    while let Some(i) = next_special(rest, mode) {
        out.write_all(&rest[..i])?;
        let entity: &[u8] = match rest[i] {
            b'<' => b"&lt;",
            b'>' => b"&gt;",
            b'&' => b"&amp;",
            _ => b"&quot;",
        };
        out.write_all(entity)?;
        rest = &rest[i + 1..];
    }

    out.write_all(rest)
}

#[inline(always)]
fn next_special(bytes: &[u8], mode: EscapeMode) -> Option<usize> {
    let markup = memchr3(b'<', b'>', b'&', bytes);
    let quote = match mode {
        EscapeMode::Text => None,
        EscapeMode::Attribute => memchr(b'"', bytes),
    };

    match (markup, quote) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

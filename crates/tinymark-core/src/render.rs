//! HTML renderer.
//!
//! A pure walk of the tree: every [`Node`] variant maps to exactly one HTML
//! fragment, with text content escaped in text mode and `src`, `href`, `alt`,
//! `title` and the code-block language escaped in attribute mode. The only
//! failures are a sink that rejects a write and an owned buffer that cannot
//! grow.

use std::io::{self, Write};

use crate::ast::{ByteStr, CodeBlock, Image, Link, Node};
use crate::error::RenderError;
use crate::escape::{escape_attr, escape_text};

/// Render `node` into any byte sink.
pub fn render<W: Write + ?Sized>(node: &Node<'_>, sink: &mut W) -> Result<(), RenderError> {
    HtmlRenderer { out: sink }.node(node)?;
    Ok(())
}

/// Render `node` into an owned byte buffer.
///
/// Buffer growth is fallible: allocation failure is reported as
/// [`RenderError::OutOfMemory`] instead of aborting.
pub fn render_to_vec(node: &Node<'_>) -> Result<Vec<u8>, RenderError> {
    let mut buffer = HtmlBuffer::default();
    render(node, &mut buffer)?;
    Ok(buffer.bytes)
}

/// Render `node` into a `String`.
///
/// Fails with [`RenderError::InvalidUtf8`] when the parsed input was not
/// UTF-8; use [`render_to_vec`] for arbitrary bytes.
///
/// # Example
///
/// ```rust
/// use tinymark_core::{parse, render_to_string, Arena};
///
/// let arena = Arena::new();
/// let doc = parse(&arena, b"This is **bold** text.").unwrap();
/// assert_eq!(
///     render_to_string(&doc).unwrap(),
///     "<p>This is <strong>bold</strong> text.</p>"
/// );
/// ```
pub fn render_to_string(node: &Node<'_>) -> Result<String, RenderError> {
    Ok(String::from_utf8(render_to_vec(node)?)?)
}

/// `Vec<u8>` sink whose growth uses `try_reserve`.
#[derive(Debug, Default)]
struct HtmlBuffer {
    bytes: Vec<u8>,
}

impl Write for HtmlBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .try_reserve(buf.len())
            .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct HtmlRenderer<'w, W: Write + ?Sized> {
    out: &'w mut W,
}

impl<W: Write + ?Sized> HtmlRenderer<'_, W> {
    fn node(&mut self, node: &Node<'_>) -> io::Result<()> {
        match node {
            Node::Document(doc) => self.children(doc.children),
            Node::Heading(heading) => {
                write!(self.out, "<h{}>", heading.level)?;
                self.children(heading.children)?;
                write!(self.out, "</h{}>", heading.level)
            }
            Node::Paragraph(p) => self.wrap("p", p.children),
            Node::Text(text) => escape_text(self.out, text.value),
            Node::Blockquote(quote) => self.wrap("blockquote", quote.children),
            Node::List(list) => self.wrap(if list.ordered { "ol" } else { "ul" }, list.children),
            Node::ListItem(item) => self.wrap("li", item.children),
            Node::Code(code) => {
                self.out.write_all(b"<code>")?;
                escape_text(self.out, code.value)?;
                self.out.write_all(b"</code>")
            }
            Node::CodeBlock(block) => self.code_block(block),
            Node::InlineBold(bold) => self.wrap("strong", bold.children),
            Node::InlineItalics(italics) => self.wrap("em", italics.children),
            Node::Image(image) => self.image(image),
            Node::Link(link) => self.link(link),
            Node::HorizontalRule => self.out.write_all(b"<hr>"),
            Node::LineBreak => self.out.write_all(b"<br>"),
        }
    }

    fn children(&mut self, children: &[Node<'_>]) -> io::Result<()> {
        for child in children {
            self.node(child)?;
        }
        Ok(())
    }

    fn wrap(&mut self, tag: &str, children: &[Node<'_>]) -> io::Result<()> {
        write!(self.out, "<{}>", tag)?;
        self.children(children)?;
        write!(self.out, "</{}>", tag)
    }

    fn code_block(&mut self, block: &CodeBlock<'_>) -> io::Result<()> {
        match block.language {
            Some(language) => {
                self.out.write_all(b"<pre><code class=\"language-")?;
                escape_attr(self.out, language)?;
                self.out.write_all(b"\">")?;
            }
            None => self.out.write_all(b"<pre><code>")?,
        }
        escape_text(self.out, block.value)?;
        self.out.write_all(b"</code></pre>")
    }

    fn image(&mut self, image: &Image<'_>) -> io::Result<()> {
        self.out.write_all(b"<img src=\"")?;
        escape_attr(self.out, image.src)?;
        self.out.write_all(b"\" alt=\"")?;
        escape_attr(self.out, image.alt)?;
        self.title(image.title)?;
        self.out.write_all(b"\">")
    }

    fn link(&mut self, link: &Link<'_>) -> io::Result<()> {
        self.out.write_all(b"<a href=\"")?;
        escape_attr(self.out, link.href)?;
        self.title(link.title)?;
        self.out.write_all(b"\">")?;
        self.children(link.children)?;
        self.out.write_all(b"</a>")
    }

    /// Closes the open attribute and writes ` title="..."` when present,
    /// leaving the title attribute open.
    fn title(&mut self, title: Option<ByteStr<'_>>) -> io::Result<()> {
        if let Some(title) = title {
            self.out.write_all(b"\" title=\"")?;
            escape_attr(self.out, title)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Document, Paragraph, Text};
    use bstr::BStr;

    struct RejectingSink;

    impl Write for RejectingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_write_failed() {
        let err = render(&Node::HorizontalRule, &mut RejectingSink).unwrap_err();
        assert!(matches!(err, RenderError::WriteFailed(_)));
    }

    #[test]
    fn test_invalid_utf8_only_fails_string_rendering() {
        let text = [Node::Text(Text {
            value: BStr::new(b"\xff"),
        })];
        let para = [Node::Paragraph(Paragraph { children: &text })];
        let doc = Node::Document(Document { children: &para });

        assert_eq!(render_to_vec(&doc).unwrap(), b"<p>\xff</p>");
        assert!(matches!(
            render_to_string(&doc),
            Err(RenderError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_empty_document_renders_nothing() {
        let doc = Node::Document(Document { children: &[] });
        assert!(render_to_vec(&doc).unwrap().is_empty());
    }
}

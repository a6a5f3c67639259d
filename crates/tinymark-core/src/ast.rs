//! Abstract Syntax Tree types for tinymark documents.
//!
//! The tree is a strict forest whose storage lives in an [`Arena`](crate::Arena):
//!
//! - **Arena-backed**: children are frozen `&'a [Node<'a>]` slices, so the whole
//!   tree is released in one action when the arena is dropped or reset
//! - **Zero-copy where possible**: byte strings borrow from the input unless
//!   the parser had to synthesize them
//! - **Closed**: [`Node`] is an exhaustive enum; consumers match every variant
//!
//! Every node is `Copy`: it only holds references into the arena or the input.

use bstr::BStr;

/// Borrowed byte string stored in a node.
pub type ByteStr<'a> = &'a BStr;

/// A node of the document tree.
///
/// Leaves: [`Text`], [`Code`], [`CodeBlock`], [`Image`], `HorizontalRule`,
/// `LineBreak`. Every other variant owns an ordered slice of children; slice
/// order is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    /// Root of a parsed document.
    Document(Document<'a>),
    /// Section heading (levels 1-6).
    Heading(Heading<'a>),
    /// Paragraph of inline content.
    Paragraph(Paragraph<'a>),
    /// Plain text, backslash escapes already removed.
    Text(Text<'a>),
    /// Block quotation.
    Blockquote(Blockquote<'a>),
    /// Ordered or unordered list.
    List(List<'a>),
    /// One list entry.
    ListItem(ListItem<'a>),
    /// Inline code span.
    Code(Code<'a>),
    /// Fenced code block.
    CodeBlock(CodeBlock<'a>),
    /// Strong emphasis (`**bold**`).
    InlineBold(InlineBold<'a>),
    /// Emphasis (`*italic*`).
    InlineItalics(InlineItalics<'a>),
    /// Inline image.
    Image(Image<'a>),
    /// Hyperlink.
    Link(Link<'a>),
    /// Thematic break.
    HorizontalRule,
    /// Hard line break.
    LineBreak,
}

impl<'a> Node<'a> {
    /// Children of a container node, or an empty slice for leaves.
    pub fn children(&self) -> &'a [Node<'a>] {
        match self {
            Node::Document(n) => n.children,
            Node::Heading(n) => n.children,
            Node::Paragraph(n) => n.children,
            Node::Blockquote(n) => n.children,
            Node::List(n) => n.children,
            Node::ListItem(n) => n.children,
            Node::InlineBold(n) => n.children,
            Node::InlineItalics(n) => n.children,
            Node::Link(n) => n.children,
            Node::Text(_)
            | Node::Code(_)
            | Node::CodeBlock(_)
            | Node::Image(_)
            | Node::HorizontalRule
            | Node::LineBreak => &[],
        }
    }

    /// Stable lower-case name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Document(_) => "document",
            Node::Heading(_) => "heading",
            Node::Paragraph(_) => "paragraph",
            Node::Text(_) => "text",
            Node::Blockquote(_) => "blockquote",
            Node::List(_) => "list",
            Node::ListItem(_) => "list_item",
            Node::Code(_) => "code",
            Node::CodeBlock(_) => "code_block",
            Node::InlineBold(_) => "bold",
            Node::InlineItalics(_) => "italics",
            Node::Image(_) => "image",
            Node::Link(_) => "link",
            Node::HorizontalRule => "horizontal_rule",
            Node::LineBreak => "line_break",
        }
    }
}

/// Document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    /// Top-level blocks in document order.
    pub children: &'a [Node<'a>],
}

/// Section heading with level and inline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading<'a> {
    /// Heading level, always in `1..=6`.
    pub level: u8,
    pub children: &'a [Node<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paragraph<'a> {
    pub children: &'a [Node<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text<'a> {
    /// Unescaped text, not yet HTML-escaped.
    pub value: ByteStr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blockquote<'a> {
    pub children: &'a [Node<'a>],
}

/// A list block.
///
/// `ordered` and `marker` are taken from the first item and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct List<'a> {
    pub ordered: bool,
    /// `-`, `*` or `+` for unordered lists; the first digit byte of the first
    /// item for ordered lists. An opaque tag, not a start number.
    pub marker: u8,
    /// [`ListItem`] nodes.
    pub children: &'a [Node<'a>],
}

/// A list entry: a paragraph, then any nested lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem<'a> {
    pub children: &'a [Node<'a>],
}

/// Inline code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code<'a> {
    /// Raw bytes between the backtick runs.
    pub value: ByteStr<'a>,
}

/// Fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    /// Info string after the opening fence, if any.
    pub language: Option<ByteStr<'a>>,
    /// Verbatim content with interior newlines.
    pub value: ByteStr<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineBold<'a> {
    pub children: &'a [Node<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineItalics<'a> {
    pub children: &'a [Node<'a>],
}

/// Inline image. The alt text is kept flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image<'a> {
    pub alt: ByteStr<'a>,
    pub src: ByteStr<'a>,
    pub title: Option<ByteStr<'a>>,
}

/// Hyperlink with inline link text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<'a> {
    pub children: &'a [Node<'a>],
    pub href: ByteStr<'a>,
    pub title: Option<ByteStr<'a>>,
}

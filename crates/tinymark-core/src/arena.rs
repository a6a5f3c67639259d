//! Bump arena owning every node slice and synthesized string of a parse.
//!
//! A parse appends children into a scratch `Vec`, then freezes them into the
//! arena as an immutable slice. Everything is released together when the
//! arena is dropped or [`reset`](Arena::reset), never node by node.
//!
//! An optional byte budget turns runaway allocation into
//! [`ParseErrorKind::OutOfMemory`](crate::ParseErrorKind::OutOfMemory)
//! instead of growing the process without bound.

use std::cell::Cell;
use std::mem;

use bumpalo::Bump;

use crate::ast::Node;
use crate::error::ParseError;

/// Allocation region for one parse-render cycle.
///
/// # Example
///
/// ```rust
/// use tinymark_core::{parse, Arena};
///
/// let mut arena = Arena::with_limit(1 << 20);
/// {
///     let doc = parse(&arena, b"# Title").unwrap();
///     assert_eq!(doc.children().len(), 1);
/// }
/// arena.reset();
/// assert_eq!(arena.used_bytes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Arena {
    bump: Bump,
    limit: Option<usize>,
    used: Cell<usize>,
}

impl Arena {
    /// Create an arena with no budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena that refuses to hand out more than `limit` bytes
    /// between resets.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bump: Bump::new(),
            limit: Some(limit),
            used: Cell::new(0),
        }
    }

    /// The configured budget, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Bytes handed out since creation or the last reset.
    pub fn used_bytes(&self) -> usize {
        self.used.get()
    }

    /// Release everything allocated so far in one action.
    ///
    /// The largest backing chunk is kept for reuse by the next parse.
    pub fn reset(&mut self) {
        self.bump.reset();
        self.used.set(0);
    }

    /// Freeze a scratch vector of nodes into an immutable arena slice.
    pub(crate) fn alloc_nodes<'a>(
        &'a self,
        nodes: &[Node<'a>],
    ) -> Result<&'a [Node<'a>], ParseError> {
        if nodes.is_empty() {
            return Ok(&[]);
        }
        self.charge(mem::size_of_val(nodes))?;
        Ok(self.bump.alloc_slice_copy(nodes))
    }

    /// Copy a synthesized byte string into the arena.
    pub(crate) fn alloc_bytes(&self, bytes: &[u8]) -> Result<&[u8], ParseError> {
        if bytes.is_empty() {
            return Ok(&[]);
        }
        self.charge(bytes.len())?;
        Ok(self.bump.alloc_slice_copy(bytes))
    }

    fn charge(&self, bytes: usize) -> Result<(), ParseError> {
        let used = self.used.get().saturating_add(bytes);
        if let Some(limit) = self.limit {
            if used > limit {
                return Err(ParseError::out_of_memory(bytes));
            }
        }
        self.used.set(used);
        Ok(())
    }
}

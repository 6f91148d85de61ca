//! Error types for table construction, compilation and program execution.
//!
//! Every [`CompileError`] is a scene-validity failure: the compile pass is
//! aborted and no [`Program`](crate::compiler::Program) is produced.

use crate::compiler::{EvalKind, EvalOp};
use crate::texture::TexId;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CompileError {
    /// A texture document used a `type` tag outside the closed kind set.
    #[error("texture {name:?}: unknown texture kind {tag:?}")]
    UnknownKind { name: String, tag: String },

    /// A node record does not carry the number of children its kind needs.
    #[error("texture {node:?} ({kind}) expects {expected} children, got {found}")]
    ChildArity {
        node: TexId,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    /// A child reference does not point at an earlier node of the table.
    #[error("texture {node:?} references missing or later texture {child:?}")]
    DanglingChild { node: TexId, child: TexId },

    /// An image-backed node references an image the table does not hold.
    #[error("texture {node:?} references missing image {image}")]
    UnknownImage { node: TexId, image: u32 },

    /// Image pixel data does not match the declared size.
    #[error("image {name:?} declares {width}x{height} pixels but holds {found}")]
    ImageSize {
        name: String,
        width: u32,
        height: u32,
        found: usize,
    },

    /// A kind with a bounded inline parameter array received too much data.
    #[error("texture {node:?} ({kind}) holds {found} entries, capacity is {limit}")]
    CapacityExceeded {
        node: TexId,
        kind: &'static str,
        limit: usize,
        found: usize,
    },

    /// Band control points are unpaired or out of order.
    #[error("texture {node:?} has a malformed band: {reason}")]
    InvalidBand { node: TexId, reason: &'static str },

    /// An edit named a node the table does not hold.
    #[error("texture {node:?} is not part of a {count}-texture table")]
    UnknownNode { node: TexId, count: usize },

    /// A node cannot be removed while other nodes still reference it.
    #[error("texture {node:?} is still referenced by {by:?}")]
    StillReferenced { node: TexId, by: TexId },

    /// Recursion guard tripped while compiling `node` under `eval`.
    #[error("compiling {node:?} under {eval:?} exceeded nesting depth {limit}")]
    DepthLimit {
        node: TexId,
        eval: EvalKind,
        limit: usize,
    },
}

/// Contract violations detected by the reference interpreter.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExecError {
    #[error("value stack overflow at instruction {at} (capacity {capacity})")]
    StackOverflow { at: usize, capacity: usize },

    #[error("value stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    #[error("texture {node:?} is not part of a {count}-texture program")]
    NodeOutOfRange { node: TexId, count: usize },

    /// The instruction does not fit the rule of the node it names.
    #[error("instruction {at}: {op:?} is not valid for texture {node:?}")]
    InvalidOp { at: usize, node: TexId, op: EvalOp },

    #[error("span {start}+{len} is outside the {total}-instruction program")]
    SpanOutOfRange { start: usize, len: usize, total: usize },

    #[error("span for {node:?} under {eval:?} left {found} values, expected {expected}")]
    ResultWidth {
        node: TexId,
        eval: EvalKind,
        expected: usize,
        found: usize,
    },
}

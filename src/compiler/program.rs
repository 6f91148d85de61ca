//! Compiled program: flat instruction list plus per-node address tables.

use serde::{Deserialize, Serialize};

use crate::texture::TexId;

/// Result type a texture is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalKind {
    Float,
    Spectrum,
    Bump,
}

impl EvalKind {
    pub const ALL: [EvalKind; 3] = [EvalKind::Float, EvalKind::Spectrum, EvalKind::Bump];

    /// Number of stack slots a result of this kind occupies.
    pub fn width(self) -> usize {
        match self {
            EvalKind::Float => 1,
            EvalKind::Spectrum | EvalKind::Bump => 3,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// What an instruction does for its node.
///
/// The first three variants evaluate the node under that kind. The others
/// are the save/mutate steps of multi-step sequences: they never push a
/// result of their own, only saved context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalOp {
    Float,
    Spectrum,
    Bump,
    BumpOffsetU,
    BumpOffsetV,
    TriplanarStep1,
    TriplanarStep2,
    TriplanarStep3,
    DistortSetup,
}

impl EvalOp {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<EvalKind> for EvalOp {
    fn from(kind: EvalKind) -> Self {
        match kind {
            EvalKind::Float => EvalOp::Float,
            EvalKind::Spectrum => EvalOp::Spectrum,
            EvalKind::Bump => EvalOp::Bump,
        }
    }
}

/// One step of the program. Node parameters are read from the table at
/// execution time, never copied here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub node: TexId,
    pub op: EvalOp,
}

/// Address-table entry for one `(node, kind)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompiledSpan {
    pub start: usize,
    pub len: usize,
    /// Stack slots needed to run the span from an empty stack.
    pub stack_depth: usize,
}

impl CompiledSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Output of one full compile pass. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) spans: Vec<[CompiledSpan; 3]>,
    pub(crate) max_stack_depth: usize,
    pub(crate) bump_sample_distance: f32,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Address-table entry for `(node, kind)`, `None` when `node` was not
    /// part of the compiled table.
    pub fn span(&self, node: TexId, kind: EvalKind) -> Option<CompiledSpan> {
        self.spans.get(node.index()).map(|spans| spans[kind.index()])
    }

    /// Instructions of the span for `(node, kind)`.
    pub fn span_instructions(&self, node: TexId, kind: EvalKind) -> Option<&[Instruction]> {
        self.instructions.get(self.span(node, kind)?.range())
    }

    /// Every span in address-table order: node by node, FLOAT, SPECTRUM, BUMP.
    pub fn spans(&self) -> impl Iterator<Item = CompiledSpan> + '_ {
        self.spans.iter().flatten().copied()
    }

    pub fn node_count(&self) -> usize {
        self.spans.len()
    }

    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    pub fn bump_sample_distance(&self) -> f32 {
        self.bump_sample_distance
    }
}

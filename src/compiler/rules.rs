//! Evaluation-Kind Rule Table.
//!
//! Which children a node's program evaluates, under which kind and in which
//! order. [`crate::eval::Evaluator`] spells the same traversal out per kind
//! on its own, so the equivalence tests catch a wrong slot or forced kind
//! here.

use super::program::EvalKind;
use crate::texture::{Mapping3D, TextureKind};

/// Kind a child slot is compiled under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildKind {
    /// Same kind as the parent evaluation.
    Inherit,
    /// Always this kind, whatever the parent is compiled for.
    Forced(EvalKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildEval {
    pub slot: usize,
    pub kind: ChildKind,
}

impl ChildEval {
    const fn inherit(slot: usize) -> Self {
        Self {
            slot,
            kind: ChildKind::Inherit,
        }
    }

    const fn forced(slot: usize, kind: EvalKind) -> Self {
        Self {
            slot,
            kind: ChildKind::Forced(kind),
        }
    }

    pub fn resolve(&self, parent: EvalKind) -> EvalKind {
        match self.kind {
            ChildKind::Inherit => parent,
            ChildKind::Forced(kind) => kind,
        }
    }
}

/// Code generation shape of one `(kind, evaluation kind)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EvalRule<'a> {
    /// No children; the node's instruction pushes a fixed-width result.
    Leaf,
    /// Children compiled in the listed order, then one combining instruction.
    Combinator(&'static [ChildEval]),
    /// Finite differences over the node's own FLOAT program.
    GenericBump,
    /// Three projected SPECTRUM lookups interleaved with step instructions.
    Triplanar(&'a Mapping3D),
    /// Offset child, setup instruction, then the displaced child.
    Distort { strength: f32 },
}

use EvalKind::{Bump, Float, Spectrum};

const UNARY: &[ChildEval] = &[ChildEval::inherit(0)];
const BINARY: &[ChildEval] = &[ChildEval::inherit(0), ChildEval::inherit(1)];
const QUAD: &[ChildEval] = &[
    ChildEval::inherit(0),
    ChildEval::inherit(1),
    ChildEval::inherit(2),
    ChildEval::inherit(3),
];
const SCALAR_SECOND: &[ChildEval] = &[ChildEval::inherit(0), ChildEval::forced(1, Float)];
const MIX: &[ChildEval] = &[
    ChildEval::forced(0, Float),
    ChildEval::inherit(1),
    ChildEval::inherit(2),
];
const SCALE_BUMP: &[ChildEval] = &[
    ChildEval::forced(0, Bump),
    ChildEval::forced(1, Bump),
    ChildEval::forced(0, Float),
    ChildEval::forced(1, Float),
];
const MIX_BUMP: &[ChildEval] = &[
    ChildEval::forced(1, Bump),
    ChildEval::forced(2, Bump),
    ChildEval::forced(0, Bump),
    ChildEval::forced(1, Float),
    ChildEval::forced(2, Float),
    ChildEval::forced(0, Float),
];
const AMOUNT_ONLY: &[ChildEval] = &[ChildEval::forced(0, Float)];
const COLOR_ONLY: &[ChildEval] = &[ChildEval::forced(0, Spectrum)];
const HSV: &[ChildEval] = &[
    ChildEval::forced(0, Spectrum),
    ChildEval::forced(1, Float),
    ChildEval::forced(2, Float),
    ChildEval::forced(3, Float),
];
const THREE_SCALARS: &[ChildEval] = &[
    ChildEval::forced(0, Float),
    ChildEval::forced(1, Float),
    ChildEval::forced(2, Float),
];

/// Rule for compiling a node of `kind` under `eval`.
pub fn eval_rule(kind: &TextureKind, eval: EvalKind) -> EvalRule<'_> {
    use TextureKind::*;

    match (kind, eval) {
        // bump of a constant is the unperturbed shading normal
        (ConstFloat { .. } | ConstColor { .. }, _) => EvalRule::Leaf,

        (
            ImageMap { .. }
            | HitPointColor
            | HitPointAlpha
            | HitPointGrey { .. }
            | Uv { .. }
            | Fbm { .. }
            | Wrinkled { .. }
            | Windy { .. }
            | Marble { .. },
            Float | Spectrum,
        ) => EvalRule::Leaf,

        (Add | Subtract, _) => EvalRule::Combinator(BINARY),
        (Scale, Float | Spectrum) => EvalRule::Combinator(BINARY),
        (Scale, Bump) => EvalRule::Combinator(SCALE_BUMP),
        (Mix, Float | Spectrum) => EvalRule::Combinator(MIX),
        (Mix, Bump) => EvalRule::Combinator(MIX_BUMP),

        (Divide | Dots { .. } | Checkerboard2D { .. } | Checkerboard3D { .. }, Float | Spectrum) => {
            EvalRule::Combinator(BINARY)
        }
        (Bilerp, Float | Spectrum) => EvalRule::Combinator(QUAD),
        (Power | Modulo, Float | Spectrum) => EvalRule::Combinator(SCALAR_SECOND),
        (Abs | Clamp { .. }, Float | Spectrum) => EvalRule::Combinator(UNARY),
        (Band { .. }, Float | Spectrum) => EvalRule::Combinator(AMOUNT_ONLY),
        (HsvAdjust, Float | Spectrum) => EvalRule::Combinator(HSV),
        (SplitFloat3 { .. }, Float | Spectrum) => EvalRule::Combinator(COLOR_ONLY),
        (MakeFloat3, Float | Spectrum) => EvalRule::Combinator(THREE_SCALARS),

        // a normal map has no scalar or color value of its own
        (NormalMap { .. }, Float | Spectrum) => EvalRule::Leaf,
        (NormalMap { .. }, Bump) => EvalRule::Combinator(COLOR_ONLY),

        (Triplanar { mapping }, Float | Spectrum) => EvalRule::Triplanar(mapping),
        (Distort { strength }, _) => EvalRule::Distort {
            strength: *strength,
        },

        (
            ImageMap { .. }
            | HitPointColor
            | HitPointAlpha
            | HitPointGrey { .. }
            | Uv { .. }
            | Fbm { .. }
            | Wrinkled { .. }
            | Windy { .. }
            | Marble { .. }
            | Divide
            | Dots { .. }
            | Checkerboard2D { .. }
            | Checkerboard3D { .. }
            | Bilerp
            | Power
            | Modulo
            | Abs
            | Clamp { .. }
            | Band { .. }
            | HsvAdjust
            | SplitFloat3 { .. }
            | MakeFloat3
            | Triplanar { .. },
            Bump,
        ) => EvalRule::GenericBump,
    }
}

/// True when BUMP is computed in closed form rather than by finite differences.
pub fn has_analytic_bump(kind: &TextureKind) -> bool {
    eval_rule(kind, Bump) != EvalRule::GenericBump
}

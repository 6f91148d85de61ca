//! Host-side reference evaluators.
//!
//! Plain recursive evaluation straight off the [`TextureTable`]. This is the
//! meaning every compiled program must reproduce. The child traversal of
//! each kind is written out here independently of the compiler's rule
//! table; only the final per-node arithmetic, [`combine`], is shared with
//! the stack machine.

use glam::Vec3;

use crate::color::{hsv_adjust, luminance, Spectrum};
use crate::compiler::bump::{finite_difference_normal, offset_u, offset_v};
use crate::compiler::EvalKind;
use crate::config::CompilerConfig;
use crate::hitpoint::HitPoint;
use crate::texture::kernels::{self, per_channel};
use crate::texture::{TexId, TextureKind, TextureNode, TextureTable};

/// Result of one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Float(f32),
    /// SPECTRUM color or BUMP normal.
    Vector(Vec3),
}

impl Value {
    pub fn write_to(self, out: &mut Vec<f32>) {
        match self {
            Value::Float(v) => out.push(v),
            Value::Vector(v) => out.extend_from_slice(&v.to_array()),
        }
    }

    pub fn as_float(&self) -> f32 {
        match *self {
            Value::Float(v) => v,
            Value::Vector(v) => v.x,
        }
    }

    pub fn as_vector(&self) -> Vec3 {
        match *self {
            Value::Float(v) => Vec3::splat(v),
            Value::Vector(v) => v,
        }
    }
}

/// Child results of one node, read in push order.
pub(crate) struct Operands<'a> {
    values: &'a [f32],
}

impl<'a> Operands<'a> {
    pub(crate) fn new(values: &'a [f32]) -> Self {
        Self { values }
    }

    fn float(&mut self) -> f32 {
        let v = self.values[0];
        self.values = &self.values[1..];
        v
    }

    fn vector(&mut self) -> Vec3 {
        let v = Vec3::from_slice(&self.values[..3]);
        self.values = &self.values[3..];
        v
    }
}

/// Single-step value of `node` under `eval` from its already evaluated
/// children.
///
/// Returns `None` for BUMP of a kind without a closed-form rule; those go
/// through finite differences instead.
pub(crate) fn combine(
    table: &TextureTable,
    node: &TextureNode,
    eval: EvalKind,
    hp: &HitPoint,
    args: &mut Operands<'_>,
) -> Option<Value> {
    match eval {
        EvalKind::Float => Some(Value::Float(combine_float(table, &node.kind, hp, args))),
        EvalKind::Spectrum => Some(Value::Vector(combine_spectrum(table, &node.kind, hp, args))),
        EvalKind::Bump => combine_bump(&node.kind, hp, args).map(Value::Vector),
    }
}

fn combine_float(table: &TextureTable, kind: &TextureKind, hp: &HitPoint, a: &mut Operands<'_>) -> f32 {
    use TextureKind::*;

    match kind {
        ConstFloat { value } => *value,
        ConstColor { color } => luminance(*color),
        ImageMap { .. } | HitPointColor | Uv { .. } | Marble { .. } => {
            luminance(combine_spectrum(table, kind, hp, a))
        }
        HitPointAlpha => hp.alpha,
        HitPointGrey { channel } => kernels::hitpoint_grey(hp, *channel),
        Fbm { octaves, omega, mapping } => kernels::fbm_float(mapping, *omega, *octaves, hp),
        Wrinkled { octaves, omega, mapping } => kernels::wrinkled_float(mapping, *omega, *octaves, hp),
        Windy { mapping } => kernels::windy_float(mapping, hp),

        Scale => {
            let (x, y) = (a.float(), a.float());
            x * y
        }
        Add => {
            let (x, y) = (a.float(), a.float());
            x + y
        }
        Subtract => {
            let (x, y) = (a.float(), a.float());
            x - y
        }
        Mix => {
            let (amount, x, y) = (a.float(), a.float(), a.float());
            kernels::mix_float(amount, x, y)
        }
        Divide => {
            let (x, y) = (a.float(), a.float());
            kernels::safe_div(x, y)
        }
        Power => {
            let (base, exponent) = (a.float(), a.float());
            kernels::safe_pow(base, exponent)
        }
        Abs => a.float().abs(),
        Clamp { min, max } => kernels::clamp_float(a.float(), *min, *max),
        Modulo => {
            let (x, m) = (a.float(), a.float());
            kernels::safe_mod(x, m)
        }
        Dots { mapping } => {
            let (inside, outside) = (a.float(), a.float());
            if kernels::dots_inside(mapping, hp) { inside } else { outside }
        }
        Checkerboard2D { mapping } => {
            let (first, second) = (a.float(), a.float());
            if kernels::checker_first(mapping, hp) { first } else { second }
        }
        Checkerboard3D { mapping } => {
            let (first, second) = (a.float(), a.float());
            if kernels::checker3d_first(mapping, hp) { first } else { second }
        }
        Bilerp => {
            let corners = [a.float(), a.float(), a.float(), a.float()];
            kernels::bilerp_float(kernels::bilerp_weights(hp), corners)
        }
        Band { .. } | HsvAdjust | MakeFloat3 | Triplanar { .. } => {
            luminance(combine_spectrum(table, kind, hp, a))
        }
        SplitFloat3 { channel } => kernels::split_channel(a.vector(), *channel),
        NormalMap { .. } => 0.0,
        Distort { .. } => {
            a.vector();
            a.float()
        }
    }
}

fn combine_spectrum(table: &TextureTable, kind: &TextureKind, hp: &HitPoint, a: &mut Operands<'_>) -> Spectrum {
    use TextureKind::*;

    match kind {
        ConstFloat { value } => Vec3::splat(*value),
        ConstColor { color } => *color,
        ImageMap { image, gain, mapping } => kernels::image_spectrum(table.image(*image), *gain, mapping, hp),
        HitPointColor => hp.color,
        Uv { mapping } => kernels::uv_spectrum(mapping, hp),
        Marble {
            octaves,
            omega,
            scale,
            variation,
            mapping,
        } => kernels::marble_spectrum(mapping, *octaves, *omega, *scale, *variation, hp),
        HitPointAlpha | HitPointGrey { .. } | Fbm { .. } | Wrinkled { .. } | Windy { .. } => {
            Vec3::splat(combine_float(table, kind, hp, a))
        }

        Scale => {
            let (x, y) = (a.vector(), a.vector());
            x * y
        }
        Add => {
            let (x, y) = (a.vector(), a.vector());
            x + y
        }
        Subtract => {
            let (x, y) = (a.vector(), a.vector());
            x - y
        }
        Mix => {
            let (amount, x, y) = (a.float(), a.vector(), a.vector());
            kernels::mix_spectrum(amount, x, y)
        }
        Divide => {
            let (x, y) = (a.vector(), a.vector());
            per_channel(x, y, kernels::safe_div)
        }
        Power => {
            let (base, exponent) = (a.vector(), a.float());
            per_channel(base, Vec3::splat(exponent), kernels::safe_pow)
        }
        Abs => a.vector().abs(),
        Clamp { min, max } => kernels::clamp_spectrum(a.vector(), *min, *max),
        Modulo => {
            let (x, m) = (a.vector(), a.float());
            per_channel(x, Vec3::splat(m), kernels::safe_mod)
        }
        Dots { mapping } => {
            let (inside, outside) = (a.vector(), a.vector());
            if kernels::dots_inside(mapping, hp) { inside } else { outside }
        }
        Checkerboard2D { mapping } => {
            let (first, second) = (a.vector(), a.vector());
            if kernels::checker_first(mapping, hp) { first } else { second }
        }
        Checkerboard3D { mapping } => {
            let (first, second) = (a.vector(), a.vector());
            if kernels::checker3d_first(mapping, hp) { first } else { second }
        }
        Bilerp => {
            let corners = [a.vector(), a.vector(), a.vector(), a.vector()];
            kernels::bilerp_spectrum(kernels::bilerp_weights(hp), corners)
        }
        Band { offsets, values } => kernels::band_spectrum(offsets, values, a.float()),
        HsvAdjust => {
            let (c, hue, sat, val) = (a.vector(), a.float(), a.float(), a.float());
            hsv_adjust(c, hue, sat, val)
        }
        SplitFloat3 { channel } => Vec3::splat(kernels::split_channel(a.vector(), *channel)),
        MakeFloat3 => {
            let (x, y, z) = (a.float(), a.float(), a.float());
            Vec3::new(x, y, z)
        }
        NormalMap { .. } => Vec3::ZERO,
        Triplanar { .. } => {
            let (c1, c2, c3) = (a.vector(), a.vector(), a.vector());
            kernels::triplanar_blend(kernels::triplanar_weights(hp.shade_n), c1, c2, c3)
        }
        Distort { .. } => {
            a.vector();
            a.vector()
        }
    }
}

fn combine_bump(kind: &TextureKind, hp: &HitPoint, a: &mut Operands<'_>) -> Option<Vec3> {
    use TextureKind::*;

    let n = match kind {
        ConstFloat { .. } | ConstColor { .. } => hp.shade_n,
        Add => {
            let (n1, n2) = (a.vector(), a.vector());
            kernels::add_bump(hp, n1, n2)
        }
        Subtract => {
            let (n1, n2) = (a.vector(), a.vector());
            kernels::subtract_bump(hp, n1, n2)
        }
        Scale => {
            let (n1, n2, t1, t2) = (a.vector(), a.vector(), a.float(), a.float());
            kernels::scale_bump(hp, n1, n2, t1, t2)
        }
        Mix => {
            let (n1, n2, na) = (a.vector(), a.vector(), a.vector());
            let (t1, t2, amount) = (a.float(), a.float(), a.float());
            kernels::mix_bump(hp, [n1, n2, na], [t1, t2, amount])
        }
        NormalMap { scale } => kernels::normal_map_bump(hp, a.vector(), *scale),
        Distort { .. } => {
            a.vector();
            a.vector()
        }
        _ => return None,
    };
    Some(n)
}

/// Recursive evaluator over a table.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator<'a> {
    table: &'a TextureTable,
    sample_distance: f32,
}

impl<'a> Evaluator<'a> {
    pub fn new(table: &'a TextureTable, config: &CompilerConfig) -> Self {
        Self {
            table,
            sample_distance: config.bump_sample_distance,
        }
    }

    pub fn float(&self, id: TexId, hp: &HitPoint) -> f32 {
        self.evaluate(id, EvalKind::Float, hp).as_float()
    }

    pub fn spectrum(&self, id: TexId, hp: &HitPoint) -> Spectrum {
        self.evaluate(id, EvalKind::Spectrum, hp).as_vector()
    }

    pub fn bump(&self, id: TexId, hp: &HitPoint) -> Vec3 {
        self.evaluate(id, EvalKind::Bump, hp).as_vector()
    }

    pub fn evaluate(&self, id: TexId, eval: EvalKind, hp: &HitPoint) -> Value {
        use EvalKind::{Bump, Float, Spectrum};
        use TextureKind::*;

        let node = self.table.node(id);
        let mut args = Vec::with_capacity(12);
        let mut visit = |slot: usize, kind: EvalKind, at: &HitPoint| {
            self.evaluate(node.child(slot), kind, at).write_to(&mut args);
        };

        match (&node.kind, eval) {
            (Triplanar { mapping }, Float | Spectrum) => {
                let local = mapping.map(hp);
                for axis in 0..3 {
                    let projected = HitPoint {
                        uv: kernels::triplanar_uv(local, axis),
                        ..*hp
                    };
                    visit(axis, Spectrum, &projected);
                }
            }
            (Distort { strength }, _) => {
                let offset = self.spectrum(node.child(1), hp);
                let mut moved = *hp;
                kernels::distort(&mut moved, offset, *strength);
                Value::Vector(offset).write_to(&mut args);
                self.evaluate(node.child(0), eval, &moved).write_to(&mut args);
            }

            (ConstFloat { .. } | ConstColor { .. }, Bump) => {}
            (Add | Subtract, Bump) => {
                visit(0, Bump, hp);
                visit(1, Bump, hp);
            }
            (Scale, Bump) => {
                visit(0, Bump, hp);
                visit(1, Bump, hp);
                visit(0, Float, hp);
                visit(1, Float, hp);
            }
            (Mix, Bump) => {
                for slot in [1, 2, 0] {
                    visit(slot, Bump, hp);
                }
                for slot in [1, 2, 0] {
                    visit(slot, Float, hp);
                }
            }
            (NormalMap { .. }, Bump) => visit(0, Spectrum, hp),
            (_, Bump) => return Value::Vector(self.generic_bump(id, hp)),

            (
                ConstFloat { .. }
                | ConstColor { .. }
                | ImageMap { .. }
                | HitPointColor
                | HitPointAlpha
                | HitPointGrey { .. }
                | Uv { .. }
                | Fbm { .. }
                | Wrinkled { .. }
                | Windy { .. }
                | Marble { .. }
                | NormalMap { .. },
                _,
            ) => {}
            (Add | Subtract | Scale | Divide | Abs | Clamp { .. } | Dots { .. }, _)
            | (Checkerboard2D { .. } | Checkerboard3D { .. } | Bilerp, _) => {
                for slot in 0..node.children.len() {
                    visit(slot, eval, hp);
                }
            }
            (Mix, _) => {
                visit(0, Float, hp);
                visit(1, eval, hp);
                visit(2, eval, hp);
            }
            (Power | Modulo, _) => {
                visit(0, eval, hp);
                visit(1, Float, hp);
            }
            (Band { .. }, _) => visit(0, Float, hp),
            (HsvAdjust, _) => {
                visit(0, Spectrum, hp);
                for slot in 1..4 {
                    visit(slot, Float, hp);
                }
            }
            (SplitFloat3 { .. }, _) => visit(0, Spectrum, hp),
            (MakeFloat3, _) => {
                for slot in 0..3 {
                    visit(slot, Float, hp);
                }
            }
        }

        combine(self.table, node, eval, hp, &mut Operands::new(&args))
            .unwrap_or_else(|| Value::Vector(self.generic_bump(id, hp)))
    }

    fn generic_bump(&self, id: TexId, hp: &HitPoint) -> Vec3 {
        let f0 = self.float(id, hp);

        let mut moved = *hp;
        offset_u(&mut moved, self.sample_distance);
        let f_u = self.float(id, &moved);

        let mut moved = *hp;
        offset_v(&mut moved, self.sample_distance);
        let f_v = self.float(id, &moved);

        finite_difference_normal(hp, self.sample_distance, f0, f_u, f_v)
    }
}

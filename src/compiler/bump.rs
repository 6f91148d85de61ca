//! Generic Bump Strategy.
//!
//! Any node without a closed-form normal derivative gets its BUMP program by
//! running its own FLOAT program three times: at the hit point, nudged along
//! U, and nudged along V. The span looks like
//!
//! ```text
//! FLOAT(n)  BUMP_OFFSET_U  FLOAT(n)  BUMP_OFFSET_V  FLOAT(n)*  BUMP(n)
//! ```
//!
//! where `FLOAT(n)*` is the third scalar program without its final
//! instruction: the node's own BUMP instruction performs that last scalar
//! step itself and then combines the three samples. A generic span is thus
//! `3 * len(FLOAT) + 2` instructions long.
//!
//! Stack picture right before the combine, bottom to top:
//! `f0 | p shade_n uv (8 saved) | fU | fV`.

use glam::Vec3;

use super::{Compiler, EvalKind, EvalOp, Instruction};
use crate::error::CompileError;
use crate::hitpoint::HitPoint;
use crate::texture::TexId;

/// Context slots saved by the offset-U instruction.
pub const SAVED_CONTEXT_SLOTS: usize = 3 + 3 + 2;

/// Step in parameter space that moves the point by `sample_distance` along `tangent`.
pub fn parametric_step(tangent: Vec3, sample_distance: f32) -> f32 {
    let len = tangent.length();
    if len > 0.0 { sample_distance / len } else { sample_distance }
}

/// Nudge an unperturbed hit point along U.
pub fn offset_u(hp: &mut HitPoint, sample_distance: f32) {
    let du = parametric_step(hp.dpdu, sample_distance);
    hp.p += du * hp.dpdu;
    hp.uv.x += du;
    hp.shade_n = (hp.shade_n + du * hp.dndu).normalize_or_zero();
}

/// Nudge an unperturbed hit point along V.
pub fn offset_v(hp: &mut HitPoint, sample_distance: f32) {
    let dv = parametric_step(hp.dpdv, sample_distance);
    hp.p += dv * hp.dpdv;
    hp.uv.y += dv;
    hp.shade_n = (hp.shade_n + dv * hp.dndv).normalize_or_zero();
}

/// Perturbed shading normal from the three scalar samples.
///
/// `hp` must be the unperturbed hit point. The result faces the same side
/// as the shading normal.
pub fn finite_difference_normal(hp: &HitPoint, sample_distance: f32, f0: f32, f_u: f32, f_v: f32) -> Vec3 {
    let du = parametric_step(hp.dpdu, sample_distance);
    let dv = parametric_step(hp.dpdv, sample_distance);
    let dh_du = (f_u - f0) / du;
    let dh_dv = (f_v - f0) / dv;

    let bumped_dpdu = hp.dpdu + dh_du * hp.shade_n;
    let bumped_dpdv = hp.dpdv + dh_dv * hp.shade_n;
    let n = bumped_dpdu.cross(bumped_dpdv).normalize_or_zero();
    if n == Vec3::ZERO {
        return hp.shade_n;
    }
    if n.dot(hp.shade_n) < 0.0 { -n } else { n }
}

impl Compiler<'_> {
    /// Emit the finite-difference BUMP program of `id`.
    pub(super) fn compile_generic_bump(&mut self, id: TexId, level: usize) -> Result<usize, CompileError> {
        let mut depth = self.compile_node(id, EvalKind::Float, level + 1)?;

        self.emit(id, EvalOp::BumpOffsetU);
        depth += SAVED_CONTEXT_SLOTS;
        depth += self.compile_node(id, EvalKind::Float, level + 1)?;

        self.emit(id, EvalOp::BumpOffsetV);
        depth += self.compile_node(id, EvalKind::Float, level + 1)?;

        // the BUMP instruction stands in for the third scalar step
        let last = self.instructions.pop();
        debug_assert_eq!(
            last,
            Some(Instruction {
                node: id,
                op: EvalOp::Float
            })
        );
        self.emit(id, EvalOp::Bump);
        Ok(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_samples_keep_the_normal() {
        let hp = HitPoint::default();
        let n = finite_difference_normal(&hp, 0.001, 0.25, 0.25, 0.25);
        assert!((n - hp.shade_n).length() < 1e-6, "{n:?}");
    }

    #[test]
    fn rising_height_tilts_away_from_slope() {
        let hp = HitPoint::default();
        let n = finite_difference_normal(&hp, 0.001, 0.0, 0.001, 0.0);
        assert!(n.x < 0.0, "{n:?}");
        assert!(n.z > 0.0);
    }

    #[test]
    fn offsets_move_along_tangents() {
        let mut hp = HitPoint::default();
        hp.dpdu = Vec3::new(2.0, 0.0, 0.0);
        offset_u(&mut hp, 0.01);
        assert!((hp.p.x - 0.01).abs() < 1e-7);
        assert!((hp.uv.x - 0.005).abs() < 1e-7);

        let mut hp = HitPoint::default();
        offset_v(&mut hp, 0.01);
        assert!((hp.p.y - 0.01).abs() < 1e-7);
        assert_eq!(hp.shade_n, Vec3::Z);
    }

    #[test]
    fn degenerate_tangent_uses_raw_distance() {
        assert_eq!(parametric_step(Vec3::ZERO, 0.5), 0.5);
    }
}

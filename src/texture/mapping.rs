//! Coordinate-mapping wrappers shared by procedural and image leaves.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::hitpoint::HitPoint;

/// Affine remap of the hit point UV.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UvMapping2D {
    pub u_scale: f32,
    pub v_scale: f32,
    pub u_delta: f32,
    pub v_delta: f32,
}

impl Default for UvMapping2D {
    fn default() -> Self {
        Self {
            u_scale: 1.0,
            v_scale: 1.0,
            u_delta: 0.0,
            v_delta: 0.0,
        }
    }
}

impl UvMapping2D {
    pub fn map(&self, hp: &HitPoint) -> Vec2 {
        Vec2::new(
            hp.uv.x * self.u_scale + self.u_delta,
            hp.uv.y * self.v_scale + self.v_delta,
        )
    }
}

/// Maps the hit point into a 3D texture space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mapping3D {
    /// World position scaled then translated.
    Global { scale: Vec3, translate: Vec3 },
    /// `(u, v, 0)` scaled then translated.
    Uv { scale: Vec3, translate: Vec3 },
}

impl Default for Mapping3D {
    fn default() -> Self {
        Mapping3D::Global {
            scale: Vec3::ONE,
            translate: Vec3::ZERO,
        }
    }
}

impl Mapping3D {
    pub fn map(&self, hp: &HitPoint) -> Vec3 {
        match *self {
            Mapping3D::Global { scale, translate } => hp.p * scale + translate,
            Mapping3D::Uv { scale, translate } => hp.uv.extend(0.0) * scale + translate,
        }
    }
}

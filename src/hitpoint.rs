//! Surface hit-point record every texture is evaluated against.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Evaluation context for one ray-surface intersection.
///
/// `p`, `shade_n` and `uv` are the mutable fields: multi-step and bump
/// programs overwrite them temporarily and must restore them bit-exactly.
/// Everything else is read-only for the duration of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPoint {
    pub p: Vec3,
    pub shade_n: Vec3,
    pub uv: Vec2,

    pub geometry_n: Vec3,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    pub dndu: Vec3,
    pub dndv: Vec3,

    pub color: Vec3,
    pub alpha: f32,
}

impl Default for HitPoint {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            shade_n: Vec3::Z,
            uv: Vec2::ZERO,
            geometry_n: Vec3::Z,
            dpdu: Vec3::X,
            dpdv: Vec3::Y,
            dndu: Vec3::ZERO,
            dndv: Vec3::ZERO,
            color: Vec3::ONE,
            alpha: 1.0,
        }
    }
}

impl HitPoint {
    /// Hit point on the z=0 plane at `p`, with `uv` taken from `p.xy`.
    pub fn on_plane(p: Vec3) -> Self {
        Self {
            p,
            uv: Vec2::new(p.x, p.y),
            ..Self::default()
        }
    }

    /// `p`, `shade_n`, `uv` flattened in stack order.
    pub fn save_context(&self) -> [f32; 8] {
        let [px, py, pz] = self.p.to_array();
        let [nx, ny, nz] = self.shade_n.to_array();
        [px, py, pz, nx, ny, nz, self.uv.x, self.uv.y]
    }

    pub fn restore_context(&mut self, saved: &[f32]) {
        self.p = Vec3::from_slice(&saved[0..3]);
        self.shade_n = Vec3::from_slice(&saved[3..6]);
        self.uv = Vec2::from_slice(&saved[6..8]);
    }

    /// `p` and `uv` flattened in stack order.
    pub fn save_position_uv(&self) -> [f32; 5] {
        [self.p.x, self.p.y, self.p.z, self.uv.x, self.uv.y]
    }

    pub fn restore_position_uv(&mut self, saved: &[f32]) {
        self.p = Vec3::from_slice(&saved[0..3]);
        self.uv = Vec2::from_slice(&saved[3..5]);
    }

    /// Snapshot of the fields a program is allowed to mutate.
    pub fn mutable_state(&self) -> MutableState {
        MutableState {
            p: self.p,
            shade_n: self.shade_n,
            uv: self.uv,
        }
    }
}

/// The mutable part of a [`HitPoint`], compared bitwise after evaluation.
#[derive(Clone, Copy, Debug)]
pub struct MutableState {
    pub p: Vec3,
    pub shade_n: Vec3,
    pub uv: Vec2,
}

impl MutableState {
    pub fn bits(&self) -> [u32; 8] {
        [
            self.p.x.to_bits(),
            self.p.y.to_bits(),
            self.p.z.to_bits(),
            self.shade_n.x.to_bits(),
            self.shade_n.y.to_bits(),
            self.shade_n.z.to_bits(),
            self.uv.x.to_bits(),
            self.uv.y.to_bits(),
        ]
    }

    pub fn bit_identical(&self, other: &MutableState) -> bool {
        self.bits() == other.bits()
    }
}

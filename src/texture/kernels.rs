//! Per-kind numeric kernels.
//!
//! Both the recursive reference evaluator and the stack-machine interpreter
//! combine child values through these functions, so the two paths agree
//! bit-for-bit as long as they feed the same inputs in the same order.

use glam::{Vec2, Vec3};

use super::mapping::{Mapping3D, UvMapping2D};
use super::noise::{fbm, noise2, turbulence};
use super::ImageMap;
use crate::color::{luminance, Spectrum};
use crate::hitpoint::HitPoint;

pub fn image_spectrum(image: &ImageMap, gain: f32, mapping: &UvMapping2D, hp: &HitPoint) -> Spectrum {
    gain * image.lookup(mapping.map(hp))
}

pub fn hitpoint_grey(hp: &HitPoint, channel: Option<u8>) -> f32 {
    match channel {
        Some(c @ 0..=2) => hp.color[c as usize],
        _ => luminance(hp.color),
    }
}

pub fn uv_spectrum(mapping: &UvMapping2D, hp: &HitPoint) -> Spectrum {
    let uv = mapping.map(hp);
    Vec3::new(uv.x - uv.x.floor(), uv.y - uv.y.floor(), 0.0)
}

pub fn fbm_float(mapping: &Mapping3D, omega: f32, octaves: u32, hp: &HitPoint) -> f32 {
    fbm(mapping.map(hp), omega, octaves)
}

pub fn wrinkled_float(mapping: &Mapping3D, omega: f32, octaves: u32, hp: &HitPoint) -> f32 {
    turbulence(mapping.map(hp), omega, octaves)
}

pub fn windy_float(mapping: &Mapping3D, hp: &HitPoint) -> f32 {
    let p = mapping.map(hp);
    let wind_strength = fbm(0.1 * p, 0.5, 3);
    let wave_height = fbm(p, 0.5, 6);
    wind_strength.abs() * wave_height
}

const MARBLE_COLORS: [[f32; 3]; 9] = [
    [0.58, 0.58, 0.6],
    [0.58, 0.58, 0.6],
    [0.58, 0.58, 0.6],
    [0.5, 0.5, 0.5],
    [0.6, 0.59, 0.58],
    [0.58, 0.58, 0.6],
    [0.58, 0.58, 0.6],
    [0.2, 0.2, 0.33],
    [0.58, 0.58, 0.6],
];

pub fn marble_spectrum(
    mapping: &Mapping3D,
    octaves: u32,
    omega: f32,
    scale: f32,
    variation: f32,
    hp: &HitPoint,
) -> Spectrum {
    let p = mapping.map(hp) * scale;
    let marble = p.y + variation * fbm(p, omega, octaves);
    let t = 0.5 + 0.5 * marble.sin();

    // cubic bezier over a 4-color window, de Casteljau
    let segments = MARBLE_COLORS.len() - 3;
    let first = ((t * segments as f32).floor() as usize).min(segments - 1);
    let t = t * segments as f32 - first as f32;
    let c = |i: usize| Vec3::from_array(MARBLE_COLORS[first + i]);
    let s0 = c(0).lerp(c(1), t);
    let s1 = c(1).lerp(c(2), t);
    let s2 = c(2).lerp(c(3), t);
    let s0 = s0.lerp(s1, t);
    let s1 = s1.lerp(s2, t);
    1.5 * s0.lerp(s1, t)
}

pub fn mix_float(amount: f32, a: f32, b: f32) -> f32 {
    let t = amount.clamp(0.0, 1.0);
    (1.0 - t) * a + t * b
}

pub fn mix_spectrum(amount: f32, a: Spectrum, b: Spectrum) -> Spectrum {
    let t = amount.clamp(0.0, 1.0);
    (1.0 - t) * a + t * b
}

/// Division that yields 0 for a zero divisor.
pub fn safe_div(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a / b }
}

/// `base^exponent`, 0 when the result would be complex.
pub fn safe_pow(base: f32, exponent: f32) -> f32 {
    if base < 0.0 && exponent.fract() != 0.0 {
        0.0
    } else {
        base.powf(exponent)
    }
}

/// Positive remainder, 0 for a zero modulo.
pub fn safe_mod(value: f32, modulo: f32) -> f32 {
    if modulo == 0.0 {
        return 0.0;
    }
    let v = value % modulo;
    if v >= 0.0 { v } else { v + modulo.abs() }
}

/// Clamp that tolerates `min > max` (the upper bound wins).
pub fn clamp_float(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

pub fn clamp_spectrum(c: Spectrum, min: f32, max: f32) -> Spectrum {
    c.max(Vec3::splat(min)).min(Vec3::splat(max))
}

/// Apply a scalar kernel per channel.
pub fn per_channel(a: Spectrum, b: Spectrum, f: impl Fn(f32, f32) -> f32) -> Spectrum {
    Vec3::new(f(a.x, b.x), f(a.y, b.y), f(a.z, b.z))
}

/// True when the mapped UV lies inside a polka dot.
pub fn dots_inside(mapping: &UvMapping2D, hp: &HitPoint) -> bool {
    let uv = mapping.map(hp);
    let s_cell = (uv.x + 0.5).floor();
    let t_cell = (uv.y + 0.5).floor();
    if noise2(s_cell + 0.5, t_cell + 0.5) > 0.0 {
        let radius = 0.35;
        let max_shift = 0.5 - radius;
        let s_center = s_cell + max_shift * noise2(s_cell + 1.5, t_cell + 2.8);
        let t_center = t_cell + max_shift * noise2(s_cell + 4.5, t_cell + 9.8);
        let ds = uv.x - s_center;
        let dt = uv.y - t_center;
        return ds * ds + dt * dt < radius * radius;
    }
    false
}

/// True on the squares that show the first texture.
pub fn checker_first(mapping: &UvMapping2D, hp: &HitPoint) -> bool {
    let uv = mapping.map(hp);
    ((uv.x.floor() + uv.y.floor()) as i64).rem_euclid(2) == 0
}

/// Piecewise-linear color band lookup.
///
/// `offsets` must be sorted and as long as `values`; [`super::TextureTable`]
/// rejects anything else. A NaN amount reads the first control point.
pub fn band_spectrum(offsets: &[f32], values: &[Vec3], amount: f32) -> Spectrum {
    let n = offsets.len().min(values.len());
    if n == 0 {
        return Vec3::ZERO;
    }
    if amount.is_nan() || amount < offsets[0] {
        return values[0];
    }
    if amount >= offsets[n - 1] {
        return values[n - 1];
    }
    let upper = offsets[..n].partition_point(|&o| o <= amount);
    if upper == 0 || upper >= n {
        return values[upper.min(n - 1)];
    }
    let lower = upper - 1;
    let span = offsets[upper] - offsets[lower];
    let t = if span > 0.0 { (amount - offsets[lower]) / span } else { 0.0 };
    values[lower].lerp(values[upper], t)
}

/// True on the cells of the 3D checker that show the first texture.
pub fn checker3d_first(mapping: &Mapping3D, hp: &HitPoint) -> bool {
    let p = mapping.map(hp);
    ((p.x.floor() + p.y.floor() + p.z.floor()) as i64).rem_euclid(2) == 0
}

/// Fractional UV used to weight the four corners of a bilinear patch.
pub fn bilerp_weights(hp: &HitPoint) -> Vec2 {
    let u = hp.uv.x - hp.uv.x.floor();
    let v = hp.uv.y - hp.uv.y.floor();
    Vec2::new(u, v)
}

pub fn bilerp_float(w: Vec2, [t00, t01, t10, t11]: [f32; 4]) -> f32 {
    let lo = (1.0 - w.y) * t00 + w.y * t01;
    let hi = (1.0 - w.y) * t10 + w.y * t11;
    (1.0 - w.x) * lo + w.x * hi
}

pub fn bilerp_spectrum(w: Vec2, [t00, t01, t10, t11]: [Spectrum; 4]) -> Spectrum {
    let lo = (1.0 - w.y) * t00 + w.y * t01;
    let hi = (1.0 - w.y) * t10 + w.y * t11;
    (1.0 - w.x) * lo + w.x * hi
}

pub fn split_channel(c: Spectrum, channel: u8) -> f32 {
    c[(channel as usize).min(2)]
}

/// Per-axis blend weights from the shading normal, summing to 1.
pub fn triplanar_weights(shade_n: Vec3) -> Vec3 {
    let w = shade_n.abs();
    let sum = w.x + w.y + w.z;
    if sum > 0.0 { w / sum } else { Vec3::splat(1.0 / 3.0) }
}

/// Projection of `local` onto the plane orthogonal to `axis`.
pub fn triplanar_uv(local: Vec3, axis: usize) -> Vec2 {
    match axis {
        0 => Vec2::new(local.y, local.z),
        1 => Vec2::new(local.x, local.z),
        _ => Vec2::new(local.x, local.y),
    }
}

pub fn triplanar_blend(weights: Vec3, c1: Spectrum, c2: Spectrum, c3: Spectrum) -> Spectrum {
    weights.x * c1 + weights.y * c2 + weights.z * c3
}

/// Move the hit point by a distortion offset.
pub fn distort(hp: &mut HitPoint, offset: Vec3, strength: f32) {
    hp.p += strength * offset;
    hp.uv += strength * offset.truncate();
}

/// Orthonormal shading frame `(shade_n, u, v)`.
pub fn shading_frame(hp: &HitPoint) -> (Vec3, Vec3, Vec3) {
    let n = hp.shade_n;
    let u = hp.dpdu.normalize_or_zero();
    let v = n.cross(u).normalize_or_zero();
    (n, u, v)
}

fn slopes(n: Vec3, frame: (Vec3, Vec3, Vec3)) -> (f32, f32) {
    let (shade_n, u, v) = frame;
    let nn = n.dot(shade_n);
    (safe_div(n.dot(u), nn), safe_div(n.dot(v), nn))
}

fn normal_from_slopes(frame: (Vec3, Vec3, Vec3), du: f32, dv: f32) -> Vec3 {
    let (shade_n, u, v) = frame;
    (shade_n + du * u + dv * v).normalize_or_zero()
}

pub fn add_bump(hp: &HitPoint, n1: Vec3, n2: Vec3) -> Vec3 {
    (n1 + n2 - hp.shade_n).normalize_or_zero()
}

pub fn subtract_bump(hp: &HitPoint, n1: Vec3, n2: Vec3) -> Vec3 {
    (n1 - n2 + hp.shade_n).normalize_or_zero()
}

/// Product rule over two bumped normals and their scalar values.
pub fn scale_bump(hp: &HitPoint, n1: Vec3, n2: Vec3, t1: f32, t2: f32) -> Vec3 {
    let frame = shading_frame(hp);
    let (du1, dv1) = slopes(n1, frame);
    let (du2, dv2) = slopes(n2, frame);
    let du = du1 * t2 + t1 * du2;
    let dv = dv1 * t2 + t1 * dv2;
    normal_from_slopes(frame, du, dv)
}

pub fn mix_bump(
    hp: &HitPoint,
    [n1, n2, na]: [Vec3; 3],
    [t1, t2, amount]: [f32; 3],
) -> Vec3 {
    let frame = shading_frame(hp);
    let (du1, dv1) = slopes(n1, frame);
    let (du2, dv2) = slopes(n2, frame);
    let (dua, dva) = slopes(na, frame);
    let amt = amount.clamp(0.0, 1.0);
    let du = mix_float(amt, du1, du2) + dua * (t2 - t1);
    let dv = mix_float(amt, dv1, dv2) + dva * (t2 - t1);
    normal_from_slopes(frame, du, dv)
}

/// Tangent-space normal map color to a shading-space normal.
pub fn normal_map_bump(hp: &HitPoint, rgb: Spectrum, scale: f32) -> Vec3 {
    let rgb = rgb.clamp(Vec3::ZERO, Vec3::ONE);
    let t = 2.0 * rgb - Vec3::ONE;
    let (n, u, v) = shading_frame(hp);
    let bumped = (scale * t.x * u + scale * t.y * v + t.z * n).normalize_or_zero();
    if bumped.dot(n) < 0.0 { -bumped } else { bumped }
}

#![allow(dead_code)]

use glam::{Vec2, Vec3};
use proptest::prelude::*;

use texture_expr_compiler::texture::{ImageMap, Mapping3D, UvMapping2D};
use texture_expr_compiler::{HitPoint, TexId, TextureKind, TextureTable};

pub fn push(table: &mut TextureTable, name: &str, kind: TextureKind, children: &[TexId]) -> TexId {
    table
        .push(name, kind, children.to_vec())
        .unwrap_or_else(|e| panic!("push {name}: {e}"))
}

pub fn constant(table: &mut TextureTable, name: &str, value: f32) -> TexId {
    push(table, name, TextureKind::ConstFloat { value }, &[])
}

pub fn color(table: &mut TextureTable, name: &str, c: Vec3) -> TexId {
    push(table, name, TextureKind::ConstColor { color: c }, &[])
}

/// A table exercising every node kind, including nested multi-step kinds
/// and shared children.
pub fn every_kind_table() -> TextureTable {
    let mut t = TextureTable::new();
    let image = t
        .add_image(ImageMap {
            name: "checker".into(),
            width: 2,
            height: 2,
            pixels: vec![
                Vec3::new(0.9, 0.1, 0.1),
                Vec3::new(0.1, 0.9, 0.1),
                Vec3::new(0.1, 0.1, 0.9),
                Vec3::new(0.5, 0.5, 0.5),
            ],
        })
        .unwrap();
    let uv_mapping = UvMapping2D {
        u_scale: 3.0,
        v_scale: 2.0,
        u_delta: 0.1,
        v_delta: -0.2,
    };
    let local = Mapping3D::Global {
        scale: Vec3::splat(1.5),
        translate: Vec3::new(0.3, 0.0, -0.1),
    };

    let half = constant(&mut t, "half", 0.5);
    let two = constant(&mut t, "two", 2.0);
    let zero = constant(&mut t, "zero", 0.0);
    let orange = color(&mut t, "orange", Vec3::new(1.0, 0.5, 0.1));
    let teal = color(&mut t, "teal", Vec3::new(0.1, 0.6, 0.5));

    let img = push(
        &mut t,
        "img",
        TextureKind::ImageMap {
            image,
            gain: 1.2,
            mapping: uv_mapping,
        },
        &[],
    );
    let vcol = push(&mut t, "vcol", TextureKind::HitPointColor, &[]);
    let valpha = push(&mut t, "valpha", TextureKind::HitPointAlpha, &[]);
    let vgrey = push(&mut t, "vgrey", TextureKind::HitPointGrey { channel: Some(1) }, &[]);
    let vlum = push(&mut t, "vlum", TextureKind::HitPointGrey { channel: None }, &[]);
    let uv = push(&mut t, "uv", TextureKind::Uv { mapping: uv_mapping }, &[]);
    let fbm = push(
        &mut t,
        "fbm",
        TextureKind::Fbm {
            octaves: 4,
            omega: 0.5,
            mapping: local,
        },
        &[],
    );
    let wrinkled = push(
        &mut t,
        "wrinkled",
        TextureKind::Wrinkled {
            octaves: 3,
            omega: 0.6,
            mapping: Mapping3D::default(),
        },
        &[],
    );
    let windy = push(&mut t, "windy", TextureKind::Windy { mapping: local }, &[]);
    let marble = push(
        &mut t,
        "marble",
        TextureKind::Marble {
            octaves: 4,
            omega: 0.5,
            scale: 2.0,
            variation: 0.3,
            mapping: Mapping3D::Uv {
                scale: Vec3::ONE,
                translate: Vec3::ZERO,
            },
        },
        &[],
    );

    let scaled = push(&mut t, "scaled", TextureKind::Scale, &[fbm, img]);
    let sum = push(&mut t, "sum", TextureKind::Add, &[wrinkled, windy]);
    let diff = push(&mut t, "diff", TextureKind::Subtract, &[uv, orange]);
    let _mix = push(&mut t, "mix", TextureKind::Mix, &[fbm, orange, teal]);
    let _div = push(&mut t, "div", TextureKind::Divide, &[vcol, two]);
    let _div_zero = push(&mut t, "div_zero", TextureKind::Divide, &[half, zero]);
    let pow = push(&mut t, "pow", TextureKind::Power, &[marble, two]);
    let abs = push(&mut t, "abs", TextureKind::Abs, &[diff]);
    let _clamp = push(&mut t, "clamp", TextureKind::Clamp { min: 0.2, max: 0.8 }, &[sum]);
    let _modulo = push(&mut t, "modulo", TextureKind::Modulo, &[scaled, half]);
    let _dots = push(&mut t, "dots", TextureKind::Dots { mapping: uv_mapping }, &[orange, fbm]);
    let checker = push(
        &mut t,
        "checker",
        TextureKind::Checkerboard2D { mapping: uv_mapping },
        &[teal, windy],
    );
    let band = push(
        &mut t,
        "band",
        TextureKind::Band {
            offsets: vec![0.0, 0.3, 0.7, 1.0],
            values: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
        },
        &[wrinkled],
    );
    // inf * 0 feeds the band a NaN amount
    let neg_one = constant(&mut t, "neg_one", -1.0);
    let inf = push(&mut t, "inf", TextureKind::Power, &[zero, neg_one]);
    let nan = push(&mut t, "nan", TextureKind::Scale, &[inf, zero]);
    let _band_nan = push(
        &mut t,
        "band_nan",
        TextureKind::Band {
            offsets: vec![0.0, 1.0],
            values: vec![Vec3::X, Vec3::Y],
        },
        &[nan],
    );
    let checker3d = push(
        &mut t,
        "checker3d",
        TextureKind::Checkerboard3D { mapping: local },
        &[fbm, orange],
    );
    let _bilerp = push(&mut t, "bilerp", TextureKind::Bilerp, &[orange, checker3d, valpha, img]);
    let hsv = push(&mut t, "hsv", TextureKind::HsvAdjust, &[img, valpha, vgrey, half]);
    let split = push(&mut t, "split", TextureKind::SplitFloat3 { channel: 2 }, &[marble]);
    let _make = push(&mut t, "make", TextureKind::MakeFloat3, &[fbm, vlum, split]);
    let normal = push(&mut t, "normal", TextureKind::NormalMap { scale: 0.7 }, &[img]);

    let tri = push(&mut t, "tri", TextureKind::Triplanar { mapping: local }, &[img, uv, marble]);
    let _tri_nested = push(
        &mut t,
        "tri_nested",
        TextureKind::Triplanar {
            mapping: Mapping3D::default(),
        },
        &[tri, hsv, band],
    );
    let _distort = push(&mut t, "distort", TextureKind::Distort { strength: 0.4 }, &[tri, fbm]);
    let distort_bumpy = push(
        &mut t,
        "distort_bumpy",
        TextureKind::Distort { strength: 0.2 },
        &[pow, uv],
    );

    // analytic bump combinators over generic children
    let _bump_sum = push(&mut t, "bump_sum", TextureKind::Add, &[fbm, normal]);
    let bump_scale = push(&mut t, "bump_scale", TextureKind::Scale, &[windy, distort_bumpy]);
    let bump_mix = push(&mut t, "bump_mix", TextureKind::Mix, &[checker, bump_scale, abs]);
    let _shared = push(&mut t, "shared", TextureKind::Subtract, &[bump_mix, bump_mix]);

    t
}

pub fn vec3_in(range: std::ops::Range<f32>) -> impl Strategy<Value = Vec3> {
    (range.clone(), range.clone(), range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

prop_compose! {
    /// Hit points with a well-formed, non-degenerate shading frame.
    pub fn hit_point()(
        p in vec3_in(-4.0..4.0),
        uv in (-2.0f32..2.0, -2.0f32..2.0),
        tilt in vec3_in(-0.6..0.6),
        dpdu_len in 0.2f32..3.0,
        dpdv_len in 0.2f32..3.0,
        dndu in vec3_in(-0.5..0.5),
        dndv in vec3_in(-0.5..0.5),
        color in vec3_in(0.0..1.0),
        alpha in 0.0f32..1.0,
    ) -> HitPoint {
        let n = (Vec3::Z + tilt).normalize();
        let u = n.any_orthonormal_vector();
        let v = n.cross(u);
        HitPoint {
            p,
            shade_n: n,
            uv: Vec2::new(uv.0, uv.1),
            geometry_n: n,
            dpdu: u * dpdu_len,
            dpdv: v * dpdv_len,
            dndu,
            dndv,
            color,
            alpha,
        }
    }
}

pub fn same_bits(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

pub fn same_bits3(a: Vec3, b: Vec3) -> bool {
    same_bits(a.x, b.x) && same_bits(a.y, b.y) && same_bits(a.z, b.z)
}

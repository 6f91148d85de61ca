use glam::Vec3;

/// Three-channel linear RGB value.
pub type Spectrum = Vec3;

fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// CIE Y of a linear sRGB value.
pub fn luminance(c: Spectrum) -> f32 {
    // https://en.wikipedia.org/wiki/Relative_luminance
    0.212_671 * c.x + 0.715_160 * c.y + 0.072_169 * c.z
}

pub fn rgb_to_hsv(c: Spectrum) -> Vec3 {
    // https://en.wikipedia.org/wiki/HSL_and_HSV#From_RGB
    let max = c.max_element();
    let min = c.min_element();
    let chroma = max - min;

    let v = max;
    let s = if max > 0.0 { chroma / max } else { 0.0 };

    let h = if chroma <= 0.0 {
        0.0
    } else if max == c.x {
        ((c.y - c.z) / chroma).rem_euclid(6.0)
    } else if max == c.y {
        (c.z - c.x) / chroma + 2.0
    } else {
        (c.x - c.y) / chroma + 4.0
    };

    Vec3::new(h / 6.0, s, v)
}

pub fn hsv_to_rgb([h, s, v]: [f32; 3]) -> Spectrum {
    // https://en.wikipedia.org/wiki/HSL_and_HSV#HSV_to_RGB
    if s <= 0.0 {
        return Vec3::splat(v);
    }
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

/// Hue rotation, saturation and value scaling, all in HSV space.
///
/// `hue` is a turn fraction where 0.5 means "no shift"; saturation is
/// clamped to [0, 1] after scaling, value is left unbounded.
pub fn hsv_adjust(c: Spectrum, hue: f32, saturation: f32, value: f32) -> Spectrum {
    let hsv = rgb_to_hsv(c);
    let h = hsv.x + (hue - 0.5);
    let s = clamp01(hsv.y * saturation);
    let v = hsv.z * value;
    hsv_to_rgb([h, s, v])
}

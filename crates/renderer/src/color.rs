//! Iteration-count to color mapping.

use fractal_common::ColorScheme;

/// Map an escape count to an RGB triple.
///
/// Interior points (count == max_iterations) are black in every scheme so
/// the set itself stays visible. The mapping is deterministic and, within
/// a scheme, distinct counts map to distinct colors often enough to keep
/// banding structure readable.
pub fn map_count(scheme: ColorScheme, count: u32, max_iterations: u32) -> [u8; 3] {
    if count >= max_iterations {
        return [0, 0, 0];
    }

    match scheme {
        ColorScheme::Classic => classic(count),
        ColorScheme::Monochrome => {
            let v = level(count, max_iterations);
            [v, v, v]
        }
        ColorScheme::Fire => gradient(&FIRE_STOPS, fraction(count, max_iterations)),
        ColorScheme::BlueShades => gradient(&BLUE_STOPS, fraction(count, max_iterations)),
        ColorScheme::Pastel => gradient(&PASTEL_STOPS, fraction(count, max_iterations)),
    }
}

/// The original per-channel factor mapping: count x12 / x7 / x3, mod 256.
fn classic(count: u32) -> [u8; 3] {
    let count = count as u64;
    [
        ((count * 12) % 256) as u8,
        ((count * 7) % 256) as u8,
        ((count * 3) % 256) as u8,
    ]
}

#[inline]
fn fraction(count: u32, max_iterations: u32) -> f64 {
    count as f64 / max_iterations as f64
}

#[inline]
fn level(count: u32, max_iterations: u32) -> u8 {
    (fraction(count, max_iterations) * 255.0) as u8
}

const FIRE_STOPS: [[u8; 3]; 5] = [
    [0, 0, 0],
    [128, 0, 0],
    [255, 64, 0],
    [255, 200, 0],
    [255, 255, 220],
];

const BLUE_STOPS: [[u8; 3]; 4] = [
    [0, 0, 32],
    [0, 64, 160],
    [80, 160, 255],
    [230, 245, 255],
];

const PASTEL_STOPS: [[u8; 3]; 5] = [
    [120, 140, 200],
    [180, 160, 220],
    [230, 180, 200],
    [250, 220, 180],
    [210, 240, 210],
];

/// Piecewise-linear interpolation across gradient stops.
fn gradient(stops: &[[u8; 3]], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let segments = stops.len() - 1;
    let scaled = t * segments as f64;
    let i = (scaled as usize).min(segments - 1);
    let frac = scaled - i as f64;
    interpolate(stops[i], stops[i + 1], frac)
}

/// Linear color interpolation.
fn interpolate(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let inv = 1.0 - t;
    [
        (a[0] as f64 * inv + b[0] as f64 * t) as u8,
        (a[1] as f64 * inv + b[1] as f64 * t) as u8,
        (a[2] as f64 * inv + b[2] as f64 * t) as u8,
    ]
}

//! Escape-time iteration and raster generation.

use rayon::prelude::*;

use fractal_common::{FractalKind, FractalSpec, PipelineError, PipelineResult};

use crate::color;

// Fixed viewport over the complex plane. The spec's center/zoom fields are
// intentionally not consumed; output stays byte-compatible with the
// original renderer.
const RE_MIN: f64 = -2.5;
const RE_SPAN: f64 = 3.5;
const IM_MIN: f64 = -1.0;
const IM_SPAN: f64 = 2.0;

/// Julia iteration constant.
const JULIA_RE: f64 = -0.7;
const JULIA_IM: f64 = 0.27015;

/// Squared escape radius; |z| > 2 is |z|^2 > 4.
const ESCAPE_SQ: f64 = 4.0;

/// RGBA raster, 4 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Map a pixel to its point on the complex plane.
#[inline]
fn pixel_to_plane(x: u32, y: u32, width: u32, height: u32) -> (f64, f64) {
    let re = (x as f64 / width as f64) * RE_SPAN + RE_MIN;
    let im = (y as f64 / height as f64) * IM_SPAN + IM_MIN;
    (re, im)
}

/// Escape step count for a single point, saturating at `max_iterations`.
///
/// A count of exactly `max_iterations` means escape was never detected
/// within the bound.
pub fn escape_count(kind: FractalKind, c_re: f64, c_im: f64, max_iterations: u32) -> u32 {
    match kind {
        FractalKind::Mandelbrot => iterate(0.0, 0.0, c_re, c_im, max_iterations, false),
        FractalKind::Julia => iterate(c_re, c_im, JULIA_RE, JULIA_IM, max_iterations, false),
        FractalKind::BurningShip => iterate(0.0, 0.0, c_re, c_im, max_iterations, true),
    }
}

/// z := z^2 + c, with the Burning Ship variant folding both components
/// through abs before squaring.
#[inline]
fn iterate(
    mut z_re: f64,
    mut z_im: f64,
    c_re: f64,
    c_im: f64,
    max_iterations: u32,
    fold: bool,
) -> u32 {
    for n in 0..max_iterations {
        if z_re * z_re + z_im * z_im > ESCAPE_SQ {
            return n;
        }
        if fold {
            z_re = z_re.abs();
            z_im = z_im.abs();
        }
        let re = z_re * z_re - z_im * z_im + c_re;
        let im = 2.0 * z_re * z_im + c_im;
        z_re = re;
        z_im = im;
    }
    max_iterations
}

/// Iteration counts for every pixel, row-major. Rows are computed in
/// parallel.
pub fn iteration_grid(kind: FractalKind, width: u32, height: u32, max_iterations: u32) -> Vec<u32> {
    let w = width as usize;
    let mut counts = vec![0u32; w * height as usize];

    counts.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, slot) in row.iter_mut().enumerate() {
            let (re, im) = pixel_to_plane(x as u32, y as u32, width, height);
            *slot = escape_count(kind, re, im, max_iterations);
        }
    });

    counts
}

/// Render a spec into an RGBA raster.
///
/// Deterministic: identical specs produce byte-identical rasters. An
/// unrecognized `fractal_type` renders as Mandelbrot, an unrecognized
/// `color_scheme` uses the classic factor mapping; neither is an error.
pub fn render(spec: &FractalSpec) -> PipelineResult<Raster> {
    if spec.width == 0 || spec.height == 0 {
        return Err(PipelineError::RenderError(format!(
            "Invalid dimensions {}x{}",
            spec.width, spec.height
        )));
    }
    if spec.max_iterations == 0 {
        return Err(PipelineError::RenderError(
            "max_iterations must be positive".to_string(),
        ));
    }

    let scheme = spec.scheme();
    let counts = iteration_grid(spec.kind(), spec.width, spec.height, spec.max_iterations);

    let mut pixels = vec![0u8; counts.len() * 4];
    for (slot, &count) in pixels.chunks_exact_mut(4).zip(counts.iter()) {
        let [r, g, b] = color::map_count(scheme, count, spec.max_iterations);
        slot[0] = r;
        slot[1] = g;
        slot[2] = b;
        slot[3] = 255;
    }

    Ok(Raster {
        width: spec.width,
        height: spec.height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_never_escapes() {
        // c = 0 is in the Mandelbrot set for any iteration bound.
        for max in [1, 10, 100, 5000] {
            assert_eq!(escape_count(FractalKind::Mandelbrot, 0.0, 0.0, max), max);
        }
    }

    #[test]
    fn test_far_point_escapes_immediately() {
        // |c| > 2 already, first magnitude check fires on iteration 1.
        let count = escape_count(FractalKind::Mandelbrot, 3.0, 0.0, 100);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_counts_within_bound() {
        let counts = iteration_grid(FractalKind::BurningShip, 32, 32, 50);
        assert_eq!(counts.len(), 32 * 32);
        assert!(counts.iter().all(|&c| c <= 50));
    }

    #[test]
    fn test_viewport_corners() {
        let (re, im) = pixel_to_plane(0, 0, 100, 100);
        assert_eq!((re, im), (-2.5, -1.0));

        // The right/bottom edge is exclusive: pixel width-1 maps just
        // short of the viewport maximum.
        let (re, im) = pixel_to_plane(99, 99, 100, 100);
        assert!(re < 1.0 && re > 0.9);
        assert!(im < 1.0 && im > 0.9);
    }

    #[test]
    fn test_julia_ignores_start_symmetry() {
        // Julia seeds z0 with the pixel point; distinct points give
        // distinct escape behavior under the fixed constant.
        let a = escape_count(FractalKind::Julia, 0.0, 0.0, 200);
        let b = escape_count(FractalKind::Julia, 1.5, 1.0, 200);
        assert_ne!(a, b);
    }
}

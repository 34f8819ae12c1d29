//! Escape-time fractal rendering.
//!
//! Pure computation: a fractal spec in, an RGBA raster (or its PNG
//! encoding) out. No I/O. The pixel grid is the pipeline's CPU hot path
//! and is computed row-parallel with rayon.

pub mod color;
pub mod fractal;
pub mod png;

pub use fractal::{escape_count, iteration_grid, render, Raster};
pub use png::encode_png;

//! Wire and domain types for the fractal pipeline.
//!
//! Message bodies are JSON-encoded. Field names match what the intake and
//! lookup services produce, so the types double as the wire contract.

use serde::{Deserialize, Serialize};

/// Intake submission: an opaque, caller-supplied identifier.
///
/// Uniqueness is not enforced; duplicate IDs produce duplicate downstream
/// work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
}

/// Fully populated render request, produced by the enrichment stage.
///
/// `center_x`, `center_y` and `zoom_level` are carried on the wire but not
/// consumed by the renderer, which uses a fixed viewport. They are reserved
/// for a future viewport implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractalSpec {
    pub id: String,
    pub fractal_type: String,
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub color_scheme: String,
    #[serde(default)]
    pub center_x: f64,
    #[serde(default)]
    pub center_y: f64,
    #[serde(default)]
    pub zoom_level: u32,
}

impl FractalSpec {
    /// Parsed fractal algorithm. Unrecognized names fall back to Mandelbrot.
    pub fn kind(&self) -> FractalKind {
        FractalKind::from_name(&self.fractal_type)
    }

    /// Parsed color scheme. Unrecognized names fall back to the classic
    /// factor mapping.
    pub fn scheme(&self) -> ColorScheme {
        ColorScheme::from_name(&self.color_scheme)
    }
}

/// Escape-time algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractalKind {
    Mandelbrot,
    Julia,
    BurningShip,
}

impl FractalKind {
    /// Parse a wire name. Unknown names resolve to Mandelbrot; this is the
    /// documented default, not an error.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Julia" => FractalKind::Julia,
            "BurningShip" => FractalKind::BurningShip,
            _ => FractalKind::Mandelbrot,
        }
    }
}

/// Iteration-count to color mapping selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    /// Per-channel factor mapping (x12 / x7 / x3 mod 256). Also served for
    /// the `rainbow` wire name and for anything unrecognized.
    Classic,
    Fire,
    BlueShades,
    Monochrome,
    Pastel,
}

impl ColorScheme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "fire" => ColorScheme::Fire,
            "blue_shades" => ColorScheme::BlueShades,
            "monochrome" => ColorScheme::Monochrome,
            "pastel" => ColorScheme::Pastel,
            _ => ColorScheme::Classic,
        }
    }
}

/// Terminal record produced once per rendered spec. Immutable after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    pub status: RenderStatus,
    pub image_reference: String,
    pub processing_time_ms: u64,
}

/// Outcome of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Completed,
    Failed,
}

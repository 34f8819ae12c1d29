//! Common types shared across all fractal-pipeline services.

pub mod error;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use types::{
    ColorScheme, FractalKind, FractalSpec, RenderResult, RenderStatus, WorkItem,
};

//! Enrichment stage of the fractal pipeline.
//!
//! Consumes work items, resolves each id to a fully populated fractal
//! spec via the lookup service, and forwards the spec to the render
//! queue.

pub mod enrich;
pub mod lookup;

pub use enrich::EnrichHandler;
pub use lookup::{HttpLookup, SpecLookup};

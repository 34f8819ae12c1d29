//! Persistence for the fractal pipeline.
//!
//! Provides the object-storage client (MinIO/S3) that holds rendered
//! images and their result records, and the [`ResultSink`] seam the render
//! worker writes through.

pub mod object_store;
pub mod sink;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath};
pub use sink::{MemorySink, ObjectStoreSink, ResultSink};

//! Persistence seam for the render stage.
//!
//! The render worker writes through [`ResultSink`] so tests can observe
//! what was persisted without object storage.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use fractal_common::{PipelineError, PipelineResult, RenderResult};

use crate::object_store::{ObjectStorage, StoragePath};

/// Destination for rendered images and their result records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Store the encoded image; returns the reference recorded in the
    /// result.
    async fn store_image(&self, id: &str, png: Bytes) -> PipelineResult<String>;

    /// Store the terminal result record.
    async fn store_result(&self, id: &str, result: &RenderResult) -> PipelineResult<()>;
}

/// Production sink backed by object storage.
pub struct ObjectStoreSink {
    storage: ObjectStorage,
}

impl ObjectStoreSink {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ResultSink for ObjectStoreSink {
    async fn store_image(&self, id: &str, png: Bytes) -> PipelineResult<String> {
        let path = StoragePath::image(id);
        self.storage.put(&path, png).await?;
        Ok(path)
    }

    async fn store_result(&self, id: &str, result: &RenderResult) -> PipelineResult<()> {
        let encoded = serde_json::to_vec(result)
            .map_err(|e| PipelineError::StorageError(format!("Result encoding failed: {}", e)))?;
        self.storage
            .put(&StoragePath::result(id), Bytes::from(encoded))
            .await
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct MemorySink {
    images: Mutex<HashMap<String, Bytes>>,
    results: Mutex<HashMap<String, RenderResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn image(&self, id: &str) -> Option<Bytes> {
        self.images.lock().await.get(id).cloned()
    }

    pub async fn result(&self, id: &str) -> Option<RenderResult> {
        self.results.lock().await.get(id).cloned()
    }

    pub async fn image_count(&self) -> usize {
        self.images.lock().await.len()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn store_image(&self, id: &str, png: Bytes) -> PipelineResult<String> {
        self.images.lock().await.insert(id.to_string(), png);
        Ok(StoragePath::image(id))
    }

    async fn store_result(&self, id: &str, result: &RenderResult) -> PipelineResult<()> {
        self.results
            .lock()
            .await
            .insert(id.to_string(), result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal_common::RenderStatus;

    #[tokio::test]
    async fn test_memory_sink_stores_image_and_result() {
        let sink = MemorySink::new();

        let reference = sink
            .store_image("abc123", Bytes::from_static(b"png-bytes"))
            .await
            .unwrap();
        assert_eq!(reference, "fractals/abc123.png");

        let result = RenderResult {
            status: RenderStatus::Completed,
            image_reference: reference,
            processing_time_ms: 5,
        };
        sink.store_result("abc123", &result).await.unwrap();

        assert_eq!(sink.image("abc123").await.unwrap(), &b"png-bytes"[..]);
        assert_eq!(
            sink.result("abc123").await.unwrap().status,
            RenderStatus::Completed
        );
    }
}

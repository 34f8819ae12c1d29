//! Enrichment message handler: work item in, fractal spec out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use fractal_common::{FractalSpec, WorkItem};
use queue::{HandlerError, MessageHandler, MessageQueue};

use crate::lookup::SpecLookup;

/// Handler for the enrichment queue.
///
/// Success means the spec was enqueued for rendering; only then is the
/// source work item deleted. Lookup and enqueue failures leave the work
/// item for redelivery.
pub struct EnrichHandler {
    lookup: Arc<dyn SpecLookup>,
    render_queue: Arc<dyn MessageQueue>,
}

impl EnrichHandler {
    pub fn new(lookup: Arc<dyn SpecLookup>, render_queue: Arc<dyn MessageQueue>) -> Self {
        Self {
            lookup,
            render_queue,
        }
    }
}

#[async_trait]
impl MessageHandler for EnrichHandler {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError> {
        let item: WorkItem =
            serde_json::from_slice(body).map_err(|e| HandlerError::Malformed(e.into()))?;

        let spec: FractalSpec = self.lookup.fetch(&item.id).await.map_err(|e| {
            warn!(id = %item.id, error = %e, "Lookup failed");
            HandlerError::Retryable(e)
        })?;

        let encoded = serde_json::to_vec(&spec).map_err(|e| HandlerError::Retryable(e.into()))?;

        self.render_queue
            .send(encoded.into())
            .await
            .map_err(HandlerError::Retryable)?;

        info!(
            id = %item.id,
            fractal_type = %spec.fractal_type,
            width = spec.width,
            height = spec.height,
            "Work item enriched and forwarded"
        );
        Ok(())
    }
}

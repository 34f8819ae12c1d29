//! Render message handler: fractal spec in, persisted image plus result
//! record out.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use fractal_common::{FractalSpec, PipelineError, RenderResult, RenderStatus};
use queue::{HandlerError, MessageHandler};
use storage::ResultSink;

/// Handler for the render queue.
///
/// Persistence is keyed by the spec id, so a redelivered spec overwrites
/// its own output instead of duplicating it. "Produced and persisted" is
/// the terminal success condition; no downstream notification happens
/// here.
pub struct RenderHandler {
    sink: Arc<dyn ResultSink>,
}

impl RenderHandler {
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl MessageHandler for RenderHandler {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError> {
        let spec: FractalSpec =
            serde_json::from_slice(body).map_err(|e| HandlerError::Malformed(e.into()))?;

        info!(
            id = %spec.id,
            fractal_type = %spec.fractal_type,
            width = spec.width,
            height = spec.height,
            max_iterations = spec.max_iterations,
            "Rendering fractal"
        );

        let start = Instant::now();

        // The engine is pure CPU work; keep it off the async workers.
        let render_spec = spec.clone();
        let png = tokio::task::spawn_blocking(move || {
            let raster = renderer::render(&render_spec)?;
            renderer::encode_png(&raster)
        })
        .await
        .map_err(|e| {
            HandlerError::Retryable(PipelineError::InternalError(format!(
                "Render task failed: {}",
                e
            )))
        })?
        .map_err(|e| {
            // Render/encode rejections are input problems; retrying the
            // same spec cannot succeed.
            warn!(id = %spec.id, error = %e, "Render rejected");
            HandlerError::Malformed(e)
        })?;

        let image_reference = self
            .sink
            .store_image(&spec.id, Bytes::from(png))
            .await
            .map_err(HandlerError::Retryable)?;

        let result = RenderResult {
            status: RenderStatus::Completed,
            image_reference: image_reference.clone(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        self.sink
            .store_result(&spec.id, &result)
            .await
            .map_err(HandlerError::Retryable)?;

        info!(
            id = %spec.id,
            image = %image_reference,
            elapsed_ms = result.processing_time_ms,
            "Render complete"
        );
        Ok(())
    }
}

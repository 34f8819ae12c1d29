//! Client for the fractal metadata lookup service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use fractal_common::{FractalSpec, PipelineError, PipelineResult};

/// Resolves a work item id to a fully populated fractal spec.
#[async_trait]
pub trait SpecLookup: Send + Sync {
    async fn fetch(&self, id: &str) -> PipelineResult<FractalSpec>;
}

/// HTTP lookup against the metadata service.
pub struct HttpLookup {
    client: Client,
    base_url: String,
}

impl HttpLookup {
    /// Build a client with an explicit request timeout so a stuck lookup
    /// cannot wedge the worker.
    pub fn new(base_url: &str, timeout: Duration) -> PipelineResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            PipelineError::InternalError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpecLookup for HttpLookup {
    async fn fetch(&self, id: &str) -> PipelineResult<FractalSpec> {
        let url = format!("{}/fractals/{}", self.base_url, id);

        let spec = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::LookupError {
                id: id.to_string(),
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| PipelineError::LookupError {
                id: id.to_string(),
                message: e.to_string(),
            })?
            .json::<FractalSpec>()
            .await
            .map_err(|e| PipelineError::LookupError {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        debug!(id = %id, fractal_type = %spec.fractal_type, "Fetched fractal spec");
        Ok(spec)
    }
}

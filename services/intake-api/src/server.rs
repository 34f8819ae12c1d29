//! HTTP server for the intake service.
//!
//! Provides endpoints for:
//! - `POST /fractals` - Submit a work item id
//! - `GET /health` - Health check

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use fractal_common::WorkItem;
use queue::MessageQueue;

/// Request body for /fractals.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub id: String,
}

/// Response body for /fractals.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub status: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// POST /fractals - enqueue a work item for enrichment.
async fn submit_handler(
    Extension(queue): Extension<Arc<dyn MessageQueue>>,
    Json(request): Json<SubmitRequest>,
) -> (StatusCode, Json<SubmitResponse>) {
    if request.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SubmitResponse {
                id: request.id,
                status: "rejected".to_string(),
            }),
        );
    }

    let item = WorkItem {
        id: request.id.clone(),
    };

    let body = match serde_json::to_vec(&item) {
        Ok(body) => body,
        Err(e) => {
            error!(id = %item.id, error = %e, "Failed to encode work item");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SubmitResponse {
                    id: item.id,
                    status: "error".to_string(),
                }),
            );
        }
    };

    match queue.send(body.into()).await {
        Ok(()) => {
            info!(id = %item.id, "Work item queued");
            (
                StatusCode::ACCEPTED,
                Json(SubmitResponse {
                    id: item.id,
                    status: "queued".to_string(),
                }),
            )
        }
        Err(e) => {
            error!(id = %item.id, error = %e, "Failed to queue work item");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SubmitResponse {
                    id: item.id,
                    status: "error".to_string(),
                }),
            )
        }
    }
}

/// GET /health - Health check
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "intake-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the HTTP router.
pub fn build_router(queue: Arc<dyn MessageQueue>) -> Router {
    Router::new()
        .route("/fractals", post(submit_handler))
        .route("/health", get(health_handler))
        .layer(Extension(queue))
}

/// Start the HTTP server.
pub async fn start_server(queue: Arc<dyn MessageQueue>, port: u16) -> anyhow::Result<()> {
    let app = build_router(queue);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting intake HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use queue::MemoryQueue;

    fn test_queue() -> Arc<MemoryQueue> {
        Arc::new(MemoryQueue::new(Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn test_submit_enqueues_work_item() {
        let memory = test_queue();
        let queue: Arc<dyn MessageQueue> = memory.clone();

        let (status, response) = submit_handler(
            Extension(queue.clone()),
            Json(SubmitRequest {
                id: "abc123".to_string(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(response.id, "abc123");
        assert_eq!(response.status, "queued");

        let messages = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(messages.len(), 1);
        let item: WorkItem = serde_json::from_slice(&messages[0].body).unwrap();
        assert_eq!(item.id, "abc123");
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let memory = test_queue();
        let queue: Arc<dyn MessageQueue> = memory.clone();

        let (status, response) = submit_handler(
            Extension(queue),
            Json(SubmitRequest { id: String::new() }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response.status, "rejected");
        assert_eq!(memory.undeleted_len().await, 0);
    }
}

//! Tests for the render stage: the end-to-end render scenario, idempotent
//! reprocessing, algorithm fallback, and failure classification.

use std::sync::Arc;

use bytes::Bytes;

use fractal_common::{FractalSpec, RenderStatus};
use queue::{HandlerError, MessageHandler};
use render_worker::RenderHandler;
use storage::MemorySink;

fn sample_spec(id: &str, fractal_type: &str) -> FractalSpec {
    FractalSpec {
        id: id.to_string(),
        fractal_type: fractal_type.to_string(),
        width: 100,
        height: 100,
        max_iterations: 500,
        color_scheme: "rainbow".to_string(),
        center_x: 0.0,
        center_y: 0.0,
        zoom_level: 1,
    }
}

fn body(spec: &FractalSpec) -> Vec<u8> {
    serde_json::to_vec(spec).unwrap()
}

/// Read width/height out of the PNG IHDR chunk.
fn png_dimensions(png: &Bytes) -> (u32, u32) {
    let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
    (width, height)
}

#[tokio::test]
async fn test_render_persists_image_and_result() {
    let sink = Arc::new(MemorySink::new());
    let handler = RenderHandler::new(sink.clone());

    let spec = sample_spec("abc123", "Mandelbrot");
    handler.handle(&body(&spec)).await.unwrap();

    let png = sink.image("abc123").await.expect("image persisted");
    assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(png_dimensions(&png), (100, 100));

    let result = sink.result("abc123").await.expect("result persisted");
    assert_eq!(result.status, RenderStatus::Completed);
    assert_eq!(result.image_reference, "fractals/abc123.png");
}

#[tokio::test]
async fn test_duplicate_delivery_is_idempotent() {
    let sink = Arc::new(MemorySink::new());
    let handler = RenderHandler::new(sink.clone());

    let spec = sample_spec("dup", "Julia");
    handler.handle(&body(&spec)).await.unwrap();
    let first = sink.image("dup").await.unwrap();

    // Simulated redelivery of the same spec.
    handler.handle(&body(&spec)).await.unwrap();
    let second = sink.image("dup").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(sink.image_count().await, 1);
    assert_eq!(
        sink.result("dup").await.unwrap().status,
        RenderStatus::Completed
    );
}

#[tokio::test]
async fn test_unknown_fractal_type_renders_without_error() {
    let sink = Arc::new(MemorySink::new());
    let handler = RenderHandler::new(sink.clone());

    let spec = sample_spec("odd", "Unknown");
    handler.handle(&body(&spec)).await.unwrap();

    assert!(sink.image("odd").await.is_some());
}

#[tokio::test]
async fn test_malformed_body_is_classified() {
    let sink = Arc::new(MemorySink::new());
    let handler = RenderHandler::new(sink.clone());

    let err = handler.handle(b"garbage").await.unwrap_err();
    assert!(matches!(err, HandlerError::Malformed(_)));
    assert_eq!(sink.image_count().await, 0);
}

#[tokio::test]
async fn test_degenerate_spec_is_not_retried() {
    let sink = Arc::new(MemorySink::new());
    let handler = RenderHandler::new(sink.clone());

    let mut spec = sample_spec("zero", "Mandelbrot");
    spec.width = 0;

    let err = handler.handle(&body(&spec)).await.unwrap_err();
    assert!(matches!(err, HandlerError::Malformed(_)));
    assert_eq!(sink.image_count().await, 0);
}

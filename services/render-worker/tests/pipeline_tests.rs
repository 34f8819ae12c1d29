//! End-to-end pipeline test: work item in, persisted fractal image out,
//! with both stage workers running under the consumer loop on in-memory
//! queues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use enrich_worker::{EnrichHandler, SpecLookup};
use fractal_common::{FractalSpec, PipelineResult, RenderStatus, WorkItem};
use queue::{Consumer, ConsumerConfig, MemoryQueue, MessageQueue};
use render_worker::RenderHandler;
use storage::MemorySink;

struct StubLookup;

#[async_trait]
impl SpecLookup for StubLookup {
    async fn fetch(&self, id: &str) -> PipelineResult<FractalSpec> {
        Ok(FractalSpec {
            id: id.to_string(),
            fractal_type: "Mandelbrot".to_string(),
            width: 100,
            height: 100,
            max_iterations: 500,
            color_scheme: "rainbow".to_string(),
            center_x: -0.5,
            center_y: 0.0,
            zoom_level: 1,
        })
    }
}

fn test_config() -> ConsumerConfig {
    ConsumerConfig {
        batch_size: 10,
        poll_wait: Duration::from_millis(10),
        max_in_flight: 2,
        max_deliveries: 5,
    }
}

#[tokio::test]
async fn test_submission_flows_to_persisted_image() {
    let enrich_queue = Arc::new(MemoryQueue::new(Duration::from_secs(30)));
    let render_queue = Arc::new(MemoryQueue::new(Duration::from_secs(30)));
    let dead_letter = Arc::new(MemoryQueue::new(Duration::from_secs(30)));
    let sink = Arc::new(MemorySink::new());

    // Intake: enqueue the work item.
    let item = WorkItem {
        id: "abc123".to_string(),
    };
    enrich_queue
        .send(Bytes::from(serde_json::to_vec(&item).unwrap()))
        .await
        .unwrap();

    // Stage 1: enrichment.
    let enrich_consumer = Consumer::new(
        enrich_queue.clone(),
        dead_letter.clone(),
        Arc::new(EnrichHandler::new(
            Arc::new(StubLookup),
            render_queue.clone(),
        )),
        test_config(),
    );

    // Stage 2: render.
    let render_consumer = Consumer::new(
        render_queue.clone(),
        dead_letter.clone(),
        Arc::new(RenderHandler::new(sink.clone())),
        test_config(),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let enrich_run = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move { enrich_consumer.run(shutdown).await }
    });
    let render_run = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move { render_consumer.run(shutdown).await }
    });

    // Wait for the result record to appear.
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        if sink.result("abc123").await.is_some() {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "pipeline did not complete in time"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown_tx.send(()).unwrap();
    enrich_run.await.unwrap();
    render_run.await.unwrap();

    // The 100x100 raster was rendered and persisted.
    let png = sink.image("abc123").await.unwrap();
    assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(
        u32::from_be_bytes(png[16..20].try_into().unwrap()),
        100
    );
    assert_eq!(
        u32::from_be_bytes(png[20..24].try_into().unwrap()),
        100
    );

    let result = sink.result("abc123").await.unwrap();
    assert_eq!(result.status, RenderStatus::Completed);
    assert_eq!(result.image_reference, "fractals/abc123.png");

    // Both queues fully drained; nothing dead-lettered.
    assert_eq!(enrich_queue.undeleted_len().await, 0);
    assert_eq!(render_queue.undeleted_len().await, 0);
    assert_eq!(dead_letter.undeleted_len().await, 0);
}

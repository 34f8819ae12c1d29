//! Render worker service.
//!
//! Consumes fractal specs from the render queue, computes the images, and
//! persists them to object storage together with their result records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use queue::{Consumer, ConsumerConfig, MessageQueue, RedisQueue};
use render_worker::RenderHandler;
use storage::{ObjectStorage, ObjectStorageConfig, ObjectStoreSink, ResultSink};

#[derive(Parser, Debug)]
#[command(name = "render-worker")]
#[command(about = "Render worker for the fractal pipeline")]
struct Args {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis:6379")]
    redis_url: String,

    /// Queue consumed by this stage
    #[arg(long, env = "RENDER_QUEUE", default_value = "fractal:render")]
    render_queue: String,

    /// Destination for messages exceeding the delivery bound
    #[arg(long, env = "DEAD_LETTER_QUEUE", default_value = "fractal:dead")]
    dead_letter_queue: String,

    /// Seconds before an undeleted message becomes redeliverable
    #[arg(long, env = "VISIBILITY_TIMEOUT_SECS", default_value = "30")]
    visibility_timeout_secs: u64,

    /// Upper bound on concurrently in-flight renders
    #[arg(short, long, env = "MAX_IN_FLIGHT", default_value = "4")]
    max_in_flight: usize,

    /// Deliveries after which a message is dead-lettered
    #[arg(long, env = "MAX_DELIVERIES", default_value = "5")]
    max_deliveries: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting render worker");

    let visibility = Duration::from_secs(args.visibility_timeout_secs);

    let source: Arc<dyn MessageQueue> =
        Arc::new(RedisQueue::connect(&args.redis_url, &args.render_queue, visibility).await?);
    let dead_letter: Arc<dyn MessageQueue> =
        Arc::new(RedisQueue::connect(&args.redis_url, &args.dead_letter_queue, visibility).await?);

    let storage_config = ObjectStorageConfig {
        endpoint: std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://minio:9000".to_string()),
        bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| "fractal-images".to_string()),
        access_key_id: std::env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
        secret_access_key: std::env::var("S3_SECRET_KEY")
            .unwrap_or_else(|_| "minioadmin".to_string()),
        region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        allow_http: std::env::var("S3_ALLOW_HTTP")
            .map(|v| v == "true")
            .unwrap_or(true),
    };
    let storage = ObjectStorage::new(&storage_config)?;
    let sink: Arc<dyn ResultSink> = Arc::new(ObjectStoreSink::new(storage));

    info!(queue = %args.render_queue, "Connected to Redis and object storage");

    let handler = Arc::new(RenderHandler::new(sink));

    let config = ConsumerConfig {
        max_in_flight: args.max_in_flight,
        max_deliveries: args.max_deliveries,
        ..Default::default()
    };
    let consumer = Consumer::new(source, dead_letter, handler, config);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Stop polling on Ctrl+C; in-flight renders finish before exit.
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    consumer.run(shutdown_tx.subscribe()).await;

    info!("Render worker stopped");
    Ok(())
}

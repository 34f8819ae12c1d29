//! Enrichment worker service.
//!
//! Consumes work items from the enrichment queue, resolves them to full
//! fractal specs via the lookup service, and forwards the specs to the
//! render queue.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use enrich_worker::{EnrichHandler, HttpLookup};
use queue::{Consumer, ConsumerConfig, MessageQueue, RedisQueue};

#[derive(Parser, Debug)]
#[command(name = "enrich-worker")]
#[command(about = "Enrichment worker for the fractal pipeline")]
struct Args {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis:6379")]
    redis_url: String,

    /// Queue consumed by this stage
    #[arg(long, env = "ENRICH_QUEUE", default_value = "fractal:enrich")]
    enrich_queue: String,

    /// Queue feeding the render stage
    #[arg(long, env = "RENDER_QUEUE", default_value = "fractal:render")]
    render_queue: String,

    /// Destination for messages exceeding the delivery bound
    #[arg(long, env = "DEAD_LETTER_QUEUE", default_value = "fractal:dead")]
    dead_letter_queue: String,

    /// Base URL of the fractal metadata service
    #[arg(long, env = "LOOKUP_BASE_URL")]
    lookup_base_url: String,

    /// Lookup request timeout in seconds
    #[arg(long, env = "LOOKUP_TIMEOUT_SECS", default_value = "10")]
    lookup_timeout_secs: u64,

    /// Seconds before an undeleted message becomes redeliverable
    #[arg(long, env = "VISIBILITY_TIMEOUT_SECS", default_value = "30")]
    visibility_timeout_secs: u64,

    /// Upper bound on concurrently in-flight messages
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

    info!("Starting enrichment worker");

    let visibility = Duration::from_secs(args.visibility_timeout_secs);

    let source: Arc<dyn MessageQueue> =
        Arc::new(RedisQueue::connect(&args.redis_url, &args.enrich_queue, visibility).await?);
    let render_queue: Arc<dyn MessageQueue> =
        Arc::new(RedisQueue::connect(&args.redis_url, &args.render_queue, visibility).await?);
    let dead_letter: Arc<dyn MessageQueue> =
        Arc::new(RedisQueue::connect(&args.redis_url, &args.dead_letter_queue, visibility).await?);

    info!(queue = %args.enrich_queue, "Connected to Redis");

    let lookup = Arc::new(HttpLookup::new(
        &args.lookup_base_url,
        Duration::from_secs(args.lookup_timeout_secs),
    )?);
    let handler = Arc::new(EnrichHandler::new(lookup, render_queue));

    let config = ConsumerConfig {
        max_in_flight: args.max_in_flight,
        max_deliveries: args.max_deliveries,
        ..Default::default()
    };
    let consumer = Consumer::new(source, dead_letter, handler, config);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Stop polling on Ctrl+C; in-flight messages finish before exit.
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    consumer.run(shutdown_tx.subscribe()).await;

    info!("Enrichment worker stopped");
    Ok(())
}

//! Intake API service.
//!
//! Accepts fractal render submissions and enqueues them for the
//! enrichment stage.

mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use queue::{MessageQueue, RedisQueue, DEFAULT_VISIBILITY_TIMEOUT};

#[derive(Parser, Debug)]
#[command(name = "intake-api")]
#[command(about = "HTTP intake for fractal render submissions")]
struct Args {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis:6379")]
    redis_url: String,

    /// Queue feeding the enrichment stage
    #[arg(long, env = "ENRICH_QUEUE", default_value = "fractal:enrich")]
    enrich_queue: String,

    /// Port for the HTTP server
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

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

    info!("Starting intake API");

    // The queue must be reachable at startup; otherwise exit non-zero
    // rather than serve submissions that go nowhere.
    let queue =
        RedisQueue::connect(&args.redis_url, &args.enrich_queue, DEFAULT_VISIBILITY_TIMEOUT)
            .await?;
    let queue: Arc<dyn MessageQueue> = Arc::new(queue);

    info!(queue = %args.enrich_queue, "Connected to Redis");

    server::start_server(queue, args.port).await
}

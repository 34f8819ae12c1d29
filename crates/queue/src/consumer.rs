//! Generic poll-process-delete consumption loop.
//!
//! Drives a stage worker against a message queue: receive a batch, hand
//! each message to the stage handler on its own task (bounded by a
//! semaphore), and delete only the messages the handler accepted. Failed
//! messages are left for redelivery; messages delivered more than
//! `max_deliveries` times are moved to a dead-letter queue so a poison
//! body cannot cycle forever.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

use fractal_common::PipelineError;

use crate::message::{Message, MessageQueue};

/// How a handler failure should be treated.
#[derive(Debug)]
pub enum HandlerError {
    /// Transient failure (lookup, storage, downstream enqueue). The message
    /// is left undeleted and redelivered after its visibility timeout.
    Retryable(PipelineError),
    /// The message body could not be decoded. Redelivery cannot fix it; the
    /// delivery bound eventually routes it to the dead-letter queue.
    Malformed(PipelineError),
}

/// Stage-specific message processing.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, body: &[u8]) -> Result<(), HandlerError>;
}

/// Consumer tuning.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum messages fetched per poll.
    pub batch_size: usize,
    /// Long-poll bound when the queue is empty.
    pub poll_wait: Duration,
    /// Upper bound on concurrently in-flight messages.
    pub max_in_flight: usize,
    /// Deliveries after which a message is dead-lettered instead of
    /// retried.
    pub max_deliveries: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_wait: Duration::from_secs(10),
            max_in_flight: 4,
            max_deliveries: 5,
        }
    }
}

/// The polling loop shared by all stage workers.
pub struct Consumer {
    source: Arc<dyn MessageQueue>,
    dead_letter: Arc<dyn MessageQueue>,
    handler: Arc<dyn MessageHandler>,
    config: ConsumerConfig,
}

impl Consumer {
    pub fn new(
        source: Arc<dyn MessageQueue>,
        dead_letter: Arc<dyn MessageQueue>,
        handler: Arc<dyn MessageHandler>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            source,
            dead_letter,
            handler,
            config,
        }
    }

    /// Run until `shutdown` fires.
    ///
    /// The signal is checked before every poll; once it arrives no new
    /// polls are issued, and in-flight messages drain before this returns,
    /// so a clean shutdown never abandons work mid-processing.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));

        loop {
            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => break,
            }

            let batch = match self
                .source
                .receive(self.config.batch_size, self.config.poll_wait)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(error = %e, "Receive failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for message in batch {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let source = Arc::clone(&self.source);
                let dead_letter = Arc::clone(&self.dead_letter);
                let handler = Arc::clone(&self.handler);
                let max_deliveries = self.config.max_deliveries;

                tokio::spawn(async move {
                    process_message(source, dead_letter, handler, message, max_deliveries).await;
                    drop(permit);
                });
            }
        }

        // Every permit held means a message is still in flight; acquiring
        // them all back is the drain barrier.
        let _ = semaphore.acquire_many(self.config.max_in_flight as u32).await;
        info!("Consumer stopped");
    }
}

async fn process_message(
    source: Arc<dyn MessageQueue>,
    dead_letter: Arc<dyn MessageQueue>,
    handler: Arc<dyn MessageHandler>,
    message: Message,
    max_deliveries: u32,
) {
    if message.receive_count > max_deliveries {
        warn!(
            handle = %message.handle,
            receive_count = message.receive_count,
            "Delivery bound exceeded, dead-lettering"
        );

        match dead_letter.send(message.body.clone()).await {
            Ok(()) => {
                if let Err(e) = source.delete(&message.handle).await {
                    error!(handle = %message.handle, error = %e, "Failed to delete dead-lettered message");
                }
            }
            Err(e) => {
                // Leave it undeleted; the next redelivery retries the
                // dead-letter send.
                error!(handle = %message.handle, error = %e, "Failed to dead-letter message");
            }
        }
        return;
    }

    match handler.handle(&message.body).await {
        Ok(()) => match source.delete(&message.handle).await {
            Ok(()) => debug!(handle = %message.handle, "Message processed and deleted"),
            // Deletion is idempotent; the redelivered duplicate will be
            // processed again and deleted then.
            Err(e) => error!(handle = %message.handle, error = %e, "Failed to delete processed message"),
        },
        Err(HandlerError::Retryable(e)) => {
            warn!(
                handle = %message.handle,
                receive_count = message.receive_count,
                error = %e,
                "Processing failed, leaving for redelivery"
            );
        }
        Err(HandlerError::Malformed(e)) => {
            warn!(
                handle = %message.handle,
                receive_count = message.receive_count,
                error = %e,
                "Malformed message body"
            );
        }
    }
}

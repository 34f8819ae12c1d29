//! Redis Streams implementation of the message queue.
//!
//! Each queue is a single stream consumed through one consumer group.
//! Received-but-undeleted entries sit in the group's pending list; once
//! idle past the visibility timeout they are reclaimed by `XAUTOCLAIM` and
//! redelivered, which is what makes delivery at-least-once. `XPENDING`
//! supplies the per-entry delivery count the consumer loop uses for
//! dead-letter bookkeeping.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, streams::*, AsyncCommands, Client};
use uuid::Uuid;

use fractal_common::{PipelineError, PipelineResult};

use crate::message::{Message, MessageQueue};

const CONSUMER_GROUP: &str = "workers";
const BODY_FIELD: &str = "body";

/// Visibility timeout used by senders that never receive.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Redis Streams message queue.
pub struct RedisQueue {
    conn: MultiplexedConnection,
    stream: String,
    consumer: String,
    visibility_timeout: Duration,
}

impl RedisQueue {
    /// Connect to Redis and ensure the stream and consumer group exist.
    pub async fn connect(
        redis_url: &str,
        stream: &str,
        visibility_timeout: Duration,
    ) -> PipelineResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| PipelineError::QueueError(format!("Redis connection failed: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PipelineError::QueueError(format!("Redis connection failed: {}", e)))?;

        // Create consumer group if it doesn't exist; start at 0 so entries
        // enqueued before the first worker came up are not skipped.
        let _: Result<(), _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(CONSUMER_GROUP)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        Ok(Self {
            conn,
            stream: stream.to_string(),
            consumer: format!("consumer-{}", Uuid::new_v4()),
            visibility_timeout,
        })
    }

    /// Number of entries currently on the stream.
    pub async fn depth(&self) -> PipelineResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = redis::cmd("XLEN")
            .arg(&self.stream)
            .query_async(&mut conn)
            .await
            .map_err(|e| PipelineError::QueueError(format!("XLEN failed: {}", e)))?;
        Ok(len)
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn send(&self, body: Bytes) -> PipelineResult<()> {
        let mut conn = self.conn.clone();

        let _: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body.as_ref())
            .query_async(&mut conn)
            .await
            .map_err(|e| PipelineError::QueueError(format!("Enqueue failed: {}", e)))?;

        Ok(())
    }

    async fn receive(&self, max: usize, wait: Duration) -> PipelineResult<Vec<Message>> {
        let mut conn = self.conn.clone();
        let mut messages = Vec::new();

        // First reclaim entries another (or a dead) consumer left idle past
        // the visibility timeout.
        let opts = StreamAutoClaimOptions::default().count(max);
        let reclaimed: StreamAutoClaimReply = conn
            .xautoclaim_options(
                &self.stream,
                CONSUMER_GROUP,
                &self.consumer,
                self.visibility_timeout.as_millis() as usize,
                "0-0",
                opts,
            )
            .await
            .map_err(|e| PipelineError::QueueError(format!("Reclaim failed: {}", e)))?;

        for entry in &reclaimed.claimed {
            if let Some(message) = decode_entry(entry)? {
                messages.push(message);
            }
        }

        if messages.len() < max {
            let opts = StreamReadOptions::default()
                .group(CONSUMER_GROUP, &self.consumer)
                .count(max - messages.len())
                .block(wait.as_millis() as usize);

            let reply: StreamReadReply = conn
                .xread_options(&[self.stream.as_str()], &[">"], &opts)
                .await
                .map_err(|e| PipelineError::QueueError(format!("Read failed: {}", e)))?;

            for stream_key in reply.keys {
                for entry in &stream_key.ids {
                    if let Some(message) = decode_entry(entry)? {
                        messages.push(message);
                    }
                }
            }
        }

        // Everything we just received is pending for this consumer;
        // XPENDING carries the delivery counts.
        if !messages.is_empty() {
            let pending: StreamPendingCountReply = conn
                .xpending_consumer_count(
                    &self.stream,
                    CONSUMER_GROUP,
                    "-",
                    "+",
                    messages.len(),
                    &self.consumer,
                )
                .await
                .map_err(|e| PipelineError::QueueError(format!("Pending lookup failed: {}", e)))?;

            for info in pending.ids {
                if let Some(message) = messages.iter_mut().find(|m| m.handle == info.id) {
                    message.receive_count = info.times_delivered as u32;
                }
            }
        }

        Ok(messages)
    }

    async fn delete(&self, handle: &str) -> PipelineResult<()> {
        let mut conn = self.conn.clone();

        // XACK and XDEL are both no-ops on unknown ids, which keeps
        // deletion idempotent for the caller.
        let _: i64 = redis::cmd("XACK")
            .arg(&self.stream)
            .arg(CONSUMER_GROUP)
            .arg(handle)
            .query_async(&mut conn)
            .await
            .map_err(|e| PipelineError::QueueError(format!("Ack failed: {}", e)))?;

        let _: i64 = redis::cmd("XDEL")
            .arg(&self.stream)
            .arg(handle)
            .query_async(&mut conn)
            .await
            .map_err(|e| PipelineError::QueueError(format!("Delete failed: {}", e)))?;

        Ok(())
    }
}

fn decode_entry(entry: &StreamId) -> PipelineResult<Option<Message>> {
    match entry.map.get(BODY_FIELD) {
        Some(value) => {
            let bytes: Vec<u8> = redis::from_redis_value(value)
                .map_err(|e| PipelineError::QueueError(format!("Malformed stream entry: {}", e)))?;
            Ok(Some(Message {
                body: Bytes::from(bytes),
                handle: entry.id.clone(),
                receive_count: 1,
            }))
        }
        // Entries without a body field (e.g. written by another tool) are
        // skipped rather than surfaced as errors.
        None => Ok(None),
    }
}

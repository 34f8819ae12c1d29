//! Message envelope and queue contract.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use fractal_common::PipelineResult;

/// A delivered message.
///
/// The receiving consumer owns `handle` until it deletes the message or
/// lets the visibility timeout return ownership to the queue for
/// redelivery.
#[derive(Debug, Clone)]
pub struct Message {
    /// Opaque body bytes (JSON-encoded stage payloads in this pipeline).
    pub body: Bytes,
    /// Delivery handle used to delete the message.
    pub handle: String,
    /// How many times this message has been delivered, this delivery
    /// included.
    pub receive_count: u32,
}

/// An at-least-once delivery channel with visibility timeout and explicit
/// deletion.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message body.
    async fn send(&self, body: Bytes) -> PipelineResult<()>;

    /// Receive up to `max` messages, blocking up to `wait` (long-poll
    /// semantics). Zero messages is a normal, non-error outcome.
    async fn receive(&self, max: usize, wait: Duration) -> PipelineResult<Vec<Message>>;

    /// Delete a delivered message.
    ///
    /// Idempotent: deleting an already-deleted handle is not an error, so
    /// callers never have to track deletion state across retries.
    async fn delete(&self, handle: &str) -> PipelineResult<()>;
}

//! Queue boundary and message-consumption model for the fractal pipeline.
//!
//! Provides:
//! - The [`MessageQueue`] contract: at-least-once delivery with a
//!   visibility timeout and explicit, idempotent deletion
//! - [`RedisQueue`], the Redis Streams transport used in production
//! - [`MemoryQueue`], an in-process implementation for tests
//! - [`Consumer`], the poll-process-delete loop shared by all stage
//!   workers

pub mod consumer;
pub mod memory;
pub mod message;
pub mod stream;

pub use consumer::{Consumer, ConsumerConfig, HandlerError, MessageHandler};
pub use memory::MemoryQueue;
pub use message::{Message, MessageQueue};
pub use stream::{RedisQueue, DEFAULT_VISIBILITY_TIMEOUT};

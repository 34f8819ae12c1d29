//! In-process queue with a simulated visibility timeout.
//!
//! Implements the same contract as the Redis-backed queue so stage
//! handlers and the consumer loop can be exercised in tests without a
//! broker. Undeleted deliveries return to the ready list once their
//! visibility deadline passes, preserving their receive count.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use fractal_common::PipelineResult;

use crate::message::{Message, MessageQueue};

struct Entry {
    body: Bytes,
    receive_count: u32,
}

struct Inflight {
    entry: Entry,
    deadline: Instant,
}

#[derive(Default)]
struct Inner {
    ready: VecDeque<(u64, Entry)>,
    inflight: HashMap<String, Inflight>,
    next_id: u64,
}

/// In-memory message queue for tests.
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    visibility_timeout: Duration,
}

impl MemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            visibility_timeout,
        }
    }

    /// Total undeleted messages (ready plus in-flight). A message that
    /// failed processing stays counted here until it is deleted or
    /// dead-lettered.
    pub async fn undeleted_len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.ready.len() + inner.inflight.len()
    }

    /// Messages eligible for delivery right now (expired in-flight entries
    /// included).
    pub async fn ready_len(&self) -> usize {
        let mut inner = self.inner.lock().await;
        reclaim_expired(&mut inner);
        inner.ready.len()
    }

    fn handle_for(id: u64) -> String {
        id.to_string()
    }
}

/// Move expired in-flight entries back to the ready list.
fn reclaim_expired(inner: &mut Inner) {
    let now = Instant::now();
    let expired: Vec<String> = inner
        .inflight
        .iter()
        .filter(|(_, inflight)| inflight.deadline <= now)
        .map(|(handle, _)| handle.clone())
        .collect();

    for handle in expired {
        if let Some(inflight) = inner.inflight.remove(&handle) {
            let id: u64 = handle.parse().unwrap_or(0);
            inner.ready.push_back((id, inflight.entry));
        }
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, body: Bytes) -> PipelineResult<()> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.ready.push_back((
            id,
            Entry {
                body,
                receive_count: 0,
            },
        ));
        Ok(())
    }

    async fn receive(&self, max: usize, wait: Duration) -> PipelineResult<Vec<Message>> {
        let deadline = Instant::now() + wait;

        loop {
            {
                let mut inner = self.inner.lock().await;
                reclaim_expired(&mut inner);

                if !inner.ready.is_empty() {
                    let mut messages = Vec::new();
                    let visibility_deadline = Instant::now() + self.visibility_timeout;

                    while messages.len() < max {
                        let Some((id, mut entry)) = inner.ready.pop_front() else {
                            break;
                        };
                        entry.receive_count += 1;
                        let handle = Self::handle_for(id);

                        messages.push(Message {
                            body: entry.body.clone(),
                            handle: handle.clone(),
                            receive_count: entry.receive_count,
                        });

                        inner.inflight.insert(
                            handle,
                            Inflight {
                                entry,
                                deadline: visibility_deadline,
                            },
                        );
                    }

                    return Ok(messages);
                }
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn delete(&self, handle: &str) -> PipelineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.inflight.remove(handle);
        // The entry may have expired back onto the ready list; deletion
        // still applies to it there.
        inner.ready.retain(|(id, _)| Self::handle_for(*id) != handle);
        Ok(())
    }
}

//! Durable queues connecting the pipeline stages.
//!
//! Stages never call each other directly: ingest publishes envelopes onto the
//! relay queue, the processor publishes events onto the notification queue.
//! Delivery is at-least-once. A received message stays leased until it is
//! acknowledged; an unacknowledged lease expires and the message is delivered
//! again.

mod backoff;
mod sql;

pub use backoff::Backoff;
pub use sql::SqlQueue;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::Result;

/// Suffix of the queue that receives messages rejected too many times.
pub const DEAD_LETTER_SUFFIX: &str = ".dead";

/// Name of the dead-letter queue for `queue`.
pub fn dead_letter_name(queue: &str) -> String {
    format!("{queue}{DEAD_LETTER_SUFFIX}")
}

/// A message handed out by [`DurableQueue::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Opaque handle used to acknowledge or reject the message.
    pub tag: i64,
    /// Queue the message was received from.
    pub queue: String,
    /// Message body exactly as published.
    pub payload: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
}

impl Delivery {
    /// Payload rendered for log output.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// At-least-once durable queue.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Create the queue if it does not exist yet.
    async fn declare(&self, queue: &str) -> Result<()>;

    /// Append a persistent message. Fails if the queue was never declared.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Lease the oldest available message, if any.
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>>;

    /// Remove a delivered message for good.
    async fn ack(&self, delivery: &Delivery) -> Result<()>;

    /// Reject a delivered message.
    ///
    /// With `requeue` the message becomes available again, unless it has
    /// already been delivered the maximum number of times; messages that
    /// are not requeued go to the dead-letter queue.
    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<()>;

    /// Put a delivered message back after `delay`.
    ///
    /// Unlike [`DurableQueue::nack`] this never dead-letters, however many
    /// times the message has been delivered.
    async fn retry_after(&self, delivery: &Delivery, delay: Duration) -> Result<()>;
}

/// Shared handle to a queue implementation.
pub type SharedQueue = Arc<dyn DurableQueue>;

/// Blocking receive loop over a single queue.
///
/// Empty polls sleep for the poll interval; transport failures are logged
/// and retried with exponential backoff, so [`Consumer::next`] only ever
/// returns a delivery.
pub struct Consumer {
    queue: SharedQueue,
    name: String,
    poll_interval: Duration,
    backoff: Backoff,
}

impl Consumer {
    /// Create a consumer for `name`.
    pub fn new(queue: SharedQueue, name: impl Into<String>, config: &QueueConfig) -> Self {
        Self {
            queue,
            name: name.into(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            backoff: Backoff::new(
                Duration::from_millis(config.backoff_initial_ms),
                Duration::from_millis(config.backoff_max_ms),
            ),
        }
    }

    /// Queue this consumer reads from.
    pub fn queue_name(&self) -> &str {
        &self.name
    }

    /// Wait for the next delivery.
    pub async fn next(&mut self) -> Delivery {
        loop {
            match self.queue.receive(&self.name).await {
                Ok(Some(delivery)) => {
                    self.backoff.reset();
                    debug!(
                        queue = %self.name,
                        tag = delivery.tag,
                        attempt = delivery.attempt,
                        "Received message"
                    );
                    return delivery;
                }
                Ok(None) => {
                    self.backoff.reset();
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(queue = %self.name, error = %e, "Receive failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::ForwarderError;

    /// Fails the first `failures` receives, then hands out one message.
    struct FlakyQueue {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DurableQueue for FlakyQueue {
        async fn declare(&self, _queue: &str) -> Result<()> {
            Ok(())
        }

        async fn publish(&self, _queue: &str, _payload: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ForwarderError::Queue("connection lost".into()));
            }
            if call == self.failures {
                return Ok(None);
            }
            Ok(Some(Delivery {
                tag: call as i64,
                queue: queue.to_string(),
                payload: b"hello".to_vec(),
                attempt: 1,
            }))
        }

        async fn ack(&self, _delivery: &Delivery) -> Result<()> {
            Ok(())
        }

        async fn nack(&self, _delivery: &Delivery, _requeue: bool) -> Result<()> {
            Ok(())
        }

        async fn retry_after(&self, _delivery: &Delivery, _delay: Duration) -> Result<()> {
            Ok(())
        }
    }

    fn fast_config() -> QueueConfig {
        QueueConfig {
            poll_interval_ms: 1,
            backoff_initial_ms: 1,
            backoff_max_ms: 4,
            ..QueueConfig::default()
        }
    }

    #[test]
    fn test_dead_letter_name() {
        assert_eq!(dead_letter_name("emails"), "emails.dead");
    }

    #[test]
    fn test_payload_lossy() {
        let delivery = Delivery {
            tag: 1,
            queue: "emails".into(),
            payload: vec![b'o', b'k', 0xff],
            attempt: 1,
        };
        assert_eq!(delivery.payload_lossy(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_consumer_survives_receive_failures() {
        let queue = Arc::new(FlakyQueue {
            failures: 3,
            calls: AtomicUsize::new(0),
        });
        let mut consumer = Consumer::new(queue.clone(), "emails", &fast_config());
        assert_eq!(consumer.queue_name(), "emails");

        let delivery = consumer.next().await;
        assert_eq!(delivery.payload, b"hello");
        assert_eq!(delivery.queue, "emails");
        // three failures, one empty poll, one delivery
        assert_eq!(queue.calls.load(Ordering::SeqCst), 5);
    }
}

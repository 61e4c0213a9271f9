//! Mail processor.
//!
//! Consumes relay envelopes, stores each as an [`Email`], and announces it on
//! the notification queue. A message is acknowledged only after both the
//! insert and the publish succeeded. An undecodable message goes straight to
//! the dead-letter queue; a storage or publish failure puts the message back
//! after a growing delay, with no limit on attempts. There is no
//! deduplication key: a message redelivered after the insert already
//! happened is stored again under a new ID.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::db::Database;
use crate::envelope::RelayEnvelope;
use crate::mailbox::{extract_subject, Email, EmailRepository, NewEmail};
use crate::notifier::NotificationEvent;
use crate::queue::{Backoff, Consumer, Delivery, SharedQueue};
use crate::{ForwarderError, Result};

/// Failure while handling one relay message.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Payload is not a usable envelope.
    #[error("decode failed: {0}")]
    Decode(ForwarderError),

    /// The email could not be stored.
    #[error("persistence failed: {0}")]
    Persistence(ForwarderError),

    /// The notification event could not be published.
    #[error("publish failed: {0}")]
    Publish(ForwarderError),
}

/// Stores relay envelopes and emits notification events.
pub struct MailProcessor {
    db: Arc<Database>,
    queue: SharedQueue,
    relay_queue: String,
    notification_queue: String,
    retry: Backoff,
}

impl MailProcessor {
    /// Create a processor reading and writing the queues named in `config`.
    pub fn new(db: Arc<Database>, queue: SharedQueue, config: &QueueConfig) -> Self {
        Self {
            db,
            queue,
            relay_queue: config.relay_queue.clone(),
            notification_queue: config.notification_queue.clone(),
            retry: Backoff::new(
                Duration::from_millis(config.backoff_initial_ms),
                Duration::from_millis(config.backoff_max_ms),
            ),
        }
    }

    /// Queue this processor consumes.
    pub fn relay_queue(&self) -> &str {
        &self.relay_queue
    }

    /// Decode, store and announce one envelope. Does not touch the
    /// inbound message's acknowledgment.
    pub async fn process_payload(
        &self,
        payload: &[u8],
    ) -> std::result::Result<(Email, NotificationEvent), ProcessError> {
        let envelope = RelayEnvelope::from_bytes(payload).map_err(ProcessError::Decode)?;
        let raw = envelope.decode_content().map_err(ProcessError::Decode)?;

        // Only the first recipient is stored
        let recipient = envelope.first_recipient().ok_or_else(|| {
            ProcessError::Decode(ForwarderError::Codec("envelope has no recipients".into()))
        })?;

        let subject = extract_subject(&raw);

        let email = EmailRepository::new(self.db.pool())
            .create(&NewEmail::new(&envelope.sender, recipient, &envelope.content))
            .await
            .map_err(ProcessError::Persistence)?;

        let event = NotificationEvent {
            sender: email.sender.clone(),
            recipient: email.recipient.clone(),
            subject,
            id: email.id,
        };
        let bytes = event.to_bytes().map_err(ProcessError::Publish)?;
        self.queue
            .publish(&self.notification_queue, &bytes)
            .await
            .map_err(ProcessError::Publish)?;

        Ok((email, event))
    }

    /// Process a delivery and settle it: ack on success, dead-letter or
    /// schedule a retry on failure.
    pub async fn handle_delivery(
        &self,
        delivery: &Delivery,
    ) -> std::result::Result<NotificationEvent, ProcessError> {
        match self.process_payload(&delivery.payload).await {
            Ok((email, event)) => {
                if let Err(e) = self.queue.ack(delivery).await {
                    // The message will come back and be stored a second time
                    warn!(
                        queue = %delivery.queue,
                        tag = delivery.tag,
                        email_id = email.id,
                        error = %e,
                        "Failed to acknowledge processed message"
                    );
                }
                info!(
                    email_id = email.id,
                    sender = %email.sender,
                    recipient = %email.recipient,
                    "Stored email"
                );
                Ok(event)
            }
            Err(e) => {
                error!(
                    queue = %delivery.queue,
                    tag = delivery.tag,
                    attempt = delivery.attempt,
                    payload = %delivery.payload_lossy(),
                    error = %e,
                    "Failed to process message"
                );
                self.settle_failure(delivery, &e).await;
                Err(e)
            }
        }
    }

    /// Dead-letter undecodable messages; retry everything else later.
    async fn settle_failure(&self, delivery: &Delivery, error: &ProcessError) {
        let settled = match error {
            ProcessError::Decode(_) => self.queue.nack(delivery, false).await,
            ProcessError::Persistence(_) | ProcessError::Publish(_) => {
                let delay = self.retry.delay_for_attempt(delivery.attempt);
                debug!(tag = delivery.tag, "Retrying message in {:?}", delay);
                self.queue.retry_after(delivery, delay).await
            }
        };

        if let Err(e) = settled {
            warn!(
                tag = delivery.tag,
                error = %e,
                "Failed to reject message, it will be redelivered after its lease expires"
            );
        }
    }

    /// Receive and handle at most one message.
    ///
    /// Returns `Ok(None)` when the relay queue is empty.
    pub async fn process_next(
        &self,
    ) -> Result<Option<std::result::Result<NotificationEvent, ProcessError>>> {
        let Some(delivery) = self.queue.receive(&self.relay_queue).await? else {
            return Ok(None);
        };
        Ok(Some(self.handle_delivery(&delivery).await))
    }

    /// Run the processor loop with at most `prefetch` messages in flight.
    ///
    /// Never returns; failures are logged per message.
    pub async fn run(self: Arc<Self>, mut consumer: Consumer, prefetch: usize) {
        info!(
            queue = %consumer.queue_name(),
            prefetch,
            "Mail processor started"
        );

        let semaphore = Arc::new(Semaphore::new(prefetch.max(1)));

        loop {
            // Acquire a slot before taking a message off the queue
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!("Processor semaphore closed");
                    return;
                }
            };

            let delivery = consumer.next().await;
            let processor = Arc::clone(&self);

            tokio::spawn(async move {
                if processor.handle_delivery(&delivery).await.is_ok() {
                    debug!(tag = delivery.tag, "Message processed");
                }
                // Permit is dropped here, releasing the slot
                drop(permit);
            });
        }
    }
}

//! Chat notifications for newly stored mail.
//!
//! Two independent tasks share a [`PendingNotifications`] buffer:
//!
//! - [`NotificationForwarder`] moves events from the notification queue into
//!   the buffer, acknowledging each message as soon as it is buffered.
//! - [`Notifier`] wakes up periodically, drains the buffer and sends a
//!   direct message to the owner of each recipient address.
//!
//! Events still buffered when the process dies are lost; the stored email
//! itself remains retrievable.

mod event;
mod pending;

pub use event::NotificationEvent;
pub use pending::PendingNotifications;

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::chat::ChatClient;
use crate::db::Database;
use crate::directory::AddressDirectory;
use crate::queue::{Consumer, Delivery, SharedQueue};

/// Text of the direct message announcing `event`.
pub fn format_notification(command_prefix: &str, event: &NotificationEvent) -> String {
    format!(
        ":incoming_envelope: New email from `{}` on `{}`!\nSubject: `{}`\nView with `{}email view {}`",
        event.sender, event.recipient, event.subject, command_prefix, event.id
    )
}

/// Moves notification events from the durable queue into the buffer.
pub struct NotificationForwarder {
    queue: SharedQueue,
    pending: PendingNotifications,
}

impl NotificationForwarder {
    /// Create a forwarder feeding `pending`.
    pub fn new(queue: SharedQueue, pending: PendingNotifications) -> Self {
        Self { queue, pending }
    }

    /// Buffer one delivery and settle it.
    ///
    /// Undecodable events are rejected without requeue, which sends them to
    /// the dead-letter queue.
    pub async fn forward(&self, delivery: &Delivery) {
        match NotificationEvent::from_bytes(&delivery.payload) {
            Ok(event) => {
                debug!(email_id = event.id, "Buffered notification");
                self.pending.push(event).await;
                if let Err(e) = self.queue.ack(delivery).await {
                    warn!(tag = delivery.tag, error = %e, "Failed to acknowledge notification");
                }
            }
            Err(e) => {
                error!(
                    queue = %delivery.queue,
                    tag = delivery.tag,
                    payload = %delivery.payload_lossy(),
                    error = %e,
                    "Discarding malformed notification"
                );
                if let Err(e) = self.queue.nack(delivery, false).await {
                    warn!(tag = delivery.tag, error = %e, "Failed to reject notification");
                }
            }
        }
    }

    /// Forward deliveries forever.
    pub async fn run(&self, mut consumer: Consumer) {
        info!(queue = %consumer.queue_name(), "Notification consumer started");
        loop {
            let delivery = consumer.next().await;
            self.forward(&delivery).await;
        }
    }
}

/// Counts from one notifier cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages sent.
    pub delivered: usize,
    /// Events for addresses nobody has claimed.
    pub skipped: usize,
    /// Events whose delivery failed.
    pub failed: usize,
}

/// Periodic notification sender.
pub struct Notifier {
    db: Arc<Database>,
    chat: Arc<dyn ChatClient>,
    pending: PendingNotifications,
    interval: Duration,
    command_prefix: String,
}

impl Notifier {
    /// Create a notifier draining `pending` every `interval_secs` seconds.
    pub fn new(
        db: Arc<Database>,
        chat: Arc<dyn ChatClient>,
        pending: PendingNotifications,
        interval_secs: u64,
        command_prefix: impl Into<String>,
    ) -> Self {
        Self {
            db,
            chat,
            pending,
            interval: Duration::from_secs(interval_secs.max(1)),
            command_prefix: command_prefix.into(),
        }
    }

    /// Run the notifier loop.
    pub async fn run(&self) {
        info!(
            "Notifier started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);

        loop {
            timer.tick().await;
            let report = self.deliver_pending().await;
            if report != DeliveryReport::default() {
                info!(
                    delivered = report.delivered,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Notifier cycle finished"
                );
            }
        }
    }

    /// Drain the buffer and deliver every event in it.
    ///
    /// A failure on one event never stops the rest of the batch.
    pub async fn deliver_pending(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if self.pending.is_empty().await {
            return report;
        }

        let events = self.pending.drain().await;
        debug!("Delivering {} notification(s)", events.len());

        for event in events {
            match self.deliver(&event).await {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        email_id = event.id,
                        recipient = %event.recipient,
                        error = %e,
                        "Error while notifying owner"
                    );
                }
            }
        }

        report
    }

    /// Deliver one event. Returns false when the recipient has no owner.
    async fn deliver(&self, event: &NotificationEvent) -> crate::Result<bool> {
        let Some(owner) = AddressDirectory::new(&self.db)
            .resolve_owner(&event.recipient)
            .await?
        else {
            debug!(recipient = %event.recipient, "No owner, skipping notification");
            return Ok(false);
        };

        let chat_user = self.chat.fetch_user(&owner.external_id).await?;
        let text = format_notification(&self.command_prefix, event);
        self.chat.send_direct_message(&chat_user, &text).await?;

        debug!(email_id = event.id, user_id = owner.id, "Notification delivered");
        Ok(true)
    }
}

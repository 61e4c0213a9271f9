//! SMTP ingest.
//!
//! The SMTP session itself is terminated by `mailin-embedded`; this module
//! turns each completed mail transaction into a relay envelope and publishes
//! it on the relay queue.

mod handler;

pub use handler::{start_smtp_server, SmtpHandler};

use tracing::debug;

use crate::envelope::{MailTransaction, RelayEnvelope};
use crate::queue::SharedQueue;
use crate::Result;

/// Acknowledgment returned for every accepted transaction.
pub const ACCEPTED: &str = "250 OK";

/// Publishes accepted mail onto the relay queue.
pub struct IngestService {
    queue: SharedQueue,
    relay_queue: String,
}

impl IngestService {
    /// Create an ingest service publishing to `relay_queue`.
    pub fn new(queue: SharedQueue, relay_queue: impl Into<String>) -> Self {
        Self {
            queue,
            relay_queue: relay_queue.into(),
        }
    }

    /// Encode and publish one transaction.
    ///
    /// Addresses are not validated here. On error nothing was published and
    /// the SMTP client should be told to retry later.
    pub async fn accept(&self, transaction: MailTransaction) -> Result<&'static str> {
        let payload = RelayEnvelope::encode(&transaction).to_bytes()?;
        self.queue.publish(&self.relay_queue, &payload).await?;

        debug!(
            sender = %transaction.sender,
            recipients = transaction.recipients.len(),
            bytes = transaction.content.len(),
            "Mail accepted"
        );
        Ok(ACCEPTED)
    }
}

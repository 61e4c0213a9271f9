//! Relay envelope: the queue representation of an accepted mail transaction.
//!
//! Wire format (JSON):
//! `{"recipients": [string, ...], "sender": string, "content": base64-string}`

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A mail transaction as handed over by the SMTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTransaction {
    /// Envelope sender (`MAIL FROM`).
    pub sender: String,
    /// Envelope recipients (`RCPT TO`), in the order received.
    pub recipients: Vec<String>,
    /// Raw message bytes, possibly empty.
    pub content: Vec<u8>,
}

impl MailTransaction {
    /// Create a new transaction.
    pub fn new(
        sender: impl Into<String>,
        recipients: Vec<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipients,
            content: content.into(),
        }
    }
}

/// Transport-safe record published on the relay queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub recipients: Vec<String>,
    pub sender: String,
    /// Base64 of the raw message.
    pub content: String,
}

impl RelayEnvelope {
    /// Encode a transaction. Addresses are carried as-is.
    pub fn encode(transaction: &MailTransaction) -> Self {
        Self {
            recipients: transaction.recipients.clone(),
            sender: transaction.sender.clone(),
            content: STANDARD.encode(&transaction.content),
        }
    }

    /// Serialize for publication.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a queue payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The raw message bytes.
    pub fn decode_content(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.content.as_bytes())?)
    }

    /// The only recipient that is persisted.
    pub fn first_recipient(&self) -> Option<&str> {
        self.recipients.first().map(String::as_str)
    }

    /// Convert back into a transaction.
    pub fn into_transaction(self) -> Result<MailTransaction> {
        let content = self.decode_content()?;
        Ok(MailTransaction {
            sender: self.sender,
            recipients: self.recipients,
            content,
        })
    }
}

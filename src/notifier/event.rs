//! Notification events carried on the notification queue.

use serde::{Deserialize, Serialize};

use crate::Result;

/// A newly stored email, announced to the notifier.
///
/// Wire format: `{"sender": string, "recipient": string, "subject": string, "id": integer}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    /// ID of the stored email.
    pub id: i64,
}

impl NotificationEvent {
    /// Serialize for publication.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a queue payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

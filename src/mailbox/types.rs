//! Stored email types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::parse::ParsedMail;
use crate::Result;

/// Number of emails shown per mailbox page.
pub const PAGE_SIZE: i64 = 10;

/// A stored email. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Email {
    /// Email ID, assigned on insert and used as the user-facing reference.
    pub id: i64,
    /// Envelope sender.
    pub sender: String,
    /// Envelope recipient (need not be claimed).
    pub recipient: String,
    /// Base64 of the raw message.
    pub content: String,
    /// When the email was stored.
    pub received_at: String,
}

impl Email {
    /// Decode the stored content back to raw message bytes.
    pub fn raw_content(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.content.as_bytes())?)
    }

    /// Parse subject and body on demand.
    ///
    /// Content that is not valid base64 is parsed as-is.
    pub fn parsed(&self) -> ParsedMail {
        match self.raw_content() {
            Ok(raw) => ParsedMail::parse(&raw),
            Err(_) => ParsedMail::parse(self.content.as_bytes()),
        }
    }
}

/// New email for creation.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub sender: String,
    pub recipient: String,
    /// Base64 of the raw message.
    pub content: String,
}

impl NewEmail {
    /// Create a new email record.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
        }
    }
}

/// One page of a mailbox listing.
#[derive(Debug, Clone)]
pub struct MailboxPage {
    /// 1-based page number.
    pub page: i64,
    /// Number of pages available.
    pub total_pages: i64,
    /// Number of emails across all pages.
    pub total: i64,
    /// Emails on this page, newest first.
    pub emails: Vec<Email>,
}

/// Number of pages needed for `count` emails.
pub fn page_count(count: i64) -> i64 {
    if count <= 0 {
        0
    } else {
        (count + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

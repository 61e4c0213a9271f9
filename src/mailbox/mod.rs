//! Mailbox queries.
//!
//! Listing and retrieval of stored emails, always scoped to a set of
//! addresses owned by the caller. Subjects and bodies are parsed from the
//! stored content on read.

mod parse;
mod repository;
mod types;

pub use parse::{extract_subject, ParsedMail, NO_SUBJECT};
pub use repository::EmailRepository;
pub use types::{page_count, Email, MailboxPage, NewEmail, PAGE_SIZE};

use thiserror::Error;

use crate::db::Database;
use crate::ForwarderError;

/// Caller-visible mailbox outcomes other than success.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Page index below 1 or past the last page.
    #[error("no such page")]
    NoSuchPage,

    /// The caller's addresses have no mail at all.
    #[error("inbox is empty")]
    InboxEmpty,

    /// Email missing or not addressed to the caller.
    #[error("email not found")]
    NotFound,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] ForwarderError),
}

/// Result type for mailbox queries.
pub type MailboxResult<T> = std::result::Result<T, MailboxError>;

/// Service for mailbox queries.
pub struct MailboxService<'a> {
    db: &'a Database,
}

impl<'a> MailboxService<'a> {
    /// Create a new MailboxService with the given database reference.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Number of emails addressed to any of `addresses`.
    pub async fn count(&self, addresses: &[String]) -> MailboxResult<i64> {
        Ok(EmailRepository::new(self.db.pool())
            .count_for_recipients(addresses)
            .await?)
    }

    /// Page `page` (1-based) of the mailbox, newest first.
    ///
    /// # Errors
    ///
    /// - [`MailboxError::NoSuchPage`] if `page` is below 1 or past the last page
    /// - [`MailboxError::InboxEmpty`] if there is no mail for `addresses`
    pub async fn list(&self, addresses: &[String], page: i64) -> MailboxResult<MailboxPage> {
        if page < 1 {
            return Err(MailboxError::NoSuchPage);
        }

        let repo = EmailRepository::new(self.db.pool());
        let total = repo.count_for_recipients(addresses).await?;
        if total == 0 {
            return Err(MailboxError::InboxEmpty);
        }

        let total_pages = page_count(total);
        if page > total_pages {
            return Err(MailboxError::NoSuchPage);
        }

        let emails = repo
            .list_for_recipients(addresses, PAGE_SIZE, (page - 1) * PAGE_SIZE)
            .await?;

        Ok(MailboxPage {
            page,
            total_pages,
            total,
            emails,
        })
    }

    /// Email `id`, if it is addressed to one of `addresses`.
    ///
    /// Emails belonging to someone else are reported exactly like missing ones.
    pub async fn get(&self, addresses: &[String], id: i64) -> MailboxResult<Email> {
        let email = EmailRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or(MailboxError::NotFound)?;

        if !addresses.iter().any(|address| *address == email.recipient) {
            return Err(MailboxError::NotFound);
        }

        Ok(email)
    }
}

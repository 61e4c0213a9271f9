//! Mail forwarder
//!
//! Accepts mail over SMTP, stores it per recipient address and notifies the
//! address owner on a chat platform, where the inbox can be browsed with
//! `alias` and `email` commands.

pub mod chat;
pub mod config;
pub mod db;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod mailbox;
pub mod notifier;
pub mod processor;
pub mod queue;
pub mod smtp;
pub mod web;

pub use chat::{ChatClient, CommandHandler, DiscordClient};
pub use config::Config;
pub use db::Database;
pub use directory::{AddressDirectory, DirectoryError};
pub use envelope::{MailTransaction, RelayEnvelope};
pub use error::{ForwarderError, Result};
pub use mailbox::{MailboxError, MailboxService};
pub use notifier::{NotificationEvent, NotificationForwarder, Notifier, PendingNotifications};
pub use processor::{MailProcessor, ProcessError};
pub use queue::{DurableQueue, SharedQueue, SqlQueue};
pub use smtp::IngestService;

//! Command execution and reply rendering.

use std::fmt::Write as _;

use tracing::debug;

use super::client::truncate_message;
use super::command::{alias_help, email_help, parse_command, Command};
use crate::db::Database;
use crate::directory::{AddressDirectory, DirectoryError};
use crate::mailbox::{MailboxError, MailboxPage, MailboxService, PAGE_SIZE};
use crate::Result;

/// Executes chat commands on behalf of a chat user.
///
/// Storage failures are returned as errors rather than rendered, so the
/// caller can stay silent while the store is unreachable.
pub struct CommandHandler<'a> {
    db: &'a Database,
    prefix: &'a str,
}

impl<'a> CommandHandler<'a> {
    /// Create a handler recognizing commands after `prefix`.
    pub fn new(db: &'a Database, prefix: &'a str) -> Self {
        Self { db, prefix }
    }

    /// Handle one chat line from `external_id`.
    ///
    /// Returns `Ok(None)` if the line is not a command.
    pub async fn handle(&self, external_id: &str, line: &str) -> Result<Option<String>> {
        let Some(command) = parse_command(self.prefix, line) else {
            return Ok(None);
        };
        debug!(external_id, ?command, "Handling command");

        let reply = match command {
            Command::AliasHelp => alias_help(self.prefix),
            Command::EmailHelp => email_help(self.prefix),
            Command::Invalid(message) => message,
            Command::AliasList => self.alias_list(external_id).await?,
            Command::AliasAdd(address) => self.alias_add(external_id, &address).await?,
            Command::AliasRemove(address) => self.alias_remove(external_id, &address).await?,
            Command::EmailList(page) => self.email_list(external_id, page).await?,
            Command::EmailView(id) => self.email_view(external_id, id).await?,
        };

        Ok(Some(reply))
    }

    async fn alias_list(&self, external_id: &str) -> Result<String> {
        let directory = AddressDirectory::new(self.db);
        let addresses = match directory.resolve_user(external_id).await? {
            Some(user) => directory.owned_addresses(&user).await?,
            None => Vec::new(),
        };

        if addresses.is_empty() {
            return Ok("You don't currently have any added aliases".to_string());
        }

        let mut reply = String::from("Current aliases for your account:\n```\n");
        for address in addresses {
            let _ = writeln!(reply, "- {address}");
        }
        reply.push_str("```");
        Ok(reply)
    }

    async fn alias_add(&self, external_id: &str, address: &str) -> Result<String> {
        match AddressDirectory::new(self.db).claim(external_id, address).await {
            Ok(_) => Ok(format!("Successfully added `{address}` to your account")),
            Err(DirectoryError::InvalidFormat) => Ok("The given alias is invalid".to_string()),
            Err(DirectoryError::AlreadyClaimed) => {
                Ok("The given alias is already taken".to_string())
            }
            Err(DirectoryError::NotOwned) | Err(DirectoryError::NotFound) => {
                Ok("The given alias is already taken".to_string())
            }
            Err(DirectoryError::Store(e)) => Err(e),
        }
    }

    async fn alias_remove(&self, external_id: &str, address: &str) -> Result<String> {
        match AddressDirectory::new(self.db).release(external_id, address).await {
            Ok(()) => Ok(format!("Successfully removed `{address}` from your account")),
            Err(DirectoryError::InvalidFormat) => Ok("The given alias is invalid".to_string()),
            Err(DirectoryError::NotFound) => Ok("The given alias is not used".to_string()),
            Err(DirectoryError::NotOwned) | Err(DirectoryError::AlreadyClaimed) => {
                Ok("The given alias does not belong to you".to_string())
            }
            Err(DirectoryError::Store(e)) => Err(e),
        }
    }

    async fn owned_addresses(&self, external_id: &str) -> Result<Vec<String>> {
        let directory = AddressDirectory::new(self.db);
        let user = directory.ensure_user(external_id).await?;
        directory.owned_addresses(&user).await
    }

    async fn email_list(&self, external_id: &str, page: i64) -> Result<String> {
        let addresses = self.owned_addresses(external_id).await?;

        match MailboxService::new(self.db).list(&addresses, page).await {
            Ok(page) => Ok(render_page(&page)),
            Err(MailboxError::NoSuchPage) => Ok("There is no such page".to_string()),
            Err(MailboxError::InboxEmpty) => Ok("Your inbox is empty".to_string()),
            Err(MailboxError::NotFound) => Ok("There is no such page".to_string()),
            Err(MailboxError::Store(e)) => Err(e),
        }
    }

    async fn email_view(&self, external_id: &str, id: i64) -> Result<String> {
        let addresses = self.owned_addresses(external_id).await?;

        match MailboxService::new(self.db).get(&addresses, id).await {
            Ok(email) => {
                let parsed = email.parsed();
                Ok(truncate_message(&format!(
                    "To: `{}`\nFrom: `{}`\nSubject: `{}`\n```\n{}\n```",
                    email.recipient,
                    email.sender,
                    parsed.subject,
                    parsed.body.trim_end()
                )))
            }
            Err(MailboxError::Store(e)) => Err(e),
            Err(_) => Ok("That email does not exist".to_string()),
        }
    }
}

fn render_page(page: &MailboxPage) -> String {
    let mut reply = format!(
        "Showing page {} / {} (Total {} emails, showing {} per page)\n```\n id | [From] Subject\n",
        page.page, page.total_pages, page.total, PAGE_SIZE
    );
    for email in &page.emails {
        let _ = writeln!(
            reply,
            "{:3} | [{}] {}",
            email.id,
            email.sender,
            email.parsed().subject
        );
    }
    reply.push_str("```");
    truncate_message(&reply)
}

//! Chat platform integration.
//!
//! This module provides:
//! - The [`ChatClient`] seam used by the notifier, with a Discord implementation
//! - The `alias` / `email` command parser
//! - [`CommandHandler`], which runs commands against the directory and mailbox

mod client;
mod command;
mod discord;
mod handler;

pub use client::{truncate_message, ChatClient, ChatUser, MAX_MESSAGE_LENGTH};
pub use command::{alias_help, email_help, parse_command, Command};
pub use discord::DiscordClient;
pub use handler::CommandHandler;

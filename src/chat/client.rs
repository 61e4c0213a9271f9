//! Chat platform client abstraction.

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;

/// Maximum length of a single chat message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// A user on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatUser {
    /// Platform user ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub username: String,
}

/// Client able to look up users and send them direct messages.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Fetch a user by platform ID.
    async fn fetch_user(&self, external_id: &str) -> Result<ChatUser>;

    /// Send a direct message.
    async fn send_direct_message(&self, user: &ChatUser, text: &str) -> Result<()>;
}

/// Cut `text` to the platform limit, marking the cut with an ellipsis.
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LENGTH {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_MESSAGE_LENGTH - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_message() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn test_truncate_long_message() {
        let text = "é".repeat(MAX_MESSAGE_LENGTH + 10);
        let truncated = truncate_message(&text);
        assert_eq!(truncated.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn test_chat_user_ignores_extra_fields() {
        let user: ChatUser =
            serde_json::from_str(r#"{"id":"42","username":"alice","avatar":null}"#).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.username, "alice");
    }
}

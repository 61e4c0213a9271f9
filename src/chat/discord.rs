//! Discord REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::client::{truncate_message, ChatClient, ChatUser};
use crate::config::ChatConfig;
use crate::{ForwarderError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 30;

/// User agent string sent with every request.
const USER_AGENT: &str = concat!("DiscordBot (forwarder, ", env!("CARGO_PKG_VERSION"), ")");

#[derive(Serialize)]
struct CreateDm<'a> {
    recipient_id: &'a str,
}

#[derive(Deserialize)]
struct Channel {
    id: String,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Chat client talking to the Discord HTTP API with a bot token.
pub struct DiscordClient {
    client: Client,
    base: Url,
    token: String,
}

impl DiscordClient {
    /// Create a client from configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ForwarderError::Chat(format!("failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with a slash
        let mut base = config.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| ForwarderError::Config(format!("invalid chat.api_base: {e}")))?;

        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| ForwarderError::Chat(format!("invalid path {path}: {e}")))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForwarderError::Chat(format!(
                "{method} {path} returned {status}"
            )));
        }

        Ok(response.json::<T>().await?)
    }

    async fn open_dm(&self, user: &ChatUser) -> Result<String> {
        let channel: Channel = self
            .request(
                Method::POST,
                "users/@me/channels",
                Some(&CreateDm {
                    recipient_id: &user.id,
                }),
            )
            .await?;
        Ok(channel.id)
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn fetch_user(&self, external_id: &str) -> Result<ChatUser> {
        // IDs are snowflakes; anything else would alter the request path
        if external_id.is_empty() || !external_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ForwarderError::Validation(format!(
                "invalid user id: {external_id}"
            )));
        }
        self.request::<(), ChatUser>(Method::GET, &format!("users/{external_id}"), None)
            .await
    }

    async fn send_direct_message(&self, user: &ChatUser, text: &str) -> Result<()> {
        let channel_id = self.open_dm(user).await?;
        let content = truncate_message(text);

        let _: serde_json::Value = self
            .request(
                Method::POST,
                &format!("channels/{channel_id}/messages"),
                Some(&CreateMessage { content: &content }),
            )
            .await?;

        debug!(user_id = %user.id, channel_id = %channel_id, "Direct message sent");
        Ok(())
    }
}

//! HTTP transport posting the conversation to a running chat server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatTransport, Turn};
use crate::error::ChatError;

/// Path of the chat endpoint on the server.
pub const CHAT_PATH: &str = "/api/chat";

const FALLBACK_ERROR: &str = "Failed to get response from API";

#[derive(Serialize)]
struct OutgoingRequest<'a> {
    messages: &'a [Turn],
}

#[derive(Deserialize)]
struct ReplyBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`ChatTransport`] talking to the server's `POST /api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url` (e.g. "http://127.0.0.1:3000").
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, turns: &[Turn]) -> Result<String, ChatError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&OutgoingRequest { messages: turns })
            .send()
            .await?;

        let status = resp.status();
        log::debug!("chat server HTTP status: {}", status);
        let body = resp.text().await?;
        let reply: ReplyBody = serde_json::from_str(&body)?;

        if !status.is_success() {
            return Err(ChatError::ProviderError(
                reply.error.unwrap_or_else(|| FALLBACK_ERROR.to_string()),
            ));
        }
        reply
            .text
            .ok_or_else(|| ChatError::ProviderError(FALLBACK_ERROR.to_string()))
    }
}

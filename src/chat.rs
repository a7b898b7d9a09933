//! Fallback chat over plain HTTP
//!
//! The floating chat widget talks to `POST /chat` instead of holding a live
//! socket open. Failures of any kind resolve to a fixed apology so the
//! widget always has something to show.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Reply shown whenever the chat backend cannot produce one
pub const CHAT_FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach your style assistant right now. Please try again in a moment.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,

    /// Base64-encoded spoken version of the reply, when the backend
    /// provides one
    #[serde(default)]
    pub audio: Option<String>,
}

pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat", base_url.trim_end_matches('/')),
        }
    }

    /// Send one message. Never fails; transport and server errors all
    /// resolve to the fallback reply.
    pub async fn send_message(&self, message: &str) -> ChatReply {
        match self.request(message).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                ChatReply {
                    response: CHAT_FALLBACK_REPLY.to_string(),
                    audio: None,
                }
            }
        }
    }

    async fn request(&self, message: &str) -> anyhow::Result<ChatReply> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("chat endpoint returned {}", response.status());
        }
        Ok(response.json::<ChatReply>().await?)
    }
}

//! Language model client contract.

use crate::errors::BridgeError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One generation request.
#[derive(Debug, Clone, Default)]
pub struct ModelPrompt {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// The model's text reply.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: String,
}

/// Abstraction over LLM vendors so multiple backends can plug in.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<ModelReply, BridgeError>;
}

/// Deterministic client used for tests and offline development: replays a
/// scripted queue of replies, then fails.
#[derive(Debug, Default)]
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedModelClient {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::new([reply.into()])
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(&self, _prompt: &ModelPrompt) -> Result<ModelReply, BridgeError> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| BridgeError::Model("scripted reply queue poisoned".into()))?;
        match replies.pop_front() {
            Some(content) => Ok(ModelReply { content }),
            None => Err(BridgeError::Model("scripted reply queue exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_client_replays_in_order() {
        let client = ScriptedModelClient::new(["one".to_string(), "two".to_string()]);
        let prompt = ModelPrompt::default();
        assert_eq!(client.generate(&prompt).await.unwrap().content, "one");
        assert_eq!(client.generate(&prompt).await.unwrap().content, "two");
        assert!(client.generate(&prompt).await.is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::traits::{Message, MessageRole};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

// =============================================================================
// Chat Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Anthropic takes the system prompt as a top-level field, so system
    /// messages are hoisted out of the conversation and joined.
    pub fn from_messages(model: impl Into<String>, messages: &[Message]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let conversation = messages
            .iter()
            .filter_map(|m| match m.role {
                MessageRole::System => None,
                MessageRole::User => Some(WireMessage {
                    role: Role::User,
                    content: m.content.clone(),
                }),
                MessageRole::Assistant => Some(WireMessage {
                    role: Role::Assistant,
                    content: m.content.clone(),
                }),
            })
            .collect();

        Self {
            model: model.into(),
            max_tokens: 4096,
            messages: conversation,
            system: if system.is_empty() {
                DEFAULT_SYSTEM_PROMPT.to_string()
            } else {
                system.join("\n\n")
            },
            temperature: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

// =============================================================================
// Chat Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub content: Vec<ContentBlock>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<String> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                ContentBlock::Other => None,
            })
            .next()
    }
}

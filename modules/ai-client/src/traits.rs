use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AiError;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Model naming
// =============================================================================

/// How a backend expects model identifiers to be spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelNaming {
    /// `vendor/model`, as OpenRouter routes them.
    VendorPrefixed,
    /// The vendor's own bare name (`gpt-4`, `claude-3-5-sonnet-20241022`).
    Bare,
}

impl ModelNaming {
    /// Translate a model identifier into this naming convention.
    pub fn translate(&self, model: &str) -> String {
        match self {
            ModelNaming::VendorPrefixed => {
                if model.contains('/') {
                    return model.to_string();
                }
                let lower = model.to_lowercase();
                if lower.contains("gpt") {
                    format!("openai/{model}")
                } else if lower.contains("claude") {
                    format!("anthropic/{model}")
                } else {
                    model.to_string()
                }
            }
            ModelNaming::Bare => model.rsplit('/').next().unwrap_or(model).to_string(),
        }
    }
}

// =============================================================================
// TextProvider Trait
// =============================================================================

/// One text-generation backend. The gateway only ever talks to this.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Registration name (`openrouter`, `openai`, `anthropic`, ...).
    fn name(&self) -> &str;

    fn model_naming(&self) -> ModelNaming;

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AiError>;
}

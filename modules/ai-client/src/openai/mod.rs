pub(crate) mod types;

use async_trait::async_trait;

use crate::error::AiError;
use crate::http::{bearer_headers, post_json};
use crate::traits::{Message, ModelNaming, TextProvider};
use types::{ChatRequest, ChatResponse};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completions. Takes bare model names (`gpt-4`).
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[async_trait]
impl TextProvider for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_naming(&self) -> ModelNaming {
        ModelNaming::Bare
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AiError> {
        let mut request = ChatRequest::new(model, messages).max_tokens(max_tokens);
        // gpt-5 family rejects explicit temperature
        if !model.starts_with("gpt-5") {
            request = request.temperature(temperature);
        }

        let response: ChatResponse = post_json(
            &self.http,
            "openai",
            &format!("{}/chat/completions", self.base_url),
            bearer_headers(&self.api_key)?,
            &request,
        )
        .await?;
        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse("OpenAI".into()))
    }
}

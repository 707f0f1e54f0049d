pub(crate) mod types;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::error::AiError;
use crate::http::post_json;
use crate::traits::{Message, ModelNaming, TextProvider};
use types::{ChatRequest, ChatResponse};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API. Takes bare model names (`claude-3-5-sonnet`).
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AiError::Config("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl TextProvider for Claude {
    fn name(&self) -> &str {
        "anthropic"
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
        let request = ChatRequest::from_messages(model, messages)
            .max_tokens(max_tokens)
            .temperature(temperature);

        let response: ChatResponse = post_json(
            &self.http,
            "anthropic",
            &format!("{}/messages", self.base_url),
            self.headers()?,
            &request,
        )
        .await?;
        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse("Claude".into()))
    }
}

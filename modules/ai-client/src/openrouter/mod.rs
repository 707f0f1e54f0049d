use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::AiError;
use crate::http::{bearer_headers, post_json};
use crate::openai::types::{ChatRequest, ChatResponse};
use crate::traits::{Message, ModelNaming, TextProvider};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter speaks the OpenAI chat format but routes `vendor/model` names.
#[derive(Clone)]
pub struct OpenRouter {
    api_key: String,
    app_name: Option<String>,
    site_url: Option<String>,
    http: reqwest::Client,
}

impl OpenRouter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_name: None,
            site_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| {
            AiError::Config("OPENROUTER_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    /// Sent as `X-Title`.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sent as `HTTP-Referer`.
    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = bearer_headers(&self.api_key)?;
        // Invalid attribution values are dropped.
        let optional = [("http-referer", &self.site_url), ("x-title", &self.app_name)];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl TextProvider for OpenRouter {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn model_naming(&self) -> ModelNaming {
        ModelNaming::VendorPrefixed
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AiError> {
        let request = ChatRequest::new(model, messages)
            .max_tokens(max_tokens)
            .temperature(temperature);

        let response: ChatResponse = post_json(
            &self.http,
            "openrouter",
            &format!("{OPENROUTER_API_URL}/chat/completions"),
            self.headers()?,
            &request,
        )
        .await?;
        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse("OpenRouter".into()))
    }
}

//! Ordered, health-aware fallback over the registered text providers.
//!
//! One pass only: the default provider first with the primary model, then
//! every other provider in registration order with the backup model
//! translated to that provider's naming. No retries, no backoff.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AiError;
use crate::traits::{Message, TextProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single generation call as callers describe it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    /// Overrides the gateway's default model for the primary attempt.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: 2000,
            temperature: 0.7,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

pub struct ProviderGateway {
    providers: Vec<Arc<dyn TextProvider>>,
    default_provider: String,
    default_model: String,
    backup_model: String,
    timeout: Duration,
}

impl ProviderGateway {
    pub fn new(
        default_provider: impl Into<String>,
        default_model: impl Into<String>,
        backup_model: impl Into<String>,
    ) -> Self {
        Self {
            providers: Vec::new(),
            default_provider: default_provider.into(),
            default_model: default_model.into(),
            backup_model: backup_model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(self, provider: impl TextProvider + 'static) -> Self {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(mut self, provider: Arc<dyn TextProvider>) -> Self {
        info!(provider = provider.name(), "AI provider registered");
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn primary(&self) -> Option<&Arc<dyn TextProvider>> {
        self.providers
            .iter()
            .find(|p| p.name() == self.default_provider)
    }

    async fn call(
        &self,
        provider: &dyn TextProvider,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, AiError> {
        match tokio::time::timeout(
            self.timeout,
            provider.generate(
                &request.messages,
                model,
                request.max_tokens,
                request.temperature,
            ),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Call the default provider (or the first registered one) exactly once.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let provider = self
            .primary()
            .or_else(|| self.providers.first())
            .ok_or(AiError::AllProvidersExhausted { attempts: 0 })?;
        let model = provider
            .model_naming()
            .translate(request.model.as_deref().unwrap_or(&self.default_model));
        self.call(provider.as_ref(), &model, request).await
    }

    /// Try every registered provider at most once, default first.
    ///
    /// Returns the first success, or `AllProvidersExhausted` once every
    /// provider has been attempted. Callers treat exhaustion as "AI
    /// unavailable" and fall back to heuristics.
    pub async fn generate_with_fallback(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, AiError> {
        let mut attempts = 0usize;

        if let Some(provider) = self.primary() {
            attempts += 1;
            let model = provider
                .model_naming()
                .translate(request.model.as_deref().unwrap_or(&self.default_model));
            match self.call(provider.as_ref(), &model, request).await {
                Ok(text) => {
                    info!(provider = provider.name(), model = %model, "AI completion successful");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = provider.name(), model = %model, error = %e, "Primary AI provider failed");
                }
            }
        }

        for provider in &self.providers {
            if provider.name() == self.default_provider {
                continue;
            }
            attempts += 1;
            let model = provider.model_naming().translate(&self.backup_model);
            match self.call(provider.as_ref(), &model, request).await {
                Ok(text) => {
                    info!(provider = provider.name(), model = %model, "AI fallback successful");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = provider.name(), model = %model, error = %e, "Fallback AI provider failed");
                }
            }
        }

        if attempts == 0 {
            warn!("No AI providers configured");
        }
        Err(AiError::AllProvidersExhausted { attempts })
    }
}

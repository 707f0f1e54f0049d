use std::time::Duration;

use ai_client::{Claude, OpenAi, OpenRouter, ProviderGateway};
use tracing::warn;

use trendwire_common::Config;

/// Gateway with every backend whose API key is configured, registered in
/// fallback order: openrouter, openai, anthropic.
pub fn build_gateway(config: &Config) -> ProviderGateway {
    let mut gateway = ProviderGateway::new(
        config.default_ai_provider.clone(),
        config.default_ai_model.clone(),
        config.backup_ai_model.clone(),
    )
    .with_timeout(Duration::from_secs(config.ai_timeout_secs));

    if let Some(key) = &config.openrouter_api_key {
        gateway = gateway.register(OpenRouter::new(key.clone()).with_app_name("trendwire"));
    }
    if let Some(key) = &config.openai_api_key {
        gateway = gateway.register(OpenAi::new(key.clone()));
    }
    if let Some(key) = &config.anthropic_api_key {
        gateway = gateway.register(Claude::new(key.clone()));
    }

    if gateway.is_empty() {
        warn!("No AI provider keys configured; classification and ideas will use fallbacks");
    }
    gateway
}

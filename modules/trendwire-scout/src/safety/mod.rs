//! Brand-safety classification of trending content.
//!
//! Each piece of content goes through one pass: a pure rule-based block
//! check, then the AI classifier (or the keyword filter when AI is off),
//! then a metadata-driven confidence adjustment. The classifier never
//! fails; every error path degrades to a `caution` verdict.

pub mod prompt;
pub mod signals;

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use ai_client::{truncate_chars, GenerationRequest, ProviderGateway};
use trendwire_common::text::matching_keywords;
use trendwire_common::{PipelineConfig, SafetyLevel, SafetyVerdict};

pub use prompt::{parse_reply, ClassificationReply};
pub use signals::{immediate_block, MetadataSignals};

pub const CLASSIFY_MAX_TOKENS: u32 = 300;
pub const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Confidence added to a `safe` verdict for gilded or awarded content.
const AWARD_NUDGE: f64 = 0.1;
/// Confidence removed when a `safe` verdict is downgraded for a locked thread.
const LOCKED_PENALTY: f64 = 0.2;
const LOCKED_FLOOR: f64 = 0.3;

const AI_FAILURE_CONFIDENCE: f64 = 0.3;
const UNHANDLED_FAILURE_CONFIDENCE: f64 = 0.5;
const KEYWORD_FILTER_CONFIDENCE: f64 = 0.8;

pub struct SafetyClassifier<'a> {
    gateway: &'a ProviderGateway,
    config: &'a PipelineConfig,
}

impl<'a> SafetyClassifier<'a> {
    pub fn new(gateway: &'a ProviderGateway, config: &'a PipelineConfig) -> Self {
        Self { gateway, config }
    }

    /// Classify one piece of content. Never fails and never panics outward.
    pub async fn classify(
        &self,
        title: &str,
        body: &str,
        metadata: &Map<String, Value>,
    ) -> SafetyVerdict {
        match AssertUnwindSafe(self.classify_inner(title, body, metadata))
            .catch_unwind()
            .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                error!(title = truncate_chars(title, 50), "Content categorization failed");
                SafetyVerdict::degraded(
                    UNHANDLED_FAILURE_CONFIDENCE,
                    "analysis_failed",
                    "Categorization failed, defaulting to caution",
                )
            }
        }
    }

    async fn classify_inner(
        &self,
        title: &str,
        body: &str,
        metadata: &Map<String, Value>,
    ) -> SafetyVerdict {
        let signals = MetadataSignals::extract(metadata);

        if let Some(reason) = immediate_block(&signals, self.config) {
            info!(title = truncate_chars(title, 50), reason = %reason, "Content auto-blocked");
            return SafetyVerdict::blocked(reason);
        }

        let verdict = if self.config.enable_ai_categorization {
            self.ai_verdict(title, body, &signals).await
        } else if self.config.enable_keyword_filter {
            keyword_verdict(title, body, &self.config.unsafe_keywords)
        } else {
            SafetyVerdict::degraded(
                UNHANDLED_FAILURE_CONFIDENCE,
                "unreviewed",
                "AI categorization and keyword filter are both disabled",
            )
        };

        info!(
            title = truncate_chars(title, 50),
            safety_level = %verdict.level,
            confidence = verdict.confidence,
            brand_safe = verdict.is_brand_safe,
            "Content categorized"
        );
        verdict
    }

    async fn ai_verdict(&self, title: &str, body: &str, signals: &MetadataSignals) -> SafetyVerdict {
        let request = GenerationRequest::new(prompt::build_messages(title, body, signals))
            .max_tokens(CLASSIFY_MAX_TOKENS)
            .temperature(CLASSIFY_TEMPERATURE);

        let reply = match self.gateway.generate_with_fallback(&request).await {
            Ok(text) => parse_reply(&text),
            Err(e) => Err(e.into()),
        };

        match reply {
            Ok(reply) => combine(reply, signals),
            Err(e) => {
                warn!(title = truncate_chars(title, 50), error = %e, "AI categorization failed");
                SafetyVerdict::degraded(
                    AI_FAILURE_CONFIDENCE,
                    "unknown",
                    format!("AI analysis failed: {e}"),
                )
            }
        }
    }
}

/// Fold metadata signals into the AI's answer.
pub fn combine(reply: ClassificationReply, signals: &MetadataSignals) -> SafetyVerdict {
    let mut level = reply.safety_level;
    let mut confidence = reply.confidence;

    if signals.recognized() && level == SafetyLevel::Safe {
        confidence = (confidence + AWARD_NUDGE).min(1.0);
    }

    if signals.locked && level == SafetyLevel::Safe {
        level = SafetyLevel::Caution;
        confidence = (confidence - LOCKED_PENALTY).max(LOCKED_FLOOR);
    }

    SafetyVerdict::new(
        level,
        confidence,
        reply.primary_category,
        reply.secondary_categories,
        reply.reasoning,
    )
}

/// Legacy filter used when AI categorization is switched off.
pub fn keyword_verdict(title: &str, body: &str, keywords: &[String]) -> SafetyVerdict {
    let text = format!("{title} {body}");
    let hits = matching_keywords(&text, keywords);
    if hits.is_empty() {
        SafetyVerdict::new(
            SafetyLevel::Safe,
            KEYWORD_FILTER_CONFIDENCE,
            "keyword_filter",
            Vec::new(),
            "No unsafe keywords found",
        )
    } else {
        SafetyVerdict::new(
            SafetyLevel::Controversial,
            KEYWORD_FILTER_CONFIDENCE,
            "keyword_filter",
            hits.iter().map(|s| s.to_string()).collect(),
            format!("Matched unsafe keywords: {}", hits.join(", ")),
        )
    }
}

use serde::Serialize;
use serde_json::{Map, Value};

use trendwire_common::PipelineConfig;

/// Brand-safety relevant flags pulled out of a collector's metadata blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataSignals {
    #[serde(skip_serializing_if = "is_false")]
    pub nsfw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_flair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_flair: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub stickied: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub gilded: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub awards: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Lower-cased content tags (post flair plus any explicit `tags`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MetadataSignals {
    pub fn extract(metadata: &Map<String, Value>) -> Self {
        let post_flair = first_str(metadata, &["link_flair_text", "post_flair"]).map(|s| s.to_lowercase());
        let author_flair =
            first_str(metadata, &["author_flair_text", "author_flair"]).map(|s| s.to_lowercase());

        let mut tags: Vec<String> = post_flair.iter().cloned().collect();
        if let Some(Value::Array(items)) = metadata.get("tags") {
            tags.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            );
        }

        Self {
            nsfw: flag(metadata, "over_18") || flag(metadata, "nsfw"),
            post_flair,
            author_flair,
            locked: flag(metadata, "locked"),
            stickied: flag(metadata, "stickied"),
            gilded: count(metadata, "gilded"),
            awards: count(metadata, "total_awards_received").max(count(metadata, "awards_received")),
            channel: first_str(metadata, &["subreddit", "channel", "source"]).map(str::to_string),
            tags,
        }
    }

    pub fn recognized(&self) -> bool {
        self.gilded > 0 || self.awards > 0
    }
}

/// Rule-based block check. Pure: the same signals and config always give
/// the same answer. Returns the reason when the content must be blocked.
pub fn immediate_block(signals: &MetadataSignals, config: &PipelineConfig) -> Option<String> {
    if signals.nsfw {
        return Some("NSFW content".to_string());
    }

    if let Some(channel) = &signals.channel {
        let lowered = channel.to_lowercase();
        if config
            .blocked_channels
            .iter()
            .any(|blocked| blocked.to_lowercase() == lowered)
        {
            return Some(format!("Blocked channel: {channel}"));
        }
    }

    for tag in &signals.tags {
        if let Some(blocked) = config
            .blocked_tags
            .iter()
            .map(|b| b.to_lowercase())
            .find(|b| !b.is_empty() && tag.contains(b.as_str()))
        {
            return Some(format!("Blocked tag: {tag} (matched {blocked})"));
        }
    }

    None
}

fn first_str<'a>(metadata: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| metadata.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn flag(metadata: &Map<String, Value>, key: &str) -> bool {
    match metadata.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

fn count(metadata: &Map<String, Value>, key: &str) -> u64 {
    match metadata.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v > 0.0).map(|v| v as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

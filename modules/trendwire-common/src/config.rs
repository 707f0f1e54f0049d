use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::TrendwireError;
use crate::safety::SafetyPolicy;

/// Process settings loaded from environment variables: provider keys, provider
/// defaults, data locations.
#[derive(Debug, Clone)]
pub struct Config {
    // AI providers
    pub openrouter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub default_ai_provider: String,
    pub default_ai_model: String,
    pub backup_ai_model: String,
    pub ai_timeout_secs: u64,

    // Sources
    pub news_api_key: Option<String>,
    pub reddit_user_agent: String,

    // Storage
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, TrendwireError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Tests pass a map here instead of
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrendwireError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, fallback: &str| secret(key).unwrap_or_else(|| fallback.to_string());

        Ok(Self {
            openrouter_api_key: secret("OPENROUTER_API_KEY"),
            openai_api_key: secret("OPENAI_API_KEY"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            default_ai_provider: or("DEFAULT_AI_PROVIDER", "openrouter"),
            default_ai_model: or("DEFAULT_AI_MODEL", "anthropic/claude-3.5-sonnet"),
            backup_ai_model: or("BACKUP_AI_MODEL", "openai/gpt-4"),
            ai_timeout_secs: parsed(&lookup, "AI_TIMEOUT_SECS", 30)?,
            news_api_key: secret("NEWS_API_KEY"),
            reddit_user_agent: or("REDDIT_USER_AGENT", "trendwire/0.1"),
            data_dir: PathBuf::from(or("DATA_DIR", "data")),
        })
    }

    /// Log which credentials are configured without printing their values.
    pub fn log_redacted(&self) {
        info!(
            openrouter = self.openrouter_api_key.is_some(),
            openai = self.openai_api_key.is_some(),
            anthropic = self.anthropic_api_key.is_some(),
            news_api = self.news_api_key.is_some(),
            default_provider = %self.default_ai_provider,
            default_model = %self.default_ai_model,
            backup_model = %self.backup_ai_model,
            data_dir = %self.data_dir.display(),
            "Config loaded"
        );
    }
}

/// Thresholds and switches consumed by every pipeline stage. Built once per
/// run and passed down by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// 0-100.
    pub min_sustainability_score: f64,
    /// 0-1.
    pub min_trend_score: f64,
    pub max_trends_per_run: usize,
    pub max_ideas_per_trend: usize,
    pub dedup_window_days: i64,
    pub decay_after_days: i64,
    pub archive_after_days: i64,

    // Safety
    pub allow_caution_content: bool,
    pub min_caution_confidence: f64,
    pub controversial_confidence_threshold: f64,
    pub enable_ai_categorization: bool,
    pub enable_keyword_filter: bool,
    pub blocked_channels: Vec<String>,
    pub blocked_tags: Vec<String>,
    pub unsafe_keywords: Vec<String>,

    /// Brand-safety deduction per risk factor name.
    pub risk_deductions: BTreeMap<String, f64>,
    pub default_risk_deduction: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_sustainability_score: 30.0,
            min_trend_score: 0.2,
            max_trends_per_run: 10,
            max_ideas_per_trend: 5,
            dedup_window_days: 7,
            decay_after_days: 3,
            archive_after_days: 30,
            allow_caution_content: true,
            min_caution_confidence: 0.5,
            controversial_confidence_threshold: 0.6,
            enable_ai_categorization: true,
            enable_keyword_filter: true,
            blocked_channels: strings(&["nsfw", "gonewild", "wtf", "gore", "watchpeopledie"]),
            blocked_tags: strings(&["nsfw", "gore", "porn", "explicit", "graphic"]),
            unsafe_keywords: strings(&[
                "nsfw", "porn", "sex", "nude", "gore", "murder", "suicide", "terrorist",
                "shooting", "abuse", "racist",
            ]),
            risk_deductions: [
                ("political sensitivity", 20.0),
                ("potential controversy", 15.0),
                ("adult content", 30.0),
                ("violence", 25.0),
                ("illegal activity", 40.0),
                ("hate speech", 35.0),
                ("misinformation", 25.0),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            default_risk_deduction: 10.0,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, TrendwireError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever keys `lookup` resolves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrendwireError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let config = Self {
            min_sustainability_score: parsed(&lookup, "MIN_SUSTAINABILITY_SCORE", d.min_sustainability_score)?,
            min_trend_score: parsed(&lookup, "MIN_TREND_SCORE", d.min_trend_score)?,
            max_trends_per_run: parsed(&lookup, "MAX_TRENDS_PER_RUN", d.max_trends_per_run)?,
            max_ideas_per_trend: parsed(&lookup, "MAX_IDEAS_PER_TREND", d.max_ideas_per_trend)?,
            dedup_window_days: parsed(&lookup, "DEDUP_WINDOW_DAYS", d.dedup_window_days)?,
            decay_after_days: parsed(&lookup, "DECAY_AFTER_DAYS", d.decay_after_days)?,
            archive_after_days: parsed(&lookup, "ARCHIVE_AFTER_DAYS", d.archive_after_days)?,
            allow_caution_content: flag(&lookup, "ALLOW_CAUTION_CONTENT", d.allow_caution_content)?,
            min_caution_confidence: parsed(&lookup, "MIN_CAUTION_CONFIDENCE", d.min_caution_confidence)?,
            controversial_confidence_threshold: parsed(
                &lookup,
                "CONTROVERSIAL_CONFIDENCE_THRESHOLD",
                d.controversial_confidence_threshold,
            )?,
            enable_ai_categorization: flag(&lookup, "ENABLE_AI_CATEGORIZATION", d.enable_ai_categorization)?,
            enable_keyword_filter: flag(&lookup, "ENABLE_KEYWORD_FILTER", d.enable_keyword_filter)?,
            blocked_channels: list(&lookup, "BLOCKED_CHANNELS").unwrap_or(d.blocked_channels),
            blocked_tags: list(&lookup, "BLOCKED_TAGS").unwrap_or(d.blocked_tags),
            unsafe_keywords: list(&lookup, "UNSAFE_KEYWORDS").unwrap_or(d.unsafe_keywords),
            risk_deductions: d.risk_deductions,
            default_risk_deduction: d.default_risk_deduction,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TrendwireError> {
        let unit = [
            ("MIN_TREND_SCORE", self.min_trend_score),
            ("MIN_CAUTION_CONFIDENCE", self.min_caution_confidence),
            ("CONTROVERSIAL_CONFIDENCE_THRESHOLD", self.controversial_confidence_threshold),
        ];
        for (key, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrendwireError::Config(format!("{key} must be within 0..=1, got {value}")));
            }
        }
        if !(0.0..=100.0).contains(&self.min_sustainability_score) {
            return Err(TrendwireError::Config(format!(
                "MIN_SUSTAINABILITY_SCORE must be within 0..=100, got {}",
                self.min_sustainability_score
            )));
        }
        for (key, value) in [
            ("DEDUP_WINDOW_DAYS", self.dedup_window_days),
            ("DECAY_AFTER_DAYS", self.decay_after_days),
            ("ARCHIVE_AFTER_DAYS", self.archive_after_days),
        ] {
            if value < 0 {
                return Err(TrendwireError::Config(format!("{key} must not be negative")));
            }
        }
        Ok(())
    }

    pub fn safety_policy(&self) -> SafetyPolicy {
        SafetyPolicy {
            allow_caution: self.allow_caution_content,
            min_caution_confidence: self.min_caution_confidence,
            controversial_confidence_threshold: self.controversial_confidence_threshold,
        }
    }

    /// Deduction for a named risk factor; lookup ignores case.
    pub fn risk_deduction(&self, factor: &str) -> f64 {
        self.risk_deductions
            .get(&factor.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_risk_deduction)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parsed<F, T>(lookup: &F, key: &str, fallback: T) -> Result<T, TrendwireError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| TrendwireError::Config(format!("{key} has invalid value {raw:?}"))),
        _ => Ok(fallback),
    }
}

fn flag<F>(lookup: &F, key: &str, fallback: bool) -> Result<bool, TrendwireError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(fallback),
        Some(v) if v.is_empty() => Ok(fallback),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(TrendwireError::Config(format!("{key} must be a boolean, got {v:?}"))),
        },
    }
}

fn list<F>(lookup: &F, key: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

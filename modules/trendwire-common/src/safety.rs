use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Confidence at or above which a safe/caution verdict counts as brand safe.
pub const BRAND_SAFE_MIN_CONFIDENCE: f64 = 0.7;

/// Brand-safety classification of a piece of trending content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Political,
    Violent,
    Controversial,
    Nsfw,
    Blocked,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Political => "political",
            SafetyLevel::Violent => "violent",
            SafetyLevel::Controversial => "controversial",
            SafetyLevel::Nsfw => "nsfw",
            SafetyLevel::Blocked => "blocked",
        }
    }

    /// Only safe and caution content can ever be brand safe.
    pub fn may_be_brand_safe(&self) -> bool {
        matches!(self, SafetyLevel::Safe | SafetyLevel::Caution)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Ok(SafetyLevel::Safe),
            "caution" => Ok(SafetyLevel::Caution),
            "political" => Ok(SafetyLevel::Political),
            "violent" => Ok(SafetyLevel::Violent),
            "controversial" => Ok(SafetyLevel::Controversial),
            "nsfw" => Ok(SafetyLevel::Nsfw),
            "blocked" => Ok(SafetyLevel::Blocked),
            other => Err(format!("unknown safety level: {other}")),
        }
    }
}

// Models answer "SAFE", "Safe" and "safe" interchangeably.
impl<'de> Deserialize<'de> for SafetyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// --- Verdict ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub level: SafetyLevel,
    /// 0.0-1.0
    pub confidence: f64,
    pub primary_category: String,
    pub secondary_categories: Vec<String>,
    pub reasoning: String,
    pub is_brand_safe: bool,
}

impl SafetyVerdict {
    /// Build a verdict, deriving `is_brand_safe` from level and confidence.
    pub fn new(
        level: SafetyLevel,
        confidence: f64,
        primary_category: impl Into<String>,
        secondary_categories: Vec<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            level,
            confidence,
            primary_category: primary_category.into(),
            secondary_categories,
            reasoning: reasoning.into(),
            is_brand_safe: level.may_be_brand_safe() && confidence >= BRAND_SAFE_MIN_CONFIDENCE,
        }
    }

    /// Rule-based block. Always confidence 1.0, never brand safe.
    pub fn blocked(reason: impl fmt::Display) -> Self {
        Self {
            level: SafetyLevel::Blocked,
            confidence: 1.0,
            primary_category: "auto_blocked".to_string(),
            secondary_categories: Vec::new(),
            reasoning: format!("Automatically blocked: {reason}"),
            is_brand_safe: false,
        }
    }

    /// Conservative verdict used whenever classification could not complete.
    pub fn degraded(
        confidence: f64,
        primary_category: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            level: SafetyLevel::Caution,
            confidence: clamp_unit(confidence),
            primary_category: primary_category.into(),
            secondary_categories: Vec::new(),
            reasoning: reasoning.into(),
            is_brand_safe: false,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// --- Inclusion policy ---

/// Decides which verdicts may continue down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyPolicy {
    pub allow_caution: bool,
    pub min_caution_confidence: f64,
    /// Controversial content is let through only when the classifier is
    /// less confident than this.
    pub controversial_confidence_threshold: f64,
}

impl SafetyPolicy {
    pub fn admits(&self, verdict: &SafetyVerdict) -> bool {
        match verdict.level {
            SafetyLevel::Blocked
            | SafetyLevel::Violent
            | SafetyLevel::Nsfw
            | SafetyLevel::Political => false,
            SafetyLevel::Controversial => {
                verdict.confidence < self.controversial_confidence_threshold
            }
            SafetyLevel::Caution => {
                self.allow_caution && verdict.confidence >= self.min_caution_confidence
            }
            SafetyLevel::Safe => true,
        }
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            allow_caution: true,
            min_caution_confidence: 0.5,
            controversial_confidence_threshold: 0.6,
        }
    }
}

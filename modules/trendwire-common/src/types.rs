use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::safety::SafetyVerdict;

// --- Candidate records ---

/// One raw trending-topic observation from one source, before dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct CandidateRecord {
    /// Source-local identifier (post id, article url, feed guid).
    #[builder(setter(into))]
    pub source_id: String,
    #[builder(setter(into))]
    pub title: String,
    #[builder(default, setter(into))]
    pub body_excerpt: String,
    /// Platform tag (`reddit`, `news`, `google`, ...).
    #[builder(setter(into))]
    pub platform: String,
    #[builder(default, setter(strip_option, into))]
    pub category: Option<String>,
    /// Collector-normalized trending score, 0.0-1.0.
    pub raw_score: f64,
    #[builder(default)]
    pub raw_volume: u64,
    #[builder(default)]
    pub velocity: f64,
    #[builder(default)]
    pub keywords: Vec<String>,
    #[builder(default)]
    pub regions: Vec<String>,
    #[builder(default)]
    pub source_urls: Vec<String>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default)]
    pub source_metadata: Map<String, Value>,
}

// --- Canonical trends ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Active,
    Archived,
    Expired,
}

/// Deduplicated, persistent representation of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTrend {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    /// Only ever grows through dedup merges.
    pub platforms: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub source_urls: BTreeSet<String>,
    pub first_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Base trending score, 0.0-1.0.
    pub score: f64,
    pub velocity: f64,
    pub volume: u64,
    /// 0-100, set by enrichment.
    pub sustainability_score: Option<f64>,
    pub safety_verdict: Option<SafetyVerdict>,
    pub enrichment: Option<EnrichmentBundle>,
    pub scores: Option<ScoreVector>,
    #[serde(default)]
    pub analysis_metadata: Map<String, Value>,
    pub status: TrendStatus,
}

impl CanonicalTrend {
    /// Seed a new trend from the candidate that first reported it.
    pub fn from_candidate(candidate: &CandidateRecord, now: DateTime<Utc>) -> Self {
        let mut analysis_metadata = Map::new();
        analysis_metadata.insert(
            "sources".to_string(),
            Value::Array(vec![Value::String(candidate.source_id.clone())]),
        );
        if !candidate.source_metadata.is_empty() {
            analysis_metadata.insert(
                "source_metadata".to_string(),
                Value::Object(candidate.source_metadata.clone()),
            );
        }

        Self {
            id: Uuid::new_v4(),
            title: candidate.title.clone(),
            description: candidate.body_excerpt.clone(),
            category: candidate.category.clone(),
            platforms: BTreeSet::from([candidate.platform.clone()]),
            keywords: candidate.keywords.iter().cloned().collect(),
            regions: candidate.regions.iter().cloned().collect(),
            source_urls: candidate.source_urls.iter().cloned().collect(),
            first_seen_at: now,
            created_at: now,
            updated_at: now,
            score: candidate.raw_score,
            velocity: candidate.velocity,
            volume: candidate.raw_volume,
            sustainability_score: None,
            safety_verdict: None,
            enrichment: None,
            scores: None,
            analysis_metadata,
            status: TrendStatus::Active,
        }
    }

    /// Fold a matching candidate into this trend: volume accumulates, set
    /// fields union, `updated_at` moves forward.
    pub fn merge_candidate(&mut self, candidate: &CandidateRecord, now: DateTime<Utc>) {
        self.volume = self.volume.saturating_add(candidate.raw_volume);
        self.platforms.insert(candidate.platform.clone());
        self.keywords.extend(candidate.keywords.iter().cloned());
        self.regions.extend(candidate.regions.iter().cloned());
        self.source_urls.extend(candidate.source_urls.iter().cloned());
        if let Some(Value::Array(sources)) = self.analysis_metadata.get_mut("sources") {
            let id = Value::String(candidate.source_id.clone());
            if !sources.contains(&id) {
                sources.push(id);
            }
        }
        self.updated_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status == TrendStatus::Active
    }

    /// Whole days since the trend was created.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = TrendStatus::Archived;
        self.updated_at = now;
    }

    pub fn is_brand_safe(&self) -> bool {
        self.safety_verdict
            .as_ref()
            .map(|v| v.is_brand_safe)
            .unwrap_or(false)
    }
}

// --- Enrichment ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSignal {
    pub current_volume: Option<f64>,
    /// Percent change over 24 hours.
    pub volume_change_24h: Option<f64>,
    /// Percent change over 7 days.
    pub volume_change_7d: Option<f64>,
    pub trend_direction: Option<String>,
    pub related_queries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicSignal {
    /// Age bracket → percent share.
    pub age_groups: BTreeMap<String, f64>,
    pub gender: BTreeMap<String, f64>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionShare {
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSignal {
    pub top_countries: Vec<RegionShare>,
    pub top_cities: Vec<RegionShare>,
}

/// Percent shares, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSignal {
    pub overall_sentiment: Option<String>,
    /// -1.0 (negative) to 1.0 (positive).
    pub sentiment_score: Option<f64>,
    pub distribution: Option<SentimentDistribution>,
    pub emotional_indicators: Vec<String>,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionSignal {
    pub competition_level: Option<String>,
    pub competing_brands: Vec<String>,
    pub market_saturation: Option<f64>,
    /// 0-100.
    pub opportunity_score: Option<f64>,
    pub white_space_areas: Vec<String>,
    pub recommended_positioning: Option<String>,
}

/// Auxiliary signals for one trend. Replaced wholesale on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBundle {
    pub related_coverage: Vec<CoverageArticle>,
    pub search_signal: SearchSignal,
    pub demographic_signal: DemographicSignal,
    pub geo_signal: GeoSignal,
    pub sentiment_signal: SentimentSignal,
    pub competition_signal: CompetitionSignal,
    pub enriched_at: DateTime<Utc>,
}

impl EnrichmentBundle {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            related_coverage: Vec::new(),
            search_signal: SearchSignal::default(),
            demographic_signal: DemographicSignal::default(),
            geo_signal: GeoSignal::default(),
            sentiment_signal: SentimentSignal::default(),
            competition_signal: CompetitionSignal::default(),
            enriched_at: now,
        }
    }
}

// --- Scores ---

/// Derived scores, recomputed every scoring pass. `base_score` is 0-1, the
/// rest 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub base_score: f64,
    pub sustainability: f64,
    pub pr_potential: f64,
    pub viral_potential: f64,
    pub brand_safety: f64,
    pub overall: f64,
}

// --- Downstream artifacts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignIdea {
    pub id: Uuid,
    pub trend_id: Uuid,
    pub title: String,
    pub headline: String,
    pub description: String,
    pub brief: String,
    pub idea_type: String,
    pub target_audience: String,
    pub timeline: String,
    pub difficulty: String,
    pub potential_score: f64,
    pub virality_score: f64,
    pub brand_safety_score: f64,
    pub channels: Vec<String>,
    pub key_messages: Vec<String>,
    pub media_hooks: Vec<String>,
    pub execution_steps: Vec<String>,
    /// `ai-generated` or `template-based`.
    pub generation_model: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters persisted once per pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub collected: u32,
    pub source_failures: u32,
    pub new_trends: u32,
    pub merged: u32,
    pub safety_excluded: u32,
    pub enriched: u32,
    pub enrichment_fallbacks: u32,
    pub scored: u32,
    pub retained: u32,
    pub archived: u32,
    pub ideas_generated: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(platform: &str, volume: u64) -> CandidateRecord {
        CandidateRecord::builder()
            .source_id(format!("{platform}-1"))
            .title("City announces new park")
            .platform(platform)
            .raw_score(0.8)
            .raw_volume(volume)
            .keywords(vec!["city".to_string(), "park".to_string()])
            .build()
    }

    #[test]
    fn merge_accumulates_and_unions() {
        let now = Utc::now();
        let mut trend = CanonicalTrend::from_candidate(&candidate("reddit", 100), now);
        let later = now + Duration::hours(2);
        trend.merge_candidate(&candidate("news", 40), later);

        assert_eq!(trend.volume, 140);
        assert_eq!(
            trend.platforms,
            BTreeSet::from(["news".to_string(), "reddit".to_string()])
        );
        assert_eq!(trend.updated_at, later);
        assert_eq!(trend.first_seen_at, now);
        assert_eq!(trend.analysis_metadata["sources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn merge_never_shrinks_platforms() {
        let now = Utc::now();
        let mut trend = CanonicalTrend::from_candidate(&candidate("reddit", 1), now);
        trend.merge_candidate(&candidate("news", 1), now);
        trend.merge_candidate(&candidate("reddit", 1), now);
        assert_eq!(trend.platforms.len(), 2);
    }

    #[test]
    fn archive_is_soft() {
        let now = Utc::now();
        let mut trend = CanonicalTrend::from_candidate(&candidate("reddit", 1), now);
        trend.archive(now);
        assert_eq!(trend.status, TrendStatus::Archived);
        assert_eq!(trend.title, "City announces new park");
    }
}

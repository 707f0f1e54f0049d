// Test doubles for the trend pipeline.
//
// One mock per trait seam:
// - MockCollector / FailingCollector (SourceCollector)
// - StaticEnrichment / FailingEnrichment (EnrichmentProvider)
// - FailingStore (TrendStore) for the one fatal error path
//
// Plus helpers for building candidates and trends.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use trendwire_common::{
    CampaignIdea, CandidateRecord, CanonicalTrend, CompetitionSignal, CoverageArticle,
    DemographicSignal, GeoSignal, RunSummary, SearchSignal, SentimentSignal,
};

use crate::traits::{EnrichmentProvider, SourceCollector, TrendStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Minimal candidate on `platform` with the given score and volume.
pub fn candidate(title: &str, platform: &str, raw_score: f64, volume: u64) -> CandidateRecord {
    CandidateRecord::builder()
        .source_id(format!("{platform}:{}", title.to_lowercase()))
        .title(title)
        .platform(platform)
        .raw_score(raw_score)
        .raw_volume(volume)
        .build()
}

/// Candidate carrying a source metadata blob.
pub fn candidate_with_metadata(
    title: &str,
    platform: &str,
    raw_score: f64,
    metadata: Value,
) -> CandidateRecord {
    let mut c = candidate(title, platform, raw_score, 10);
    c.source_metadata = metadata.as_object().cloned().unwrap_or_default();
    c
}

/// Active trend created now.
pub fn trend_titled(title: &str, score: f64) -> CanonicalTrend {
    CanonicalTrend::from_candidate(&candidate(title, "test", score, 0), Utc::now())
}

pub fn article(title: &str) -> CoverageArticle {
    CoverageArticle {
        title: title.to_string(),
        description: None,
        url: format!("https://news.test/{}", title.to_lowercase().replace(' ', "-")),
        published_at: None,
        source: "Test Wire".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Collectors
// ---------------------------------------------------------------------------

/// Returns a fixed batch every time.
pub struct MockCollector {
    name: String,
    candidates: Vec<CandidateRecord>,
    delay: Option<Duration>,
}

impl MockCollector {
    pub fn new(name: &str, candidates: Vec<CandidateRecord>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SourceCollector for MockCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<CandidateRecord>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.candidates.clone())
    }
}

pub struct FailingCollector {
    name: String,
}

impl FailingCollector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl SourceCollector for FailingCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<CandidateRecord>> {
        bail!("{}: upstream unavailable", self.name)
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Same answer for every query. Builder: `.with_coverage()`, `.with_search()`,
/// `.failing_facet()`, `.with_delay()` and friends.
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichment {
    coverage: Vec<CoverageArticle>,
    search: SearchSignal,
    demographics: DemographicSignal,
    geo: GeoSignal,
    sentiment: SentimentSignal,
    competition: CompetitionSignal,
    failing: HashSet<&'static str>,
    delay: Option<Duration>,
}

impl StaticEnrichment {
    pub fn with_coverage(mut self, coverage: Vec<CoverageArticle>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_search(mut self, search: SearchSignal) -> Self {
        self.search = search;
        self
    }

    pub fn with_demographics(mut self, demographics: DemographicSignal) -> Self {
        self.demographics = demographics;
        self
    }

    pub fn with_geo(mut self, geo: GeoSignal) -> Self {
        self.geo = geo;
        self
    }

    pub fn with_sentiment(mut self, sentiment: SentimentSignal) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_competition(mut self, competition: CompetitionSignal) -> Self {
        self.competition = competition;
        self
    }

    /// Make one facet (by trait method name) return an error.
    pub fn failing_facet(mut self, facet: &'static str) -> Self {
        self.failing.insert(facet);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn answer<T: Clone>(&self, facet: &'static str, value: &T) -> Result<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(facet) {
            return Err(anyhow!("StaticEnrichment: {facet} configured to fail"));
        }
        Ok(value.clone())
    }
}

#[async_trait]
impl EnrichmentProvider for StaticEnrichment {
    async fn related_coverage(&self, _query: &str) -> Result<Vec<CoverageArticle>> {
        self.answer("related_coverage", &self.coverage).await
    }

    async fn search_signal(&self, _query: &str) -> Result<SearchSignal> {
        self.answer("search_signal", &self.search).await
    }

    async fn demographic_signal(&self, _query: &str) -> Result<DemographicSignal> {
        self.answer("demographic_signal", &self.demographics).await
    }

    async fn geo_signal(&self, _query: &str) -> Result<GeoSignal> {
        self.answer("geo_signal", &self.geo).await
    }

    async fn sentiment_signal(&self, _query: &str) -> Result<SentimentSignal> {
        self.answer("sentiment_signal", &self.sentiment).await
    }

    async fn competition_signal(&self, _query: &str) -> Result<CompetitionSignal> {
        self.answer("competition_signal", &self.competition).await
    }
}

/// Every facet errors.
pub struct FailingEnrichment;

#[async_trait]
impl EnrichmentProvider for FailingEnrichment {
    async fn related_coverage(&self, _query: &str) -> Result<Vec<CoverageArticle>> {
        bail!("coverage backend down")
    }

    async fn search_signal(&self, _query: &str) -> Result<SearchSignal> {
        bail!("search backend down")
    }

    async fn demographic_signal(&self, _query: &str) -> Result<DemographicSignal> {
        bail!("demographics backend down")
    }

    async fn geo_signal(&self, _query: &str) -> Result<GeoSignal> {
        bail!("geo backend down")
    }

    async fn sentiment_signal(&self, _query: &str) -> Result<SentimentSignal> {
        bail!("sentiment backend down")
    }

    async fn competition_signal(&self, _query: &str) -> Result<CompetitionSignal> {
        bail!("competition backend down")
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Reads succeed empty, every write fails.
pub struct FailingStore;

#[async_trait]
impl TrendStore for FailingStore {
    async fn find_active_match(
        &self,
        _fragment: &str,
        _since: DateTime<Utc>,
    ) -> Result<Option<CanonicalTrend>> {
        Ok(None)
    }

    async fn upsert_trends(&self, _trends: &[CanonicalTrend]) -> Result<()> {
        bail!("FailingStore: disk full")
    }

    async fn active_trends(&self) -> Result<Vec<CanonicalTrend>> {
        Ok(Vec::new())
    }

    async fn save_campaign_ideas(&self, _trend_id: Uuid, _ideas: &[CampaignIdea]) -> Result<()> {
        bail!("FailingStore: disk full")
    }

    async fn record_run(&self, _summary: &RunSummary) -> Result<()> {
        bail!("FailingStore: disk full")
    }
}

// Trait seams for the trend pipeline.
//
// SourceCollector produces raw candidates, TrendStore owns persistence,
// EnrichmentProvider answers the per-facet enrichment queries. Tests swap
// each one for the mocks in `testing`: no network, no disk.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use trendwire_common::{
    CampaignIdea, CandidateRecord, CanonicalTrend, CompetitionSignal, CoverageArticle,
    DemographicSignal, GeoSignal, RunSummary, SearchSignal, SentimentSignal,
};

// ---------------------------------------------------------------------------
// SourceCollector
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Stable name used in logs and run stats.
    fn name(&self) -> &str;

    /// Fetch the current batch of trending candidates.
    async fn collect(&self) -> Result<Vec<CandidateRecord>>;
}

// ---------------------------------------------------------------------------
// TrendStore
// ---------------------------------------------------------------------------

/// Persistence for canonical trends and their downstream artifacts.
///
/// Errors from any method are fatal to a pipeline run. No method offers a
/// uniqueness guarantee across concurrent runs.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// First active trend created at or after `since` whose normalized title
    /// contains `fragment`.
    async fn find_active_match(
        &self,
        fragment: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CanonicalTrend>>;

    /// Insert or replace by id.
    async fn upsert_trends(&self, trends: &[CanonicalTrend]) -> Result<()>;

    async fn active_trends(&self) -> Result<Vec<CanonicalTrend>>;

    async fn save_campaign_ideas(&self, trend_id: Uuid, ideas: &[CampaignIdea]) -> Result<()>;

    async fn record_run(&self, summary: &RunSummary) -> Result<()>;
}

// ---------------------------------------------------------------------------
// EnrichmentProvider
// ---------------------------------------------------------------------------

/// One query per enrichment facet. Facets without a backing data source
/// keep the default implementation and answer with an empty signal.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn related_coverage(&self, _query: &str) -> Result<Vec<CoverageArticle>> {
        Ok(Vec::new())
    }

    async fn search_signal(&self, _query: &str) -> Result<SearchSignal> {
        Ok(SearchSignal::default())
    }

    async fn demographic_signal(&self, _query: &str) -> Result<DemographicSignal> {
        Ok(DemographicSignal::default())
    }

    async fn geo_signal(&self, _query: &str) -> Result<GeoSignal> {
        Ok(GeoSignal::default())
    }

    async fn sentiment_signal(&self, _query: &str) -> Result<SentimentSignal> {
        Ok(SentimentSignal::default())
    }

    async fn competition_signal(&self, _query: &str) -> Result<CompetitionSignal> {
        Ok(CompetitionSignal::default())
    }
}

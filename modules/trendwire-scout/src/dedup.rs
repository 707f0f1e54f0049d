//! Merge incoming candidates into canonical trends.
//!
//! Matching is a substring test of the candidate's normalized title fragment
//! against active trends created inside the recency window. It is
//! order-dependent (first match wins) and is a read-then-write against the
//! store, so two concurrent runs can both create the same trend.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use trendwire_common::text::{normalize_title, title_fragment};
use trendwire_common::{CandidateRecord, CanonicalTrend, PipelineConfig};

use crate::safety::{immediate_block, MetadataSignals};
use crate::traits::TrendStore;

/// Characters of the normalized title used as the match fragment.
pub const TITLE_FRAGMENT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupAction {
    Created(Uuid),
    Merged(Uuid),
    /// Candidate had no usable title.
    Skipped,
}

/// Trends touched during one run, in first-touch order, plus the candidate
/// that touched each one most recently and the first contributor that
/// tripped the immediate block rules.
#[derive(Debug, Default)]
pub struct WorkingSet {
    trends: Vec<CanonicalTrend>,
    index: HashMap<Uuid, usize>,
    last_candidate: HashMap<Uuid, CandidateRecord>,
    blocked_by: HashMap<Uuid, CandidateRecord>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&CanonicalTrend> {
        self.index.get(&id).map(|&i| &self.trends[i])
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut CanonicalTrend> {
        self.index.get(&id).map(|&i| &mut self.trends[i])
    }

    pub fn trends(&self) -> &[CanonicalTrend] {
        &self.trends
    }

    pub fn trends_mut(&mut self) -> &mut [CanonicalTrend] {
        &mut self.trends
    }

    pub fn into_trends(self) -> Vec<CanonicalTrend> {
        self.trends
    }

    /// Candidate that most recently merged into (or created) this trend.
    pub fn last_candidate(&self, id: Uuid) -> Option<&CandidateRecord> {
        self.last_candidate.get(&id)
    }

    /// First contributor this run whose metadata must block the trend.
    pub fn blocked_by(&self, id: Uuid) -> Option<&CandidateRecord> {
        self.blocked_by.get(&id)
    }

    /// The candidate the trend should be classified from. A blocked
    /// contributor sticks even when clean candidates merge in after it.
    pub fn classification_source(&self, id: Uuid) -> Option<&CandidateRecord> {
        self.blocked_by(id).or_else(|| self.last_candidate(id))
    }

    /// Snapshot of the given trends, for checkpoint commits.
    pub fn cloned(&self, ids: &[Uuid]) -> Vec<CanonicalTrend> {
        ids.iter().filter_map(|id| self.get(*id).cloned()).collect()
    }

    fn find(&self, fragment: &str, since: DateTime<Utc>) -> Option<Uuid> {
        self.trends
            .iter()
            .find(|t| {
                t.is_active()
                    && t.created_at >= since
                    && normalize_title(&t.title).contains(fragment)
            })
            .map(|t| t.id)
    }

    fn insert(&mut self, trend: CanonicalTrend) -> Uuid {
        let id = trend.id;
        if let Some(&i) = self.index.get(&id) {
            self.trends[i] = trend;
        } else {
            self.index.insert(id, self.trends.len());
            self.trends.push(trend);
        }
        id
    }
}

pub struct Deduplicator<'a> {
    store: &'a dyn TrendStore,
    config: &'a PipelineConfig,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a dyn TrendStore, config: &'a PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Fold one candidate into the working set. The working set is searched
    /// before the store so repeats inside a single run merge too.
    pub async fn absorb(
        &self,
        working: &mut WorkingSet,
        candidate: &CandidateRecord,
        now: DateTime<Utc>,
    ) -> Result<DedupAction> {
        let fragment = title_fragment(&candidate.title, TITLE_FRAGMENT_CHARS);
        if fragment.is_empty() {
            debug!(source_id = candidate.source_id.as_str(), "Skipping candidate without title");
            return Ok(DedupAction::Skipped);
        }

        let since = now - Duration::days(self.config.dedup_window_days);

        let existing = match working.find(&fragment, since) {
            Some(id) => Some(id),
            None => self
                .store
                .find_active_match(&fragment, since)
                .await?
                .map(|trend| working.insert(trend)),
        };

        let action = match existing {
            Some(id) => {
                if let Some(trend) = working.get_mut(id) {
                    trend.merge_candidate(candidate, now);
                    debug!(
                        trend_id = %id,
                        platform = candidate.platform.as_str(),
                        volume = trend.volume,
                        "Merged candidate into existing trend"
                    );
                }
                DedupAction::Merged(id)
            }
            None => {
                let trend = CanonicalTrend::from_candidate(candidate, now);
                debug!(trend_id = %trend.id, title = trend.title.as_str(), "Created trend");
                DedupAction::Created(working.insert(trend))
            }
        };

        if let DedupAction::Created(id) | DedupAction::Merged(id) = action {
            let signals = MetadataSignals::extract(&candidate.source_metadata);
            if let Some(reason) = immediate_block(&signals, self.config) {
                if !working.blocked_by.contains_key(&id) {
                    debug!(trend_id = %id, platform = candidate.platform.as_str(), reason = reason.as_str(), "Blocked contributor");
                    working.blocked_by.insert(id, candidate.clone());
                }
            }
            working.last_candidate.insert(id, candidate.clone());
        }
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use trendwire_common::TrendStatus;

    fn candidate(title: &str, platform: &str, volume: u64) -> CandidateRecord {
        CandidateRecord::builder()
            .source_id(format!("{platform}:{title}"))
            .title(title)
            .platform(platform)
            .raw_score(0.5)
            .raw_volume(volume)
            .build()
    }

    #[tokio::test]
    async fn identical_titles_merge_within_run() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let now = Utc::now();

        let first = dedup
            .absorb(&mut working, &candidate("City announces new park", "reddit", 100), now)
            .await
            .unwrap();
        let second = dedup
            .absorb(&mut working, &candidate("city  announces NEW park", "news", 50), now)
            .await
            .unwrap();

        let DedupAction::Created(id) = first else {
            panic!("expected create, got {first:?}");
        };
        assert_eq!(second, DedupAction::Merged(id));
        assert_eq!(working.len(), 1);
        let trend = working.get(id).unwrap();
        assert_eq!(trend.volume, 150);
        assert_eq!(trend.platforms.len(), 2);
        assert_eq!(working.last_candidate(id).unwrap().platform, "news");
    }

    #[tokio::test]
    async fn merges_into_stored_trend_within_window() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let now = Utc::now();

        let mut stored = CanonicalTrend::from_candidate(
            &candidate("Solar eclipse visible tonight across the Midwest", "google", 10),
            now - Duration::days(2),
        );
        stored.created_at = now - Duration::days(2);
        store.upsert_trends(&[stored.clone()]).await.unwrap();

        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let action = dedup
            .absorb(&mut working, &candidate("Solar eclipse visible tonight", "reddit", 5), now)
            .await
            .unwrap();

        assert_eq!(action, DedupAction::Merged(stored.id));
        assert_eq!(working.get(stored.id).unwrap().volume, 15);
    }

    #[tokio::test]
    async fn outside_window_creates_new_trend() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let now = Utc::now();

        let mut stored =
            CanonicalTrend::from_candidate(&candidate("Old story", "news", 1), now - Duration::days(8));
        stored.created_at = now - Duration::days(8);
        store.upsert_trends(&[stored.clone()]).await.unwrap();

        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let action = dedup
            .absorb(&mut working, &candidate("Old story", "news", 1), now)
            .await
            .unwrap();
        assert!(matches!(action, DedupAction::Created(id) if id != stored.id));
    }

    #[tokio::test]
    async fn archived_trends_do_not_match() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let now = Utc::now();

        let mut stored = CanonicalTrend::from_candidate(&candidate("Quiet news day", "news", 1), now);
        stored.status = TrendStatus::Archived;
        store.upsert_trends(&[stored.clone()]).await.unwrap();

        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let action = dedup
            .absorb(&mut working, &candidate("Quiet news day", "reddit", 1), now)
            .await
            .unwrap();
        assert!(matches!(action, DedupAction::Created(_)));
    }

    #[tokio::test]
    async fn dissimilar_titles_stay_separate() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let now = Utc::now();

        dedup.absorb(&mut working, &candidate("Apple event recap", "news", 1), now).await.unwrap();
        dedup.absorb(&mut working, &candidate("Banana shortage", "news", 1), now).await.unwrap();
        assert_eq!(working.len(), 2);
    }

    #[tokio::test]
    async fn blocked_contributor_sticks_after_clean_merge() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let now = Utc::now();

        let mut flagged = candidate("Late night thread", "reddit", 10);
        flagged.source_metadata.insert("over_18".into(), serde_json::Value::Bool(true));
        let DedupAction::Created(id) = dedup.absorb(&mut working, &flagged, now).await.unwrap() else {
            panic!("expected create");
        };
        dedup
            .absorb(&mut working, &candidate("Late night thread", "news", 5), now)
            .await
            .unwrap();

        assert_eq!(working.last_candidate(id).unwrap().platform, "news");
        assert_eq!(working.blocked_by(id).unwrap().platform, "reddit");
        assert_eq!(working.classification_source(id).unwrap().platform, "reddit");
    }

    #[tokio::test]
    async fn clean_trend_classifies_from_last_candidate() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();
        let now = Utc::now();

        dedup.absorb(&mut working, &candidate("Harvest fair", "reddit", 1), now).await.unwrap();
        let action = dedup.absorb(&mut working, &candidate("Harvest fair", "news", 1), now).await.unwrap();
        let DedupAction::Merged(id) = action else {
            panic!("expected merge, got {action:?}");
        };
        assert!(working.blocked_by(id).is_none());
        assert_eq!(working.classification_source(id).unwrap().platform, "news");
    }

    #[tokio::test]
    async fn blank_title_is_skipped() {
        let store = MemoryStore::new();
        let config = PipelineConfig::default();
        let dedup = Deduplicator::new(&store, &config);
        let mut working = WorkingSet::new();

        let action = dedup
            .absorb(&mut working, &candidate("   ", "news", 1), Utc::now())
            .await
            .unwrap();
        assert_eq!(action, DedupAction::Skipped);
        assert!(working.is_empty());
    }
}

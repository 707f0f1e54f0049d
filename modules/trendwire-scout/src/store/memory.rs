use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use trendwire_common::{CampaignIdea, CanonicalTrend, RunSummary, TrendwireError};

use super::StoreState;
use crate::traits::TrendStore;

/// In-process store. Holds state for tests and for short-lived runs that
/// do not need persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the full state, including archived trends.
    pub fn snapshot(&self) -> StoreState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn trend(&self, id: Uuid) -> Option<CanonicalTrend> {
        self.snapshot().trends.into_iter().find(|t| t.id == id)
    }

    pub fn ideas_for(&self, trend_id: Uuid) -> Vec<CampaignIdea> {
        self.snapshot()
            .campaign_ideas
            .remove(&trend_id)
            .unwrap_or_default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TrendwireError::Storage("memory store lock poisoned".to_string()))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn find_active_match(
        &self,
        fragment: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CanonicalTrend>> {
        self.with(|s| s.find_active_match(fragment, since).cloned())
    }

    async fn upsert_trends(&self, trends: &[CanonicalTrend]) -> Result<()> {
        self.with(|s| s.upsert(trends))
    }

    async fn active_trends(&self) -> Result<Vec<CanonicalTrend>> {
        self.with(|s| s.active())
    }

    async fn save_campaign_ideas(&self, trend_id: Uuid, ideas: &[CampaignIdea]) -> Result<()> {
        self.with(|s| s.add_ideas(trend_id, ideas))
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<()> {
        self.with(|s| s.runs.push(summary.clone()))
    }
}

//! Snapshot store backed by a single JSON file.
//!
//! Every mutating call rewrites `state.json` through a temp file in the same
//! directory followed by a rename, so readers only ever see a complete
//! snapshot. In-memory state is only updated after the write succeeds.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use trendwire_common::{CampaignIdea, CanonicalTrend, RunSummary, TrendwireError};

use super::StoreState;
use crate::traits::TrendStore;

const STATE_FILE: &str = "state.json";

pub struct JsonFileStore {
    dir: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Open (or create) the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store dir {}", dir.display()))?;

        let path = dir.join(STATE_FILE);
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw).map_err(TrendwireError::from)?
        } else {
            StoreState::default()
        };

        info!(
            path = %path.display(),
            trends = state.trends.len(),
            runs = state.runs.len(),
            "Opened trend store"
        );
        Ok(Self {
            dir,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }

    /// Serialize under the lock, then hand the file work to the blocking
    /// pool. The lock stays held until the rename lands so writes never
    /// reorder.
    async fn write(&self, state: &StoreState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state).map_err(TrendwireError::from)?;
        let bytes = json.len();
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &json))
            .await
            .map_err(|e| TrendwireError::Storage(format!("store write task failed: {e}")))??;

        debug!(trends = state.trends.len(), bytes, "Store snapshot written");
        Ok(())
    }

    async fn mutate(&self, f: impl FnOnce(&mut StoreState)) -> Result<()> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        f(&mut next);
        self.write(&next).await?;
        *guard = next;
        Ok(())
    }
}

/// Temp file in `dir`, fsync, rename over `state.json`.
fn write_atomic(dir: &Path, json: &[u8]) -> Result<(), TrendwireError> {
    let storage = |e: std::io::Error| TrendwireError::Storage(e.to_string());

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage)?;
    tmp.write_all(json).map_err(storage)?;
    tmp.as_file().sync_all().map_err(storage)?;
    tmp.persist(dir.join(STATE_FILE))
        .map_err(|e| TrendwireError::Storage(e.error.to_string()))?;
    Ok(())
}

#[async_trait]
impl TrendStore for JsonFileStore {
    async fn find_active_match(
        &self,
        fragment: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<CanonicalTrend>> {
        Ok(self
            .state
            .lock()
            .await
            .find_active_match(fragment, since)
            .cloned())
    }

    async fn upsert_trends(&self, trends: &[CanonicalTrend]) -> Result<()> {
        if trends.is_empty() {
            return Ok(());
        }
        self.mutate(|s| s.upsert(trends)).await
    }

    async fn active_trends(&self) -> Result<Vec<CanonicalTrend>> {
        Ok(self.state.lock().await.active())
    }

    async fn save_campaign_ideas(&self, trend_id: Uuid, ideas: &[CampaignIdea]) -> Result<()> {
        self.mutate(|s| s.add_ideas(trend_id, ideas)).await
    }

    async fn record_run(&self, summary: &RunSummary) -> Result<()> {
        self.mutate(|s| s.runs.push(summary.clone())).await
    }
}

//! Run log: ordered JSON timeline of what a pipeline run did.
//!
//! Each run produces `{DATA_DIR}/trendwire/runs/{run_id}.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::RunStats;

pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub seq: u32,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SourceCollected {
        source: String,
        candidates: u32,
    },
    SourceFailed {
        source: String,
        error: String,
    },
    TrendCreated {
        trend_id: Uuid,
        title: String,
        platform: String,
    },
    TrendMerged {
        trend_id: Uuid,
        platform: String,
        volume: u64,
    },
    Checkpoint {
        stage: String,
        trends: u32,
    },
    SafetyClassified {
        trend_id: Uuid,
        level: String,
        confidence: f64,
        brand_safe: bool,
        admitted: bool,
    },
    Enriched {
        trend_id: Uuid,
        fallback: bool,
        sustainability: f64,
    },
    Scored {
        trend_id: Uuid,
        overall: f64,
        brand_safety: f64,
    },
    Selected {
        trend_id: Uuid,
        rank: u32,
        ranking_score: f64,
    },
    Archived {
        trend_id: Uuid,
        reason: String,
    },
    IdeasGenerated {
        trend_id: Uuid,
        count: u32,
        model: String,
    },
}

impl RunLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Write the log under `data_dir`. Returns the file path.
    pub fn save(&self, data_dir: &Path, stats: &RunStats) -> Result<PathBuf> {
        let dir = data_dir.join("trendwire").join("runs");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create run log dir {}", dir.display()))?;

        let path = dir.join(format!("{}.json", self.run_id));
        let output = SerializedRunLog {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats,
            events: &self.events,
        };

        std::fs::write(&path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), events = self.events.len(), "Run log saved");
        Ok(path)
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: &'a RunStats,
    events: &'a [RunEvent],
}

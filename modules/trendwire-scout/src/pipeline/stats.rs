use chrono::{DateTime, Utc};
use serde::Serialize;

use trendwire_common::RunSummary;

/// Counters from one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub collected: u32,
    /// Names of collectors that errored or timed out.
    pub source_failures: Vec<String>,
    pub new_trends: u32,
    pub merged: u32,
    pub skipped: u32,
    pub safety_excluded: u32,
    pub enriched: u32,
    pub enrichment_fallbacks: u32,
    pub scored: u32,
    pub retained: u32,
    pub archived: u32,
    pub ideas_generated: u32,
}

impl RunStats {
    pub fn deduped(&self) -> u32 {
        self.new_trends + self.merged
    }

    pub fn to_summary(
        &self,
        run_id: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> RunSummary {
        RunSummary {
            run_id: run_id.to_string(),
            started_at: Some(started_at),
            finished_at: Some(finished_at),
            collected: self.collected,
            source_failures: self.source_failures.len() as u32,
            new_trends: self.new_trends,
            merged: self.merged,
            safety_excluded: self.safety_excluded,
            enriched: self.enriched,
            enrichment_fallbacks: self.enrichment_fallbacks,
            scored: self.scored,
            retained: self.retained,
            archived: self.archived,
            ideas_generated: self.ideas_generated,
        }
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Trend Run Complete ===")?;
        writeln!(f, "Candidates collected: {}", self.collected)?;
        if !self.source_failures.is_empty() {
            writeln!(f, "Failed sources:       {}", self.source_failures.join(", "))?;
        }
        writeln!(f, "New trends:           {}", self.new_trends)?;
        writeln!(f, "Merged:               {}", self.merged)?;
        if self.skipped > 0 {
            writeln!(f, "Skipped (no title):   {}", self.skipped)?;
        }
        writeln!(f, "Safety excluded:      {}", self.safety_excluded)?;
        writeln!(
            f,
            "Enriched:             {} ({} fallback)",
            self.enriched, self.enrichment_fallbacks
        )?;
        writeln!(f, "Scored:               {}", self.scored)?;
        writeln!(f, "Retained:             {}", self.retained)?;
        writeln!(f, "Archived:             {}", self.archived)?;
        writeln!(f, "Ideas generated:      {}", self.ideas_generated)?;
        Ok(())
    }
}

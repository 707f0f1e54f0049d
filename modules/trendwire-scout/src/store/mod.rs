pub mod json_file;
pub mod memory;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trendwire_common::text::normalize_title;
use trendwire_common::{CampaignIdea, CanonicalTrend, RunSummary};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Everything a store persists. Trends keep insertion order so that
/// "first match wins" is stable between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub trends: Vec<CanonicalTrend>,
    pub campaign_ideas: BTreeMap<Uuid, Vec<CampaignIdea>>,
    pub runs: Vec<RunSummary>,
}

impl StoreState {
    pub fn find_active_match(&self, fragment: &str, since: DateTime<Utc>) -> Option<&CanonicalTrend> {
        self.trends.iter().find(|t| {
            t.is_active() && t.created_at >= since && normalize_title(&t.title).contains(fragment)
        })
    }

    pub fn upsert(&mut self, trends: &[CanonicalTrend]) {
        for trend in trends {
            match self.trends.iter_mut().find(|t| t.id == trend.id) {
                Some(existing) => *existing = trend.clone(),
                None => self.trends.push(trend.clone()),
            }
        }
    }

    pub fn active(&self) -> Vec<CanonicalTrend> {
        self.trends.iter().filter(|t| t.is_active()).cloned().collect()
    }

    pub fn add_ideas(&mut self, trend_id: Uuid, ideas: &[CampaignIdea]) {
        self.campaign_ideas
            .entry(trend_id)
            .or_default()
            .extend(ideas.iter().cloned());
    }
}

//! Source-specific trending score used by collectors that see raw engagement.

use serde::{Deserialize, Serialize};

/// Engagement count at which the log-normalized term saturates.
const ENGAGEMENT_SATURATION: f64 = 10_000.0;

/// Listing a collector pulled from, which decides how engagement is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingAlgorithm {
    #[default]
    Hot,
    Rising,
    New,
    Top,
}

impl RankingAlgorithm {
    /// Path segment of the matching listing endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingAlgorithm::Hot => "hot",
            RankingAlgorithm::Rising => "rising",
            RankingAlgorithm::New => "new",
            RankingAlgorithm::Top => "top",
        }
    }

    pub fn weights(&self) -> RankingWeights {
        match self {
            RankingAlgorithm::Hot => RankingWeights {
                engagement: 0.30,
                approval: 0.25,
                discussion: 0.20,
                freshness: 0.15,
                recognition: 0.10,
            },
            RankingAlgorithm::Rising => RankingWeights {
                engagement: 0.15,
                approval: 0.15,
                discussion: 0.15,
                freshness: 0.45,
                recognition: 0.10,
            },
            RankingAlgorithm::New => RankingWeights {
                engagement: 0.10,
                approval: 0.30,
                discussion: 0.15,
                freshness: 0.35,
                recognition: 0.10,
            },
            RankingAlgorithm::Top => RankingWeights {
                engagement: 0.40,
                approval: 0.20,
                discussion: 0.15,
                freshness: 0.05,
                recognition: 0.20,
            },
        }
    }
}

/// Convex weights; each profile sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub engagement: f64,
    pub approval: f64,
    pub discussion: f64,
    pub freshness: f64,
    pub recognition: f64,
}

/// Raw engagement numbers for one post.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngagementSnapshot {
    pub score: i64,
    pub upvote_ratio: f64,
    pub comments: u64,
    pub age_hours: f64,
    /// Gilds plus awards.
    pub recognitions: u64,
}

/// Weighted trending score, clamped to [0.1, 1.0].
pub fn trending_score(snapshot: &EngagementSnapshot, algorithm: RankingAlgorithm) -> f64 {
    let w = algorithm.weights();
    let score = snapshot.score.max(0) as f64;

    let engagement = ((1.0 + score).log10() / (1.0 + ENGAGEMENT_SATURATION).log10()).min(1.0);
    let approval = finite_or_zero(snapshot.upvote_ratio).clamp(0.0, 1.0);
    let discussion = (snapshot.comments as f64 / score.max(1.0)).min(1.0);
    let freshness = freshness(snapshot.age_hours);
    let recognition = (snapshot.recognitions as f64 / 10.0).min(1.0);

    let combined = w.engagement * engagement
        + w.approval * approval
        + w.discussion * discussion
        + w.freshness * freshness
        + w.recognition * recognition;

    finite_or_zero(combined).clamp(0.1, 1.0)
}

/// `max(0.1, 1 / (1 + age_hours / 24))`; negative ages count as brand new.
pub fn freshness(age_hours: f64) -> f64 {
    let age = finite_or_zero(age_hours).max(0.0);
    (1.0 / (1.0 + age / 24.0)).max(0.1)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

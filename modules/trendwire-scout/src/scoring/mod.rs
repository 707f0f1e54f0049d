//! Deterministic trend scoring.
//!
//! Every function here is pure: the same trend and enrichment bundle always
//! produce the same numbers. `CanonicalTrend::score` is on a 0-1 scale and is
//! multiplied by 100 wherever it meets the 0-100 components.

pub mod source;

use trendwire_common::{CanonicalTrend, EnrichmentBundle, PipelineConfig, ScoreVector};
use uuid::Uuid;

pub use source::{trending_score, EngagementSnapshot, RankingAlgorithm, RankingWeights};

const CONTROVERSIAL_KEYWORDS: &[&str] = &[
    "scandal",
    "controversy",
    "lawsuit",
    "arrest",
    "banned",
    "illegal",
    "fraud",
    "scam",
    "fake",
    "conspiracy",
];
const VIRAL_KEYWORDS: &[&str] = &["viral", "trending", "breaking", "shocking", "amazing"];
const NOVELTY_KEYWORDS: &[&str] = &["new", "latest", "exclusive", "first"];

const DEFAULT_POSITIVE_PERCENT: f64 = 50.0;
const DEFAULT_OPPORTUNITY: f64 = 50.0;

/// Below this brand-safety score the overall score takes a 20% penalty.
const LOW_SAFETY_THRESHOLD: f64 = 50.0;

/// Sustainability when a trend has never been enriched.
const DEFAULT_SUSTAINABILITY: f64 = 50.0;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// How long the trend's relevance is likely to last, 0-100.
pub fn sustainability(base_score: f64, bundle: &EnrichmentBundle) -> f64 {
    let mut score = finite(base_score) * 100.0 * 0.3;

    let growth_7d = finite_opt(bundle.search_signal.volume_change_7d);
    score += if growth_7d > 20.0 {
        30.0
    } else if growth_7d > 0.0 {
        15.0
    } else {
        0.0
    };

    score += match bundle.related_coverage.len() {
        n if n >= 5 => 20.0,
        n if n >= 3 => 15.0,
        n if n >= 1 => 10.0,
        _ => 0.0,
    };

    let sentiment = finite_opt(bundle.sentiment_signal.sentiment_score);
    score += if sentiment > 0.5 {
        10.0
    } else if sentiment > 0.0 {
        5.0
    } else {
        0.0
    };

    score += opportunity(bundle) * 0.1;

    clamp_100(score)
}

/// Sustainability estimate for a trend whose enrichment failed outright.
pub fn fallback_sustainability(trend: &CanonicalTrend) -> f64 {
    let base = finite(trend.score) * 0.5;
    let category_boost = match trend.category.as_deref() {
        Some("technology" | "entertainment" | "business") => 0.2,
        _ => 0.0,
    };
    let platform_boost = (trend.platforms.len() as f64 * 0.1).min(0.3);
    clamp_100((base + category_boost + platform_boost).min(1.0) * 100.0)
}

/// Media pickup potential, 0-100.
pub fn pr_potential(bundle: &EnrichmentBundle) -> f64 {
    let mut score = (bundle.related_coverage.len() as f64 * 3.0).min(30.0);

    let growth = finite_opt(bundle.search_signal.volume_change_7d);
    score += if growth > 50.0 {
        25.0
    } else if growth > 20.0 {
        20.0
    } else if growth > 0.0 {
        15.0
    } else {
        0.0
    };

    let positive = bundle
        .sentiment_signal
        .distribution
        .map(|d| finite(d.positive))
        .unwrap_or(DEFAULT_POSITIVE_PERCENT);
    score += positive / 100.0 * 20.0;

    score += (bundle.geo_signal.top_countries.len() as f64 * 3.0).min(15.0);
    score += opportunity(bundle) / 100.0 * 10.0;

    clamp_100(score)
}

/// Shareability, 0-100.
pub fn viral_potential(title: &str, bundle: &EnrichmentBundle) -> f64 {
    let mut score = 0.0;

    let growth_24h = finite_opt(bundle.search_signal.volume_change_24h);
    score += if growth_24h > 100.0 {
        40.0
    } else if growth_24h > 50.0 {
        30.0
    } else if growth_24h > 20.0 {
        20.0
    } else if growth_24h > 0.0 {
        10.0
    } else {
        0.0
    };

    score += match bundle.demographic_signal.age_groups.len() {
        n if n >= 4 => 25.0,
        3 => 20.0,
        2 => 15.0,
        _ => 0.0,
    };

    let emotions = &bundle.sentiment_signal.emotional_indicators;
    let has = |name: &str| emotions.iter().any(|e| e.eq_ignore_ascii_case(name));
    if has("excitement") {
        score += 8.0;
    }
    if has("curiosity") {
        score += 6.0;
    }
    if has("surprise") {
        score += 6.0;
    }

    let title = title.to_lowercase();
    if VIRAL_KEYWORDS.iter().any(|k| title.contains(k)) {
        score += 15.0;
    } else if NOVELTY_KEYWORDS.iter().any(|k| title.contains(k)) {
        score += 10.0;
    }

    clamp_100(score)
}

/// Starts at 100 and loses points per risk signal. Higher is safer.
pub fn brand_safety(title: &str, bundle: &EnrichmentBundle, config: &PipelineConfig) -> f64 {
    let mut score = 100.0;

    for factor in &bundle.sentiment_signal.risk_factors {
        score -= finite(config.risk_deduction(factor));
    }

    let negative = bundle
        .sentiment_signal
        .distribution
        .map(|d| finite(d.negative))
        .unwrap_or(0.0);
    score -= if negative > 30.0 {
        15.0
    } else if negative > 20.0 {
        10.0
    } else if negative > 10.0 {
        5.0
    } else {
        0.0
    };

    let title = title.to_lowercase();
    let hits = CONTROVERSIAL_KEYWORDS
        .iter()
        .filter(|k| title.contains(*k))
        .count();
    score -= hits as f64 * 10.0;

    clamp_100(score)
}

/// 25/25/20/15/15 blend with a 20% haircut when brand safety is below 50.
pub fn overall(
    base_score: f64,
    sustainability: f64,
    pr_potential: f64,
    viral_potential: f64,
    brand_safety: f64,
) -> f64 {
    let brand_safety = finite(brand_safety);
    let mut score = finite(base_score) * 100.0 * 0.25
        + finite(sustainability) * 0.25
        + finite(pr_potential) * 0.20
        + finite(viral_potential) * 0.15
        + brand_safety * 0.15;
    if brand_safety < LOW_SAFETY_THRESHOLD {
        score *= 0.8;
    }
    clamp_100(score)
}

/// Full score vector for a trend. Missing enrichment scores as an empty
/// bundle; missing sustainability is computed from that bundle.
pub fn score_trend(trend: &CanonicalTrend, config: &PipelineConfig) -> ScoreVector {
    let empty;
    let bundle = match &trend.enrichment {
        Some(bundle) => bundle,
        None => {
            empty = EnrichmentBundle::empty(trend.updated_at);
            &empty
        }
    };

    let base_score = finite(trend.score).clamp(0.0, 1.0);
    let sustainability = trend
        .sustainability_score
        .map(clamp_100)
        .unwrap_or_else(|| self::sustainability(base_score, bundle));
    let pr_potential = pr_potential(bundle);
    let viral_potential = viral_potential(&trend.title, bundle);
    let brand_safety = brand_safety(&trend.title, bundle, config);

    ScoreVector {
        base_score,
        sustainability,
        pr_potential,
        viral_potential,
        brand_safety,
        overall: overall(
            base_score,
            sustainability,
            pr_potential,
            viral_potential,
            brand_safety,
        ),
    }
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

/// `max(0.1, 1 - age_days * 0.1)`.
pub fn decay_factor(age_days: i64) -> f64 {
    (1.0 - age_days.max(0) as f64 * 0.1).max(0.1)
}

/// Multiply score, sustainability and PR potential by the age factor.
///
/// Nothing records the pre-decay baseline, so running this twice compounds.
/// Returns the factor applied.
pub fn apply_decay(trend: &mut CanonicalTrend, age_days: i64) -> f64 {
    let factor = decay_factor(age_days);
    trend.score = finite(trend.score) * factor;
    trend.sustainability_score =
        Some(trend.sustainability_score.unwrap_or(DEFAULT_SUSTAINABILITY) * factor);
    if let Some(scores) = trend.scores.as_mut() {
        scores.base_score = trend.score;
        scores.sustainability = scores.sustainability * factor;
        scores.pr_potential = scores.pr_potential * factor;
    }
    factor
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// `0.6 * base + 0.4 * sustainability / 100`.
pub fn ranking_score(trend: &CanonicalTrend) -> f64 {
    let sustainability = trend.sustainability_score.map(finite).unwrap_or(0.0);
    0.6 * finite(trend.score) + 0.4 * (sustainability / 100.0)
}

/// Whether a scored trend meets every retention floor.
pub fn is_retained(trend: &CanonicalTrend, config: &PipelineConfig) -> bool {
    let sustainability = trend.sustainability_score.map(finite).unwrap_or(0.0);
    sustainability >= config.min_sustainability_score
        && finite(trend.score) >= config.min_trend_score
        && trend.is_brand_safe()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Retained trend ids, best first.
    pub ranked: Vec<(Uuid, f64)>,
    pub rejected: Vec<Uuid>,
}

impl Selection {
    pub fn top(&self, k: usize) -> impl Iterator<Item = Uuid> + '_ {
        self.ranked.iter().take(k).map(|(id, _)| *id)
    }
}

/// Split trends into retained (ranked, descending) and rejected.
pub fn select(trends: &[CanonicalTrend], config: &PipelineConfig) -> Selection {
    let mut selection = Selection::default();
    for trend in trends {
        if is_retained(trend, config) {
            selection.ranked.push((trend.id, ranking_score(trend)));
        } else {
            selection.rejected.push(trend.id);
        }
    }
    selection
        .ranked
        .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    selection
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn finite_opt(value: Option<f64>) -> f64 {
    value.map(finite).unwrap_or(0.0)
}

fn opportunity(bundle: &EnrichmentBundle) -> f64 {
    bundle
        .competition_signal
        .opportunity_score
        .map(finite)
        .unwrap_or(DEFAULT_OPPORTUNITY)
}

fn clamp_100(value: f64) -> f64 {
    finite(value).clamp(0.0, 100.0)
}

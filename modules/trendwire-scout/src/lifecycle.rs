//! Scheduled maintenance over stored trends: age decay and archival.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use trendwire_common::PipelineConfig;

use crate::scoring;
use crate::traits::TrendStore;

/// Decay every active trend older than `decay_after_days`.
///
/// Each call multiplies the current values again, so running it more than
/// once per day compounds. `last_decayed_at` is written for inspection only.
pub async fn apply_decay(
    store: &dyn TrendStore,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<u32> {
    let mut decayed = Vec::new();
    for mut trend in store.active_trends().await? {
        let age_days = trend.age_days(now);
        if age_days <= config.decay_after_days {
            continue;
        }
        let factor = scoring::apply_decay(&mut trend, age_days);
        trend
            .analysis_metadata
            .insert("last_decayed_at".into(), json!(now));
        trend.updated_at = now;
        debug!(trend_id = %trend.id, age_days, factor, score = trend.score, "Decayed trend");
        decayed.push(trend);
    }

    store.upsert_trends(&decayed).await?;
    info!(decayed = decayed.len(), "Decay pass complete");
    Ok(decayed.len() as u32)
}

/// Archive active trends older than `archive_after_days`.
pub async fn archive_expired(
    store: &dyn TrendStore,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<u32> {
    let expired: Vec<_> = store
        .active_trends()
        .await?
        .into_iter()
        .filter(|t| t.age_days(now) > config.archive_after_days)
        .map(|mut t| {
            t.archive(now);
            t
        })
        .collect();

    store.upsert_trends(&expired).await?;
    info!(archived = expired.len(), "Archive pass complete");
    Ok(expired.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::trend_titled;
    use chrono::Duration;
    use trendwire_common::TrendStatus;

    fn aged(title: &str, score: f64, days: i64, now: DateTime<Utc>) -> trendwire_common::CanonicalTrend {
        let mut trend = trend_titled(title, score);
        trend.created_at = now - Duration::days(days);
        trend.sustainability_score = Some(60.0);
        trend
    }

    #[tokio::test]
    async fn decays_only_past_threshold() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let fresh = aged("Fresh story", 0.8, 2, now);
        let old = aged("Old story", 0.8, 5, now);
        store.upsert_trends(&[fresh.clone(), old.clone()]).await.unwrap();

        let count = apply_decay(&store, &PipelineConfig::default(), now).await.unwrap();
        assert_eq!(count, 1);

        assert_eq!(store.trend(fresh.id).unwrap().score, 0.8);
        let old = store.trend(old.id).unwrap();
        assert!((old.score - 0.4).abs() < 1e-9);
        assert!((old.sustainability_score.unwrap() - 30.0).abs() < 1e-9);
        assert!(old.analysis_metadata.contains_key("last_decayed_at"));
    }

    #[tokio::test]
    async fn repeated_passes_compound() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let old = aged("Old story", 0.8, 4, now);
        store.upsert_trends(&[old.clone()]).await.unwrap();
        let config = PipelineConfig::default();

        apply_decay(&store, &config, now).await.unwrap();
        apply_decay(&store, &config, now).await.unwrap();

        // Factor 0.6 applied twice at the same instant.
        let after = store.trend(old.id).unwrap();
        assert!((after.score - 0.8 * 0.6 * 0.6).abs() < 1e-9, "got {}", after.score);
    }

    #[tokio::test]
    async fn archives_past_thirty_days() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let keep = aged("Recent", 0.5, 30, now);
        let drop = aged("Ancient", 0.5, 31, now);
        store.upsert_trends(&[keep.clone(), drop.clone()]).await.unwrap();

        let count = archive_expired(&store, &PipelineConfig::default(), now).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.trend(keep.id).unwrap().status, TrendStatus::Active);
        assert_eq!(store.trend(drop.id).unwrap().status, TrendStatus::Archived);
        // Soft delete: the row is still there.
        assert_eq!(store.snapshot().trends.len(), 2);
    }
}

//! Per-trend enrichment: six independent facet queries, fired together.
//!
//! A facet that errors or times out contributes its empty default. Only when
//! every facet fails is the trend considered unenriched, in which case it is
//! scored from the heuristic fallback sustainability instead.

pub mod news_api;
pub mod sentiment;

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use trendwire_common::{CanonicalTrend, EnrichmentBundle};

use crate::scoring;
use crate::traits::EnrichmentProvider;

pub use news_api::NewsApiEnrichment;

pub const DEFAULT_FACET_TIMEOUT: Duration = Duration::from_secs(10);

const FACET_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    pub bundle: EnrichmentBundle,
    /// Names of facets that errored or timed out.
    pub failed_facets: Vec<&'static str>,
}

/// Totals for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub enriched: u32,
    pub fallbacks: u32,
}

pub struct Enricher<'a> {
    provider: &'a dyn EnrichmentProvider,
    facet_timeout: Duration,
}

impl<'a> Enricher<'a> {
    pub fn new(provider: &'a dyn EnrichmentProvider, facet_timeout: Duration) -> Self {
        Self {
            provider,
            facet_timeout,
        }
    }

    /// Query every facet for `query`. Errors only when all six failed.
    pub async fn enrich(&self, query: &str, now: DateTime<Utc>) -> Result<EnrichmentOutcome> {
        let p = self.provider;
        let (coverage, search, demographics, geo, sentiment, competition) = tokio::join!(
            self.facet("related_coverage", query, p.related_coverage(query)),
            self.facet("search_signal", query, p.search_signal(query)),
            self.facet("demographic_signal", query, p.demographic_signal(query)),
            self.facet("geo_signal", query, p.geo_signal(query)),
            self.facet("sentiment_signal", query, p.sentiment_signal(query)),
            self.facet("competition_signal", query, p.competition_signal(query)),
        );

        let mut failed_facets = Vec::new();
        let mut take = |name: &'static str, ok: bool| {
            if !ok {
                failed_facets.push(name);
            }
        };
        take("related_coverage", coverage.is_some());
        take("search_signal", search.is_some());
        take("demographic_signal", demographics.is_some());
        take("geo_signal", geo.is_some());
        take("sentiment_signal", sentiment.is_some());
        take("competition_signal", competition.is_some());

        if failed_facets.len() == FACET_COUNT {
            return Err(anyhow!("every enrichment facet failed for {query:?}"));
        }

        Ok(EnrichmentOutcome {
            bundle: EnrichmentBundle {
                related_coverage: coverage.unwrap_or_default(),
                search_signal: search.unwrap_or_default(),
                demographic_signal: demographics.unwrap_or_default(),
                geo_signal: geo.unwrap_or_default(),
                sentiment_signal: sentiment.unwrap_or_default(),
                competition_signal: competition.unwrap_or_default(),
                enriched_at: now,
            },
            failed_facets,
        })
    }

    /// Enrich one trend in place. Returns false when the heuristic fallback
    /// was used.
    pub async fn enrich_trend(&self, trend: &mut CanonicalTrend, now: DateTime<Utc>) -> bool {
        match self.enrich(&trend.title, now).await {
            Ok(outcome) => {
                if !outcome.failed_facets.is_empty() {
                    debug!(
                        trend_id = %trend.id,
                        failed = ?outcome.failed_facets,
                        "Enriched with partial facets"
                    );
                }
                apply_enrichment(trend, outcome.bundle);
                true
            }
            Err(e) => {
                warn!(trend_id = %trend.id, error = %e, "Enrichment failed, falling back");
                apply_fallback(trend, now);
                false
            }
        }
    }

    /// Enrich every trend concurrently. One trend's failure never affects
    /// another's.
    pub async fn enrich_batch(&self, trends: &mut [CanonicalTrend], now: DateTime<Utc>) -> BatchReport {
        let results = join_all(trends.iter_mut().map(|t| self.enrich_trend(t, now))).await;

        let enriched = results.iter().filter(|ok| **ok).count() as u32;
        let report = BatchReport {
            enriched,
            fallbacks: results.len() as u32 - enriched,
        };
        info!(
            enriched = report.enriched,
            fallbacks = report.fallbacks,
            "Enrichment batch complete"
        );
        report
    }

    async fn facet<T>(
        &self,
        name: &'static str,
        query: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.facet_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(facet = name, query, error = %e, "Enrichment facet failed");
                None
            }
            Err(_) => {
                warn!(facet = name, query, timeout_secs = self.facet_timeout.as_secs_f64(), "Enrichment facet timed out");
                None
            }
        }
    }
}

/// Attach a fresh bundle, recompute sustainability, and shallow-merge the
/// facets into `analysis_metadata` under their fixed keys.
pub fn apply_enrichment(trend: &mut CanonicalTrend, bundle: EnrichmentBundle) {
    let meta = &mut trend.analysis_metadata;
    meta.insert("related_news".into(), to_value(&bundle.related_coverage));
    meta.insert("search_volume".into(), to_value(&bundle.search_signal));
    meta.insert("demographics".into(), to_value(&bundle.demographic_signal));
    meta.insert("geographic_distribution".into(), to_value(&bundle.geo_signal));
    meta.insert("sentiment_analysis".into(), to_value(&bundle.sentiment_signal));
    meta.insert("competition_analysis".into(), to_value(&bundle.competition_signal));
    meta.insert("enriched_at".into(), to_value(&bundle.enriched_at));
    meta.remove("enrichment_fallback");

    trend.sustainability_score = Some(scoring::sustainability(trend.score, &bundle));
    trend.updated_at = bundle.enriched_at;
    trend.enrichment = Some(bundle);
}

/// Keep a trend's earlier enrichment when it has one. Otherwise attach an
/// empty bundle and the heuristic sustainability estimate.
pub fn apply_fallback(trend: &mut CanonicalTrend, now: DateTime<Utc>) {
    if trend.enrichment.is_some() && trend.sustainability_score.is_some() {
        debug!(trend_id = %trend.id, "Keeping prior enrichment");
        return;
    }
    trend.sustainability_score = Some(scoring::fallback_sustainability(trend));
    trend.enrichment = Some(EnrichmentBundle::empty(now));
    trend
        .analysis_metadata
        .insert("enrichment_fallback".into(), Value::Bool(true));
    trend.updated_at = now;
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, trend_titled, FailingEnrichment, StaticEnrichment};
    use trendwire_common::SearchSignal;

    #[tokio::test]
    async fn one_failing_facet_leaves_others_intact() {
        let provider = StaticEnrichment::default()
            .with_coverage(vec![article("a"), article("bb"), article("ccc")])
            .failing_facet("search_signal");
        let enricher = Enricher::new(&provider, DEFAULT_FACET_TIMEOUT);

        let outcome = enricher.enrich("park", Utc::now()).await.unwrap();
        assert_eq!(outcome.failed_facets, vec!["search_signal"]);
        assert_eq!(outcome.bundle.related_coverage.len(), 3);
        assert_eq!(outcome.bundle.search_signal, SearchSignal::default());
    }

    #[tokio::test]
    async fn slow_facet_times_out_to_default() {
        let provider = StaticEnrichment::default()
            .with_coverage(vec![article("a")])
            .with_delay(Duration::from_millis(200));
        let enricher = Enricher::new(&provider, Duration::from_millis(20));

        let err = enricher.enrich("park", Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("every enrichment facet failed"));
    }

    #[tokio::test]
    async fn enrichment_sets_sustainability_and_metadata() {
        let provider = StaticEnrichment::default()
            .with_coverage(vec![article("a"), article("bb"), article("ccc")])
            .with_search(SearchSignal {
                volume_change_7d: Some(25.0),
                ..Default::default()
            });
        let enricher = Enricher::new(&provider, DEFAULT_FACET_TIMEOUT);
        let mut trend = trend_titled("City announces new park", 0.8);

        assert!(enricher.enrich_trend(&mut trend, Utc::now()).await);
        // 0.8*100*0.3 + 30 (growth) + 15 (three articles) + 0 sentiment + 0.1*50
        let sustainability = trend.sustainability_score.unwrap();
        assert!((sustainability - 74.0).abs() < 1e-9, "got {sustainability}");
        assert!(trend.analysis_metadata.contains_key("related_news"));
        assert!(trend.analysis_metadata.contains_key("competition_analysis"));
        assert!(trend.analysis_metadata.contains_key("sources"));
        assert_eq!(trend.enrichment.as_ref().unwrap().related_coverage.len(), 3);
    }

    #[tokio::test]
    async fn total_failure_falls_back_per_trend() {
        let enricher = Enricher::new(&FailingEnrichment, DEFAULT_FACET_TIMEOUT);
        let mut trends = vec![
            trend_titled("Quarterly tech earnings", 0.6),
            trend_titled("Film festival lineup", 0.4),
        ];
        trends[0].category = Some("technology".to_string());

        let report = enricher.enrich_batch(&mut trends, Utc::now()).await;
        assert_eq!(report, BatchReport { enriched: 0, fallbacks: 2 });

        // 100 * (0.5*0.6 + 0.2 + 0.1)
        let fallback = trends[0].sustainability_score.unwrap();
        assert!((fallback - 60.0).abs() < 1e-9, "got {fallback}");
        assert_eq!(
            trends[1].analysis_metadata.get("enrichment_fallback"),
            Some(&Value::Bool(true))
        );
        assert!(trends[1].enrichment.as_ref().unwrap().related_coverage.is_empty());
    }

    #[tokio::test]
    async fn outage_keeps_prior_enrichment() {
        let earlier = Utc::now() - chrono::Duration::hours(6);
        let provider = StaticEnrichment::default().with_coverage(vec![article("a"), article("bb"), article("ccc")]);
        let mut trends = vec![trend_titled("City announces new park", 0.8)];
        assert!(Enricher::new(&provider, DEFAULT_FACET_TIMEOUT).enrich_trend(&mut trends[0], earlier).await);
        let prior_sustainability = trends[0].sustainability_score;
        let prior_bundle = trends[0].enrichment.clone();

        let report = Enricher::new(&FailingEnrichment, DEFAULT_FACET_TIMEOUT)
            .enrich_batch(&mut trends, Utc::now())
            .await;

        assert_eq!(report, BatchReport { enriched: 0, fallbacks: 1 });
        assert_eq!(trends[0].sustainability_score, prior_sustainability);
        assert_eq!(trends[0].enrichment, prior_bundle);
        assert_eq!(trends[0].enrichment.as_ref().unwrap().related_coverage.len(), 3);
        assert!(!trends[0].analysis_metadata.contains_key("enrichment_fallback"));
    }
}

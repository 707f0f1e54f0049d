//! One end-to-end trend run.
//!
//! collect → dedup (checkpoint per source) → classify → enrich → score →
//! select → commit → campaign ideas → run summary.
//!
//! Only store errors abort a run. Collector, classifier, enrichment and idea
//! failures are logged and degrade to partial results.

pub mod stats;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use ai_client::ProviderGateway;
use trendwire_common::{CandidateRecord, CanonicalTrend, PipelineConfig};

use crate::campaign::CampaignIdeaGenerator;
use crate::dedup::{DedupAction, Deduplicator, WorkingSet};
use crate::enrichment::{Enricher, DEFAULT_FACET_TIMEOUT};
use crate::run_log::{EventKind, RunLog};
use crate::safety::SafetyClassifier;
use crate::scoring;
use crate::traits::{EnrichmentProvider, SourceCollector, TrendStore};

pub use stats::RunStats;

pub const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLASSIFY_CONCURRENCY: usize = 5;

#[derive(TypedBuilder)]
pub struct Pipeline {
    collectors: Vec<Arc<dyn SourceCollector>>,
    store: Arc<dyn TrendStore>,
    enrichment: Arc<dyn EnrichmentProvider>,
    gateway: Arc<ProviderGateway>,
    config: PipelineConfig,
    #[builder(default = DEFAULT_COLLECTOR_TIMEOUT)]
    collector_timeout: Duration,
    #[builder(default = DEFAULT_FACET_TIMEOUT)]
    facet_timeout: Duration,
    #[builder(default = DEFAULT_CLASSIFY_CONCURRENCY)]
    classify_concurrency: usize,
}

/// What the classifier sees for one trend.
struct ClassifyInput {
    trend_id: Uuid,
    title: String,
    body: String,
    metadata: Map<String, Value>,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, now: DateTime<Utc>, log: &mut RunLog) -> Result<RunStats> {
        let mut stats = RunStats::default();
        info!(run_id = log.run_id.as_str(), sources = self.collectors.len(), "Trend run starting");

        // 1. Collect + dedup, committing each source's trends as it lands.
        let mut working = WorkingSet::new();
        for (source, result) in self.collect_all().await {
            match result {
                Ok(candidates) => {
                    stats.collected += candidates.len() as u32;
                    log.log(EventKind::SourceCollected {
                        source: source.clone(),
                        candidates: candidates.len() as u32,
                    });
                    self.absorb_source(&source, &candidates, &mut working, now, &mut stats, log)
                        .await?;
                }
                Err(error) => {
                    warn!(source = source.as_str(), error = error.as_str(), "Source collection failed, skipping");
                    log.log(EventKind::SourceFailed {
                        source: source.clone(),
                        error,
                    });
                    stats.source_failures.push(source);
                }
            }
        }

        // 2. Classify every touched trend.
        let inputs = classify_inputs(&working);
        let mut trends = working.into_trends();
        let classifier = SafetyClassifier::new(&self.gateway, &self.config);
        let verdicts: Vec<_> = stream::iter(inputs)
            .map(|input| {
                let classifier = &classifier;
                async move {
                    let verdict = classifier
                        .classify(&input.title, &input.body, &input.metadata)
                        .await;
                    (input.trend_id, verdict)
                }
            })
            .buffer_unordered(self.classify_concurrency.max(1))
            .collect()
            .await;

        let policy = self.config.safety_policy();
        for (trend_id, verdict) in verdicts {
            if let Some(trend) = trends.iter_mut().find(|t| t.id == trend_id) {
                let admitted = policy.admits(&verdict);
                log.log(EventKind::SafetyClassified {
                    trend_id,
                    level: verdict.level.to_string(),
                    confidence: verdict.confidence,
                    brand_safe: verdict.is_brand_safe,
                    admitted,
                });
                trend.safety_verdict = Some(verdict);
            }
        }

        let (mut survivors, mut excluded): (Vec<CanonicalTrend>, Vec<CanonicalTrend>) = trends
            .into_iter()
            .partition(|t| t.safety_verdict.as_ref().is_some_and(|v| policy.admits(v)));
        for trend in &mut excluded {
            trend.archive(now);
            let reason = trend
                .safety_verdict
                .as_ref()
                .map(|v| format!("safety: {}", v.level))
                .unwrap_or_else(|| "safety: unclassified".to_string());
            log.log(EventKind::Archived {
                trend_id: trend.id,
                reason,
            });
        }
        stats.safety_excluded = excluded.len() as u32;
        stats.archived += excluded.len() as u32;
        info!(
            admitted = survivors.len(),
            excluded = excluded.len(),
            "Safety filter complete"
        );

        // 3. Enrich survivors.
        let enricher = Enricher::new(self.enrichment.as_ref(), self.facet_timeout);
        let report = enricher.enrich_batch(&mut survivors, now).await;
        stats.enriched = report.enriched;
        stats.enrichment_fallbacks = report.fallbacks;
        for trend in &survivors {
            log.log(EventKind::Enriched {
                trend_id: trend.id,
                fallback: trend.analysis_metadata.contains_key("enrichment_fallback"),
                sustainability: trend.sustainability_score.unwrap_or_default(),
            });
        }

        // 4. Score.
        for trend in &mut survivors {
            let scores = scoring::score_trend(trend, &self.config);
            trend.scores = Some(scores);
            stats.scored += 1;
            log.log(EventKind::Scored {
                trend_id: trend.id,
                overall: scores.overall,
                brand_safety: scores.brand_safety,
            });
        }

        // 5. Select; everything not retained is archived.
        let selection = scoring::select(&survivors, &self.config);
        let rejected: HashSet<Uuid> = selection.rejected.iter().copied().collect();
        for trend in survivors.iter_mut().filter(|t| rejected.contains(&t.id)) {
            trend.archive(now);
            log.log(EventKind::Archived {
                trend_id: trend.id,
                reason: "below retention thresholds".to_string(),
            });
        }
        stats.retained = selection.ranked.len() as u32;
        stats.archived += rejected.len() as u32;
        for (rank, (trend_id, ranking_score)) in selection.ranked.iter().enumerate() {
            log.log(EventKind::Selected {
                trend_id: *trend_id,
                rank: rank as u32 + 1,
                ranking_score: *ranking_score,
            });
        }

        // 6. Commit.
        let mut committed = survivors;
        committed.append(&mut excluded);
        self.store.upsert_trends(&committed).await?;
        log.log(EventKind::Checkpoint {
            stage: "scored".to_string(),
            trends: committed.len() as u32,
        });

        // 7. Campaign ideas for the top K.
        let top: Vec<&CanonicalTrend> = selection
            .top(self.config.max_trends_per_run)
            .filter_map(|id| committed.iter().find(|t| t.id == id))
            .collect();
        let generator = CampaignIdeaGenerator::new(&self.gateway, self.config.max_ideas_per_trend);
        let generated = join_all(top.iter().map(|t| generator.generate(t, now))).await;
        for (trend, ideas) in top.iter().zip(generated) {
            self.store.save_campaign_ideas(trend.id, &ideas).await?;
            stats.ideas_generated += ideas.len() as u32;
            log.log(EventKind::IdeasGenerated {
                trend_id: trend.id,
                count: ideas.len() as u32,
                model: ideas
                    .first()
                    .map(|i| i.generation_model.clone())
                    .unwrap_or_default(),
            });
        }

        // 8. Summary.
        let summary = stats.to_summary(&log.run_id, log.started_at, Utc::now());
        self.store.record_run(&summary).await?;

        info!(run_id = log.run_id.as_str(), "Trend run complete. {stats}");
        Ok(stats)
    }

    /// Run every collector concurrently, each under the collector timeout.
    /// Failures come back as strings so one source never affects another.
    async fn collect_all(&self) -> Vec<(String, Result<Vec<CandidateRecord>, String>)> {
        join_all(self.collectors.iter().map(|collector| async move {
            let name = collector.name().to_string();
            let result = match tokio::time::timeout(self.collector_timeout, collector.collect()).await {
                Ok(Ok(candidates)) => Ok(candidates),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(_) => Err(format!(
                    "timed out after {}s",
                    self.collector_timeout.as_secs_f64()
                )),
            };
            (name, result)
        }))
        .await
    }

    async fn absorb_source(
        &self,
        source: &str,
        candidates: &[CandidateRecord],
        working: &mut WorkingSet,
        now: DateTime<Utc>,
        stats: &mut RunStats,
        log: &mut RunLog,
    ) -> Result<()> {
        let dedup = Deduplicator::new(self.store.as_ref(), &self.config);
        let mut touched = Vec::new();

        for candidate in candidates {
            match dedup.absorb(working, candidate, now).await? {
                DedupAction::Created(id) => {
                    stats.new_trends += 1;
                    log.log(EventKind::TrendCreated {
                        trend_id: id,
                        title: candidate.title.clone(),
                        platform: candidate.platform.clone(),
                    });
                    touched.push(id);
                }
                DedupAction::Merged(id) => {
                    stats.merged += 1;
                    log.log(EventKind::TrendMerged {
                        trend_id: id,
                        platform: candidate.platform.clone(),
                        volume: working.get(id).map(|t| t.volume).unwrap_or_default(),
                    });
                    if !touched.contains(&id) {
                        touched.push(id);
                    }
                }
                DedupAction::Skipped => stats.skipped += 1,
            }
        }

        let batch = working.cloned(&touched);
        self.store.upsert_trends(&batch).await?;
        log.log(EventKind::Checkpoint {
            stage: format!("dedup:{source}"),
            trends: batch.len() as u32,
        });
        info!(source, candidates = candidates.len(), trends = batch.len(), "Source committed");
        Ok(())
    }
}

/// Classifier input per trend: a blocked contributor if the run saw one,
/// otherwise the candidate that touched it last.
fn classify_inputs(working: &WorkingSet) -> Vec<ClassifyInput> {
    working
        .trends()
        .iter()
        .map(|trend| match working.classification_source(trend.id) {
            Some(candidate) => ClassifyInput {
                trend_id: trend.id,
                title: candidate.title.clone(),
                body: candidate.body_excerpt.clone(),
                metadata: candidate.source_metadata.clone(),
            },
            None => ClassifyInput {
                trend_id: trend.id,
                title: trend.title.clone(),
                body: trend.description.clone(),
                metadata: match trend.analysis_metadata.get("source_metadata") {
                    Some(Value::Object(map)) => map.clone(),
                    _ => Map::new(),
                },
            },
        })
        .collect()
}

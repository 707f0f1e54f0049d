//! End-to-end pipeline runs against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use ai_client::testing::ScriptedProvider;
use ai_client::{ModelNaming, ProviderGateway};
use trendwire_common::{PipelineConfig, SafetyLevel, TrendStatus};
use trendwire_scout::campaign::{AI_GENERATED, TEMPLATE_BASED};
use trendwire_scout::run_log::EventKind;
use trendwire_scout::testing::{
    candidate, candidate_with_metadata, FailingCollector, FailingEnrichment, FailingStore,
    MockCollector, StaticEnrichment,
};
use trendwire_scout::traits::{EnrichmentProvider, SourceCollector};
use trendwire_scout::{MemoryStore, Pipeline, RunLog};

fn safety_reply(level: &str, confidence: f64) -> String {
    json!({
        "safety_level": level,
        "confidence": confidence,
        "primary_category": "local news",
        "secondary_categories": ["civic"],
        "reasoning": "scripted",
    })
    .to_string()
}

fn ideas_reply() -> String {
    let idea = |title: &str, kind: &str| {
        json!({
            "title": title,
            "headline": format!("{title} headline"),
            "description": "Tie the brand to the new park opening",
            "brief": "Short brief",
            "type": kind,
            "target_audience": "Local families",
            "timeline": "1-2 days",
            "difficulty": "easy",
            "potential_score": 0.7,
            "virality_score": 1.8,
            "channels": ["social"],
        })
    };
    json!({ "campaigns": [idea("Picnic Day", "reactive"), idea("Green Report", "thought-leadership")] })
        .to_string()
}

fn gateway(provider: ScriptedProvider) -> Arc<ProviderGateway> {
    Arc::new(
        ProviderGateway::new("openrouter", "anthropic/claude-3.5-sonnet", "openai/gpt-4")
            .register(provider),
    )
}

fn lenient_config() -> PipelineConfig {
    PipelineConfig {
        min_sustainability_score: 20.0,
        ..PipelineConfig::default()
    }
}

fn pipeline(
    collectors: Vec<Arc<dyn SourceCollector>>,
    store: Arc<MemoryStore>,
    enrichment: Arc<dyn EnrichmentProvider>,
    gateway: Arc<ProviderGateway>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::builder()
        .collectors(collectors)
        .store(store)
        .enrichment(enrichment)
        .gateway(gateway)
        .config(config)
        .collector_timeout(Duration::from_millis(500))
        .build()
}

fn park_collectors() -> Vec<Arc<dyn SourceCollector>> {
    vec![
        Arc::new(MockCollector::new(
            "reddit",
            vec![candidate("City announces new park", "reddit", 0.8, 100)],
        )),
        Arc::new(MockCollector::new(
            "news",
            vec![candidate("City Announces New Park", "news", 0.5, 40)],
        )),
    ]
}

#[tokio::test]
async fn park_trend_flows_through_every_stage() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::new(
        "openrouter",
        ModelNaming::VendorPrefixed,
        vec![Ok(safety_reply("safe", 0.9)), Ok(ideas_reply())],
    );
    let p = pipeline(
        park_collectors(),
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider.clone()),
        lenient_config(),
    );

    let mut log = RunLog::new("park-run");
    let stats = p.run(Utc::now(), &mut log).await.unwrap();

    assert_eq!(stats.collected, 2);
    assert_eq!(stats.new_trends, 1);
    assert_eq!(stats.merged, 1);
    assert_eq!(stats.retained, 1);
    assert_eq!(stats.ideas_generated, 2);
    assert!(stats.source_failures.is_empty());
    assert_eq!(provider.calls(), 2);

    let state = store.snapshot();
    assert_eq!(state.trends.len(), 1);
    let trend = &state.trends[0];
    assert_eq!(trend.status, TrendStatus::Active);
    assert_eq!(trend.volume, 140);
    assert_eq!(trend.platforms.len(), 2);
    assert_eq!(trend.safety_verdict.as_ref().unwrap().level, SafetyLevel::Safe);

    // 0.8 base, empty enrichment, "new" in the title.
    let scores = trend.scores.unwrap();
    assert!((scores.sustainability - 29.0).abs() < 1e-9, "{scores:?}");
    assert!((scores.pr_potential - 15.0).abs() < 1e-9, "{scores:?}");
    assert!((scores.viral_potential - 10.0).abs() < 1e-9, "{scores:?}");
    assert!((scores.brand_safety - 100.0).abs() < 1e-9, "{scores:?}");
    assert!((scores.overall - 46.75).abs() < 1e-9, "{scores:?}");

    let ideas = store.ideas_for(trend.id);
    assert_eq!(ideas.len(), 2);
    assert!(ideas.iter().all(|i| i.generation_model == AI_GENERATED));
    assert_eq!(ideas[0].virality_score, 1.0);
    assert_eq!(ideas[0].brand_safety_score, 0.8);

    assert_eq!(state.runs.len(), 1);
    assert_eq!(state.runs[0].run_id, "park-run");
    assert_eq!(state.runs[0].retained, 1);

    let checkpoints = log
        .events()
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Checkpoint { .. }))
        .count();
    assert_eq!(checkpoints, 3, "one per source plus the scored commit");
}

#[tokio::test]
async fn nsfw_candidate_is_blocked_without_asking_the_model() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![Arc::new(MockCollector::new(
        "reddit",
        vec![candidate_with_metadata(
            "Late night thread",
            "reddit",
            0.9,
            json!({ "over_18": true, "subreddit": "pics" }),
        )],
    ))];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider.clone()),
        lenient_config(),
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("nsfw")).await.unwrap();

    assert_eq!(stats.safety_excluded, 1);
    assert_eq!(stats.retained, 0);
    assert_eq!(stats.ideas_generated, 0);
    assert_eq!(provider.calls(), 0);

    let trend = &store.snapshot().trends[0];
    assert_eq!(trend.status, TrendStatus::Archived);
    let verdict = trend.safety_verdict.as_ref().unwrap();
    assert_eq!(verdict.level, SafetyLevel::Blocked);
    assert!(!verdict.is_brand_safe);
    assert!(trend.scores.is_none());
}

#[tokio::test]
async fn clean_merge_does_not_unblock_an_nsfw_trend() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![
        Arc::new(MockCollector::new(
            "reddit",
            vec![candidate_with_metadata(
                "Late night thread",
                "reddit",
                0.9,
                json!({ "over_18": true }),
            )],
        )),
        Arc::new(MockCollector::new(
            "news",
            vec![candidate("Late night thread", "news", 0.9, 50)],
        )),
    ];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider.clone()),
        lenient_config(),
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("nsfw-merge")).await.unwrap();

    assert_eq!(stats.merged, 1);
    assert_eq!(stats.safety_excluded, 1);
    assert_eq!(stats.retained, 0);
    assert_eq!(stats.ideas_generated, 0);
    assert_eq!(provider.calls(), 0);

    let state = store.snapshot();
    assert_eq!(state.trends.len(), 1);
    let trend = &state.trends[0];
    assert_eq!(trend.platforms.len(), 2);
    assert_eq!(trend.status, TrendStatus::Archived);
    assert_eq!(trend.safety_verdict.as_ref().unwrap().level, SafetyLevel::Blocked);
}

#[tokio::test]
async fn same_story_from_two_sources_is_one_trend() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![
        Arc::new(MockCollector::new(
            "reddit",
            vec![candidate("Harvest festival returns downtown", "reddit", 0.7, 60)],
        )),
        Arc::new(MockCollector::new(
            "google",
            vec![candidate("Harvest festival returns downtown", "google", 0.6, 25)],
        )),
    ];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider.clone()),
        lenient_config(),
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("two-sources")).await.unwrap();

    assert_eq!(stats.collected, 2);
    assert_eq!(stats.new_trends, 1);
    assert_eq!(stats.merged, 1);

    let state = store.snapshot();
    assert_eq!(state.trends.len(), 1);
    let trend = &state.trends[0];
    assert_eq!(trend.volume, 85);
    assert_eq!(
        trend.platforms.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["google", "reddit"]
    );
    assert_eq!(trend.analysis_metadata["sources"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unavailable_model_degrades_to_excluded_caution() {
    let store = Arc::new(MemoryStore::new());
    let provider = ScriptedProvider::failing("openrouter", ModelNaming::VendorPrefixed);
    let config = PipelineConfig {
        allow_caution_content: false,
        ..lenient_config()
    };
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![Arc::new(MockCollector::new(
        "news",
        vec![candidate("Stadium vote scheduled", "news", 0.7, 10)],
    ))];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider),
        config,
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("degraded")).await.unwrap();
    assert_eq!(stats.safety_excluded, 1);

    let trend = &store.snapshot().trends[0];
    let verdict = trend.safety_verdict.as_ref().unwrap();
    assert_eq!(verdict.level, SafetyLevel::Caution);
    assert_eq!(verdict.confidence, 0.3);
    assert_eq!(trend.status, TrendStatus::Archived);
}

#[tokio::test]
async fn failing_and_slow_sources_do_not_stop_the_run() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![
        Arc::new(FailingCollector::new("news")),
        Arc::new(
            MockCollector::new("google", vec![candidate("Slow topic", "google", 0.9, 5)])
                .with_delay(Duration::from_secs(5)),
        ),
        Arc::new(MockCollector::new(
            "reddit",
            vec![candidate("City announces new park", "reddit", 0.8, 100)],
        )),
    ];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider),
        lenient_config(),
    );

    let mut log = RunLog::new("partial");
    let stats = p.run(Utc::now(), &mut log).await.unwrap();

    assert_eq!(stats.source_failures, vec!["news".to_string(), "google".to_string()]);
    assert_eq!(stats.collected, 1);
    assert_eq!(stats.retained, 1);
    // Safe reply is not a campaign payload, so ideas come from templates.
    let trend_id = store.snapshot().trends[0].id;
    let ideas = store.ideas_for(trend_id);
    assert_eq!(ideas.len(), 3);
    assert!(ideas.iter().all(|i| i.generation_model == TEMPLATE_BASED));

    let failed = log
        .events()
        .iter()
        .filter(|e| matches!(e.kind, EventKind::SourceFailed { .. }))
        .count();
    assert_eq!(failed, 2);
}

#[tokio::test]
async fn enrichment_outage_uses_fallback_sustainability() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let p = pipeline(
        park_collectors(),
        store.clone(),
        Arc::new(FailingEnrichment),
        gateway(provider),
        lenient_config(),
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("fallback")).await.unwrap();
    assert_eq!(stats.enriched, 0);
    assert_eq!(stats.enrichment_fallbacks, 1);

    let trend = &store.snapshot().trends[0];
    // 100 * (0.5 * 0.8 + two platforms * 0.1)
    let sustainability = trend.sustainability_score.unwrap();
    assert!((sustainability - 60.0).abs() < 1e-9, "got {sustainability}");
    assert_eq!(trend.analysis_metadata["enrichment_fallback"], json!(true));
}

#[tokio::test]
async fn low_scores_are_archived_not_deleted() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![Arc::new(MockCollector::new(
        "google",
        vec![candidate("Minor local mention", "google", 0.1, 1)],
    ))];
    let p = pipeline(
        collectors,
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway(provider),
        PipelineConfig::default(),
    );

    let stats = p.run(Utc::now(), &mut RunLog::new("low")).await.unwrap();
    assert_eq!(stats.retained, 0);
    assert_eq!(stats.archived, 1);

    let state = store.snapshot();
    assert_eq!(state.trends.len(), 1);
    assert_eq!(state.trends[0].status, TrendStatus::Archived);
    assert!(state.campaign_ideas.is_empty());
}

#[tokio::test]
async fn second_run_merges_into_stored_trend() {
    let store = Arc::new(MemoryStore::new());
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let gateway = gateway(provider);
    let collectors = || -> Vec<Arc<dyn SourceCollector>> {
        vec![Arc::new(MockCollector::new(
            "reddit",
            vec![candidate("City announces new park", "reddit", 0.8, 100)],
        ))]
    };

    let first = pipeline(
        collectors(),
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway.clone(),
        lenient_config(),
    )
    .run(Utc::now(), &mut RunLog::new("first"))
    .await
    .unwrap();
    assert_eq!(first.new_trends, 1);

    let second = pipeline(
        collectors(),
        store.clone(),
        Arc::new(StaticEnrichment::default()),
        gateway,
        lenient_config(),
    )
    .run(Utc::now(), &mut RunLog::new("second"))
    .await
    .unwrap();
    assert_eq!(second.new_trends, 0);
    assert_eq!(second.merged, 1);

    let state = store.snapshot();
    assert_eq!(state.trends.len(), 1);
    assert_eq!(state.trends[0].volume, 200);
    assert_eq!(state.runs.len(), 2);
}

#[tokio::test]
async fn store_failure_aborts_the_run() {
    let provider =
        ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &safety_reply("safe", 0.9));
    let collectors: Vec<Arc<dyn SourceCollector>> = vec![Arc::new(MockCollector::new(
        "reddit",
        vec![candidate("City announces new park", "reddit", 0.8, 100)],
    ))];
    let p = Pipeline::builder()
        .collectors(collectors)
        .store(Arc::new(FailingStore))
        .enrichment(Arc::new(StaticEnrichment::default()))
        .gateway(gateway(provider))
        .config(lenient_config())
        .build();

    let err = p.run(Utc::now(), &mut RunLog::new("broken")).await.unwrap_err();
    assert!(err.to_string().contains("disk full"), "got {err:#}");
}

//! Google daily trending searches, read from the public RSS feed.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Map};
use tracing::info;

use trendwire_common::CandidateRecord;

use crate::traits::SourceCollector;

const FEED_URL: &str = "https://trends.google.com/trending/rss";
const EXPLORE_URL: &str = "https://trends.google.com/trends/explore";
const MAX_TRENDS: usize = 20;

pub struct GoogleTrendsCollector {
    client: reqwest::Client,
    geo: String,
}

impl GoogleTrendsCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("trendwire/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(15))
                .build()
                .context("Failed to build RSS HTTP client")?,
            geo: "US".to_string(),
        })
    }

    pub fn with_geo(mut self, geo: impl Into<String>) -> Self {
        self.geo = geo.into();
        self
    }
}

#[async_trait]
impl SourceCollector for GoogleTrendsCollector {
    fn name(&self) -> &str {
        "google"
    }

    async fn collect(&self) -> Result<Vec<CandidateRecord>> {
        let bytes = self
            .client
            .get(FEED_URL)
            .query(&[("geo", self.geo.as_str())])
            .send()
            .await
            .context("Google Trends feed fetch failed")?
            .error_for_status()
            .context("Google Trends feed returned an error")?
            .bytes()
            .await
            .context("Failed to read Google Trends feed body")?;

        let candidates = candidates_from_feed(&bytes, &self.geo, Utc::now())?;
        info!(geo = self.geo.as_str(), count = candidates.len(), "Collected Google trends");
        Ok(candidates)
    }
}

/// Parse the RSS body into rank-scored candidates: score
/// `max(0.1, 1 - 0.05 * rank)`, velocity `max(0.1, 1 - 0.03 * rank)`, volume
/// `1000 - 50 * rank`.
pub(crate) fn candidates_from_feed(
    body: &[u8],
    geo: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CandidateRecord>> {
    let feed = feed_rs::parser::parse(body).context("Failed to parse Google Trends feed")?;
    let traffic = approx_traffic(body);

    let titles = feed
        .entries
        .into_iter()
        .enumerate()
        .filter_map(|(item, entry)| {
            let title = entry.title?.content.trim().to_string();
            let traffic = traffic.get(item).cloned().flatten();
            (!title.is_empty()).then_some((title, traffic))
        })
        .take(MAX_TRENDS);

    let mut candidates = Vec::new();
    for (rank, (title, traffic)) in titles.enumerate() {
        let r = rank as f64;
        let explore = reqwest::Url::parse_with_params(EXPLORE_URL, &[("q", title.as_str())])
            .context("Failed to build explore url")?;

        let mut metadata = Map::new();
        metadata.insert("geo".into(), json!(geo));
        metadata.insert("source".into(), json!("google_trends"));
        metadata.insert("rank".into(), json!(rank + 1));
        if let Some(traffic) = traffic {
            metadata.insert("approx_traffic".into(), json!(traffic));
        }

        candidates.push(
            CandidateRecord::builder()
                .source_id(format!("google:{}:{}", geo.to_lowercase(), title.to_lowercase()))
                .body_excerpt(format!("Trending topic: {title}"))
                .keywords(vec![title.to_lowercase()])
                .title(title)
                .platform("google")
                .category("general")
                .raw_score((1.0 - 0.05 * r).max(0.1))
                .velocity((1.0 - 0.03 * r).max(0.1))
                .raw_volume(1000u64.saturating_sub(50 * rank as u64))
                .regions(vec![geo.to_string()])
                .source_urls(vec![explore.to_string()])
                .created_at(now)
                .source_metadata(metadata)
                .build(),
        );
    }
    Ok(candidates)
}

/// `ht:approx_traffic` for each `<item>`, in document order. feed-rs drops
/// the namespace, so read them off the raw XML.
fn approx_traffic(body: &[u8]) -> Vec<Option<String>> {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    static TRAFFIC: OnceLock<Regex> = OnceLock::new();
    let item = ITEM.get_or_init(|| Regex::new(r"(?s)<item\b.*?</item>").expect("valid regex"));
    let traffic = TRAFFIC.get_or_init(|| {
        Regex::new(r"<ht:approx_traffic>\s*([^<]+?)\s*</ht:approx_traffic>").expect("valid regex")
    });

    let text = String::from_utf8_lossy(body);
    item.find_iter(&text)
        .map(|m| traffic.captures(m.as_str()).map(|c| c[1].to_string()))
        .collect()
}

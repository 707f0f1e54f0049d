use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use trendwire_common::{CoverageArticle, SentimentSignal};

use super::sentiment;
use crate::sources::news::{NewsApiResponse, NEWS_API_BASE};
use crate::traits::EnrichmentProvider;

const COVERAGE_PAGE_SIZE: usize = 10;
const COVERAGE_LOOKBACK_DAYS: i64 = 7;

type CoverageCell = Arc<OnceCell<Vec<CoverageArticle>>>;

/// Related coverage from NewsAPI `everything`, and a lexicon sentiment
/// estimate over the same articles. Other facets have no backend and answer
/// empty.
///
/// Coverage is fetched once per query and shared between the two facets,
/// which run concurrently.
pub struct NewsApiEnrichment {
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: String,
    coverage: Mutex<HashMap<String, CoverageCell>>,
}

impl NewsApiEnrichment {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build HTTP client")?,
            base_url: NEWS_API_BASE.to_string(),
            coverage: Mutex::new(HashMap::new()),
        })
    }

    async fn cached_coverage(&self, query: &str) -> Result<Vec<CoverageArticle>> {
        let cell = self
            .coverage
            .lock()
            .await
            .entry(query.to_string())
            .or_default()
            .clone();
        let articles = cell.get_or_try_init(|| self.fetch(query)).await?;
        Ok(articles.clone())
    }

    async fn fetch(&self, query: &str) -> Result<Vec<CoverageArticle>> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(query, "No NewsAPI key, coverage facet empty");
            return Ok(Vec::new());
        };

        let from = coverage_since(Utc::now()).format("%Y-%m-%d").to_string();
        let page_size = COVERAGE_PAGE_SIZE.to_string();
        let resp: NewsApiResponse = self
            .client
            .get(format!("{}/everything", self.base_url))
            .query(&[
                ("q", query),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
                ("language", "en"),
                ("from", from.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("NewsAPI coverage request failed")?
            .json()
            .await
            .context("Failed to parse NewsAPI coverage response")?;

        let articles = coverage_from_response(resp)?;
        info!(query, count = articles.len(), "Fetched related coverage");
        Ok(articles)
    }
}

#[async_trait]
impl EnrichmentProvider for NewsApiEnrichment {
    async fn related_coverage(&self, query: &str) -> Result<Vec<CoverageArticle>> {
        self.cached_coverage(query).await
    }

    async fn sentiment_signal(&self, query: &str) -> Result<SentimentSignal> {
        let articles = self.cached_coverage(query).await?;
        Ok(sentiment::analyze(&coverage_texts(&articles)))
    }
}

fn coverage_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - ChronoDuration::days(COVERAGE_LOOKBACK_DAYS)
}

pub(crate) fn coverage_from_response(resp: NewsApiResponse) -> Result<Vec<CoverageArticle>> {
    Ok(resp
        .into_articles()?
        .into_iter()
        .filter_map(|a| a.into_coverage())
        .take(COVERAGE_PAGE_SIZE)
        .collect())
}

/// Headline plus description, one text per article.
fn coverage_texts(articles: &[CoverageArticle]) -> Vec<String> {
    articles
        .iter()
        .map(|a| match &a.description {
            Some(d) => format!("{} {d}", a.title),
            None => a.title.clone(),
        })
        .collect()
}

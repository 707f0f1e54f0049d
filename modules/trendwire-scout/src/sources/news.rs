//! NewsAPI top headlines. Rank within the response stands in for engagement.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use trendwire_common::text::extract_keywords;
use trendwire_common::{CandidateRecord, CoverageArticle};

use crate::traits::SourceCollector;

pub(crate) const NEWS_API_BASE: &str = "https://newsapi.org/v2";

const COUNTRY: &str = "us";
const PAGE_SIZE: usize = 20;

// --- Wire format (shared with the coverage facet) ---

#[derive(Debug, Deserialize)]
pub(crate) struct NewsApiResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewsApiArticle {
    #[serde(default)]
    pub source: NewsApiSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NewsApiSource {
    #[serde(default)]
    pub name: Option<String>,
}

impl NewsApiResponse {
    /// Articles of an `ok` response; an `error` status becomes an error.
    pub fn into_articles(self) -> Result<Vec<NewsApiArticle>> {
        if self.status != "ok" {
            bail!(
                "NewsAPI returned status {}: {}",
                self.status,
                self.message.unwrap_or_default()
            );
        }
        Ok(self.articles)
    }
}

impl NewsApiArticle {
    /// Title and url, unless the article was pulled by the publisher.
    fn usable(&self) -> Option<(&str, &str)> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let url = self.url.as_deref().filter(|u| !u.is_empty())?;
        (title != "[Removed]").then_some((title, url))
    }

    pub fn into_coverage(self) -> Option<CoverageArticle> {
        let (title, url) = self.usable()?;
        Some(CoverageArticle {
            title: title.to_string(),
            url: url.to_string(),
            description: self.description,
            published_at: self.published_at,
            source: self.source.name.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

// --- Collector ---

pub struct NewsApiCollector {
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: String,
}

impl NewsApiCollector {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build HTTP client")?,
            base_url: NEWS_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl SourceCollector for NewsApiCollector {
    fn name(&self) -> &str {
        "news"
    }

    async fn collect(&self) -> Result<Vec<CandidateRecord>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("NEWS_API_KEY not set, skipping news headlines");
            return Ok(Vec::new());
        };

        let page_size = PAGE_SIZE.to_string();
        let resp: NewsApiResponse = self
            .client
            .get(format!("{}/top-headlines", self.base_url))
            .query(&[
                ("country", COUNTRY),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("NewsAPI request failed")?
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;

        let candidates = candidates_from_headlines(resp.into_articles()?, Utc::now());
        info!(count = candidates.len(), "Collected news headlines");
        Ok(candidates)
    }
}

/// Rank-scored candidates: score `max(0.2, 0.9 - 0.04 * rank)`, velocity
/// `max(0.1, 0.8 - 0.03 * rank)`, volume `500 - 25 * rank`.
pub(crate) fn candidates_from_headlines(
    articles: Vec<NewsApiArticle>,
    now: DateTime<Utc>,
) -> Vec<CandidateRecord> {
    articles
        .into_iter()
        .filter(|a| a.usable().is_some())
        .take(PAGE_SIZE)
        .enumerate()
        .filter_map(|(rank, article)| {
            let (title, url) = article.usable()?;
            let (title, url) = (title.to_string(), url.to_string());
            let r = rank as f64;

            let mut metadata = Map::new();
            metadata.insert(
                "source".into(),
                json!(article.source.name.as_deref().unwrap_or("unknown")),
            );
            metadata.insert("published_at".into(), json!(article.published_at));
            metadata.insert("author".into(), json!(article.author));
            metadata.insert("country".into(), Value::String(COUNTRY.to_string()));

            Some(
                CandidateRecord::builder()
                    .source_id(format!("news:{url}"))
                    .keywords(extract_keywords(&title))
                    .title(title)
                    .body_excerpt(article.description.unwrap_or_default())
                    .platform("news")
                    .category("news")
                    .raw_score((0.9 - 0.04 * r).max(0.2))
                    .velocity((0.8 - 0.03 * r).max(0.1))
                    .raw_volume(500u64.saturating_sub(25 * rank as u64))
                    .regions(vec![COUNTRY.to_uppercase()])
                    .source_urls(vec![url])
                    .created_at(now)
                    .source_metadata(metadata)
                    .build(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "status": "ok",
        "totalResults": 3,
        "articles": [
            {
                "source": {"id": null, "name": "Metro Daily"},
                "author": "J. Reporter",
                "title": "City announces new park",
                "description": "The council approved a riverside park.",
                "url": "https://metro.test/park",
                "publishedAt": "2026-10-17T09:30:00Z"
            },
            {
                "source": {"id": null, "name": null},
                "title": "[Removed]",
                "url": "https://removed.com"
            },
            {
                "source": {"id": "wire", "name": "Wire"},
                "title": "Stocks rally on rate news",
                "description": null,
                "url": "https://wire.test/stocks",
                "publishedAt": null
            }
        ]
    }"#;

    fn articles() -> Vec<NewsApiArticle> {
        serde_json::from_str::<NewsApiResponse>(FIXTURE)
            .unwrap()
            .into_articles()
            .unwrap()
    }

    #[test]
    fn rank_drives_score_and_volume() {
        let candidates = candidates_from_headlines(articles(), Utc::now());
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.title, "City announces new park");
        assert_eq!(first.platform, "news");
        assert_eq!(first.category.as_deref(), Some("news"));
        assert!((first.raw_score - 0.9).abs() < 1e-9);
        assert_eq!(first.raw_volume, 500);
        assert_eq!(first.source_urls, vec!["https://metro.test/park".to_string()]);
        assert_eq!(first.source_metadata["source"], "Metro Daily");

        // The removed article does not consume a rank.
        let second = &candidates[1];
        assert!((second.raw_score - 0.86).abs() < 1e-9);
        assert!((second.velocity - 0.77).abs() < 1e-9);
        assert_eq!(second.raw_volume, 475);
        assert_eq!(second.body_excerpt, "");
    }

    #[test]
    fn score_floors_deep_in_the_list() {
        let many: Vec<NewsApiArticle> = (0..20)
            .map(|i| NewsApiArticle {
                source: NewsApiSource::default(),
                author: None,
                title: Some(format!("Story {i}")),
                description: None,
                url: Some(format!("https://n.test/{i}")),
                published_at: None,
            })
            .collect();
        let candidates = candidates_from_headlines(many, Utc::now());
        let last = candidates.last().unwrap();
        assert_eq!(last.raw_score, 0.2);
        assert_eq!(last.raw_volume, 25);
    }

    #[test]
    fn error_status_is_an_error() {
        let resp: NewsApiResponse = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )
        .unwrap();
        let err = resp.into_articles().unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid") || err.to_string().contains("invalid"));
    }

    #[tokio::test]
    async fn missing_key_collects_nothing() {
        let collector = NewsApiCollector::new(None).unwrap();
        assert!(collector.collect().await.unwrap().is_empty());
    }
}

//! Reddit public JSON listings.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use trendwire_common::text::extract_keywords;
use trendwire_common::CandidateRecord;

use crate::scoring::{trending_score, EngagementSnapshot, RankingAlgorithm};
use crate::traits::SourceCollector;

pub const DEFAULT_SUBREDDITS: &[&str] = &["all", "news", "worldnews", "technology", "entertainment"];
pub const POSTS_PER_SUBREDDIT: usize = 5;

const REDDIT_BASE: &str = "https://www.reddit.com";
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Child {
    pub data: Post,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub subreddit: String,
    #[serde(default)]
    pub author: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvote_ratio: f64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub gilded: u64,
    #[serde(default)]
    pub total_awards_received: u64,
    #[serde(default)]
    pub link_flair_text: Option<String>,
    #[serde(default)]
    pub author_flair_text: Option<String>,
}

pub struct RedditCollector {
    client: reqwest::Client,
    subreddits: Vec<String>,
    algorithm: RankingAlgorithm,
    limit: usize,
}

impl RedditCollector {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build HTTP client")?,
            subreddits: DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            algorithm: RankingAlgorithm::Hot,
            limit: POSTS_PER_SUBREDDIT,
        })
    }

    pub fn with_algorithm(mut self, algorithm: RankingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_subreddits(mut self, subreddits: Vec<String>) -> Self {
        self.subreddits = subreddits;
        self
    }

    async fn fetch_listing(&self, subreddit: &str) -> Result<Listing> {
        let url = format!("{REDDIT_BASE}/r/{subreddit}/{}.json", self.algorithm.as_str());
        let limit = self.limit.to_string();
        self.client
            .get(&url)
            .query(&[("limit", limit.as_str())])
            .send()
            .await
            .with_context(|| format!("Reddit request failed for r/{subreddit}"))?
            .error_for_status()
            .with_context(|| format!("Reddit returned an error for r/{subreddit}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse r/{subreddit} listing"))
    }
}

#[async_trait]
impl SourceCollector for RedditCollector {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn collect(&self) -> Result<Vec<CandidateRecord>> {
        let now = Utc::now();
        let mut candidates = Vec::new();
        for subreddit in &self.subreddits {
            match self.fetch_listing(subreddit).await {
                Ok(listing) => {
                    let batch = candidates_from_listing(listing, self.algorithm, self.limit, now);
                    info!(subreddit = subreddit.as_str(), count = batch.len(), "Collected reddit posts");
                    candidates.extend(batch);
                }
                Err(e) => {
                    warn!(subreddit = subreddit.as_str(), error = %e, "Subreddit fetch failed, skipping");
                }
            }
        }
        Ok(candidates)
    }
}

pub(crate) fn candidates_from_listing(
    listing: Listing,
    algorithm: RankingAlgorithm,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<CandidateRecord> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .filter(|p| !p.title.trim().is_empty())
        .take(limit)
        .map(|post| candidate_from_post(post, algorithm, now))
        .collect()
}

fn candidate_from_post(post: Post, algorithm: RankingAlgorithm, now: DateTime<Utc>) -> CandidateRecord {
    let created = Utc
        .timestamp_opt(post.created_utc as i64, 0)
        .single()
        .unwrap_or(now);
    let age_hours = (now - created).num_seconds() as f64 / 3600.0;

    let snapshot = EngagementSnapshot {
        score: post.score,
        upvote_ratio: post.upvote_ratio,
        comments: post.num_comments,
        age_hours,
        recognitions: post.gilded + post.total_awards_received,
    };

    let mut metadata = Map::new();
    metadata.insert("subreddit".into(), json!(post.subreddit));
    metadata.insert("author".into(), json!(post.author));
    metadata.insert("created_utc".into(), json!(post.created_utc));
    metadata.insert("num_comments".into(), json!(post.num_comments));
    metadata.insert("upvote_ratio".into(), json!(post.upvote_ratio));
    metadata.insert("reddit_score".into(), json!(post.score));
    metadata.insert("over_18".into(), Value::Bool(post.over_18));
    metadata.insert("locked".into(), Value::Bool(post.locked));
    metadata.insert("stickied".into(), Value::Bool(post.stickied));
    metadata.insert("gilded".into(), json!(post.gilded));
    metadata.insert("total_awards_received".into(), json!(post.total_awards_received));
    metadata.insert("link_flair_text".into(), json!(post.link_flair_text));
    metadata.insert("author_flair_text".into(), json!(post.author_flair_text));
    metadata.insert("ranking".into(), json!(algorithm.as_str()));

    CandidateRecord::builder()
        .source_id(format!("reddit:{}", post.id))
        .keywords(extract_keywords(&post.title))
        .title(post.title)
        .body_excerpt(post.selftext.chars().take(BODY_EXCERPT_CHARS).collect::<String>())
        .platform("reddit")
        .category(post.subreddit)
        .raw_score(trending_score(&snapshot, algorithm))
        .velocity(post.upvote_ratio.clamp(0.0, 1.0))
        .raw_volume(post.num_comments)
        .source_urls(vec![format!("{REDDIT_BASE}{}", post.permalink)])
        .created_at(now)
        .source_metadata(metadata)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(now: DateTime<Utc>) -> Listing {
        let two_hours_ago = (now.timestamp() - 7200) as f64;
        serde_json::from_value(json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t3", "data": {
                        "id": "abc123",
                        "title": "City announces new park",
                        "selftext": "x".repeat(500),
                        "subreddit": "news",
                        "author": "parkfan",
                        "permalink": "/r/news/comments/abc123/city_announces_new_park/",
                        "score": 8000,
                        "upvote_ratio": 0.95,
                        "num_comments": 420,
                        "created_utc": two_hours_ago,
                        "total_awards_received": 3,
                        "link_flair_text": "Local"
                    }},
                    {"kind": "t3", "data": {
                        "id": "nsfw1",
                        "title": "Something explicit",
                        "subreddit": "all",
                        "permalink": "/r/all/comments/nsfw1/",
                        "over_18": true
                    }},
                    {"kind": "t3", "data": {
                        "id": "blank",
                        "title": "   ",
                        "subreddit": "all",
                        "permalink": "/r/all/comments/blank/"
                    }}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn maps_posts_to_candidates() {
        let now = Utc::now();
        let candidates = candidates_from_listing(listing(now), RankingAlgorithm::Hot, 5, now);
        assert_eq!(candidates.len(), 2);

        let park = &candidates[0];
        assert_eq!(park.source_id, "reddit:abc123");
        assert_eq!(park.platform, "reddit");
        assert_eq!(park.category.as_deref(), Some("news"));
        assert_eq!(park.body_excerpt.chars().count(), 200);
        assert_eq!(park.raw_volume, 420);
        assert_eq!(park.velocity, 0.95);
        assert_eq!(
            park.source_urls,
            vec!["https://www.reddit.com/r/news/comments/abc123/city_announces_new_park/".to_string()]
        );
        assert!(park.raw_score > 0.6 && park.raw_score <= 1.0, "got {}", park.raw_score);
        assert_eq!(park.source_metadata["reddit_score"], 8000);
        assert_eq!(park.keywords, vec!["city", "announces", "park"]);
    }

    #[test]
    fn metadata_carries_safety_flags() {
        let now = Utc::now();
        let candidates = candidates_from_listing(listing(now), RankingAlgorithm::Hot, 5, now);
        let signals = crate::safety::signals::MetadataSignals::extract(&candidates[1].source_metadata);
        assert!(signals.nsfw);
        assert_eq!(signals.channel.as_deref(), Some("all"));

        let park = crate::safety::signals::MetadataSignals::extract(&candidates[0].source_metadata);
        assert_eq!(park.awards, 3);
        assert_eq!(park.post_flair.as_deref(), Some("local"));
    }

    #[test]
    fn limit_applies_per_listing() {
        let now = Utc::now();
        let candidates = candidates_from_listing(listing(now), RankingAlgorithm::New, 1, now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_metadata["ranking"], "new");
    }

    #[test]
    fn scores_stay_in_range_for_sparse_posts() {
        let now = Utc::now();
        let candidates = candidates_from_listing(listing(now), RankingAlgorithm::Rising, 5, now);
        // Zero engagement, epoch timestamp: only the clamp floor is left.
        assert!(candidates[1].raw_score >= 0.1);
    }
}

//! Live source collectors.

pub mod google_trends;
pub mod news;
pub mod reddit;

use std::sync::Arc;

use anyhow::Result;

use trendwire_common::Config;

use crate::traits::SourceCollector;

pub use google_trends::GoogleTrendsCollector;
pub use news::NewsApiCollector;
pub use reddit::RedditCollector;

/// Every live collector, configured from the process config.
pub fn live_collectors(config: &Config) -> Result<Vec<Arc<dyn SourceCollector>>> {
    let mut collectors: Vec<Arc<dyn SourceCollector>> = Vec::new();
    collectors.push(Arc::new(RedditCollector::new(&config.reddit_user_agent)?));
    collectors.push(Arc::new(NewsApiCollector::new(config.news_api_key.clone())?));
    collectors.push(Arc::new(GoogleTrendsCollector::new()?));
    Ok(collectors)
}

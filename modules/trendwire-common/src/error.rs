use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendwireError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider timed out after {0}s")]
    Timeout(u64),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Every registered provider was tried once and none succeeded.
    #[error("All AI providers failed ({attempts} attempted)")]
    AllProvidersExhausted { attempts: usize },
}

impl AiError {
    /// True for the terminal gateway error; everything else is a single-provider failure.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AiError::AllProvidersExhausted { .. })
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for AiError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        AiError::Config(format!("invalid header value: {e}"))
    }
}

//! The one JSON POST every backend makes.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::AiError;
use crate::util::truncate_chars;

/// Error bodies are cut to this many characters before they reach logs.
const ERROR_BODY_CHARS: usize = 500;

/// `Authorization: Bearer` plus JSON content type.
pub(crate) fn bearer_headers(api_key: &str) -> Result<HeaderMap, AiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

pub(crate) async fn post_json<B, R>(
    http: &reqwest::Client,
    backend: &str,
    url: &str,
    headers: HeaderMap,
    body: &B,
) -> Result<R, AiError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    debug!(backend, url, "AI request");

    let response = http.post(url).headers(headers).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AiError::Api {
            status: status.as_u16(),
            body: truncate_chars(&body, ERROR_BODY_CHARS).to_string(),
        });
    }

    let raw = response.text().await?;
    serde_json::from_str(&raw).map_err(|e| AiError::Parse(format!("{backend}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_set() {
        let headers = bearer_headers("sk-test").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn newline_in_key_is_a_config_error() {
        let err = bearer_headers("bad\nkey").unwrap_err();
        assert!(matches!(err, AiError::Config(_)));
    }
}

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// GET-only HTTP seam. Implementations return the body text of a 2xx
/// response and a tagged [`FetchError`] for everything else.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(classify)?;

        if !response.status().is_success() {
            return Err(status_error(&response));
        }

        response.text().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn status_error(response: &Response) -> FetchError {
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    FetchError::HttpStatus {
        status: response.status().as_u16(),
        retry_after,
    }
}

/// Only the delta-seconds form is honoured; HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

use crate::models::ContestRating;
use common::HttpFetcher;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

pub const RATE_LIMIT_MESSAGE: &str =
    "LeetCode contest API rate limit reached. Please try again in 1 hour.";
pub const FAILURE_MESSAGE: &str = "Failed to fetch contest rating.";

#[derive(Debug, Clone, PartialEq)]
pub enum ContestStatus {
    Rated(ContestRating),
    NoRatedContests,
    RateLimited,
    Failed(String),
}

impl ContestStatus {
    pub fn rating(&self) -> Option<&ContestRating> {
        match self {
            ContestStatus::Rated(rating) => Some(rating),
            _ => None,
        }
    }

    /// User-facing explanation when no rating can be shown because of an error.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ContestStatus::RateLimited => Some(RATE_LIMIT_MESSAGE),
            ContestStatus::Failed(detail) => Some(detail),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContestRecord {
    attended: bool,
    rating: f64,
    ranking: i64,
    total_participants: Option<u64>,
    top_percentage: Option<f64>,
}

impl Default for ContestRecord {
    fn default() -> Self {
        Self {
            attended: false,
            rating: 0.0,
            ranking: 0,
            total_participants: None,
            top_percentage: None,
        }
    }
}

/// Single attempt, no cache. Never returns an error; every failure is folded
/// into the returned status.
pub async fn fetch_contest_rating(
    fetcher: &dyn HttpFetcher,
    url: &str,
    timeout: Duration,
) -> ContestStatus {
    let body = match tokio::time::timeout(timeout, fetcher.get(url)).await {
        Ok(Ok(body)) => body,
        Ok(Err(e)) if e.is_rate_limited() => {
            warn!("Contest rating endpoint rate limited: {}", e);
            return ContestStatus::RateLimited;
        }
        Ok(Err(e)) => {
            warn!("Contest rating fetch failed: {}", e);
            return ContestStatus::Failed(FAILURE_MESSAGE.to_string());
        }
        Err(_) => {
            warn!("Contest rating fetch timed out after {}ms", timeout.as_millis());
            return ContestStatus::Failed(FAILURE_MESSAGE.to_string());
        }
    };

    let status = parse_contest_body(&body);
    info!("Contest rating resolved: {:?}", status);
    status
}

pub fn parse_contest_body(body: &str) -> ContestStatus {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if mentions_rate_limit(body) => return ContestStatus::RateLimited,
        Err(e) => {
            warn!("Unreadable contest rating body: {}", e);
            return ContestStatus::Failed(FAILURE_MESSAGE.to_string());
        }
    };

    match &value {
        Value::String(text) if mentions_rate_limit(text) => ContestStatus::RateLimited,
        Value::Array(records) => latest_rated(records),
        Value::Object(map) => match map.get("userContestRankingHistory") {
            Some(Value::Array(records)) => latest_rated(records),
            _ => ContestStatus::NoRatedContests,
        },
        _ => ContestStatus::NoRatedContests,
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    text.to_lowercase().contains("too many request")
}

/// Records are oldest-first; the newest attended contest with a rating wins.
fn latest_rated(records: &[Value]) -> ContestStatus {
    records
        .iter()
        .rev()
        .filter_map(|raw| ContestRecord::deserialize(raw).ok())
        .find(|c| c.attended && c.rating != 0.0 && c.ranking > 0)
        .map(|c| {
            ContestStatus::Rated(ContestRating {
                rating: c.rating,
                global_ranking: c.ranking as u64,
                total_participants: c.total_participants.unwrap_or(0),
                top_percentage: c.top_percentage.unwrap_or(0.0),
            })
        })
        .unwrap_or(ContestStatus::NoRatedContests)
}

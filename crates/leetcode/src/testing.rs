use async_trait::async_trait;
use common::{FetchError, HttpFetcher};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

type Scripted = Result<String, FetchError>;

/// In-memory fetcher that replays queued responses per URL, then falls back
/// to a per-URL standing response, then to a network error.
#[derive(Default)]
pub struct ScriptedFetcher {
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    standing: Mutex<HashMap<String, Scripted>>,
    latency: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, response: Scripted) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn always(&self, url: &str, response: Scripted) -> &Self {
        self.standing
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    pub fn latency(&self, url: &str, delay: Duration) -> &Self {
        self.latency.lock().unwrap().insert(url.to_string(), delay);
        self
    }

    pub fn calls_to(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn call_order(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }
}

#[async_trait]
impl HttpFetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let delay = self.latency.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        if let Some(response) = queued {
            return response;
        }

        self.standing
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network(format!("no scripted response for {url}"))))
    }
}

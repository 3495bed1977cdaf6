use crate::activity::day_index;
use crate::api::Endpoints;
use crate::badges::parse_live_badges;
use crate::cache::{Cache, CacheEntry, BADGES_CACHE_KEY, STATS_CACHE_KEY};
use crate::contest::{fetch_contest_rating, ContestStatus};
use crate::models::{BadgeSet, ProfileStats, StatsPayload, StatsSnapshot};
use crate::retry::{fetch_with_retry, RetryPolicy, REQUEST_TIMEOUT};
use common::{HttpFetcher, WidgetError, WidgetResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Pause between the stats call and the badges call; the badges API rate
/// limits back-to-back requests.
pub const BADGES_PACING_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Cached,
    Fallback,
}

/// What the widget renders: a snapshot, where its stats came from, and the
/// detail of any failure encountered while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub snapshot: StatsSnapshot,
    pub source: DataSource,
    pub error: Option<String>,
}

impl WidgetState {
    pub fn is_using_cached_data(&self) -> bool {
        self.source == DataSource::Cached
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

pub struct StatsController {
    fetcher: Arc<dyn HttpFetcher>,
    cache: Cache,
    endpoints: Endpoints,
    request_timeout: Duration,
    state: RwLock<Option<WidgetState>>,
    contest: RwLock<Option<ContestStatus>>,
    refresh_gate: Mutex<()>,
    completed_refreshes: AtomicU64,
}

impl StatsController {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, cache: Cache, endpoints: Endpoints) -> Self {
        Self {
            fetcher,
            cache,
            endpoints,
            request_timeout: REQUEST_TIMEOUT,
            state: RwLock::new(None),
            contest: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            completed_refreshes: AtomicU64::new(0),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn current(&self) -> Option<WidgetState> {
        self.state.read().await.clone()
    }

    pub async fn contest(&self) -> Option<ContestStatus> {
        self.contest.read().await.clone()
    }

    /// Publish a fresh cached snapshot, if any, before any network work.
    /// The badges key is only consulted by `refresh`, when a badge group
    /// has to be resolved without live data.
    pub async fn load_initial(&self) -> Option<WidgetState> {
        let entry: CacheEntry<StatsSnapshot> = self.cache.get(STATS_CACHE_KEY)?;
        info!("Using cached data from {}", entry.last_updated);

        let state = WidgetState {
            snapshot: entry.data,
            source: DataSource::Cached,
            error: None,
        };
        self.publish(state.clone()).await;
        Some(state)
    }

    /// Fetch, resolve and publish a snapshot. A call that arrives while
    /// another refresh is running waits for it and returns its result.
    pub async fn refresh(&self) -> WidgetState {
        let seen = self.completed_refreshes.load(Ordering::SeqCst);
        let _guard = self.refresh_gate.lock().await;

        if self.completed_refreshes.load(Ordering::SeqCst) != seen {
            if let Some(state) = self.current().await {
                debug!("Refresh coalesced with one that just completed");
                return state;
            }
        }

        self.refresh_locked().await
    }

    /// Drop both cache keys and refresh from scratch. Never coalesced.
    pub async fn manual_refresh(&self) -> WidgetState {
        let _guard = self.refresh_gate.lock().await;
        info!("Manual refresh requested, clearing cache");
        self.cache.clear(STATS_CACHE_KEY);
        self.cache.clear(BADGES_CACHE_KEY);
        self.refresh_locked().await
    }

    pub async fn refresh_contest(&self) -> ContestStatus {
        let status = fetch_contest_rating(
            self.fetcher.as_ref(),
            &self.endpoints.contest,
            self.request_timeout,
        )
        .await;
        *self.contest.write().await = Some(status.clone());
        status
    }

    async fn refresh_locked(&self) -> WidgetState {
        let cached: Option<CacheEntry<StatsSnapshot>> = self
            .cache
            .get(STATS_CACHE_KEY)
            .or_else(|| self.cache.get_even_if_expired(STATS_CACHE_KEY));

        let state = match self.resolve(cached.as_ref()).await {
            Ok(state) => state,
            Err(e) => {
                error!("Error refreshing stats: {}", e);
                match cached {
                    Some(entry) => WidgetState {
                        snapshot: entry.data,
                        source: DataSource::Cached,
                        error: Some(e.to_string()),
                    },
                    None => WidgetState {
                        snapshot: self.fallback_snapshot(),
                        source: DataSource::Fallback,
                        error: Some(e.to_string()),
                    },
                }
            }
        };

        self.publish(state.clone()).await;
        self.completed_refreshes.fetch_add(1, Ordering::SeqCst);
        state
    }

    async fn resolve(
        &self,
        cached: Option<&CacheEntry<StatsSnapshot>>,
    ) -> WidgetResult<WidgetState> {
        let mut failures = Vec::new();

        info!("Fetching stats data...");
        let live_stats = match self.fetch_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Stats API error: {}", e);
                failures.push(format!("stats unavailable ({})", e));
                None
            }
        };

        tokio::time::sleep(BADGES_PACING_DELAY).await;

        info!("Fetching badges data...");
        let live_badges = match self.fetch_badges().await {
            Ok(set) => Some(set),
            Err(e) => {
                warn!("Badges API error: {}", e);
                failures.push(format!("badges unavailable ({})", e));
                None
            }
        };

        let error = (!failures.is_empty()).then(|| failures.join("; "));

        if live_stats.is_none() && live_badges.is_none() {
            return Ok(match cached {
                Some(entry) => {
                    info!("No live data, keeping snapshot cached at {}", entry.last_updated);
                    WidgetState {
                        snapshot: entry.data.clone(),
                        source: DataSource::Cached,
                        error,
                    }
                }
                None => {
                    info!("No live or cached data, using fallback data");
                    WidgetState {
                        snapshot: self.fallback_snapshot(),
                        source: DataSource::Fallback,
                        error,
                    }
                }
            });
        }

        let (stats, source) = match (live_stats, cached) {
            (Some(stats), _) => (stats, DataSource::Live),
            (None, Some(entry)) => (entry.data.stats.clone(), DataSource::Cached),
            (None, None) => (ProfileStats::hardcoded(), DataSource::Fallback),
        };

        let badges = match live_badges {
            Some(set) => {
                self.cache.set(BADGES_CACHE_KEY, &set)?;
                debug!("Cached {} badges", set.badges.len());
                set
            }
            None => self.cached_badges().unwrap_or_else(|| {
                info!("Using hardcoded badges");
                BadgeSet::hardcoded()
            }),
        };

        let snapshot = StatsSnapshot::new(stats, badges, self.cache.now_millis());
        self.cache.set(STATS_CACHE_KEY, &snapshot)?;

        Ok(WidgetState {
            snapshot,
            source,
            error,
        })
    }

    async fn fetch_stats(&self) -> WidgetResult<ProfileStats> {
        let policy = RetryPolicy::stats().with_timeout(self.request_timeout);
        let body = fetch_with_retry(self.fetcher.as_ref(), &self.endpoints.stats, &policy).await?;

        let payload: StatsPayload = serde_json::from_str(&body)?;
        if payload.is_error() {
            return Err(WidgetError::RejectedPayload(
                payload
                    .message
                    .unwrap_or_else(|| "stats API reported an error".to_string()),
            ));
        }

        Ok(payload.into_profile_stats(day_index(self.cache.now_millis())))
    }

    async fn fetch_badges(&self) -> WidgetResult<BadgeSet> {
        let direct = &self.endpoints.badges_direct;

        let Some(proxy) = self.endpoints.badges_proxy.as_deref() else {
            return self.fetch_badge_set(direct, RetryPolicy::badges_proxy()).await;
        };

        match self.fetch_badge_set(proxy, RetryPolicy::badges_proxy()).await {
            Ok(set) => Ok(set),
            Err(e) => {
                warn!("Proxy badges API failed: {}, trying fallback...", e);
                self.fetch_badge_set(direct, RetryPolicy::badges_fallback()).await
            }
        }
    }

    async fn fetch_badge_set(&self, url: &str, policy: RetryPolicy) -> WidgetResult<BadgeSet> {
        let policy = policy.with_timeout(self.request_timeout);
        let body = fetch_with_retry(self.fetcher.as_ref(), url, &policy).await?;
        let raw: serde_json::Value = serde_json::from_str(&body)?;
        parse_live_badges(&raw)
            .ok_or_else(|| WidgetError::RejectedPayload(format!("no badges in response from {}", url)))
    }

    /// Hardcoded stats paired with whatever badge set the cache still holds.
    fn fallback_snapshot(&self) -> StatsSnapshot {
        let badges = self.cached_badges().unwrap_or_else(BadgeSet::hardcoded);
        StatsSnapshot::new(ProfileStats::hardcoded(), badges, self.cache.now_millis())
    }

    fn cached_badges(&self) -> Option<BadgeSet> {
        let entry: CacheEntry<BadgeSet> = self
            .cache
            .get(BADGES_CACHE_KEY)
            .or_else(|| self.cache.get_even_if_expired(BADGES_CACHE_KEY))?;
        if entry.data.badges.is_empty() {
            return None;
        }
        info!("Using cached badges from {}", entry.last_updated);
        Some(entry.data)
    }

    async fn publish(&self, state: WidgetState) {
        debug!(
            "Publishing snapshot ({:?}, {} badges, error: {})",
            state.source,
            state.snapshot.badges.badges.len(),
            state.error.is_some()
        );
        *self.state.write().await = Some(state);
    }
}

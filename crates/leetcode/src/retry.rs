use common::{FetchError, HttpFetcher};
use rand::Rng;
use std::ops::Range;
use std::time::Duration;
use tracing::{info, warn};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
pub const JITTER_RANGE: Range<f64> = 0.8..1.2;
const BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn stats() -> Self {
        Self::new(5, Duration::from_secs(2))
    }

    pub fn badges_proxy() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    pub fn badges_fallback() -> Self {
        Self::new(2, Duration::from_secs(1))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Delay schedule between attempts. The base delay grows by 1.5x after each
/// computed delay; jitter scales only the returned value.
#[derive(Debug)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            current: policy.initial_delay,
            max: policy.max_delay,
        }
    }

    pub fn next_delay(&mut self, failure: &FetchError, jitter: f64) -> Duration {
        if let Some(retry_after) = failure.retry_after() {
            return retry_after;
        }
        let delay = self.current.mul_f64(jitter).min(self.max);
        self.current = self.current.mul_f64(BACKOFF_FACTOR);
        delay
    }
}

/// GET `url`, retrying failed attempts per `policy`. The last attempt's
/// error is returned once `max_attempts` is exhausted.
pub async fn fetch_with_retry(
    fetcher: &dyn HttpFetcher,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    fetch_with_retry_jittered(fetcher, url, policy, || {
        rand::thread_rng().gen_range(JITTER_RANGE)
    })
    .await
}

pub(crate) async fn fetch_with_retry_jittered<J>(
    fetcher: &dyn HttpFetcher,
    url: &str,
    policy: &RetryPolicy,
    mut jitter: J,
) -> Result<String, FetchError>
where
    J: FnMut() -> f64 + Send,
{
    if policy.max_attempts == 0 {
        return Err(FetchError::Network(format!("no attempts allowed for {url}")));
    }

    let mut backoff = Backoff::new(policy);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.timeout, fetcher.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        let failure = match result {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts {
            warn!(
                "All {} attempts for {} failed, last error: {}",
                policy.max_attempts, url, failure
            );
            return Err(failure);
        }

        let delay = backoff.next_delay(&failure, jitter());
        info!(
            "Attempt {} for {} failed ({}), retrying in {}ms...",
            attempt,
            url,
            failure,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;

    const URL: &str = "https://stats.test/user";

    fn gaps(calls: &[tokio::time::Instant]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    fn assert_close(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        let diff = if actual > expected { actual - expected } else { expected - actual };
        assert!(
            diff < Duration::from_millis(5),
            "expected ~{}ms, got {}ms",
            expected_ms,
            actual.as_millis()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_not_retried() {
        let fetcher = ScriptedFetcher::new();
        fetcher.always(URL, Ok("{}".to_string()));

        let body = fetch_with_retry(&fetcher, URL, &RetryPolicy::stats()).await.unwrap();
        assert_eq!(body, "{}");
        assert_eq!(fetcher.calls_to(URL).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts_with_last_error() {
        let fetcher = ScriptedFetcher::new();
        fetcher
            .push(URL, Err(FetchError::Timeout))
            .push(URL, Err(FetchError::Timeout))
            .push(URL, Err(FetchError::HttpStatus { status: 502, retry_after: None }));

        let policy = RetryPolicy::badges_proxy();
        let err = fetch_with_retry(&fetcher, URL, &policy).await.unwrap_err();

        assert_eq!(err, FetchError::HttpStatus { status: 502, retry_after: None });
        assert_eq!(fetcher.calls_to(URL).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_later_attempt() {
        let fetcher = ScriptedFetcher::new();
        fetcher
            .push(URL, Err(FetchError::Network("reset".into())))
            .push(URL, Err(FetchError::Network("reset".into())))
            .push(URL, Ok("ok".to_string()));

        let body = fetch_with_retry(&fetcher, URL, &RetryPolicy::stats()).await.unwrap();
        assert_eq!(body, "ok");
        assert_eq!(fetcher.calls_to(URL).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honours_retry_after() {
        let fetcher = ScriptedFetcher::new();
        fetcher
            .push(
                URL,
                Err(FetchError::HttpStatus {
                    status: 429,
                    retry_after: Some(Duration::from_secs(5)),
                }),
            )
            .push(URL, Ok("ok".to_string()));

        fetch_with_retry(&fetcher, URL, &RetryPolicy::badges_proxy()).await.unwrap();

        let calls = fetcher.calls_to(URL);
        assert_eq!(calls.len(), 2);
        assert!(gaps(&calls)[0] >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_schedule_without_jitter() {
        let fetcher = ScriptedFetcher::new();
        fetcher.always(URL, Err(FetchError::Timeout));

        let result =
            fetch_with_retry_jittered(&fetcher, URL, &RetryPolicy::stats(), || 1.0).await;
        assert!(result.is_err());

        let calls = fetcher.calls_to(URL);
        assert_eq!(calls.len(), 5);
        let gaps = gaps(&calls);
        for (gap, expected) in gaps.iter().zip([2000, 3000, 4500, 6750]) {
            assert_close(*gap, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_attempt_timeout() {
        let fetcher = ScriptedFetcher::new();
        fetcher
            .latency(URL, Duration::from_secs(60))
            .always(URL, Ok("too late".to_string()));

        let err = fetch_with_retry(&fetcher, URL, &RetryPolicy::badges_fallback())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout);
        assert_eq!(fetcher.calls_to(URL).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_makes_no_calls() {
        let fetcher = ScriptedFetcher::new();
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert!(fetch_with_retry(&fetcher, URL, &policy).await.is_err());
        assert!(fetcher.calls_to(URL).is_empty());
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(20),
            max_delay: Duration::from_secs(30),
            timeout: REQUEST_TIMEOUT,
        };
        let mut backoff = Backoff::new(&policy);
        let err = FetchError::Timeout;
        assert_eq!(backoff.next_delay(&err, 1.0), Duration::from_secs(20));
        assert_eq!(backoff.next_delay(&err, 1.0), Duration::from_secs(30));
        assert_eq!(backoff.next_delay(&err, 1.0), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_scales_delay_but_not_growth() {
        let mut backoff = Backoff::new(&RetryPolicy::stats());
        let err = FetchError::Timeout;
        assert_close(backoff.next_delay(&err, 0.8), 1600);
        assert_close(backoff.next_delay(&err, 1.2), 3600);
        assert_close(backoff.next_delay(&err, 1.0), 4500);
    }

    #[test]
    fn test_retry_after_does_not_advance_backoff() {
        let mut backoff = Backoff::new(&RetryPolicy::stats());
        let limited = FetchError::HttpStatus {
            status: 429,
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(backoff.next_delay(&limited, 1.0), Duration::from_secs(5));
        assert_eq!(
            backoff.next_delay(&FetchError::Timeout, 1.0),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_429_without_retry_after_uses_backoff() {
        let mut backoff = Backoff::new(&RetryPolicy::stats());
        let limited = FetchError::HttpStatus { status: 429, retry_after: None };
        assert_eq!(backoff.next_delay(&limited, 1.0), Duration::from_secs(2));
    }
}

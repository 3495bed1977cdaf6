use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

pub const DEFAULT_STATS_API_BASE: &str = "https://leetcode-stats-api.herokuapp.com";
pub const DEFAULT_LEETCODE_API_BASE: &str = "https://alfa-leetcode-api.onrender.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Portfolio-Bot/1.0)";

#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub stats_api_base: String,
    pub leetcode_api_base: String,
    pub badges_proxy_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            stats_api_base: DEFAULT_STATS_API_BASE.to_string(),
            leetcode_api_base: DEFAULT_LEETCODE_API_BASE.to_string(),
            badges_proxy_url: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: Option<PathBuf>,
    pub ttl: Duration,
    pub disabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: dirs::cache_dir().map(|p| p.join("portfolio-stats")),
            ttl: Duration::from_secs(60 * 60),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(8),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub endpoints: EndpointConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let username = env::var("LEETCODE_USERNAME")
            .context("LEETCODE_USERNAME must be set")?;
        if username.trim().is_empty() {
            anyhow::bail!("LEETCODE_USERNAME must not be empty");
        }

        let defaults = EndpointConfig::default();
        let endpoints = EndpointConfig {
            stats_api_base: env::var("STATS_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.stats_api_base),
            leetcode_api_base: env::var("LEETCODE_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.leetcode_api_base),
            badges_proxy_url: env::var("BADGES_PROXY_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            dir: env::var("STATS_CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .or(cache_defaults.dir),
            ttl: env::var("STATS_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(cache_defaults.ttl),
            disabled: env::var("STATS_CACHE_DISABLED")
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
        };

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            request_timeout: env::var("STATS_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(http_defaults.request_timeout),
            user_agent: env::var("STATS_USER_AGENT").unwrap_or(http_defaults.user_agent),
        };

        Ok(Config {
            username: username.trim().to_string(),
            endpoints,
            cache,
            http,
        })
    }

    pub fn require_cache_dir(&self) -> Result<&PathBuf> {
        self.cache
            .dir
            .as_ref()
            .context("STATS_CACHE_DIR must be set when no platform cache directory exists")
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_defaults_match_widget_contract() {
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(3600));
        assert_eq!(HttpConfig::default().request_timeout, Duration::from_secs(8));
        assert!(EndpointConfig::default().badges_proxy_url.is_none());
    }

    #[test]
    fn test_require_cache_dir_without_dir_fails() {
        let config = Config {
            username: "someone".to_string(),
            endpoints: EndpointConfig::default(),
            cache: CacheConfig {
                dir: None,
                ..CacheConfig::default()
            },
            http: HttpConfig::default(),
        };
        assert!(config.require_cache_dir().is_err());
    }
}

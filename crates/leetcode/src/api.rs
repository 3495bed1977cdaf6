use common::config::EndpointConfig;

/// Resolved URLs for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub stats: String,
    pub badges_proxy: Option<String>,
    pub badges_direct: String,
    pub contest: String,
}

impl Endpoints {
    pub fn for_user(config: &EndpointConfig, username: &str) -> Self {
        let stats_base = config.stats_api_base.trim_end_matches('/');
        let api_base = config.leetcode_api_base.trim_end_matches('/');
        Self {
            stats: format!("{}/{}", stats_base, username),
            badges_proxy: config.badges_proxy_url.clone(),
            badges_direct: format!("{}/{}/badges", api_base, username),
            contest: format!("{}/userContestRankingInfo/{}", api_base, username),
        }
    }
}

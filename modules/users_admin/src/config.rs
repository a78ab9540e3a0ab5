use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the users_admin module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsersAdminConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Age after which a fetched collection is considered stale.
    #[serde(default = "default_freshness_window", with = "humantime_serde")]
    pub freshness_window: Duration,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,
    /// Extra attempts for a failed list fetch. Mutations are never retried.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
}

impl Default for UsersAdminConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            freshness_window: default_freshness_window(),
            page_size: default_page_size(),
            page_size_options: default_page_size_options(),
            fetch_retries: default_fetch_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://jsonplaceholder.typicode.com".to_string()
}

fn default_freshness_window() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_page_size() -> usize {
    5
}

fn default_page_size_options() -> Vec<usize> {
    vec![5, 10, 25]
}

fn default_fetch_retries() -> u32 {
    1
}

//! Outbound notification configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default_true;

/// Configuration for the task-created notification call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Whether to send notifications at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Endpoint receiving `GET ?task_id=..&task_title=..`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// `User-Agent` header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_endpoint() -> String {
    "https://httpbin.org/get".to_string()
}

const fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "todo-app/1.0".to_string()
}

impl NotifierConfig {
    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

//! Database (SQLite) configuration.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use super::default_true;

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g. "sqlite:tasks.db" or "sqlite::memory:")
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of open connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept warm; idle connections above this are reaped
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds an idle connection may live before being closed
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Attach `db.statement.formatted` (placeholders substituted) to query spans
    #[serde(default = "default_true")]
    pub format_statements: bool,

    /// Append `/*traceparent='..'*/` to executed statements (sqlcommenter)
    ///
    /// Every statement text becomes unique per request, so the prepared
    /// statement cache stops being reused while this is on.
    #[serde(default)]
    pub sql_commenter: bool,
}

fn default_url() -> String {
    "sqlite:tasks.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_idle_timeout() -> u64 {
    300
}

impl DatabaseConfig {
    /// In-memory database for tests
    ///
    /// A single connection, since every SQLite memory connection is its own database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }

    /// File-based database configuration
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("sqlite:{}", path.as_ref().display()),
            ..Default::default()
        }
    }

    /// Whether the URL points at an in-memory database
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }

    /// Idle connection lifetime
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            idle_timeout_secs: default_idle_timeout(),
            format_statements: true,
            sql_commenter: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_uses_single_connection() {
        let config = DatabaseConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(config.format_statements);
        assert!(!config.sql_commenter);
    }

    #[test]
    fn file_builds_sqlite_url() {
        let config = DatabaseConfig::file("/tmp/tasks-test.db");
        assert_eq!(config.url, "sqlite:/tmp/tasks-test.db");
        assert!(!config.is_in_memory());
    }
}

//! Persistence module
//!
//! SQLite task storage with per-query tracing.

pub mod connection;
pub mod error;
pub mod pool_metrics;
pub mod statement_format;
pub mod task_store;

pub use connection::{AsyncDatabase, DatabaseError};
pub use error::map_sqlx_error;
pub use pool_metrics::{POOL_USAGE, PoolUsage, register_pool_usage};
pub use statement_format::{SqlValue, format_statement};
pub use task_store::SqliteTaskStore;

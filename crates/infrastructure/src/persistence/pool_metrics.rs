//! Connection pool usage gauge

use opentelemetry::{
    KeyValue,
    metrics::{Meter, ObservableUpDownCounter},
};
use sqlx::SqlitePool;

/// Connections in the pool, split by `state = used | idle`
pub const POOL_USAGE: &str = "db.client.connections.usage";

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUsage {
    pub used: u32,
    pub idle: u32,
}

impl PoolUsage {
    /// Read occupancy from a live pool
    pub fn of(pool: &SqlitePool) -> Self {
        let size = pool.size();
        let idle = u32::try_from(pool.num_idle()).unwrap_or(u32::MAX).min(size);
        Self {
            used: size - idle,
            idle,
        }
    }
}

/// Register the usage gauge; observations are taken from `pool` at every collection
pub fn register_pool_usage(meter: &Meter, pool: SqlitePool) -> ObservableUpDownCounter<i64> {
    meter
        .i64_observable_up_down_counter(POOL_USAGE)
        .with_description("Connections in the task store pool")
        .with_unit("{connection}")
        .with_callback(move |observer| {
            let usage = PoolUsage::of(&pool);
            for (state, count) in [("used", usage.used), ("idle", usage.idle)] {
                observer.observe(
                    i64::from(count),
                    &[
                        KeyValue::new("db.system", "sqlite"),
                        KeyValue::new("state", state),
                    ],
                );
            }
        })
        .build()
}

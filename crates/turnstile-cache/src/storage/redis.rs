use std::sync::Arc;
use std::time::Duration;

use turnstile_pool::{BackendPool, PoolError};

/// Cache storage over a random pool member per operation
///
/// No pinning: any member may hold or receive any entry, and a member
/// that never saw a given key simply reports a miss.
pub struct RedisCache {
    pool: Arc<BackendPool>,
}

impl RedisCache {
    pub const fn new(pool: Arc<BackendPool>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, PoolError> {
        use redis::AsyncCommands;

        let mut conn = self.pool.select_random().connection().await?;
        conn.get(key)
            .await
            .map_err(|e| PoolError::Command(format!("GET failed: {e}")))
    }

    pub async fn put(&self, key: &str, data: &str, ttl: Duration) -> Result<(), PoolError> {
        use redis::AsyncCommands;

        let mut conn = self.pool.select_random().connection().await?;
        let _: () = conn
            .set_ex(key, data, ttl.as_secs())
            .await
            .map_err(|e| PoolError::Command(format!("SET failed: {e}")))?;
        Ok(())
    }
}

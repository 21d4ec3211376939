use std::sync::Arc;
use std::time::Duration;

use turnstile_core::now_secs;
use turnstile_pool::BackendPool;

use super::{CounterSnapshot, TrackResult};
use crate::error::QuotaError;

/// Ledger storage on a sticky pool member
///
/// Uses `INCR` plus `EXPIRE ... NX`: the increment is atomic and the TTL
/// attaches only when the key has none, so concurrent requests from the
/// same identity can neither over-admit past the limit nor re-anchor the
/// window.
pub struct RedisLedger {
    pool: Arc<BackendPool>,
    sticky: usize,
}

impl RedisLedger {
    pub const fn new(pool: Arc<BackendPool>, sticky: usize) -> Self {
        Self { pool, sticky }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QuotaError> {
        Ok(self.pool.select_by_index(self.sticky).connection().await?)
    }

    pub async fn snapshot(&self, key: &str) -> Result<Option<CounterSnapshot>, QuotaError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;

        let count: Option<u32> = conn
            .get(key)
            .await
            .map_err(|e| QuotaError::Backend(format!("GET failed: {e}")))?;

        let Some(count) = count else {
            return Ok(None);
        };

        let ttl = remaining_ttl(&mut conn, key).await?;
        Ok(ttl.map(|secs| CounterSnapshot {
            count,
            expires_at: now_secs() + secs,
        }))
    }

    pub async fn track(&self, key: &str, limit: u32, window: Duration) -> Result<TrackResult, QuotaError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;

        // Fast path: already at the limit, deny without incrementing
        let current: Option<u32> = conn
            .get(key)
            .await
            .map_err(|e| QuotaError::Backend(format!("GET failed: {e}")))?;

        if let Some(current) = current
            && current >= limit
        {
            return Ok(TrackResult::Denied {
                expires_at: window_end(&mut conn, key, window).await?,
            });
        }

        let count: u32 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| QuotaError::Backend(format!("INCR failed: {e}")))?;

        // Anchor the window to first use; NX leaves an existing TTL alone
        let window_secs = i64::try_from(window.as_secs().max(1)).unwrap_or(i64::MAX);
        let _: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| QuotaError::Backend(format!("EXPIRE failed: {e}")))?;

        let expires_at = window_end(&mut conn, key, window).await?;

        // Lost the race between GET and INCR: the overshoot is stored but
        // this request is still denied
        if count > limit {
            return Ok(TrackResult::Denied { expires_at });
        }

        Ok(TrackResult::Admitted { count, expires_at })
    }

    pub async fn remove(&self, key: &str) -> Result<(), QuotaError> {
        use redis::AsyncCommands;

        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| QuotaError::Backend(format!("DEL failed: {e}")))?;
        Ok(())
    }
}

async fn remaining_ttl(
    conn: &mut redis::aio::MultiplexedConnection,
    key: &str,
) -> Result<Option<u64>, QuotaError> {
    use redis::AsyncCommands;

    let ttl: i64 = conn
        .ttl(key)
        .await
        .map_err(|e| QuotaError::Backend(format!("TTL failed: {e}")))?;

    // -2: key vanished; -1: no TTL attached (should not happen)
    Ok(u64::try_from(ttl).ok())
}

async fn window_end(
    conn: &mut redis::aio::MultiplexedConnection,
    key: &str,
    window: Duration,
) -> Result<u64, QuotaError> {
    let ttl = remaining_ttl(conn, key).await?;
    Ok(now_secs() + ttl.unwrap_or(window.as_secs()))
}

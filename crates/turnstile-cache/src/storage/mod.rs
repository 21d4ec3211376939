//! Cache storage backends

pub mod memory;
pub mod redis;

use std::time::Duration;

use turnstile_pool::PoolError;

/// Storage backend dispatch
pub enum CacheStorage {
    Memory(memory::MemoryCache),
    Redis(redis::RedisCache),
}

impl CacheStorage {
    pub async fn get(&self, key: &str) -> Result<Option<String>, PoolError> {
        match self {
            Self::Memory(m) => Ok(m.get(key)),
            Self::Redis(r) => r.get(key).await,
        }
    }

    pub async fn put(&self, key: &str, data: &str, ttl: Duration) -> Result<(), PoolError> {
        match self {
            Self::Memory(m) => {
                m.put(key, data, ttl);
                Ok(())
            }
            Self::Redis(r) => r.put(key, data, ttl).await,
        }
    }
}

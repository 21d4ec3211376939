//! Content-addressed cache of prior model outputs
//!
//! Keys are a SHA-256 hash of the normalized query text plus the model
//! identifier that produced the answer, so paraphrase-insensitive repeats
//! of the same literal question hit while answers from different models
//! stay distinct. Retention is a fixed TTL applied at write time and
//! never refreshed on read.
//!
//! Backend unavailability degrades to a miss on read and a dropped write
//! on store; it is never surfaced to the request.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod storage;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use turnstile_config::ResponseCacheConfig;
use turnstile_core::now_secs;
use turnstile_pool::BackendPool;

use storage::CacheStorage;

/// Cache configuration errors (construction only; operations are soft)
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache config: {0}")]
    Config(String),
}

/// One cached model answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub text: String,
    /// Model that produced the answer
    pub model_id: String,
    /// Unix seconds at write time
    pub created_at: u64,
}

/// Response cache with pluggable storage
pub struct ResponseCache {
    storage: CacheStorage,
    ttl: Duration,
    min_length: usize,
    error_markers: Vec<String>,
    key_prefix: String,
}

impl ResponseCache {
    /// Cache over the backend pool (random member per operation)
    pub fn redis(pool: Arc<BackendPool>, config: &ResponseCacheConfig) -> Result<Self, CacheError> {
        Self::build(CacheStorage::Redis(storage::redis::RedisCache::new(pool)), config)
    }

    /// In-process cache for tests and single-instance deployments
    pub fn memory(config: &ResponseCacheConfig) -> Result<Self, CacheError> {
        Self::build(CacheStorage::Memory(storage::memory::MemoryCache::new()), config)
    }

    fn build(storage: CacheStorage, config: &ResponseCacheConfig) -> Result<Self, CacheError> {
        let ttl = duration_str::parse(&config.ttl)
            .map_err(|e| CacheError::Config(format!("invalid ttl '{}': {e}", config.ttl)))?;

        Ok(Self {
            storage,
            ttl,
            min_length: config.min_length,
            error_markers: config.error_markers.clone(),
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Look up a cached answer for a query/model pair
    pub async fn get(&self, query: &str, model_id: &str) -> Option<CachedAnswer> {
        let key = self.cache_key(query, model_id);

        let data = match self.storage.get(&key).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let Some(data) = data else {
            tracing::debug!(cache_key = %key, "cache miss");
            return None;
        };

        match serde_json::from_str::<CachedAnswer>(&data) {
            Ok(answer) => {
                tracing::debug!(cache_key = %key, model_id, "cache hit");
                Some(answer)
            }
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "cached entry failed to decode, treating as miss");
                None
            }
        }
    }

    /// Store an answer, subject to the write policy
    ///
    /// Trivially short answers and answers carrying an error marker are
    /// refused so failure output can never poison the cache.
    pub async fn put(&self, query: &str, model_id: &str, text: &str) {
        if !self.is_storable(text) {
            tracing::debug!(model_id, length = text.len(), "answer refused by cache write policy");
            return;
        }

        let key = self.cache_key(query, model_id);
        let entry = CachedAnswer {
            text: text.to_owned(),
            model_id: model_id.to_owned(),
            created_at: now_secs(),
        };

        let data = match serde_json::to_string(&entry) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "answer failed to serialize, not cached");
                return;
            }
        };

        match self.storage.put(&key, &data, self.ttl).await {
            Ok(()) => tracing::debug!(cache_key = %key, ttl_secs = self.ttl.as_secs(), "cached answer"),
            Err(e) => tracing::warn!(error = %e, "cache write failed, dropping"),
        }
    }

    /// Whether an answer passes the write policy
    pub fn is_storable(&self, text: &str) -> bool {
        if text.len() < self.min_length {
            return false;
        }
        !self.error_markers.iter().any(|marker| text.contains(marker))
    }

    fn cache_key(&self, query: &str, model_id: &str) -> String {
        format!("{}:{}", self.key_prefix, answer_digest(query, model_id))
    }
}

/// SHA-256 digest of the normalized query plus producing model id
pub fn answer_digest(query: &str, model_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update([0u8]);
    hasher.update(model_id.as_bytes());
    let hash = hasher.finalize();
    format!("{hash:x}")
}

/// Canonical query form: surrounding whitespace stripped, case folded
fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

//! Cache backend pool
//!
//! A constructed-once set of interchangeable redis-compatible backends.
//! Selection is a pure read plus a random draw, safe for concurrent use;
//! no state moves between backends when one becomes unreachable, so
//! partial failure degrades hit rate, never correctness.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use std::time::Duration;

use rand::prelude::IndexedRandom;
use thiserror::Error;
use turnstile_config::CachePoolConfig;

/// Backend the pool falls back to when none are configured, keeping the
/// system operable in a degraded single-backend mode
pub const DEFAULT_BACKEND: &str = "redis://127.0.0.1:6379/";

/// Pool errors
///
/// `Unreachable` and `Command` must be degraded to a cache miss by
/// callers; only `InvalidUrl` (construction) and `Config` are fatal.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A configured backend URL failed to parse
    #[error("invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    /// Invalid pool configuration
    #[error("pool config: {0}")]
    Config(String),
    /// Could not open a connection within the configured timeout
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// A backend command failed after connecting
    #[error("backend command failed: {0}")]
    Command(String),
}

/// One member of the backend pool
pub struct Backend {
    url: String,
    client: redis::Client,
    connect_timeout: Duration,
}

impl Backend {
    /// Backend endpoint address
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open a multiplexed connection, bounded by the configured timeout
    ///
    /// The same bound doubles as the per-command response timeout, so no
    /// backend call can stall a request. A previously failed backend is
    /// retried on demand; there is no held-open state to invalidate.
    pub async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, PoolError> {
        self.client
            .get_multiplexed_async_connection_with_timeouts(self.connect_timeout, self.connect_timeout)
            .await
            .map_err(|e| PoolError::Unreachable(format!("{}: {e}", self.url)))
    }
}

/// Immutable pool of interchangeable cache backends
pub struct BackendPool {
    backends: Vec<Backend>,
}

impl BackendPool {
    /// Build the pool from configuration
    ///
    /// Backend URLs are deduplicated preserving first-seen order. An empty
    /// list falls back to [`DEFAULT_BACKEND`]. Unreachable backends do not
    /// fail construction; only unparseable URLs do.
    pub fn from_config(config: &CachePoolConfig) -> Result<Self, PoolError> {
        let connect_timeout = duration_str::parse(&config.connect_timeout)
            .map_err(|e| PoolError::Config(format!("invalid connect_timeout: {e}")))?;

        let mut urls: Vec<&str> = Vec::new();
        for url in &config.backends {
            if !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
        if urls.is_empty() {
            tracing::warn!(
                fallback = DEFAULT_BACKEND,
                "no cache backends configured, running in single-backend mode"
            );
            urls.push(DEFAULT_BACKEND);
        }

        let backends = urls
            .into_iter()
            .map(|url| {
                let client = redis::Client::open(url).map_err(|e| PoolError::InvalidUrl {
                    url: url.to_owned(),
                    message: e.to_string(),
                })?;
                Ok(Backend {
                    url: url.to_owned(),
                    client,
                    connect_timeout,
                })
            })
            .collect::<Result<Vec<_>, PoolError>>()?;

        tracing::info!(members = backends.len(), "cache backend pool ready");

        Ok(Self { backends })
    }

    /// Uniform random selection over pool members
    ///
    /// Plain load spreading, not health-weighted: a downed member is still
    /// selectable and its failures surface as misses downstream.
    pub fn select_random(&self) -> &Backend {
        self.backends
            .choose(&mut rand::rng())
            .expect("pool is never empty")
    }

    /// Modulo-wrapped sticky selection
    ///
    /// For state that must always land on the same backend, e.g. a single
    /// logical counter that would otherwise split across members.
    pub fn select_by_index(&self, index: usize) -> &Backend {
        &self.backends[index % self.backends.len()]
    }

    /// All pool members in construction order
    pub fn all(&self) -> &[Backend] {
        &self.backends
    }
}

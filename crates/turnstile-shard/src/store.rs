use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use turnstile_core::TenantRecord;
use url::Url;

/// Partition store errors
///
/// The locator treats every variant as "this partition has no data";
/// only the subscription downgrade write-back inspects them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, DNS)
    #[error("partition transport: {0}")]
    Transport(String),
    /// Partition answered with a non-success status
    #[error("partition returned {status}: {message}")]
    Api { status: u16, message: String },
    /// Response body failed to decode
    #[error("partition response decode: {0}")]
    Decode(String),
}

/// Point lookups and upserts against one partition
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Fetch the record for an identity key (account id or email)
    async fn fetch(&self, identity_key: &str) -> Result<Option<TenantRecord>, StoreError>;

    /// Upsert a record, keyed by its account id
    async fn store(&self, record: &TenantRecord) -> Result<(), StoreError>;
}

/// HTTP client for a partition store service
#[derive(Clone)]
pub struct HttpPartitionStore {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPartitionStore {
    /// Create a client for one partition endpoint
    ///
    /// The request timeout backstops the locator's shorter per-probe
    /// bound so upserts are bounded too.
    pub fn new(base_url: Url) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn tenant_url(&self, key: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(&format!("tenants/{key}"))
            .map_err(|e| StoreError::Transport(format!("invalid URL: {e}")))
    }
}

#[async_trait]
impl PartitionStore for HttpPartitionStore {
    async fn fetch(&self, identity_key: &str) -> Result<Option<TenantRecord>, StoreError> {
        let url = self.tenant_url(identity_key)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }

        let record = response
            .json::<TenantRecord>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Some(record))
    }

    async fn store(&self, record: &TenantRecord) -> Result<(), StoreError> {
        let url = self.tenant_url(&record.id)?;

        let response = self
            .http
            .put(url)
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }

        Ok(())
    }
}

/// In-memory partition store for tests and embedded single-process use
#[derive(Default)]
pub struct MemoryPartitionStore {
    records: DashMap<String, TenantRecord>,
}

impl MemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the trait
    pub fn insert(&self, record: TenantRecord) {
        self.records.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl PartitionStore for MemoryPartitionStore {
    async fn fetch(&self, identity_key: &str) -> Result<Option<TenantRecord>, StoreError> {
        if let Some(record) = self.records.get(identity_key) {
            return Ok(Some(record.clone()));
        }

        // Identity keys may also be email addresses
        let by_email = self
            .records
            .iter()
            .find(|entry| entry.email == identity_key)
            .map(|entry| entry.value().clone());

        Ok(by_email)
    }

    async fn store(&self, record: &TenantRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

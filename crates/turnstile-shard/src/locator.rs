use std::sync::Arc;
use std::time::Duration;

use turnstile_config::ShardConfig;
use turnstile_core::TenantRecord;
use url::Url;

use crate::store::{HttpPartitionStore, PartitionStore, StoreError};

/// A record found in a specific partition
pub struct Located {
    /// Index of the owning partition
    pub partition: usize,
    pub record: TenantRecord,
    store: Arc<dyn PartitionStore>,
}

impl Located {
    /// Write an updated record back to the partition it was found in
    pub async fn write_back(&self, record: &TenantRecord) -> Result<(), StoreError> {
        self.store.store(record).await
    }
}

/// Fixed, ordered set of partitions probed on every lookup
pub struct ShardSet {
    partitions: Vec<Arc<dyn PartitionStore>>,
    probe_timeout: Duration,
}

impl ShardSet {
    /// Build from an ordered list of partition handles
    pub fn new(partitions: Vec<Arc<dyn PartitionStore>>, probe_timeout: Duration) -> Self {
        Self {
            partitions,
            probe_timeout,
        }
    }

    /// Build HTTP partition clients from configuration
    ///
    /// Partitions exist for the process lifetime; none are added or
    /// removed at runtime.
    pub fn from_config(config: &ShardConfig) -> anyhow::Result<Self> {
        let probe_timeout = duration_str::parse(&config.probe_timeout)
            .map_err(|e| anyhow::anyhow!("invalid shards.probe_timeout: {e}"))?;

        let partitions = config
            .endpoints
            .iter()
            .map(|endpoint| {
                let url = Url::parse(endpoint)
                    .map_err(|e| anyhow::anyhow!("invalid shard endpoint '{endpoint}': {e}"))?;
                let store = HttpPartitionStore::new(url)
                    .map_err(|e| anyhow::anyhow!("shard client for '{endpoint}': {e}"))?;
                Ok(Arc::new(store) as Arc<dyn PartitionStore>)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        tracing::info!(partitions = partitions.len(), "shard set ready");

        Ok(Self::new(partitions, probe_timeout))
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Locate an identity's record, probing partitions in index order
    ///
    /// First hit wins: when a record is inconsistently duplicated across
    /// partitions, the lowest-indexed copy is returned, deterministically.
    /// An unreachable or timed-out partition is treated as a miss, never
    /// an error; `None` means every partition was exhausted.
    pub async fn locate(&self, identity_key: &str) -> Option<Located> {
        for (index, partition) in self.partitions.iter().enumerate() {
            let probe = tokio::time::timeout(self.probe_timeout, partition.fetch(identity_key));

            match probe.await {
                Ok(Ok(Some(record))) => {
                    tracing::debug!(partition = index, identity = identity_key, "shard hit");
                    return Some(Located {
                        partition: index,
                        record,
                        store: Arc::clone(partition),
                    });
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        partition = index,
                        error = %e,
                        "partition probe failed, treating as miss"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        partition = index,
                        timeout = ?self.probe_timeout,
                        "partition probe timed out, treating as miss"
                    );
                }
            }
        }

        tracing::debug!(identity = identity_key, "identity not found in any partition");
        None
    }
}

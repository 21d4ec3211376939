//! Shard location across independently-provisioned data partitions
//!
//! Each partition is a fully-functional store holding a subset of tenant
//! records. There is no cross-partition health signal or directory, so
//! lookups probe every partition in a fixed order and treat unreachable
//! partitions as holding no data.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod locator;
mod store;

pub use locator::{Located, ShardSet};
pub use store::{HttpPartitionStore, MemoryPartitionStore, PartitionStore, StoreError};

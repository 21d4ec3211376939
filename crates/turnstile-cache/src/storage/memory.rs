use std::time::Duration;

use dashmap::DashMap;
use turnstile_core::now_secs;

/// In-process cache storage with lazy expiry on read
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, u64)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;

        if entry.value().1 <= now_secs() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }

        Some(entry.value().0.clone())
    }

    pub fn put(&self, key: &str, data: &str, ttl: Duration) {
        self.entries
            .insert(key.to_owned(), (data.to_owned(), now_secs() + ttl.as_secs()));
    }
}

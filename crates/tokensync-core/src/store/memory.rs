// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// A fast, cloneable store for tests and for embedding the engine in a
// process that persists records some other way. Nothing survives a restart.
//
// Clones share the same map, so a test can hand one clone to the engine and
// inspect the other afterwards.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{Address, TokenRecord};
use crate::traits::RecordStore;

/// In-memory record store
///
/// # Example
///
/// ```rust,no_run
/// use tokensync_core::store::MemoryStore;
/// use tokensync_core::model::{Listing, RecordPayload, TokenRecord, Metadata};
/// use tokensync_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let payload = RecordPayload::from_listing(&Listing::new(1, "A", "A", "a"), Metadata::new());
///
///     store.write("0xabc", &TokenRecord::active(&payload, "0xabc")).await?;
///     assert_eq!(store.read("0xabc").await?.id, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<Address, TokenRecord>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records (not counted as writes)
    pub fn with_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, TokenRecord)>,
        S: Into<Address>,
    {
        let map = records
            .into_iter()
            .map(|(address, record)| (address.into(), record))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(map)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Number of `write` calls since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> BTreeMap<Address, TokenRecord> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_keys(&self) -> Result<Vec<Address>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn read(&self, address: &str) -> Result<TokenRecord, Error> {
        let guard = self.inner.read().await;
        guard
            .get(address)
            .cloned()
            .ok_or_else(|| Error::not_found(address))
    }

    async fn write(&self, address: &str, record: &TokenRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(address.to_string(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Listing, Metadata, RecordPayload};

    fn record(id: u64, address: &str) -> TokenRecord {
        let listing = Listing::new(id, "Token", "TKN", "token");
        TokenRecord::active(&RecordPayload::from_listing(&listing, Metadata::new()), address)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.write("0xaaa", &record(1, "0xaaa")).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.write_count(), 1);

        let retrieved = store.read("0xaaa").await.unwrap();
        assert_eq!(retrieved.id, 1);
    }

    #[tokio::test]
    async fn test_memory_store_read_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.read("0xmissing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_store_keys_sorted_and_shared_between_clones() {
        let store = MemoryStore::with_records([
            ("0xbbb", record(1, "0xbbb")),
            ("0xaaa", record(1, "0xaaa")),
        ]);
        let clone = store.clone();
        clone.write("0xccc", &record(2, "0xccc")).await.unwrap();

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["0xaaa", "0xbbb", "0xccc"]);
        assert_eq!(store.write_count(), 1);
    }
}

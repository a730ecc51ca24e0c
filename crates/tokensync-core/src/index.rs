//! Existing-entry index
//!
//! Maps each listing ID to the set of addresses currently stored for it.
//! The index is rebuilt from the store at the start of every run and is
//! never persisted.
//!
//! Addresses in the index are normalized (see [`normalize_address`]) so
//! they compare equal to what the processor reports. [`StoreKeys`] maps
//! them back to the key spelling the store actually uses.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::model::{Address, ListingId, TokenRecord, normalize_address};
use crate::traits::RecordStore;

/// Listing ID -> normalized addresses stored for that listing
pub type ExistingIndex = BTreeMap<ListingId, BTreeSet<Address>>;

/// Normalized address -> key it is stored under
pub type StoreKeys = BTreeMap<Address, Address>;

/// Everything a run needs to know about the store before writing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreScan {
    /// Addresses per listing, filtered by [`IndexMode`]
    pub index: ExistingIndex,
    /// Every stored key, deprecated records included
    pub keys: StoreKeys,
}

/// Which records the index considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Skip records flagged `_DEPRECATED` (what the engine uses)
    #[default]
    ExcludeDeprecated,
    /// Keep every record (auditing)
    IncludeDeprecated,
}

impl IndexMode {
    fn admits(self, record: &TokenRecord) -> bool {
        match self {
            IndexMode::ExcludeDeprecated => !record.is_deprecated(),
            IndexMode::IncludeDeprecated => true,
        }
    }
}

/// Build the index from `(address, record)` pairs
///
/// The address is taken from the pair (the store key), not from the record
/// body. The result depends only on the set of pairs, not on their order.
pub fn build_index<'a, I, A>(records: I, mode: IndexMode) -> ExistingIndex
where
    I: IntoIterator<Item = (A, &'a TokenRecord)>,
    A: AsRef<str>,
{
    let mut index = ExistingIndex::new();
    for (address, record) in records {
        if !mode.admits(record) {
            continue;
        }
        index
            .entry(record.id)
            .or_default()
            .insert(normalize_address(address.as_ref()));
    }
    index
}

/// Map each normalized address to its stored key
///
/// Keys that only differ in case are already duplicates on disk; the first
/// one in iteration order wins and the rest are reported.
pub fn build_store_keys<I, A>(keys: I) -> StoreKeys
where
    I: IntoIterator<Item = A>,
    A: AsRef<str>,
{
    let mut map = StoreKeys::new();
    for key in keys {
        let key = key.as_ref();
        match map.entry(normalize_address(key)) {
            Entry::Vacant(slot) => {
                slot.insert(key.to_string());
            }
            Entry::Occupied(slot) => {
                tracing::warn!(
                    "Records {} and {} are the same address, only {} will be updated",
                    slot.get(),
                    key,
                    slot.get()
                );
            }
        }
    }
    map
}

/// Scan every record in `store` and build the index
///
/// Any record that cannot be read is fatal: a partial index would make the
/// reconciler miss deprecations or write over records it does not know.
pub async fn index_store(store: &dyn RecordStore, mode: IndexMode) -> Result<ExistingIndex> {
    Ok(scan_store(store, mode).await?.index)
}

/// Scan every record in `store`, returning the index and the key map
pub async fn scan_store(store: &dyn RecordStore, mode: IndexMode) -> Result<StoreScan> {
    let keys = store.list_keys().await?;
    let mut records = Vec::with_capacity(keys.len());

    for address in keys {
        let record = store.read(&address).await.map_err(|e| match e {
            Error::NotFound(_) => Error::store(format!(
                "Record {} disappeared while building the index",
                address
            )),
            other => other,
        })?;
        records.push((address, record));
    }

    let index = build_index(records.iter().map(|(a, r)| (a.as_str(), r)), mode);
    let keys = build_store_keys(records.iter().map(|(a, _)| a));
    tracing::info!(
        "Indexed {} record(s) into {} listing(s) ({:?})",
        records.len(),
        index.len(),
        mode
    );
    Ok(StoreScan { index, keys })
}

//! Reconciler
//!
//! Applies one processed listing to the record store:
//!
//! ```text
//! existing = index[listing.id]            (empty if unseen)
//! current  = processed.addresses
//!
//! removed        = existing \ current  -> deprecate (flag, strip address)
//! kept_or_added  = current             -> full overwrite with fresh payload
//! ```
//!
//! `removed` and `kept_or_added` are disjoint by construction, so no address
//! is deprecated and rewritten in the same pass. Both loops walk ordered
//! sets, which keeps writes and log lines reproducible between runs.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::events::{EventEmitter, SyncEvent};
use crate::index::StoreKeys;
use crate::model::{Address, ListingId, TokenRecord};
use crate::processor::ProcessedListing;
use crate::traits::RecordStore;

/// The two address sets a listing reconciliation acts on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Previously known addresses the feed no longer reports
    pub removed: BTreeSet<Address>,
    /// Every address the feed currently reports
    pub kept_or_added: BTreeSet<Address>,
}

impl ReconcilePlan {
    /// Compute the plan from the indexed and current address sets
    pub fn new(existing: Option<&BTreeSet<Address>>, current: &BTreeSet<Address>) -> Self {
        let removed = existing
            .map(|known| known.difference(current).cloned().collect())
            .unwrap_or_default();

        Self {
            removed,
            kept_or_added: current.clone(),
        }
    }
}

/// What a reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Addresses flagged deprecated
    pub deprecated: Vec<Address>,
    /// Addresses created or overwritten
    pub written: Vec<Address>,
}

/// Applies reconciliation plans to a record store
///
/// One reconciler lives for one run. It remembers every address it has
/// written, and never deprecates one of those later in the same run: an
/// address that moved to another listing ID belongs to its new listing.
pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    events: &'a EventEmitter,
    /// Normalized address -> stored key
    keys: StoreKeys,
    /// Normalized addresses written during this run
    claimed: BTreeSet<Address>,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler writing to `store`
    pub fn new(store: &'a dyn RecordStore, events: &'a EventEmitter) -> Self {
        Self {
            store,
            events,
            keys: StoreKeys::new(),
            claimed: BTreeSet::new(),
        }
    }

    /// Use the key spellings found in the store instead of normalized ones
    pub fn with_store_keys(mut self, keys: StoreKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Key under which `address` is (or will be) stored
    fn store_key(&self, address: &str) -> Address {
        self.keys
            .get(address)
            .cloned()
            .unwrap_or_else(|| address.to_string())
    }

    /// Reconcile one listing against the addresses indexed for it
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreInconsistency`] when an address to deprecate has
    /// no record. The caller must stop the run: the index no longer
    /// describes the store.
    pub async fn reconcile(
        &mut self,
        processed: &ProcessedListing,
        existing: Option<&BTreeSet<Address>>,
    ) -> Result<ReconcileOutcome> {
        let payload = &processed.payload;
        let plan = ReconcilePlan::new(existing, &processed.addresses);
        let mut outcome = ReconcileOutcome::default();

        for address in &plan.removed {
            if let Some(key) = self
                .deprecate(payload.id, Some(&payload.website_slug), address)
                .await?
            {
                outcome.deprecated.push(key);
            }
        }

        for address in &plan.kept_or_added {
            let key = self.store_key(address);
            let record = TokenRecord::active(payload, &key);
            self.store.write(&key, &record).await?;
            self.claimed.insert(address.clone());
            self.keys.insert(address.clone(), key.clone());
            debug!("'{}' wrote {}", payload.website_slug, key);
            self.events.emit(SyncEvent::RecordWritten {
                listing_id: payload.id,
                address: key.clone(),
            });
            outcome.written.push(key);
        }

        self.events.emit(SyncEvent::ListingReconciled {
            listing_id: payload.id,
            deprecated: outcome.deprecated.len(),
            written: outcome.written.len(),
        });

        Ok(outcome)
    }

    /// Deprecate every address of a listing ID that vanished from the feed
    ///
    /// Returns the keys actually deprecated.
    pub async fn deprecate_all(
        &mut self,
        listing_id: ListingId,
        addresses: &BTreeSet<Address>,
    ) -> Result<Vec<Address>> {
        let mut deprecated = Vec::with_capacity(addresses.len());
        for address in addresses {
            if let Some(key) = self.deprecate(listing_id, None, address).await? {
                deprecated.push(key);
            }
        }
        Ok(deprecated)
    }

    /// Flag one stored record deprecated and strip its address field
    ///
    /// When `slug` is `None` the warning uses the stored record's slug.
    /// Returns `None` when the address was written earlier in this run.
    async fn deprecate(
        &mut self,
        listing_id: ListingId,
        slug: Option<&str>,
        address: &str,
    ) -> Result<Option<Address>> {
        if self.claimed.contains(address) {
            debug!(
                "{} was written for another listing this run, not deprecating it for {}",
                address, listing_id
            );
            return Ok(None);
        }

        let key = self.store_key(address);
        if let Some(slug) = slug {
            self.warn_deprecated(listing_id, slug, &key);
        }

        let mut record = match self.store.read(&key).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                return Err(Error::store_inconsistency(key, listing_id));
            }
            Err(e) => return Err(e),
        };

        if slug.is_none() {
            self.warn_deprecated(listing_id, &record.website_slug, &key);
        }

        record.deprecate();
        self.store.write(&key, &record).await?;
        Ok(Some(key))
    }

    fn warn_deprecated(&self, listing_id: ListingId, slug: &str, address: &str) {
        warn!("'{}' has deprecated {}", slug, address);
        self.events.emit(SyncEvent::AddressDeprecated {
            listing_id,
            slug: slug.to_string(),
            address: address.to_string(),
        });
    }
}

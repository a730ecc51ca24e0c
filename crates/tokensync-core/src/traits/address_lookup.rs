// # Address Lookup Trait
//
// Resolves a listing to the set of chain addresses it currently maps to.
//
// ## Implementations
//
// - HTTP page scraper: `tokensync-http` crate (`HttpAddressLookup`)
// - Future: explorer APIs, curated overrides
//
// ## Usage
//
// ```rust,ignore
// use tokensync_core::AddressLookup;
//
// match lookup.lookup(&listing).await? {
//     Some(found) => println!("{} maps to {:?}", listing.website_slug, found.addresses),
//     None => println!("{} has no chain address", listing.website_slug),
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::model::{Address, Listing, Metadata};

/// Addresses and enrichment fields found for one listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupResult {
    /// Addresses the listing currently maps to (may be empty)
    pub addresses: BTreeSet<Address>,
    /// Extra fields to store on every record of the listing
    pub metadata: Metadata,
}

impl LookupResult {
    /// Create a lookup result from addresses, without metadata
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Address>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Trait for address lookup implementations
///
/// # Contract
///
/// - `Ok(None)`: the listing is not resolvable (no chain mapping)
/// - `Ok(Some(result))`: the current mapping; an empty address set is a
///   real answer and deprecates every known address of the listing
/// - `Err(_)`: the lookup failed; the processor treats this as "skip"
///
/// Lookups must not touch the record store.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Resolve a listing's current addresses
    async fn lookup(&self, listing: &Listing) -> Result<Option<LookupResult>, crate::Error>;

    /// Lookup name (for logging)
    fn lookup_name(&self) -> &'static str;
}

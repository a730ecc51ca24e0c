// # tokensync-core
//
// Core library for reconciling a local token catalog against a remote
// listings feed.
//
// ## Architecture Overview
//
// - **ListingFeed**: Trait for fetching the remote listings
// - **AddressLookup**: Trait resolving a listing to its current addresses
// - **RecordStore**: Trait for keyed record persistence (address -> record)
// - **Throttle**: Trait for the fixed rate-limit delay between listings
// - **SyncEngine**: Orchestrates index -> process -> reconcile for one run
//
// ## Reconciliation
//
// For each listing the reconciler deprecates the indexed addresses the feed
// no longer reports and overwrites every address it does report. Records
// are never deleted; deprecation sets `_DEPRECATED: true` and strips the
// `address` field.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod index;
pub mod model;
pub mod processor;
pub mod reconciler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, StoreConfig, SyncConfig};
pub use engine::{SyncEngine, SyncReport};
pub use error::{Error, Result};
pub use events::{EventEmitter, SyncEvent};
pub use index::{
    ExistingIndex, IndexMode, StoreKeys, StoreScan, build_index, build_store_keys, index_store,
    scan_store,
};
pub use model::{Address, Listing, ListingId, RecordPayload, TokenRecord};
pub use processor::{ListingProcessor, ProcessedListing, SkipReason};
pub use reconciler::{ReconcileOutcome, ReconcilePlan, Reconciler};
pub use store::{MemoryStore, YamlDirStore};
pub use traits::{AddressLookup, ListingFeed, LookupResult, RecordStore, Throttle};

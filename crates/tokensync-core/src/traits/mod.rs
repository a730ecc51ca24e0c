//! Core traits for the token listing sync
//!
//! This module defines the seams every adapter implements.
//!
//! - [`ListingFeed`]: Fetch the remote listings
//! - [`AddressLookup`]: Resolve a listing to its current addresses
//! - [`RecordStore`]: Keyed record persistence
//! - [`Throttle`]: Rate-limit delay between listings

pub mod address_lookup;
pub mod listing_feed;
pub mod record_store;
pub mod throttle;

pub use address_lookup::{AddressLookup, LookupResult};
pub use listing_feed::ListingFeed;
pub use record_store::RecordStore;
pub use throttle::{FixedDelay, NoDelay, Throttle, DEFAULT_RATE_LIMIT_SECS};

//! Data model shared by every component
//!
//! - [`Listing`]: one element of the remote listings feed
//! - [`TokenRecord`]: the persisted entity, keyed by address in a store
//! - [`RecordPayload`]: normalized listing metadata the processor produces

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// External listing identifier (the feed's `id`)
pub type ListingId = u64;

/// Token address; also the record store key
pub type Address = String;

/// Open-ended chain-specific metadata, ordered so serialization is stable
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A listing as supplied by the remote feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing ID
    pub id: ListingId,
    /// Display name (e.g. "Bitcoin")
    pub name: String,
    /// Ticker symbol (e.g. "BTC")
    pub symbol: String,
    /// URL slug (e.g. "bitcoin")
    pub website_slug: String,
}

impl Listing {
    /// Create a new listing
    pub fn new(
        id: ListingId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        website_slug: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            symbol: symbol.into(),
            website_slug: website_slug.into(),
        }
    }

    /// Name of the first required field that is blank, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.symbol.trim().is_empty() {
            Some("symbol")
        } else if self.website_slug.trim().is_empty() {
            Some("website_slug")
        } else {
            None
        }
    }
}

/// Normalized metadata for one listing, written to every current address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Listing ID
    pub id: ListingId,
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// URL slug
    pub website_slug: String,
    /// Enrichment fields from the address lookup
    #[serde(default)]
    pub extra: Metadata,
}

impl RecordPayload {
    /// Build a payload from a listing and lookup metadata
    ///
    /// Metadata keys that collide with the required fields are dropped so
    /// the listing stays authoritative for them.
    pub fn from_listing(listing: &Listing, metadata: Metadata) -> Self {
        let extra = metadata
            .into_iter()
            .filter(|(key, _)| !TokenRecord::RESERVED_KEYS.contains(&key.as_str()))
            .collect();

        Self {
            id: listing.id,
            name: listing.name.clone(),
            symbol: listing.symbol.clone(),
            website_slug: listing.website_slug.clone(),
            extra,
        }
    }
}

/// Persisted token record
///
/// The store key is the address. Active records also carry it as the
/// `address` field; deprecated records have it stripped.
///
/// # File Format
///
/// ```yaml
/// id: 1
/// name: Example
/// symbol: EXM
/// website_slug: example
/// address: '0x...'
/// _DEPRECATED: true   # only on deprecated records
/// explorer: https://etherscan.io/token/0x...
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Listing ID this record belongs to
    pub id: ListingId,
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// URL slug
    pub website_slug: String,
    /// Address, duplicated from the key on active records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Soft-deletion flag
    #[serde(rename = "_DEPRECATED", default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    /// Chain-specific and forward-compatible fields
    #[serde(flatten)]
    pub extra: Metadata,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TokenRecord {
    /// Keys owned by the typed fields
    pub const RESERVED_KEYS: &'static [&'static str] =
        &["id", "name", "symbol", "website_slug", "address", "_DEPRECATED"];

    /// Build the active record for `address` from a listing payload
    pub fn active(payload: &RecordPayload, address: &str) -> Self {
        Self {
            id: payload.id,
            name: payload.name.clone(),
            symbol: payload.symbol.clone(),
            website_slug: payload.website_slug.clone(),
            address: Some(address.to_string()),
            deprecated: false,
            extra: payload.extra.clone(),
        }
    }

    /// Mark the record deprecated and strip the redundant address field
    pub fn deprecate(&mut self) {
        self.deprecated = true;
        self.address = None;
    }

    /// Whether the record is flagged deprecated
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }
}

/// Canonical form used to compare addresses: trimmed and lowercase
///
/// Checksummed (mixed-case) and lowercase spellings of one address compare
/// equal after normalization. Store keys keep whatever spelling is on disk.
pub fn normalize_address(address: &str) -> Address {
    address.trim().to_ascii_lowercase()
}

/// Check that an address is a 20-byte hex address with a `0x` prefix
pub fn is_well_formed_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

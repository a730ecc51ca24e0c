//! Listing processor
//!
//! Turns one listing into the payload and address set the reconciler
//! applies, or decides the listing is ineligible for this run.
//!
//! Ineligibility is a normal outcome, never an error: a listing whose
//! lookup is flaky must not cause its known addresses to be deprecated.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::model::{Address, Listing, RecordPayload, is_well_formed_address, normalize_address};
use crate::traits::AddressLookup;

/// Payload and current address set for an eligible listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedListing {
    /// Metadata written to every current address
    pub payload: RecordPayload,
    /// Addresses the feed currently claims for the listing
    pub addresses: BTreeSet<Address>,
}

/// Why a listing was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required listing field is blank
    MissingField(&'static str),
    /// The lookup has no chain mapping for the listing
    Unresolvable,
    /// The lookup failed
    LookupFailed(String),
    /// The lookup returned addresses, none of them well formed
    NoValidAddress,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing field '{}'", field),
            SkipReason::Unresolvable => write!(f, "no address mapping"),
            SkipReason::LookupFailed(e) => write!(f, "lookup failed: {}", e),
            SkipReason::NoValidAddress => write!(f, "no well-formed address"),
        }
    }
}

/// Processes listings against an address lookup
pub struct ListingProcessor {
    lookup: Box<dyn AddressLookup>,
}

impl ListingProcessor {
    /// Create a processor backed by `lookup`
    pub fn new(lookup: Box<dyn AddressLookup>) -> Self {
        Self { lookup }
    }

    /// Process one listing
    ///
    /// # Returns
    ///
    /// - `Ok(ProcessedListing)`: the listing is eligible
    /// - `Err(SkipReason)`: the listing must be skipped with no side effects
    pub async fn process(&self, listing: &Listing) -> Result<ProcessedListing, SkipReason> {
        if let Some(field) = listing.missing_field() {
            return Err(SkipReason::MissingField(field));
        }

        let found = match self.lookup.lookup(listing).await {
            Ok(Some(found)) => found,
            Ok(None) => return Err(SkipReason::Unresolvable),
            Err(e) => return Err(SkipReason::LookupFailed(e.to_string())),
        };

        let reported = found.addresses.len();
        let mut addresses = BTreeSet::new();
        for address in found.addresses {
            let address = normalize_address(&address);
            if is_well_formed_address(&address) {
                addresses.insert(address);
            } else {
                warn!(
                    "'{}' lookup returned malformed address {:?}, ignoring",
                    listing.website_slug, address
                );
            }
        }

        // Rejected addresses are not an empty mapping.
        if reported > 0 && addresses.is_empty() {
            return Err(SkipReason::NoValidAddress);
        }

        debug!(
            "'{}' ({}) maps to {} address(es) via {}",
            listing.website_slug,
            listing.id,
            addresses.len(),
            self.lookup.lookup_name()
        );

        Ok(ProcessedListing {
            payload: RecordPayload::from_listing(listing, found.metadata),
            addresses,
        })
    }
}

//! Error types for the token listing sync
//!
//! Ineligible listings are not errors: the processor reports them as a skip.
//! Everything in this enum that reaches the engine terminates the run.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the token listing sync
#[derive(Error, Debug)]
pub enum Error {
    /// The index and the store disagree: an indexed address has no record
    #[error("Store inconsistency: address {address} indexed for listing {listing_id} is missing from the store")]
    StoreInconsistency {
        /// Address that was expected in the store
        address: String,
        /// Listing ID the index associated with the address
        listing_id: u64,
    },

    /// A stored record could not be parsed
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Listings feed errors
    #[error("Listings feed error: {0}")]
    Feed(String),

    /// Address lookup errors
    #[error("Address lookup error: {0}")]
    Lookup(String),

    /// Record store errors
    #[error("Record store error: {0}")]
    Store(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a store inconsistency error
    pub fn store_inconsistency(address: impl Into<String>, listing_id: u64) -> Self {
        Self::StoreInconsistency {
            address: address.into(),
            listing_id,
        }
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a listings feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create an address lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a record store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors that mean the record simply is not there
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

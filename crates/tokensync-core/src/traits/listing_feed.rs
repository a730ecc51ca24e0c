// # Listing Feed Trait
//
// Supplies the finite sequence of listings a run reconciles.
//
// ## Implementations
//
// - HTTP: `tokensync-http` crate (`HttpListingFeed`)
// - Static: tests provide a fixed vector

use async_trait::async_trait;

use crate::model::Listing;

/// Trait for listing feed implementations
///
/// The feed is fetched once at the start of a run. A failure here is fatal:
/// nothing can be reconciled without listings.
#[async_trait]
pub trait ListingFeed: Send + Sync {
    /// Fetch all listings, in feed order
    async fn fetch(&self) -> Result<Vec<Listing>, crate::Error>;

    /// Feed name (for logging)
    fn feed_name(&self) -> &'static str;
}

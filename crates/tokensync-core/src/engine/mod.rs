//! Sync engine
//!
//! The SyncEngine drives one reconciliation pass:
//! - Fetching the listings feed
//! - Indexing the existing records
//! - Processing each listing behind the rate limit
//! - Reconciling eligible listings against the index
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   listings   ┌──────────────┐   processed   ┌─────────────┐
//! │ ListingFeed │─────────────▶│  Processor   │──────────────▶│ Reconciler  │
//! └─────────────┘              │ (+ lookup)   │               └─────────────┘
//!                              └──────────────┘                  ▲      │
//!                                                      index     │      │ read/write
//! ┌─────────────┐  list_keys/read  ┌──────────────┐──────────────┘      ▼
//! │ RecordStore │─────────────────▶│   Indexer    │             ┌─────────────┐
//! └─────────────┘                  └──────────────┘             │ RecordStore │
//!                                                               └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Build the index from non-deprecated records
//! 2. For each listing, in feed order: wait on the throttle, process, reconcile
//! 3. Deprecate addresses of indexed listing IDs missing from the feed
//! 4. Flush the store and return a [`SyncReport`]
//!
//! Everything runs sequentially on the caller's task. A reconciliation error
//! stops the run before any further write.
//!
//! ## Shutdown
//!
//! A shutdown request (see [`SyncEngine::with_shutdown()`]) is honoured only
//! between listings, so every listing is either fully applied or untouched.
//! An interrupted run skips the vanished-listing sweep: the set of listings
//! seen so far is incomplete.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{EventEmitter, SyncEvent};
use crate::index::{IndexMode, scan_store};
use crate::model::{Listing, ListingId};
use crate::processor::ListingProcessor;
use crate::reconciler::Reconciler;
use crate::traits::{AddressLookup, FixedDelay, ListingFeed, RecordStore, Throttle};

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Listings in the feed
    pub listings: usize,
    /// Listings reconciled
    pub reconciled: usize,
    /// Listings skipped as ineligible or duplicate
    pub skipped: usize,
    /// Records deprecated
    pub deprecated: usize,
    /// Records created or overwritten
    pub written: usize,
    /// Indexed listing IDs absent from the feed
    pub vanished_ids: Vec<ListingId>,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
}

impl SyncReport {
    fn start(listings: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            listings,
            reconciled: 0,
            skipped: 0,
            deprecated: 0,
            written: 0,
            vanished_ids: Vec::new(),
            interrupted: false,
        }
    }
}

/// Token listing sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Optionally swap the rate limiter with [`SyncEngine::with_throttle()`]
/// 3. Run with [`SyncEngine::run()`] (fetches the feed) or
///    [`SyncEngine::run_with_listings()`]
///
/// A run never spawns tasks. Re-running with unchanged inputs rewrites the
/// same records with the same content.
pub struct SyncEngine {
    /// Remote listings
    feed: Box<dyn ListingFeed>,

    /// Listing -> payload and address set
    processor: ListingProcessor,

    /// Persisted records
    store: Box<dyn RecordStore>,

    /// Delay before each listing
    throttle: Box<dyn Throttle>,

    /// Deprecate addresses of listing IDs that left the feed
    deprecate_vanished: bool,

    /// Event sender for external monitoring
    events: EventEmitter,

    /// Set to `true` to stop before the next listing
    shutdown: Option<watch::Receiver<bool>>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// The throttle is a [`FixedDelay`] of `config.rate_limit_secs`.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        feed: Box<dyn ListingFeed>,
        lookup: Box<dyn AddressLookup>,
        store: Box<dyn RecordStore>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (events, rx) = EventEmitter::channel(config.event_channel_capacity);

        let engine = Self {
            feed,
            processor: ListingProcessor::new(lookup),
            store,
            throttle: Box::new(FixedDelay::new(config.rate_limit())),
            deprecate_vanished: config.deprecate_vanished,
            events,
            shutdown: None,
        };

        Ok((engine, rx))
    }

    /// Replace the rate limiter
    pub fn with_throttle(mut self, throttle: Box<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Stop between listings once `shutdown` holds `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fetch the feed and run a full pass
    ///
    /// # Errors
    ///
    /// A feed failure is fatal; so is any error from the reconciler.
    pub async fn run(&self) -> Result<SyncReport> {
        let listings = self.feed.fetch().await.inspect_err(|e| {
            error!("Failed to fetch listings from {}: {}", self.feed.feed_name(), e);
        })?;
        info!(
            "Fetched {} listing(s) from {}",
            listings.len(),
            self.feed.feed_name()
        );
        self.run_with_listings(&listings).await
    }

    /// Run a full pass over already-fetched listings
    pub async fn run_with_listings(&self, listings: &[Listing]) -> Result<SyncReport> {
        let mut report = SyncReport::start(listings.len());

        let scan = scan_store(self.store.as_ref(), IndexMode::ExcludeDeprecated).await?;
        let index = scan.index;
        self.events.emit(SyncEvent::Started {
            listings: listings.len(),
            indexed_listings: index.len(),
        });

        let mut reconciler =
            Reconciler::new(self.store.as_ref(), &self.events).with_store_keys(scan.keys);
        let mut seen = BTreeSet::new();
        let mut shutdown = self.shutdown.clone();

        for (done, listing) in listings.iter().enumerate() {
            if self.pace(shutdown.as_mut()).await {
                warn!(
                    "Shutdown requested, stopping before '{}' ({} of {} listing(s) done)",
                    listing.website_slug,
                    done,
                    listings.len()
                );
                report.interrupted = true;
                break;
            }

            if !seen.insert(listing.id) {
                warn!(
                    "Listing {} ('{}') appears twice in the feed, skipping repeat",
                    listing.id, listing.website_slug
                );
                self.skip(&mut report, listing, "duplicate listing id".to_string());
                continue;
            }

            let processed = match self.processor.process(listing).await {
                Ok(processed) => processed,
                Err(reason) => {
                    info!("Skipping '{}' ({}): {}", listing.website_slug, listing.id, reason);
                    self.skip(&mut report, listing, reason.to_string());
                    continue;
                }
            };

            let outcome = reconciler
                .reconcile(&processed, index.get(&listing.id))
                .await
                .inspect_err(|e| {
                    error!("Reconciling '{}' failed: {}", listing.website_slug, e);
                })?;

            report.reconciled += 1;
            report.deprecated += outcome.deprecated.len();
            report.written += outcome.written.len();
        }

        if self.deprecate_vanished && !report.interrupted {
            for (listing_id, addresses) in &index {
                if seen.contains(listing_id) {
                    continue;
                }
                warn!(
                    "Listing {} no longer in the feed, deprecating {} address(es)",
                    listing_id,
                    addresses.len()
                );
                self.events.emit(SyncEvent::VanishedListing {
                    listing_id: *listing_id,
                    addresses: addresses.len(),
                });
                let deprecated = reconciler.deprecate_all(*listing_id, addresses).await?;
                report.deprecated += deprecated.len();
                report.vanished_ids.push(*listing_id);
            }
        }

        self.store.flush().await?;

        report.finished_at = Utc::now();
        self.events.emit(SyncEvent::Finished {
            reconciled: report.reconciled,
            skipped: report.skipped,
        });
        info!(
            "Sync finished: {} reconciled, {} skipped, {} written, {} deprecated",
            report.reconciled, report.skipped, report.written, report.deprecated
        );

        Ok(report)
    }

    /// Wait on the throttle; `true` when a shutdown was requested instead
    async fn pace(&self, shutdown: Option<&mut watch::Receiver<bool>>) -> bool {
        let Some(rx) = shutdown else {
            self.throttle.wait().await;
            return false;
        };
        if *rx.borrow() {
            return true;
        }
        tokio::select! {
            _ = self.throttle.wait() => {}
            Ok(_) = rx.wait_for(|stop| *stop) => {}
        }
        *rx.borrow()
    }

    fn skip(&self, report: &mut SyncReport, listing: &Listing, reason: String) {
        report.skipped += 1;
        self.events.emit(SyncEvent::ListingSkipped {
            listing_id: listing.id,
            slug: listing.website_slug.clone(),
            reason,
        });
    }
}

//! Test doubles and common utilities for sync contract tests
//!
//! These doubles replace the network-facing adapters so a whole run can be
//! driven from fixed data.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokensync_core::config::EngineConfig;
use tokensync_core::error::{Error, Result};
use tokensync_core::model::{Listing, ListingId, Metadata, RecordPayload, TokenRecord};
use tokensync_core::store::MemoryStore;
use tokensync_core::traits::{AddressLookup, ListingFeed, LookupResult, NoDelay, Throttle};
use tokensync_core::{SyncEngine, SyncEvent};
use tokio::sync::{mpsc, watch};

/// Pad a short hex tag into a well-formed address (`addr("aaa")` -> `0x000...aaa`)
pub fn addr(tag: &str) -> String {
    format!("0x{:0>40}", tag)
}

/// A listing whose name/symbol/slug are derived from its ID
pub fn listing(id: ListingId) -> Listing {
    Listing::new(id, format!("Token {}", id), format!("TK{}", id), format!("token-{}", id))
}

/// An active record for `address` belonging to `listing(id)`
pub fn active_record(id: ListingId, address: &str) -> TokenRecord {
    TokenRecord::active(&RecordPayload::from_listing(&listing(id), Metadata::new()), address)
}

/// A deprecated record belonging to `listing(id)`
pub fn deprecated_record(id: ListingId) -> TokenRecord {
    let mut record = active_record(id, "unused");
    record.deprecate();
    record
}

/// Feed returning a fixed list
pub struct StaticFeed {
    listings: Vec<Listing>,
}

impl StaticFeed {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl ListingFeed for StaticFeed {
    async fn fetch(&self) -> Result<Vec<Listing>> {
        Ok(self.listings.clone())
    }

    fn feed_name(&self) -> &'static str {
        "static"
    }
}

/// Feed that always fails
pub struct FailingFeed;

#[async_trait]
impl ListingFeed for FailingFeed {
    async fn fetch(&self) -> Result<Vec<Listing>> {
        Err(Error::feed("503 Service Unavailable"))
    }

    fn feed_name(&self) -> &'static str {
        "failing"
    }
}

/// Scripted lookup answer for one listing ID
#[derive(Clone)]
pub enum Answer {
    Addresses(Vec<String>),
    Unresolvable,
    Fail,
}

/// Lookup answering from a table; unknown IDs are unresolvable
#[derive(Clone, Default)]
pub struct ScriptedLookup {
    answers: Arc<Mutex<HashMap<ListingId, Answer>>>,
    calls: Arc<Mutex<Vec<ListingId>>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, id: ListingId, answer: Answer) -> Self {
        self.answers.lock().unwrap().insert(id, answer);
        self
    }

    pub fn addresses(self, id: ListingId, addresses: &[&str]) -> Self {
        let addresses = addresses.iter().map(|a| a.to_string()).collect();
        self.answer(id, Answer::Addresses(addresses))
    }

    /// Listing IDs looked up, in call order
    pub fn calls(&self) -> Vec<ListingId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressLookup for ScriptedLookup {
    async fn lookup(&self, listing: &Listing) -> Result<Option<LookupResult>> {
        self.calls.lock().unwrap().push(listing.id);
        let answer = self.answers.lock().unwrap().get(&listing.id).cloned();
        match answer {
            Some(Answer::Addresses(addresses)) => Ok(Some(
                LookupResult::new(addresses).with_metadata("chain", serde_json::json!("ethereum")),
            )),
            Some(Answer::Fail) => Err(Error::lookup("connection reset")),
            Some(Answer::Unresolvable) | None => Ok(None),
        }
    }

    fn lookup_name(&self) -> &'static str {
        "scripted"
    }
}

/// Throttle that only counts calls
#[derive(Clone, Default)]
pub struct CountingThrottle {
    waits: Arc<AtomicUsize>,
}

impl CountingThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_count(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for CountingThrottle {
    async fn wait(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Throttle that requests shutdown on its `nth` wait (1-based)
pub struct ShutdownAfter {
    nth: usize,
    waits: AtomicUsize,
    shutdown: watch::Sender<bool>,
}

impl ShutdownAfter {
    pub fn new(nth: usize, shutdown: watch::Sender<bool>) -> Self {
        Self { nth, waits: AtomicUsize::new(0), shutdown }
    }
}

#[async_trait]
impl Throttle for ShutdownAfter {
    async fn wait(&self) {
        if self.waits.fetch_add(1, Ordering::SeqCst) + 1 == self.nth {
            let _ = self.shutdown.send(true);
        }
    }
}

/// Engine config with events sized for tests
pub fn test_config() -> EngineConfig {
    EngineConfig {
        rate_limit_secs: 0,
        deprecate_vanished: true,
        event_channel_capacity: 1000,
    }
}

/// Build an engine over a memory store with no rate-limit delay
pub fn engine(
    listings: Vec<Listing>,
    lookup: ScriptedLookup,
    store: &MemoryStore,
) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    let (engine, rx) = SyncEngine::new(
        Box::new(StaticFeed::new(listings)),
        Box::new(lookup),
        Box::new(store.clone()),
        test_config(),
    )
    .expect("engine construction succeeds");
    (engine.with_throttle(Box::new(NoDelay)), rx)
}

/// Drain every event currently queued
pub fn drain(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

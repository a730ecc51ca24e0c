//! Contract Test: Shutdown Between Listings
//!
//! Constraints verified:
//! - A shutdown request is honoured between listings, never inside one
//! - Listings finished before the request keep all their writes
//! - An interrupted run does not sweep vanished listings
//! - A pending rate-limit wait is cut short by the request

mod common;

use std::time::Duration;

use common::*;
use tokensync_core::store::MemoryStore;
use tokensync_core::traits::{FixedDelay, RecordStore};
use tokio::sync::watch;
use tokio::time::Instant;

#[tokio::test]
async fn shutdown_before_run_processes_nothing() {
    let old = addr("01d");
    let store = MemoryStore::with_records([(old.clone(), active_record(7, &old))]);
    let lookup = ScriptedLookup::new().addresses(1, &[&addr("a1")]);
    let (tx, rx) = watch::channel(true);

    let (engine, _rx) = engine(vec![listing(1)], lookup.clone(), &store);
    let report = engine.with_shutdown(rx).run().await.expect("run succeeds");
    drop(tx);

    assert!(report.interrupted);
    assert_eq!(report.reconciled, 0);
    assert!(lookup.calls().is_empty());
    assert!(report.vanished_ids.is_empty());
    assert!(!store.read(&old).await.unwrap().is_deprecated());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn shutdown_mid_run_keeps_finished_listings() {
    let (a, b, old) = (addr("a1"), addr("b2"), addr("01d"));
    let store = MemoryStore::with_records([(old.clone(), active_record(7, &old))]);
    let lookup = ScriptedLookup::new()
        .addresses(1, &[&a])
        .addresses(2, &[&b]);
    let (tx, rx) = watch::channel(false);

    let (engine, _rx) = engine(vec![listing(1), listing(2)], lookup.clone(), &store);
    let report = engine
        .with_throttle(Box::new(ShutdownAfter::new(2, tx)))
        .with_shutdown(rx)
        .run()
        .await
        .expect("run succeeds");

    assert!(report.interrupted);
    assert_eq!(report.reconciled, 1);
    assert_eq!(lookup.calls(), vec![1]);
    assert_eq!(store.read(&a).await.unwrap().id, 1);
    assert!(store.read(&b).await.is_err(), "listing 2 was never reconciled");
    assert!(report.vanished_ids.is_empty());
    assert!(!store.read(&old).await.unwrap().is_deprecated());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cuts_rate_limit_wait_short() {
    let store = MemoryStore::new();
    let lookup = ScriptedLookup::new()
        .addresses(1, &[&addr("a1")])
        .addresses(2, &[&addr("a2")]);
    let (tx, rx) = watch::channel(false);

    let (engine, _rx) = engine(vec![listing(1), listing(2)], lookup, &store);
    let engine = engine
        .with_throttle(Box::new(FixedDelay::default()))
        .with_shutdown(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send(true);
    });

    let start = Instant::now();
    let report = engine.run().await.expect("run succeeds");

    assert!(report.interrupted);
    assert_eq!(report.reconciled, 0);
    assert!(start.elapsed() < Duration::from_secs(12));
}

#[tokio::test]
async fn dropped_shutdown_sender_runs_to_completion() {
    let store = MemoryStore::new();
    let lookup = ScriptedLookup::new().addresses(1, &[&addr("a1")]);
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let (engine, _rx) = engine(vec![listing(1)], lookup, &store);
    let report = engine.with_shutdown(rx).run().await.expect("run succeeds");

    assert!(!report.interrupted);
    assert_eq!(report.reconciled, 1);
}

//! Contract Test: Idempotent Runs
//!
//! Re-running with the same feed and lookup answers must not change the
//! catalog.
//!
//! Constraints verified:
//! - A second run over unchanged inputs leaves every record identical
//! - YAML files are rewritten byte for byte
//! - Deprecated records stay out of the default index, so they are never
//!   deprecated twice

mod common;

use common::*;
use tokensync_core::store::{MemoryStore, YamlDirStore};
use tokensync_core::traits::{NoDelay, RecordStore};
use tokensync_core::{IndexMode, SyncEngine, index_store};

#[tokio::test]
async fn second_run_leaves_records_unchanged() {
    let (a, b, c) = (addr("aaa"), addr("bbb"), addr("ccc"));
    let store = MemoryStore::with_records([
        (a.clone(), active_record(1, &a)),
        (b.clone(), active_record(1, &b)),
    ]);
    let lookup = ScriptedLookup::new().addresses(1, &[&b, &c]);

    let (first, _rx) = engine(vec![listing(1)], lookup.clone(), &store);
    let first_report = first.run().await.expect("first run succeeds");
    assert_eq!(first_report.deprecated, 1);
    let after_first = store.snapshot().await;

    let (second, _rx) = engine(vec![listing(1)], lookup, &store);
    let second_report = second.run().await.expect("second run succeeds");

    assert_eq!(store.snapshot().await, after_first);
    assert_eq!(second_report.deprecated, 0, "already deprecated record is left alone");
    assert_eq!(second_report.written, 2);
}

#[tokio::test]
async fn deprecated_records_never_reenter_default_index() {
    let a = addr("aaa");
    let store = MemoryStore::with_records([(a.clone(), deprecated_record(9))]);

    let index = index_store(&store, IndexMode::ExcludeDeprecated).await.unwrap();
    assert!(index.is_empty());

    let full = index_store(&store, IndexMode::IncludeDeprecated).await.unwrap();
    assert!(full[&9].contains(&a));

    // Listing 9 still in the feed with nothing reported: nothing to deprecate.
    let lookup = ScriptedLookup::new().addresses(9, &[]);
    let (engine, _rx) = engine(vec![listing(9)], lookup, &store);
    let report = engine.run().await.expect("run succeeds");

    assert_eq!(report.deprecated, 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn yaml_files_are_rewritten_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (addr("aaa"), addr("bbb"));

    let seed = YamlDirStore::new(dir.path()).await.unwrap();
    seed.write(&a, &active_record(1, &a)).await.unwrap();

    let lookup = ScriptedLookup::new().addresses(1, &[&b]);

    let run = |lookup: ScriptedLookup| {
        let path = dir.path().to_path_buf();
        async move {
            let store = YamlDirStore::new(&path).await.unwrap();
            let (engine, _rx) = SyncEngine::new(
                Box::new(StaticFeed::new(vec![listing(1)])),
                Box::new(lookup),
                Box::new(store),
                test_config(),
            )
            .unwrap();
            engine
                .with_throttle(Box::new(NoDelay))
                .run()
                .await
                .expect("run succeeds")
        }
    };

    run(lookup.clone()).await;
    let a_first = std::fs::read(dir.path().join(format!("{}.yaml", a))).unwrap();
    let b_first = std::fs::read(dir.path().join(format!("{}.yaml", b))).unwrap();
    let a_text = String::from_utf8(a_first.clone()).unwrap();
    assert!(a_text.contains("_DEPRECATED: true"));
    assert!(!a_text.contains("address:"));

    run(lookup).await;
    let a_second = std::fs::read(dir.path().join(format!("{}.yaml", a))).unwrap();
    let b_second = std::fs::read(dir.path().join(format!("{}.yaml", b))).unwrap();

    assert_eq!(a_first, a_second);
    assert_eq!(b_first, b_second);
}

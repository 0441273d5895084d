use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;

use pitchlens::event_store::EventStore;
use pitchlens::source::{CachedSource, Competition, EventSource};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn ingested_store(path: &std::path::Path) -> EventStore {
    let store = EventStore::open(path).expect("store should open");
    let listing = read_fixture("matches.json");
    let events = read_fixture("events_nested.json");
    let summary = store
        .ingest_with(Competition::EURO_2024, &listing, |id| {
            if id == 3942226 {
                Ok(events.clone())
            } else {
                Err(anyhow!("not mirrored"))
            }
        })
        .expect("ingest should run");
    assert_eq!(summary.matches_total, 3);
    assert_eq!(summary.matches_stored, 1);
    assert_eq!(summary.events_stored, 20);
    assert_eq!(summary.errors.len(), 2);
    store
}

#[test]
fn ingested_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("open_data.sqlite");
    drop(ingested_store(&path));

    let store = EventStore::open(&path).expect("store should reopen");
    let matches = store.matches(Competition::EURO_2024).expect("listing");
    let ids: Vec<u64> = matches.iter().map(|m| m.match_id).collect();
    assert_eq!(ids, vec![3930158, 3942226, 3943043]);
    assert_eq!(store.events(3942226).expect("events").len(), 20);
    assert!(store.events(3930158).is_err());

    // Failed matches are skipped when loading a whole competition.
    let all = store
        .competition_events(Competition::EURO_2024)
        .expect("competition events");
    assert_eq!(all.len(), 20);
}

#[test]
fn cached_store_shares_loaded_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ingested_store(&dir.path().join("cache.sqlite"));
    let cached = CachedSource::new(store, 4);

    let a = cached.events_shared(3942226).expect("events");
    let b = cached.events_shared(3942226).expect("events");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(cached.events_shared(1).is_err());

    let stats = cached.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.evictions, 0);
}

//! Integration tests for the cache manager's public API
//!
//! Each test opens its own file-backed store in a temp directory.

use chrono::NaiveDate;
use earnings_cache::cache::{CacheManager, RetentionPolicy};
use earnings_cache::data::{AnalystSnapshot, DataSource, EarningsEvent};
use tempfile::TempDir;

fn open_temp_cache() -> (TempDir, CacheManager) {
    let dir = TempDir::new().expect("temp dir");
    let cache = CacheManager::open(dir.path().join("earnings_cache.db"), RetentionPolicy::default())
        .expect("open cache");
    (dir, cache)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn aapl_event() -> EarningsEvent {
    EarningsEvent::new("AAPL", "Apple Inc.", date(2024, 1, 25), "Q1 2024", 2024)
        .with_source(DataSource::external("test"))
}

#[test]
fn test_event_upsert_replaces_estimate_with_actual() {
    let (_dir, cache) = open_temp_cache();

    let first = aapl_event().with_eps(Some(2.10), None);
    assert_eq!(cache.put_events(&[first]), 1);

    let events = cache.get_events(Some("AAPL"), None, None);
    assert_eq!(events[0].beat_estimate, None, "no beat without actuals");

    let second = aapl_event()
        .with_eps(Some(2.10), Some(2.18))
        .with_revenue(Some(117.5e9), Some(119.6e9));
    assert_eq!(cache.put_events(&[second]), 1);

    let events = cache.get_events(Some("AAPL"), None, None);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].eps_actual, Some(2.18));
    assert_eq!(events[0].beat_estimate, Some(true));
    assert!(events[0].last_updated.is_some());
}

#[test]
fn test_snapshot_upsert_keeps_one_row_per_symbol() {
    let (_dir, cache) = open_temp_cache();

    assert!(cache.put_snapshot(&AnalystSnapshot::new("AAPL", 230.50)));
    assert_eq!(cache.get_snapshot("AAPL").unwrap().current_price, 230.50);

    assert!(cache.put_snapshot(&AnalystSnapshot::new("AAPL", 235.00)));
    assert_eq!(cache.get_snapshot("AAPL").unwrap().current_price, 235.00);
    assert_eq!(cache.stats().snapshot_count, 1);
}

#[test]
fn test_range_query_is_inclusive_and_sorted() {
    let (_dir, cache) = open_temp_cache();
    let events: Vec<EarningsEvent> = [
        ("MSFT", date(2024, 1, 30)),
        ("AAPL", date(2024, 1, 25)),
        ("NVDA", date(2024, 2, 21)),
        ("GOOGL", date(2024, 1, 30)),
        ("TSLA", date(2024, 1, 24)),
    ]
    .iter()
    .map(|(symbol, d)| EarningsEvent::new(*symbol, *symbol, *d, "Q1 2024", 2024))
    .collect();
    assert_eq!(cache.put_events(&events), 5);

    let in_range = cache.get_events(None, Some(date(2024, 1, 25)), Some(date(2024, 1, 30)));
    let symbols: Vec<&str> = in_range.iter().map(|e| e.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "GOOGL", "MSFT"]);
}

#[test]
fn test_malformed_record_is_skipped() {
    let (_dir, cache) = open_temp_cache();
    let good = aapl_event();
    let bad = EarningsEvent::new("  ", "Nobody", date(2024, 1, 26), "Q1 2024", 2024);
    let nan = EarningsEvent::new("MSFT", "Microsoft Corp.", date(2024, 1, 30), "Q2 2024", 2024)
        .with_eps(Some(f64::NAN), None);

    assert_eq!(cache.put_events(&[good, bad, nan]), 1);
    assert_eq!(cache.stats().event_count, 1);
}

#[test]
fn test_export_import_into_fresh_store() {
    let (dir, source) = open_temp_cache();
    let events = vec![
        aapl_event().with_eps(Some(2.10), Some(2.18)),
        EarningsEvent::new("MSFT", "Microsoft Corp.", date(2024, 1, 30), "Q2 2024", 2024)
            .with_revenue(Some(61.1e9), None),
    ];
    source.put_events(&events);

    let export_path = source
        .export_json(Some(&dir.path().join("export.json")))
        .expect("export");

    let (_other_dir, target) = open_temp_cache();
    assert_eq!(target.import_json(&export_path).expect("import"), 2);
    assert_eq!(target.import_json(&export_path).expect("re-import"), 2);

    let strip = |mut list: Vec<EarningsEvent>| {
        for e in &mut list {
            e.last_updated = None;
        }
        list
    };
    assert_eq!(
        strip(target.get_events(None, None, None)),
        strip(source.get_events(None, None, None))
    );
    assert_eq!(target.stats().event_count, 2);
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("earnings_cache.db");

    {
        let cache = CacheManager::open(&path, RetentionPolicy::default()).unwrap();
        cache.put_events(&[aapl_event()]);
        cache.put_snapshot(&AnalystSnapshot::new("AAPL", 230.50));
    }

    let cache = CacheManager::open(&path, RetentionPolicy::default()).unwrap();
    let stats = cache.stats();
    assert_eq!(stats.event_count, 1);
    assert_eq!(stats.snapshot_count, 1);
    assert!(stats.latest_event_update.is_some());
}

#[test]
fn test_sweep_keeps_recent_records() {
    let (_dir, cache) = open_temp_cache();
    cache.put_events(&[aapl_event()]);
    cache.put_snapshot(&AnalystSnapshot::new("AAPL", 230.50));

    assert_eq!(cache.sweep_expired(), 0);
    assert_eq!(cache.stats().event_count, 1);
    assert_eq!(cache.stats().snapshot_count, 1);
}

#[test]
fn test_event_detail_joins_snapshot() {
    let (_dir, cache) = open_temp_cache();
    cache.put_events(&[aapl_event()]);

    let detail = cache.event_detail("AAPL", date(2024, 1, 25)).unwrap();
    assert!(detail.snapshot.is_none());
    assert!(!detail.is_future);

    cache.put_snapshot(&AnalystSnapshot::new("AAPL", 230.50));
    let detail = cache.event_detail("aapl", date(2024, 1, 25)).unwrap();
    assert_eq!(detail.snapshot.unwrap().current_price, 230.50);

    assert!(cache.event_detail("AAPL", date(2024, 4, 25)).is_none());
}

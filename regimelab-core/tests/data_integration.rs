//! CSV provider + cache feeding the classifier, as the alert service does.

mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use regimelab_core::clock::FixedClock;
use regimelab_core::data::{
    BarCache, CacheKey, CachedProvider, CsvProvider, DataProvider, MemoryCache,
};
use regimelab_core::regime::RegimeClassifier;

#[test]
fn csv_bars_round_trip_into_classifier() {
    let dir = tempfile::tempdir().unwrap();
    let bars = common::regime_switching_bars(180, 40, 99);
    CsvProvider::write_file(&dir.path().join("ABC.csv"), &bars).unwrap();

    let provider = CsvProvider::new(dir.path());
    let start = bars[0].date;
    let end = bars.last().unwrap().date;
    let loaded = provider.fetch("ABC", start, end).unwrap();
    assert_eq!(loaded.len(), bars.len());

    let fit = RegimeClassifier::default().classify(&loaded).unwrap();
    assert_eq!(fit.current().date, end);
}

#[test]
fn cached_provider_serves_until_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let bars = common::linear_bars(60, 50.0, 0.5);
    CsvProvider::write_file(&dir.path().join("XYZ.csv"), &bars).unwrap();

    let start_time = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(start_time));
    let cache = MemoryCache::with_clock(Duration::hours(1), clock.clone());
    let provider = CachedProvider::new(CsvProvider::new(dir.path()), cache);
    let (start, end) = (bars[0].date, bars.last().unwrap().date);

    assert_eq!(provider.fetch("XYZ", start, end).unwrap().len(), 60);

    // the cached copy survives the file disappearing
    std::fs::remove_file(dir.path().join("XYZ.csv")).unwrap();
    assert_eq!(provider.fetch("xyz", start, end).unwrap().len(), 60);

    clock.advance(Duration::hours(2));
    let cached = provider.cache().get(&CacheKey::new("XYZ", start, end));
    assert!(cached.is_none());
    assert!(provider.fetch("XYZ", start, end).is_err());
}

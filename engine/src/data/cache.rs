// Time-to-live memoization in front of any PriceFetcher.
use super::PriceFetcher;
use crate::error::FetchFailure;
use chrono::NaiveDate;
use shared::models::{PriceSeries, Symbol};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

type CacheKey = (Symbol, NaiveDate, NaiveDate);

/// Reuses successful fetches until `ttl` elapses, then fetches again.
///
/// Failures are never cached. Expired entries are dropped on the next miss.
pub struct CachedFetcher<F> {
    inner: F,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, PriceSeries)>>,
}

impl<F: PriceFetcher> CachedFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        CachedFetcher {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<PriceSeries> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, series)| series.clone())
    }
}

impl<F: PriceFetcher> PriceFetcher for CachedFetcher<F> {
    fn fetch(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
        let key = (symbol.clone(), start, end);
        if let Some(series) = self.lookup(&key) {
            tracing::debug!(%symbol, "Price cache hit");
            return Ok(series);
        }

        // Lock is not held across the fetch; two racing misses both fetch.
        let series = self.inner.fetch(symbol, start, end)?;
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), series.clone()));
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PricePoint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl PriceFetcher for CountingFetcher {
        fn fetch(&self, symbol: &Symbol, start: NaiveDate, _end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchFailure::Source("offline".to_string()));
            }
            Ok(PriceSeries::new(symbol.clone(), vec![PricePoint::new(start, 1.0)]))
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = CachedFetcher::new(CountingFetcher { calls: AtomicUsize::new(0), fail: false }, Duration::from_secs(3600));
        let aapl = Symbol::new("AAPL");
        cache.fetch(&aapl, day(1), day(10)).unwrap();
        cache.fetch(&aapl, day(1), day(10)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);

        // A different range is a different key.
        cache.fetch(&aapl, day(2), day(10)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_refetch_after_expiry() {
        let cache = CachedFetcher::new(CountingFetcher { calls: AtomicUsize::new(0), fail: false }, Duration::ZERO);
        let aapl = Symbol::new("AAPL");
        cache.fetch(&aapl, day(1), day(10)).unwrap();
        cache.fetch(&aapl, day(1), day(10)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let cache = CachedFetcher::new(CountingFetcher { calls: AtomicUsize::new(0), fail: false }, Duration::ZERO);
        for d in 1..=5 {
            cache.fetch(&Symbol::new("AAPL"), day(d), day(20)).unwrap();
        }
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = CachedFetcher::new(CountingFetcher { calls: AtomicUsize::new(0), fail: true }, Duration::from_secs(3600));
        let aapl = Symbol::new("AAPL");
        assert!(cache.fetch(&aapl, day(1), day(10)).is_err());
        assert!(cache.fetch(&aapl, day(1), day(10)).is_err());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }
}

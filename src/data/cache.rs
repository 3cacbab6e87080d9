//! Time-boxed cache in front of a price-fetch collaborator.
//!
//! The cache is an explicit value handed to the dashboard, keyed by the
//! sorted symbol set and span. Only successful fetches are stored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::{Span, Symbol};
use crate::error::FetchError;

use super::RawPriceFrame;

/// Cache key: sorted, de-duplicated symbols plus span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    symbols: Vec<Symbol>,
    span: Span,
}

impl CacheKey {
    pub fn new(symbols: &[Symbol], span: Span) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort();
        symbols.dedup();
        Self { symbols, span }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// Cache collaborator contract.
pub trait PriceCache {
    /// Return the cached frame for `key` if younger than `ttl`, otherwise call
    /// `fetch`, store its result on success, and return it.
    fn get_or_fetch(
        &mut self,
        key: &CacheKey,
        ttl: Duration,
        fetch: &mut dyn FnMut() -> Result<RawPriceFrame, FetchError>,
    ) -> Result<RawPriceFrame, FetchError>;

    /// Drop the entry for `key`, if any.
    fn invalidate(&mut self, key: &CacheKey);
}

struct Entry {
    frame: RawPriceFrame,
    fetched_at: Instant,
}

/// In-process cache with a monotonic clock.
#[derive(Default)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// [`PriceCache::get_or_fetch`] with an explicit "now".
    pub fn get_or_fetch_at(
        &mut self,
        key: &CacheKey,
        ttl: Duration,
        now: Instant,
        fetch: &mut dyn FnMut() -> Result<RawPriceFrame, FetchError>,
    ) -> Result<RawPriceFrame, FetchError> {
        if let Some(entry) = self.entries.get(key) {
            let age = now.saturating_duration_since(entry.fetched_at);
            if age < ttl {
                debug!(?key, age_secs = age.as_secs(), "price cache hit");
                return Ok(entry.frame.clone());
            }
            debug!(?key, age_secs = age.as_secs(), "price cache entry expired");
        } else {
            debug!(?key, "price cache miss");
        }

        let frame = fetch()?;
        self.entries.insert(
            key.clone(),
            Entry {
                frame: frame.clone(),
                fetched_at: now,
            },
        );
        Ok(frame)
    }
}

impl PriceCache for MemoryCache {
    fn get_or_fetch(
        &mut self,
        key: &CacheKey,
        ttl: Duration,
        fetch: &mut dyn FnMut() -> Result<RawPriceFrame, FetchError>,
    ) -> Result<RawPriceFrame, FetchError> {
        self.get_or_fetch_at(key, ttl, Instant::now(), fetch)
    }

    fn invalidate(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            debug!(?key, "price cache invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn key() -> CacheKey {
        CacheKey::new(&[Symbol::new("B"), Symbol::new("A")], Span::OneYear)
    }

    #[test]
    fn key_ignores_symbol_order_and_duplicates() {
        let a = CacheKey::new(&[Symbol::new("B"), Symbol::new("A"), Symbol::new("A")], Span::OneYear);
        let b = CacheKey::new(&[Symbol::new("A"), Symbol::new("B")], Span::OneYear);
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::new(&[Symbol::new("A"), Symbol::new("B")], Span::TwoYears));
    }

    #[test]
    fn hit_within_ttl_skips_fetch() {
        let mut cache = MemoryCache::new();
        let t0 = Instant::now();
        let mut calls = 0;
        let mut fetch = || -> Result<RawPriceFrame, FetchError> {
            calls += 1;
            Ok(RawPriceFrame::empty())
        };

        cache.get_or_fetch_at(&key(), HOUR, t0, &mut fetch).unwrap();
        cache
            .get_or_fetch_at(&key(), HOUR, t0 + Duration::from_secs(1800), &mut fetch)
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn expired_entry_is_refetched() {
        let mut cache = MemoryCache::new();
        let t0 = Instant::now();
        let mut calls = 0;
        let mut fetch = || -> Result<RawPriceFrame, FetchError> {
            calls += 1;
            Ok(RawPriceFrame::empty())
        };

        cache.get_or_fetch_at(&key(), HOUR, t0, &mut fetch).unwrap();
        cache
            .get_or_fetch_at(&key(), HOUR, t0 + HOUR + Duration::from_secs(1), &mut fetch)
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let mut cache = MemoryCache::new();
        let mut calls = 0;
        let mut fetch = || -> Result<RawPriceFrame, FetchError> {
            calls += 1;
            Ok(RawPriceFrame::empty())
        };

        cache.get_or_fetch(&key(), HOUR, &mut fetch).unwrap();
        cache.invalidate(&key());
        assert!(cache.is_empty());
        cache.get_or_fetch(&key(), HOUR, &mut fetch).unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = MemoryCache::new();
        let mut fail = || -> Result<RawPriceFrame, FetchError> { Err(FetchError::Invalid("boom".to_string())) };
        assert!(cache.get_or_fetch(&key(), HOUR, &mut fail).is_err());
        assert!(cache.is_empty());
    }
}

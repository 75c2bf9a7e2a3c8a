use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::FUND_CATALOG;
use crate::types::{FundQuote, SpotGold};

// ---------------------------------------------------------------------------
// Stored entries
// ---------------------------------------------------------------------------

/// A cached quote plus the instant it was fetched.
#[derive(Debug, Clone)]
struct StoredQuote {
    quote: FundQuote,
    fetched_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct StoredSpot {
    spot: SpotGold,
    fetched_at: Instant,
}

// ---------------------------------------------------------------------------
// QuoteStore
// ---------------------------------------------------------------------------

/// In-memory cache of the latest quote per fund plus the latest spot sample.
/// Writers replace whole entries; readers always see the last good value.
/// Freshness is reported via `is_fresh`, never enforced.
pub struct QuoteStore {
    /// symbol → latest quote
    quotes: DashMap<String, StoredQuote>,
    /// Latest accepted spot gram-gold sample.
    spot: RwLock<Option<StoredSpot>>,
}

impl QuoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            quotes: DashMap::new(),
            spot: RwLock::new(None),
        })
    }

    pub fn insert_quote(&self, quote: FundQuote) {
        self.quotes.insert(
            quote.symbol.clone(),
            StoredQuote {
                quote,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn get_quote(&self, symbol: &str) -> Option<FundQuote> {
        self.quotes.get(symbol).map(|entry| entry.quote.clone())
    }

    /// Cached quotes in catalog order. Funds with no cached quote yet are
    /// skipped, so the result length can be below the catalog size.
    pub fn snapshot(&self) -> Vec<FundQuote> {
        FUND_CATALOG
            .iter()
            .filter_map(|spec| self.get_quote(spec.symbol))
            .collect()
    }

    pub fn set_spot(&self, spot: SpotGold) {
        if let Ok(mut slot) = self.spot.write() {
            *slot = Some(StoredSpot {
                spot,
                fetched_at: Instant::now(),
            });
        }
    }

    pub fn spot(&self) -> Option<SpotGold> {
        self.spot.read().ok().and_then(|slot| *slot).map(|s| s.spot)
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    /// Age of the oldest cached quote. None while the store is empty.
    pub fn oldest_quote_age(&self) -> Option<Duration> {
        self.quotes
            .iter()
            .map(|entry| entry.fetched_at.elapsed())
            .max()
    }

    /// True when every cached quote and the spot sample are younger than
    /// `ttl`. An empty store is never fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        if self.quotes.is_empty() {
            return false;
        }
        let quotes_fresh = self
            .quotes
            .iter()
            .all(|entry| entry.fetched_at.elapsed() <= ttl);
        let spot_fresh = self
            .spot
            .read()
            .ok()
            .and_then(|slot| *slot)
            .map(|s| s.fetched_at.elapsed() <= ttl)
            .unwrap_or(false);
        quotes_fresh && spot_fresh
    }
}

impl Default for QuoteStore {
    fn default() -> Self {
        Self {
            quotes: DashMap::new(),
            spot: RwLock::new(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_quote(symbol: &str, price: f64) -> FundQuote {
        FundQuote {
            symbol: symbol.to_string(),
            name: format!("{symbol} Fund"),
            current_price: price,
            change_percent: None,
            volume: None,
            nav_price: None,
            expense_ratio: None,
            stopaj_rate: None,
            last_updated: None,
            gold_backing_grams: None,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = QuoteStore::new();
        store.insert_quote(test_quote("ZGOLD", 62.5));

        let quote = store.get_quote("ZGOLD").unwrap();
        assert!((quote.current_price - 62.5).abs() < 1e-9);
        assert!(store.get_quote("GLDTR").is_none());
    }

    #[test]
    fn snapshot_follows_catalog_order() {
        let store = QuoteStore::new();
        // Insert out of catalog order on purpose.
        store.insert_quote(test_quote("ISGLK", 30.0));
        store.insert_quote(test_quote("ZGOLD", 62.5));

        let snapshot = store.snapshot();
        let symbols: Vec<&str> = snapshot.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ZGOLD", "ISGLK"]);
    }

    #[test]
    fn spot_round_trips() {
        let store = QuoteStore::new();
        assert!(store.spot().is_none());

        store.set_spot(SpotGold {
            try_per_gram: 4321.0,
            gold_usd_per_oz: 2500.0,
            usd_try: 34.0,
        });
        let spot = store.spot().unwrap();
        assert!((spot.try_per_gram - 4321.0).abs() < 1e-9);
    }

    #[test]
    fn empty_store_is_never_fresh() {
        let store = QuoteStore::new();
        assert!(!store.is_fresh(Duration::from_secs(60)));
    }

    #[test]
    fn freshness_requires_quotes_and_spot() {
        let store = QuoteStore::new();
        store.insert_quote(test_quote("ZGOLD", 62.5));
        // Quote cached but no spot sample yet.
        assert!(!store.is_fresh(Duration::from_secs(60)));

        store.set_spot(SpotGold {
            try_per_gram: 4321.0,
            gold_usd_per_oz: 2500.0,
            usd_try: 34.0,
        });
        assert!(store.is_fresh(Duration::from_secs(60)));
    }

    #[test]
    fn oldest_quote_age_tracks_inserts() {
        let store = QuoteStore::new();
        assert!(store.oldest_quote_age().is_none());

        store.insert_quote(test_quote("ZGOLD", 62.5));
        assert!(store.oldest_quote_age().is_some());
    }
}

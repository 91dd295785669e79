//! Quote cache keyed by (pay, receive, amount) with lazy TTL eviction
//!
//! The cache is advisory: concurrent misses for the same key may both
//! run the underlying fetch. Stale entries are evicted on read, never
//! by a background sweep.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::Quote;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub pay_symbol: String,
    pub receive_symbol: String,
    pub pay_amount: String,
}

/// Cache statistics for the status API
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct QuoteCache {
    entries: DashMap<QuoteKey, Arc<Quote>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fetch a live entry, evicting it first if stale
    pub fn get(&self, key: &QuoteKey) -> Option<Arc<Quote>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_stale(self.ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value().clone());
            }
        }
        // Stale or absent: drop the read guard before removing
        self.entries.remove_if(key, |_, quote| quote.is_stale(self.ttl));
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, key: QuoteKey, quote: Arc<Quote>) {
        self.entries.insert(key, quote);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

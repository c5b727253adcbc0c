//! Bounded, time-expiring LRU store shared by the capture and OCR layers.
//!
//! Capacity and TTL are independent and each may be unbounded. An entry older
//! than the TTL is treated as absent even before the sweep removes it.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

mod key;

pub use key::{CacheKey, fingerprint};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

struct Inner<V> {
    entries: LruCache<CacheKey, Entry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

pub struct ResultCache<V> {
    name: &'static str,
    capacity: Option<usize>,
    ttl: Option<Duration>,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> ResultCache<V> {
    /// `capacity` of `None` (or zero) means unbounded, `ttl` of `None` means no expiry
    pub fn new(name: &'static str, capacity: Option<usize>, ttl: Option<Duration>) -> Self {
        let capacity = capacity.and_then(NonZeroUsize::new);
        let entries = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        Self {
            name,
            capacity: capacity.map(NonZeroUsize::get),
            ttl,
            inner: Mutex::new(Inner {
                entries,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Hit promotes the entry to most recently used; an expired entry is
    /// removed and counted as a miss
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        let mut inner = self.inner.lock();

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (entry.inserted_at, entry.value.clone()));

        match lookup {
            Some((inserted_at, value)) if !self.is_expired(inserted_at, now) => {
                inner.hits += 1;
                Some(value)
            }
            Some(_) => {
                inner.entries.pop(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, value: V) {
        self.put_at(key, value, Instant::now());
    }

    /// Inserts or replaces; when full the least recently used entry is evicted first
    pub fn put_at(&self, key: CacheKey, value: V, now: Instant) {
        let mut inner = self.inner.lock();

        let replacing = inner.entries.contains(&key);
        let displaced = inner.entries.push(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );

        if displaced.is_some() && !replacing {
            inner.evictions += 1;
        }
    }

    /// Drops every entry older than the TTL, returns how many were removed
    pub fn clear_expired(&self, now: Instant) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let mut inner = self.inner.lock();
        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry.inserted_at, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key);
        }

        if !expired.is_empty() {
            tracing::debug!("[CACHE:{}] swept {} expired entries", self.name, expired.len());
        }

        expired.len()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;

        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }

    fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(inserted_at) > ttl,
            None => false,
        }
    }
}

//! Result memoization keyed by canonical parameter text.

use dashmap::DashMap;
use parking_lot::RwLock;
use sweep_types::Report;

/// In-memory cache of evaluated candidates for one run.
///
/// A key, once recorded, keeps its first report: every unique parameter
/// combination is evaluated at most once. There is no eviction.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<String, Report>,
    stats: RwLock<CacheStats>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache with results from an earlier run.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Report)>) -> Self {
        let cache = Self::new();
        for (key, report) in entries {
            cache.entries.insert(key, report);
        }
        cache
    }

    pub fn lookup(&self, key: &str) -> Option<Report> {
        let found = self.entries.get(key).map(|entry| entry.value().clone());

        let mut stats = self.stats.write();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        found
    }

    /// Store `report` under `key`. Returns `false` and keeps the existing
    /// report when the key is already present.
    pub fn record(&self, key: impl Into<String>, report: Report) -> bool {
        let key = key.into();
        let inserted = match self.entries.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(report);
                true
            }
        };

        let mut stats = self.stats.write();
        if inserted {
            stats.stores += 1;
        } else {
            stats.rejected_overwrites += 1;
        }

        inserted
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key-sorted snapshot for the reporting side.
    pub fn entries(&self) -> Vec<(String, Report)> {
        let mut snapshot: Vec<(String, Report)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub rejected_overwrites: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

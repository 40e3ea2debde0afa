//! In-memory geocode cache, scoped to one run.

use hashbrown::HashMap;

use crate::models::Coordinate;

/// Stored outcome for an address that has already been attempted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachedLookup {
    Resolved(Coordinate),
    /// Every provider was tried and none produced a coordinate
    Failed,
}

impl CachedLookup {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            CachedLookup::Resolved(c) => Some(*c),
            CachedLookup::Failed => None,
        }
    }
}

impl From<Option<Coordinate>> for CachedLookup {
    fn from(value: Option<Coordinate>) -> Self {
        match value {
            Some(c) => CachedLookup::Resolved(c),
            None => CachedLookup::Failed,
        }
    }
}

/// Address text → outcome. Keys are the exact trimmed address.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: HashMap<String, CachedLookup>,
    hits: usize,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an address, counting a hit when found.
    pub fn get(&mut self, address: &str) -> Option<CachedLookup> {
        let entry = self.entries.get(address).copied();
        if entry.is_some() {
            self.hits += 1;
        }
        entry
    }

    /// Store an outcome. An existing entry is never overwritten.
    pub fn insert(&mut self, address: &str, lookup: CachedLookup) -> CachedLookup {
        *self.entries.entry(address.to_string()).or_insert(lookup)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of cached addresses that could not be geocoded
    pub fn failures(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, CachedLookup::Failed))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_vs_failed() {
        let mut cache = GeocodeCache::new();
        assert_eq!(cache.get("1 Main St"), None);

        cache.insert("1 Main St", CachedLookup::Failed);
        assert_eq!(cache.get("1 Main St"), Some(CachedLookup::Failed));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.failures(), 1);
    }

    #[test]
    fn test_entries_are_immutable() {
        let mut cache = GeocodeCache::new();
        let first = Coordinate::new(35.0, -110.0).unwrap();
        let second = Coordinate::new(0.0, 0.0).unwrap();

        cache.insert("addr", CachedLookup::Resolved(first));
        let kept = cache.insert("addr", CachedLookup::Resolved(second));

        assert_eq!(kept, CachedLookup::Resolved(first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_exact() {
        let mut cache = GeocodeCache::new();
        cache.insert("1 Main St", CachedLookup::Failed);
        assert_eq!(cache.get("1 MAIN ST"), None);
    }
}

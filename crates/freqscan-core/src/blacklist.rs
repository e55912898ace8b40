//! Blacklist and frequency-name cache
//!
//! The blacklist is a flat vector scanned linearly with a process-wide match
//! tolerance; it is typically well under a hundred entries and read on every
//! candidate frequency, where a linear pass with early exit beats any hashed
//! structure. The name cache memoizes catalog name lookups per frequency and
//! is dropped wholesale whenever the catalog or the blacklist changes.

use std::collections::HashMap;

use crate::catalog::{FrequencyCatalog, NAME_MATCH_TOLERANCE};
use crate::types::Hz;

/// Default blacklist match radius in Hz.
pub const DEFAULT_BLACKLIST_TOLERANCE: Hz = 1_000.0;
/// Smallest accepted match radius.
pub const MIN_BLACKLIST_TOLERANCE: Hz = 100.0;
/// Largest accepted match radius.
pub const MAX_BLACKLIST_TOLERANCE: Hz = 100_000.0;

/// Set of frequencies the scanner must never stop on.
#[derive(Debug, Clone)]
pub struct Blacklist {
    freqs: Vec<Hz>,
    tolerance: Hz,
    generation: u64,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new()
    }
}

impl Blacklist {
    pub fn new() -> Self {
        Self {
            freqs: Vec::new(),
            tolerance: DEFAULT_BLACKLIST_TOLERANCE,
            generation: 0,
        }
    }

    /// Rebuild from persisted parts; the tolerance is clamped into range.
    pub fn from_parts(freqs: Vec<Hz>, tolerance: Hz) -> Self {
        let mut blacklist = Self::new();
        blacklist.freqs = freqs;
        blacklist.tolerance = tolerance.clamp(MIN_BLACKLIST_TOLERANCE, MAX_BLACKLIST_TOLERANCE);
        blacklist
    }

    pub fn freqs(&self) -> &[Hz] {
        &self.freqs
    }

    pub fn tolerance(&self) -> Hz {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Monotonic edit counter, mirrored by dependent caches.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` when `freq` lies within the tolerance of any entry.
    pub fn contains(&self, freq: Hz) -> bool {
        self.freqs.iter().any(|&b| (freq - b).abs() < self.tolerance)
    }

    /// Add a frequency unless an entry already matches it within the
    /// tolerance. Returns whether the entry was added.
    pub fn add(&mut self, freq: Hz) -> bool {
        if freq <= 0.0 || self.contains(freq) {
            return false;
        }
        self.freqs.push(freq);
        self.generation += 1;
        true
    }

    /// Remove the exact entry, if present.
    pub fn remove(&mut self, freq: Hz) -> bool {
        let before = self.freqs.len();
        self.freqs.retain(|&b| b != freq);
        if self.freqs.len() != before {
            self.generation += 1;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        if !self.freqs.is_empty() {
            self.freqs.clear();
            self.generation += 1;
        }
    }

    pub fn set_tolerance(&mut self, tolerance: Hz) {
        let clamped = tolerance.clamp(MIN_BLACKLIST_TOLERANCE, MAX_BLACKLIST_TOLERANCE);
        if clamped != self.tolerance {
            self.tolerance = clamped;
            self.generation += 1;
        }
    }
}

/// Lazy frequency-to-name cache over the catalog.
///
/// Keys are frequencies rounded to whole Hz. The cache tracks the catalog
/// and blacklist generations it was filled against and self-clears when
/// either moves.
#[derive(Debug, Default)]
pub struct NameCache {
    map: HashMap<i64, Option<String>>,
    catalog_generation: u64,
    blacklist_generation: u64,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Cached name lookup; fills misses from the catalog.
    pub fn lookup(
        &mut self,
        freq: Hz,
        catalog: &FrequencyCatalog,
        blacklist: &Blacklist,
    ) -> Option<String> {
        if self.catalog_generation != catalog.generation()
            || self.blacklist_generation != blacklist.generation()
        {
            self.map.clear();
            self.catalog_generation = catalog.generation();
            self.blacklist_generation = blacklist.generation();
        }
        let key = freq.round() as i64;
        self.map
            .entry(key)
            .or_insert_with(|| catalog.bookmark_name(freq, NAME_MATCH_TOLERANCE))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::Bookmark;
    use crate::types::DemodMode;

    #[test]
    fn test_contains_uses_tolerance() {
        let mut bl = Blacklist::new();
        bl.add(98.7e6);
        assert!(bl.contains(98.7e6));
        assert!(bl.contains(98.7e6 + 999.0));
        assert!(bl.contains(98.7e6 - 999.0));
        assert!(!bl.contains(98.7e6 + 1_000.0));
    }

    #[test]
    fn test_add_dedupes_within_tolerance() {
        let mut bl = Blacklist::new();
        assert!(bl.add(98.7e6));
        assert!(!bl.add(98.7e6 + 500.0));
        assert_eq!(bl.len(), 1);
        assert!(!bl.add(0.0));
    }

    #[test]
    fn test_tolerance_clamped() {
        let mut bl = Blacklist::new();
        bl.set_tolerance(10.0);
        assert_eq!(bl.tolerance(), MIN_BLACKLIST_TOLERANCE);
        bl.set_tolerance(1.0e9);
        assert_eq!(bl.tolerance(), MAX_BLACKLIST_TOLERANCE);
        bl.set_tolerance(5_000.0);
        assert_eq!(bl.tolerance(), 5_000.0);
    }

    #[test]
    fn test_remove_and_clear_bump_generation() {
        let mut bl = Blacklist::new();
        bl.add(98.7e6);
        bl.add(100.0e6);
        let generation = bl.generation();
        assert!(bl.remove(98.7e6));
        assert!(bl.generation() > generation);
        assert!(!bl.remove(98.7e6));

        let generation = bl.generation();
        bl.clear();
        assert!(bl.generation() > generation);
        bl.clear();
        assert_eq!(bl.generation(), generation + 1);
    }

    #[test]
    fn test_from_parts_clamps_tolerance() {
        let bl = Blacklist::from_parts(vec![98.7e6], 5.0);
        assert_eq!(bl.tolerance(), MIN_BLACKLIST_TOLERANCE);
        assert_eq!(bl.freqs(), &[98.7e6]);
    }

    #[test]
    fn test_name_cache_hits_and_invalidates() {
        let mut catalog = FrequencyCatalog::new();
        catalog
            .add_bookmark(
                "General",
                "Station",
                Bookmark::frequency(98.7e6, 200_000.0, DemodMode::Wfm),
            )
            .unwrap();
        let blacklist = Blacklist::new();
        let mut cache = NameCache::new();

        assert_eq!(
            cache.lookup(98.7e6, &catalog, &blacklist),
            Some("Station".to_string())
        );
        assert_eq!(cache.len(), 1);
        // repeated lookup is served from the cache
        cache.lookup(98.7e6, &catalog, &blacklist);
        assert_eq!(cache.len(), 1);

        // a catalog edit drops the cache
        catalog.remove_bookmark("General", "Station");
        assert_eq!(cache.lookup(98.7e6, &catalog, &blacklist), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_name_cache_invalidated_by_blacklist_edit() {
        let catalog = FrequencyCatalog::new();
        let mut blacklist = Blacklist::new();
        let mut cache = NameCache::new();

        cache.lookup(98.7e6, &catalog, &blacklist);
        cache.lookup(100.0e6, &catalog, &blacklist);
        assert_eq!(cache.len(), 2);

        blacklist.add(120.0e6);
        cache.lookup(98.7e6, &catalog, &blacklist);
        assert_eq!(cache.len(), 1);
    }
}

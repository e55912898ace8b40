//! Scan-list builder
//!
//! Flattens the selected catalog list into a sorted vector of
//! [`ScanEntry`] rows for the engine. Entries are plain handles: they copy
//! the frequency and carry the bookmark's id, and the engine re-resolves the
//! bookmark (and its profile) against the catalog at use time. A catalog
//! edit therefore invalidates entries by generation instead of leaving
//! dangling references.
//!
//! The published list is an `Arc<Vec<_>>`: rebuilding swaps the pointer and
//! readers keep whatever snapshot they already cloned until they drain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bookmark::BookmarkKind;
use crate::catalog::{BookmarkId, FrequencyCatalog};
use crate::types::Hz;

/// Rebuild even without an edit after this much wall time.
pub const SCAN_LIST_MAX_AGE: Duration = Duration::from_secs(5);

/// One row of the flattened scan list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanEntry {
    /// Target frequency in Hz.
    pub frequency: Hz,
    /// Handle of the owning bookmark; resolve against the catalog at use
    /// time.
    pub bookmark: BookmarkId,
    /// `true` when generated by expanding a band bookmark.
    pub from_band: bool,
    /// `true` when the owning bookmark carried a profile at build time.
    pub has_profile: bool,
}

/// Builds and caches the published scan list.
#[derive(Debug)]
pub struct ScanListBuilder {
    published: Arc<Vec<ScanEntry>>,
    built_generation: Option<u64>,
    built_at: Option<Instant>,
}

impl Default for ScanListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanListBuilder {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Vec::new()),
            built_generation: None,
            built_at: None,
        }
    }

    /// Current snapshot without checking freshness.
    pub fn current(&self) -> Arc<Vec<ScanEntry>> {
        Arc::clone(&self.published)
    }

    /// Catalog generation of the published list, if one was built.
    pub fn built_generation(&self) -> Option<u64> {
        self.built_generation
    }

    /// Whether a refresh would rebuild.
    pub fn is_stale(&self, catalog: &FrequencyCatalog, now: Instant) -> bool {
        match (self.built_generation, self.built_at) {
            (Some(generation), Some(at)) => {
                generation != catalog.generation() || now.duration_since(at) > SCAN_LIST_MAX_AGE
            }
            _ => true,
        }
    }

    /// Drop the cache so the next refresh rebuilds unconditionally.
    pub fn invalidate(&mut self) {
        self.built_generation = None;
        self.built_at = None;
    }

    /// Return a fresh snapshot, rebuilding when the catalog changed or the
    /// cache aged out. The swap is a single pointer store; existing readers
    /// keep their old snapshot.
    pub fn refresh(&mut self, catalog: &FrequencyCatalog, now: Instant) -> Arc<Vec<ScanEntry>> {
        if self.is_stale(catalog, now) {
            self.published = Arc::new(build_entries(catalog));
            self.built_generation = Some(catalog.generation());
            self.built_at = Some(now);
            debug!(entries = self.published.len(), "rebuilt scan list");
        }
        Arc::clone(&self.published)
    }
}

/// Expand the selected list into sorted scan entries.
///
/// Non-scannable bookmarks are skipped; invalid ones are reported and
/// skipped. A band `[a, b]` with step `s` yields exactly
/// `{a + k*s : a + k*s <= b}`. The final sort is stable, so equal
/// frequencies keep catalog insertion order.
fn build_entries(catalog: &FrequencyCatalog) -> Vec<ScanEntry> {
    let Some(list) = catalog.selected_list() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for item in list.entries() {
        if !item.bookmark.scannable {
            continue;
        }
        if let Err(err) = item.bookmark.validate(&item.name) {
            warn!(%err, "skipping invalid bookmark while building scan list");
            continue;
        }
        let has_profile = item.bookmark.profile.is_some();
        match item.bookmark.kind {
            BookmarkKind::Frequency { frequency, .. } => {
                entries.push(ScanEntry {
                    frequency,
                    bookmark: item.id,
                    from_band: false,
                    has_profile,
                });
            }
            BookmarkKind::Band {
                start_freq,
                end_freq,
                step_freq,
                ..
            } => {
                let points = ((end_freq - start_freq) / step_freq + 1e-9).floor() as usize + 1;
                for k in 0..points {
                    entries.push(ScanEntry {
                        frequency: start_freq + k as Hz * step_freq,
                        bookmark: item.id,
                        from_band: true,
                        has_profile,
                    });
                }
            }
        }
    }
    entries.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
    entries
}

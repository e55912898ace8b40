//! Frequency catalog
//!
//! Named bookmark lists with one selected list for editing and scanning.
//! Every mutation bumps a generation counter; derived views (scan list,
//! name cache, profile-apply cache) compare generations instead of holding
//! references into the catalog, so an edit can never leave a stale pointer
//! alive.
//!
//! The serialized document keeps the host's layout:
//! `{ selectedList, bookmarkDisplayMode, lists: { name -> { showOnWaterfall,
//! bookmarks: { name -> record } } } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bookmark::{Bookmark, BookmarkRecord};
use crate::types::{Hz, ScanError, ScanResult};

/// Default name-match tolerance for [`FrequencyCatalog::bookmark_name`].
pub const NAME_MATCH_TOLERANCE: Hz = 1_000.0;

/// Stable handle to a bookmark, valid until the bookmark is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookmarkId(pub u64);

/// Where bookmark labels are drawn on the host waterfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BookmarkDisplayMode {
    Off,
    #[default]
    Top,
    Bottom,
}

impl From<BookmarkDisplayMode> for u8 {
    fn from(mode: BookmarkDisplayMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for BookmarkDisplayMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BookmarkDisplayMode::Off),
            1 => Ok(BookmarkDisplayMode::Top),
            2 => Ok(BookmarkDisplayMode::Bottom),
            other => Err(format!("display mode index {other} out of range")),
        }
    }
}

/// A bookmark plus its identity inside a list.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: BookmarkId,
    pub name: String,
    pub bookmark: Bookmark,
}

/// A named bookmark list.
///
/// Entries keep insertion order; lookups are linear (lists are small and the
/// scan-list builder needs the order for its tie-break).
#[derive(Debug, Clone, Default)]
pub struct BookmarkList {
    pub show_on_waterfall: bool,
    entries: Vec<CatalogEntry>,
}

impl BookmarkList {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut CatalogEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }
}

/// A label row for the host waterfall overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallLabel {
    pub list: String,
    pub name: String,
    pub frequency: Hz,
}

/// Outcome of an import: what went in, what was skipped and why.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

/// The bookmark catalog: all lists, the selection, and the edit generation.
#[derive(Debug, Clone)]
pub struct FrequencyCatalog {
    lists: Vec<(String, BookmarkList)>,
    selected: String,
    display_mode: BookmarkDisplayMode,
    generation: u64,
    next_id: u64,
}

impl Default for FrequencyCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            lists: Vec::new(),
            selected: String::new(),
            display_mode: BookmarkDisplayMode::Top,
            generation: 0,
            next_id: 1,
        };
        catalog
            .create_list("General")
            .expect("fresh catalog accepts the default list");
        catalog.selected = "General".to_string();
        catalog
    }
}

impl FrequencyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic edit counter. Any mutation bumps it; derived caches compare
    /// against it instead of holding references.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    // ---- List management ----

    pub fn list_names(&self) -> Vec<String> {
        self.lists.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn selected_list_name(&self) -> &str {
        &self.selected
    }

    pub fn display_mode(&self) -> BookmarkDisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: BookmarkDisplayMode) {
        self.display_mode = mode;
        self.touch();
    }

    pub fn list(&self, name: &str) -> Option<&BookmarkList> {
        self.lists.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    fn list_mut(&mut self, name: &str) -> ScanResult<&mut BookmarkList> {
        self.lists
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, l)| l)
            .ok_or_else(|| ScanError::ListNotFound(name.to_string()))
    }

    /// Bookmarks of the currently selected list, in insertion order.
    pub fn selected_list(&self) -> Option<&BookmarkList> {
        self.list(&self.selected)
    }

    pub fn create_list(&mut self, name: &str) -> ScanResult<()> {
        if self.list(name).is_some() {
            return Err(ScanError::NameExists(name.to_string()));
        }
        self.lists.push((
            name.to_string(),
            BookmarkList {
                show_on_waterfall: true,
                entries: Vec::new(),
            },
        ));
        if self.selected.is_empty() {
            self.selected = name.to_string();
        }
        self.touch();
        Ok(())
    }

    pub fn rename_list(&mut self, from: &str, to: &str) -> ScanResult<()> {
        if self.list(to).is_some() {
            return Err(ScanError::NameExists(to.to_string()));
        }
        let entry = self
            .lists
            .iter_mut()
            .find(|(n, _)| n == from)
            .ok_or_else(|| ScanError::ListNotFound(from.to_string()))?;
        entry.0 = to.to_string();
        if self.selected == from {
            self.selected = to.to_string();
        }
        self.touch();
        Ok(())
    }

    pub fn delete_list(&mut self, name: &str) {
        self.lists.retain(|(n, _)| n != name);
        if self.selected == name {
            self.selected = self
                .lists
                .first()
                .map(|(n, _)| n.clone())
                .unwrap_or_default();
        }
        self.touch();
    }

    pub fn select_list(&mut self, name: &str) -> ScanResult<()> {
        if self.list(name).is_none() {
            return Err(ScanError::ListNotFound(name.to_string()));
        }
        self.selected = name.to_string();
        self.touch();
        Ok(())
    }

    pub fn set_show_on_waterfall(&mut self, list: &str, show: bool) -> ScanResult<()> {
        self.list_mut(list)?.show_on_waterfall = show;
        self.touch();
        Ok(())
    }

    // ---- Bookmark CRUD ----

    /// Add a bookmark to a list. Fails without side effects on a duplicate
    /// name or an invalid bookmark.
    pub fn add_bookmark(&mut self, list: &str, name: &str, bookmark: Bookmark) -> ScanResult<()> {
        bookmark.validate(name)?;
        if name.is_empty() {
            return Err(ScanError::InvalidBookmark {
                name: name.to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        let id = BookmarkId(self.next_id);
        let target = self.list_mut(list)?;
        if target.get(name).is_some() {
            return Err(ScanError::NameExists(name.to_string()));
        }
        target.entries.push(CatalogEntry {
            id,
            name: name.to_string(),
            bookmark,
        });
        self.next_id += 1;
        self.touch();
        Ok(())
    }

    /// Replace an existing bookmark's contents, keeping its identity.
    pub fn update_bookmark(&mut self, list: &str, name: &str, bookmark: Bookmark) -> ScanResult<()> {
        bookmark.validate(name)?;
        let target = self.list_mut(list)?;
        let entry = target
            .get_mut(name)
            .ok_or_else(|| ScanError::NotFound(name.to_string()))?;
        entry.bookmark = bookmark;
        self.touch();
        Ok(())
    }

    /// Remove a bookmark. Removing a missing name is a no-op.
    pub fn remove_bookmark(&mut self, list: &str, name: &str) {
        if let Ok(target) = self.list_mut(list) {
            let before = target.entries.len();
            target.entries.retain(|e| e.name != name);
            if target.entries.len() != before {
                self.touch();
            }
        }
    }

    pub fn set_scannable(&mut self, list: &str, name: &str, scannable: bool) -> ScanResult<()> {
        let target = self.list_mut(list)?;
        let entry = target
            .get_mut(name)
            .ok_or_else(|| ScanError::NotFound(name.to_string()))?;
        entry.bookmark.scannable = scannable;
        self.touch();
        Ok(())
    }

    /// Look a bookmark up by handle across all lists.
    pub fn resolve(&self, id: BookmarkId) -> Option<&CatalogEntry> {
        self.lists
            .iter()
            .flat_map(|(_, list)| list.entries.iter())
            .find(|entry| entry.id == id)
    }

    // ---- Import / export ----

    /// Import bookmarks from a `{ "bookmarks": { name -> record } }`
    /// document. Entries are processed independently: invalid or duplicate
    /// ones are skipped and reported, valid ones committed.
    pub fn import_bookmarks(&mut self, list: &str, doc: &serde_json::Value) -> ScanResult<ImportReport> {
        let bookmarks = doc
            .get("bookmarks")
            .and_then(|v| v.as_object())
            .ok_or_else(|| ScanError::Document("document has no bookmarks object".to_string()))?;

        let mut report = ImportReport::default();
        for (name, value) in bookmarks {
            let record: BookmarkRecord = match serde_json::from_value(value.clone()) {
                Ok(record) => record,
                Err(err) => {
                    warn!(name, %err, "skipping malformed bookmark in import");
                    report.skipped.push((name.clone(), err.to_string()));
                    continue;
                }
            };
            match self.add_bookmark(list, name, Bookmark::from(record)) {
                Ok(()) => report.imported.push(name.clone()),
                Err(err) => {
                    warn!(name, %err, "skipping bookmark in import");
                    report.skipped.push((name.clone(), err.to_string()));
                }
            }
        }
        info!(
            list,
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            "bookmark import finished"
        );
        Ok(report)
    }

    /// Export the named bookmarks of a list as an importable document.
    /// Unknown names are ignored.
    pub fn export_bookmarks(&self, list: &str, names: &[&str]) -> ScanResult<serde_json::Value> {
        let source = self
            .list(list)
            .ok_or_else(|| ScanError::ListNotFound(list.to_string()))?;
        let mut out = serde_json::Map::new();
        for entry in source.entries() {
            if names.contains(&entry.name.as_str()) {
                let record = BookmarkRecord::from(entry.bookmark.clone());
                out.insert(entry.name.clone(), serde_json::to_value(record)?);
            }
        }
        Ok(serde_json::json!({ "bookmarks": out }))
    }

    // ---- Queries ----

    /// Display name for a frequency, from the selected list.
    ///
    /// Single-frequency bookmarks within `tolerance` win over bands; a band
    /// containing the frequency answers with a `" [Band]"` suffix.
    pub fn bookmark_name(&self, freq: Hz, tolerance: Hz) -> Option<String> {
        let list = self.selected_list()?;
        for entry in list.entries() {
            if !entry.bookmark.is_band() && (entry.bookmark.display_freq() - freq).abs() < tolerance
            {
                return Some(entry.name.clone());
            }
        }
        for entry in list.entries() {
            if entry.bookmark.is_band() && entry.bookmark.contains(freq) {
                return Some(format!("{} [Band]", entry.name));
            }
        }
        None
    }

    /// Label rows for every list shown on the waterfall. Band bookmarks
    /// produce a start and an end label. Empty when the display mode is off.
    pub fn waterfall_labels(&self) -> Vec<WaterfallLabel> {
        if self.display_mode == BookmarkDisplayMode::Off {
            return Vec::new();
        }
        let mut labels = Vec::new();
        for (list_name, list) in &self.lists {
            if !list.show_on_waterfall {
                continue;
            }
            for entry in list.entries() {
                let (low, high) = entry.bookmark.bounds();
                if entry.bookmark.is_band() {
                    labels.push(WaterfallLabel {
                        list: list_name.clone(),
                        name: format!("{} (Start)", entry.name),
                        frequency: low,
                    });
                    labels.push(WaterfallLabel {
                        list: list_name.clone(),
                        name: format!("{} (End)", entry.name),
                        frequency: high,
                    });
                } else {
                    labels.push(WaterfallLabel {
                        list: list_name.clone(),
                        name: entry.name.clone(),
                        frequency: low,
                    });
                }
            }
        }
        labels
    }

    // ---- Persistence ----

    pub fn to_document(&self) -> CatalogDocument {
        let mut lists = BTreeMap::new();
        for (name, list) in &self.lists {
            let mut bookmarks = BTreeMap::new();
            for entry in list.entries() {
                bookmarks.insert(entry.name.clone(), BookmarkRecord::from(entry.bookmark.clone()));
            }
            lists.insert(
                name.clone(),
                ListDocument {
                    show_on_waterfall: list.show_on_waterfall,
                    bookmarks,
                },
            );
        }
        CatalogDocument {
            selected_list: self.selected.clone(),
            bookmark_display_mode: self.display_mode,
            lists,
        }
    }

    /// Rebuild a catalog from a document, dropping invalid bookmarks with a
    /// warning instead of failing the whole load.
    pub fn from_document(doc: CatalogDocument) -> Self {
        let mut catalog = Self {
            lists: Vec::new(),
            selected: String::new(),
            display_mode: doc.bookmark_display_mode,
            generation: 0,
            next_id: 1,
        };
        for (list_name, list_doc) in doc.lists {
            let mut entries = Vec::new();
            for (name, record) in list_doc.bookmarks {
                let bookmark = Bookmark::from(record);
                if let Err(err) = bookmark.validate(&name) {
                    warn!(%err, "dropping invalid bookmark while loading catalog");
                    continue;
                }
                entries.push(CatalogEntry {
                    id: BookmarkId(catalog.next_id),
                    name,
                    bookmark,
                });
                catalog.next_id += 1;
            }
            catalog.lists.push((
                list_name,
                BookmarkList {
                    show_on_waterfall: list_doc.show_on_waterfall,
                    entries,
                },
            ));
        }
        if catalog.lists.is_empty() {
            return Self::default();
        }
        catalog.selected = if catalog.lists.iter().any(|(n, _)| *n == doc.selected_list) {
            doc.selected_list
        } else {
            catalog.lists[0].0.clone()
        };
        catalog
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(json: &str) -> ScanResult<Self> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc))
    }
}

/// Serialized catalog, host-compatible layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub selected_list: String,
    pub bookmark_display_mode: BookmarkDisplayMode,
    pub lists: BTreeMap<String, ListDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocument {
    pub show_on_waterfall: bool,
    pub bookmarks: BTreeMap<String, BookmarkRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TuningProfile;
    use crate::types::DemodMode;

    fn catalog_with(names: &[(&str, Bookmark)]) -> FrequencyCatalog {
        let mut catalog = FrequencyCatalog::new();
        for (name, bm) in names {
            catalog.add_bookmark("General", name, bm.clone()).unwrap();
        }
        catalog
    }

    #[test]
    fn test_default_has_general_list_selected() {
        let catalog = FrequencyCatalog::new();
        assert_eq!(catalog.selected_list_name(), "General");
        assert!(catalog.selected_list().unwrap().is_empty());
    }

    #[test]
    fn test_add_duplicate_name_rejected() {
        let mut catalog = FrequencyCatalog::new();
        let bm = Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm);
        catalog.add_bookmark("General", "repeater", bm.clone()).unwrap();
        assert!(matches!(
            catalog.add_bookmark("General", "repeater", bm),
            Err(ScanError::NameExists(_))
        ));
        assert_eq!(catalog.selected_list().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_bookmark_never_partially_applied() {
        let mut catalog = FrequencyCatalog::new();
        let generation = catalog.generation();
        let bad = Bookmark::frequency(-1.0, 0.0, DemodMode::Nfm);
        assert!(catalog.add_bookmark("General", "bad", bad).is_err());
        assert!(catalog.selected_list().unwrap().is_empty());
        assert_eq!(catalog.generation(), generation);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut catalog = FrequencyCatalog::new();
        let bm = Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm);
        assert!(matches!(
            catalog.update_bookmark("General", "nope", bm),
            Err(ScanError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut catalog = catalog_with(&[(
            "a",
            Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm),
        )]);
        catalog.remove_bookmark("General", "a");
        let generation = catalog.generation();
        catalog.remove_bookmark("General", "a");
        assert_eq!(catalog.generation(), generation);
    }

    #[test]
    fn test_every_mutation_bumps_generation() {
        let mut catalog = FrequencyCatalog::new();
        let mut last = catalog.generation();
        let bm = Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm);

        catalog.add_bookmark("General", "a", bm.clone()).unwrap();
        assert!(catalog.generation() > last);
        last = catalog.generation();

        catalog.set_scannable("General", "a", true).unwrap();
        assert!(catalog.generation() > last);
        last = catalog.generation();

        catalog.update_bookmark("General", "a", bm).unwrap();
        assert!(catalog.generation() > last);
        last = catalog.generation();

        catalog.remove_bookmark("General", "a");
        assert!(catalog.generation() > last);
    }

    #[test]
    fn test_resolve_survives_unrelated_edits() {
        let mut catalog = catalog_with(&[
            ("a", Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm)),
            ("b", Bookmark::frequency(446.0e6, 12_500.0, DemodMode::Nfm)),
        ]);
        let id = catalog.selected_list().unwrap().get("b").unwrap().id;
        catalog.remove_bookmark("General", "a");
        let entry = catalog.resolve(id).unwrap();
        assert_eq!(entry.name, "b");

        catalog.remove_bookmark("General", "b");
        assert!(catalog.resolve(id).is_none());
    }

    #[test]
    fn test_bookmark_name_prefers_exact_over_band() {
        let mut band = Bookmark::band(88.0e6, 108.0e6, 100_000.0);
        band.scannable = true;
        let catalog = catalog_with(&[
            ("FM", band),
            ("Station", Bookmark::frequency(98.7e6, 200_000.0, DemodMode::Wfm)),
        ]);
        assert_eq!(
            catalog.bookmark_name(98.7e6, NAME_MATCH_TOLERANCE),
            Some("Station".to_string())
        );
        assert_eq!(
            catalog.bookmark_name(90.0e6, NAME_MATCH_TOLERANCE),
            Some("FM [Band]".to_string())
        );
        assert_eq!(catalog.bookmark_name(500.0e6, NAME_MATCH_TOLERANCE), None);
    }

    #[test]
    fn test_bookmark_name_tolerance_window() {
        let catalog = catalog_with(&[(
            "Station",
            Bookmark::frequency(98.7e6, 200_000.0, DemodMode::Wfm),
        )]);
        assert!(catalog.bookmark_name(98.7e6 + 999.0, 1_000.0).is_some());
        assert!(catalog.bookmark_name(98.7e6 + 1_000.0, 1_000.0).is_none());
    }

    #[test]
    fn test_waterfall_labels_expand_bands() {
        let mut catalog = catalog_with(&[
            ("Airband", Bookmark::band(118.0e6, 137.0e6, 25_000.0)),
            ("Calling", Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm)),
        ]);
        let labels = catalog.waterfall_labels();
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().any(|l| l.name == "Airband (Start)" && l.frequency == 118.0e6));
        assert!(labels.iter().any(|l| l.name == "Airband (End)" && l.frequency == 137.0e6));
        assert!(labels.iter().any(|l| l.name == "Calling"));

        catalog.set_show_on_waterfall("General", false).unwrap();
        assert!(catalog.waterfall_labels().is_empty());

        catalog.set_show_on_waterfall("General", true).unwrap();
        catalog.set_display_mode(BookmarkDisplayMode::Off);
        assert!(catalog.waterfall_labels().is_empty());
    }

    #[test]
    fn test_import_skips_invalid_and_duplicate_entries() {
        let mut catalog = catalog_with(&[(
            "existing",
            Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm),
        )]);
        let doc = serde_json::json!({
            "bookmarks": {
                "existing": { "frequency": 146.0e6 },
                "good": { "frequency": 433.5e6, "bandwidth": 12500.0, "mode": 0 },
                "broken": { "frequency": -5.0 },
            }
        });
        let report = catalog.import_bookmarks("General", &doc).unwrap();
        assert_eq!(report.imported, vec!["good".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert!(catalog.selected_list().unwrap().get("good").is_some());
        // the pre-existing bookmark was not overwritten
        let existing = catalog.selected_list().unwrap().get("existing").unwrap();
        assert_eq!(existing.bookmark.display_freq(), 145.5e6);
    }

    #[test]
    fn test_import_without_bookmarks_object_fails() {
        let mut catalog = FrequencyCatalog::new();
        let doc = serde_json::json!({ "nothing": true });
        assert!(catalog.import_bookmarks("General", &doc).is_err());
    }

    #[test]
    fn test_export_then_import_roundtrip() {
        let mut bm = Bookmark::frequency(446.00625e6, 12_500.0, DemodMode::Nfm);
        bm.scannable = true;
        bm.profile = Some(TuningProfile::default());
        let catalog = catalog_with(&[("PMR1", bm.clone())]);

        let doc = catalog.export_bookmarks("General", &["PMR1"]).unwrap();

        let mut other = FrequencyCatalog::new();
        let report = other.import_bookmarks("General", &doc).unwrap();
        assert_eq!(report.imported.len(), 1);
        let imported = other.selected_list().unwrap().get("PMR1").unwrap();
        assert_eq!(imported.bookmark, bm);
    }

    #[test]
    fn test_document_roundtrip_preserves_everything() {
        let mut catalog = FrequencyCatalog::new();
        catalog.create_list("Ham").unwrap();
        let mut single = Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm);
        single.scannable = true;
        let mut profile = TuningProfile::default();
        profile.squelch_enabled = true;
        profile.squelch_level = -40.0;
        single.profile = Some(profile);
        catalog.add_bookmark("Ham", "2m calling", single.clone()).unwrap();
        catalog.add_bookmark("Ham", "70cm band", Bookmark::band(430.0e6, 440.0e6, 12_500.0)).unwrap();
        catalog.select_list("Ham").unwrap();
        catalog.set_show_on_waterfall("General", false).unwrap();
        catalog.set_display_mode(BookmarkDisplayMode::Bottom);

        let json = catalog.to_json().unwrap();
        let loaded = FrequencyCatalog::from_json(&json).unwrap();

        assert_eq!(loaded.selected_list_name(), "Ham");
        assert_eq!(loaded.display_mode(), BookmarkDisplayMode::Bottom);
        assert!(!loaded.list("General").unwrap().show_on_waterfall);
        let entry = loaded.selected_list().unwrap().get("2m calling").unwrap();
        assert_eq!(entry.bookmark, single);
        assert!(loaded.selected_list().unwrap().get("70cm band").unwrap().bookmark.is_band());
    }

    #[test]
    fn test_load_with_unknown_selected_list_falls_back() {
        let doc = CatalogDocument {
            selected_list: "gone".to_string(),
            bookmark_display_mode: BookmarkDisplayMode::Top,
            lists: BTreeMap::from([(
                "Only".to_string(),
                ListDocument {
                    show_on_waterfall: true,
                    bookmarks: BTreeMap::new(),
                },
            )]),
        };
        let catalog = FrequencyCatalog::from_document(doc);
        assert_eq!(catalog.selected_list_name(), "Only");
    }

    #[test]
    fn test_remove_then_add_same_name_gets_new_identity() {
        let mut catalog = catalog_with(&[(
            "a",
            Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm),
        )]);
        let old_id = catalog.selected_list().unwrap().get("a").unwrap().id;
        catalog.remove_bookmark("General", "a");
        catalog
            .add_bookmark("General", "a", Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm))
            .unwrap();
        let new_id = catalog.selected_list().unwrap().get("a").unwrap().id;
        assert_ne!(old_id, new_id);
        assert!(catalog.resolve(old_id).is_none());
    }

    #[test]
    fn test_list_rename_and_delete() {
        let mut catalog = FrequencyCatalog::new();
        catalog.create_list("Ham").unwrap();
        assert!(catalog.create_list("Ham").is_err());
        catalog.rename_list("Ham", "Amateur").unwrap();
        assert!(catalog.list("Ham").is_none());
        assert!(catalog.list("Amateur").is_some());

        catalog.select_list("Amateur").unwrap();
        catalog.delete_list("Amateur");
        assert_eq!(catalog.selected_list_name(), "General");
    }
}

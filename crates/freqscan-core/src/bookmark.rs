//! Bookmarks
//!
//! A catalog entry is either a single frequency or an inclusive band with a
//! scan step. The in-memory representation splits the two into
//! [`BookmarkKind`] variants; the serialized form stays the host's flat
//! record (`isBand` flag plus a union of fields) so documents remain
//! compatible.

use serde::{Deserialize, Serialize};

use crate::profile::TuningProfile;
use crate::types::{DemodMode, Hz, ScanError, ScanResult};

/// What a bookmark points at.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkKind {
    /// A single channel.
    Frequency {
        /// Center frequency in Hz.
        frequency: Hz,
        /// Nominal channel bandwidth in Hz (informational).
        bandwidth: Hz,
        /// Nominal demodulator mode, used when no profile is attached.
        mode: DemodMode,
    },
    /// An inclusive frequency range scanned in steps.
    Band {
        start_freq: Hz,
        end_freq: Hz,
        /// Scan step in Hz, > 0.
        step_freq: Hz,
        notes: String,
        tags: Vec<String>,
    },
}

/// A catalog entry: a frequency or band, an optional tuning profile and a
/// scanner-inclusion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BookmarkRecord", into = "BookmarkRecord")]
pub struct Bookmark {
    pub kind: BookmarkKind,
    /// Include this entry in the scanner's list.
    pub scannable: bool,
    /// Optional receiver preset applied when the scanner locks here.
    pub profile: Option<TuningProfile>,
}

impl Bookmark {
    /// Single-frequency bookmark with defaults.
    pub fn frequency(frequency: Hz, bandwidth: Hz, mode: DemodMode) -> Self {
        Self {
            kind: BookmarkKind::Frequency {
                frequency,
                bandwidth,
                mode,
            },
            scannable: false,
            profile: None,
        }
    }

    /// Band bookmark with defaults.
    pub fn band(start_freq: Hz, end_freq: Hz, step_freq: Hz) -> Self {
        Self {
            kind: BookmarkKind::Band {
                start_freq,
                end_freq,
                step_freq,
                notes: String::new(),
                tags: Vec::new(),
            },
            scannable: false,
            profile: None,
        }
    }

    pub fn is_band(&self) -> bool {
        matches!(self.kind, BookmarkKind::Band { .. })
    }

    /// Frequency used for display and sorting: the center for a frequency
    /// bookmark, the band start for a band.
    pub fn display_freq(&self) -> Hz {
        match self.kind {
            BookmarkKind::Frequency { frequency, .. } => frequency,
            BookmarkKind::Band { start_freq, .. } => start_freq,
        }
    }

    /// Width of the covered range; zero for a single frequency.
    pub fn span(&self) -> Hz {
        match self.kind {
            BookmarkKind::Frequency { .. } => 0.0,
            BookmarkKind::Band {
                start_freq,
                end_freq,
                ..
            } => end_freq - start_freq,
        }
    }

    /// Inclusive frequency extent covered by this bookmark.
    pub fn bounds(&self) -> (Hz, Hz) {
        match self.kind {
            BookmarkKind::Frequency { frequency, .. } => (frequency, frequency),
            BookmarkKind::Band {
                start_freq,
                end_freq,
                ..
            } => (start_freq, end_freq),
        }
    }

    /// `true` when `freq` falls inside this bookmark's extent.
    pub fn contains(&self, freq: Hz) -> bool {
        let (low, high) = self.bounds();
        freq >= low && freq <= high
    }

    /// Validate the bookmark and its profile, naming `name` in errors.
    pub fn validate(&self, name: &str) -> ScanResult<()> {
        match self.kind {
            BookmarkKind::Frequency { frequency, .. } => {
                if frequency <= 0.0 {
                    return Err(ScanError::InvalidBookmark {
                        name: name.to_string(),
                        reason: format!("frequency {frequency} Hz must be positive"),
                    });
                }
            }
            BookmarkKind::Band {
                start_freq,
                end_freq,
                step_freq,
                ..
            } => {
                if start_freq <= 0.0 || start_freq >= end_freq {
                    return Err(ScanError::InvalidBookmark {
                        name: name.to_string(),
                        reason: format!(
                            "band requires 0 < start < end, got {start_freq}..{end_freq}"
                        ),
                    });
                }
                if step_freq <= 0.0 {
                    return Err(ScanError::InvalidBookmark {
                        name: name.to_string(),
                        reason: format!("band step {step_freq} Hz must be positive"),
                    });
                }
            }
        }
        if let Some(profile) = &self.profile {
            profile.validate().map_err(|err| ScanError::InvalidBookmark {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }

    /// Number of scan entries this bookmark expands to.
    pub fn scan_point_count(&self) -> usize {
        match self.kind {
            BookmarkKind::Frequency { .. } => 1,
            BookmarkKind::Band {
                start_freq,
                end_freq,
                step_freq,
                ..
            } => {
                if step_freq <= 0.0 || end_freq < start_freq {
                    0
                } else {
                    ((end_freq - start_freq) / step_freq).floor() as usize + 1
                }
            }
        }
    }
}

/// Flat serialized form of a bookmark, matching the host document layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkRecord {
    pub frequency: Hz,
    pub bandwidth: Hz,
    pub mode: DemodMode,
    pub is_band: bool,
    pub start_freq: Hz,
    pub end_freq: Hz,
    pub step_freq: Hz,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub scannable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<TuningProfile>,
}

impl Default for BookmarkRecord {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            bandwidth: 0.0,
            mode: DemodMode::Nfm,
            is_band: false,
            start_freq: 0.0,
            end_freq: 0.0,
            step_freq: 100_000.0,
            notes: String::new(),
            tags: Vec::new(),
            scannable: false,
            profile: None,
        }
    }
}

impl From<BookmarkRecord> for Bookmark {
    fn from(record: BookmarkRecord) -> Self {
        let kind = if record.is_band {
            BookmarkKind::Band {
                start_freq: record.start_freq,
                end_freq: record.end_freq,
                step_freq: record.step_freq,
                notes: record.notes,
                tags: record.tags,
            }
        } else {
            BookmarkKind::Frequency {
                frequency: record.frequency,
                bandwidth: record.bandwidth,
                mode: record.mode,
            }
        };
        Bookmark {
            kind,
            scannable: record.scannable,
            profile: record.profile,
        }
    }
}

impl From<Bookmark> for BookmarkRecord {
    fn from(bookmark: Bookmark) -> Self {
        let mut record = BookmarkRecord {
            scannable: bookmark.scannable,
            profile: bookmark.profile,
            ..BookmarkRecord::default()
        };
        match bookmark.kind {
            BookmarkKind::Frequency {
                frequency,
                bandwidth,
                mode,
            } => {
                record.frequency = frequency;
                record.bandwidth = bandwidth;
                record.mode = mode;
            }
            BookmarkKind::Band {
                start_freq,
                end_freq,
                step_freq,
                notes,
                tags,
            } => {
                record.is_band = true;
                record.start_freq = start_freq;
                record.end_freq = end_freq;
                record.step_freq = step_freq;
                record.notes = notes;
                record.tags = tags;
            }
        }
        record
    }
}

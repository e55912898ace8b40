//! Core types shared across the scanner
//!
//! Frequencies are carried as `f64` hertz and levels as `f32` dBFS, matching
//! what the FFT producer hands out. The demodulator and de-emphasis
//! enumerations persist as their small-integer indices so catalog documents
//! stay interchangeable with existing host configurations.

use serde::{Deserialize, Serialize};

/// A frequency in hertz.
pub type Hz = f64;

/// A power level in dBFS.
pub type Dbfs = f32;

/// Result type for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur across the scanner core
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("not ready to scan: {0}")]
    NotReady(String),

    #[error("invalid bookmark '{name}': {reason}")]
    InvalidBookmark { name: String, reason: String },

    #[error("invalid tuning profile: {0}")]
    InvalidProfile(String),

    #[error("bookmark '{0}' already exists")]
    NameExists(String),

    #[error("bookmark '{0}' not found")]
    NotFound(String),

    #[error("list '{0}' not found")]
    ListNotFound(String),

    #[error("interface not available: {0}")]
    InterfaceMissing(&'static str),

    #[error("radio error: {0}")]
    TransientRadio(String),

    #[error("tuning profile failed validation before apply")]
    CorruptedProfile,

    #[error("recorder error: {0}")]
    RecorderFailure(String),

    #[error("no FFT frame available")]
    FftUnavailable,

    #[error("invalid scan range: start {start} Hz >= stop {stop} Hz")]
    InvalidRange { start: Hz, stop: Hz },

    #[error("scan list entry is stale")]
    StaleEntry,

    #[error("document error: {0}")]
    Document(String),

    #[error("fatal engine error: {0}")]
    Fatal(String),
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Document(err.to_string())
    }
}

/// Demodulator mode of a receiver channel.
///
/// Index order is fixed by the host radio and persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DemodMode {
    #[default]
    Nfm,
    Wfm,
    Am,
    Dsb,
    Usb,
    Cw,
    Lsb,
    Raw,
}

impl DemodMode {
    /// All modes in index order.
    pub const ALL: [DemodMode; 8] = [
        DemodMode::Nfm,
        DemodMode::Wfm,
        DemodMode::Am,
        DemodMode::Dsb,
        DemodMode::Usb,
        DemodMode::Cw,
        DemodMode::Lsb,
        DemodMode::Raw,
    ];

    /// Numeric index used on the wire and in documents.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Mode for a numeric index, if in range.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Short display name ("NFM", "WFM", ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DemodMode::Nfm => "NFM",
            DemodMode::Wfm => "WFM",
            DemodMode::Am => "AM",
            DemodMode::Dsb => "DSB",
            DemodMode::Usb => "USB",
            DemodMode::Cw => "CW",
            DemodMode::Lsb => "LSB",
            DemodMode::Raw => "RAW",
        }
    }
}

impl From<DemodMode> for u8 {
    fn from(mode: DemodMode) -> u8 {
        mode.index()
    }
}

impl TryFrom<u8> for DemodMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DemodMode::from_index(value).ok_or_else(|| format!("demodulator index {value} out of range"))
    }
}

/// FM de-emphasis setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DeemphasisMode {
    #[default]
    Off,
    Us50,
    Us75,
}

impl DeemphasisMode {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(DeemphasisMode::Off),
            1 => Some(DeemphasisMode::Us50),
            2 => Some(DeemphasisMode::Us75),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl From<DeemphasisMode> for u8 {
    fn from(mode: DeemphasisMode) -> u8 {
        mode.index()
    }
}

impl TryFrom<u8> for DeemphasisMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DeemphasisMode::from_index(value)
            .ok_or_else(|| format!("de-emphasis index {value} out of range"))
    }
}

//! # freqscan-core
//!
//! Frequency scanner control engine for an SDR host: a bookmark catalog
//! with per-entry tuning profiles, a scan-list builder, and a cooperative
//! scan worker that sweeps the receiver across the list, detects signals in
//! the live FFT, locks on, applies the entry's receiver preset, and
//! coordinates squelch, mute and auto-recording.
//!
//! ## Overview
//!
//! The host wires the engine to three collaborator interfaces and two
//! shared documents:
//!
//! ```text
//! FrequencyCatalog ──> ScanListBuilder ──> ScanEngine ──> Receiver (tune,
//!      │ (bookmarks,        (sorted            │           mode, squelch,
//!      │  profiles)          ScanEntry rows)   │           gain)
//!      │                                       ├─────────> FftSource
//!      └── Blacklist / NameCache <─────────────┤           (magnitude
//!                                              │            frames)
//!                                              └─────────> Recorder
//! ```
//!
//! The engine runs on a single worker thread with a wall-clock tick; the
//! host edits the catalog, blacklist and [`config::ScannerConfig`] from its
//! own threads and the engine picks changes up at the next tick.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//! use freqscan_core::{
//!     Bookmark, DemodMode, FrequencyCatalog, ScanEngine, ScannerConfig,
//! };
//! # use freqscan_core::{FftSource, Receiver, Recorder};
//! # fn collaborators() -> (Arc<dyn Receiver>, Arc<dyn FftSource>, Arc<dyn Recorder>) {
//! #     unimplemented!()
//! # }
//!
//! let mut catalog = FrequencyCatalog::new();
//! let mut calling = Bookmark::frequency(145.5e6, 12_500.0, DemodMode::Nfm);
//! calling.scannable = true;
//! catalog.add_bookmark("General", "2m calling", calling)?;
//!
//! let (receiver, fft, recorder) = collaborators();
//! let mut engine = ScanEngine::new(
//!     receiver,
//!     fft,
//!     recorder,
//!     Arc::new(Mutex::new(catalog)),
//!     Arc::new(Mutex::new(ScannerConfig::default())),
//! );
//! engine.start()?;
//! # Ok::<(), freqscan_core::ScanError>(())
//! ```

pub mod blacklist;
pub mod bookmark;
pub mod catalog;
pub mod centering;
pub mod config;
pub mod engine;
pub mod profile;
pub mod profile_apply;
pub mod radio;
pub mod recording;
pub mod scan_list;
pub mod spectrum;
pub mod squelch;
pub mod types;

pub use blacklist::Blacklist;
pub use bookmark::{Bookmark, BookmarkKind};
pub use catalog::{BookmarkDisplayMode, BookmarkId, FrequencyCatalog};
pub use config::{FrequencyRange, ScannerConfig};
pub use engine::{ScanDirection, ScanEngine, ScannerState};
pub use profile::TuningProfile;
pub use radio::{FftSource, Receiver, Recorder};
pub use scan_list::ScanEntry;
pub use spectrum::SpectrumFrame;
pub use types::{Dbfs, DeemphasisMode, DemodMode, Hz, ScanError, ScanResult};

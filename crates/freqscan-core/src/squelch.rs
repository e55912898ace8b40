//! Squelch and mute control
//!
//! Three cooperating mechanisms, all of which are no-ops on a receiver
//! without squelch capability:
//!
//! 1. **Delta squelch** - once a signal is locked, the close threshold drops
//!    below the open threshold to give the audio gate hysteresis. Manual
//!    mode subtracts the delta from the captured squelch; auto mode tracks
//!    the noise floor with an EMA and closes at `floor + delta`.
//! 2. **Scan-mute** - while sweeping, the squelch is raised to a level that
//!    mutes retune noise bursts, and restored when a signal locks.
//! 3. **Aggressive mute** - an optional, briefly-held extra mute applied
//!    just before profile or frequency changes, never while receiving.
//!
//! The squelch value present at engine start is captured and restored at
//! stop, unless the user wrote their own value mid-scan, in which case the
//! user's write wins.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::radio::Receiver;
use crate::types::{Dbfs, ScanResult};

/// Squelch level used to mute audio while sweeping.
pub const SCAN_MUTE_LEVEL_DB: f32 = -5.0;

/// EMA retention factor for the noise-floor tracker.
pub const NOISE_FLOOR_ALPHA: f32 = 0.95;

/// Minimum spacing between noise-floor updates.
pub const NOISE_FLOOR_MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Settle time the engine sleeps after engaging the aggressive mute.
pub const AGGRESSIVE_MUTE_SETTLE: Duration = Duration::from_millis(3);

/// Host-configurable squelch behavior, copied from the scanner config at
/// engine start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquelchSettings {
    /// Open/close hysteresis in dB, 0..10.
    pub delta_db: f32,
    /// Track the noise floor instead of offsetting the manual squelch.
    pub delta_auto: bool,
    /// Raise squelch while sweeping.
    pub mute_while_scanning: bool,
    /// Extra mute across profile/frequency changes.
    pub aggressive_mute: bool,
    /// Aggressive-mute squelch value in dB, -10..0.
    pub aggressive_mute_level_db: f32,
}

impl Default for SquelchSettings {
    fn default() -> Self {
        Self {
            delta_db: 0.0,
            delta_auto: false,
            mute_while_scanning: false,
            aggressive_mute: false,
            aggressive_mute_level_db: -3.0,
        }
    }
}

/// Owns the receiver's squelch for the duration of a scan.
#[derive(Debug)]
pub struct SquelchController {
    settings: SquelchSettings,
    capable: bool,
    original: Option<f32>,
    last_written: Option<f32>,
    scan_mute_active: bool,
    noise_floor: Option<f32>,
    last_floor_update: Option<Instant>,
}

impl SquelchController {
    pub fn new(settings: SquelchSettings) -> Self {
        Self {
            settings,
            capable: false,
            original: None,
            last_written: None,
            scan_mute_active: false,
            noise_floor: None,
            last_floor_update: None,
        }
    }

    /// Whether scan-mute currently holds the squelch.
    pub fn scan_mute_active(&self) -> bool {
        self.scan_mute_active
    }

    /// Tracked noise floor in dBFS, once enough samples came in.
    pub fn noise_floor(&self) -> Option<f32> {
        self.noise_floor
    }

    /// Capture the squelch state at engine start.
    pub fn start(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<()> {
        self.capable = receiver.has_squelch(vfo);
        self.original = None;
        self.last_written = None;
        self.scan_mute_active = false;
        self.noise_floor = None;
        self.last_floor_update = None;
        if self.capable {
            self.original = Some(receiver.squelch_level(vfo)?);
        }
        Ok(())
    }

    fn write(&mut self, receiver: &dyn Receiver, vfo: &str, level: f32) -> ScanResult<()> {
        receiver.set_squelch_level(vfo, level)?;
        self.last_written = Some(level);
        Ok(())
    }

    /// Raise the squelch for a retune. Called on every frequency hop while
    /// scanning; a no-op when scan-mute is disabled or already held.
    pub fn apply_scan_mute(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<()> {
        if !self.capable || !self.settings.mute_while_scanning || self.scan_mute_active {
            return Ok(());
        }
        self.write(receiver, vfo, SCAN_MUTE_LEVEL_DB)?;
        self.scan_mute_active = true;
        Ok(())
    }

    /// Drop the scan-mute on lock, restoring the captured squelch. The
    /// caller applies the profile's own squelch afterwards; the ordering
    /// (mute restore before any profile squelch write) is what keeps the
    /// profile's value from being clobbered.
    pub fn release_scan_mute(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<()> {
        if !self.scan_mute_active {
            return Ok(());
        }
        if let Some(original) = self.original {
            self.write(receiver, vfo, original)?;
        }
        self.scan_mute_active = false;
        Ok(())
    }

    /// Apply the close-threshold hysteresis after a lock.
    ///
    /// Manual mode: `original - delta`. Auto mode: `noise_floor + delta`
    /// (skipped until the tracker has a floor).
    pub fn apply_delta(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<()> {
        if !self.capable || self.settings.delta_db <= 0.0 {
            return Ok(());
        }
        let close_level = if self.settings.delta_auto {
            match self.noise_floor {
                Some(floor) => floor + self.settings.delta_db,
                None => return Ok(()),
            }
        } else {
            match self.original {
                Some(original) => original - self.settings.delta_db,
                None => return Ok(()),
            }
        };
        debug!(close_level, "applying squelch delta");
        self.write(receiver, vfo, close_level)
    }

    /// Feed an in-band level into the noise-floor EMA. Only advances while
    /// scanning and at most every [`NOISE_FLOOR_MIN_INTERVAL`].
    pub fn update_noise_floor(&mut self, level: Dbfs, now: Instant, scanning: bool) {
        if !scanning {
            return;
        }
        if let Some(last) = self.last_floor_update {
            if now.duration_since(last) < NOISE_FLOOR_MIN_INTERVAL {
                return;
            }
        }
        self.noise_floor = Some(match self.noise_floor {
            Some(floor) => NOISE_FLOOR_ALPHA * floor + (1.0 - NOISE_FLOOR_ALPHA) * level,
            None => level,
        });
        self.last_floor_update = Some(now);
    }

    /// Level to pre-apply before a profile/frequency change, when aggressive
    /// mute is on. The engine writes it, sleeps [`AGGRESSIVE_MUTE_SETTLE`],
    /// then proceeds with the change (which overwrites the squelch again).
    /// Never used while receiving.
    pub fn aggressive_mute(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<bool> {
        if !self.capable || !self.settings.aggressive_mute {
            return Ok(false);
        }
        let level = self.settings.aggressive_mute_level_db;
        self.write(receiver, vfo, level)?;
        Ok(true)
    }

    /// Restore the squelch at engine stop or reset.
    ///
    /// The captured original is written back only when the receiver still
    /// holds the engine's own last write; a differing value means the user
    /// intervened and their write wins.
    pub fn restore(&mut self, receiver: &dyn Receiver, vfo: &str) -> ScanResult<()> {
        if !self.capable {
            return Ok(());
        }
        let (Some(original), Some(last)) = (self.original, self.last_written) else {
            return Ok(());
        };
        let current = receiver.squelch_level(vfo)?;
        if (current - last).abs() < 0.01 {
            receiver.set_squelch_level(vfo, original)?;
            debug!(original, "restored squelch");
        } else {
            warn!(current, "user changed squelch during scan, leaving it");
        }
        self.scan_mute_active = false;
        self.last_written = None;
        Ok(())
    }
}

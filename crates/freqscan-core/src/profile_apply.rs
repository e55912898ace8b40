//! Profile application
//!
//! Pushes a [`TuningProfile`] into the receiver, with an idempotency cache
//! so locking on the same entry tick after tick does not hammer the radio,
//! and a validation guard so a profile corrupted by a concurrent catalog
//! edit is caught before any radio call.

use tracing::debug;

use crate::profile::TuningProfile;
use crate::radio::{ignore_missing, Receiver};
use crate::types::{DemodMode, Hz, ScanError, ScanResult};

/// Frequencies within this of each other share a cache slot.
pub const APPLY_FREQ_TOLERANCE: Hz = 1_000.0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    fingerprint: u64,
    vfo: String,
    freq_bucket: i64,
}

fn cache_key(profile: &TuningProfile, vfo: &str, freq: Hz) -> CacheKey {
    CacheKey {
        fingerprint: profile.fingerprint(),
        vfo: vfo.to_string(),
        freq_bucket: (freq / APPLY_FREQ_TOLERANCE).round() as i64,
    }
}

/// Applies profiles to the receiver, remembering the last successful apply.
#[derive(Debug, Default)]
pub struct ProfileApplier {
    last: Option<CacheKey>,
}

impl ProfileApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cache; the next apply goes through unconditionally.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Apply `profile` for `freq` on `vfo`.
    ///
    /// Returns `Ok(false)` on a cache hit (same profile, same VFO, frequency
    /// within ±1 kHz of the cached apply), `Ok(true)` after a real apply.
    ///
    /// Fails with [`ScanError::CorruptedProfile`] when the profile no longer
    /// validates; the caller reacts by refreshing the scan list. Squelch
    /// writes are skipped while scan-mute holds the squelch, so the mute is
    /// not silently undone. Optional capabilities the radio does not expose
    /// are omitted.
    pub fn apply(
        &mut self,
        profile: &TuningProfile,
        receiver: &dyn Receiver,
        vfo: &str,
        freq: Hz,
        scan_mute_active: bool,
    ) -> ScanResult<bool> {
        if profile.validate().is_err() {
            return Err(ScanError::CorruptedProfile);
        }

        let key = cache_key(profile, vfo, freq);
        if self.last.as_ref() == Some(&key) {
            return Ok(false);
        }

        receiver.set_mode(vfo, profile.demod_mode)?;
        receiver.set_bandwidth(vfo, f64::from(profile.bandwidth))?;

        if receiver.has_squelch(vfo) && !scan_mute_active {
            receiver.set_squelch_enabled(vfo, profile.squelch_enabled)?;
            if profile.squelch_enabled {
                receiver.set_squelch_level(vfo, profile.squelch_level)?;
            }
        }

        if (0.0..=100.0).contains(&profile.rf_gain) {
            ignore_missing(receiver.set_gain(profile.rf_gain))?;
        }
        ignore_missing(receiver.set_agc_enabled(vfo, profile.agc_enabled))?;
        ignore_missing(receiver.set_deemphasis(vfo, profile.deemphasis_mode))?;

        debug!(vfo, freq, profile = %profile.display_name(), "applied tuning profile");
        self.last = Some(key);
        Ok(true)
    }

    /// Fallback for bookmarks without a profile: nominal mode and bandwidth
    /// only. Never cached, since it carries no identity of its own.
    pub fn apply_basic(
        &mut self,
        receiver: &dyn Receiver,
        vfo: &str,
        mode: DemodMode,
        bandwidth: Hz,
    ) -> ScanResult<()> {
        receiver.set_mode(vfo, mode)?;
        if bandwidth > 0.0 {
            receiver.set_bandwidth(vfo, bandwidth)?;
        }
        self.last = None;
        Ok(())
    }
}

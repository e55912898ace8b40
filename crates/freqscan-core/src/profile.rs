//! Tuning profiles
//!
//! A [`TuningProfile`] is a per-bookmark receiver preset: demodulator mode,
//! bandwidth, squelch, gain and a few optional extras. Profiles are owned by
//! their bookmark; when a bookmark has none, the engine leaves the receiver
//! configured as-is.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::types::{DeemphasisMode, DemodMode, Hz, ScanError, ScanResult};

/// Upper bound for a profile bandwidth in Hz.
pub const MAX_PROFILE_BANDWIDTH: Hz = 10.0e6;

/// Receiver configuration preset attached to a bookmark.
///
/// Field names in the serialized form match the host's catalog document
/// layout, so existing documents load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TuningProfile {
    /// Demodulator mode.
    pub demod_mode: DemodMode,
    /// Channel bandwidth in Hz.
    pub bandwidth: f32,
    /// Whether squelch is enabled when this profile applies.
    pub squelch_enabled: bool,
    /// Squelch threshold in dB, -100..0.
    pub squelch_level: f32,
    /// FM de-emphasis.
    pub deemphasis_mode: DeemphasisMode,
    /// AGC on/off.
    pub agc_enabled: bool,
    /// RF gain in dB, applied when within 0..100.
    pub rf_gain: f32,
    /// Offset of the channel center from the tuned frequency, in Hz.
    pub center_offset: f64,
    /// Optional user-facing name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Apply automatically when the scanner locks on the owning bookmark.
    pub auto_apply: bool,
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self {
            demod_mode: DemodMode::Nfm,
            bandwidth: 12_500.0,
            squelch_enabled: false,
            squelch_level: -50.0,
            deemphasis_mode: DeemphasisMode::Off,
            agc_enabled: true,
            rf_gain: 20.0,
            center_offset: 0.0,
            name: None,
            auto_apply: true,
        }
    }
}

impl TuningProfile {
    /// Check the invariants every stored or applied profile must satisfy.
    pub fn validate(&self) -> ScanResult<()> {
        if !(self.bandwidth > 0.0 && f64::from(self.bandwidth) <= MAX_PROFILE_BANDWIDTH) {
            return Err(ScanError::InvalidProfile(format!(
                "bandwidth {} Hz outside (0, {} Hz]",
                self.bandwidth, MAX_PROFILE_BANDWIDTH
            )));
        }
        if !(-100.0..=0.0).contains(&self.squelch_level) {
            return Err(ScanError::InvalidProfile(format!(
                "squelch level {} dB outside [-100, 0]",
                self.squelch_level
            )));
        }
        Ok(())
    }

    /// `true` when [`validate`](Self::validate) passes.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Generated display name, e.g. `"NFM 12.5kHz SQ"`.
    pub fn auto_name(&self) -> String {
        let mut name = format!(
            "{} {:.1}kHz",
            self.demod_mode.as_str(),
            self.bandwidth / 1000.0
        );
        if self.squelch_enabled {
            name.push_str(" SQ");
        }
        name
    }

    /// Name to display: the user's if set, otherwise the generated one.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.auto_name(),
        }
    }

    /// Stable fingerprint over every field that affects the radio.
    ///
    /// Two profiles with identical settings share a fingerprint regardless of
    /// their display name; the profile-apply cache keys on this.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.demod_mode.index().hash(&mut hasher);
        self.bandwidth.to_bits().hash(&mut hasher);
        self.squelch_enabled.hash(&mut hasher);
        self.squelch_level.to_bits().hash(&mut hasher);
        self.deemphasis_mode.index().hash(&mut hasher);
        self.agc_enabled.hash(&mut hasher);
        self.rf_gain.to_bits().hash(&mut hasher);
        self.center_offset.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TuningProfile::default().is_valid());
    }

    #[test]
    fn test_rejects_zero_and_oversized_bandwidth() {
        let mut profile = TuningProfile::default();
        profile.bandwidth = 0.0;
        assert!(!profile.is_valid());
        profile.bandwidth = 10.0e6 + 1.0;
        assert!(!profile.is_valid());
        profile.bandwidth = 10.0e6;
        assert!(profile.is_valid());
    }

    #[test]
    fn test_rejects_squelch_out_of_range() {
        let mut profile = TuningProfile::default();
        profile.squelch_level = -100.5;
        assert!(!profile.is_valid());
        profile.squelch_level = 0.5;
        assert!(!profile.is_valid());
        profile.squelch_level = -100.0;
        assert!(profile.is_valid());
    }

    #[test]
    fn test_auto_name() {
        let mut profile = TuningProfile::default();
        assert_eq!(profile.auto_name(), "NFM 12.5kHz");
        profile.squelch_enabled = true;
        assert_eq!(profile.auto_name(), "NFM 12.5kHz SQ");
        profile.demod_mode = DemodMode::Wfm;
        profile.bandwidth = 200_000.0;
        assert_eq!(profile.auto_name(), "WFM 200.0kHz SQ");
    }

    #[test]
    fn test_display_name_prefers_user_name() {
        let mut profile = TuningProfile::default();
        assert_eq!(profile.display_name(), profile.auto_name());
        profile.name = Some("Marine VHF".into());
        assert_eq!(profile.display_name(), "Marine VHF");
    }

    #[test]
    fn test_fingerprint_ignores_name() {
        let mut a = TuningProfile::default();
        let mut b = TuningProfile::default();
        a.name = Some("a".into());
        b.name = Some("b".into());
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.bandwidth = 25_000.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_serde_roundtrip_with_original_field_names() {
        let mut profile = TuningProfile::default();
        profile.demod_mode = DemodMode::Am;
        profile.squelch_enabled = true;
        profile.squelch_level = -62.5;
        profile.name = Some("Airband".into());

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["demodMode"], 2);
        assert_eq!(json["squelchEnabled"], true);
        assert_eq!(json["squelchLevel"], -62.5);

        let back: TuningProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_deserialize_fills_missing_fields_with_defaults() {
        let json = r#"{ "demodMode": 1, "bandwidth": 180000.0 }"#;
        let profile: TuningProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.demod_mode, DemodMode::Wfm);
        assert_eq!(profile.bandwidth, 180_000.0);
        assert!(profile.auto_apply);
        assert_eq!(profile.squelch_level, -50.0);
    }
}

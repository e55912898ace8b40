//! Scanner configuration
//!
//! Every tunable of the engine, with its documented bounds enforced by
//! [`ScannerConfig::normalize`], plus the persisted scanner document. Field
//! names in the serialized form match the host's scanner document so
//! existing configurations load unchanged.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blacklist::{MAX_BLACKLIST_TOLERANCE, MIN_BLACKLIST_TOLERANCE};
use crate::recording::RecordingSettings;
use crate::squelch::SquelchSettings;
use crate::types::{Hz, ScanResult};

/// Tick-rate cap without `unlockHighSpeed`.
pub const SCAN_RATE_CAP_HZ: u32 = 50;
/// Tick-rate cap with `unlockHighSpeed`.
pub const SCAN_RATE_CAP_UNLOCKED_HZ: u32 = 2_000;

/// Allowed passband-ratio values, in percent of the VFO bandwidth.
pub const PASSBAND_RATIO_STEPS: [f64; 7] = [5.0, 10.0, 20.0, 30.0, 50.0, 75.0, 100.0];

/// One named legacy scanning range with its own gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrequencyRange {
    pub name: String,
    pub start_freq: Hz,
    pub stop_freq: Hz,
    pub enabled: bool,
    /// RF gain in dB applied when the scanner enters this range.
    pub gain: f32,
}

impl Default for FrequencyRange {
    fn default() -> Self {
        Self {
            name: "New Range".to_string(),
            start_freq: 88.0e6,
            stop_freq: 108.0e6,
            enabled: true,
            gain: 20.0,
        }
    }
}

impl FrequencyRange {
    pub fn new(name: &str, start_freq: Hz, stop_freq: Hz) -> Self {
        Self {
            name: name.to_string(),
            start_freq,
            stop_freq,
            ..Default::default()
        }
    }
}

/// All engine tunables and persisted counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerConfig {
    /// Legacy single-range start, used when no ranges are defined.
    pub start_freq: Hz,
    /// Legacy single-range stop.
    pub stop_freq: Hz,
    /// FFT-analysis step while sweeping, 1 kHz .. 500 kHz.
    pub interval: Hz,
    /// Detection width as percent of the VFO bandwidth.
    pub passband_ratio: f64,
    /// Settle time after a retune, ms.
    pub tuning_time: u64,
    /// Hold time on signal loss before resuming the sweep, ms.
    pub linger_time: u64,
    /// Recompute `tuning_time` from the scan rate.
    pub tuning_time_auto: bool,
    /// Detection threshold in dBFS, -150 .. 0.
    pub level: f32,
    /// Sweep direction: up when `true`.
    pub scan_up: bool,
    /// Blacklist match radius in Hz.
    pub blacklist_tolerance: Hz,
    pub blacklisted_freqs: Vec<Hz>,
    /// Squelch hysteresis in dB, 0 .. 10.
    pub squelch_delta: f32,
    /// Track the noise floor for the close threshold.
    pub squelch_delta_auto: bool,
    pub mute_while_scanning: bool,
    pub aggressive_mute: bool,
    /// Aggressive-mute squelch value, -10 .. 0 dB.
    pub aggressive_mute_level: f32,
    /// Raise the tick-rate cap from 50 to 2000 Hz and relax the
    /// tuning/linger floors.
    pub unlock_high_speed: bool,
    /// Engine ticks per second.
    pub scan_rate_hz: u32,
    pub auto_record: bool,
    /// Recordings shorter than this many seconds are deleted.
    pub auto_record_min_duration: u64,
    pub auto_record_path: PathBuf,
    /// Filename template with `$y $M $d $h $m $s $f $r $n` placeholders.
    pub auto_record_name_template: String,
    pub recording_sequence_num: u32,
    pub recording_files_count: u32,
    pub last_reset_date: NaiveDate,
    pub frequency_ranges: Vec<FrequencyRange>,
    pub current_range_index: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            start_freq: 88.0e6,
            stop_freq: 108.0e6,
            interval: 100_000.0,
            passband_ratio: 10.0,
            tuning_time: 250,
            linger_time: 1_000,
            tuning_time_auto: false,
            level: -50.0,
            scan_up: true,
            blacklist_tolerance: 1_000.0,
            blacklisted_freqs: Vec::new(),
            squelch_delta: 0.0,
            squelch_delta_auto: false,
            mute_while_scanning: false,
            aggressive_mute: false,
            aggressive_mute_level: -3.0,
            unlock_high_speed: false,
            scan_rate_hz: 10,
            auto_record: false,
            auto_record_min_duration: 5,
            auto_record_path: PathBuf::from("recordings"),
            auto_record_name_template: "rec_$y$M$d_$h$m$s_$f".to_string(),
            recording_sequence_num: 0,
            recording_files_count: 0,
            last_reset_date: NaiveDate::from_ymd_opt(1970, 1, 1)
                .expect("epoch date is representable"),
            frequency_ranges: Vec::new(),
            current_range_index: 0,
        }
    }
}

impl ScannerConfig {
    /// Clamp every field into its documented bounds. Called after loading a
    /// document and before the engine copies values out.
    pub fn normalize(&mut self) {
        self.interval = self.interval.clamp(1_000.0, 500_000.0);
        self.passband_ratio = nearest_passband_ratio(self.passband_ratio);

        let rate_cap = if self.unlock_high_speed {
            SCAN_RATE_CAP_UNLOCKED_HZ
        } else {
            SCAN_RATE_CAP_HZ
        };
        self.scan_rate_hz = self.scan_rate_hz.clamp(1, rate_cap);

        let tuning_floor = if self.unlock_high_speed { 10 } else { 100 };
        self.tuning_time = self.tuning_time.clamp(tuning_floor, 10_000);
        let linger_floor = if self.unlock_high_speed { 50 } else { 100 };
        self.linger_time = self.linger_time.clamp(linger_floor, 10_000);

        self.level = self.level.clamp(-150.0, 0.0);
        self.blacklist_tolerance = self
            .blacklist_tolerance
            .clamp(MIN_BLACKLIST_TOLERANCE, MAX_BLACKLIST_TOLERANCE);
        self.squelch_delta = self.squelch_delta.clamp(0.0, 10.0);
        self.aggressive_mute_level = self.aggressive_mute_level.clamp(-10.0, 0.0);
        self.auto_record_min_duration = self.auto_record_min_duration.clamp(1, 60);
        if !self.frequency_ranges.is_empty() {
            self.current_range_index = self
                .current_range_index
                .min(self.frequency_ranges.len() - 1);
        } else {
            self.current_range_index = 0;
        }
    }

    /// Ticks per second after applying the high-speed cap.
    pub fn effective_scan_rate_hz(&self) -> u32 {
        let cap = if self.unlock_high_speed {
            SCAN_RATE_CAP_UNLOCKED_HZ
        } else {
            SCAN_RATE_CAP_HZ
        };
        self.scan_rate_hz.clamp(1, cap)
    }

    /// Worker tick period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.effective_scan_rate_hz()))
    }

    /// Retune settle time, honoring `tuning_time_auto`.
    pub fn effective_tuning_time(&self) -> Duration {
        if self.tuning_time_auto {
            let ms = (250 * 50 / u64::from(self.effective_scan_rate_hz())).max(10);
            Duration::from_millis(ms)
        } else {
            Duration::from_millis(self.tuning_time)
        }
    }

    pub fn linger_duration(&self) -> Duration {
        Duration::from_millis(self.linger_time)
    }

    /// Detection width multiplier, 0.05 .. 1.0.
    pub fn passband_fraction(&self) -> f64 {
        self.passband_ratio / 100.0
    }

    /// Indices of enabled frequency ranges, in order.
    pub fn active_range_indices(&self) -> Vec<usize> {
        self.frequency_ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| r.enabled)
            .map(|(i, _)| i)
            .collect()
    }

    // ---- Range management ----

    pub fn add_range(&mut self, range: FrequencyRange) {
        self.frequency_ranges.push(range);
    }

    /// Remove a range by index; out-of-range indices are ignored. The
    /// cursor is pulled back inside the remaining ranges.
    pub fn remove_range(&mut self, index: usize) {
        if index < self.frequency_ranges.len() {
            self.frequency_ranges.remove(index);
            if !self.frequency_ranges.is_empty() {
                self.current_range_index = self
                    .current_range_index
                    .min(self.frequency_ranges.len() - 1);
            } else {
                self.current_range_index = 0;
            }
        }
    }

    pub fn toggle_range(&mut self, index: usize) {
        if let Some(range) = self.frequency_ranges.get_mut(index) {
            range.enabled = !range.enabled;
        }
    }

    pub fn update_range(&mut self, index: usize, range: FrequencyRange) {
        if let Some(slot) = self.frequency_ranges.get_mut(index) {
            *slot = range;
        }
    }

    /// Squelch settings bundle for the controller.
    pub fn squelch_settings(&self) -> SquelchSettings {
        SquelchSettings {
            delta_db: self.squelch_delta,
            delta_auto: self.squelch_delta_auto,
            mute_while_scanning: self.mute_while_scanning,
            aggressive_mute: self.aggressive_mute,
            aggressive_mute_level_db: self.aggressive_mute_level,
        }
    }

    /// Recording settings bundle for the coordinator.
    pub fn recording_settings(&self) -> RecordingSettings {
        RecordingSettings {
            enabled: self.auto_record,
            min_duration: Duration::from_secs(self.auto_record_min_duration),
            directory: self.auto_record_path.clone(),
            template: self.auto_record_name_template.clone(),
        }
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a document, clamping out-of-bounds values with a warning.
    pub fn from_json(json: &str) -> ScanResult<Self> {
        let mut config: ScannerConfig = serde_json::from_str(json)?;
        let raw = config.clone();
        config.normalize();
        if config != raw {
            warn!("scanner config contained out-of-bounds values, clamped");
        }
        Ok(config)
    }
}

/// Snap a percentage to the nearest allowed passband-ratio step.
fn nearest_passband_ratio(value: f64) -> f64 {
    let mut best = PASSBAND_RATIO_STEPS[0];
    for &step in &PASSBAND_RATIO_STEPS {
        if (value - step).abs() < (value - best).abs() {
            best = step;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_normalized() {
        let mut config = ScannerConfig::default();
        let before = config.clone();
        config.normalize();
        assert_eq!(config, before);
    }

    #[test]
    fn test_interval_and_level_clamped() {
        let mut config = ScannerConfig {
            interval: 10.0,
            level: -500.0,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.interval, 1_000.0);
        assert_eq!(config.level, -150.0);

        config.interval = 1.0e9;
        config.level = 20.0;
        config.normalize();
        assert_eq!(config.interval, 500_000.0);
        assert_eq!(config.level, 0.0);
    }

    #[test]
    fn test_passband_ratio_snaps_to_allowed_steps() {
        for (input, expected) in [(1.0, 5.0), (12.0, 10.0), (26.0, 30.0), (60.0, 50.0), (99.0, 100.0)] {
            assert_eq!(nearest_passband_ratio(input), expected, "input {input}");
        }
        let mut config = ScannerConfig {
            passband_ratio: 33.0,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.passband_ratio, 30.0);
        assert_eq!(config.passband_fraction(), 0.3);
    }

    #[test]
    fn test_scan_rate_cap_depends_on_unlock() {
        let mut config = ScannerConfig {
            scan_rate_hz: 500,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.scan_rate_hz, 50);
        assert_eq!(config.tick_period(), Duration::from_millis(20));

        let mut config = ScannerConfig {
            scan_rate_hz: 500,
            unlock_high_speed: true,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.scan_rate_hz, 500);

        let mut config = ScannerConfig {
            scan_rate_hz: 5_000,
            unlock_high_speed: true,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.scan_rate_hz, 2_000);
    }

    #[test]
    fn test_tuning_and_linger_floors() {
        let mut config = ScannerConfig {
            tuning_time: 1,
            linger_time: 1,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.tuning_time, 100);
        assert_eq!(config.linger_time, 100);

        let mut config = ScannerConfig {
            tuning_time: 1,
            linger_time: 1,
            unlock_high_speed: true,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.tuning_time, 10);
        assert_eq!(config.linger_time, 50);
    }

    #[test]
    fn test_tuning_time_auto_recomputes() {
        let mut config = ScannerConfig {
            tuning_time_auto: true,
            scan_rate_hz: 50,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.effective_tuning_time(), Duration::from_millis(250));

        config.scan_rate_hz = 10;
        assert_eq!(config.effective_tuning_time(), Duration::from_millis(1_250));

        // floors at 10 ms for very fast rates
        config.unlock_high_speed = true;
        config.scan_rate_hz = 2_000;
        assert_eq!(config.effective_tuning_time(), Duration::from_millis(10));
    }

    #[test]
    fn test_range_index_clamped() {
        let mut config = ScannerConfig {
            frequency_ranges: vec![FrequencyRange::default()],
            current_range_index: 5,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.current_range_index, 0);
    }

    #[test]
    fn test_range_management() {
        let mut config = ScannerConfig::default();
        config.add_range(FrequencyRange::new("a", 88.0e6, 108.0e6));
        config.add_range(FrequencyRange::new("b", 118.0e6, 137.0e6));
        config.current_range_index = 1;

        config.toggle_range(0);
        assert!(!config.frequency_ranges[0].enabled);
        config.toggle_range(0);
        assert!(config.frequency_ranges[0].enabled);

        config.update_range(1, FrequencyRange::new("marine", 156.0e6, 162.0e6));
        assert_eq!(config.frequency_ranges[1].name, "marine");

        config.remove_range(1);
        assert_eq!(config.frequency_ranges.len(), 1);
        assert_eq!(config.current_range_index, 0);

        // out-of-range indices are ignored
        config.remove_range(9);
        config.toggle_range(9);
        assert_eq!(config.frequency_ranges.len(), 1);
    }

    #[test]
    fn test_active_range_indices() {
        let mut a = FrequencyRange::new("a", 88.0e6, 108.0e6);
        a.enabled = false;
        let b = FrequencyRange::new("b", 118.0e6, 137.0e6);
        let config = ScannerConfig {
            frequency_ranges: vec![a, b],
            ..Default::default()
        };
        assert_eq!(config.active_range_indices(), vec![1]);
    }

    #[test]
    fn test_document_roundtrip() {
        let mut config = ScannerConfig::default();
        config.scan_up = false;
        config.blacklisted_freqs = vec![98.7e6];
        config.frequency_ranges = vec![FrequencyRange::new("Airband", 118.0e6, 137.0e6)];
        config.recording_sequence_num = 42;
        config.last_reset_date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        let json = config.to_json().unwrap();
        let loaded = ScannerConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_document_field_names_match_host_layout() {
        let config = ScannerConfig::default();
        let value: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        for key in [
            "startFreq",
            "stopFreq",
            "interval",
            "passbandRatio",
            "tuningTime",
            "lingerTime",
            "level",
            "scanUp",
            "blacklistTolerance",
            "blacklistedFreqs",
            "squelchDelta",
            "squelchDeltaAuto",
            "muteWhileScanning",
            "aggressiveMute",
            "aggressiveMuteLevel",
            "unlockHighSpeed",
            "tuningTimeAuto",
            "scanRateHz",
            "autoRecord",
            "autoRecordMinDuration",
            "autoRecordPath",
            "autoRecordNameTemplate",
            "recordingSequenceNum",
            "recordingFilesCount",
            "lastResetDate",
            "frequencyRanges",
            "currentRangeIndex",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_partial_document_loads_with_defaults() {
        let json = r#"{ "startFreq": 430000000.0, "level": -60.0 }"#;
        let config = ScannerConfig::from_json(json).unwrap();
        assert_eq!(config.start_freq, 430.0e6);
        assert_eq!(config.level, -60.0);
        assert_eq!(config.interval, 100_000.0);
        assert!(config.scan_up);
    }

    #[test]
    fn test_out_of_bounds_document_is_clamped_on_load() {
        let json = r#"{ "scanRateHz": 900, "squelchDelta": 50.0, "aggressiveMuteLevel": -99.0 }"#;
        let config = ScannerConfig::from_json(json).unwrap();
        assert_eq!(config.scan_rate_hz, 50);
        assert_eq!(config.squelch_delta, 10.0);
        assert_eq!(config.aggressive_mute_level, -10.0);
    }
}

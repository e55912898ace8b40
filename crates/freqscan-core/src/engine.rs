//! Scan engine
//!
//! A cooperative worker that steps the receiver across the scan list (or
//! the legacy frequency ranges when the list is empty), watches the live
//! FFT for signals, and moves between three states:
//!
//! - `Scanning` - seeking: sweep candidates, hop entries, wrap ranges
//! - `Tuning` - settling after a retune that left the FFT window
//! - `Receiving` - locked on a signal until it stays quiet for the linger
//!   time
//!
//! The worker owns all radio access during a scan; the host mutates the
//! catalog, blacklist and config from its own threads and the engine picks
//! the changes up at the next tick. Every fallible step returns a result and
//! the tick classifies the outcome; only a fatal classification ends the
//! loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::blacklist::{Blacklist, NameCache};
use crate::bookmark::BookmarkKind;
use crate::catalog::FrequencyCatalog;
use crate::centering::{find_signal_peak, CenteringDecision, PeakSearch, FALLBACK_BANDWIDTH};
use crate::config::ScannerConfig;
use crate::profile_apply::ProfileApplier;
use crate::radio::{ignore_missing, FftSource, Receiver, Recorder};
use crate::recording::RecordingCoordinator;
use crate::scan_list::{ScanEntry, ScanListBuilder};
use crate::spectrum::SpectrumFrame;
use crate::squelch::{SquelchController, AGGRESSIVE_MUTE_SETTLE};
use crate::types::{DemodMode, Hz, ScanError, ScanResult};

/// Detection window for single-frequency entries.
pub const SINGLE_ENTRY_DETECTION_WIDTH: Hz = 5_000.0;

/// Minimum spacing between re-centering attempts while receiving.
pub const CENTERING_INTERVAL: Duration = Duration::from_millis(100);

/// Hard cap on candidates per sweep, against degenerate configurations.
const MAX_SWEEP_STEPS: usize = 1_000;

/// Scanner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Scanning,
    Tuning,
    Receiving,
}

/// Sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    Up,
    Down,
}

/// Classification of one tick.
#[derive(Debug)]
enum TickOutcome {
    /// Normal progress.
    Continue,
    /// Nothing usable this tick (no FFT frame, transient radio error).
    Skip,
    /// Clean end of the scan (VFO went away, no active ranges).
    Stop(String),
    /// Unrecoverable; the worker ends and surfaces the error.
    Fatal(ScanError),
}

/// Result of a candidate sweep: the first hit, if any, and the extent of
/// frequencies actually examined.
#[derive(Debug, Clone, Copy)]
struct SweepOutcome {
    hit: Option<Hz>,
    lowest: Hz,
    highest: Hz,
}

/// Copy of the entry the engine locked on, taken at lock time. The catalog
/// stays authoritative; these values only steer centering and recording
/// until the lock ends.
#[derive(Debug, Clone)]
struct ActiveEntry {
    from_band: bool,
    bounds: (Hz, Hz),
    profile_bandwidth: Option<Hz>,
    mode: DemodMode,
}

struct EngineCore {
    receiver: Arc<dyn Receiver>,
    fft: Arc<dyn FftSource>,
    recorder: Arc<dyn Recorder>,
    catalog: Arc<Mutex<FrequencyCatalog>>,
    config: Arc<Mutex<ScannerConfig>>,
    blacklist: Arc<Mutex<Blacklist>>,
    builder: Arc<Mutex<ScanListBuilder>>,

    state: ScannerState,
    current: Hz,
    current_index: usize,
    direction: ScanDirection,
    reverse_lock: bool,
    /// RF gain read at start; written back at stop/reset so range and
    /// profile gain writes do not outlive the scan.
    original_gain: Option<f32>,
    last_signal: Instant,
    last_tune: Instant,
    last_center: Instant,
    active_entry: Option<ActiveEntry>,
    entries: Arc<Vec<ScanEntry>>,

    squelch: SquelchController,
    applier: ProfileApplier,
    recording: RecordingCoordinator,
    name_cache: NameCache,
}

impl EngineCore {
    fn snapshot_config(&self) -> ScannerConfig {
        let mut config = self.config.lock().expect("config lock").clone();
        config.normalize();
        config
    }

    fn blacklisted(&self, freq: Hz) -> bool {
        self.blacklist.lock().expect("blacklist lock").contains(freq)
    }

    /// Refresh the scan list; on a rebuild, re-derive the entry index from
    /// the current frequency and drop the profile-apply cache.
    fn refresh_entries(&mut self, now: Instant) {
        let rebuilt = {
            let catalog = self.catalog.lock().expect("catalog lock");
            let mut builder = self.builder.lock().expect("builder lock");
            let fresh = builder.refresh(&catalog, now);
            if Arc::ptr_eq(&fresh, &self.entries) {
                false
            } else {
                self.entries = fresh;
                true
            }
        };
        if rebuilt {
            self.applier.clear();
            if !self.entries.is_empty() {
                self.current_index = nearest_entry(&self.entries, self.current);
                if self.state != ScannerState::Receiving {
                    self.current = self.entries[self.current_index].frequency;
                }
            }
            debug!(entries = self.entries.len(), "scan list refreshed");
        }
    }

    fn tick(&mut self, now: Instant, wall: DateTime<Local>) -> TickOutcome {
        let Some(vfo) = self.receiver.selected_vfo() else {
            return TickOutcome::Stop("no VFO selected".to_string());
        };
        let params = self.snapshot_config();

        self.recording.set_enabled(params.auto_record);
        self.recording.poll_daily_reset(now, wall.date_naive(), false);
        self.refresh_entries(now);

        // settle after a retune that left the FFT window
        if self.state == ScannerState::Tuning {
            if now.duration_since(self.last_tune) < params.effective_tuning_time() {
                return TickOutcome::Continue;
            }
            self.state = ScannerState::Scanning;
        }

        let Some(frame) = self.fft.latest_frame() else {
            return TickOutcome::Skip;
        };

        let vfo_bw = match self.receiver.bandwidth(&vfo) {
            Ok(bw) => bw,
            Err(err) => {
                warn!(%err, "could not read VFO bandwidth");
                return TickOutcome::Skip;
            }
        };

        let result = if self.state == ScannerState::Receiving {
            self.tick_receiving(now, &vfo, &params, &frame, vfo_bw)
        } else if !self.entries.is_empty() {
            self.tick_scan_list(now, wall, &vfo, &params, &frame, vfo_bw)
        } else {
            self.tick_legacy(now, wall, &vfo, &params, &frame, vfo_bw)
        };

        match result {
            Ok(outcome) => outcome,
            Err(err @ ScanError::TransientRadio(_)) => {
                warn!(%err, "transient radio error, retrying next tick");
                TickOutcome::Skip
            }
            Err(ScanError::CorruptedProfile) => {
                warn!("profile failed validation, forcing scan list refresh");
                self.builder.lock().expect("builder lock").invalidate();
                self.applier.clear();
                TickOutcome::Skip
            }
            Err(err) => TickOutcome::Fatal(err),
        }
    }

    // ---- Receiving ----

    fn tick_receiving(
        &mut self,
        now: Instant,
        vfo: &str,
        params: &ScannerConfig,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
    ) -> ScanResult<TickOutcome> {
        let active = self.active_entry.clone();
        let width = match &active {
            Some(entry) if !entry.from_band => SINGLE_ENTRY_DETECTION_WIDTH,
            _ => vfo_bw * params.passband_fraction(),
        };

        let level = frame.max_level(self.current, width);
        if level >= params.level {
            self.last_signal = now;
            if now.duration_since(self.last_center) >= CENTERING_INTERVAL {
                self.last_center = now;
                self.recenter(vfo, frame, vfo_bw, active.as_ref())?;
            }
            return Ok(TickOutcome::Continue);
        }

        if now.duration_since(self.last_signal) >= params.linger_duration() {
            debug!(freq = self.current, "signal lost, resuming scan");
            self.leave_receiving(now, vfo)?;
        }
        Ok(TickOutcome::Continue)
    }

    fn recenter(
        &mut self,
        vfo: &str,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
        active: Option<&ActiveEntry>,
    ) -> ScanResult<()> {
        let profile_bw = active.and_then(|e| e.profile_bandwidth).map(|bw| {
            if bw > vfo_bw {
                warn!(bw, vfo_bw, "profile bandwidth exceeds VFO bandwidth, clamping window");
                vfo_bw
            } else {
                bw
            }
        });
        let search = PeakSearch::for_bandwidth(profile_bw, frame.bin_resolution());
        let CenteringDecision::MoveTo(target) = find_signal_peak(frame, self.current, &search)
        else {
            return Ok(());
        };

        let threshold = profile_bw.map(|bw| 5.0 * bw).unwrap_or(FALLBACK_BANDWIDTH);
        if (target - self.current).abs() > threshold {
            return Ok(());
        }
        if let Some(entry) = active {
            if entry.from_band && !(entry.bounds.0..=entry.bounds.1).contains(&target) {
                return Ok(());
            }
        }
        if self.blacklisted(target) {
            return Ok(());
        }

        debug!(from = self.current, to = target, "re-centering on peak");
        self.receiver.tune(vfo, target)?;
        self.current = target;
        Ok(())
    }

    fn leave_receiving(&mut self, now: Instant, vfo: &str) -> ScanResult<()> {
        self.recording.on_unlock(self.recorder.as_ref(), now);
        self.active_entry = None;
        self.state = ScannerState::Scanning;
        self.squelch.apply_scan_mute(self.receiver.as_ref(), vfo)?;
        Ok(())
    }

    // ---- Scan-list mode ----

    fn tick_scan_list(
        &mut self,
        now: Instant,
        wall: DateTime<Local>,
        vfo: &str,
        params: &ScannerConfig,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
    ) -> ScanResult<TickOutcome> {
        if self.current_index >= self.entries.len() {
            self.current_index = 0;
        }
        let entry = self.entries[self.current_index];
        self.squelch.update_noise_floor(
            frame.max_level(self.current, SINGLE_ENTRY_DETECTION_WIDTH),
            now,
            true,
        );

        if !entry.from_band {
            // single-frequency entry: the exact frequency only, no sweep
            if !self.blacklisted(entry.frequency)
                && frame.max_level(entry.frequency, SINGLE_ENTRY_DETECTION_WIDTH) >= params.level
            {
                self.current = entry.frequency;
                self.lock_on(now, wall, vfo, entry)?;
                return Ok(TickOutcome::Continue);
            }
        } else {
            let (low, high) = {
                let catalog = self.catalog.lock().expect("catalog lock");
                match catalog.resolve(entry.bookmark) {
                    Some(item) => item.bookmark.bounds(),
                    None => {
                        // stale handle: the list is older than the catalog
                        drop(catalog);
                        self.builder.lock().expect("builder lock").invalidate();
                        return Ok(TickOutcome::Skip);
                    }
                }
            };
            let width = vfo_bw * params.passband_fraction();
            let out = self.sweep(params, frame, vfo_bw, width, low, high);
            if let Some(freq) = out.hit {
                self.current = freq;
                self.lock_on(now, wall, vfo, entry)?;
                return Ok(TickOutcome::Continue);
            }
        }

        self.advance_entry(now, vfo, frame, vfo_bw)?;
        Ok(TickOutcome::Continue)
    }

    /// Hop to the next entry in the scan direction, wrapping at the ends
    /// and stepping over blacklisted frequencies.
    fn advance_entry(
        &mut self,
        now: Instant,
        vfo: &str,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
    ) -> ScanResult<()> {
        let len = self.entries.len();
        for _ in 0..len {
            self.current_index = match self.direction {
                ScanDirection::Up => (self.current_index + 1) % len,
                ScanDirection::Down => (self.current_index + len - 1) % len,
            };
            if !self.blacklisted(self.entries[self.current_index].frequency) {
                break;
            }
        }
        self.current = self.entries[self.current_index].frequency;
        self.retune(now, vfo, frame, vfo_bw)
    }

    // ---- Legacy range mode ----

    /// Bounds of the active legacy range. `Ok(None)` means scanning cannot
    /// continue (no enabled ranges).
    fn legacy_bounds(&self, params: &ScannerConfig) -> ScanResult<Option<(Hz, Hz)>> {
        if params.frequency_ranges.is_empty() {
            if params.start_freq >= params.stop_freq {
                return Err(ScanError::InvalidRange {
                    start: params.start_freq,
                    stop: params.stop_freq,
                });
            }
            return Ok(Some((params.start_freq, params.stop_freq)));
        }
        let active = params.active_range_indices();
        if active.is_empty() {
            return Ok(None);
        }
        let cursor = params.current_range_index.min(active.len() - 1);
        let range = &params.frequency_ranges[active[cursor]];
        Ok(Some((range.start_freq, range.stop_freq)))
    }

    /// Move to the next/previous enabled range, apply its gain, and return
    /// the new bounds.
    fn advance_range(&mut self, params: &ScannerConfig, forward: bool) -> Option<(Hz, Hz)> {
        let active = params.active_range_indices();
        if active.is_empty() {
            return None;
        }
        let mut config = self.config.lock().expect("config lock");
        let cursor = config.current_range_index.min(active.len() - 1);
        let next = if forward {
            (cursor + 1) % active.len()
        } else {
            (cursor + active.len() - 1) % active.len()
        };
        config.current_range_index = next;
        let range = &params.frequency_ranges[active[next]];
        info!(range = %range.name, gain = range.gain, "entering frequency range");
        if let Err(err) = ignore_missing(self.receiver.set_gain(range.gain)) {
            warn!(%err, "could not apply range gain");
        }
        Some((range.start_freq, range.stop_freq))
    }

    fn tick_legacy(
        &mut self,
        now: Instant,
        wall: DateTime<Local>,
        vfo: &str,
        params: &ScannerConfig,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
    ) -> ScanResult<TickOutcome> {
        let Some((mut low, mut high)) = self.legacy_bounds(params)? else {
            return Ok(TickOutcome::Stop("no enabled frequency ranges".to_string()));
        };
        if self.current < low || self.current > high {
            self.current = low;
        }

        let width = vfo_bw * params.passband_fraction();
        self.squelch
            .update_noise_floor(frame.max_level(self.current, width), now, true);
        let out = self.sweep(params, frame, vfo_bw, width, low, high);
        if let Some(freq) = out.hit {
            self.current = freq;
            self.lock_on_legacy(now, wall, vfo)?;
            return Ok(TickOutcome::Continue);
        }

        // nothing on the visible spectrum: jump past the examined extent,
        // wrapping across ranges
        match self.direction {
            ScanDirection::Up => {
                self.current = out.highest + params.interval;
                if self.current > high {
                    if params.frequency_ranges.is_empty() {
                        while self.current > high {
                            self.current = low + (self.current - high - params.interval);
                        }
                        if self.current < low {
                            self.current = low;
                        }
                    } else if let Some((start, _stop)) = self.advance_range(params, true) {
                        self.current = start;
                    }
                }
            }
            ScanDirection::Down => {
                self.current = out.lowest - params.interval;
                if self.current < low {
                    if params.frequency_ranges.is_empty() {
                        while self.current < low {
                            self.current = high - (low - self.current - params.interval);
                        }
                        if self.current > high {
                            self.current = high;
                        }
                    } else if let Some((_start, stop)) = self.advance_range(params, false) {
                        self.current = stop;
                    }
                }
            }
        }
        // keep the bounds in sync after a possible range switch
        if let Ok(Some(bounds)) = self.legacy_bounds(&self.snapshot_config()) {
            (low, high) = bounds;
            self.current = self.current.clamp(low, high);
        }

        self.retune(now, vfo, frame, vfo_bw)?;
        Ok(TickOutcome::Continue)
    }

    // ---- Sweep ----

    /// Sweep in the primary direction, then (unless reverse-locked) once in
    /// the opposite direction. Returns the hit plus the extent actually
    /// examined, so the caller can jump past it.
    fn sweep(
        &mut self,
        params: &ScannerConfig,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
        width: Hz,
        low: Hz,
        high: Hz,
    ) -> SweepOutcome {
        let mut out = self.sweep_dir(params, frame, vfo_bw, width, low, high, self.direction);
        if out.hit.is_none() {
            if self.reverse_lock {
                self.reverse_lock = false;
            } else {
                let back =
                    self.sweep_dir(params, frame, vfo_bw, width, low, high, opposite(self.direction));
                out.lowest = out.lowest.min(back.lowest);
                out.highest = out.highest.max(back.highest);
                out.hit = back.hit;
            }
        }
        out
    }

    /// Step away from `current` by `interval` within `[low, high]` and the
    /// visible FFT window, skipping blacklisted candidates; the first
    /// candidate at or above the detection threshold wins.
    fn sweep_dir(
        &mut self,
        params: &ScannerConfig,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
        width: Hz,
        low: Hz,
        high: Hz,
        direction: ScanDirection,
    ) -> SweepOutcome {
        let step = match direction {
            ScanDirection::Up => params.interval,
            ScanDirection::Down => -params.interval,
        };
        let mut out = SweepOutcome {
            hit: None,
            lowest: self.current,
            highest: self.current,
        };
        let mut freq = self.current;
        for _ in 0..MAX_SWEEP_STEPS {
            freq += step;
            if freq < low || freq > high {
                break;
            }
            if !frame.covers(freq, vfo_bw / 2.0) {
                break;
            }
            if self.blacklisted(freq) {
                continue;
            }
            out.lowest = out.lowest.min(freq);
            out.highest = out.highest.max(freq);
            if frame.max_level(freq, width) >= params.level {
                out.hit = Some(freq);
                break;
            }
        }
        out
    }

    // ---- Locking ----

    /// Common lock sequence: aggressive mute, retune, scan-mute restore,
    /// profile (or basic) apply, squelch delta, recording start. The
    /// scan-mute restore always happens before any profile squelch write.
    fn lock_on(
        &mut self,
        now: Instant,
        wall: DateTime<Local>,
        vfo: &str,
        entry: ScanEntry,
    ) -> ScanResult<()> {
        let (active, profile, basic) = {
            let catalog = self.catalog.lock().expect("catalog lock");
            let Some(item) = catalog.resolve(entry.bookmark) else {
                drop(catalog);
                self.builder.lock().expect("builder lock").invalidate();
                return Err(ScanError::StaleEntry);
            };
            let profile = item.bookmark.profile.clone();
            let basic = match item.bookmark.kind {
                BookmarkKind::Frequency {
                    bandwidth, mode, ..
                } => Some((mode, bandwidth)),
                BookmarkKind::Band { .. } => None,
            };
            let active = ActiveEntry {
                from_band: entry.from_band,
                bounds: item.bookmark.bounds(),
                profile_bandwidth: profile.as_ref().map(|p| f64::from(p.bandwidth)),
                mode: profile
                    .as_ref()
                    .map(|p| p.demod_mode)
                    .or(basic.map(|(mode, _)| mode))
                    .unwrap_or_default(),
            };
            (active, profile, basic)
        };

        if self.squelch.aggressive_mute(self.receiver.as_ref(), vfo)? {
            thread::sleep(AGGRESSIVE_MUTE_SETTLE);
        }
        self.receiver.tune(vfo, self.current)?;
        self.squelch.release_scan_mute(self.receiver.as_ref(), vfo)?;

        match &profile {
            Some(profile) if profile.auto_apply => {
                self.applier.apply(
                    profile,
                    self.receiver.as_ref(),
                    vfo,
                    self.current,
                    self.squelch.scan_mute_active(),
                )?;
            }
            _ => {
                if let Some((mode, bandwidth)) = basic {
                    self.applier
                        .apply_basic(self.receiver.as_ref(), vfo, mode, bandwidth)?;
                }
            }
        }
        self.squelch.apply_delta(self.receiver.as_ref(), vfo)?;

        info!(freq = self.current, "signal locked");
        self.state = ScannerState::Receiving;
        self.last_signal = now;
        self.last_center = now;
        let mode = active.mode;
        self.active_entry = Some(active);

        let settings = self.snapshot_config().recording_settings();
        self.recording.on_lock(
            self.recorder.as_ref(),
            &settings,
            self.current,
            mode,
            now,
            wall,
        );
        Ok(())
    }

    /// Lock in legacy range mode, where no bookmark backs the frequency.
    fn lock_on_legacy(&mut self, now: Instant, wall: DateTime<Local>, vfo: &str) -> ScanResult<()> {
        if self.squelch.aggressive_mute(self.receiver.as_ref(), vfo)? {
            thread::sleep(AGGRESSIVE_MUTE_SETTLE);
        }
        self.receiver.tune(vfo, self.current)?;
        self.squelch.release_scan_mute(self.receiver.as_ref(), vfo)?;
        self.squelch.apply_delta(self.receiver.as_ref(), vfo)?;

        info!(freq = self.current, "signal locked");
        self.state = ScannerState::Receiving;
        self.last_signal = now;
        self.last_center = now;
        let mode = self.receiver.mode_hint(vfo).unwrap_or_default();
        self.active_entry = Some(ActiveEntry {
            from_band: true,
            bounds: (f64::MIN, f64::MAX),
            profile_bandwidth: None,
            mode,
        });

        let settings = self.snapshot_config().recording_settings();
        self.recording.on_lock(
            self.recorder.as_ref(),
            &settings,
            self.current,
            mode,
            now,
            wall,
        );
        Ok(())
    }

    /// Retune to `current`: scan-mute, tune, and enter `Tuning` when the
    /// new frequency falls outside the visible FFT window.
    fn retune(
        &mut self,
        now: Instant,
        vfo: &str,
        frame: &SpectrumFrame,
        vfo_bw: Hz,
    ) -> ScanResult<()> {
        self.squelch.apply_scan_mute(self.receiver.as_ref(), vfo)?;
        self.receiver.tune(vfo, self.current)?;
        if !frame.covers(self.current, vfo_bw / 2.0) {
            self.last_tune = now;
            self.state = ScannerState::Tuning;
            debug!(freq = self.current, "left FFT window, settling");
        }
        Ok(())
    }

    /// Tear down at the end of a scan: finish recording, restore squelch
    /// and gain, persist recording counters.
    fn shutdown(&mut self, now: Instant) {
        self.recording.finalize(self.recorder.as_ref(), now);
        if let Some(vfo) = self.receiver.selected_vfo() {
            if let Err(err) = self.squelch.restore(self.receiver.as_ref(), &vfo) {
                warn!(%err, "could not restore squelch");
            }
        }
        if let Some(gain) = self.original_gain.take() {
            if let Err(err) = ignore_missing(self.receiver.set_gain(gain)) {
                warn!(%err, "could not restore gain");
            }
        }
        let mut config = self.config.lock().expect("config lock");
        config.recording_sequence_num = self.recording.sequence();
        config.recording_files_count = self.recording.daily_count();
        config.last_reset_date = self.recording.last_reset_date();
        self.active_entry = None;
        self.state = ScannerState::Scanning;
    }
}

fn opposite(direction: ScanDirection) -> ScanDirection {
    match direction {
        ScanDirection::Up => ScanDirection::Down,
        ScanDirection::Down => ScanDirection::Up,
    }
}

/// Index of the entry whose frequency is closest to `freq`.
fn nearest_entry(entries: &[ScanEntry], freq: Hz) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, entry) in entries.iter().enumerate() {
        let dist = (entry.frequency - freq).abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Public engine handle: owns the worker thread and exposes the control
/// surface and read-only queries.
pub struct ScanEngine {
    core: Arc<Mutex<EngineCore>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    config: Arc<Mutex<ScannerConfig>>,
    catalog: Arc<Mutex<FrequencyCatalog>>,
    blacklist: Arc<Mutex<Blacklist>>,
    builder: Arc<Mutex<ScanListBuilder>>,
}

impl ScanEngine {
    /// Wire an engine to its collaborators. The blacklist is seeded from the
    /// config's persisted entries.
    pub fn new(
        receiver: Arc<dyn Receiver>,
        fft: Arc<dyn FftSource>,
        recorder: Arc<dyn Recorder>,
        catalog: Arc<Mutex<FrequencyCatalog>>,
        config: Arc<Mutex<ScannerConfig>>,
    ) -> Self {
        let (blacklist, recording) = {
            let mut cfg = config.lock().expect("config lock");
            cfg.normalize();
            (
                Blacklist::from_parts(cfg.blacklisted_freqs.clone(), cfg.blacklist_tolerance),
                RecordingCoordinator::new(
                    cfg.auto_record,
                    cfg.recording_sequence_num,
                    cfg.recording_files_count,
                    cfg.last_reset_date,
                ),
            )
        };
        let blacklist = Arc::new(Mutex::new(blacklist));
        let builder = Arc::new(Mutex::new(ScanListBuilder::new()));
        let now = Instant::now();
        let squelch_settings = config.lock().expect("config lock").squelch_settings();
        let core = EngineCore {
            receiver,
            fft,
            recorder,
            catalog: Arc::clone(&catalog),
            config: Arc::clone(&config),
            blacklist: Arc::clone(&blacklist),
            builder: Arc::clone(&builder),
            state: ScannerState::Scanning,
            current: 0.0,
            current_index: 0,
            direction: ScanDirection::Up,
            reverse_lock: false,
            original_gain: None,
            last_signal: now,
            last_tune: now,
            last_center: now,
            active_entry: None,
            entries: Arc::new(Vec::new()),
            squelch: SquelchController::new(squelch_settings),
            applier: ProfileApplier::new(),
            recording,
            name_cache: NameCache::new(),
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            config,
            catalog,
            blacklist,
            builder,
        }
    }

    /// Shared blacklist handle for host-side editing.
    pub fn blacklist(&self) -> Arc<Mutex<Blacklist>> {
        Arc::clone(&self.blacklist)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Read-only snapshot of the scan list, rebuilt if stale. Valid until
    /// the next catalog edit or cache expiry.
    pub fn scan_list(&self) -> Arc<Vec<ScanEntry>> {
        let catalog = self.catalog.lock().expect("catalog lock");
        self.builder
            .lock()
            .expect("builder lock")
            .refresh(&catalog, Instant::now())
    }

    /// Display name for a frequency, answered from the engine's cache.
    pub fn bookmark_name(&self, freq: Hz) -> Option<String> {
        // lock order matches the tick path: core, then catalog, then
        // blacklist
        let mut core = self.core.lock().expect("core lock");
        let catalog = self.catalog.lock().expect("catalog lock");
        let blacklist = self.blacklist.lock().expect("blacklist lock");
        core.name_cache.lookup(freq, &catalog, &blacklist)
    }

    /// Start scanning. Refuses when no receiver is selected, the source is
    /// not producing samples, or there is nothing scannable.
    pub fn start(&mut self) -> ScanResult<()> {
        if self.is_running() {
            warn!("scanner already running");
            return Ok(());
        }
        self.prepare(Instant::now())?;
        self.running.store(true, Ordering::SeqCst);

        let core = Arc::clone(&self.core);
        let running = Arc::clone(&self.running);
        let config = Arc::clone(&self.config);
        let handle = thread::Builder::new()
            .name("freqscan-worker".to_string())
            .spawn(move || worker_loop(core, running, config))
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                ScanError::Fatal(format!("could not spawn worker: {err}"))
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Validate readiness and put the core into its initial scanning state.
    fn prepare(&mut self, now: Instant) -> ScanResult<()> {
        let mut core = self.core.lock().expect("core lock");
        let core = &mut *core;

        let Some(vfo) = core.receiver.selected_vfo() else {
            return Err(ScanError::NotReady("no receiver selected".to_string()));
        };
        if !core.receiver.is_streaming() {
            return Err(ScanError::NotReady("radio source is not running".to_string()));
        }

        let params = core.snapshot_config();
        let entries = {
            let catalog = core.catalog.lock().expect("catalog lock");
            core.builder
                .lock()
                .expect("builder lock")
                .refresh(&catalog, now)
        };

        if entries.is_empty() {
            // legacy fallback must be usable
            match core.legacy_bounds(&params)? {
                Some((low, _high)) => core.current = low,
                None => {
                    return Err(ScanError::NotReady(
                        "scan list is empty and no frequency ranges are enabled".to_string(),
                    ))
                }
            }
        } else {
            let open = {
                let blacklist = core.blacklist.lock().expect("blacklist lock");
                entries.iter().position(|e| !blacklist.contains(e.frequency))
            };
            let Some(first) = open else {
                return Err(ScanError::NotReady(
                    "every scan list entry is blacklisted".to_string(),
                ));
            };
            core.current_index = first;
            core.current = entries[first].frequency;
        }
        core.entries = entries;

        core.state = ScannerState::Scanning;
        core.direction = if params.scan_up {
            ScanDirection::Up
        } else {
            ScanDirection::Down
        };
        core.reverse_lock = false;
        core.last_signal = now;
        core.last_tune = now;
        core.last_center = now;
        core.active_entry = None;
        core.applier.clear();
        core.squelch = SquelchController::new(params.squelch_settings());
        core.squelch.start(core.receiver.as_ref(), &vfo)?;
        core.original_gain = core.receiver.gain().ok();
        core.recording = RecordingCoordinator::new(
            params.auto_record,
            params.recording_sequence_num,
            params.recording_files_count,
            params.last_reset_date,
        );
        core.recording.poll_daily_reset(now, Local::now().date_naive(), true);

        // per-range gain for the starting range
        if !params.frequency_ranges.is_empty() {
            let active = params.active_range_indices();
            if let Some(&idx) = active.get(params.current_range_index.min(active.len().saturating_sub(1))) {
                let gain = params.frequency_ranges[idx].gain;
                if let Err(err) = ignore_missing(core.receiver.set_gain(gain)) {
                    warn!(%err, "could not apply initial range gain");
                }
            }
        }
        info!(freq_mhz = core.current / 1e6, "scanner starting");
        Ok(())
    }

    /// Stop scanning: idempotent; joins the worker, which restores squelch
    /// and finalizes any active recording on its way out.
    pub fn stop(&mut self) {
        if !self.is_running() && self.worker.is_none() {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("scanner worker panicked");
                // the worker could not run its exit path; restore here
                self.core.lock().expect("core lock").shutdown(Instant::now());
            }
        }
    }

    /// Return to the first legal entry and clear any lock.
    pub fn reset(&mut self) {
        let now = Instant::now();
        let mut core = self.core.lock().expect("core lock");
        let core = &mut *core;
        if core.state == ScannerState::Receiving {
            core.recording.on_unlock(core.recorder.as_ref(), now);
        }
        core.state = ScannerState::Scanning;
        core.reverse_lock = false;
        core.active_entry = None;
        core.applier.clear();
        if let Some(first) = core.entries.first() {
            core.current_index = 0;
            core.current = first.frequency;
        } else {
            let params = core.snapshot_config();
            if let Ok(Some((low, _))) = core.legacy_bounds(&params) {
                core.current = low;
            }
        }
        if let Some(vfo) = core.receiver.selected_vfo() {
            if let Err(err) = core.squelch.restore(core.receiver.as_ref(), &vfo) {
                warn!(%err, "could not restore squelch on reset");
            }
        }
        // keep the captured value: the scan goes on and stop() restores too
        if let Some(gain) = core.original_gain {
            if let Err(err) = ignore_missing(core.receiver.set_gain(gain)) {
                warn!(%err, "could not restore gain on reset");
            }
        }
        info!(freq = core.current, "scanner reset");
    }

    /// Set the sweep direction. Takes effect on the next tick: any lock is
    /// abandoned, and the opposite-direction retry is suppressed for one
    /// scanning pass.
    pub fn set_direction(&mut self, up: bool) {
        let now = Instant::now();
        let mut core = self.core.lock().expect("core lock");
        let core = &mut *core;
        core.direction = if up {
            ScanDirection::Up
        } else {
            ScanDirection::Down
        };
        core.reverse_lock = true;
        if core.state == ScannerState::Receiving {
            core.recording.on_unlock(core.recorder.as_ref(), now);
            core.active_entry = None;
        }
        core.state = ScannerState::Scanning;
        self.config.lock().expect("config lock").scan_up = up;
    }

    /// Current engine state, for host status displays.
    pub fn state(&self) -> ScannerState {
        self.core.lock().expect("core lock").state
    }

    /// Frequency the scanner is at.
    pub fn current_frequency(&self) -> Hz {
        self.core.lock().expect("core lock").current
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker loop: paced ticks on a monotonic clock. Falling more than two
/// periods behind resets the schedule instead of bursting to catch up.
fn worker_loop(
    core: Arc<Mutex<EngineCore>>,
    running: Arc<AtomicBool>,
    config: Arc<Mutex<ScannerConfig>>,
) {
    info!("scanner worker started");
    let mut next_wake = Instant::now();
    while running.load(Ordering::SeqCst) {
        let period = {
            let mut cfg = config.lock().expect("config lock").clone();
            cfg.normalize();
            cfg.tick_period()
        };
        next_wake += period;
        let now = Instant::now();
        if next_wake > now {
            thread::sleep(next_wake - now);
        } else if now.duration_since(next_wake) > 2 * period {
            next_wake = now;
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let outcome = {
            let mut core = core.lock().expect("core lock");
            core.tick(Instant::now(), Local::now())
        };
        match outcome {
            TickOutcome::Continue | TickOutcome::Skip => {}
            TickOutcome::Stop(reason) => {
                info!(reason, "scanner stopping");
                break;
            }
            TickOutcome::Fatal(err) => {
                error!(%err, "scanner worker failed");
                break;
            }
        }
    }
    core.lock().expect("core lock").shutdown(Instant::now());
    running.store(false, Ordering::SeqCst);
    info!("scanner worker ended");
}

//! Recording coordination
//!
//! Drives the host recorder when the scanner locks and unlocks: claims
//! external control, starts a recording with a templated filename, and on
//! stop either keeps the file (counting it) or deletes it when it ran
//! shorter than the minimum duration that was in force when it started.
//! A per-day file counter resets across local midnight.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike};
use tracing::{debug, info, warn};

use crate::radio::Recorder;
use crate::types::{DemodMode, Hz};

/// External-control owner name the coordinator claims the recorder under.
pub const RECORDER_OWNER: &str = "scanner";

/// Minimum spacing between midnight polls.
pub const DAILY_RESET_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Recording behavior, copied from the scanner config at engine start.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSettings {
    /// Master switch (`autoRecord`).
    pub enabled: bool,
    /// Recordings shorter than this are deleted.
    pub min_duration: Duration,
    /// Directory recordings are placed in.
    pub directory: PathBuf,
    /// Filename template; see [`expand_template`].
    pub template: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_duration: Duration::from_secs(5),
            directory: PathBuf::from("recordings"),
            template: "rec_$y$M$d_$h$m$s_$f".to_string(),
        }
    }
}

/// A recording in progress, with the policy values frozen at start.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRecording {
    pub started: Instant,
    pub frequency: Hz,
    pub mode: DemodMode,
    pub path: PathBuf,
    /// Captured at start so a mid-recording slider change cannot
    /// retroactively doom or rescue this file.
    pub min_duration: Duration,
}

/// Coordinator lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    /// Auto-record is off.
    Disabled,
    /// Armed, waiting for a lock.
    Idle,
    /// Recording.
    Active(ActiveRecording),
    /// Armed but held off by the host (e.g. a manual recording runs).
    Suspended,
}

/// Expand a filename template.
///
/// Placeholders: `$y` year, `$M` month, `$d` day, `$h` hour, `$m` minute,
/// `$s` second (all zero-padded), `$f` frequency in whole Hz, `$r` the
/// demodulator name, `$n` the zero-padded sequence number.
pub fn expand_template(
    template: &str,
    when: DateTime<Local>,
    frequency: Hz,
    mode: DemodMode,
    sequence: u32,
) -> String {
    template
        .replace("$y", &format!("{:04}", when.year()))
        .replace("$M", &format!("{:02}", when.month()))
        .replace("$d", &format!("{:02}", when.day()))
        .replace("$h", &format!("{:02}", when.hour()))
        .replace("$m", &format!("{:02}", when.minute()))
        .replace("$s", &format!("{:02}", when.second()))
        .replace("$f", &format!("{:.0}", frequency))
        .replace("$r", mode.as_str())
        .replace("$n", &format!("{sequence:04}"))
}

/// Auto-recording state machine.
#[derive(Debug)]
pub struct RecordingCoordinator {
    state: RecordingState,
    sequence: u32,
    daily_count: u32,
    last_reset_date: NaiveDate,
    last_midnight_poll: Option<Instant>,
}

impl RecordingCoordinator {
    /// Restore a coordinator from persisted counters.
    pub fn new(enabled: bool, sequence: u32, daily_count: u32, last_reset_date: NaiveDate) -> Self {
        Self {
            state: if enabled {
                RecordingState::Idle
            } else {
                RecordingState::Disabled
            },
            sequence,
            daily_count,
            last_reset_date,
            last_midnight_poll: None,
        }
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn daily_count(&self) -> u32 {
        self.daily_count
    }

    pub fn last_reset_date(&self) -> NaiveDate {
        self.last_reset_date
    }

    /// Toggle the master switch. Ignored while a recording is active; the
    /// running file is finished under the policy it started with.
    pub fn set_enabled(&mut self, enabled: bool) {
        match (&self.state, enabled) {
            (RecordingState::Active(_), _) => {}
            (_, true) => {
                if self.state == RecordingState::Disabled {
                    self.state = RecordingState::Idle;
                }
            }
            (_, false) => self.state = RecordingState::Disabled,
        }
    }

    /// Hold off auto-recording without disabling it.
    pub fn suspend(&mut self) {
        if self.state == RecordingState::Idle {
            self.state = RecordingState::Suspended;
        }
    }

    pub fn resume(&mut self) {
        if self.state == RecordingState::Suspended {
            self.state = RecordingState::Idle;
        }
    }

    /// Reset the daily counter when the local date rolled over. Rate-limited
    /// to every [`DAILY_RESET_POLL_INTERVAL`] unless `force` (engine start).
    pub fn poll_daily_reset(&mut self, now: Instant, today: NaiveDate, force: bool) {
        if !force {
            if let Some(last) = self.last_midnight_poll {
                if now.duration_since(last) < DAILY_RESET_POLL_INTERVAL {
                    return;
                }
            }
        }
        self.last_midnight_poll = Some(now);
        if today != self.last_reset_date {
            info!(%today, files = self.daily_count, "daily recording counter reset");
            self.daily_count = 0;
            self.last_reset_date = today;
        }
    }

    /// Start recording on a lock. Recorder failures are warned about and
    /// drop the coordinator back to idle; the recorder owns any partial
    /// file it may have created.
    pub fn on_lock(
        &mut self,
        recorder: &dyn Recorder,
        settings: &RecordingSettings,
        frequency: Hz,
        mode: DemodMode,
        now: Instant,
        wall: DateTime<Local>,
    ) {
        if self.state != RecordingState::Idle {
            return;
        }
        let name = expand_template(&settings.template, wall, frequency, mode, self.sequence);
        let path = settings.directory.join(format!("{name}.wav"));

        let started = recorder
            .set_audio_mode()
            .and_then(|()| recorder.set_external_control(RECORDER_OWNER, true))
            .and_then(|()| recorder.start(&path));
        match started {
            Ok(()) => {
                info!(path = %path.display(), frequency, "auto-recording started");
                self.state = RecordingState::Active(ActiveRecording {
                    started: now,
                    frequency,
                    mode,
                    path,
                    min_duration: settings.min_duration,
                });
            }
            Err(err) => {
                warn!(%err, "recorder start failed, staying idle");
                self.state = RecordingState::Idle;
            }
        }
    }

    /// Stop recording on signal loss or engine stop. Applies the
    /// min-duration gate captured at start. A no-op unless a recording is
    /// active.
    pub fn on_unlock(&mut self, recorder: &dyn Recorder, now: Instant) {
        if !matches!(self.state, RecordingState::Active(_)) {
            return;
        }
        let RecordingState::Active(active) = std::mem::replace(&mut self.state, RecordingState::Idle)
        else {
            return;
        };

        if let Err(err) = recorder.stop() {
            // the recorder owns the partial file; do not delete it
            warn!(%err, "recorder stop failed");
            let _ = recorder.set_external_control(RECORDER_OWNER, false);
            return;
        }
        let _ = recorder.set_external_control(RECORDER_OWNER, false);

        let realized = now.duration_since(active.started);
        if realized < active.min_duration {
            info!(
                path = %active.path.display(),
                ?realized,
                "recording shorter than minimum, deleting"
            );
            if let Err(err) = fs::remove_file(&active.path) {
                warn!(%err, path = %active.path.display(), "could not delete short recording");
            }
        } else {
            self.daily_count += 1;
            self.sequence += 1;
            debug!(
                path = %active.path.display(),
                daily = self.daily_count,
                "recording kept"
            );
        }
    }

    /// Finish any active recording; used on engine stop.
    pub fn finalize(&mut self, recorder: &dyn Recorder, now: Instant) {
        if matches!(self.state, RecordingState::Active(_)) {
            self.on_unlock(recorder, now);
        }
    }

    /// Path of the active recording, if one runs.
    pub fn active_path(&self) -> Option<&Path> {
        match &self.state {
            RecordingState::Active(active) => Some(&active.path),
            _ => None,
        }
    }
}

//! Collaborator interfaces
//!
//! The engine never reaches into host globals; it is constructed with
//! handles implementing these traits and talks to the radio, the FFT
//! producer and the recorder only through them. Optional capabilities
//! (squelch, gain, AGC, de-emphasis) default to
//! [`ScanError::InterfaceMissing`], which callers treat as "silently omit".

use std::path::Path;

use crate::spectrum::SpectrumFrame;
use crate::types::{DeemphasisMode, DemodMode, Hz, ScanError, ScanResult};

/// The receiver / VFO surface the scanner drives.
///
/// All calls are expected to be fast (milliseconds); the engine performs
/// them from its worker tick.
pub trait Receiver: Send + Sync {
    /// Name of the currently selected VFO, if any.
    fn selected_vfo(&self) -> Option<String>;

    /// Whether the radio source is producing samples.
    fn is_streaming(&self) -> bool;

    /// Retune a VFO.
    fn tune(&self, vfo: &str, freq: Hz) -> ScanResult<()>;

    /// Current VFO bandwidth in Hz.
    fn bandwidth(&self, vfo: &str) -> ScanResult<Hz>;

    fn set_mode(&self, vfo: &str, mode: DemodMode) -> ScanResult<()>;

    fn set_bandwidth(&self, vfo: &str, bandwidth: Hz) -> ScanResult<()>;

    /// Whether this VFO has a squelch at all. Squelch and mute handling are
    /// skipped entirely when it does not.
    fn has_squelch(&self, vfo: &str) -> bool {
        let _ = vfo;
        false
    }

    fn squelch_level(&self, vfo: &str) -> ScanResult<f32> {
        let _ = vfo;
        Err(ScanError::InterfaceMissing("squelch"))
    }

    fn set_squelch_enabled(&self, vfo: &str, enabled: bool) -> ScanResult<()> {
        let _ = (vfo, enabled);
        Err(ScanError::InterfaceMissing("squelch"))
    }

    fn set_squelch_level(&self, vfo: &str, level_db: f32) -> ScanResult<()> {
        let _ = (vfo, level_db);
        Err(ScanError::InterfaceMissing("squelch"))
    }

    /// Current RF gain on the source, in dB. The engine captures this at
    /// start so its own gain writes can be reverted at stop.
    fn gain(&self) -> ScanResult<f32> {
        Err(ScanError::InterfaceMissing("gain"))
    }

    /// RF gain on the source, in dB.
    fn set_gain(&self, gain_db: f32) -> ScanResult<()> {
        let _ = gain_db;
        Err(ScanError::InterfaceMissing("gain"))
    }

    fn set_agc_enabled(&self, vfo: &str, enabled: bool) -> ScanResult<()> {
        let _ = (vfo, enabled);
        Err(ScanError::InterfaceMissing("agc"))
    }

    fn set_deemphasis(&self, vfo: &str, mode: DeemphasisMode) -> ScanResult<()> {
        let _ = (vfo, mode);
        Err(ScanError::InterfaceMissing("deemphasis"))
    }

    /// Current demodulator, when the radio can report it. Used only to
    /// label recordings made without a bookmark.
    fn mode_hint(&self, vfo: &str) -> Option<DemodMode> {
        let _ = vfo;
        None
    }
}

/// Source of FFT magnitude frames.
pub trait FftSource: Send + Sync {
    /// Copy of the most recent frame, or `None` when the producer has
    /// nothing usable. Implementations hold the producer's lock only long
    /// enough to copy the bins out.
    fn latest_frame(&self) -> Option<SpectrumFrame>;
}

/// The host's file recorder.
pub trait Recorder: Send + Sync {
    /// Switch the recorder to audio capture.
    fn set_audio_mode(&self) -> ScanResult<()>;

    /// Claim or release external control on behalf of `owner`.
    fn set_external_control(&self, owner: &str, engaged: bool) -> ScanResult<()>;

    /// Begin recording into `path`.
    fn start(&self, path: &Path) -> ScanResult<()>;

    /// Stop the running recording.
    fn stop(&self) -> ScanResult<()>;
}

/// Map [`ScanError::InterfaceMissing`] to success, keeping other errors.
pub fn ignore_missing(result: ScanResult<()>) -> ScanResult<()> {
    match result {
        Err(ScanError::InterfaceMissing(_)) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl Receiver for Bare {
        fn selected_vfo(&self) -> Option<String> {
            Some("vfo".to_string())
        }
        fn is_streaming(&self) -> bool {
            true
        }
        fn tune(&self, _vfo: &str, _freq: Hz) -> ScanResult<()> {
            Ok(())
        }
        fn bandwidth(&self, _vfo: &str) -> ScanResult<Hz> {
            Ok(12_500.0)
        }
        fn set_mode(&self, _vfo: &str, _mode: DemodMode) -> ScanResult<()> {
            Ok(())
        }
        fn set_bandwidth(&self, _vfo: &str, _bandwidth: Hz) -> ScanResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_optional_capabilities_default_to_missing() {
        let rx = Bare;
        assert!(!rx.has_squelch("vfo"));
        assert!(matches!(
            rx.set_squelch_level("vfo", -50.0),
            Err(ScanError::InterfaceMissing("squelch"))
        ));
        assert!(matches!(
            rx.gain(),
            Err(ScanError::InterfaceMissing("gain"))
        ));
        assert!(matches!(
            rx.set_gain(20.0),
            Err(ScanError::InterfaceMissing("gain"))
        ));
    }

    #[test]
    fn test_ignore_missing() {
        assert!(ignore_missing(Err(ScanError::InterfaceMissing("agc"))).is_ok());
        assert!(ignore_missing(Ok(())).is_ok());
        assert!(ignore_missing(Err(ScanError::TransientRadio("x".into()))).is_err());
    }
}

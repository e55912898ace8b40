//! High-resolution peak centering
//!
//! Once the scanner is receiving, it periodically re-centers the VFO on the
//! strongest nearby spectral point. The search samples the frame on a grid
//! finer than the scan interval and decides between moving to a strictly
//! stronger point, moving to the median of a flat-topped plateau, or
//! holding.

use tracing::debug;

use crate::spectrum::SpectrumFrame;
use crate::types::{Dbfs, Hz};

/// Bandwidth assumed when the active entry has no profile.
pub const FALLBACK_BANDWIDTH: Hz = 25_000.0;

/// A candidate must beat the current level by this much to pull the center.
pub const MOVE_MARGIN_DB: Dbfs = 0.1;

/// Levels within this of the initial one count into a plateau.
pub const PLATEAU_MARGIN_DB: Dbfs = 1.0;

/// Minimum plateau size before its median is preferred over holding.
pub const PLATEAU_MIN_POINTS: usize = 3;

/// Search geometry derived from the active entry's bandwidth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSearch {
    /// Search radius around the initial frequency in Hz.
    pub radius: Hz,
    /// Sampling step in Hz.
    pub step: Hz,
}

impl PeakSearch {
    /// Geometry for a profile bandwidth (or the fallback when absent),
    /// never sampling finer than ten raw FFT bins.
    pub fn for_bandwidth(bandwidth: Option<Hz>, bin_resolution: Hz) -> Self {
        let bw = bandwidth.unwrap_or(FALLBACK_BANDWIDTH);
        let radius = (1.5 * bw).clamp(5_000.0, 50_000.0);
        let step = (bw / 20.0).clamp(100.0, 2_000.0).max(10.0 * bin_resolution);
        Self { radius, step }
    }
}

/// Outcome of one centering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CenteringDecision {
    /// Stay where we are.
    Hold,
    /// Retune the channel center to this frequency.
    MoveTo(Hz),
}

/// Search `[initial - radius, initial + radius]` for a better channel
/// center.
///
/// Decision rule, in order:
/// 1. A strictly stronger sample (by [`MOVE_MARGIN_DB`]) wins.
/// 2. Otherwise, if at least [`PLATEAU_MIN_POINTS`] samples sit within
///    [`PLATEAU_MARGIN_DB`] of the initial level, move to the plateau's
///    median frequency.
/// 3. Otherwise hold.
///
/// Callers still validate the returned frequency (distance bound, entry
/// bounds, blacklist) before acting on it.
pub fn find_signal_peak(
    frame: &SpectrumFrame,
    initial: Hz,
    search: &PeakSearch,
) -> CenteringDecision {
    let initial_level = frame.level_at(initial);

    let steps = (search.radius / search.step).floor() as i64;
    if steps == 0 {
        return CenteringDecision::Hold;
    }

    let mut best_freq = initial;
    let mut best_level = initial_level;
    let mut plateau: Vec<Hz> = Vec::new();

    for k in -steps..=steps {
        let freq = initial + k as Hz * search.step;
        if freq < frame.start() || freq > frame.end() {
            continue;
        }
        let level = frame.level_at(freq);
        if level > best_level {
            best_level = level;
            best_freq = freq;
        }
        if (level - initial_level).abs() <= PLATEAU_MARGIN_DB {
            plateau.push(freq);
        }
    }

    if best_level > initial_level + MOVE_MARGIN_DB && best_freq != initial {
        debug!(
            from = initial,
            to = best_freq,
            gain_db = best_level - initial_level,
            "centering on stronger peak"
        );
        return CenteringDecision::MoveTo(best_freq);
    }

    if plateau.len() >= PLATEAU_MIN_POINTS {
        plateau.sort_by(|a, b| a.total_cmp(b));
        let median = plateau[plateau.len() / 2];
        if median != initial {
            debug!(from = initial, to = median, points = plateau.len(), "centering on plateau median");
            return CenteringDecision::MoveTo(median);
        }
    }

    CenteringDecision::Hold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SpectrumFrame;

    fn flat_frame(floor: Dbfs) -> SpectrumFrame {
        // 88..108 MHz, 10 kHz bins
        SpectrumFrame::new(vec![floor; 2000], 88.0e6, 20.0e6).unwrap()
    }

    fn with_level(frame: &SpectrumFrame, freq: Hz, level: Dbfs) -> SpectrumFrame {
        let mut bins = frame.bins().to_vec();
        bins[frame.bin_of(freq)] = level;
        SpectrumFrame::new(bins, frame.start(), frame.width()).unwrap()
    }

    #[test]
    fn test_search_geometry_clamps() {
        // 12.5 kHz channel: radius 1.5*bw = 18.75 kHz, step bw/20 = 625 Hz
        let search = PeakSearch::for_bandwidth(Some(12_500.0), 10.0);
        assert_eq!(search.radius, 18_750.0);
        assert_eq!(search.step, 625.0);

        // tiny bandwidth clamps up
        let search = PeakSearch::for_bandwidth(Some(1_000.0), 10.0);
        assert_eq!(search.radius, 5_000.0);
        assert_eq!(search.step, 100.0);

        // huge bandwidth clamps down
        let search = PeakSearch::for_bandwidth(Some(200_000.0), 10.0);
        assert_eq!(search.radius, 50_000.0);
        assert_eq!(search.step, 2_000.0);

        // coarse FFT forces the step up to ten bins
        let search = PeakSearch::for_bandwidth(Some(12_500.0), 1_000.0);
        assert_eq!(search.step, 10_000.0);

        // no profile: fallback bandwidth
        let search = PeakSearch::for_bandwidth(None, 10.0);
        assert_eq!(search.radius, 37_500.0);
        assert_eq!(search.step, 1_250.0);
    }

    #[test]
    fn test_moves_to_strictly_stronger_peak() {
        let frame = flat_frame(-90.0);
        let frame = with_level(&frame, 98.700e6, -40.0);
        let frame = with_level(&frame, 98.710e6, -30.0);
        let search = PeakSearch {
            radius: 20_000.0,
            step: 10_000.0,
        };
        match find_signal_peak(&frame, 98.700e6, &search) {
            CenteringDecision::MoveTo(freq) => assert_eq!(freq, 98.710e6),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn test_holds_when_initial_is_strongest() {
        let frame = flat_frame(-90.0);
        let frame = with_level(&frame, 98.700e6, -30.0);
        let search = PeakSearch {
            radius: 20_000.0,
            step: 10_000.0,
        };
        assert_eq!(
            find_signal_peak(&frame, 98.700e6, &search),
            CenteringDecision::Hold
        );
    }

    #[test]
    fn test_sub_margin_gain_does_not_move() {
        let frame = flat_frame(-90.0);
        let frame = with_level(&frame, 98.700e6, -30.0);
        let frame = with_level(&frame, 98.710e6, -29.95);
        let search = PeakSearch {
            radius: 20_000.0,
            step: 10_000.0,
        };
        // +0.05 dB is inside the margin; and the two points do not make a
        // plateau of three, so the center holds.
        assert_eq!(
            find_signal_peak(&frame, 98.700e6, &search),
            CenteringDecision::Hold
        );
    }

    #[test]
    fn test_plateau_moves_to_median() {
        // wide flat carrier: five adjacent samples within 1 dB
        let frame = flat_frame(-90.0);
        let mut frame = frame;
        for k in 0..5 {
            frame = with_level(&frame, 98.70e6 + k as f64 * 10_000.0, -30.0);
        }
        let search = PeakSearch {
            radius: 50_000.0,
            step: 10_000.0,
        };
        // starting from the left edge of the plateau, the median pulls right
        match find_signal_peak(&frame, 98.70e6, &search) {
            CenteringDecision::MoveTo(freq) => assert_eq!(freq, 98.72e6),
            other => panic!("expected plateau move, got {other:?}"),
        }
    }

    #[test]
    fn test_plateau_centered_already_holds() {
        let frame = flat_frame(-90.0);
        let mut frame = frame;
        for k in -1..=1 {
            frame = with_level(&frame, 98.71e6 + k as f64 * 10_000.0, -30.0);
        }
        let search = PeakSearch {
            radius: 20_000.0,
            step: 10_000.0,
        };
        assert_eq!(
            find_signal_peak(&frame, 98.71e6, &search),
            CenteringDecision::Hold
        );
    }

    #[test]
    fn test_candidates_outside_frame_ignored() {
        let frame = flat_frame(-90.0);
        let frame = with_level(&frame, 88.00e6, -30.0);
        let search = PeakSearch {
            radius: 50_000.0,
            step: 10_000.0,
        };
        // searching at the frame edge must not index out of range
        assert_eq!(
            find_signal_peak(&frame, 88.00e6, &search),
            CenteringDecision::Hold
        );
    }
}

use std::collections::VecDeque;

use super::constants::*;

/// Half-wave rectified spectral flux against the previous spectrum.
#[derive(Debug, Clone, Default)]
pub struct FluxTracker {
    previous: Option<Vec<f32>>,
}

impl FluxTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean positive change per bin. Returns 0 and reseeds on the first call
    /// or when the spectrum length changes.
    pub fn update(&mut self, magnitude: &[f32]) -> f32 {
        let flux = match &self.previous {
            Some(prev) if prev.len() == magnitude.len() && !magnitude.is_empty() => {
                let rising: f32 = magnitude
                    .iter()
                    .zip(prev)
                    .map(|(cur, prev)| (cur - prev).max(0.0))
                    .sum();
                rising / magnitude.len() as f32
            }
            _ => 0.0,
        };

        match &mut self.previous {
            Some(prev) if prev.len() == magnitude.len() => prev.copy_from_slice(magnitude),
            _ => self.previous = Some(magnitude.to_vec()),
        }

        if flux.is_finite() {
            flux
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Adaptive-threshold onset trigger with a cooldown.
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    history: VecDeque<f32>,
    last_onset: Option<f64>,
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OnsetDetector {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(ONSET_HISTORY_LEN),
            last_onset: None,
        }
    }

    /// Push `flux` into the history and report whether an onset fires at `time`.
    pub fn update(&mut self, flux: f32, time: f64) -> bool {
        self.history.push_back(flux);
        if self.history.len() > ONSET_HISTORY_LEN {
            self.history.pop_front();
        }

        let mean = self.history.iter().sum::<f32>() / self.history.len() as f32;
        let threshold = ONSET_THRESHOLD_MULTIPLIER * mean;

        let cooled_down = self
            .last_onset
            .map_or(true, |last| time - last >= ONSET_COOLDOWN_SECS);

        let fired = flux > threshold && cooled_down;
        if fired {
            self.last_onset = Some(time);
        }
        fired
    }

    pub fn last_onset(&self) -> Option<f64> {
        self.last_onset
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_onset = None;
    }
}

/// Mean inter-onset interval over a sliding time window.
///
/// Every interval counts equally; a single irregular onset skews the result.
#[derive(Debug, Clone, Default)]
pub struct TempoEstimator {
    onsets: VecDeque<f64>,
}

impl TempoEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_onset(&mut self, time: f64) {
        self.onsets.push_back(time);
        self.prune(time);
    }

    /// Current tempo in BPM at `now`, 0 until enough onsets are in the window.
    ///
    /// Onsets older than the window are dropped on every call, so the tempo
    /// falls back to 0 once no onset has arrived for `TEMPO_WINDOW_SECS`.
    pub fn bpm(&mut self, now: f64) -> f32 {
        self.prune(now);
        if self.onsets.len() < TEMPO_MIN_ONSETS {
            return 0.0;
        }

        let (first, last) = match (self.onsets.front(), self.onsets.back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return 0.0,
        };
        // Consecutive intervals telescope to (last - first)
        let avg_interval = (last - first) / (self.onsets.len() - 1) as f64;
        if avg_interval <= 0.0 {
            return 0.0;
        }
        let bpm = (60.0 / avg_interval) as f32;
        if bpm.is_finite() {
            bpm
        } else {
            0.0
        }
    }

    pub fn onset_count(&self) -> usize {
        self.onsets.len()
    }

    pub fn reset(&mut self) {
        self.onsets.clear();
    }

    fn prune(&mut self, now: f64) {
        while let Some(&oldest) = self.onsets.front() {
            if now - oldest > TEMPO_WINDOW_SECS {
                self.onsets.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rhythm features produced by one tracker update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RhythmFeatures {
    pub flux: f32,
    pub onset: bool,
    pub bpm: f32,
}

/// All cross-frame state owned by one engine.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    flux: FluxTracker,
    onsets: OnsetDetector,
    tempo: TempoEstimator,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, magnitude: &[f32], time: f64) -> RhythmFeatures {
        let flux = self.flux.update(magnitude);
        let onset = self.onsets.update(flux, time);
        if onset {
            self.tempo.record_onset(time);
        }
        let bpm = self.tempo.bpm(time);
        RhythmFeatures { flux, onset, bpm }
    }

    pub fn reset(&mut self) {
        self.flux.reset();
        self.onsets.reset();
        self.tempo.reset();
    }
}

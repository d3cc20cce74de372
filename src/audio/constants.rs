//! Tuning constants shared by the realtime and offline engines.
//!
//! Both engines read these values from here so the two paths cannot drift.

/// Default analysis frame length in samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Default distance between consecutive offline frames.
pub const DEFAULT_HOP_SIZE: usize = 512;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Temporal smoothing applied by the analyser source.
pub const DEFAULT_SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32768;

/// Fraction of squared spectral energy below the rolloff frequency.
pub const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Autocorrelation pitch search bounds (Hz).
pub const PITCH_MIN_HZ: f32 = 80.0;
pub const PITCH_MAX_HZ: f32 = 800.0;

/// Number of integer harmonics (fundamental included) summed for harmonicity.
pub const HARMONIC_COUNT: usize = 6;

/// Flux values kept for the adaptive onset threshold.
pub const ONSET_HISTORY_LEN: usize = 10;
/// Onset fires when flux exceeds this multiple of the mean recent flux.
pub const ONSET_THRESHOLD_MULTIPLIER: f32 = 1.5;
/// Minimum time between two onsets (seconds).
pub const ONSET_COOLDOWN_SECS: f64 = 0.1;

/// Onsets older than this are dropped from the tempo estimate (seconds).
pub const TEMPO_WINDOW_SECS: f64 = 10.0;
/// Onsets needed before a tempo is reported.
pub const TEMPO_MIN_ONSETS: usize = 4;

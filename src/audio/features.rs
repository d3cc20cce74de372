//! Pure per-frame feature functions.
//!
//! None of these hold state. Every function returns 0 instead of NaN when
//! its input is empty or silent.

use super::constants::{HARMONIC_COUNT, PITCH_MAX_HZ, PITCH_MIN_HZ};

/// Map non-finite values to 0.
pub fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Root mean square amplitude.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|x| x * x).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

/// Fraction of sample pairs whose sign differs; `>= 0` counts as positive.
pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// Magnitude-weighted mean frequency in Hz.
pub fn spectral_centroid(magnitude: &[f32], bin_width: f32) -> f32 {
    let mut weighted_sum = 0.0;
    let mut magnitude_sum = 0.0;

    for (k, &m) in magnitude.iter().enumerate() {
        weighted_sum += k as f32 * bin_width * m;
        magnitude_sum += m;
    }

    if magnitude_sum > 0.0 {
        sanitize(weighted_sum / magnitude_sum)
    } else {
        0.0
    }
}

/// Frequency below which `threshold` of the squared spectral energy lies.
///
/// Falls back to the last bin's frequency when the threshold is never
/// reached; a threshold of 1.0 or more always lands there.
pub fn spectral_rolloff(magnitude: &[f32], bin_width: f32, threshold: f32) -> f32 {
    if magnitude.is_empty() {
        return 0.0;
    }
    let last_bin = (magnitude.len() - 1) as f32 * bin_width;
    if threshold >= 1.0 {
        return last_bin;
    }

    let total_energy: f32 = magnitude.iter().map(|m| m * m).sum();
    if total_energy <= 0.0 {
        return 0.0;
    }

    let target = threshold * total_energy;
    let mut cumulative = 0.0;
    for (k, &m) in magnitude.iter().enumerate() {
        cumulative += m * m;
        if cumulative >= target {
            return k as f32 * bin_width;
        }
    }
    last_bin
}

/// Autocorrelation pitch estimate in Hz, 0 when no positive correlation exists.
///
/// Periods are searched over `[sr / 800, sr / 80)`, capped at half the frame.
pub fn fundamental_frequency(frame: &[f32], sample_rate: u32) -> f32 {
    let sr = sample_rate as f32;
    let min_period = ((sr / PITCH_MAX_HZ) as usize).max(1);
    let max_period = ((sr / PITCH_MIN_HZ) as usize).min(frame.len() / 2);

    let mut best_period = 0;
    let mut best_correlation = 0.0f32;

    for period in min_period..max_period {
        let correlation: f32 = frame[..frame.len() - period]
            .iter()
            .zip(&frame[period..])
            .map(|(a, b)| a * b)
            .sum();
        if correlation > best_correlation {
            best_correlation = correlation;
            best_period = period;
        }
    }

    if best_period == 0 {
        0.0
    } else {
        sr / best_period as f32
    }
}

/// Share of total magnitude found at the first harmonics of `fundamental_freq`.
pub fn harmonicity(magnitude: &[f32], fundamental_freq: f32, bin_width: f32) -> f32 {
    if fundamental_freq <= 0.0 || bin_width <= 0.0 || !fundamental_freq.is_finite() {
        return 0.0;
    }

    let total: f32 = magnitude.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let harmonic_sum: f32 = (1..=HARMONIC_COUNT)
        .filter_map(|h| {
            let bin = (h as f32 * fundamental_freq / bin_width).round() as usize;
            magnitude.get(bin)
        })
        .sum();

    sanitize(harmonic_sum / total).clamp(0.0, 1.0)
}

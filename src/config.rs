use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::constants::*;
use crate::audio::spectrum::TransformKind;
use crate::audio::window::WindowFunction;
use crate::error::{AnalysisError, Result};

/// Engine configuration shared by the realtime and offline paths.
///
/// Serialized with camelCase keys; every key is optional in JSON and falls
/// back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Frame length `N`; also the transform size.
    pub fft_size: usize,
    /// Offline only.
    pub hop_size: usize,
    /// Analyser source smoothing between pulls, in [0, 1].
    pub smoothing_time_constant: f32,
    /// Offline only. The analyser source always uses Blackman.
    pub window_function: WindowFunction,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub sample_rate: u32,
    /// Offline only.
    pub transform: TransformKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            smoothing_time_constant: DEFAULT_SMOOTHING_TIME_CONSTANT,
            window_function: WindowFunction::Hann,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            transform: TransformKind::Reference,
        }
    }
}

impl AnalysisConfig {
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Number of magnitude bins, `fft_size / 2`.
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Width of one bin in Hz (`nyquist / num_bins`).
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Reject configurations no engine can run with.
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < MIN_FFT_SIZE || self.fft_size > MAX_FFT_SIZE {
            return Err(AnalysisError::UnsupportedConfiguration(format!(
                "fftSize must be a power of two in [{}, {}], got {}",
                MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
            )));
        }
        if self.hop_size == 0 {
            return Err(AnalysisError::UnsupportedConfiguration("hopSize must be positive".into()));
        }
        if self.sample_rate == 0 {
            return Err(AnalysisError::UnsupportedConfiguration("sampleRate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(AnalysisError::UnsupportedConfiguration(format!(
                "smoothingTimeConstant must be within [0, 1], got {}",
                self.smoothing_time_constant
            )));
        }
        if !self.min_decibels.is_finite()
            || !self.max_decibels.is_finite()
            || self.min_decibels >= self.max_decibels
        {
            return Err(AnalysisError::UnsupportedConfiguration(format!(
                "minDecibels ({}) must be below maxDecibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

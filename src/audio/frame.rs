use serde::{Deserialize, Serialize};

use super::constants::ROLLOFF_THRESHOLD;
use super::features::{self, sanitize};
use super::spectrum::magnitude_to_bytes;
use super::trackers::RhythmFeatures;
use crate::config::AnalysisConfig;

/// How a frame is placed in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FrameStamp {
    /// Monotonic clock reading in seconds.
    Realtime { timestamp: f64 },
    /// Position within the analyzed buffer.
    #[serde(rename_all = "camelCase")]
    Offline { frame_index: usize, time_position: f64 },
}

impl FrameStamp {
    /// Seconds, whichever clock the stamp came from.
    pub fn seconds(&self) -> f64 {
        match *self {
            FrameStamp::Realtime { timestamp } => timestamp,
            FrameStamp::Offline { time_position, .. } => time_position,
        }
    }
}

/// One frame of extracted features. Both engines emit this same record and
/// differ only in `stamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatureFrame {
    // Time domain
    pub waveform: Vec<f32>,
    pub rms: f32,
    pub zcr: f32,

    // Frequency domain
    pub frequency_bins: Vec<u8>,
    pub magnitude_spectrum: Vec<f32>,
    pub spectral_centroid: f32, // Hz
    pub spectral_rolloff: f32,  // Hz
    pub spectral_flux: f32,

    // Derived
    pub energy: f32,
    pub brightness: f32,
    pub noisiness: f32,

    // Rhythm
    pub onset_strength: f32, // 0.0 or 1.0
    pub bpm: f32,

    // Harmony
    pub fundamental_freq: f32, // Hz, 0 if undetected
    pub harmonicity: f32,

    #[serde(flatten)]
    pub stamp: FrameStamp,
    pub sample_rate: u32,
}

impl AudioFeatureFrame {
    pub fn is_onset(&self) -> bool {
        self.onset_strength > 0.0
    }

    pub fn seconds(&self) -> f64 {
        self.stamp.seconds()
    }
}

/// Turns one frame's raw samples and linear spectrum into an
/// [`AudioFeatureFrame`]. The single extraction path shared by both engines.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    sample_rate: u32,
    fft_size: usize,
    min_decibels: f32,
    max_decibels: f32,
}

impl FrameAssembler {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            fft_size: config.fft_size,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Build a frame.
    ///
    /// `waveform` holds the unwindowed time-domain samples; `magnitude` the
    /// linear spectrum of the windowed frame. When the source already
    /// reported byte bins they are passed through unchanged, otherwise they
    /// are derived from `magnitude`.
    pub fn assemble(
        &self,
        waveform: Vec<f32>,
        mut magnitude: Vec<f32>,
        bytes: Option<Vec<u8>>,
        rhythm: RhythmFeatures,
        stamp: FrameStamp,
    ) -> AudioFeatureFrame {
        let num_bins = self.num_bins();
        magnitude.resize(num_bins, 0.0);
        for m in magnitude.iter_mut() {
            *m = sanitize(*m).max(0.0);
        }

        let mut frequency_bins = bytes.unwrap_or_else(|| {
            magnitude_to_bytes(&magnitude, self.fft_size, self.min_decibels, self.max_decibels)
        });
        frequency_bins.resize(num_bins, 0);

        let nyquist = self.sample_rate as f32 / 2.0;
        let bin_width = self.sample_rate as f32 / self.fft_size as f32;

        let rms = sanitize(features::rms(&waveform));
        let zcr = sanitize(features::zero_crossing_rate(&waveform)).clamp(0.0, 1.0);
        let spectral_centroid = sanitize(features::spectral_centroid(&magnitude, bin_width));
        let spectral_rolloff =
            sanitize(features::spectral_rolloff(&magnitude, bin_width, ROLLOFF_THRESHOLD)).min(nyquist);
        let fundamental_freq = sanitize(features::fundamental_frequency(&waveform, self.sample_rate));
        let harmonicity = if fundamental_freq > 0.0 {
            sanitize(features::harmonicity(&magnitude, fundamental_freq, bin_width))
        } else {
            0.0
        };

        AudioFeatureFrame {
            waveform,
            rms,
            zcr,
            frequency_bins,
            magnitude_spectrum: magnitude,
            spectral_centroid,
            spectral_rolloff,
            spectral_flux: sanitize(rhythm.flux).max(0.0),
            energy: rms,
            brightness: sanitize(spectral_centroid / nyquist),
            noisiness: sanitize(zcr / nyquist),
            onset_strength: if rhythm.onset { 1.0 } else { 0.0 },
            bpm: sanitize(rhythm.bpm).max(0.0),
            fundamental_freq,
            harmonicity,
            stamp,
            sample_rate: self.sample_rate,
        }
    }
}

use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::frame::AudioFeatureFrame;
use crate::config::AnalysisConfig;
use crate::error::Result;

/// Offline analysis of one file, ready to export and replay in sync with playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTrack {
    pub file_info: FileInfo,
    pub config: AnalysisConfig,
    /// Ordered by time position.
    pub frames: Vec<AudioFeatureFrame>,
    pub statistics: TrackStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub total_samples: usize,
    /// Frames per second of audio (`sample_rate / hop_size`).
    pub frame_rate: f64,
}

/// Whole-track summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatistics {
    pub peak_rms: f32,
    pub peak_spectral_flux: f32,
    pub mean_spectral_centroid: f32,
    pub onset_count: usize,
    /// Mean of the non-zero tempo estimates, 0 if there were none.
    pub average_bpm: f32,
    pub bpm_range: (f32, f32),
}

impl TrackStatistics {
    pub fn from_frames(frames: &[AudioFeatureFrame]) -> Self {
        let mut stats = Self::default();
        if frames.is_empty() {
            return stats;
        }

        let mut centroid_sum = 0.0f64;
        let mut bpm_sum = 0.0f64;
        let mut bpm_count = 0usize;
        let mut bpm_range = (f32::INFINITY, f32::NEG_INFINITY);

        for frame in frames {
            stats.peak_rms = stats.peak_rms.max(frame.rms);
            stats.peak_spectral_flux = stats.peak_spectral_flux.max(frame.spectral_flux);
            centroid_sum += frame.spectral_centroid as f64;
            if frame.is_onset() {
                stats.onset_count += 1;
            }
            if frame.bpm > 0.0 {
                bpm_sum += frame.bpm as f64;
                bpm_count += 1;
                bpm_range = (bpm_range.0.min(frame.bpm), bpm_range.1.max(frame.bpm));
            }
        }

        stats.mean_spectral_centroid = (centroid_sum / frames.len() as f64) as f32;
        if bpm_count > 0 {
            stats.average_bpm = (bpm_sum / bpm_count as f64) as f32;
            stats.bpm_range = bpm_range;
        }
        stats
    }
}

impl FeatureTrack {
    pub fn new(
        filename: impl Into<String>,
        config: AnalysisConfig,
        total_samples: usize,
        frames: Vec<AudioFeatureFrame>,
    ) -> Self {
        let sample_rate = config.sample_rate;
        let statistics = TrackStatistics::from_frames(&frames);
        Self {
            file_info: FileInfo {
                filename: filename.into(),
                duration_seconds: total_samples as f64 / sample_rate as f64,
                sample_rate,
                total_samples,
                frame_rate: sample_rate as f64 / config.hop_size as f64,
            },
            config,
            frames,
            statistics,
        }
    }

    /// Latest frame starting at or before `time` seconds.
    pub fn frame_at(&self, time: f64) -> Option<&AudioFeatureFrame> {
        let idx = self.frames.partition_point(|f| f.seconds() <= time);
        idx.checked_sub(1).and_then(|i| self.frames.get(i))
    }

    /// Frames whose time position lies in `[start, end)`.
    pub fn frames_between(&self, start: f64, end: f64) -> &[AudioFeatureFrame] {
        let lo = self.frames.partition_point(|f| f.seconds() < start);
        let hi = self.frames.partition_point(|f| f.seconds() < end).max(lo);
        &self.frames[lo..hi]
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!("Saved {} frames to {}", self.frames.len(), path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let track: FeatureTrack = serde_json::from_str(&json)?;
        Ok(track)
    }
}

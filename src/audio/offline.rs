use log::info;

use super::frame::{AudioFeatureFrame, FrameAssembler, FrameStamp};
use super::spectrum::{create_transform, SpectrumTransform};
use super::trackers::{FluxTracker, RhythmFeatures, TrackerState};
use super::window::{apply_window, Windower};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Observer for long batch runs. Polled between hops.
pub trait AnalysisListener {
    /// Called after each frame with the number of frames done so far.
    fn on_progress(&mut self, done: usize, total: usize);

    /// Return `true` to stop the run with [`AnalysisError::Cancelled`].
    fn should_cancel(&self) -> bool {
        false
    }
}

/// No-op listener.
pub struct NoOpListener;

impl AnalysisListener for NoOpListener {
    #[inline(always)]
    fn on_progress(&mut self, _done: usize, _total: usize) {}
}

/// Logs progress every `every` frames.
pub struct LogListener {
    every: usize,
}

impl LogListener {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl Default for LogListener {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl AnalysisListener for LogListener {
    fn on_progress(&mut self, done: usize, total: usize) {
        if done % self.every == 0 || done == total {
            let percent = if total > 0 { done as f32 * 100.0 / total as f32 } else { 100.0 };
            info!("Analyzed {}/{} frames ({:.0}%)", done, total, percent);
        }
    }
}

/// Batch feature engine over a loaded sample buffer.
///
/// Output depends only on the buffer, the configuration and the tracker
/// state. A fresh engine gives bit-identical frames for identical input;
/// reusing one across buffers carries flux/onset/tempo history over unless
/// [`reset`](Self::reset) is called.
pub struct OfflineEngine {
    config: AnalysisConfig,
    windower: Windower,
    transform: Box<dyn SpectrumTransform>,
    assembler: FrameAssembler,
    trackers: TrackerState,
    buffer: Option<Vec<f32>>,
}

impl OfflineEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let transform = create_transform(config.transform, config.fft_size);
        info!(
            "Offline engine: fft_size={}, hop_size={}, window={}, transform={}",
            config.fft_size,
            config.hop_size,
            config.window_function.as_str(),
            transform.transform_type()
        );
        Ok(Self {
            windower: Windower::new(config.fft_size, config.hop_size, config.window_function),
            assembler: FrameAssembler::new(&config),
            transform,
            config,
            trackers: TrackerState::new(),
            buffer: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Attach a mono buffer at the configured sample rate. Trackers are kept.
    pub fn load_buffer(&mut self, samples: Vec<f32>) {
        info!(
            "Loaded {} samples ({:.2}s) for analysis",
            samples.len(),
            samples.len() as f64 / self.config.sample_rate as f64
        );
        self.buffer = Some(samples);
    }

    /// Attach a buffer recorded at `sample_rate`, retargeting the engine when
    /// it differs from the configured rate.
    pub fn load_buffer_at(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if sample_rate != self.config.sample_rate {
            let config = AnalysisConfig { sample_rate, ..self.config.clone() };
            config.validate()?;
            info!("Sample rate changed {}Hz -> {}Hz", self.config.sample_rate, sample_rate);
            self.assembler = FrameAssembler::new(&config);
            self.config = config;
        }
        self.load_buffer(samples);
        Ok(())
    }

    pub fn buffer(&self) -> Option<&[f32]> {
        self.buffer.as_deref()
    }

    /// Loaded duration in seconds, 0 without a buffer.
    pub fn duration(&self) -> f64 {
        self.buffer
            .as_ref()
            .map_or(0.0, |b| b.len() as f64 / self.config.sample_rate as f64)
    }

    /// Forget flux, onset and tempo history.
    pub fn reset(&mut self) {
        self.trackers.reset();
    }

    pub fn analyze_complete(&mut self) -> Result<Vec<AudioFeatureFrame>> {
        self.analyze_complete_with(&mut NoOpListener)
    }

    pub fn analyze_complete_with(&mut self, listener: &mut dyn AnalysisListener) -> Result<Vec<AudioFeatureFrame>> {
        let len = self.loaded()?.len();
        self.analyze_span(0, len, listener)
    }

    pub fn analyze_range(&mut self, start_time: f64, end_time: f64) -> Result<Vec<AudioFeatureFrame>> {
        self.analyze_range_with(start_time, end_time, &mut NoOpListener)
    }

    /// Analyze `[start_time, end_time)` seconds; the end is clamped to the buffer.
    pub fn analyze_range_with(
        &mut self,
        start_time: f64,
        end_time: f64,
        listener: &mut dyn AnalysisListener,
    ) -> Result<Vec<AudioFeatureFrame>> {
        let len = self.loaded()?.len();
        let sr = self.config.sample_rate as f64;
        let out_of_range = AnalysisError::OutOfRange {
            start: start_time,
            end: end_time,
            duration: len as f64 / sr,
        };

        if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 || start_time >= end_time {
            return Err(out_of_range);
        }
        let start = (start_time * sr).round() as usize;
        if start >= len {
            return Err(out_of_range);
        }
        let end = ((end_time * sr).round() as usize).min(len);
        self.analyze_span(start, end, listener)
    }

    /// Single frame centred on `time`, or `None` when that window leaves the buffer.
    ///
    /// Does not touch the engine's trackers. Flux is taken against the frame
    /// one hop earlier when it exists; onset and tempo are reported as 0.
    pub fn features_at_time(&mut self, time: f64) -> Result<Option<AudioFeatureFrame>> {
        let Self { config, windower, transform, assembler, buffer, .. } = self;
        let samples = buffer
            .as_deref()
            .ok_or(AnalysisError::NotInitialized("no sample buffer loaded"))?;

        if !time.is_finite() || time < 0.0 {
            return Ok(None);
        }
        let n = config.fft_size;
        let center = (time * config.sample_rate as f64).round() as usize;
        let Some(start) = center.checked_sub(n / 2) else {
            return Ok(None);
        };
        let end = match start.checked_add(n) {
            Some(end) if end <= samples.len() => end,
            _ => return Ok(None),
        };

        let raw = &samples[start..end];
        let magnitude = transform.transform(&apply_window(raw, windower.window()));

        let hop = config.hop_size;
        let flux = match start.checked_sub(hop) {
            Some(prev_start) => {
                let prev_raw = &samples[prev_start..prev_start + n];
                let previous = transform.transform(&apply_window(prev_raw, windower.window()));
                let mut tracker = FluxTracker::new();
                tracker.update(&previous);
                tracker.update(&magnitude)
            }
            None => 0.0,
        };

        let stamp = FrameStamp::Offline {
            frame_index: start / hop,
            time_position: center as f64 / config.sample_rate as f64,
        };
        let rhythm = RhythmFeatures { flux, onset: false, bpm: 0.0 };
        Ok(Some(assembler.assemble(raw.to_vec(), magnitude, None, rhythm, stamp)))
    }

    fn loaded(&self) -> Result<&[f32]> {
        self.buffer
            .as_deref()
            .ok_or(AnalysisError::NotInitialized("no sample buffer loaded"))
    }

    fn analyze_span(
        &mut self,
        range_start: usize,
        range_end: usize,
        listener: &mut dyn AnalysisListener,
    ) -> Result<Vec<AudioFeatureFrame>> {
        let Self { config, windower, transform, assembler, trackers, buffer } = self;
        let samples = buffer
            .as_deref()
            .ok_or(AnalysisError::NotInitialized("no sample buffer loaded"))?;
        let span = &samples[range_start..range_end];
        let sr = config.sample_rate as f64;
        let total = windower.frame_count(span.len());

        info!(
            "Analyzing {} frames ({:.2}s..{:.2}s) with {} transform",
            total,
            range_start as f64 / sr,
            range_end as f64 / sr,
            transform.transform_type()
        );

        let mut frames = Vec::with_capacity(total);
        for frame in windower.frames(span) {
            if listener.should_cancel() {
                info!("Analysis cancelled after {} of {} frames", frames.len(), total);
                return Err(AnalysisError::Cancelled { frames: frames.len() });
            }

            let time_position = (range_start + frame.start) as f64 / sr;
            let magnitude = transform.transform(&frame.windowed);
            let rhythm = trackers.update(&magnitude, time_position);
            let stamp = FrameStamp::Offline { frame_index: frame.index, time_position };
            frames.push(assembler.assemble(frame.raw.to_vec(), magnitude, None, rhythm, stamp));

            listener.on_progress(frames.len(), total);
        }

        let onsets = frames.iter().filter(|f| f.is_onset()).count();
        info!(
            "Analysis complete: {} frames, {} onsets, final tempo {:.1} BPM",
            frames.len(),
            onsets,
            frames.last().map_or(0.0, |f| f.bpm)
        );
        Ok(frames)
    }
}

use crossbeam_channel::{Receiver, TryRecvError};
use log::{info, warn};
use std::collections::VecDeque;

use super::realtime::{StreamSnapshot, StreamSource};
use super::spectrum::{magnitude_to_bytes, FftTransform, SpectrumData, SpectrumTransform};
use super::window::{apply_window, WindowFunction};
use crate::config::AnalysisConfig;

/// Streaming spectrum source modelled on a browser analyser node.
///
/// Keeps the most recent `fft_size` samples, and on each pull runs a
/// Blackman-windowed FFT, blends it into the previous spectrum by
/// `smoothing_time_constant`, and reports byte bins scaled between the
/// configured decibel bounds.
///
/// Samples arrive either through [`push_samples`](Self::push_samples) or from
/// a capture thread over a channel, drained without blocking on every pull.
pub struct AnalyserSource {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    fft: FftTransform,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    receiver: Option<Receiver<Vec<f32>>>,
}

impl AnalyserSource {
    pub fn new(config: &AnalysisConfig) -> Self {
        let fft_size = config.fft_size;
        Self {
            fft_size,
            smoothing: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: WindowFunction::Blackman.coefficients(fft_size),
            fft: FftTransform::new(fft_size),
            samples: std::iter::repeat(0.0).take(fft_size).collect(),
            smoothed: vec![0.0; fft_size / 2],
            receiver: None,
        }
    }

    /// Source fed by a channel of mono sample chunks.
    pub fn with_receiver(config: &AnalysisConfig, receiver: Receiver<Vec<f32>>) -> Self {
        let mut source = Self::new(config);
        source.receiver = Some(receiver);
        source
    }

    /// Append samples, keeping only the latest `fft_size`.
    pub fn push_samples(&mut self, chunk: &[f32]) {
        let skip = chunk.len().saturating_sub(self.fft_size);
        for &sample in &chunk[skip..] {
            if self.samples.len() == self.fft_size {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Drain every chunk currently waiting on the channel.
    fn drain_receiver(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        loop {
            match receiver.try_recv() {
                Ok(chunk) => self.push_samples(&chunk),
                Err(TryRecvError::Empty) => {
                    self.receiver = Some(receiver);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    info!("Analyser sample channel closed; holding last samples");
                    return;
                }
            }
        }
    }

    /// Current smoothed linear spectrum.
    pub fn smoothed_spectrum(&self) -> &[f32] {
        &self.smoothed
    }

    fn update_spectrum(&mut self, waveform: &[f32]) {
        let windowed = apply_window(waveform, &self.window);
        let magnitude = self.fft.transform(&windowed);
        let tau = self.smoothing;
        for (smoothed, &current) in self.smoothed.iter_mut().zip(&magnitude) {
            let blended = tau * *smoothed + (1.0 - tau) * current;
            *smoothed = if blended.is_finite() { blended } else { 0.0 };
        }
    }
}

impl StreamSource for AnalyserSource {
    fn pull(&mut self) -> StreamSnapshot {
        self.drain_receiver();
        let waveform: Vec<f32> = self.samples.iter().copied().collect();
        if waveform.len() != self.fft_size {
            warn!("Analyser buffer holds {} samples, expected {}", waveform.len(), self.fft_size);
        }
        self.update_spectrum(&waveform);
        let bytes = magnitude_to_bytes(&self.smoothed, self.fft_size, self.min_decibels, self.max_decibels);
        StreamSnapshot {
            waveform,
            spectrum: SpectrumData::Bytes(bytes),
        }
    }

    fn source_type(&self) -> &'static str {
        "analyser"
    }
}

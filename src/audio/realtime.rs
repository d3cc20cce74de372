use log::{debug, info, warn};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use super::features::sanitize;
use super::frame::{AudioFeatureFrame, FrameAssembler, FrameStamp};
use super::spectrum::SpectrumData;
use super::trackers::TrackerState;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// What a streaming source reports on one pull.
#[derive(Debug, Clone)]
pub struct StreamSnapshot {
    /// Latest `fft_size` time-domain samples, unwindowed.
    pub waveform: Vec<f32>,
    pub spectrum: SpectrumData,
}

/// A continuously updated waveform + spectrum provider.
///
/// Implementations own their smoothing; the engine only pulls.
pub trait StreamSource {
    fn pull(&mut self) -> StreamSnapshot;

    /// Identification string used in logs.
    fn source_type(&self) -> &'static str {
        "stream"
    }
}

/// Monotonic time source in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds since construction, from `std::time::Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock advanced by the host. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.time.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.time.set(self.time.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

enum EngineState {
    Idle,
    Running(Box<dyn StreamSource>),
}

/// Pull-based streaming feature engine.
///
/// Idle until a source is connected; each [`features`](Self::features) call
/// then produces one frame stamped with the engine clock.
pub struct RealtimeEngine {
    config: AnalysisConfig,
    assembler: FrameAssembler,
    trackers: TrackerState,
    clock: Box<dyn Clock>,
    state: EngineState,
    frames_emitted: u64,
}

impl RealtimeEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::with_clock(config, Box::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: AnalysisConfig, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        info!(
            "Realtime engine: fft_size={}, sample_rate={}Hz, smoothing={:.2}",
            config.fft_size, config.sample_rate, config.smoothing_time_constant
        );
        Ok(Self {
            assembler: FrameAssembler::new(&config),
            config,
            trackers: TrackerState::new(),
            clock,
            state: EngineState::Idle,
            frames_emitted: 0,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running(_))
    }

    /// Attach a source and start running. Replacing a source resets trackers.
    pub fn connect(&mut self, source: Box<dyn StreamSource>) {
        if self.is_running() {
            info!("Replacing connected stream source");
            self.trackers.reset();
        }
        info!("Connected {} source", source.source_type());
        self.state = EngineState::Running(source);
    }

    /// Extract one frame from the connected source.
    pub fn features(&mut self) -> Result<AudioFeatureFrame> {
        let EngineState::Running(source) = &mut self.state else {
            return Err(AnalysisError::NotInitialized("no stream source connected"));
        };

        let snapshot = source.pull();
        let fft_size = self.config.fft_size;
        let num_bins = self.config.num_bins();

        let mut waveform = snapshot.waveform;
        if waveform.len() != fft_size {
            warn!("Source waveform has {} samples, expected {}", waveform.len(), fft_size);
            waveform.resize(fft_size, 0.0);
        }
        if snapshot.spectrum.len() != num_bins {
            warn!("Source spectrum has {} bins, expected {}", snapshot.spectrum.len(), num_bins);
        }

        let magnitude = snapshot
            .spectrum
            .to_linear(fft_size, self.config.min_decibels, self.config.max_decibels);
        let bytes = match snapshot.spectrum {
            SpectrumData::Bytes(bytes) => Some(bytes),
            _ => None,
        };

        let timestamp = self.clock.now();
        let mut padded = magnitude;
        padded.resize(num_bins, 0.0);
        for m in padded.iter_mut() {
            *m = sanitize(*m).max(0.0);
        }
        let rhythm = self.trackers.update(&padded, timestamp);

        let frame = self.assembler.assemble(
            waveform,
            padded,
            bytes,
            rhythm,
            FrameStamp::Realtime { timestamp },
        );

        self.frames_emitted += 1;
        if self.frames_emitted % 300 == 0 {
            debug!(
                "Realtime frame {}: rms={:.4}, centroid={:.1}Hz, flux={:.4}, bpm={:.1}",
                self.frames_emitted, frame.rms, frame.spectral_centroid, frame.spectral_flux, frame.bpm
            );
        }
        Ok(frame)
    }

    /// Forget flux, onset and tempo history (e.g. after a seek).
    pub fn reset(&mut self) {
        self.trackers.reset();
    }

    /// Release the source. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let EngineState::Running(source) = std::mem::replace(&mut self.state, EngineState::Idle) {
            info!("Disposed {} source after {} frames", source.source_type(), self.frames_emitted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of spectra.
    struct ScriptedSource {
        frames: Vec<(Vec<f32>, SpectrumData)>,
        next: usize,
    }

    impl StreamSource for ScriptedSource {
        fn pull(&mut self) -> StreamSnapshot {
            let (waveform, spectrum) = self.frames[self.next.min(self.frames.len() - 1)].clone();
            self.next += 1;
            StreamSnapshot { waveform, spectrum }
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig { fft_size: 64, ..Default::default() }
    }

    fn engine(clock: &ManualClock) -> RealtimeEngine {
        RealtimeEngine::with_clock(config(), Box::new(clock.clone())).unwrap()
    }

    #[test]
    fn test_idle_engine_errors() {
        let mut engine = RealtimeEngine::new(config()).unwrap();
        assert!(!engine.is_running());
        assert!(matches!(engine.features(), Err(AnalysisError::NotInitialized(_))));
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = AnalysisConfig { fft_size: 100, ..Default::default() };
        assert!(matches!(
            RealtimeEngine::new(bad),
            Err(AnalysisError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_frames_are_stamped_with_clock() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.connect(Box::new(ScriptedSource {
            frames: vec![(vec![0.0; 64], SpectrumData::Linear(vec![0.0; 32]))],
            next: 0,
        }));

        clock.set(2.5);
        let frame = engine.features().unwrap();
        assert_eq!(frame.stamp, FrameStamp::Realtime { timestamp: 2.5 });
        assert_eq!(frame.sample_rate, 44100);
        assert_eq!(frame.magnitude_spectrum.len(), 32);
    }

    #[test]
    fn test_flux_tracks_across_calls() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.connect(Box::new(ScriptedSource {
            frames: vec![
                (vec![0.0; 64], SpectrumData::Linear(vec![1.0; 32])),
                (vec![0.0; 64], SpectrumData::Linear(vec![3.0; 32])),
                (vec![0.0; 64], SpectrumData::Linear(vec![2.0; 32])),
            ],
            next: 0,
        }));

        assert_eq!(engine.features().unwrap().spectral_flux, 0.0);
        clock.advance(1.0 / 60.0);
        assert!((engine.features().unwrap().spectral_flux - 2.0).abs() < 1e-6);
        clock.advance(1.0 / 60.0);
        assert_eq!(engine.features().unwrap().spectral_flux, 0.0);
    }

    #[test]
    fn test_byte_spectrum_passes_through() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        let mut bytes = vec![0u8; 32];
        bytes[4] = 200;
        engine.connect(Box::new(ScriptedSource {
            frames: vec![(vec![0.0; 64], SpectrumData::Bytes(bytes.clone()))],
            next: 0,
        }));

        let frame = engine.features().unwrap();
        assert_eq!(frame.frequency_bins, bytes);
        assert!(frame.magnitude_spectrum[4] > 0.0);
        let bin_width = 44100.0 / 64.0;
        assert!((frame.spectral_centroid - 4.0 * bin_width).abs() < 1e-2);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.connect(Box::new(ScriptedSource {
            frames: vec![(vec![0.0; 64], SpectrumData::Linear(vec![0.0; 32]))],
            next: 0,
        }));
        assert!(engine.features().is_ok());

        engine.dispose();
        engine.dispose();
        assert!(!engine.is_running());
        assert!(engine.features().is_err());
    }

    #[test]
    fn test_non_finite_bins_do_not_poison_flux() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        let mut poisoned = vec![1.0; 32];
        poisoned[5] = f32::NAN;
        poisoned[6] = f32::INFINITY;
        engine.connect(Box::new(ScriptedSource {
            frames: vec![
                (vec![0.0; 64], SpectrumData::Linear(vec![1.0; 32])),
                (vec![0.0; 64], SpectrumData::Linear(poisoned)),
                (vec![0.0; 64], SpectrumData::Linear(vec![2.0; 32])),
            ],
            next: 0,
        }));

        engine.features().unwrap();
        clock.advance(0.5);
        // NaN and infinite bins count as 0, the finite bins did not move
        assert_eq!(engine.features().unwrap().spectral_flux, 0.0);
        clock.advance(0.5);
        // 30 bins rise 1 -> 2, the two scrubbed bins rise 0 -> 2
        let flux = engine.features().unwrap().spectral_flux;
        assert!((flux - 34.0 / 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_length_source_is_padded() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.connect(Box::new(ScriptedSource {
            frames: vec![(vec![0.5; 10], SpectrumData::Linear(vec![1.0; 8]))],
            next: 0,
        }));
        let frame = engine.features().unwrap();
        assert_eq!(frame.waveform.len(), 64);
        assert_eq!(frame.magnitude_spectrum.len(), 32);
        assert!(frame.spectral_flux.is_finite());
    }
}

use arrvee_features::audio::{
    create_transform, AudioFeatureFrame, FrameStamp, ManualClock, OfflineEngine, RealtimeEngine, SpectrumData,
    SpectrumTransform, StreamSnapshot, StreamSource, TransformKind, Windower,
};
use arrvee_features::AnalysisConfig;

const SR: u32 = 8000;

fn config() -> AnalysisConfig {
    AnalysisConfig {
        fft_size: 256,
        hop_size: 128,
        sample_rate: SR,
        ..Default::default()
    }
}

/// Decaying 440 Hz bursts every quarter second.
fn bursts(seconds: f64) -> Vec<f32> {
    let len = (seconds * SR as f64) as usize;
    let period = SR as usize / 4;
    (0..len)
        .map(|i| {
            let t = (i % period) as f32 / SR as f32;
            (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin() * (-t * 30.0).exp()
        })
        .collect()
}

/// Replays the offline engine's frames as a stream, delivering the same
/// windowed linear spectrum the offline path computes.
struct ReplaySource {
    frames: Vec<(Vec<f32>, Vec<f32>)>,
    next: usize,
}

impl ReplaySource {
    fn new(samples: &[f32], config: &AnalysisConfig) -> Self {
        let windower = Windower::new(config.fft_size, config.hop_size, config.window_function);
        let mut transform = create_transform(TransformKind::Reference, config.fft_size);
        let frames = windower
            .frames(samples)
            .map(|frame| (frame.raw.to_vec(), transform.transform(&frame.windowed)))
            .collect();
        Self { frames, next: 0 }
    }
}

impl StreamSource for ReplaySource {
    fn pull(&mut self) -> StreamSnapshot {
        let (waveform, spectrum) = self.frames[self.next].clone();
        self.next += 1;
        StreamSnapshot {
            waveform,
            spectrum: SpectrumData::Linear(spectrum),
        }
    }
}

fn without_stamp(frame: &AudioFeatureFrame) -> AudioFeatureFrame {
    AudioFeatureFrame {
        stamp: FrameStamp::Realtime { timestamp: 0.0 },
        ..frame.clone()
    }
}

#[test]
fn test_offline_is_deterministic_across_instances() {
    let samples = bursts(2.0);
    let run = || {
        let mut engine = OfflineEngine::new(config()).unwrap();
        engine.load_buffer(samples.clone());
        engine.analyze_complete().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_offline_detects_regular_bursts() {
    let mut engine = OfflineEngine::new(config()).unwrap();
    engine.load_buffer(bursts(4.0));
    let frames = engine.analyze_complete().unwrap();

    let onsets: Vec<f64> = frames.iter().filter(|f| f.is_onset()).map(|f| f.seconds()).collect();
    assert!(onsets.len() >= 8, "only {} onsets", onsets.len());
    for pair in onsets.windows(2) {
        assert!(pair[1] - pair[0] >= 0.1);
    }

    let last = frames.last().unwrap();
    assert!(last.bpm > 0.0);
    for frame in &frames {
        assert!(frame.spectral_rolloff <= SR as f32 / 2.0);
        assert!((0.0..=1.0).contains(&frame.zcr));
        assert!((0.0..=1.0).contains(&frame.harmonicity));
        if frame.fundamental_freq == 0.0 {
            assert_eq!(frame.harmonicity, 0.0);
        }
    }
}

#[test]
fn test_realtime_and_offline_frames_agree() {
    let samples = bursts(1.5);
    let config = config();

    let mut offline = OfflineEngine::new(config.clone()).unwrap();
    offline.load_buffer(samples.clone());
    let expected = offline.analyze_complete().unwrap();

    let clock = ManualClock::new();
    let mut realtime = RealtimeEngine::with_clock(config.clone(), Box::new(clock.clone())).unwrap();
    realtime.connect(Box::new(ReplaySource::new(&samples, &config)));

    for offline_frame in &expected {
        clock.set(offline_frame.seconds());
        let frame = realtime.features().unwrap();
        assert_eq!(frame.stamp, FrameStamp::Realtime { timestamp: offline_frame.seconds() });
        assert_eq!(without_stamp(&frame), without_stamp(offline_frame));
    }
}

#[test]
fn test_features_at_time_matches_hop_aligned_frame() {
    let samples = bursts(1.0);
    let mut engine = OfflineEngine::new(config()).unwrap();
    engine.load_buffer(samples);
    let frames = engine.analyze_complete().unwrap();

    // Frame 10 starts at sample 1280; its centre is 1408
    let single = engine.features_at_time(1408.0 / SR as f64).unwrap().unwrap();
    let hop = &frames[10];
    assert_eq!(single.waveform, hop.waveform);
    assert_eq!(single.magnitude_spectrum, hop.magnitude_spectrum);
    assert_eq!(single.spectral_flux, hop.spectral_flux);
    assert_eq!(
        single.stamp,
        FrameStamp::Offline { frame_index: 10, time_position: 1408.0 / SR as f64 }
    );
}

#[test]
fn test_fft_engine_tracks_reference_engine() {
    let samples = bursts(1.0);
    let mut reference = OfflineEngine::new(config()).unwrap();
    reference.load_buffer(samples.clone());
    let mut fast = OfflineEngine::new(AnalysisConfig { transform: TransformKind::Fft, ..config() }).unwrap();
    fast.load_buffer(samples);

    let a = reference.analyze_complete().unwrap();
    let b = fast.analyze_complete().unwrap();
    assert_eq!(a.len(), b.len());
    for (r, f) in a.iter().zip(&b) {
        assert_eq!(r.fundamental_freq, f.fundamental_freq);
        assert!((r.spectral_centroid - f.spectral_centroid).abs() < 0.5);
        assert!((r.spectral_rolloff - f.spectral_rolloff).abs() <= SR as f32 / 256.0 + 1e-3);
    }
}

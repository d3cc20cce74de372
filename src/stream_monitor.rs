use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::thread;
use std::time::Duration;

use arrvee_features::audio::{load_wav, AnalyserSource, Clock, ManualClock, MonotonicClock, RealtimeEngine};
use arrvee_features::AnalysisConfig;

#[derive(Parser)]
#[command(name = "arrvee-stream-monitor")]
#[command(about = "Stream a WAV file through the realtime feature engine and log what it sees")]
struct Args {
    /// WAV file to stream
    #[arg()]
    input_file: String,

    /// Display frames per second driving the engine
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Analysis configuration file (JSON)
    #[arg(long)]
    config: Option<String>,

    /// Pace the feeder thread and engine against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Log every Nth frame
    #[arg(long, default_value = "30")]
    every: usize,
}

/// Feeder thread standing in for a capture callback: one chunk per display frame.
fn feed(sender: Sender<Vec<f32>>, samples: Vec<f32>, chunk_len: usize, pause: Duration) {
    for chunk in samples.chunks(chunk_len) {
        if sender.send(chunk.to_vec()).is_err() {
            warn!("Analyser dropped the sample channel");
            return;
        }
        thread::sleep(pause);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    anyhow::ensure!(args.fps > 0, "--fps must be positive");

    let decoded = load_wav(&args.input_file).with_context(|| format!("Failed to decode {}", args.input_file))?;
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path).with_context(|| format!("Failed to load config {}", path))?,
        None => AnalysisConfig::default(),
    };
    config.sample_rate = decoded.sample_rate;

    let chunk_len = (decoded.sample_rate / args.fps).max(1) as usize;
    let total_frames = decoded.samples.len().div_ceil(chunk_len);
    let frame_period = 1.0 / args.fps as f64;
    info!(
        "Streaming {} at {} fps ({} samples per frame, {} frames)",
        args.input_file, args.fps, chunk_len, total_frames
    );

    let (sender, receiver) = crossbeam_channel::unbounded();
    let source = AnalyserSource::with_receiver(&config, receiver);

    let manual = ManualClock::new();
    let clock: Box<dyn Clock> = if args.realtime {
        Box::new(MonotonicClock::new())
    } else {
        Box::new(manual.clone())
    };
    let mut engine = RealtimeEngine::with_clock(config, clock).context("Invalid analysis configuration")?;
    engine.connect(Box::new(source));

    let samples = decoded.samples;
    let (feeder, mut inline) = if args.realtime {
        let pause = Duration::from_secs_f64(frame_period);
        (Some(thread::spawn(move || feed(sender, samples, chunk_len, pause))), None)
    } else {
        let chunks: Vec<Vec<f32>> = samples.chunks(chunk_len).map(<[f32]>::to_vec).collect();
        (None, Some((sender, chunks.into_iter())))
    };

    let every = args.every.max(1);
    let mut onsets = 0usize;
    let mut last_bpm = 0.0f32;
    for n in 0..total_frames {
        match &mut inline {
            Some((sender, chunks)) => {
                if let Some(chunk) = chunks.next() {
                    sender.send(chunk).context("Sample channel closed")?;
                }
            }
            None => thread::sleep(Duration::from_secs_f64(frame_period)),
        }

        let frame = engine.features()?;
        if frame.is_onset() {
            onsets += 1;
        }
        last_bpm = frame.bpm;
        if n % every == 0 {
            info!(
                "t={:7.3}s rms={:.4} centroid={:7.1}Hz flux={:.4} f0={:6.1}Hz bpm={:.1}{}",
                frame.seconds(),
                frame.rms,
                frame.spectral_centroid,
                frame.spectral_flux,
                frame.fundamental_freq,
                frame.bpm,
                if frame.is_onset() { " *onset*" } else { "" }
            );
        }
        manual.advance(frame_period);
    }

    drop(inline);
    if let Some(handle) = feeder {
        if handle.join().is_err() {
            warn!("Feeder thread panicked");
        }
    }
    info!("Streamed {} frames, {} onsets, final tempo {:.1} BPM", total_frames, onsets, last_bpm);

    engine.dispose();
    Ok(())
}

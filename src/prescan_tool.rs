use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use arrvee_features::audio::{load_wav, FeatureTrack, LogListener, OfflineEngine, TransformKind, WindowFunction};
use arrvee_features::AnalysisConfig;

#[derive(Parser)]
#[command(name = "arrvee-prescan")]
#[command(about = "Pre-scan a WAV file into a JSON feature track for synchronized visualization")]
struct Args {
    /// WAV file to analyze
    #[arg()]
    input_file: String,

    /// Output file for the feature track (JSON)
    #[arg(short, long, default_value = "prescan_data.json")]
    output: String,

    /// Analysis configuration file (JSON); flags below override it
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    fft_size: Option<usize>,

    #[arg(long)]
    hop_size: Option<usize>,

    /// Window function: hann, hamming or blackman
    #[arg(long)]
    window: Option<WindowFunction>,

    /// Spectrum transform: reference or fft
    #[arg(long)]
    transform: Option<TransformKind>,

    /// Start of the analyzed range in seconds
    #[arg(long)]
    start: Option<f64>,

    /// End of the analyzed range in seconds
    #[arg(long)]
    end: Option<f64>,
}

impl Args {
    fn analysis_config(&self, sample_rate: u32) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path).with_context(|| format!("Failed to load config {}", path))?,
            None => AnalysisConfig::default(),
        };
        if let Some(fft_size) = self.fft_size {
            config.fft_size = fft_size;
        }
        if let Some(hop_size) = self.hop_size {
            config.hop_size = hop_size;
        }
        if let Some(window) = self.window {
            config.window_function = window;
        }
        if let Some(transform) = self.transform {
            config.transform = transform;
        }
        config.sample_rate = sample_rate;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Arrvee Pre-scan Tool");
    info!("Input file: {}", args.input_file);
    info!("Output file: {}", args.output);

    let decoded = load_wav(&args.input_file).with_context(|| format!("Failed to decode {}", args.input_file))?;
    let config = args.analysis_config(decoded.sample_rate)?;
    let total_samples = decoded.samples.len();

    let mut engine = OfflineEngine::new(config.clone()).context("Invalid analysis configuration")?;
    engine.load_buffer(decoded.samples);

    let mut listener = LogListener::default();
    let frames = match (args.start, args.end) {
        (None, None) => engine.analyze_complete_with(&mut listener)?,
        (start, end) => {
            let start = start.unwrap_or(0.0);
            let end = end.unwrap_or_else(|| engine.duration());
            engine
                .analyze_range_with(start, end, &mut listener)
                .with_context(|| format!("Failed to analyze {:.2}s..{:.2}s", start, end))?
        }
    };

    let track = FeatureTrack::new(args.input_file.clone(), config, total_samples, frames);
    let stats = &track.statistics;

    info!("=== PRE-SCAN RESULTS ===");
    info!("Duration: {:.2} seconds", track.file_info.duration_seconds);
    info!("Total frames: {}", track.frames.len());
    info!("Frame rate: {:.2} Hz", track.file_info.frame_rate);
    info!("Onsets detected: {}", stats.onset_count);
    info!("Average BPM: {:.1}", stats.average_bpm);
    info!("BPM range: {:.1} - {:.1}", stats.bpm_range.0, stats.bpm_range.1);
    info!("Peak RMS: {:.6}", stats.peak_rms);
    info!("Peak spectral flux: {:.6}", stats.peak_spectral_flux);
    info!("Mean spectral centroid: {:.1} Hz", stats.mean_spectral_centroid);

    track
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output))?;
    let file_size = std::fs::metadata(&args.output)?.len();
    info!("Feature track saved ({:.1} KB)", file_size as f64 / 1024.0);

    Ok(())
}

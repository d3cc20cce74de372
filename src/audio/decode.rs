use hound::{SampleFormat, WavReader};
use log::info;
use std::io::Read;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Mono samples decoded from a PCM file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing.
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file and average its channels to mono in [-1, 1].
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let decoded = decode_wav(reader)?;
    info!(
        "Decoded {}: {} channel(s) at {}Hz, {:.2}s",
        path.display(),
        decoded.channels,
        decoded.sample_rate,
        decoded.duration_seconds()
    );
    Ok(decoded)
}

/// Decode from any WAV reader.
pub fn decode_wav<R: Read>(mut reader: WavReader<R>) -> Result<DecodedAudio> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AnalysisError::UnsupportedConfiguration("WAV file has no channels".into()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (format, bits) => {
            return Err(AnalysisError::UnsupportedConfiguration(format!(
                "unsupported WAV sample format {:?} at {} bits",
                format, bits
            )))
        }
    };

    Ok(DecodedAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Average interleaved channels. A trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// Which transform the offline engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Direct O(N²) DFT.
    #[default]
    Reference,
    /// `rustfft` O(N log N) transform.
    Fft,
}

impl std::str::FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reference" | "dft" => Ok(TransformKind::Reference),
            "fft" => Ok(TransformKind::Fft),
            other => Err(format!("unknown transform '{}'", other)),
        }
    }
}

/// Common interface for magnitude spectrum transforms.
///
/// Both implementations return the unnormalized magnitude `|X[k]|` for
/// `k in 0..N/2`, so feature code never needs to know which one ran.
/// Frames shorter than `N` are zero-padded, longer ones truncated.
pub trait SpectrumTransform {
    /// Transform size `N`.
    fn size(&self) -> usize;

    fn transform(&mut self, frame: &[f32]) -> Vec<f32>;

    /// Magnitude and phase (radians) per bin.
    fn transform_with_phase(&mut self, frame: &[f32]) -> (Vec<f32>, Vec<f32>);

    /// Identification string used in logs.
    fn transform_type(&self) -> &'static str;
}

pub fn create_transform(kind: TransformKind, size: usize) -> Box<dyn SpectrumTransform> {
    match kind {
        TransformKind::Reference => Box::new(DftTransform::new(size)),
        TransformKind::Fft => Box::new(FftTransform::new(size)),
    }
}

/// Reference transform: the DFT sum evaluated directly.
///
/// Accumulates in `f64` against a precomputed twiddle table indexed by
/// `(k * n) mod N`, which is the same angle `2πkn/N` reduced by whole turns.
pub struct DftTransform {
    size: usize,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
}

impl DftTransform {
    pub fn new(size: usize) -> Self {
        let (cos_table, sin_table) = (0..size)
            .map(|j| {
                let angle = -2.0 * PI * j as f64 / size as f64;
                (angle.cos(), angle.sin())
            })
            .unzip();
        Self { size, cos_table, sin_table }
    }

    fn bins(&self, frame: &[f32]) -> Vec<(f64, f64)> {
        let n_max = frame.len().min(self.size);
        (0..self.size / 2)
            .map(|k| {
                let mut re = 0.0f64;
                let mut im = 0.0f64;
                for (n, &x) in frame[..n_max].iter().enumerate() {
                    let idx = (k * n) % self.size;
                    re += x as f64 * self.cos_table[idx];
                    im += x as f64 * self.sin_table[idx];
                }
                (re, im)
            })
            .collect()
    }
}

impl SpectrumTransform for DftTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn transform(&mut self, frame: &[f32]) -> Vec<f32> {
        self.bins(frame)
            .into_iter()
            .map(|(re, im)| (re * re + im * im).sqrt() as f32)
            .collect()
    }

    fn transform_with_phase(&mut self, frame: &[f32]) -> (Vec<f32>, Vec<f32>) {
        self.bins(frame)
            .into_iter()
            .map(|(re, im)| ((re * re + im * im).sqrt() as f32, im.atan2(re) as f32))
            .unzip()
    }

    fn transform_type(&self) -> &'static str {
        "DFT"
    }
}

/// Planner-backed FFT. Matches `DftTransform` within floating tolerance.
pub struct FftTransform {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl FftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    fn process(&mut self, frame: &[f32]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(frame.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft.process(&mut self.buffer);
    }
}

impl SpectrumTransform for FftTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn transform(&mut self, frame: &[f32]) -> Vec<f32> {
        self.process(frame);
        self.buffer[..self.size / 2].iter().map(|c| c.norm()).collect()
    }

    fn transform_with_phase(&mut self, frame: &[f32]) -> (Vec<f32>, Vec<f32>) {
        self.process(frame);
        self.buffer[..self.size / 2].iter().map(|c| (c.norm(), c.arg())).unzip()
    }

    fn transform_type(&self) -> &'static str {
        "FFT"
    }
}

/// Spectrum as delivered by a streaming source, in whatever units it natively uses.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumData {
    /// Unnormalized linear magnitude `|X[k]|`.
    Linear(Vec<f32>),
    /// Decibels relative to full scale of `|X[k]| / N`.
    Decibels(Vec<f32>),
    /// Bytes scaled between the configured decibel bounds.
    Bytes(Vec<u8>),
}

impl SpectrumData {
    pub fn len(&self) -> usize {
        match self {
            SpectrumData::Linear(v) => v.len(),
            SpectrumData::Decibels(v) => v.len(),
            SpectrumData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize to linear magnitude, the units every feature function expects.
    pub fn to_linear(&self, fft_size: usize, min_db: f32, max_db: f32) -> Vec<f32> {
        match self {
            SpectrumData::Linear(v) => v.clone(),
            SpectrumData::Decibels(v) => decibels_to_magnitude(v, fft_size),
            SpectrumData::Bytes(v) => bytes_to_magnitude(v, fft_size, min_db, max_db),
        }
    }
}

/// Linear magnitude to bytes scaled over `[min_db, max_db]`; silence maps to 0.
pub fn magnitude_to_bytes(magnitude: &[f32], fft_size: usize, min_db: f32, max_db: f32) -> Vec<u8> {
    let range = max_db - min_db;
    magnitude
        .iter()
        .map(|&m| {
            if m <= 0.0 || !m.is_finite() {
                return 0;
            }
            let db = 20.0 * (m / fft_size as f32).log10();
            let scaled = 255.0 * (db - min_db) / range;
            scaled.clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Inverse of [`magnitude_to_bytes`] up to quantization. Byte 0 is treated as silence.
pub fn bytes_to_magnitude(bytes: &[u8], fft_size: usize, min_db: f32, max_db: f32) -> Vec<f32> {
    let range = max_db - min_db;
    bytes
        .iter()
        .map(|&b| {
            if b == 0 {
                return 0.0;
            }
            let db = min_db + (b as f32 / 255.0) * range;
            fft_size as f32 * 10f32.powf(db / 20.0)
        })
        .collect()
}

pub fn decibels_to_magnitude(decibels: &[f32], fft_size: usize) -> Vec<f32> {
    decibels
        .iter()
        .map(|&db| {
            if !db.is_finite() {
                return 0.0;
            }
            fft_size as f32 * 10f32.powf(db / 20.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_dft_peaks_at_bin_frequency() {
        // 8 full periods over 64 samples lands exactly on bin 8
        let frame = sine(8.0, 64.0, 64);
        let mag = DftTransform::new(64).transform(&frame);
        assert_eq!(mag.len(), 32);
        let peak = mag
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
        assert!((mag[8] - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_dft_of_silence_is_zero() {
        let mag = DftTransform::new(32).transform(&[0.0; 32]);
        assert!(mag.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_fft_matches_dft() {
        let frame: Vec<f32> = sine(440.0, 44100.0, 512)
            .iter()
            .zip(sine(1250.0, 44100.0, 512))
            .map(|(a, b)| 0.6 * a + 0.3 * b)
            .collect();
        let reference = DftTransform::new(512).transform(&frame);
        let fast = FftTransform::new(512).transform(&frame);
        for (r, f) in reference.iter().zip(&fast) {
            assert!((r - f).abs() < 1e-3 * r.max(1.0), "{} vs {}", r, f);
        }
    }

    #[test]
    fn test_phase_of_cosine_is_zero() {
        let frame: Vec<f32> = (0..32)
            .map(|i| (2.0 * std::f32::consts::PI * 4.0 * i as f32 / 32.0).cos())
            .collect();
        let (mag, phase) = DftTransform::new(32).transform_with_phase(&frame);
        assert!((mag[4] - 16.0).abs() < 1e-4);
        assert!(phase[4].abs() < 1e-4);
    }

    #[test]
    fn test_short_frame_is_zero_padded() {
        let mut dft = DftTransform::new(16);
        let mut fft = FftTransform::new(16);
        let a = dft.transform(&[1.0, 0.5]);
        let b = fft.transform(&[1.0, 0.5]);
        assert_eq!(a.len(), 8);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_byte_scaling_bounds() {
        let n = 2048;
        // |X|/N = 1.0 -> 0 dB, above max -> 255
        let bytes = magnitude_to_bytes(&[0.0, n as f32, n as f32 * 1e-6], n, -100.0, -30.0);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 255);
        // -120 dB is below the floor
        assert_eq!(bytes[2], 0);
    }

    #[test]
    fn test_bytes_round_trip_within_quantization() {
        let n = 1024;
        let db: f32 = -65.0;
        let magnitude = n as f32 * 10f32.powf(db / 20.0);
        let bytes = magnitude_to_bytes(&[magnitude], n, -100.0, -30.0);
        let back = bytes_to_magnitude(&bytes, n, -100.0, -30.0);
        let back_db = 20.0 * (back[0] / n as f32).log10();
        // one byte step is 70/255 dB
        assert!((back_db - db).abs() <= 70.0 / 255.0 + 1e-3);
    }

    #[test]
    fn test_spectrum_data_normalizes_all_representations() {
        let n = 64;
        let linear = SpectrumData::Linear(vec![1.0, 2.0]);
        assert_eq!(linear.to_linear(n, -100.0, -30.0), vec![1.0, 2.0]);

        let decibels = SpectrumData::Decibels(vec![0.0, f32::NEG_INFINITY]);
        assert_eq!(decibels.to_linear(n, -100.0, -30.0), vec![64.0, 0.0]);

        let bytes = SpectrumData::Bytes(vec![0, 255]);
        let out = bytes.to_linear(n, -100.0, -30.0);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - n as f32 * 10f32.powf(-30.0 / 20.0)).abs() < 1e-4);
    }
}

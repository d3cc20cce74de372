use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Tapering window applied to each analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowFunction {
    /// Window coefficients of length `size`.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        match size {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowFunction::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowFunction::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
                }
            })
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WindowFunction::Hann => "hann",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Blackman => "blackman",
        }
    }
}

impl std::str::FromStr for WindowFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" => Ok(WindowFunction::Hann),
            "hamming" => Ok(WindowFunction::Hamming),
            "blackman" => Ok(WindowFunction::Blackman),
            other => Err(format!("unknown window function '{}'", other)),
        }
    }
}

/// Multiply `raw` by `window` sample by sample.
pub fn apply_window(raw: &[f32], window: &[f32]) -> Vec<f32> {
    raw.iter().zip(window).map(|(&s, &w)| s * w).collect()
}

/// Frame size, hop size and precomputed coefficients for framing a buffer.
#[derive(Debug, Clone)]
pub struct Windower {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f32>,
}

impl Windower {
    pub fn new(frame_size: usize, hop_size: usize, function: WindowFunction) -> Self {
        Self {
            frame_size,
            hop_size,
            window: function.coefficients(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Number of full frames that fit in `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if self.frame_size == 0 || self.hop_size == 0 || len < self.frame_size {
            return 0;
        }
        (len - self.frame_size) / self.hop_size + 1
    }

    /// Lazily frame `samples`; frame `k` starts at `k * hop_size`.
    pub fn frames<'a>(&'a self, samples: &'a [f32]) -> Frames<'a> {
        Frames {
            windower: self,
            samples,
            index: 0,
            count: self.frame_count(samples.len()),
        }
    }
}

/// One windowed analysis frame.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub index: usize,
    /// First sample of the frame, relative to the framed slice.
    pub start: usize,
    pub raw: &'a [f32],
    pub windowed: Vec<f32>,
}

pub struct Frames<'a> {
    windower: &'a Windower,
    samples: &'a [f32],
    index: usize,
    count: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let start = self.index * self.windower.hop_size;
        let raw = &self.samples[start..start + self.windower.frame_size];
        let frame = Frame {
            index: self.index,
            start,
            raw,
            windowed: apply_window(raw, &self.windower.window),
        };
        self.index += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

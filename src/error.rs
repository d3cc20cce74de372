use thiserror::Error;

/// Errors raised by the feature extraction pipeline.
///
/// Per-frame numeric edge cases (silence, zero energy) never surface here;
/// they are absorbed as zero-valued features.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Engine used before a stream source or sample buffer was attached.
    #[error("engine not initialized: {0}")]
    NotInitialized(&'static str),

    /// Configuration rejected at engine construction.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// Requested time range lies outside the loaded buffer.
    #[error("range {start:.3}s..{end:.3}s is outside the buffer (duration {duration:.3}s)")]
    OutOfRange { start: f64, end: f64, duration: f64 },

    /// A listener asked the batch loop to stop.
    #[error("analysis cancelled after {frames} frames")]
    Cancelled { frames: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, AnalysisError>`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

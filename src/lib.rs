//! Per-frame audio feature extraction for music visualization.
//!
//! Two engines share one extraction path: [`audio::RealtimeEngine`] pulls
//! from a live [`audio::StreamSource`], [`audio::OfflineEngine`] walks a
//! loaded buffer hop by hop. Both emit [`audio::AudioFeatureFrame`].

pub mod audio;
pub mod config;
pub mod error;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};

pub mod analyser;
pub mod constants;
pub mod decode;
pub mod features;
pub mod frame;
pub mod offline;
pub mod realtime;
pub mod spectrum;
pub mod track;
pub mod trackers;
pub mod window;

pub use analyser::AnalyserSource;
pub use decode::{load_wav, DecodedAudio};
pub use frame::{AudioFeatureFrame, FrameAssembler, FrameStamp};
pub use offline::{AnalysisListener, LogListener, NoOpListener, OfflineEngine};
pub use realtime::{Clock, ManualClock, MonotonicClock, RealtimeEngine, StreamSnapshot, StreamSource};
pub use spectrum::{create_transform, SpectrumData, SpectrumTransform, TransformKind};
pub use track::{FeatureTrack, TrackStatistics};
pub use trackers::{FluxTracker, OnsetDetector, RhythmFeatures, TempoEstimator, TrackerState};
pub use window::{WindowFunction, Windower};

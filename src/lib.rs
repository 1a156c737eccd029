//! Breath segmentation, phase detection and per-breath QA metrics for
//! ventilator test waveforms.
//!
//! [`detection::BreathPipeline`] runs the whole analysis over one fully loaded
//! [`detection::WaveformTable`]; [`io`] reads Sensirion exports and writes the
//! breath tables; [`report`] summarises the tidal-volume distribution.
pub mod config;
pub mod detection;
pub mod io;
pub mod report;
pub use config::AnalysisConfig;
pub use detection::{AnalysisOutcome, BreathError, BreathMetric, BreathPipeline, Rejection};

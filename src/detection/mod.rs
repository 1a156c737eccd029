// src/detection/mod.rs
// 呼吸检测核心: 分段 -> 边界修正 -> 相位 -> 指标 -> QA
pub mod error;
pub mod metrics;
pub mod phases;
pub mod pipeline;
pub mod qa;
pub mod reference;
pub mod refiner;
pub mod segmenter;
pub mod stats;
pub mod table;
#[cfg(test)]
pub(crate) mod synthetic;
pub use error::BreathError;
pub use metrics::{BreathMetric, MetricCalculator};
pub use phases::{BreathPhases, PhaseDetector, PhasedBreath};
pub use pipeline::{AcceptedAnalysis, AnalysisOutcome, BreathPipeline, Rejection};
pub use qa::{QaFilter, QaOutcome, QaReport};
pub use reference::candidates_from_times;
pub use refiner::BreathRefiner;
pub use segmenter::{BreathCandidate, BreathSegmenter};
pub use table::{RawTable, WaveformTable};

use log::{info, warn};
use thiserror::Error;
use crate::config::AnalysisConfig;
use crate::detection::metrics::{BreathMetric, MetricCalculator};
use crate::detection::phases::{PhaseDetector, PhasedBreath};
use crate::detection::qa::{QaFilter, QaReport};
use crate::detection::reference::candidates_from_times;
use crate::detection::refiner::BreathRefiner;
use crate::detection::segmenter::{BreathCandidate, BreathSegmenter};
use crate::detection::table::{RawTable, WaveformTable};
use crate::detection::BreathError;
/// Breaths that made it through every stage, numbered 1..N.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptedAnalysis {
    pub metrics: Vec<BreathMetric>,
    pub qa: QaReport,
    /// Breaths found before metric computation and QA.
    pub detected: usize,
}
/// File-level negative results. These are answers, not failures.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("waveform contains no samples")]
    EmptyWaveform,
    #[error("no breaths detected")]
    NoBreathsDetected,
    #[error("none of the {} analysed breaths passed QA", .qa.input)]
    NoBreathsPassedQa { qa: QaReport },
}
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisOutcome {
    Accepted(AcceptedAnalysis),
    Rejected(Rejection),
}
impl AnalysisOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AnalysisOutcome::Accepted(_))
    }
    pub fn metrics(&self) -> &[BreathMetric] {
        match self {
            AnalysisOutcome::Accepted(accepted) => &accepted.metrics,
            AnalysisOutcome::Rejected(_) => &[],
        }
    }
}
/// Segment -> refine -> phases -> metrics -> QA over one fully loaded waveform.
/// Holds no state between runs.
#[derive(Clone, Debug)]
pub struct BreathPipeline {
    config: AnalysisConfig,
}
impl BreathPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self, BreathError> {
        config.validate()?;
        Ok(Self { config })
    }
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
    /// Ingest a raw reader table (header echo rows included) and analyse it.
    pub fn analyze_raw(&self, raw: &RawTable) -> Result<AnalysisOutcome, BreathError> {
        if raw.is_empty() {
            return Ok(AnalysisOutcome::Rejected(Rejection::EmptyWaveform));
        }
        let table = WaveformTable::ingest(raw, &self.config.ingest)?;
        self.analyze(&table)
    }
    pub fn analyze(&self, table: &WaveformTable) -> Result<AnalysisOutcome, BreathError> {
        if table.is_empty() {
            return Ok(AnalysisOutcome::Rejected(Rejection::EmptyWaveform));
        }
        let breaths = self.detect(table)?;
        Ok(self.finish(table, &breaths))
    }
    /// Boundaries and phase split of every breath, before metrics and QA.
    pub fn detect(&self, table: &WaveformTable) -> Result<Vec<PhasedBreath>, BreathError> {
        let coarse = match BreathSegmenter::new(&self.config.segmenter).segment(table) {
            Ok(coarse) => coarse,
            Err(err) if !err.is_fatal() => {
                warn!("segmentation gave up: {err}");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        info!("segmenter found {} breaths", coarse.len());
        let refined = BreathRefiner::new(&self.config.refiner).refine(&coarse, table.flow());
        Ok(self.phases(table, &refined))
    }
    /// Skip segmentation and use the given breath start times (seconds) as boundaries.
    pub fn analyze_with_reference(
        &self,
        table: &WaveformTable,
        breath_times: &[f64],
    ) -> Result<AnalysisOutcome, BreathError> {
        if table.is_empty() {
            return Ok(AnalysisOutcome::Rejected(Rejection::EmptyWaveform));
        }
        let candidates = candidates_from_times(table, breath_times);
        info!("{} breaths from the reference breath table", candidates.len());
        let breaths = self.phases(table, &candidates);
        Ok(self.finish(table, &breaths))
    }
    fn phases(&self, table: &WaveformTable, candidates: &[BreathCandidate]) -> Vec<PhasedBreath> {
        PhaseDetector::new(&self.config.phases).detect_all(table.flow(), candidates)
    }
    fn finish(&self, table: &WaveformTable, breaths: &[PhasedBreath]) -> AnalysisOutcome {
        if breaths.is_empty() {
            return AnalysisOutcome::Rejected(Rejection::NoBreathsDetected);
        }
        let metrics = MetricCalculator::new(&self.config.sotair).compute_all(table, breaths);
        let outcome = QaFilter::new(&self.config.qa).apply(metrics);
        if outcome.accepted.is_empty() {
            return AnalysisOutcome::Rejected(Rejection::NoBreathsPassedQa { qa: outcome.report });
        }
        AnalysisOutcome::Accepted(AcceptedAnalysis {
            metrics: outcome.accepted,
            qa: outcome.report,
            detected: breaths.len(),
        })
    }
}

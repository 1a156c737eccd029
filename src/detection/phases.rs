use log::warn;
use ndarray::ArrayView1;
use crate::config::PhaseConfig;
use crate::detection::stats::window_inclusive;
use crate::detection::{BreathCandidate, BreathError};
/// Phase split of one breath, as absolute sample positions.
/// Always `start <= insp_end <= exp_start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreathPhases {
    pub insp_end: usize,
    pub exp_start: usize,
    /// False when no inspiration end was found and both boundaries were parked at `start + 1`.
    pub detected: bool,
}
impl BreathPhases {
    pub fn degenerate(start: usize) -> Self {
        Self {
            insp_end: start + 1,
            exp_start: start + 1,
            detected: false,
        }
    }
}
/// A refined breath with its phase split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhasedBreath {
    pub bounds: BreathCandidate,
    pub phases: BreathPhases,
}
impl PhasedBreath {
    pub fn start(&self) -> usize {
        self.bounds.start
    }
    pub fn end(&self) -> usize {
        self.bounds.end
    }
    pub fn insp_end(&self) -> usize {
        self.phases.insp_end
    }
    pub fn exp_start(&self) -> usize {
        self.phases.exp_start
    }
}
pub struct PhaseDetector<'a> {
    config: &'a PhaseConfig,
}
impl<'a> PhaseDetector<'a> {
    pub fn new(config: &'a PhaseConfig) -> Self {
        Self { config }
    }
    /// Detect phases for every breath. Breaths with invalid bounds are skipped,
    /// breaths without an inspiration end get degenerate phases.
    pub fn detect_all(
        &self,
        flow: ArrayView1<'_, f64>,
        breaths: &[BreathCandidate],
    ) -> Vec<PhasedBreath> {
        breaths
            .iter()
            .filter_map(|&bounds| match self.detect(flow, bounds) {
                Ok(phases) => Some(PhasedBreath { bounds, phases }),
                Err(err @ BreathError::DetectionFailure { .. }) => {
                    warn!("{err}; keeping it with degenerate phases");
                    Some(PhasedBreath {
                        bounds,
                        phases: BreathPhases::degenerate(bounds.start),
                    })
                }
                Err(err) => {
                    warn!("skipping breath: {err}");
                    None
                }
            })
            .collect()
    }
    pub fn detect(
        &self,
        flow: ArrayView1<'_, f64>,
        bounds: BreathCandidate,
    ) -> Result<BreathPhases, BreathError> {
        let BreathCandidate { start, end } = bounds;
        if start >= end || end >= flow.len() {
            return Err(BreathError::InvalidIndices {
                start,
                end,
                len: flow.len(),
            });
        }
        let segment = window_inclusive(flow, start, end);
        let insp = self
            .find_insp_end(segment)
            .ok_or(BreathError::DetectionFailure { start })?;
        let exp = self.find_exp_start(segment, insp).unwrap_or(insp);
        let insp = if exp != insp {
            self.plateau_start(segment, insp, exp)
        } else {
            insp
        };
        Ok(BreathPhases {
            insp_end: start + insp.min(exp),
            exp_start: start + exp,
            detected: true,
        })
    }
    /// First drop from positive flow into a sustained near-zero run, after the guard window.
    fn find_insp_end(&self, segment: ArrayView1<'_, f64>) -> Option<usize> {
        let c = self.config;
        let guard = c.insp_end_guard.max(1);
        let last = segment.len().saturating_sub(c.insp_end_plateau_len);
        (guard..last).find(|&i| {
            segment[i - 1] > 0.0
                && segment[i] < c.insp_end_flow_threshold
                && segment
                    .iter()
                    .skip(i)
                    .take(c.insp_end_plateau_len)
                    .all(|&v| v < c.insp_end_flow_threshold)
        })
    }
    /// Last sample before flow falls into sustained expiration.
    fn find_exp_start(&self, segment: ArrayView1<'_, f64>, insp: usize) -> Option<usize> {
        let c = self.config;
        let threshold = c.exp_start_flow_threshold;
        let last = segment.len().saturating_sub(c.exp_start_len);
        (insp..last).find(|&i| {
            segment[i] > threshold
                && segment[i + 1] < threshold
                && segment
                    .iter()
                    .skip(i + 1)
                    .take(c.exp_start_len)
                    .all(|&v| v < threshold)
        })
    }
    /// Walk back from `exp` through the low-flow plateau; its first sample is
    /// the refined inspiration end. The walk stops at the guard boundary.
    fn plateau_start(&self, segment: ArrayView1<'_, f64>, insp: usize, exp: usize) -> usize {
        let c = self.config;
        let floor = (insp + 1).saturating_sub(c.insp_end_guard.max(1)).max(1);
        let mut p = exp;
        while p >= floor && segment[p] < c.plateau_refine_threshold {
            p -= 1;
        }
        (p + 1).min(exp)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::detection::synthetic;
    use ndarray::Array1;
    fn config() -> PhaseConfig {
        AnalysisConfig::max_relative().phases
    }
    #[test]
    fn square_breath_splits_inside_the_ramp_down() {
        let table = synthetic::square_breath();
        let config = config();
        let phases = PhaseDetector::new(&config)
            .detect(table.flow(), BreathCandidate { start: 59, end: 391 })
            .unwrap();
        // Ramp-down occupies samples 160..=169; 166 is the first sample below 1 L/min.
        assert_eq!(phases.insp_end, 166);
        assert_eq!(phases.exp_start, 166);
        assert!(phases.detected);
    }
    #[test]
    fn plateau_moves_insp_end_back_to_its_first_sample() {
        // 30 samples of inspiration, a 20-sample plateau near zero, then expiration.
        let mut flow = vec![0.0];
        flow.extend(vec![30.0; 30]);
        flow.extend([0.8, 0.2]);
        flow.extend(vec![0.1; 18]);
        flow.extend(vec![-20.0; 30]);
        let flow = Array1::from(flow);
        let config = config();
        let end = flow.len() - 1;
        let phases = PhaseDetector::new(&config)
            .detect(flow.view(), BreathCandidate { start: 0, end })
            .unwrap();
        // insp_end initially lands on 31 (0.8); exp_start is the last plateau sample.
        assert_eq!(phases.exp_start, 50);
        // Walking back, 31 (0.8) is above the 0.5 plateau threshold: plateau starts at 32.
        assert_eq!(phases.insp_end, 32);
        assert!(phases.insp_end <= phases.exp_start);
    }
    #[test]
    fn missing_insp_end_is_a_detection_failure() {
        let flow = Array1::from(vec![10.0; 80]);
        let config = config();
        let detector = PhaseDetector::new(&config);
        let err = detector
            .detect(flow.view(), BreathCandidate { start: 5, end: 70 })
            .unwrap_err();
        assert_eq!(err, BreathError::DetectionFailure { start: 5 });
        let all = detector.detect_all(flow.view(), &[BreathCandidate { start: 5, end: 70 }]);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phases, BreathPhases::degenerate(5));
        assert!(!all[0].phases.detected);
    }
    #[test]
    fn out_of_range_breath_is_skipped() {
        let flow = Array1::from(vec![0.0; 10]);
        let config = config();
        let detector = PhaseDetector::new(&config);
        let err = detector
            .detect(flow.view(), BreathCandidate { start: 2, end: 50 })
            .unwrap_err();
        assert!(matches!(err, BreathError::InvalidIndices { .. }));
        assert!(detector
            .detect_all(flow.view(), &[BreathCandidate { start: 2, end: 50 }])
            .is_empty());
    }
    #[test]
    fn guard_window_hides_early_drops() {
        // Drop to zero at sample 10 (inside a 21-sample guard) and again at 40.
        let mut flow = vec![0.0];
        flow.extend(vec![20.0; 9]);
        flow.extend(vec![0.0; 6]);
        flow.extend(vec![20.0; 24]);
        flow.extend(vec![-10.0; 30]);
        let flow = Array1::from(flow);
        let config = config();
        let end = flow.len() - 1;
        let phases = PhaseDetector::new(&config)
            .detect(flow.view(), BreathCandidate { start: 0, end })
            .unwrap();
        assert_eq!(phases.insp_end, 40);
    }
}

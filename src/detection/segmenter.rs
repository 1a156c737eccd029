use log::debug;
use ndarray::ArrayView1;
use crate::config::{SegmenterConfig, ThresholdMode, ThresholdSet};
use crate::detection::stats::{nan_max, nan_mean, window};
use crate::detection::{BreathError, WaveformTable};
/// Coarse breath boundaries, as sample positions in the ingested table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BreathCandidate {
    pub start: usize,
    pub end: usize,
}
impl BreathCandidate {
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }
}
/// Scanner state. A start is only emitted together with its end, so the
/// start and end sequences cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    SeekingStart { from: usize },
    SeekingEnd { start: usize, from: usize },
    Done,
}
/// Dual threshold scan for coarse breath boundaries.
pub struct BreathSegmenter<'a> {
    config: &'a SegmenterConfig,
}
impl<'a> BreathSegmenter<'a> {
    pub fn new(config: &'a SegmenterConfig) -> Self {
        Self { config }
    }
    /// Resolve the configured thresholds against the series (max-relative
    /// thresholds need the largest clean flow and pressure values).
    pub fn resolve_thresholds(&self, table: &WaveformTable) -> Result<ThresholdSet, BreathError> {
        let thresholds = &self.config.thresholds;
        match thresholds.mode {
            ThresholdMode::Absolute => Ok(thresholds.absolute),
            ThresholdMode::MaxRelative => {
                let max_flow = nan_max(table.flow().iter().copied());
                let max_pressure = nan_max(table.pressure().iter().copied());
                if max_flow.is_nan() || max_pressure.is_nan() {
                    return Err(BreathError::InsufficientData(
                        "no valid flow or pressure samples to derive thresholds from".into(),
                    ));
                }
                debug!("max flow {max_flow:.3}, max pressure {max_pressure:.3}");
                Ok(thresholds.relative.scaled(max_flow, max_pressure))
            }
        }
    }
    pub fn segment(&self, table: &WaveformTable) -> Result<Vec<BreathCandidate>, BreathError> {
        if table.is_empty() {
            return Ok(Vec::new());
        }
        let thresholds = self.resolve_thresholds(table)?;
        debug!("segmenter thresholds: {thresholds:?}");
        let scan = Scan {
            config: self.config,
            thresholds,
            flow: table.flow(),
            pressure: table.pressure(),
        };
        let start_limit = table.len().saturating_sub(self.config.min_lookahead);
        let mut breaths = Vec::new();
        let mut state = ScanState::SeekingStart { from: 0 };
        while state != ScanState::Done {
            state = match state {
                ScanState::SeekingStart { from } => match scan.find_start(from, start_limit) {
                    Some(start) => ScanState::SeekingEnd {
                        start,
                        from: start.saturating_add(self.config.end_search_offset),
                    },
                    None => ScanState::Done,
                },
                ScanState::SeekingEnd { start, from } => match scan
                    .find_end(from)
                    .or_else(|| scan.find_final_rest(from))
                {
                    Some(end) => {
                        breaths.push(BreathCandidate { start, end });
                        let resume = (end + 1).saturating_sub(self.config.resume_backoff);
                        ScanState::SeekingStart {
                            from: resume.max(start + 1),
                        }
                    }
                    None => {
                        // Neither end test looks at the start, so no later
                        // start could close either.
                        debug!("discarding start {start}: no breath end before the data runs out");
                        ScanState::Done
                    }
                },
                ScanState::Done => ScanState::Done,
            };
        }
        Ok(breaths)
    }
}
struct Scan<'a> {
    config: &'a SegmenterConfig,
    thresholds: ThresholdSet,
    flow: ArrayView1<'a, f64>,
    pressure: ArrayView1<'a, f64>,
}
impl Scan<'_> {
    fn find_start(&self, from: usize, limit: usize) -> Option<usize> {
        (from..limit).find(|&i| self.is_start(i))
    }
    fn find_end(&self, from: usize) -> Option<usize> {
        (from..self.flow.len()).find(|&j| self.is_end(j))
    }
    /// First sample of the rest that lasts until the data runs out. Only used
    /// when no next inspiration closes the breath.
    fn find_final_rest(&self, from: usize) -> Option<usize> {
        let t = &self.thresholds;
        let c = self.config;
        if !c.close_final_at_rest {
            return None;
        }
        let len = self.flow.len();
        let rest_from = (0..len)
            .rev()
            .find(|&i| self.flow[i].abs() >= t.end_flow_mean)
            .map_or(0, |i| i + 1);
        let limit = len.saturating_sub(c.end_peak_window.max(1));
        (from.max(rest_from)..=limit).find(|&j| {
            let pressure_before = nan_max(
                window(self.pressure, j.saturating_sub(c.end_pressure_window), j)
                    .iter()
                    .copied(),
            );
            pressure_before < t.end_pressure
        })
    }
    fn is_start(&self, i: usize) -> bool {
        let t = &self.thresholds;
        let crosses = self.flow[i] > t.start_flow_low;
        if !crosses {
            return false;
        }
        let ahead = i.saturating_add(self.config.start_lookahead);
        nan_max(window(self.flow, i, ahead).iter().copied()) > t.start_flow_high
            && nan_max(window(self.pressure, i, ahead).iter().copied()) > t.start_pressure
    }
    fn is_end(&self, j: usize) -> bool {
        let t = &self.thresholds;
        let c = self.config;
        let flow_before = nan_mean(
            window(self.flow, j.saturating_sub(c.end_mean_window), j)
                .iter()
                .copied(),
        );
        let flow_after = window(self.flow, j, j.saturating_add(c.end_peak_window));
        let pressure_before = nan_max(
            window(self.pressure, j.saturating_sub(c.end_pressure_window), j)
                .iter()
                .copied(),
        );
        let settled = flow_before < t.end_flow_mean
            && nan_max(flow_after.iter().copied()) > t.end_flow_peak
            && pressure_before < t.end_pressure;
        // A single spike is not the next inspiration.
        let dips_back = nan_mean(flow_after.iter().copied()) < t.end_flow_mean;
        settled && !dips_back
    }
}

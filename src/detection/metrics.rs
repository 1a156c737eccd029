use chrono::{DateTime, Utc};
use log::warn;
use ndarray::ArrayView1;
use crate::config::SotairConfig;
use crate::detection::stats::{nan_max, nan_mean, nan_min, window_inclusive};
use crate::detection::{BreathError, PhasedBreath, WaveformTable};
/// L/min integrated over seconds, to millilitres.
const LITRE_MINUTES_TO_ML: f64 = 1000.0 / 60.0;
/// Per-breath clinical record. Indices are sample positions in the analysed table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BreathMetric {
    pub breath_number: usize,
    pub start_index: usize,
    pub insp_end_index: usize,
    pub exp_start_index: usize,
    pub end_index: usize,
    pub breath_start_time: f64,
    pub insp_end_time: f64,
    pub exp_start_time: f64,
    pub breath_end_time: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub peak_pressure: f64,
    pub peak_flow: f64,
    /// mL
    pub inspiratory_volume: f64,
    /// mL, magnitude
    pub expiratory_volume: f64,
    pub inspiratory_time: f64,
    pub inspiratory_flow_time: f64,
    pub mean_pressure_ti: f64,
    pub sotair: bool,
    pub gradient: f64,
    pub time_gap: f64,
    pub phase_detected: bool,
}
pub struct MetricCalculator<'a> {
    config: &'a SotairConfig,
}
impl<'a> MetricCalculator<'a> {
    pub fn new(config: &'a SotairConfig) -> Self {
        Self { config }
    }
    /// Metrics for every breath, numbered 1.. in order. Breaths with an invalid
    /// range are logged and skipped.
    pub fn compute_all(&self, table: &WaveformTable, breaths: &[PhasedBreath]) -> Vec<BreathMetric> {
        let mut metrics = Vec::with_capacity(breaths.len());
        for breath in breaths {
            match self.compute(table, breath, metrics.len() + 1) {
                Ok(metric) => metrics.push(metric),
                Err(err) => warn!("skipping breath starting at sample {}: {err}", breath.start()),
            }
        }
        metrics
    }
    pub fn compute(
        &self,
        table: &WaveformTable,
        breath: &PhasedBreath,
        breath_number: usize,
    ) -> Result<BreathMetric, BreathError> {
        let (start, insp_end, exp_start, end) = (
            breath.start(),
            breath.insp_end(),
            breath.exp_start(),
            breath.end(),
        );
        let ordered = start < insp_end && insp_end <= exp_start && exp_start <= end;
        if !ordered || end >= table.len() {
            return Err(BreathError::InvalidRange {
                start,
                insp_end,
                exp_start,
                end,
            });
        }
        let time = table.time();
        let flow = table.flow();
        let pressure = table.pressure();
        let volume = |from: usize, to: usize, phase: &str| match integrate(time, flow, from, to) {
            Ok(v) => v * LITRE_MINUTES_TO_ML,
            Err(err) => {
                warn!("breath starting at sample {start}, {phase} volume: {err}");
                f64::NAN
            }
        };
        let inspiratory_volume = volume(start, insp_end, "inspiratory");
        let expiratory_volume = volume(exp_start, end, "expiratory").abs();
        let inspiration = |data: ArrayView1<'_, f64>| {
            window_inclusive(data, start, insp_end).iter().copied().collect::<Vec<_>>()
        };
        let insp_pressure = inspiration(pressure);
        let inspiratory_time = time[insp_end] - time[start];
        let gradient = self.gradient(time, flow, start, insp_end);
        let time_gap = time[exp_start] - time[insp_end];
        Ok(BreathMetric {
            breath_number,
            start_index: start,
            insp_end_index: insp_end,
            exp_start_index: exp_start,
            end_index: end,
            breath_start_time: time[start],
            insp_end_time: time[insp_end],
            exp_start_time: time[exp_start],
            breath_end_time: time[end],
            timestamp: table.timestamp(start),
            peak_pressure: nan_max(insp_pressure.iter().copied()),
            peak_flow: nan_max(inspiration(flow)),
            inspiratory_volume,
            expiratory_volume,
            inspiratory_time,
            inspiratory_flow_time: inspiratory_time,
            mean_pressure_ti: nan_mean(insp_pressure),
            sotair: self.is_sotair(gradient, time_gap),
            gradient,
            time_gap,
            phase_detected: breath.phases.detected,
        })
    }
    /// Steepest flow slope over the sample pairs just before `insp_end`.
    fn gradient(
        &self,
        time: ArrayView1<'_, f64>,
        flow: ArrayView1<'_, f64>,
        start: usize,
        insp_end: usize,
    ) -> f64 {
        let pairs = self.config.gradient_pairs;
        if insp_end <= start.saturating_add(pairs) {
            return f64::NAN;
        }
        nan_min((0..pairs).map(|k| {
            let (hi, lo) = (insp_end - k, insp_end - k - 1);
            let dt = time[hi] - time[lo];
            if dt == 0.0 {
                f64::NAN
            } else {
                (flow[hi] - flow[lo]) / dt
            }
        }))
    }
    /// NaN gradients compare false, so they never raise the flag.
    fn is_sotair(&self, gradient: f64, time_gap: f64) -> bool {
        gradient < self.config.gradient_threshold && time_gap > self.config.time_gap_threshold
    }
}
/// Trapezoid integral of `y` over `x` on `[from, to]`, skipping samples whose `y` is NaN.
fn integrate(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    from: usize,
    to: usize,
) -> Result<f64, BreathError> {
    let points: Vec<(f64, f64)> = window_inclusive(x, from, to)
        .iter()
        .zip(window_inclusive(y, from, to).iter())
        .filter(|(_, y)| !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if points.len() < 2 {
        return Err(BreathError::InsufficientData(format!(
            "{} valid flow samples in [{from}, {to}]",
            points.len()
        )));
    }
    Ok(points
        .windows(2)
        .map(|p| (p[1].0 - p[0].0) * (p[0].1 + p[1].1) / 2.0)
        .sum())
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{synthetic, BreathCandidate, BreathPhases};
    fn phased(start: usize, insp_end: usize, exp_start: usize, end: usize) -> PhasedBreath {
        PhasedBreath {
            bounds: BreathCandidate { start, end },
            phases: BreathPhases {
                insp_end,
                exp_start,
                detected: true,
            },
        }
    }
    #[test]
    fn square_breath_volumes_match_the_trapezoid() {
        let table = synthetic::square_breath();
        let config = SotairConfig::default();
        let metric = MetricCalculator::new(&config)
            .compute(&table, &phased(59, 166, 166, 391), 1)
            .unwrap();
        assert!((metric.inspiratory_volume - 983.25).abs() < 1e-6);
        assert!((metric.expiratory_volume - 483.25).abs() < 1e-6);
        assert!((metric.inspiratory_volume - 1000.0).abs() / 1000.0 < 0.05);
        assert_eq!(metric.peak_flow, 60.0);
        assert_eq!(metric.peak_pressure, 20.0);
        assert!((metric.inspiratory_time - 1.07).abs() < 1e-9);
        assert_eq!(metric.inspiratory_time, metric.inspiratory_flow_time);
        // Ramp-down slope is -9 per 0.01 s.
        assert!((metric.gradient + 900.0).abs() < 1e-6);
        assert_eq!(metric.time_gap, 0.0);
        assert!(!metric.sotair);
    }
    #[test]
    fn steep_cut_off_with_dwell_raises_sotair() {
        // Flow collapses from 60 to 0 in one sample, then holds at zero for 0.4 s.
        let mut flow = vec![0.0];
        flow.extend(vec![60.0; 40]);
        flow.extend(vec![0.0; 40]);
        flow.extend(vec![-30.0; 40]);
        let pressure = vec![10.0; flow.len()];
        let table = synthetic::table(flow, pressure);
        let config = SotairConfig::default();
        let metric = MetricCalculator::new(&config)
            .compute(&table, &phased(0, 41, 81, 120), 1)
            .unwrap();
        assert!((metric.gradient + 6000.0).abs() < 1e-6);
        assert!((metric.time_gap - 0.4).abs() < 1e-9);
        assert!(metric.sotair);
    }
    #[test]
    fn short_inspiration_has_no_gradient() {
        let table = synthetic::square_breath();
        let config = SotairConfig::default();
        let metric = MetricCalculator::new(&config)
            .compute(&table, &phased(59, 62, 166, 391), 1)
            .unwrap();
        assert!(metric.gradient.is_nan());
        assert!(!metric.sotair);
    }
    #[test]
    fn nan_flow_is_left_out_of_the_integral() {
        let table = synthetic::table(vec![0.0, 60.0, f64::NAN, 60.0, 0.0], vec![1.0; 5]);
        let config = SotairConfig::default();
        let metric = MetricCalculator::new(&config)
            .compute(&table, &phased(0, 4, 4, 4), 1)
            .unwrap();
        // Trapezoids over (0,0)-(0.01,60)-(0.03,60)-(0.04,0): 0.3 + 1.2 + 0.3 L/min*s.
        assert!((metric.inspiratory_volume - 1.8 * LITRE_MINUTES_TO_ML).abs() < 1e-9);
    }
    #[test]
    fn too_few_valid_samples_yield_nan_volume() {
        let table = synthetic::table(vec![f64::NAN, f64::NAN, 5.0, -5.0], vec![1.0; 4]);
        let config = SotairConfig::default();
        let metric = MetricCalculator::new(&config)
            .compute(&table, &phased(0, 1, 2, 3), 1)
            .unwrap();
        assert!(metric.inspiratory_volume.is_nan());
        assert!(metric.expiratory_volume.is_finite());
    }
    #[test]
    fn disordered_phases_are_skipped() {
        let table = synthetic::square_breath();
        let config = SotairConfig::default();
        let calculator = MetricCalculator::new(&config);
        let bad = phased(59, 200, 166, 391);
        assert!(matches!(
            calculator.compute(&table, &bad, 1),
            Err(BreathError::InvalidRange { .. })
        ));
        let metrics = calculator.compute_all(&table, &[bad, phased(59, 166, 166, 391)]);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].breath_number, 1);
    }
}

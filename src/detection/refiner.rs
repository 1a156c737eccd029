use log::debug;
use ndarray::ArrayView1;
use crate::config::RefinerConfig;
use crate::detection::BreathCandidate;
/// Snaps coarse boundaries onto the nearest crossing of the zero-tolerance band.
pub struct BreathRefiner<'a> {
    config: &'a RefinerConfig,
}
impl<'a> BreathRefiner<'a> {
    pub fn new(config: &'a RefinerConfig) -> Self {
        Self { config }
    }
    pub fn refine(
        &self,
        candidates: &[BreathCandidate],
        flow: ArrayView1<'_, f64>,
    ) -> Vec<BreathCandidate> {
        let candidates = match candidates.split_first() {
            Some((first, rest)) if first.start < self.config.min_start_offset => {
                debug!("dropping truncated leading breath starting at {}", first.start);
                rest
            }
            _ => candidates,
        };
        candidates
            .iter()
            .map(|c| BreathCandidate {
                start: self.refine_start(c.start, flow),
                end: self.refine_end(c.end, flow),
            })
            .collect()
    }
    /// Latest rising crossing in the `back_window` samples before `start`.
    fn refine_start(&self, start: usize, flow: ArrayView1<'_, f64>) -> usize {
        let tol = self.config.zero_tolerance;
        let lo = start.saturating_sub(self.config.back_window);
        (lo..start)
            .rev()
            .filter(|&i| i + 1 < flow.len())
            .find(|&i| flow[i] <= tol && flow[i + 1] >= tol)
            .map(|i| closer_to_zero(flow, i))
            .unwrap_or(start)
    }
    /// First falling crossing in the `forward_window` samples from `end`.
    fn refine_end(&self, end: usize, flow: ArrayView1<'_, f64>) -> usize {
        let tol = self.config.zero_tolerance;
        let hi = flow
            .len()
            .saturating_sub(1)
            .min(end.saturating_add(self.config.forward_window));
        (end..hi)
            .find(|&i| flow[i] >= tol && flow[i + 1] <= tol)
            .map(|i| closer_to_zero(flow, i))
            .unwrap_or(end)
    }
}
/// `i` or `i + 1`, whichever flow sample sits closer to zero.
fn closer_to_zero(flow: ArrayView1<'_, f64>, i: usize) -> usize {
    if flow[i].abs() < flow[i + 1].abs() {
        i
    } else {
        i + 1
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    fn flow(values: &[f64]) -> Array1<f64> {
        Array1::from(values.to_vec())
    }
    #[test]
    fn start_snaps_to_sample_nearest_zero() {
        let mut values = vec![0.0; 20];
        values.extend([0.2, 3.0, 10.0, 20.0, 30.0]);
        values.extend(vec![30.0; 20]);
        let flow = flow(&values);
        let config = RefinerConfig::default();
        let refined = BreathRefiner::new(&config)
            .refine(&[BreathCandidate { start: 23, end: 40 }], flow.view());
        // Crossing between 20 (0.2) and 21 (3.0); 0.2 is closer to zero.
        assert_eq!(refined[0].start, 20);
        assert_eq!(refined[0].end, 40);
    }
    #[test]
    fn end_snaps_forward_on_falling_crossing() {
        let mut values = vec![0.0; 15];
        values.extend(vec![20.0; 30]);
        values.extend([8.0, 0.3, -5.0]);
        values.extend(vec![-5.0; 10]);
        let flow = flow(&values);
        let config = RefinerConfig::default();
        let refined =
            BreathRefiner::new(&config).refine(&[BreathCandidate { start: 20, end: 30 }], flow.view());
        // 45 (8.0) -> 46 (0.3): 46 is closer to zero.
        assert_eq!(refined[0].end, 46);
        // Rising crossing 14 (0.0) -> 15 (20.0).
        assert_eq!(refined[0].start, 14);
    }
    #[test]
    fn no_crossing_keeps_coarse_boundaries() {
        let flow = flow(&vec![5.0; 100]);
        let config = RefinerConfig::default();
        let input = [BreathCandidate { start: 50, end: 80 }];
        assert_eq!(BreathRefiner::new(&config).refine(&input, flow.view()), input.to_vec());
    }
    #[test]
    fn truncated_first_breath_is_dropped() {
        let flow = flow(&vec![5.0; 100]);
        let config = RefinerConfig::default();
        let input = [
            BreathCandidate { start: 3, end: 30 },
            BreathCandidate { start: 40, end: 70 },
        ];
        let refined = BreathRefiner::new(&config).refine(&input, flow.view());
        assert_eq!(refined, vec![BreathCandidate { start: 40, end: 70 }]);
    }
    #[test]
    fn forward_window_bounds_the_end_search() {
        let mut values = vec![10.0; 80];
        values.extend([0.0; 20]);
        let flow = flow(&values);
        let mut config = RefinerConfig::default();
        config.forward_window = 20;
        let input = [BreathCandidate { start: 20, end: 50 }];
        // Falling crossing at 79 -> 80 lies 29 samples ahead.
        assert_eq!(BreathRefiner::new(&config).refine(&input, flow.view())[0].end, 50);
        config.forward_window = 40;
        assert_eq!(BreathRefiner::new(&config).refine(&input, flow.view())[0].end, 80);
    }
}

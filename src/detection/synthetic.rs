//! Piecewise-linear ventilator waveforms for tests, sampled at 100 Hz.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::detection::WaveformTable;
pub const SAMPLE_PERIOD: f64 = 0.01;
pub const BASELINE_SAMPLES: usize = 60;
pub const TRAILING_SAMPLES: usize = 120;
/// One breath: rise, inspiratory hold, fall through zero into expiration,
/// expiratory hold, recovery to zero, then rest.
#[derive(Clone, Copy, Debug)]
pub struct BreathShape {
    pub rise: usize,
    pub hold: usize,
    pub fall: usize,
    pub exp_hold: usize,
    pub recover: usize,
    pub rest: usize,
    pub peak_flow: f64,
    pub exp_flow: f64,
    pub pressure: f64,
}
impl Default for BreathShape {
    fn default() -> Self {
        Self {
            rise: 10,
            hold: 90,
            fall: 10,
            exp_hold: 90,
            recover: 10,
            rest: 130,
            peak_flow: 60.0,
            exp_flow: -30.0,
            pressure: 20.0,
        }
    }
}
impl BreathShape {
    pub fn samples(&self) -> usize {
        self.rise + self.hold + self.fall + self.exp_hold + self.recover + self.rest
    }
    fn push(&self, flow: &mut Vec<f64>, pressure: &mut Vec<f64>) {
        let ramp = |from: f64, to: f64, steps: usize, k: usize| {
            from + (to - from) * (k + 1) as f64 / steps as f64
        };
        for k in 0..self.rise {
            flow.push(ramp(0.0, self.peak_flow, self.rise, k));
            pressure.push(self.pressure);
        }
        for _ in 0..self.hold {
            flow.push(self.peak_flow);
            pressure.push(self.pressure);
        }
        for k in 0..self.fall {
            flow.push(ramp(self.peak_flow, self.exp_flow, self.fall, k));
            pressure.push(self.pressure);
        }
        for _ in 0..self.exp_hold {
            flow.push(self.exp_flow);
            pressure.push(0.0);
        }
        for k in 0..self.recover {
            flow.push(ramp(self.exp_flow, 0.0, self.recover, k));
            pressure.push(0.0);
        }
        for _ in 0..self.rest {
            flow.push(0.0);
            pressure.push(0.0);
        }
    }
}
/// Zero baseline, then the given breaths. The last one ends in rest.
pub fn breaths_at_rest(shapes: &[BreathShape]) -> WaveformTable {
    let (flow, pressure) = samples(shapes);
    table(flow, pressure)
}
/// Zero baseline, the given breaths, then an inspiration that never finishes,
/// so every breath is closed by the rise of the next one.
pub fn breath_train(shapes: &[BreathShape]) -> WaveformTable {
    let (mut flow, mut pressure) = samples(shapes);
    let trailing = shapes.first().copied().unwrap_or_default();
    flow.extend(std::iter::repeat(trailing.peak_flow).take(TRAILING_SAMPLES));
    pressure.extend(std::iter::repeat(trailing.pressure).take(TRAILING_SAMPLES));
    table(flow, pressure)
}
fn samples(shapes: &[BreathShape]) -> (Vec<f64>, Vec<f64>) {
    let mut flow = vec![0.0; BASELINE_SAMPLES];
    let mut pressure = vec![0.0; BASELINE_SAMPLES];
    for shape in shapes {
        shape.push(&mut flow, &mut pressure);
    }
    (flow, pressure)
}
/// The single reference breath (60 L/min for ~1 s, then -30 L/min for ~1 s,
/// then zero) followed by the next breath's rise.
pub fn square_breath() -> WaveformTable {
    breath_train(&[BreathShape::default()])
}
/// The single reference breath with nothing after it but rest.
pub fn lone_square_breath() -> WaveformTable {
    breaths_at_rest(&[BreathShape::default()])
}
/// Breath train with uniform noise of the given amplitude added to flow and pressure.
pub fn noisy_train(shapes: &[BreathShape], amplitude: f64, seed: u64) -> WaveformTable {
    let clean = breath_train(shapes);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut jitter = |v: f64| {
        if amplitude > 0.0 {
            v + rng.gen_range(-amplitude..amplitude)
        } else {
            v
        }
    };
    let flow = clean.flow().iter().map(|&v| jitter(v)).collect();
    let pressure = clean
        .pressure()
        .iter()
        .map(|&v| jitter(v).max(0.0))
        .collect();
    table(flow, pressure)
}
pub fn table(flow: Vec<f64>, pressure: Vec<f64>) -> WaveformTable {
    let time = (0..flow.len()).map(|i| i as f64 * SAMPLE_PERIOD).collect();
    WaveformTable::from_columns(time, flow, pressure).expect("synthetic columns are consistent")
}

use log::{debug, warn};
use crate::detection::{BreathCandidate, WaveformTable};
/// Breath candidates from externally supplied breath start times (for example
/// the device's own breath table): each time snaps to its nearest sample and
/// consecutive starts bound one breath.
pub fn candidates_from_times(table: &WaveformTable, breath_times: &[f64]) -> Vec<BreathCandidate> {
    let samples: Vec<usize> = breath_times
        .iter()
        .filter_map(|&t| {
            let sample = table.nearest_sample(t);
            if sample.is_none() {
                warn!("breath time {t} cannot be placed on the waveform");
            }
            sample
        })
        .collect();
    let candidates: Vec<_> = samples
        .windows(2)
        .filter_map(|pair| {
            let candidate = BreathCandidate::new(pair[0], pair[1]);
            if candidate.is_none() {
                warn!(
                    "skipping reference breath: samples {} and {} are not increasing",
                    pair[0], pair[1]
                );
            }
            candidate
        })
        .collect();
    debug!("{} reference breaths from {} breath times", candidates.len(), breath_times.len());
    candidates
}

//! Tidal-volume distribution over the accepted breaths.
use serde::{Deserialize, Serialize};
use crate::detection::BreathMetric;
/// Half-open or closed volume band in mL. A missing bound is unbounded.
///
/// `(None, Some(hi))` counts `v < hi`, `(Some(lo), None)` counts `v > lo`,
/// `(Some(lo), Some(hi))` counts `lo <= v <= hi`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}
impl VolumeRange {
    pub const TARGET: VolumeRange = VolumeRange {
        low: Some(400.0),
        high: Some(600.0),
    };
    pub fn contains(&self, v: f64) -> bool {
        match (self.low, self.high) {
            (None, Some(high)) => v < high,
            (Some(low), None) => v > low,
            (Some(low), Some(high)) => (low..=high).contains(&v),
            (None, None) => true,
        }
    }
    pub fn label(&self) -> String {
        match (self.low, self.high) {
            (None, Some(high)) => format!("Pct Vt < {high}"),
            (Some(low), None) => format!("Pct Vt > {low}"),
            (Some(low), Some(high)) => format!("Pct Vt in [{low}, {high}]"),
            (None, None) => "Pct Vt".to_owned(),
        }
    }
}
pub fn default_ranges() -> Vec<VolumeRange> {
    vec![
        VolumeRange {
            low: None,
            high: Some(400.0),
        },
        VolumeRange::TARGET,
        VolumeRange {
            low: Some(600.0),
            high: None,
        },
    ]
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangeShare {
    pub label: String,
    pub range: VolumeRange,
    pub percent: Option<f64>,
}
/// Percentages and extremes are `None` when no breath has a finite inhaled volume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TidalVolumeSummary {
    pub total_breaths: usize,
    pub max_inhaled_volume: Option<f64>,
    pub min_inhaled_volume: Option<f64>,
    pub percent_in_target: Option<f64>,
    pub ranges: Vec<RangeShare>,
}
impl TidalVolumeSummary {
    pub fn from_metrics(metrics: &[BreathMetric], ranges: &[VolumeRange]) -> Self {
        let volumes: Vec<f64> = metrics
            .iter()
            .map(|m| m.inspiratory_volume)
            .filter(|v| v.is_finite())
            .collect();
        let total = volumes.len();
        let percent = |range: &VolumeRange| {
            (total > 0).then(|| {
                let hits = volumes.iter().filter(|&&v| range.contains(v)).count();
                hits as f64 * 100.0 / total as f64
            })
        };
        Self {
            total_breaths: total,
            max_inhaled_volume: volumes.iter().copied().reduce(f64::max),
            min_inhaled_volume: volumes.iter().copied().reduce(f64::min),
            percent_in_target: percent(&VolumeRange::TARGET),
            ranges: ranges
                .iter()
                .map(|range| RangeShare {
                    label: range.label(),
                    range: *range,
                    percent: percent(range),
                })
                .collect(),
        }
    }
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

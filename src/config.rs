// src/config.rs
//! Analysis configuration threaded explicitly into every stage.
//!
//! Two presets exist because two threshold variants were in use for the same
//! device family: absolute thresholds with a 31-sample guard window and a
//! 20-sample forward refinement window, and max-relative thresholds with a
//! 21-sample guard window and a 40-sample forward refinement window. Every
//! field of either preset can be overridden from JSON.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::detection::BreathError;
/// How the segmenter turns its six threshold values into flow/pressure levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Values are used as-is (flow in L/min, pressure in cmH2O).
    Absolute,
    /// Values are fractions of the largest non-NaN flow/pressure in the series.
    MaxRelative,
}
/// One complete set of segmenter thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    pub start_flow_low: f64,
    pub start_flow_high: f64,
    pub start_pressure: f64,
    pub end_flow_mean: f64,
    pub end_flow_peak: f64,
    pub end_pressure: f64,
}
impl ThresholdSet {
    pub const ABSOLUTE: ThresholdSet = ThresholdSet {
        start_flow_low: 1.0,
        start_flow_high: 5.0,
        start_pressure: 1.0,
        end_flow_mean: 1.0,
        end_flow_peak: 2.0,
        end_pressure: 0.1,
    };
    pub const RELATIVE: ThresholdSet = ThresholdSet {
        start_flow_low: 0.05,
        start_flow_high: 0.20,
        start_pressure: 0.10,
        end_flow_mean: 0.05,
        end_flow_peak: 0.10,
        end_pressure: 0.05,
    };
    /// Scale the flow thresholds by `max_flow` and the pressure thresholds by `max_pressure`.
    pub fn scaled(&self, max_flow: f64, max_pressure: f64) -> Self {
        Self {
            start_flow_low: self.start_flow_low * max_flow,
            start_flow_high: self.start_flow_high * max_flow,
            start_pressure: self.start_pressure * max_pressure,
            end_flow_mean: self.end_flow_mean * max_flow,
            end_flow_peak: self.end_flow_peak * max_flow,
            end_pressure: self.end_pressure * max_pressure,
        }
    }
}
impl Default for ThresholdSet {
    fn default() -> Self {
        ThresholdSet::ABSOLUTE
    }
}
/// Both threshold variants, with `mode` selecting the one in force.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub mode: ThresholdMode,
    pub absolute: ThresholdSet,
    pub relative: ThresholdSet,
}
impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            mode: ThresholdMode::MaxRelative,
            absolute: ThresholdSet::ABSOLUTE,
            relative: ThresholdSet::RELATIVE,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Leading rows of the raw table that only echo column names and units.
    pub header_rows: usize,
}
impl Default for IngestConfig {
    fn default() -> Self {
        Self { header_rows: 2 }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub thresholds: ThresholdConfig,
    /// Samples inspected after a candidate start for the flow/pressure peaks.
    pub start_lookahead: usize,
    /// Offset from a start at which the end search begins.
    pub end_search_offset: usize,
    /// Samples before a candidate end whose mean flow must be low.
    pub end_mean_window: usize,
    /// Samples after a candidate end whose flow must rise again.
    pub end_peak_window: usize,
    /// Samples before a candidate end whose pressure must have dropped.
    pub end_pressure_window: usize,
    /// The start scan resumes this many samples before an accepted end.
    pub resume_backoff: usize,
    /// The start scan stops this many samples before the end of the data.
    pub min_lookahead: usize,
    /// Close the last breath where its flow settles, if it stays at rest until
    /// the data ends. Otherwise only the next inspiration closes a breath.
    pub close_final_at_rest: bool,
}
impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            start_lookahead: 10,
            end_search_offset: 40,
            end_mean_window: 5,
            end_peak_window: 10,
            end_pressure_window: 10,
            resume_backoff: 10,
            min_lookahead: 50,
            close_final_at_rest: true,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// A first breath starting before this sample is treated as truncated and dropped.
    pub min_start_offset: usize,
    /// Flow level (L/min) treated as the zero crossing.
    pub zero_tolerance: f64,
    pub back_window: usize,
    pub forward_window: usize,
}
impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            min_start_offset: 10,
            zero_tolerance: 0.5,
            back_window: 40,
            forward_window: 40,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Samples skipped at the start of a breath before looking for insp_end.
    pub insp_end_guard: usize,
    pub insp_end_plateau_len: usize,
    pub insp_end_flow_threshold: f64,
    pub exp_start_len: usize,
    pub exp_start_flow_threshold: f64,
    pub plateau_refine_threshold: f64,
}
impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            insp_end_guard: 21,
            insp_end_plateau_len: 5,
            insp_end_flow_threshold: 1.0,
            exp_start_len: 5,
            exp_start_flow_threshold: -4.0,
            plateau_refine_threshold: 0.5,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SotairConfig {
    /// Flow gradient (L/min per second) below which the inspiration cut-off counts as abrupt.
    pub gradient_threshold: f64,
    /// Minimum dwell (seconds) between insp_end and exp_start.
    pub time_gap_threshold: f64,
    /// Number of sample pairs before insp_end used for the gradient.
    pub gradient_pairs: usize,
}
impl Default for SotairConfig {
    fn default() -> Self {
        Self {
            gradient_threshold: -1000.0,
            time_gap_threshold: 0.25,
            gradient_pairs: 3,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub max_expiratory_volume_ml: f64,
    pub min_inspiratory_volume_ml: f64,
}
impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_expiratory_volume_ml: 2000.0,
            min_inspiratory_volume_ml: 50.0,
        }
    }
}
/// Every tunable of the analysis. Defaults to [`AnalysisConfig::max_relative`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ingest: IngestConfig,
    pub segmenter: SegmenterConfig,
    pub refiner: RefinerConfig,
    pub phases: PhaseConfig,
    pub sotair: SotairConfig,
    pub qa: QaConfig,
}
impl AnalysisConfig {
    /// Percentage-of-maximum thresholds, 21-sample guard, 40-sample end refinement.
    pub fn max_relative() -> Self {
        Self::default()
    }
    /// Fixed thresholds, 31-sample guard, 20-sample end refinement.
    pub fn fixed_absolute() -> Self {
        let mut config = Self::default();
        config.segmenter.thresholds.mode = ThresholdMode::Absolute;
        config.phases.insp_end_guard = 31;
        config.refiner.forward_window = 20;
        config
    }
    /// Apply a (possibly partial) JSON document on top of `self`.
    pub fn overlay_json(&self, json: &str) -> Result<Self, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        let overlay: Value = serde_json::from_str(json)?;
        merge(&mut base, overlay);
        serde_json::from_value(base)
    }
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
    /// Reject configurations that cannot drive the scans.
    pub fn validate(&self) -> Result<(), BreathError> {
        let seg = &self.segmenter;
        let windows = [
            ("segmenter.start_lookahead", seg.start_lookahead),
            ("segmenter.end_mean_window", seg.end_mean_window),
            ("segmenter.end_peak_window", seg.end_peak_window),
            ("segmenter.end_pressure_window", seg.end_pressure_window),
            ("phases.insp_end_guard", self.phases.insp_end_guard),
            ("phases.insp_end_plateau_len", self.phases.insp_end_plateau_len),
            ("phases.exp_start_len", self.phases.exp_start_len),
            ("sotair.gradient_pairs", self.sotair.gradient_pairs),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, size)| *size == 0) {
            return Err(BreathError::InvalidConfig(format!("{name} must be at least 1")));
        }
        let widest_lookback = seg.end_mean_window.max(seg.end_pressure_window);
        if seg.end_search_offset < widest_lookback {
            return Err(BreathError::InvalidConfig(format!(
                "segmenter.end_search_offset ({}) must cover the end look-back windows ({widest_lookback})",
                seg.end_search_offset
            )));
        }
        if seg.resume_backoff > seg.end_search_offset {
            return Err(BreathError::InvalidConfig(format!(
                "segmenter.resume_backoff ({}) must not exceed segmenter.end_search_offset ({})",
                seg.resume_backoff, seg.end_search_offset
            )));
        }
        Ok(())
    }
}
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn presets_differ_only_in_documented_windows() {
        let relative = AnalysisConfig::max_relative();
        let absolute = AnalysisConfig::fixed_absolute();
        assert_eq!(relative.segmenter.thresholds.mode, ThresholdMode::MaxRelative);
        assert_eq!(absolute.segmenter.thresholds.mode, ThresholdMode::Absolute);
        assert_eq!(relative.phases.insp_end_guard, 21);
        assert_eq!(absolute.phases.insp_end_guard, 31);
        assert_eq!(relative.refiner.forward_window, 40);
        assert_eq!(absolute.refiner.forward_window, 20);
        assert_eq!(relative.sotair, absolute.sotair);
        assert_eq!(relative.qa, absolute.qa);
    }
    #[test]
    fn partial_json_overrides_only_named_fields() {
        let base = AnalysisConfig::fixed_absolute();
        let merged = base
            .overlay_json(r#"{"qa": {"max_expiratory_volume_ml": 1500.0}, "segmenter": {"thresholds": {"absolute": {"start_flow_low": 2.5}}}}"#)
            .unwrap();
        assert_eq!(merged.qa.max_expiratory_volume_ml, 1500.0);
        assert_eq!(merged.qa.min_inspiratory_volume_ml, 50.0);
        assert_eq!(merged.segmenter.thresholds.absolute.start_flow_low, 2.5);
        assert_eq!(merged.segmenter.thresholds.absolute.start_flow_high, 5.0);
        assert_eq!(merged.phases.insp_end_guard, 31);
        assert_eq!(merged.segmenter.thresholds.mode, ThresholdMode::Absolute);
    }
    #[test]
    fn mode_can_be_switched_from_json() {
        let merged = AnalysisConfig::fixed_absolute()
            .overlay_json(r#"{"segmenter": {"thresholds": {"mode": "max_relative"}}}"#)
            .unwrap();
        assert_eq!(merged.segmenter.thresholds.mode, ThresholdMode::MaxRelative);
    }
    #[test]
    fn json_round_trip_is_lossless() {
        let config = AnalysisConfig::fixed_absolute();
        let text = config.to_json_pretty().unwrap();
        let back = AnalysisConfig::default().overlay_json(&text).unwrap();
        assert_eq!(config, back);
    }
    #[test]
    fn zero_windows_are_rejected() {
        let mut config = AnalysisConfig::default();
        config.phases.exp_start_len = 0;
        assert!(matches!(config.validate(), Err(BreathError::InvalidConfig(_))));
        let mut config = AnalysisConfig::default();
        config.segmenter.resume_backoff = 80;
        assert!(config.validate().is_err());
        assert!(AnalysisConfig::default().validate().is_ok());
    }
    #[test]
    fn relative_thresholds_scale_by_maxima() {
        let scaled = ThresholdSet::RELATIVE.scaled(60.0, 20.0);
        assert!((scaled.start_flow_low - 3.0).abs() < 1e-12);
        assert!((scaled.start_flow_high - 12.0).abs() < 1e-12);
        assert!((scaled.start_pressure - 2.0).abs() < 1e-12);
        assert!((scaled.end_pressure - 1.0).abs() < 1e-12);
    }
}

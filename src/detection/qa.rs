use log::info;
use crate::config::QaConfig;
use crate::detection::BreathMetric;
/// What the QA filter removed, per rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QaReport {
    pub input: usize,
    pub removed_expiratory: usize,
    pub removed_inspiratory: usize,
    pub accepted: usize,
}
impl QaReport {
    pub fn removed(&self) -> usize {
        self.removed_expiratory + self.removed_inspiratory
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct QaOutcome {
    pub accepted: Vec<BreathMetric>,
    pub report: QaReport,
}
/// Volume sanity bounds. The expiratory rule runs first, the inspiratory rule
/// on the survivors; survivors are renumbered 1..N in their original order.
pub struct QaFilter<'a> {
    config: &'a QaConfig,
}
impl<'a> QaFilter<'a> {
    pub fn new(config: &'a QaConfig) -> Self {
        Self { config }
    }
    pub fn apply(&self, metrics: Vec<BreathMetric>) -> QaOutcome {
        let input = metrics.len();
        let max_exp = self.config.max_expiratory_volume_ml;
        let min_insp = self.config.min_inspiratory_volume_ml;
        // NaN compares false on both rules, so it is removed.
        let survivors: Vec<_> = metrics
            .into_iter()
            .filter(|m| m.expiratory_volume <= max_exp)
            .collect();
        let removed_expiratory = input - survivors.len();
        if removed_expiratory > 0 {
            info!("removed {removed_expiratory} breaths with expiratory volume > {max_exp} mL");
        }
        let after_exp = survivors.len();
        let mut accepted: Vec<_> = survivors
            .into_iter()
            .filter(|m| m.inspiratory_volume >= min_insp)
            .collect();
        let removed_inspiratory = after_exp - accepted.len();
        if removed_inspiratory > 0 {
            info!("removed {removed_inspiratory} breaths with inspiratory volume < {min_insp} mL");
        }
        for (number, metric) in accepted.iter_mut().enumerate() {
            metric.breath_number = number + 1;
        }
        info!("QA: {} of {input} breaths accepted", accepted.len());
        QaOutcome {
            report: QaReport {
                input,
                removed_expiratory,
                removed_inspiratory,
                accepted: accepted.len(),
            },
            accepted,
        }
    }
}

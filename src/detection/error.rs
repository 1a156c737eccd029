use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BreathError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),
    #[error("column `{column}` has {actual} samples, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("time must be a finite, strictly increasing value (sample {sample})")]
    NonMonotonicTime { sample: usize },
    #[error("invalid breath indices: start {start} is not before end {end} (table has {len} samples)")]
    InvalidIndices { start: usize, end: usize, len: usize },
    #[error(
        "invalid breath range: start={start}, insp_end={insp_end}, exp_start={exp_start}, end={end}"
    )]
    InvalidRange {
        start: usize,
        insp_end: usize,
        exp_start: usize,
        end: usize,
    },
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("no inspiration end found for breath starting at sample {start}")]
    DetectionFailure { start: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
impl BreathError {
    /// Schema and configuration errors abort the whole run; the rest are local to one breath.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BreathError::MissingColumn(_)
                | BreathError::ColumnLength { .. }
                | BreathError::NonMonotonicTime { .. }
                | BreathError::InvalidConfig(_)
        )
    }
}

use std::path::PathBuf;
use thiserror::Error;
use crate::detection::BreathError;
#[derive(Debug, Error)]
pub enum WaveformIoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Breath(#[from] BreathError),
    #[error("breath table is empty; nothing to export")]
    EmptyTable,
    #[error("breath table line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("failed to render plot: {0}")]
    Plot(String),
}
#[cfg(feature = "plot")]
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for WaveformIoError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        WaveformIoError::Plot(format!("{value:?}"))
    }
}
#[cfg(feature = "plot")]
impl From<image::ImageError> for WaveformIoError {
    fn from(value: image::ImageError) -> Self {
        WaveformIoError::Plot(value.to_string())
    }
}

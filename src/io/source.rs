use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use log::info;
use crate::detection::{AnalysisOutcome, BreathPipeline, RawTable, WaveformTable};
use crate::io::sensirion::read_sensirion_file;
use crate::io::WaveformIoError;
/// One waveform as handed over by a source, before ingestion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    /// Used to name output files.
    pub name: String,
    pub raw: RawTable,
    /// Breath start times from the device's own breath table, if it had one.
    pub breath_times: Vec<f64>,
}
/// Hands recordings to a [`SourcePipeline`] one at a time; `None` once exhausted.
pub trait WaveformSource {
    fn next_recording(&mut self) -> Result<Option<Recording>, WaveformIoError>;
}
/// Sensirion CSV files, read one per call in the given order.
pub struct SensirionSource {
    paths: VecDeque<PathBuf>,
}
impl SensirionSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}
impl WaveformSource for SensirionSource {
    fn next_recording(&mut self) -> Result<Option<Recording>, WaveformIoError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let file = read_sensirion_file(&path)?;
        Ok(Some(Recording {
            name: file_stem(&path),
            breath_times: file.breath_table.breath_times(),
            raw: file.raw,
        }))
    }
}
/// Recordings already in memory, replayed in insertion order.
pub struct ManualSource {
    queue: VecDeque<Recording>,
}
impl ManualSource {
    pub fn new(recordings: impl IntoIterator<Item = Recording>) -> Self {
        Self {
            queue: recordings.into_iter().collect(),
        }
    }
}
impl WaveformSource for ManualSource {
    fn next_recording(&mut self) -> Result<Option<Recording>, WaveformIoError> {
        Ok(self.queue.pop_front())
    }
}
/// Result of analysing one recording.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordingAnalysis {
    pub name: String,
    pub table: WaveformTable,
    pub outcome: AnalysisOutcome,
}
/// Pulls recordings from a source and runs each through the breath pipeline.
pub struct SourcePipeline<S: WaveformSource> {
    source: S,
    pipeline: BreathPipeline,
    use_reference: bool,
}
impl<S: WaveformSource> SourcePipeline<S> {
    pub fn new(source: S, pipeline: BreathPipeline) -> Self {
        Self {
            source,
            pipeline,
            use_reference: false,
        }
    }
    /// Use the device breath table, when present, instead of segmentation.
    pub fn with_reference(mut self, use_reference: bool) -> Self {
        self.use_reference = use_reference;
        self
    }
    pub fn pump_once(&mut self) -> Result<Option<RecordingAnalysis>, WaveformIoError> {
        let Some(recording) = self.source.next_recording()? else {
            return Ok(None);
        };
        info!("analysing {}", recording.name);
        let table = if recording.raw.is_empty() {
            WaveformTable::from_columns(Vec::new(), Vec::new(), Vec::new())?
        } else {
            WaveformTable::ingest(&recording.raw, &self.pipeline.config().ingest)?
        };
        let outcome = if self.use_reference && !recording.breath_times.is_empty() {
            self.pipeline
                .analyze_with_reference(&table, &recording.breath_times)?
        } else {
            self.pipeline.analyze(&table)?
        };
        Ok(Some(RecordingAnalysis {
            name: recording.name,
            table,
            outcome,
        }))
    }
}
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "waveform".to_owned())
}

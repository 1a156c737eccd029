//! Breath-table CSV export. Each file is a row of display names, a row of
//! units, then one row per breath.
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, Writer};
use log::info;
use crate::detection::BreathMetric;
use crate::io::WaveformIoError;
pub const STANDARD_PREFIX: &str = "auto_breath_table_";
pub const DEVELOPER_PREFIX: &str = "dev_auto_breath_table_";
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    BreathNumber,
    PeakPressure,
    PeakFlow,
    InspiratoryVolume,
    ExpiratoryVolume,
    InspiratoryTime,
    InspiratoryFlowTime,
    MeanPressureTi,
    Sotair,
    BreathStartTime,
    InspStopTime,
    ExpStartTime,
    BreathEndTime,
    BreathTimestamp,
    StartIndex,
    InspEndIndex,
    ExpStartIndex,
    EndIndex,
    Gradient,
    TimeGap,
    PhaseDetected,
}
pub const STANDARD_COLUMNS: &[Column] = &[
    Column::BreathNumber,
    Column::PeakPressure,
    Column::PeakFlow,
    Column::InspiratoryVolume,
    Column::ExpiratoryVolume,
    Column::InspiratoryTime,
    Column::InspiratoryFlowTime,
    Column::Sotair,
];
pub const DEVELOPER_COLUMNS: &[Column] = &[
    Column::BreathNumber,
    Column::PeakPressure,
    Column::PeakFlow,
    Column::InspiratoryVolume,
    Column::ExpiratoryVolume,
    Column::InspiratoryTime,
    Column::InspiratoryFlowTime,
    Column::MeanPressureTi,
    Column::Sotair,
    Column::BreathStartTime,
    Column::InspStopTime,
    Column::ExpStartTime,
    Column::BreathEndTime,
    Column::BreathTimestamp,
    Column::StartIndex,
    Column::InspEndIndex,
    Column::ExpStartIndex,
    Column::EndIndex,
    Column::Gradient,
    Column::TimeGap,
    Column::PhaseDetected,
];
impl Column {
    pub fn display_name(self) -> &'static str {
        match self {
            Column::BreathNumber => "Breath Number",
            Column::PeakPressure => "Peak Pressure",
            Column::PeakFlow => "Peak Flow",
            Column::InspiratoryVolume => "Inhaled Tidal Volume",
            Column::ExpiratoryVolume => "Exhaled Tidal Volume",
            Column::InspiratoryTime => "Inspiratory Time",
            Column::InspiratoryFlowTime => "Inspiratory Flow Time",
            Column::MeanPressureTi => "Mean Pressure During Inspiration",
            Column::Sotair => "SOTAIR Activation",
            Column::BreathStartTime => "Breath Start Time",
            Column::InspStopTime => "Inspiratory Stop Time",
            Column::ExpStartTime => "Expiratory Start Time",
            Column::BreathEndTime => "Breath End Time",
            Column::BreathTimestamp => "Breath Timestamp",
            Column::StartIndex => "Start Index",
            Column::InspEndIndex => "Inspiratory End Index",
            Column::ExpStartIndex => "Expiratory Start Index",
            Column::EndIndex => "End Index",
            Column::Gradient => "Flow Gradient",
            Column::TimeGap => "Time Gap",
            Column::PhaseDetected => "Phase Detected",
        }
    }
    pub fn unit(self) -> &'static str {
        match self {
            Column::BreathNumber => "count",
            Column::PeakPressure | Column::MeanPressureTi => "cmH2O",
            Column::PeakFlow => "L/min",
            Column::InspiratoryVolume | Column::ExpiratoryVolume => "mL",
            Column::InspiratoryTime
            | Column::InspiratoryFlowTime
            | Column::BreathStartTime
            | Column::InspStopTime
            | Column::ExpStartTime
            | Column::BreathEndTime
            | Column::TimeGap => "s",
            Column::Sotair | Column::PhaseDetected => "0/1",
            Column::BreathTimestamp => "datetime",
            Column::StartIndex
            | Column::InspEndIndex
            | Column::ExpStartIndex
            | Column::EndIndex => "sample",
            Column::Gradient => "L/min/s",
        }
    }
    pub fn from_display_name(name: &str) -> Option<Self> {
        DEVELOPER_COLUMNS
            .iter()
            .copied()
            .find(|c| c.display_name() == name.trim())
    }
    fn format(self, m: &BreathMetric) -> String {
        match self {
            Column::BreathNumber => m.breath_number.to_string(),
            Column::PeakPressure => m.peak_pressure.to_string(),
            Column::PeakFlow => m.peak_flow.to_string(),
            Column::InspiratoryVolume => m.inspiratory_volume.to_string(),
            Column::ExpiratoryVolume => m.expiratory_volume.to_string(),
            Column::InspiratoryTime => m.inspiratory_time.to_string(),
            Column::InspiratoryFlowTime => m.inspiratory_flow_time.to_string(),
            Column::MeanPressureTi => m.mean_pressure_ti.to_string(),
            Column::Sotair => flag(m.sotair),
            Column::BreathStartTime => m.breath_start_time.to_string(),
            Column::InspStopTime => m.insp_end_time.to_string(),
            Column::ExpStartTime => m.exp_start_time.to_string(),
            Column::BreathEndTime => m.breath_end_time.to_string(),
            Column::BreathTimestamp => m
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .unwrap_or_default(),
            Column::StartIndex => m.start_index.to_string(),
            Column::InspEndIndex => m.insp_end_index.to_string(),
            Column::ExpStartIndex => m.exp_start_index.to_string(),
            Column::EndIndex => m.end_index.to_string(),
            Column::Gradient => m.gradient.to_string(),
            Column::TimeGap => m.time_gap.to_string(),
            Column::PhaseDetected => flag(m.phase_detected),
        }
    }
    fn parse_into(self, cell: &str, m: &mut BreathMetric) -> Result<(), String> {
        let cell = cell.trim();
        let real = || cell.parse::<f64>().map_err(|e| format!("{}: {e}", self.display_name()));
        let index = || cell.parse::<usize>().map_err(|e| format!("{}: {e}", self.display_name()));
        let boolean = || match cell {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(format!("{}: expected 0 or 1, got `{other}`", self.display_name())),
        };
        match self {
            Column::BreathNumber => m.breath_number = index()?,
            Column::PeakPressure => m.peak_pressure = real()?,
            Column::PeakFlow => m.peak_flow = real()?,
            Column::InspiratoryVolume => m.inspiratory_volume = real()?,
            Column::ExpiratoryVolume => m.expiratory_volume = real()?,
            Column::InspiratoryTime => m.inspiratory_time = real()?,
            Column::InspiratoryFlowTime => m.inspiratory_flow_time = real()?,
            Column::MeanPressureTi => m.mean_pressure_ti = real()?,
            Column::Sotair => m.sotair = boolean()?,
            Column::BreathStartTime => m.breath_start_time = real()?,
            Column::InspStopTime => m.insp_end_time = real()?,
            Column::ExpStartTime => m.exp_start_time = real()?,
            Column::BreathEndTime => m.breath_end_time = real()?,
            Column::BreathTimestamp => {
                m.timestamp = if cell.is_empty() {
                    None
                } else {
                    let ts = DateTime::parse_from_rfc3339(cell)
                        .map_err(|e| format!("{}: {e}", self.display_name()))?;
                    Some(ts.with_timezone(&Utc))
                }
            }
            Column::StartIndex => m.start_index = index()?,
            Column::InspEndIndex => m.insp_end_index = index()?,
            Column::ExpStartIndex => m.exp_start_index = index()?,
            Column::EndIndex => m.end_index = index()?,
            Column::Gradient => m.gradient = real()?,
            Column::TimeGap => m.time_gap = real()?,
            Column::PhaseDetected => m.phase_detected = boolean()?,
        }
        Ok(())
    }
}
fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_owned()
}
/// Write `metrics` with the given column layout. An empty table is an error.
pub fn write_breath_table<W: Write>(
    writer: W,
    metrics: &[BreathMetric],
    columns: &[Column],
) -> Result<(), WaveformIoError> {
    if metrics.is_empty() {
        return Err(WaveformIoError::EmptyTable);
    }
    let mut writer = Writer::from_writer(writer);
    writer.write_record(columns.iter().map(|c| c.display_name()))?;
    writer.write_record(columns.iter().map(|c| c.unit()))?;
    for metric in metrics {
        writer.write_record(columns.iter().map(|c| c.format(metric)))?;
    }
    writer.flush()?;
    Ok(())
}
pub fn export_standard(
    dir: &Path,
    stem: &str,
    metrics: &[BreathMetric],
) -> Result<PathBuf, WaveformIoError> {
    export(dir, &format!("{STANDARD_PREFIX}{stem}.csv"), metrics, STANDARD_COLUMNS)
}
pub fn export_developer(
    dir: &Path,
    stem: &str,
    metrics: &[BreathMetric],
) -> Result<PathBuf, WaveformIoError> {
    export(dir, &format!("{DEVELOPER_PREFIX}{stem}.csv"), metrics, DEVELOPER_COLUMNS)
}
fn export(
    dir: &Path,
    file_name: &str,
    metrics: &[BreathMetric],
    columns: &[Column],
) -> Result<PathBuf, WaveformIoError> {
    if metrics.is_empty() {
        return Err(WaveformIoError::EmptyTable);
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    write_breath_table(File::create(&path)?, metrics, columns)?;
    info!("wrote {} breaths to {}", metrics.len(), path.display());
    Ok(path)
}
/// Parse a developer export back into metrics. Unknown columns are ignored,
/// fields without a column keep their defaults.
pub fn read_developer_csv<R: Read>(reader: R) -> Result<Vec<BreathMetric>, WaveformIoError> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_reader(reader);
    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Vec::new());
    };
    let layout: HashMap<usize, Column> = header
        .iter()
        .enumerate()
        .filter_map(|(i, name)| Column::from_display_name(name).map(|c| (i, c)))
        .collect();
    // Units row.
    records.next().transpose()?;
    let mut metrics = Vec::new();
    for (offset, record) in records.enumerate() {
        let record = record?;
        let mut metric = BreathMetric::default();
        for (i, cell) in record.iter().enumerate() {
            if let Some(column) = layout.get(&i) {
                column
                    .parse_into(cell, &mut metric)
                    .map_err(|message| WaveformIoError::Parse {
                        line: offset + 3,
                        message,
                    })?;
            }
        }
        metrics.push(metric);
    }
    Ok(metrics)
}

//! Reader for Sensirion flow-meter CSV exports.
//!
//! A file is a free-form `key,value` header block, an optional device breath
//! table introduced by `Breath Count,Time (s)`, and the sample section
//! introduced by `Time,Timestamp,Flow,Pressure` followed by a units line.
use std::fs;
use std::path::Path;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use crate::detection::RawTable;
use crate::io::WaveformIoError;
const BREATH_TABLE_MARKER: [&str; 2] = ["Breath Count", "Time (s)"];
const SAMPLE_MARKER: [&str; 4] = ["Time", "Timestamp", "Flow", "Pressure"];
const DEVICE_NAME: &str = "Device Name";
const TSI: &str = "TSI";
const BREATH_TIME: &str = "Time (s)";
/// The device's own breath list, as recorded in the file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceBreathTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
impl DeviceBreathTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Breath start times in seconds; unparseable cells are skipped.
    pub fn breath_times(&self) -> Vec<f64> {
        let Some(col) = self.columns.iter().position(|c| c == BREATH_TIME) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(col)?.parse::<f64>().ok())
            .filter(|t| t.is_finite())
            .collect()
    }
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensirionFile {
    /// `(key, value)` pairs from the header block. Extra fields are joined with commas.
    pub header: Vec<(String, String)>,
    pub breath_table: DeviceBreathTable,
    /// Sample section; rows 0 and 1 echo the column names and units.
    pub raw: RawTable,
}
impl SensirionFile {
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
    pub fn device_name(&self) -> Option<&str> {
        self.header_value(DEVICE_NAME)
    }
    pub fn is_tsi_device(&self) -> bool {
        self.device_name().is_some_and(|name| name.contains(TSI))
    }
}
pub fn read_sensirion_file(path: &Path) -> Result<SensirionFile, WaveformIoError> {
    let content = fs::read_to_string(path).map_err(|source| WaveformIoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_sensirion(&content)?;
    if file.is_tsi_device() {
        warn!("{} was written by a TSI device; its layout may not match", path.display());
    }
    Ok(file)
}
pub fn parse_sensirion(content: &str) -> Result<SensirionFile, WaveformIoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut file = SensirionFile::default();
    let mut section = Section::Header;
    for record in reader.records() {
        let record = record?;
        let fields = fields(&record);
        if starts_with(&fields, &SAMPLE_MARKER) {
            file.raw.columns = fields.clone();
            file.raw.rows.push(fields);
            section = Section::Samples;
            continue;
        }
        match section {
            Section::Header if starts_with(&fields, &BREATH_TABLE_MARKER) => {
                file.breath_table.columns = fields;
                section = Section::BreathTable;
            }
            Section::Header => {
                let mut cells = fields.into_iter();
                let key = cells.next().unwrap_or_default();
                let value = cells.collect::<Vec<_>>().join(",");
                file.header.push((key, value));
            }
            Section::BreathTable => file.breath_table.rows.push(fields),
            Section::Samples => file.raw.rows.push(fields),
        }
    }
    debug!(
        "sensirion file: {} header lines, {} device breaths, {} sample rows",
        file.header.len(),
        file.breath_table.rows.len(),
        file.raw.rows.len()
    );
    Ok(file)
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Header,
    BreathTable,
    Samples,
}
fn fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(|f| f.trim().to_owned()).collect()
}
fn starts_with(fields: &[String], marker: &[&str]) -> bool {
    fields.len() >= marker.len() && fields.iter().zip(marker).all(|(f, m)| f == m)
}

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayView1};
use crate::config::IngestConfig;
use crate::detection::BreathError;
pub const TIME: &str = "Time";
pub const TIMESTAMP: &str = "Timestamp";
pub const FLOW: &str = "Flow";
pub const PRESSURE: &str = "Pressure";
pub const NOTE: &str = "Note";
/// Rectangular table of cells as handed over by the file reader. The leading
/// rows still echo the column names and units.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == name)
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|c| c.trim())
            .unwrap_or("")
    }
}
/// Fully materialised waveform. Built once, never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformTable {
    row_ids: Vec<usize>,
    time: Array1<f64>,
    flow: Array1<f64>,
    pressure: Array1<f64>,
    timestamps: Vec<Option<DateTime<Utc>>>,
    notes: Option<Vec<String>>,
}
impl WaveformTable {
    /// Skip the synthetic header rows, coerce the numeric columns and validate Time.
    pub fn ingest(raw: &RawTable, config: &IngestConfig) -> Result<Self, BreathError> {
        let column = |name: &str| {
            raw.column_index(name)
                .ok_or_else(|| BreathError::MissingColumn(name.to_owned()))
        };
        let time_col = column(TIME)?;
        let flow_col = column(FLOW)?;
        let pressure_col = column(PRESSURE)?;
        let timestamp_col = column(TIMESTAMP)?;
        let note_col = raw.column_index(NOTE);
        let row_ids: Vec<usize> = (config.header_rows..raw.rows.len()).collect();
        let numeric = |col: usize| -> Array1<f64> {
            row_ids
                .iter()
                .map(|&row| coerce_number(raw.cell(row, col)))
                .collect()
        };
        let timestamps = row_ids
            .iter()
            .map(|&row| parse_timestamp(raw.cell(row, timestamp_col)))
            .collect();
        let notes = note_col.map(|col| {
            row_ids
                .iter()
                .map(|&row| raw.cell(row, col).to_owned())
                .collect()
        });
        let table = Self {
            time: numeric(time_col),
            flow: numeric(flow_col),
            pressure: numeric(pressure_col),
            row_ids,
            timestamps,
            notes,
        };
        table.validate_time()?;
        Ok(table)
    }
    /// Build a table straight from sample columns (row ids start at zero, no timestamps).
    pub fn from_columns(
        time: Vec<f64>,
        flow: Vec<f64>,
        pressure: Vec<f64>,
    ) -> Result<Self, BreathError> {
        let len = time.len();
        for (name, actual) in [(FLOW, flow.len()), (PRESSURE, pressure.len())] {
            if actual != len {
                return Err(BreathError::ColumnLength {
                    column: name.to_owned(),
                    expected: len,
                    actual,
                });
            }
        }
        let table = Self {
            row_ids: (0..len).collect(),
            time: Array1::from(time),
            flow: Array1::from(flow),
            pressure: Array1::from(pressure),
            timestamps: vec![None; len],
            notes: None,
        };
        table.validate_time()?;
        Ok(table)
    }
    fn validate_time(&self) -> Result<(), BreathError> {
        let mut previous = f64::NEG_INFINITY;
        for (sample, &t) in self.time.iter().enumerate() {
            if !t.is_finite() || t <= previous {
                return Err(BreathError::NonMonotonicTime { sample });
            }
            previous = t;
        }
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.time.len()
    }
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }
    pub fn flow(&self) -> ArrayView1<'_, f64> {
        self.flow.view()
    }
    pub fn pressure(&self) -> ArrayView1<'_, f64> {
        self.pressure.view()
    }
    pub fn timestamp(&self, sample: usize) -> Option<DateTime<Utc>> {
        self.timestamps.get(sample).copied().flatten()
    }
    pub fn note(&self, sample: usize) -> Option<&str> {
        self.notes
            .as_ref()
            .and_then(|n| n.get(sample))
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }
    /// Position of `sample` in the raw table it was ingested from.
    pub fn row_id(&self, sample: usize) -> Option<usize> {
        self.row_ids.get(sample).copied()
    }
    /// Index of the sample whose time is closest to `t` (earlier sample on ties).
    pub fn nearest_sample(&self, t: f64) -> Option<usize> {
        if self.is_empty() || t.is_nan() {
            return None;
        }
        let times = self.time.as_slice()?;
        let upper = times.partition_point(|&x| x < t);
        if upper == 0 {
            return Some(0);
        }
        if upper == times.len() {
            return Some(times.len() - 1);
        }
        let lower = upper - 1;
        if (t - times[lower]).abs() <= (times[upper] - t).abs() {
            Some(lower)
        } else {
            Some(upper)
        }
    }
}
fn coerce_number(cell: &str) -> f64 {
    cell.parse::<f64>().unwrap_or(f64::NAN)
}
fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(cell)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
#[cfg(test)]
mod tests {
    use super::*;
    fn raw_table(rows: &[&[&str]]) -> RawTable {
        let columns = ["Time", "Timestamp", "Flow", "Pressure", "Note"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let mut all = vec![
            columns.clone(),
            vec!["s".into(), "".into(), "SL/min".into(), "cmH2O".into(), "".into()],
        ];
        all.extend(rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()));
        RawTable::new(columns, all)
    }
    #[test]
    fn ingest_skips_header_rows_and_coerces() {
        let raw = raw_table(&[
            &["0.00", "2024-03-01T10:00:00.000Z", "1.5", "2.0", ""],
            &["0.01", "2024-03-01T10:00:00.010Z", "n/a", "2.1", "valve"],
            &["0.02", "garbage", "3.0", "", ""],
        ]);
        let table = WaveformTable::ingest(&raw, &IngestConfig::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.row_id(0), Some(2));
        assert_eq!(table.flow()[0], 1.5);
        assert!(table.flow()[1].is_nan());
        assert!(table.pressure()[2].is_nan());
        assert!(table.timestamp(0).is_some());
        assert!(table.timestamp(2).is_none());
        assert_eq!(table.note(1), Some("valve"));
        assert_eq!(table.note(0), None);
    }
    #[test]
    fn missing_column_is_reported_by_name() {
        let raw = RawTable::new(
            vec!["Time".into(), "Timestamp".into(), "Pressure".into()],
            vec![],
        );
        let err = WaveformTable::ingest(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(err, BreathError::MissingColumn("Flow".into()));
        assert!(err.is_fatal());
    }
    #[test]
    fn non_monotonic_time_is_rejected() {
        let raw = raw_table(&[
            &["0.00", "", "1", "1", ""],
            &["0.00", "", "1", "1", ""],
        ]);
        let err = WaveformTable::ingest(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(err, BreathError::NonMonotonicTime { sample: 1 });
        let raw = raw_table(&[&["x", "", "1", "1", ""]]);
        assert!(WaveformTable::ingest(&raw, &IngestConfig::default()).is_err());
    }
    #[test]
    fn nearest_sample_prefers_earlier_on_ties() {
        let table =
            WaveformTable::from_columns(vec![0.0, 1.0, 2.0], vec![0.0; 3], vec![0.0; 3]).unwrap();
        assert_eq!(table.nearest_sample(-4.0), Some(0));
        assert_eq!(table.nearest_sample(0.5), Some(0));
        assert_eq!(table.nearest_sample(0.6), Some(1));
        assert_eq!(table.nearest_sample(9.0), Some(2));
        assert_eq!(table.nearest_sample(f64::NAN), None);
    }
}

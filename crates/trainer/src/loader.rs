//! Loader/Cleaner
//!
//! Reads the raw click log, drops unlabeled rows and the columns that carry
//! no usable signal, derives calendar fields from `DateTime` and fills the
//! remaining gaps with each column's mode.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::report::{NullCount, Reporter};
use crate::table::{Column, FeatureTable, Value};

pub const LABEL_COLUMN: &str = "is_click";
pub const TIMESTAMP_COLUMN: &str = "DateTime";
pub const HOUR_COLUMN: &str = "hour";
pub const WEEKDAY_COLUMN: &str = "weekday";

/// Too sparse to impute meaningfully
pub const SPARSE_COLUMNS: [&str; 2] = ["product_category_2", "city_development_index"];

/// Row identifiers, no predictive value
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["session_id", "user_id"];

/// Cell contents read as missing, besides the empty string
const NULL_TOKENS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// `%.f` also accepts an absent fractional part
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Offset forms, `+05:30` and `+0530`
const OFFSET_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Cleaned feature table with its aligned label vector
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedData {
    pub features: FeatureTable,
    pub labels: Vec<u8>,
}

impl LoadedData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Load and clean the delimited file at `path`
pub fn load_and_preprocess(
    path: &Path,
    delimiter: u8,
    reporter: &mut dyn Reporter,
) -> Result<LoadedData> {
    info!("Loading dataset from: {}", path.display());
    let file = File::open(path).map_err(|e| {
        PipelineError::Parse(format!("failed to open {}: {}", path.display(), e))
    })?;
    load_from_reader(file, delimiter, reporter)
}

/// Load and clean delimited data from any reader
pub fn load_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    reporter: &mut dyn Reporter,
) -> Result<LoadedData> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let duplicates = FeatureTable::duplicate_names(headers.iter());
    if !duplicates.is_empty() {
        return Err(PipelineError::Parse(format!(
            "duplicate header columns: {}",
            duplicates.join(", ")
        )));
    }

    let label_idx = find_column(&headers, LABEL_COLUMN)?;
    let timestamp_idx = find_column(&headers, TIMESTAMP_COLUMN)?;

    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            *idx != label_idx
                && *idx != timestamp_idx
                && !SPARSE_COLUMNS.contains(name)
                && !IDENTIFIER_COLUMNS.contains(name)
        })
        .map(|(idx, name)| (idx, name.to_string()))
        .collect();
    let dropped: Vec<&str> = headers
        .iter()
        .filter(|name| SPARSE_COLUMNS.contains(name) || IDENTIFIER_COLUMNS.contains(name))
        .collect();
    debug!("Dropping columns: {:?}", dropped);

    let mut raw: Vec<Vec<Option<Value>>> = vec![Vec::new(); kept.len()];
    let mut hours: Vec<Option<Value>> = Vec::new();
    let mut weekdays: Vec<Option<Value>> = Vec::new();
    let mut labels = Vec::new();
    let mut unlabeled = 0usize;

    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let Some(label) = parse_label(&record[label_idx], line)? else {
            unlabeled += 1;
            continue;
        };
        labels.push(label);

        let cell = &record[timestamp_idx];
        if is_missing(cell) {
            hours.push(None);
            weekdays.push(None);
        } else {
            let ts = parse_timestamp(cell).ok_or_else(|| {
                PipelineError::Parse(format!("line {}: malformed timestamp `{}`", line, cell))
            })?;
            hours.push(Some(Value::Int(i64::from(ts.hour()))));
            weekdays.push(Some(Value::Int(i64::from(
                ts.weekday().num_days_from_monday(),
            ))));
        }

        for (column, (idx, _)) in raw.iter_mut().zip(&kept) {
            let cell = &record[*idx];
            column.push((!is_missing(cell)).then(|| Value::from(cell)));
        }
    }

    info!(
        "Read {} labeled rows, dropped {} without a label",
        labels.len(),
        unlabeled
    );
    if labels.is_empty() {
        warn!("No labeled rows remain after cleaning");
    }

    let named = kept
        .into_iter()
        .map(|(_, name)| name)
        .zip(raw)
        .chain([
            (HOUR_COLUMN.to_string(), hours),
            (WEEKDAY_COLUMN.to_string(), weekdays),
        ]);

    let mut columns = Vec::new();
    let mut counts = Vec::new();
    for (name, values) in named {
        let (column, imputed) = impute_column(name, values)?;
        counts.push(NullCount {
            column: column.name.clone(),
            imputed,
        });
        columns.push(column);
    }

    let features = FeatureTable::new(columns)?;
    reporter.null_counts(&counts);

    Ok(LoadedData { features, labels })
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

/// Empty cells and the usual null spellings
pub fn is_missing(cell: &str) -> bool {
    cell.is_empty() || NULL_TOKENS.contains(&cell)
}

/// `None` for a missing label, `0`/`1` otherwise
fn parse_label(cell: &str, line: u64) -> Result<Option<u8>> {
    if is_missing(cell) {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(Some(0)),
        Ok(v) if v == 1.0 => Ok(Some(1)),
        _ => Err(PipelineError::Parse(format!(
            "line {}: label `{}` is not 0 or 1",
            line, cell
        ))),
    }
}

/// Parse a timestamp; a bare date reads as midnight
///
/// An explicit UTC offset is accepted and the wall-clock time at that offset
/// is kept.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            OFFSET_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(cell, fmt).ok())
                .map(|ts| ts.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(cell, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Most frequent value; ties go to the smallest textual form
pub fn mode(values: &[Option<Value>]) -> Option<Value> {
    let mut counts: BTreeMap<String, (usize, &Value)> = BTreeMap::new();
    for value in values.iter().flatten() {
        counts
            .entry(value.to_text())
            .or_insert((0, value))
            .0 += 1;
    }

    let mut best: Option<(usize, &Value)> = None;
    for (count, value) in counts.into_values() {
        if best.map_or(true, |(c, _)| count > c) {
            best = Some((count, value));
        }
    }
    best.map(|(_, v)| v.clone())
}

/// Fill gaps with the column mode; returns the column and the fill count
fn impute_column(name: String, values: Vec<Option<Value>>) -> Result<(Column, usize)> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing == 0 {
        let values = values.into_iter().flatten().collect();
        return Ok((Column::new(name, values), 0));
    }

    let fill = mode(&values).ok_or_else(|| PipelineError::EmptyColumn(name.clone()))?;
    debug!("Imputing {} missing `{}` values with `{}`", missing, name, fill);
    let values = values
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill.clone()))
        .collect();
    Ok((Column::new(name, values), missing))
}

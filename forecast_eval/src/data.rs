//! Time series data handling for the backtest pipeline

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Date formats accepted in the date column, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Datetime formats whose time part is discarded
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Location of a dataset file: `<root>/<dataset>/<filename>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    /// Directory holding one sub-directory per dataset
    pub root: PathBuf,
    /// Dataset identifier
    pub dataset: String,
    /// File inside the dataset directory
    pub filename: String,
}

impl DatasetSource {
    pub fn new(root: impl Into<PathBuf>, dataset: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dataset: dataset.into(),
            filename: filename.into(),
        }
    }

    /// Full path of the data file
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.dataset).join(&self.filename)
    }
}

/// A loaded column before gap filling. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl RawSeries {
    /// Build from unordered observations.
    ///
    /// Rows are sorted by date; for duplicate dates the last row wins.
    pub fn from_observations(
        name: impl Into<String>,
        observations: Vec<(NaiveDate, Option<f64>)>,
    ) -> Self {
        let mut observations = observations;
        observations.sort_by_key(|(date, _)| *date);

        let mut dates: Vec<NaiveDate> = Vec::with_capacity(observations.len());
        let mut values: Vec<Option<f64>> = Vec::with_capacity(observations.len());
        for (date, value) in observations {
            let value = value.filter(|v| v.is_finite());
            if dates.last() == Some(&date) {
                if let Some(last) = values.last_mut() {
                    *last = value;
                }
            } else {
                dates.push(date);
                values.push(value);
            }
        }

        Self {
            name: name.into(),
            dates,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of missing cells
    pub fn missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Iterate over `(date, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// Dense, strictly ascending time series with finite values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new series, validating order and values
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ForecastError::InvalidParameter(format!(
                "Dates must be strictly ascending ({} then {})",
                pair[0], pair[1]
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Value at {} is not finite",
                dates[pos]
            )));
        }

        Ok(Self {
            name: name.into(),
            dates,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same data under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Iterate over `(date, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Get a slice of the data from start to end index
    pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
        let end = end.unwrap_or(self.len());
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Slice {}..{} out of bounds for series of length {}",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            name: self.name.clone(),
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// The last `n` points (the whole series when shorter)
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            name: self.name.clone(),
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Append `other`, which must start after this series ends
    pub fn concat(&self, other: &TimeSeries) -> Result<Self> {
        let mut dates = self.dates.clone();
        dates.extend_from_slice(&other.dates);
        let mut values = self.values.clone();
        values.extend_from_slice(&other.values);
        Self::new(self.name.clone(), dates, values)
    }

    /// View as a raw series with every cell present
    pub fn to_raw(&self) -> RawSeries {
        RawSeries {
            name: self.name.clone(),
            dates: self.dates.clone(),
            values: self.values.iter().copied().map(Some).collect(),
        }
    }

    /// Check that two series share the same timestamps
    pub fn is_aligned_with(&self, other: &TimeSeries) -> bool {
        self.dates == other.dates
    }
}

/// Data loader for daily price files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load one column of a dataset
    pub fn load(source: &DatasetSource, column: &str) -> Result<RawSeries> {
        let mut series = Self::load_columns(source, &[column])?;
        series.pop().ok_or_else(|| {
            ForecastError::DataUnavailable(format!("Column '{}' not loaded", column))
        })
    }

    /// Load several co-indexed columns of a dataset
    pub fn load_columns(source: &DatasetSource, columns: &[&str]) -> Result<Vec<RawSeries>> {
        let path = source.path();
        debug!(path = %path.display(), ?columns, "loading dataset");
        Self::from_csv(&path, columns)
    }

    /// Load columns from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &[&str]) -> Result<Vec<RawSeries>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::DataUnavailable(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()
            .map_err(|e| {
                ForecastError::DataUnavailable(format!("Cannot parse {}: {}", path.display(), e))
            })?;

        Self::from_dataframe(&df, columns)
    }

    /// Extract columns from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame, columns: &[&str]) -> Result<Vec<RawSeries>> {
        let time_column = Self::detect_time_column(df)?;
        let dates = Self::parse_dates(df, &time_column)?;

        columns
            .iter()
            .map(|&column| {
                let name = Self::find_column(df, column)?;
                let values = Self::column_values(df, &name)?;
                let observations: Vec<(NaiveDate, Option<f64>)> = dates
                    .iter()
                    .zip(values)
                    .filter_map(|(date, value)| date.map(|d| (d, value)))
                    .collect();
                Ok(RawSeries::from_observations(name, observations))
            })
            .collect()
    }

    /// Detect the time column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        let column_names = df.get_column_names();

        for name in &column_names {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(name.to_string());
            }
        }

        if let Some(first_col) = df.get_columns().first() {
            if first_col.dtype().is_temporal() {
                return Ok(first_col.name().to_string());
            }
        }

        Err(ForecastError::DataUnavailable(
            "No date column found in data".to_string(),
        ))
    }

    /// Case-insensitive column lookup
    fn find_column(df: &DataFrame, wanted: &str) -> Result<String> {
        df.get_column_names()
            .into_iter()
            .find(|name| name.trim().eq_ignore_ascii_case(wanted.trim()))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ForecastError::DataUnavailable(format!("Column '{}' not found in data", wanted))
            })
    }

    /// Parse the date column; unparseable rows become `None`
    fn parse_dates(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDate>>> {
        let col = df.column(column)?.cast(&DataType::Utf8)?;
        let dates: Vec<Option<NaiveDate>> = col
            .utf8()?
            .into_iter()
            .map(|cell| cell.and_then(parse_date))
            .collect();

        let skipped = dates.iter().filter(|d| d.is_none()).count();
        if skipped == dates.len() {
            return Err(ForecastError::DataUnavailable(format!(
                "No parseable dates in column '{}'",
                column
            )));
        }
        if skipped > 0 {
            warn!(column, skipped, "skipping rows with unparseable dates");
        }

        Ok(dates)
    }

    /// Column as optional f64 values; empty or non-numeric cells are missing
    fn column_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
        let col = df.column(column)?;
        match col.dtype() {
            DataType::Utf8 => Ok(col
                .utf8()?
                .into_iter()
                .map(|cell| cell.and_then(parse_number))
                .collect()),
            dtype if dtype.is_numeric() => {
                let cast = col.cast(&DataType::Float64)?;
                let values = cast.f64()?.into_iter().collect();
                Ok(values)
            }
            other => Err(ForecastError::DataUnavailable(format!(
                "Column '{}' has non-numeric type {}",
                column, other
            ))),
        }
    }
}

/// Parse a calendar date in one of the accepted formats
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a numeric cell, tolerating currency symbols and thousands separators
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2023-01-05"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("01/05/2023"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("2023-01-05 16:00:00"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("$4,123.50"), Some(4123.5));
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_raw_series_sorts_and_dedups() {
        let raw = RawSeries::from_observations(
            "Close",
            vec![
                (date(2023, 1, 4), Some(3.0)),
                (date(2023, 1, 2), Some(1.0)),
                (date(2023, 1, 4), Some(4.0)),
                (date(2023, 1, 3), None),
            ],
        );
        assert_eq!(raw.dates(), &[date(2023, 1, 2), date(2023, 1, 3), date(2023, 1, 4)]);
        assert_eq!(raw.values(), &[Some(1.0), None, Some(4.0)]);
        assert_eq!(raw.missing(), 1);
    }

    #[test]
    fn test_time_series_validation() {
        let dates = vec![date(2023, 1, 3), date(2023, 1, 2)];
        assert!(TimeSeries::new("x", dates, vec![1.0, 2.0]).is_err());
        assert!(TimeSeries::new("x", vec![date(2023, 1, 2)], vec![f64::NAN]).is_err());
        assert!(TimeSeries::new("x", vec![date(2023, 1, 2)], vec![]).is_err());
    }

    #[test]
    fn test_from_dataframe_missing_column() {
        let df = df!(
            "Date" => &["2023-01-02", "2023-01-03"],
            "Close" => &[100.0, 101.0]
        )
        .unwrap();

        let result = DataLoader::from_dataframe(&df, &["Volume"]);
        assert!(matches!(result, Err(ForecastError::DataUnavailable(_))));

        let series = DataLoader::from_dataframe(&df, &["close"]).unwrap();
        assert_eq!(series[0].len(), 2);
        assert_eq!(series[0].name(), "Close");
    }
}

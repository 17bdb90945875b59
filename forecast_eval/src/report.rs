//! CSV and JSON exports of a finished backtest

use crate::error::{ForecastError, Result};
use crate::metrics::{Metric, MetricReport};
use crate::runner::{BacktestReport, StrategyRun};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// One row of a per-strategy forecast export
#[derive(Debug, Serialize)]
struct ForecastRow {
    date: String,
    actual: f64,
    forecast: f64,
    lower: Option<f64>,
    upper: Option<f64>,
}

/// Excluded strategy entry in the JSON summary
#[derive(Debug, Serialize)]
struct ExcludedEntry {
    strategy: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    train_points: usize,
    test_points: usize,
    test_start: Option<String>,
    test_end: Option<String>,
    metrics: Vec<&'a MetricReport>,
    ranking_by_mase: Vec<String>,
    excluded: Vec<ExcludedEntry>,
}

/// Writes forecasts and metric summaries into a directory
#[derive(Debug, Clone)]
pub struct ForecastExporter {
    dir: PathBuf,
}

impl ForecastExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one forecast CSV per successful strategy and `summary.json`.
    ///
    /// Returns the paths written.
    pub fn export(&self, report: &BacktestReport) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;

        let mut written = Vec::new();
        for run in report.successful() {
            written.push(self.write_forecast(report, run)?);
        }
        written.push(self.write_summary(report)?);

        info!(dir = %self.dir.display(), files = written.len(), "exported backtest results");
        Ok(written)
    }

    /// `date,actual,forecast,lower,upper` for one strategy
    pub fn write_forecast(&self, report: &BacktestReport, run: &StrategyRun) -> Result<PathBuf> {
        let values = run.forecast.values();
        if values.len() != report.test.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} forecast has {} values for {} test points",
                run.kind,
                values.len(),
                report.test.len()
            )));
        }

        let path = self.dir.join(format!("forecast_{}.csv", file_stem(run.kind.label())));
        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        let intervals = run.forecast.intervals();

        for (i, (date, actual)) in report.test.iter().enumerate() {
            let bounds = intervals.map(|iv| iv[i]);
            writer.serialize(ForecastRow {
                date: date.format("%Y-%m-%d").to_string(),
                actual,
                forecast: values[i],
                lower: bounds.map(|b| b.0),
                upper: bounds.map(|b| b.1),
            })?;
        }
        writer.flush()?;

        Ok(path)
    }

    /// Metrics for every successful strategy plus the excluded ones
    pub fn write_summary(&self, report: &BacktestReport) -> Result<PathBuf> {
        let summary = Summary {
            train_points: report.train.len(),
            test_points: report.test.len(),
            test_start: report.test.first_date().map(|d| d.to_string()),
            test_end: report.test.last_date().map(|d| d.to_string()),
            metrics: report.successful().into_iter().map(|run| &run.metrics).collect(),
            ranking_by_mase: report
                .ranking(Metric::Mase)
                .into_iter()
                .map(|run| run.kind.label().to_string())
                .collect(),
            excluded: report
                .failed()
                .into_iter()
                .map(|(kind, error)| ExcludedEntry {
                    strategy: kind.label().to_string(),
                    error: error.to_string(),
                })
                .collect(),
        };

        let path = self.dir.join("summary.json");
        serde_json::to_writer_pretty(File::create(&path)?, &summary)?;
        Ok(path)
    }
}

/// Lowercase file-name fragment for a strategy label
pub(crate) fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("AutoARIMA"), "autoarima");
        assert_eq!(file_stem("Naive"), "naive");
    }
}

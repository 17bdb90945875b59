//! Plotting boundary
//!
//! The pipeline describes what to draw in a [`PlotRequest`] and hands it to a
//! [`PlotSink`]. Rendering lives outside this crate; the bundled
//! [`CsvPlotSink`] writes the data in long format for any charting tool.

use crate::data::TimeSeries;
use crate::error::Result;
use crate::report::file_stem;
use crate::runner::{BacktestReport, StrategyRun};
use serde::Serialize;
use std::fs::{self, File};
use std::path::PathBuf;

/// A labelled series to draw
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub label: String,
    pub series: TimeSeries,
}

/// One chart: the end of the training data, the test data and a forecast
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub train_tail: PlotSeries,
    pub test: PlotSeries,
    pub forecast: PlotSeries,
}

impl PlotRequest {
    /// Chart for one strategy, showing the last `tail` training points
    pub fn for_run(report: &BacktestReport, run: &StrategyRun, tail: usize) -> Result<Self> {
        Ok(Self {
            title: format!("{} forecast", run.kind),
            x_label: "Date".to_string(),
            y_label: report.train.name().to_string(),
            train_tail: PlotSeries {
                label: "Train".to_string(),
                series: report.train.tail(tail),
            },
            test: PlotSeries {
                label: "Test".to_string(),
                series: report.test.clone(),
            },
            forecast: PlotSeries {
                label: run.kind.label().to_string(),
                series: run.forecast.to_series()?,
            },
        })
    }

    pub fn series(&self) -> [&PlotSeries; 3] {
        [&self.train_tail, &self.test, &self.forecast]
    }
}

/// Consumes plot requests
pub trait PlotSink {
    fn plot(&mut self, request: &PlotRequest) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct PlotRow<'a> {
    date: String,
    series: &'a str,
    value: f64,
}

/// Writes each request as `date,series,value` CSV into a directory
#[derive(Debug, Clone)]
pub struct CsvPlotSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvPlotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PlotSink for CsvPlotSink {
    fn plot(&mut self, request: &PlotRequest) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("plot_{}.csv", file_stem(&request.forecast.label)));
        let mut writer = csv::Writer::from_writer(File::create(&path)?);

        for entry in request.series() {
            for (date, value) in entry.series.iter() {
                writer.serialize(PlotRow {
                    date: date.format("%Y-%m-%d").to_string(),
                    series: &entry.label,
                    value,
                })?;
            }
        }
        writer.flush()?;

        self.written.push(path);
        Ok(())
    }
}

/// Send one request per successful strategy to `sink`
pub fn plot_report(report: &BacktestReport, sink: &mut dyn PlotSink, tail: usize) -> Result<usize> {
    let mut count = 0;
    for run in report.successful() {
        sink.plot(&PlotRequest::for_run(report, run, tail)?)?;
        count += 1;
    }
    Ok(count)
}

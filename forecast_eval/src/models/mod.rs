//! Forecasting models for time series data

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;
use std::ops::RangeInclusive;

pub mod arima;
pub mod ets;
pub mod naive;
pub mod prophet;
pub mod strategy;
pub mod var;

/// Default coverage of prediction intervals
pub const DEFAULT_INTERVAL_LEVEL: f64 = 0.95;

/// The dates a forecast must cover, plus the interval coverage to report
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    dates: Vec<NaiveDate>,
    level: f64,
}

impl Horizon {
    /// Create a horizon over explicit future dates
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must contain at least one step".to_string(),
            ));
        }
        Ok(Self {
            dates,
            level: DEFAULT_INTERVAL_LEVEL,
        })
    }

    /// Horizon aligned to the timestamps of a test series
    pub fn from_test(test: &TimeSeries) -> Result<Self> {
        Self::new(test.dates().to_vec())
    }

    /// Set the coverage of prediction intervals
    pub fn with_level(mut self, level: f64) -> Result<Self> {
        if level <= 0.0 || level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Interval level must be between 0 and 1".to_string(),
            ));
        }
        self.level = level;
        Ok(self)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Step-ahead indices `1..=H`
    pub fn steps(&self) -> RangeInclusive<usize> {
        1..=self.dates.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

/// What a model is trained on: the target prefix and an optional co-indexed
/// exogenous series
#[derive(Debug, Clone)]
pub struct TrainingData {
    target: TimeSeries,
    exogenous: Option<TimeSeries>,
}

impl TrainingData {
    /// Training data with only the target series
    pub fn univariate(target: TimeSeries) -> Self {
        Self {
            target,
            exogenous: None,
        }
    }

    /// Training data with a companion series sharing the target's dates
    pub fn with_exogenous(target: TimeSeries, exogenous: TimeSeries) -> Result<Self> {
        if !target.is_aligned_with(&exogenous) {
            return Err(ForecastError::DataUnavailable(format!(
                "Exogenous series '{}' is not aligned with '{}'",
                exogenous.name(),
                target.name()
            )));
        }
        Ok(Self {
            target,
            exogenous: Some(exogenous),
        })
    }

    pub fn target(&self) -> &TimeSeries {
        &self.target
    }

    pub fn exogenous(&self) -> Option<&TimeSeries> {
        self.exogenous.as_ref()
    }
}

/// Forecast result containing predicted values
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    /// Name of the model that produced the forecast
    model: String,
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Prediction intervals (optional)
    pub(crate) intervals: Option<Vec<(f64, f64)>>,
    /// Dates the values are aligned to (optional)
    pub(crate) dates: Option<Vec<NaiveDate>>,
    /// Coverage of `intervals`
    level: f64,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(model: impl Into<String>, values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Forecast contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            model: model.into(),
            values,
            horizons,
            intervals: None,
            dates: None,
            level: DEFAULT_INTERVAL_LEVEL,
        })
    }

    /// Create a forecast aligned to a horizon's dates
    pub fn for_horizon(model: impl Into<String>, values: Vec<f64>, horizon: &Horizon) -> Result<Self> {
        let mut result = Self::new(model, values, horizon.len())?.with_dates(horizon.dates().to_vec())?;
        result.level = horizon.level();
        Ok(result)
    }

    /// Attach prediction intervals
    pub fn with_intervals(mut self, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if self.values.len() != intervals.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match intervals length ({})",
                self.values.len(),
                intervals.len()
            )));
        }
        self.intervals = Some(intervals);
        Ok(self)
    }

    /// Attach the dates the forecast covers
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if self.values.len() != dates.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match dates length ({})",
                self.values.len(),
                dates.len()
            )));
        }
        self.dates = Some(dates);
        Ok(self)
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Coverage level of the attached intervals
    pub fn interval_level(&self) -> f64 {
        self.level
    }

    /// Prediction intervals rescaled to another coverage level.
    ///
    /// Each side is stretched by the ratio of normal quantiles, so asymmetric
    /// intervals keep their shape.
    pub fn confidence_intervals(&self, confidence_level: f64) -> Result<Vec<(f64, f64)>> {
        let intervals = self.intervals.as_ref().ok_or_else(|| {
            ForecastError::InvalidParameter("Forecast has no prediction intervals".to_string())
        })?;
        let ratio = z_score(confidence_level)? / z_score(self.level)?;

        Ok(self
            .values
            .iter()
            .zip(intervals)
            .map(|(v, (lower, upper))| (v - (v - lower) * ratio, v + (upper - v) * ratio))
            .collect())
    }

    /// Get the dates, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// The forecast as a time series; requires dates
    pub fn to_series(&self) -> Result<TimeSeries> {
        let dates = self.dates.clone().ok_or_else(|| {
            ForecastError::InvalidParameter("Forecast has no dates attached".to_string())
        })?;
        TimeSeries::new(self.model.clone(), dates, self.values.clone())
    }

    /// Serialize the forecast to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate a forecast covering every step of `horizon`
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TrainingData) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Two-sided standard normal quantile for a coverage level
pub fn z_score(level: f64) -> Result<f64> {
    if level <= 0.0 || level >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "Interval level must be between 0 and 1".to_string(),
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::InvalidParameter(format!("Normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + level / 2.0))
}

/// Symmetric Gaussian intervals around `values` with per-step standard errors
pub fn gaussian_intervals(values: &[f64], std_errors: &[f64], level: f64) -> Result<Vec<(f64, f64)>> {
    if values.len() != std_errors.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Values length ({}) doesn't match standard errors length ({})",
            values.len(),
            std_errors.len()
        )));
    }
    let z = z_score(level)?;
    Ok(values
        .iter()
        .zip(std_errors)
        .map(|(v, se)| (v - z * se, v + z * se))
        .collect())
}

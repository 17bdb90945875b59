//! Error types for the forecast_eval crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the forecast_eval crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The data source cannot be read or a required column is absent
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The series is shorter than a horizon or lag window requires
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A single strategy's fitting step diverged or raised
    #[error("Model fit failure in {model}: {reason}")]
    ModelFitFailure { model: String, reason: String },

    /// A metric's denominator is zero
    #[error("Metric {metric} undefined: {reason}")]
    MetricUndefined { metric: String, reason: String },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error writing CSV exports
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error reading configuration or writing JSON reports
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from the numeric building blocks
    #[error("Math error: {0}")]
    MathError(#[from] series_math::MathError),
}

impl ForecastError {
    /// Shorthand for a [`ForecastError::ModelFitFailure`]
    pub fn fit_failure(model: impl Into<String>, reason: impl ToString) -> Self {
        ForecastError::ModelFitFailure {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`ForecastError::MetricUndefined`]
    pub fn metric_undefined(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::MetricUndefined {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

//! # Series Math
//!
//! Numeric building blocks for the forecasting models in `forecast_eval`.
//! This crate provides differencing and integration, least-squares solvers,
//! a KPSS stationarity test, descriptive statistics and Fourier features.

use thiserror::Error;

pub mod differencing;
pub mod fourier;
pub mod regression;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use differencing::{difference, integrate, undifference};
pub use regression::{ols, ridge, LeastSquaresFit};
pub use stationarity::{kpss_level, ndiffs, KpssResult};

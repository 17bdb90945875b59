//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A point-forecast accuracy metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    /// Mean Absolute Percentage Error, as a fraction
    Mape,
    /// Mean Absolute Error
    Mae,
    /// Root Mean Squared Error
    Rmse,
    /// Mean Squared Error
    Mse,
    /// Mean Absolute Scaled Error
    Mase,
}

impl Metric {
    /// Every metric, in reporting order
    pub const ALL: [Metric; 5] = [Metric::Mape, Metric::Mae, Metric::Rmse, Metric::Mse, Metric::Mase];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mape => "MAPE",
            Metric::Mae => "MAE",
            Metric::Rmse => "RMSE",
            Metric::Mse => "MSE",
            Metric::Mase => "MASE",
        }
    }

    /// Decimal places used when printing
    pub fn precision(&self) -> usize {
        match self {
            Metric::Mape | Metric::Mase => 4,
            Metric::Mae | Metric::Rmse | Metric::Mse => 2,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown metric: {}", s)))
    }
}

/// A metric outcome: a number, or the reason it cannot be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Value(f64),
    Undefined { reason: String },
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MetricValue::Value(_))
    }

    /// Keep a computed value, turn `MetricUndefined` into `Undefined` and
    /// propagate anything else
    fn from_result(result: Result<f64>) -> Result<Self> {
        match result {
            Ok(v) => Ok(MetricValue::Value(v)),
            Err(ForecastError::MetricUndefined { reason, .. }) => Ok(MetricValue::Undefined { reason }),
            Err(e) => Err(e),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, precision: usize) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{:.*}", precision, v),
            MetricValue::Undefined { reason } => write!(f, "undefined ({})", reason),
        }
    }
}

/// All five metrics for one strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub model: String,
    pub mape: MetricValue,
    pub mae: MetricValue,
    pub rmse: MetricValue,
    pub mse: MetricValue,
    pub mase: MetricValue,
}

impl MetricReport {
    /// Score a forecast against the held-out actuals.
    ///
    /// `train` is the in-sample history used to scale MASE with a lag of
    /// `mase_period`.
    pub fn evaluate(
        model: impl Into<String>,
        actual: &[f64],
        forecast: &[f64],
        train: &[f64],
        mase_period: usize,
    ) -> Result<Self> {
        check_lengths(actual, forecast)?;

        Ok(Self {
            model: model.into(),
            mape: MetricValue::from_result(mape(actual, forecast))?,
            mae: MetricValue::from_result(mae(actual, forecast))?,
            rmse: MetricValue::from_result(rmse(actual, forecast))?,
            mse: MetricValue::from_result(mse(actual, forecast))?,
            mase: MetricValue::from_result(mase(actual, forecast, train, mase_period))?,
        })
    }

    pub fn get(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::Mape => &self.mape,
            Metric::Mae => &self.mae,
            Metric::Rmse => &self.rmse,
            Metric::Mse => &self.mse,
            Metric::Mase => &self.mase,
        }
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for metric in Metric::ALL {
            write!(f, "{}: ", metric)?;
            self.get(metric).write(f, metric.precision())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn check_lengths(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.len() != forecast.len() || actual.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "Forecast ({}) and actual ({}) values must have the same non-zero length",
            forecast.len(),
            actual.len()
        )));
    }
    Ok(())
}

/// Mean of |a - p| / |a|; undefined when any actual is zero
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_lengths(actual, forecast)?;
    if actual.iter().any(|a| *a == 0.0) {
        return Err(ForecastError::metric_undefined(
            "MAPE",
            "actual series contains zero",
        ));
    }

    let total: f64 = actual
        .iter()
        .zip(forecast)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    Ok(total / actual.len() as f64)
}

/// Mean absolute error
pub fn mae(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_lengths(actual, forecast)?;
    let total: f64 = actual.iter().zip(forecast).map(|(a, p)| (a - p).abs()).sum();
    Ok(total / actual.len() as f64)
}

/// Mean squared error
pub fn mse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_lengths(actual, forecast)?;
    let total: f64 = actual.iter().zip(forecast).map(|(a, p)| (a - p).powi(2)).sum();
    Ok(total / actual.len() as f64)
}

/// Root mean squared error
pub fn rmse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    Ok(mse(actual, forecast)?.sqrt())
}

/// MAE scaled by the in-sample MAE of the lag-`period` naive forecast on `train`
pub fn mase(actual: &[f64], forecast: &[f64], train: &[f64], period: usize) -> Result<f64> {
    let model_mae = mae(actual, forecast)?;
    if period == 0 {
        return Err(ForecastError::InvalidParameter(
            "MASE period must be at least 1".to_string(),
        ));
    }
    if train.len() <= period {
        return Err(ForecastError::metric_undefined(
            "MASE",
            format!("training series needs more than {} points", period),
        ));
    }

    let naive_errors: Vec<f64> = train
        .windows(period + 1)
        .map(|w| (w[period] - w[0]).abs())
        .collect();
    let scale = naive_errors.iter().sum::<f64>() / naive_errors.len() as f64;
    if scale == 0.0 {
        return Err(ForecastError::metric_undefined(
            "MASE",
            "in-sample naive MAE is zero",
        ));
    }

    Ok(model_mae / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_basic_metrics() {
        let actual = [106.0, 104.0];
        let forecast = [105.0, 105.0];
        assert_approx_eq!(mae(&actual, &forecast).unwrap(), 1.0);
        assert_approx_eq!(mse(&actual, &forecast).unwrap(), 1.0);
        assert_approx_eq!(rmse(&actual, &forecast).unwrap(), 1.0);
        assert_approx_eq!(mape(&actual, &forecast).unwrap(), 0.0095, 1e-4);
    }

    #[test]
    fn test_mape_undefined_on_zero_actual() {
        assert!(matches!(
            mape(&[0.0, 1.0], &[1.0, 1.0]),
            Err(ForecastError::MetricUndefined { .. })
        ));
    }

    #[test]
    fn test_mase_seasonal_period() {
        // Lag-2 naive errors on train are all 2
        let train = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_approx_eq!(mase(&[10.0], &[12.0], &train, 2).unwrap(), 1.0);
        assert!(mase(&[10.0], &[12.0], &[1.0, 2.0], 2).is_err());
        assert!(mase(&[10.0], &[12.0], &[3.0, 3.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            MetricReport::evaluate("m", &[1.0], &[1.0, 2.0], &[1.0, 2.0], 1),
            Err(ForecastError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_report_display() {
        let report = MetricReport::evaluate("Naive", &[0.0, 2.0], &[1.0, 1.0], &[1.0, 1.0], 1).unwrap();
        let text = report.to_string();
        assert!(text.contains("MAPE: undefined (actual series contains zero)"));
        assert!(text.contains("MAE: 1.00"));
        assert!(text.contains("MASE: undefined (in-sample naive MAE is zero)"));
        assert_eq!(Metric::from_str("rmse").unwrap(), Metric::Rmse);
    }
}

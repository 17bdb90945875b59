//! Bivariate vector autoregression on differenced price and volume
//!
//! Both series are first-differenced and standardised before estimation. Each
//! equation is fitted by OLS on a constant plus `p` lags of both variables, and
//! the lag order minimises `ln det(Σ) + 2pK²/T` over a shared sample. Price
//! forecasts are integrated back from the last training price.

use crate::error::{ForecastError, Result};
use crate::models::{
    gaussian_intervals, ForecastModel, ForecastResult, Horizon, TrainedForecastModel,
    TrainingData,
};
use serde::{Deserialize, Serialize};
use series_math::{difference, integrate, ols, stats};
use tracing::debug;

/// Number of variables in the system
const K: usize = 2;

/// VAR settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarConfig {
    /// Largest lag order considered
    pub max_lags: usize,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self { max_lags: 5 }
    }
}

/// Vector autoregression over (price, volume)
#[derive(Debug, Clone)]
pub struct VarModel {
    name: String,
    config: VarConfig,
}

/// Mean and scale used to standardise one differenced variable
#[derive(Debug, Clone, Copy)]
struct Scaling {
    mean: f64,
    std: f64,
}

impl Scaling {
    fn from_data(data: &[f64]) -> Self {
        let std = stats::std_dev(data);
        Self {
            mean: stats::mean(data),
            std: if std.is_finite() && std > 0.0 { std } else { 1.0 },
        }
    }

    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    fn invert(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }
}

/// Estimated VAR(p) for a fixed lag order
#[derive(Debug, Clone)]
struct VarFit {
    lags: usize,
    /// One coefficient vector per equation: `[c, y1(t-1), y2(t-1), ..., y1(t-p), y2(t-p)]`
    equations: [Vec<f64>; K],
    /// Residual covariance, row-major 2x2
    sigma: [f64; 4],
    aic: f64,
}

/// Trained VAR model
#[derive(Debug, Clone)]
pub struct TrainedVar {
    name: String,
    lags: usize,
    equations: [Vec<f64>; K],
    sigma: [f64; 4],
    scaling: [Scaling; K],
    /// Most recent standardised differences, oldest first
    recent: Vec<[f64; K]>,
    last_price: f64,
}

impl VarModel {
    /// Create a new VAR model
    pub fn new(config: VarConfig) -> Result<Self> {
        if config.max_lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "VAR max_lags must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            name: "VAR".to_string(),
            config,
        })
    }
}

impl Default for VarModel {
    fn default() -> Self {
        Self {
            name: "VAR".to_string(),
            config: VarConfig::default(),
        }
    }
}

impl ForecastModel for VarModel {
    type Trained = TrainedVar;

    fn train(&self, data: &TrainingData) -> Result<TrainedVar> {
        let price = data.target().values();
        let volume = data
            .exogenous()
            .ok_or_else(|| ForecastError::fit_failure(&self.name, "volume series is unavailable"))?
            .values();
        if volume.len() != price.len() {
            return Err(ForecastError::fit_failure(
                &self.name,
                "volume series is not aligned with price",
            ));
        }
        let last_price = price
            .last()
            .copied()
            .ok_or_else(|| ForecastError::fit_failure(&self.name, "price series is empty"))?;

        let price_diff = difference(price, 1);
        let volume_diff = difference(volume, 1);
        let scaling = [
            Scaling::from_data(&price_diff),
            Scaling::from_data(&volume_diff),
        ];
        let system: Vec<[f64; K]> = price_diff
            .iter()
            .zip(&volume_diff)
            .map(|(p, v)| [scaling[0].apply(*p), scaling[1].apply(*v)])
            .collect();

        let max_lags = self.config.max_lags;
        let needed = max_lags + K * max_lags + 2;
        if system.len() < needed {
            return Err(ForecastError::fit_failure(
                &self.name,
                format!("needs at least {} differenced points, got {}", needed, system.len()),
            ));
        }

        let best = (1..=max_lags)
            .filter_map(|lags| match fit_var(&system, lags, max_lags) {
                Ok(fit) => Some(fit),
                Err(e) => {
                    debug!(lags, error = %e, "VAR lag order skipped");
                    None
                }
            })
            .filter(|fit| fit.aic.is_finite())
            .min_by(|a, b| a.aic.total_cmp(&b.aic))
            .ok_or_else(|| ForecastError::fit_failure(&self.name, "no lag order could be estimated"))?;

        debug!(lags = best.lags, aic = best.aic, "selected VAR lag order");

        Ok(TrainedVar {
            name: self.name.clone(),
            lags: best.lags,
            equations: best.equations,
            sigma: best.sigma,
            scaling,
            recent: system[system.len() - best.lags..].to_vec(),
            last_price,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedVar {
    /// Selected lag order
    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Coefficients of the price equation
    pub fn price_coefficients(&self) -> &[f64] {
        &self.equations[0]
    }

    /// Differenced forecasts on the original scale, one `[price, volume]` per step
    pub fn forecast_differences(&self, steps: usize) -> Vec<[f64; K]> {
        let mut history = self.recent.clone();
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            let row = lagged_row(&history, history.len(), self.lags);
            let mut next = [0.0; K];
            for (k, coefficients) in self.equations.iter().enumerate() {
                next[k] = row.iter().zip(coefficients).map(|(x, b)| x * b).sum();
            }
            history.push(next);
            out.push([self.scaling[0].invert(next[0]), self.scaling[1].invert(next[1])]);
        }

        out
    }
}

impl TrainedForecastModel for TrainedVar {
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult> {
        let differences: Vec<f64> = self
            .forecast_differences(horizon.len())
            .into_iter()
            .map(|step| step[0])
            .collect();
        let values = integrate(&differences, self.last_price);

        let step_sigma = self.sigma[0].max(0.0).sqrt() * self.scaling[0].std;
        let std_errors: Vec<f64> = horizon
            .steps()
            .map(|h| step_sigma * (h as f64).sqrt())
            .collect();
        let intervals = gaussian_intervals(&values, &std_errors, horizon.level())?;

        ForecastResult::for_horizon(&self.name, values, horizon)?.with_intervals(intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `[1, y(t-1), ..., y(t-lags)]` flattened, for the observation at index `t`
fn lagged_row(system: &[[f64; K]], t: usize, lags: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(1 + K * lags);
    row.push(1.0);
    for lag in 1..=lags {
        row.extend_from_slice(&system[t - lag]);
    }
    row
}

fn fit_var(system: &[[f64; K]], lags: usize, start: usize) -> Result<VarFit> {
    let rows = system.len() - start;
    let cols = 1 + K * lags;
    let design: Vec<f64> = (start..system.len())
        .flat_map(|t| lagged_row(system, t, lags))
        .collect();

    let mut equations: [Vec<f64>; K] = Default::default();
    let mut residuals: [Vec<f64>; K] = Default::default();
    for k in 0..K {
        let target: Vec<f64> = system[start..].iter().map(|row| row[k]).collect();
        let fit = ols(rows, cols, &design, &target)?;
        equations[k] = fit.coefficients;
        residuals[k] = fit.residuals;
    }

    let t = rows as f64;
    let cov = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>() / t;
    let sigma = [
        cov(&residuals[0], &residuals[0]),
        cov(&residuals[0], &residuals[1]),
        cov(&residuals[1], &residuals[0]),
        cov(&residuals[1], &residuals[1]),
    ];
    let det = sigma[0] * sigma[3] - sigma[1] * sigma[2];
    if det <= 0.0 {
        return Err(ForecastError::InsufficientData(
            "residual covariance is singular".to_string(),
        ));
    }
    let aic = det.ln() + 2.0 * (lags * K * K) as f64 / t;

    Ok(VarFit {
        lags,
        equations,
        sigma,
        aic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;
    use chrono::{Duration, NaiveDate};

    fn noise(i: usize, seed: usize) -> f64 {
        (((i + 1) * 7919 + seed * 104729) % 1009) as f64 / 1009.0 - 0.5
    }

    fn series(name: &str, values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(name, dates, values).unwrap()
    }

    fn data(n: usize) -> TrainingData {
        let mut price = vec![100.0];
        let mut volume = vec![1_000.0];
        for i in 1..n {
            price.push(price[i - 1] + 0.2 + noise(i, 1));
            volume.push(volume[i - 1] + 10.0 * noise(i, 2));
        }
        TrainingData::with_exogenous(series("Close", price), series("Volume", volume)).unwrap()
    }

    fn horizon(n: usize) -> Horizon {
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        Horizon::new((0..n).map(|i| start + Duration::days(i as i64)).collect()).unwrap()
    }

    #[test]
    fn test_forecast_continues_from_last_price() {
        let training = data(200);
        let last = training.target().last_value().unwrap();
        let trained = VarModel::default().train(&training).unwrap();
        assert!((1..=5).contains(&trained.lags()));

        let forecast = trained.forecast(&horizon(10)).unwrap();
        assert_eq!(forecast.values().len(), 10);
        assert!((forecast.values()[0] - last).abs() < 3.0);

        // Integrating the differenced forecast reproduces the levels
        let steps: Vec<f64> = trained
            .forecast_differences(10)
            .iter()
            .map(|s| s[0])
            .collect();
        let rebuilt = integrate(&steps, last);
        for (a, b) in rebuilt.iter().zip(forecast.values()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_volume_is_fit_failure() {
        let training = TrainingData::univariate(data(50).target().clone());
        assert!(matches!(
            VarModel::default().train(&training),
            Err(ForecastError::ModelFitFailure { .. })
        ));
    }

    #[test]
    fn test_short_series_is_fit_failure() {
        assert!(matches!(
            VarModel::default().train(&data(8)),
            Err(ForecastError::ModelFitFailure { .. })
        ));
        assert!(VarModel::new(VarConfig { max_lags: 0 }).is_err());
    }
}

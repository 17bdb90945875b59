//! Prophet-style additive decomposition
//!
//! `y(t) = g(t) + s(t) + e`, where `g` is a piecewise-linear trend whose slope
//! may change at automatically placed changepoints and `s` is a sum of Fourier
//! seasonalities. The whole model is one penalised least-squares problem:
//! changepoint deltas are shrunk by `1 / changepoint_prior_scale²` and seasonal
//! coefficients by `1 / seasonality_prior_scale²`.

use crate::error::{ForecastError, Result};
use crate::models::{z_score, ForecastModel, ForecastResult, Horizon, TrainedForecastModel, TrainingData};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use series_math::fourier::fourier_features;
use series_math::ridge;
use tracing::debug;

/// Smallest penalty applied to regularised columns
const MIN_PENALTY: f64 = 1e-8;

/// Prophet-style model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetConfig {
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    /// Flexibility of the trend; smaller values mean fewer effective slope changes
    pub changepoint_prior_scale: f64,
    /// Number of potential changepoints
    pub n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    pub seasonality_prior_scale: f64,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        Self {
            daily_seasonality: false,
            weekly_seasonality: true,
            yearly_seasonality: true,
            changepoint_prior_scale: 0.05,
            n_changepoints: 25,
            changepoint_range: 0.8,
            seasonality_prior_scale: 10.0,
        }
    }
}

impl ProphetConfig {
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Self {
        self.changepoint_prior_scale = scale;
        self
    }

    pub fn without_yearly_seasonality(mut self) -> Self {
        self.yearly_seasonality = false;
        self
    }

    pub fn without_weekly_seasonality(mut self) -> Self {
        self.weekly_seasonality = false;
        self
    }

    pub fn with_daily_seasonality(mut self) -> Self {
        self.daily_seasonality = true;
        self
    }

    /// Fourier blocks as `(period in days, order)`
    fn seasonalities(&self) -> Vec<(f64, usize)> {
        let mut blocks = Vec::new();
        if self.yearly_seasonality {
            blocks.push((365.25, 10));
        }
        if self.weekly_seasonality {
            blocks.push((7.0, 3));
        }
        if self.daily_seasonality {
            blocks.push((1.0, 4));
        }
        blocks
    }
}

/// Piecewise-linear trend plus Fourier seasonalities
#[derive(Debug, Clone)]
pub struct Prophet {
    name: String,
    config: ProphetConfig,
}

/// Time basis shared by fitting and forecasting
#[derive(Debug, Clone)]
struct Basis {
    origin: NaiveDate,
    /// History length in days, used to scale trend time to [0, 1]
    span: f64,
    /// Changepoint locations in scaled time
    changepoints: Vec<f64>,
    seasonalities: Vec<(f64, usize)>,
}

impl Basis {
    fn columns(&self) -> usize {
        2 + self.changepoints.len() + self.seasonalities.iter().map(|(_, o)| 2 * o).sum::<usize>()
    }

    /// Design matrix rows for a set of dates, flattened row-major
    fn design(&self, dates: &[NaiveDate]) -> Vec<f64> {
        let days: Vec<f64> = dates
            .iter()
            .map(|d| (*d - self.origin).num_days() as f64)
            .collect();
        let seasonal: Vec<Vec<Vec<f64>>> = self
            .seasonalities
            .iter()
            .map(|(period, order)| fourier_features(&days, *period, *order))
            .collect();

        let mut design = Vec::with_capacity(dates.len() * self.columns());
        for (i, day) in days.iter().enumerate() {
            let t = day / self.span;
            design.push(1.0);
            design.push(t);
            design.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));
            for block in &seasonal {
                design.extend_from_slice(&block[i]);
            }
        }
        design
    }
}

/// Trained Prophet-style model
#[derive(Debug, Clone)]
pub struct TrainedProphet {
    name: String,
    basis: Basis,
    coefficients: Vec<f64>,
    y_scale: f64,
    /// Residual standard deviation on the original scale
    sigma: f64,
}

impl Prophet {
    /// Create a new Prophet-style model
    pub fn new(config: ProphetConfig) -> Result<Self> {
        if config.changepoint_prior_scale.is_nan() || config.changepoint_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "changepoint_prior_scale must be positive".to_string(),
            ));
        }
        if config.seasonality_prior_scale.is_nan() || config.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "seasonality_prior_scale must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.changepoint_range) {
            return Err(ForecastError::InvalidParameter(
                "changepoint_range must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: "Prophet".to_string(),
            config,
        })
    }

    pub fn config(&self) -> &ProphetConfig {
        &self.config
    }

    /// Evenly spaced changepoints over the first `changepoint_range` of history
    fn changepoints(&self, scaled_t: &[f64]) -> Vec<f64> {
        let history = (scaled_t.len() as f64 * self.config.changepoint_range).floor() as usize;
        let count = self.config.n_changepoints.min(history.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last = (history - 1) as f64;
        let mut points: Vec<f64> = (1..=count)
            .map(|j| {
                let index = (last * j as f64 / count as f64).round() as usize;
                scaled_t[index]
            })
            .collect();
        points.dedup();
        points
    }
}

impl Default for Prophet {
    fn default() -> Self {
        Self {
            name: "Prophet".to_string(),
            config: ProphetConfig::default(),
        }
    }
}

impl ForecastModel for Prophet {
    type Trained = TrainedProphet;

    fn train(&self, data: &TrainingData) -> Result<TrainedProphet> {
        let target = data.target();
        let (origin, end) = match (target.first_date(), target.last_date()) {
            (Some(first), Some(last)) if target.len() >= 3 => (first, last),
            _ => {
                return Err(ForecastError::fit_failure(
                    &self.name,
                    "needs at least 3 observations",
                ))
            }
        };

        let span = ((end - origin).num_days() as f64).max(1.0);
        let scaled_t: Vec<f64> = target
            .dates()
            .iter()
            .map(|d| (*d - origin).num_days() as f64 / span)
            .collect();

        let y_scale = target
            .values()
            .iter()
            .fold(0.0_f64, |acc, y| acc.max(y.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let scaled_y: Vec<f64> = target.values().iter().map(|y| y / y_scale).collect();

        let basis = Basis {
            origin,
            span,
            changepoints: self.changepoints(&scaled_t),
            seasonalities: self.config.seasonalities(),
        };

        let cols = basis.columns();
        let delta_penalty = (1.0 / self.config.changepoint_prior_scale.powi(2)).max(MIN_PENALTY);
        let seasonal_penalty = (1.0 / self.config.seasonality_prior_scale.powi(2)).max(MIN_PENALTY);
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(delta_penalty).take(basis.changepoints.len()));
        penalties.resize(cols, seasonal_penalty);

        let design = basis.design(target.dates());
        let fit = ridge(target.len(), cols, &design, &scaled_y, &penalties)
            .map_err(|e| ForecastError::fit_failure(&self.name, e))?;

        debug!(
            changepoints = basis.changepoints.len(),
            seasonal_blocks = basis.seasonalities.len(),
            sigma2 = fit.sigma2,
            "fitted Prophet-style model"
        );

        Ok(TrainedProphet {
            name: self.name.clone(),
            basis,
            coefficients: fit.coefficients,
            y_scale,
            sigma: fit.sigma2.sqrt() * y_scale,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedProphet {
    /// Slope changes at each changepoint, in scaled units
    pub fn changepoint_deltas(&self) -> &[f64] {
        &self.coefficients[2..2 + self.basis.changepoints.len()]
    }

    /// Fitted values for arbitrary dates
    pub fn predict(&self, dates: &[NaiveDate]) -> Vec<f64> {
        let cols = self.basis.columns();
        self.basis
            .design(dates)
            .chunks(cols)
            .map(|row| {
                row.iter()
                    .zip(&self.coefficients)
                    .map(|(x, b)| x * b)
                    .sum::<f64>()
                    * self.y_scale
            })
            .collect()
    }
}

impl TrainedForecastModel for TrainedProphet {
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult> {
        let values = self.predict(horizon.dates());
        let margin = z_score(horizon.level())? * self.sigma;
        let intervals = values.iter().map(|v| (v - margin, v + margin)).collect();

        ForecastResult::for_horizon(&self.name, values, horizon)?.with_intervals(intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

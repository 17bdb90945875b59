//! Automatic ARIMA order selection and forecasting
//!
//! The differencing order comes from repeated KPSS tests; AR and MA orders are
//! chosen by AIC over a grid, each candidate estimated with the two-stage
//! Hannan-Rissanen regression. All candidates share one estimation sample so
//! their AIC values are comparable.

use crate::error::{ForecastError, Result};
use crate::models::{
    gaussian_intervals, ForecastModel, ForecastResult, Horizon, TrainedForecastModel,
    TrainingData,
};
use serde::{Deserialize, Serialize};
use series_math::{difference, ndiffs, ols, stats, undifference};
use std::fmt;
use tracing::debug;

/// Floor for residual variance so perfect fits keep a finite AIC
const MIN_SIGMA2: f64 = 1e-12;

/// Search bounds for the automatic order selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    /// Largest AR order tried
    pub max_p: usize,
    /// Largest differencing order tried
    pub max_d: usize,
    /// Largest MA order tried
    pub max_q: usize,
    /// Fit on at most this many of the most recent points
    pub window: Option<usize>,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 3,
            window: Some(500),
        }
    }
}

/// ARIMA orders (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA model with automatic order selection
#[derive(Debug, Clone)]
pub struct AutoArima {
    name: String,
    config: ArimaConfig,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArima {
    name: String,
    order: ArimaOrder,
    constant: f64,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Training window on the original scale
    history: Vec<f64>,
    /// Last `p` differenced values
    diff_tail: Vec<f64>,
    /// Last `q` in-sample residuals
    residual_tail: Vec<f64>,
    sigma2: f64,
    aic: f64,
}

/// One estimated ARMA candidate on the differenced series
#[derive(Debug, Clone)]
struct ArmaFit {
    p: usize,
    q: usize,
    constant: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    aic: f64,
}

impl AutoArima {
    /// Create a new AutoARIMA model
    pub fn new(config: ArimaConfig) -> Result<Self> {
        if config.window == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "ARIMA window must be positive".to_string(),
            ));
        }
        if config.max_p == 0 && config.max_q == 0 && config.max_d == 0 {
            return Err(ForecastError::InvalidParameter(
                "ARIMA search space is empty".to_string(),
            ));
        }

        Ok(Self {
            name: "AutoARIMA".to_string(),
            config,
        })
    }

    pub fn config(&self) -> &ArimaConfig {
        &self.config
    }
}

impl Default for AutoArima {
    fn default() -> Self {
        Self {
            name: "AutoARIMA".to_string(),
            config: ArimaConfig::default(),
        }
    }
}

impl ForecastModel for AutoArima {
    type Trained = TrainedArima;

    fn train(&self, data: &TrainingData) -> Result<TrainedArima> {
        let values = data.target().values();
        let window = self
            .config
            .window
            .map_or(values.len(), |w| w.min(values.len()));
        let history = values[values.len() - window..].to_vec();

        let d = ndiffs(&history, self.config.max_d);
        let diffed = difference(&history, d);
        // A constant after two differences would be a quadratic trend
        let include_constant = d < 2;

        let candidates = fit_candidates(&diffed, self.config.max_p, self.config.max_q, include_constant)
            .map_err(|e| ForecastError::fit_failure(&self.name, e))?;

        let best = candidates
            .into_iter()
            .filter(|fit| fit.aic.is_finite())
            .min_by(|a, b| a.aic.total_cmp(&b.aic))
            .ok_or_else(|| {
                ForecastError::fit_failure(&self.name, "no ARIMA candidate could be estimated")
            })?;

        let order = ArimaOrder { p: best.p, d, q: best.q };
        debug!(%order, aic = best.aic, sigma2 = best.sigma2, window, "selected ARIMA order");

        let diff_tail = diffed[diffed.len() - best.p..].to_vec();
        let residual_tail = best.residuals[best.residuals.len() - best.q..].to_vec();

        Ok(TrainedArima {
            name: self.name.clone(),
            order,
            constant: best.constant,
            ar_coefficients: best.ar,
            ma_coefficients: best.ma,
            history,
            diff_tail,
            residual_tail,
            sigma2: best.sigma2,
            aic: best.aic,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArima {
    /// Selected (p, d, q)
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Point forecasts in the differenced space
    fn forecast_differenced(&self, steps: usize) -> Vec<f64> {
        let mut values = self.diff_tail.clone();
        let mut shocks = self.residual_tail.clone();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let mut next = self.constant;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                next += phi * values[values.len() - 1 - i];
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                next += theta * shocks[shocks.len() - 1 - j];
            }
            values.push(next);
            // Future shocks have zero expectation
            shocks.push(0.0);
            forecasts.push(next);
        }

        forecasts
    }

    /// Forecast standard errors from the psi weights of the integrated model
    fn standard_errors(&self, steps: usize) -> Vec<f64> {
        let psi = psi_weights(&self.ar_coefficients, &self.ma_coefficients, self.order.d, steps);
        let mut cumulative = 0.0;
        psi.iter()
            .map(|w| {
                cumulative += w * w;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect()
    }
}

impl TrainedForecastModel for TrainedArima {
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult> {
        let steps = horizon.len();
        let differenced = self.forecast_differenced(steps);
        let values = undifference(&differenced, &self.history, self.order.d)?;
        let intervals = gaussian_intervals(&values, &self.standard_errors(steps), horizon.level())?;

        ForecastResult::for_horizon(&self.name, values, horizon)?.with_intervals(intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Estimate every (p, q) candidate on a shared sample
fn fit_candidates(x: &[f64], max_p: usize, max_q: usize, include_constant: bool) -> Result<Vec<ArmaFit>> {
    let n = x.len();
    let long_order = (max_p + max_q).max(10).min(n / 4);
    let start = long_order + max_p.max(max_q);
    let needed = start + max_p + max_q + 2;
    if long_order == 0 || n < needed {
        return Err(ForecastError::InsufficientData(format!(
            "ARIMA search needs at least {} differenced points, got {}",
            needed, n
        )));
    }

    // Stage one: long autoregression gives proxy innovations
    let innovations = match long_ar_innovations(x, long_order) {
        Ok(eps) => Some(eps),
        Err(e) => {
            debug!(error = %e, "long AR failed, restricting search to pure AR models");
            None
        }
    };

    let mut fits = Vec::new();
    for p in 0..=max_p {
        for q in 0..=max_q {
            if q > 0 && innovations.is_none() {
                continue;
            }
            match fit_arma(x, p, q, start, include_constant, innovations.as_deref()) {
                Ok(fit) => fits.push(fit),
                Err(e) => debug!(p, q, error = %e, "ARMA candidate skipped"),
            }
        }
    }

    Ok(fits)
}

/// Residuals of an AR(`order`) fit with constant, zero before `order`
fn long_ar_innovations(x: &[f64], order: usize) -> Result<Vec<f64>> {
    let rows = x.len() - order;
    let cols = order + 1;
    let mut design = Vec::with_capacity(rows * cols);
    for t in order..x.len() {
        design.push(1.0);
        for i in 1..=order {
            design.push(x[t - i]);
        }
    }

    let fit = ols(rows, cols, &design, &x[order..])?;
    let mut innovations = vec![0.0; order];
    innovations.extend(fit.residuals);
    Ok(innovations)
}

/// Stage two: regress x[t] on its own lags and lagged proxy innovations
fn fit_arma(
    x: &[f64],
    p: usize,
    q: usize,
    start: usize,
    include_constant: bool,
    innovations: Option<&[f64]>,
) -> Result<ArmaFit> {
    let rows = x.len() - start;
    let offset = usize::from(include_constant);
    let cols = offset + p + q;
    let target = &x[start..];

    if cols == 0 {
        let residuals = target.to_vec();
        let sigma2 = residuals.iter().map(|r| r * r).sum::<f64>() / rows as f64;
        return Ok(ArmaFit {
            p,
            q,
            constant: 0.0,
            ar: Vec::new(),
            ma: Vec::new(),
            residuals,
            sigma2,
            aic: stats::aic(rows, sigma2.max(MIN_SIGMA2), 1),
        });
    }

    let mut design = Vec::with_capacity(rows * cols);
    for t in start..x.len() {
        if include_constant {
            design.push(1.0);
        }
        for i in 1..=p {
            design.push(x[t - i]);
        }
        if let Some(eps) = innovations {
            for j in 1..=q {
                design.push(eps[t - j]);
            }
        }
    }

    let fit = ols(rows, cols, &design, target)?;
    let constant = if include_constant { fit.coefficients[0] } else { 0.0 };
    let ar = fit.coefficients[offset..offset + p].to_vec();
    let ma = fit.coefficients[offset + p..].to_vec();
    let aic = stats::aic(rows, fit.sigma2.max(MIN_SIGMA2), cols + 1);

    Ok(ArmaFit {
        p,
        q,
        constant,
        ar,
        ma,
        residuals: fit.residuals,
        sigma2: fit.sigma2,
        aic,
    })
}

/// MA(∞) weights of an ARIMA model, `steps` of them starting at psi_0 = 1
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, steps: usize) -> Vec<f64> {
    // (1 - φ1 B - ... - φp B^p)(1 - B)^d
    let mut poly = vec![1.0];
    poly.extend(ar.iter().map(|phi| -phi));
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (k, c) in poly.iter().enumerate() {
            next[k] += c;
            next[k + 1] -= c;
        }
        poly = next;
    }
    let integrated_ar: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = Vec::with_capacity(steps);
    for j in 0..steps {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut weight = if j <= ma.len() { ma[j - 1] } else { 0.0 };
        for (i, a) in integrated_ar.iter().enumerate().take(j) {
            weight += a * psi[j - 1 - i];
        }
        psi.push(weight);
    }
    psi
}

//! Automatic exponential smoothing backed by `augurs`

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, Horizon, TrainedForecastModel, TrainingData};
use augurs::ets::{AutoETS, FittedAutoETS};
use augurs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Minimum number of observations handed to the ETS search
const MIN_OBSERVATIONS: usize = 3;

/// AutoETS settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsConfig {
    /// Model specification, e.g. "ZZZ" (all components chosen automatically)
    pub spec: String,
    /// Overrides the backtest-wide seasonal period when set
    pub season_length: Option<usize>,
}

impl Default for EtsConfig {
    fn default() -> Self {
        Self {
            spec: "ZZZ".to_string(),
            season_length: None,
        }
    }
}

/// Exponential smoothing with automatic error, trend and season selection
#[derive(Debug, Clone)]
pub struct AutoEts {
    name: String,
    season_length: usize,
    spec: String,
}

/// Trained AutoETS model
pub struct TrainedEts {
    name: String,
    fitted: FittedAutoETS,
}

impl fmt::Debug for TrainedEts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedEts")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AutoEts {
    /// Create a new AutoETS model for a given seasonal period
    pub fn new(season_length: usize, config: &EtsConfig) -> Result<Self> {
        let season_length = config.season_length.unwrap_or(season_length);
        if season_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be at least 1".to_string(),
            ));
        }

        // Without a real season only the error and trend can be searched
        let spec = if season_length > 1 {
            config.spec.clone()
        } else {
            non_seasonal(&config.spec)
        };

        Ok(Self {
            name: "AutoETS".to_string(),
            season_length,
            spec,
        })
    }

    pub fn season_length(&self) -> usize {
        self.season_length
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    fn search(&self, values: &[f64]) -> Result<FittedAutoETS> {
        let search = AutoETS::new(self.season_length, &self.spec)
            .map_err(|e| ForecastError::fit_failure(&self.name, format!("ETS init: {e}")))?;
        search
            .fit(values)
            .map_err(|e| ForecastError::fit_failure(&self.name, format!("ETS fit: {e}")))
    }
}

/// Replace the season component of an ETS spec with "N"
fn non_seasonal(spec: &str) -> String {
    let mut spec: String = spec.chars().take(2).collect();
    spec.push('N');
    spec
}

impl ForecastModel for AutoEts {
    type Trained = TrainedEts;

    fn train(&self, data: &TrainingData) -> Result<TrainedEts> {
        let values = data.target().values();
        if values.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::fit_failure(
                &self.name,
                format!("needs at least {} observations, got {}", MIN_OBSERVATIONS, values.len()),
            ));
        }

        debug!(
            season_length = self.season_length,
            spec = %self.spec,
            observations = values.len(),
            "fitting AutoETS"
        );

        let fitted = self.search(values)?;

        Ok(TrainedEts {
            name: self.name.clone(),
            fitted,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedEts {
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult> {
        let forecast = self
            .fitted
            .predict(horizon.len(), Some(horizon.level()))
            .map_err(|e| ForecastError::fit_failure(&self.name, format!("ETS predict: {e}")))?;

        let result = ForecastResult::for_horizon(&self.name, forecast.point, horizon)?;
        match forecast.intervals {
            Some(intervals) => {
                let bounds = intervals.lower.into_iter().zip(intervals.upper).collect();
                result.with_intervals(bounds)
            }
            None => Ok(result),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;
    use chrono::{Duration, NaiveDate};

    fn training(values: Vec<f64>) -> TrainingData {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TrainingData::univariate(TimeSeries::new("Close", dates, values).unwrap())
    }

    fn horizon(n: usize) -> Horizon {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        Horizon::new((0..n).map(|i| start + Duration::days(i as i64)).collect()).unwrap()
    }

    #[test]
    fn test_non_seasonal_spec_drops_season() {
        let model = AutoEts::new(1, &EtsConfig::default()).unwrap();
        assert_eq!(model.spec(), "ZZN");
        let seasonal = AutoEts::new(5, &EtsConfig::default()).unwrap();
        assert_eq!(seasonal.spec(), "ZZZ");
        assert!(AutoEts::new(0, &EtsConfig::default()).is_err());
    }

    #[test]
    fn test_linear_trend_forecast() {
        let values: Vec<f64> = (0..60).map(|i| 10.0 + i as f64 * 2.0).collect();
        let model = AutoEts::new(1, &EtsConfig::default()).unwrap();
        let trained = model.train(&training(values)).unwrap();

        let forecast = trained.forecast(&horizon(5)).unwrap();
        assert_eq!(forecast.values().len(), 5);
        assert!(forecast.intervals().is_some());
    }

    #[test]
    fn test_weekly_pattern_fits_seasonal_search() {
        let pattern = [0.0, 4.0, -2.0, 3.0, -5.0];
        let values: Vec<f64> = (0..80)
            .map(|i| 100.0 + 0.3 * i as f64 + pattern[i % 5])
            .collect();
        let model = AutoEts::new(5, &EtsConfig::default()).unwrap();
        let trained = model.train(&training(values)).unwrap();

        let forecast = trained.forecast(&horizon(10)).unwrap();
        assert_eq!(forecast.values().len(), 10);
        assert_eq!(forecast.interval_level(), 0.95);
    }

    #[test]
    fn test_invalid_spec_is_fit_failure() {
        let config = EtsConfig {
            spec: "QQQ".to_string(),
            season_length: None,
        };
        let model = AutoEts::new(5, &config).unwrap();
        let values: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        assert!(matches!(
            model.train(&training(values)),
            Err(ForecastError::ModelFitFailure { .. })
        ));
    }

    #[test]
    fn test_too_short_is_fit_failure() {
        let model = AutoEts::new(5, &EtsConfig::default()).unwrap();
        assert!(matches!(
            model.train(&training(vec![1.0, 2.0])),
            Err(ForecastError::ModelFitFailure { .. })
        ));
    }
}

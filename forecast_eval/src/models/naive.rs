//! Naive (last value) forecaster

use crate::error::{ForecastError, Result};
use crate::models::{
    gaussian_intervals, ForecastModel, ForecastResult, Horizon, TrainedForecastModel,
    TrainingData,
};
use series_math::{difference, stats};

/// Forecasts every step as the last training value
#[derive(Debug, Clone)]
pub struct Naive {
    name: String,
}

/// Trained naive model
#[derive(Debug, Clone)]
pub struct TrainedNaive {
    name: String,
    last_value: f64,
    /// Standard deviation of one-step changes in the training data
    step_sigma: f64,
}

impl Naive {
    pub fn new() -> Self {
        Self {
            name: "Naive".to_string(),
        }
    }
}

impl Default for Naive {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for Naive {
    type Trained = TrainedNaive;

    fn train(&self, data: &TrainingData) -> Result<TrainedNaive> {
        let values = data.target().values();
        let last_value = values.last().copied().ok_or_else(|| {
            ForecastError::InsufficientData("Naive forecast needs one training point".to_string())
        })?;

        let changes = difference(values, 1);
        let step_sigma = if changes.is_empty() {
            0.0
        } else {
            stats::std_dev(&changes)
        };

        Ok(TrainedNaive {
            name: self.name.clone(),
            last_value,
            step_sigma,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedNaive {
    fn forecast(&self, horizon: &Horizon) -> Result<ForecastResult> {
        let values = vec![self.last_value; horizon.len()];
        // Random-walk error grows with the square root of the step
        let std_errors: Vec<f64> = horizon
            .steps()
            .map(|h| self.step_sigma * (h as f64).sqrt())
            .collect();
        let intervals = gaussian_intervals(&values, &std_errors, horizon.level())?;

        ForecastResult::for_horizon(&self.name, values, horizon)?.with_intervals(intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

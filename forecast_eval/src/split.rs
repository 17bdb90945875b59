//! Train/test partitioning

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};

/// A series cut into a training prefix and a test suffix of `horizon` points
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    train: TimeSeries,
    test: TimeSeries,
}

impl TrainTestSplit {
    pub fn train(&self) -> &TimeSeries {
        &self.train
    }

    pub fn test(&self) -> &TimeSeries {
        &self.test
    }

    /// Number of test points
    pub fn horizon(&self) -> usize {
        self.test.len()
    }

    pub fn into_parts(self) -> (TimeSeries, TimeSeries) {
        (self.train, self.test)
    }
}

/// Reserve the final `horizon` observations for testing.
///
/// Fails with `InsufficientData` unless `0 < horizon < series.len()`.
pub fn train_test_split(series: &TimeSeries, horizon: usize) -> Result<TrainTestSplit> {
    if horizon == 0 {
        return Err(ForecastError::InsufficientData(
            "Test horizon must be at least one point".to_string(),
        ));
    }
    if series.len() <= horizon {
        return Err(ForecastError::InsufficientData(format!(
            "Series '{}' has {} points, need more than the horizon of {}",
            series.name(),
            series.len(),
            horizon
        )));
    }

    let cut = series.len() - horizon;
    Ok(TrainTestSplit {
        train: series.slice(0, Some(cut))?,
        test: series.slice(cut, None)?,
    })
}

/// Split a target and a co-indexed companion series at the same point.
///
/// The companion must carry exactly the target's timestamps.
pub fn split_aligned(
    target: &TimeSeries,
    companion: &TimeSeries,
    horizon: usize,
) -> Result<(TrainTestSplit, TrainTestSplit)> {
    if !target.is_aligned_with(companion) {
        return Err(ForecastError::DataUnavailable(format!(
            "Series '{}' ({} points) is not aligned with '{}' ({} points)",
            companion.name(),
            companion.len(),
            target.name(),
            target.len()
        )));
    }

    Ok((
        train_test_split(target, horizon)?,
        train_test_split(companion, horizon)?,
    ))
}

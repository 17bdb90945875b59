//! Backtest configuration
//!
//! Every field has a default, so a JSON file only needs to name what it
//! changes:
//!
//! ```json
//! { "horizon": 20, "arima": { "window": 250 }, "strategies": ["naive", "var"] }
//! ```

use crate::calendar::Frequency;
use crate::data::DatasetSource;
use crate::error::{ForecastError, Result};
use crate::models::arima::ArimaConfig;
use crate::models::ets::EtsConfig;
use crate::models::prophet::ProphetConfig;
use crate::models::strategy::StrategyKind;
use crate::models::var::VarConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the price history lives and which columns to read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub name: String,
    pub filename: String,
    pub target_column: String,
    pub volume_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            name: "sp500".to_string(),
            filename: "sp500.csv".to_string(),
            target_column: "Close".to_string(),
            volume_column: "Volume".to_string(),
        }
    }
}

impl DatasetConfig {
    pub fn source(&self) -> DatasetSource {
        DatasetSource::new(self.root.clone(), self.name.clone(), self.filename.clone())
    }
}

/// What the run writes besides the console report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for exports; nothing is written when unset
    pub dir: Option<PathBuf>,
    /// Training points shown before the test window in plots
    pub plot_tail: usize,
    pub write_forecasts: bool,
    pub write_plots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            plot_tail: 120,
            write_forecasts: true,
            write_plots: true,
        }
    }
}

/// Configuration of a full backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub dataset: DatasetConfig,
    pub frequency: Frequency,
    /// Number of trailing points held out for testing
    pub horizon: usize,
    /// Seasonal period handed to AutoETS
    pub seasonal_period: usize,
    /// Lag of the in-sample naive forecast that scales MASE
    pub mase_period: usize,
    pub interval_level: f64,
    /// Strategies to run, in order
    pub strategies: Vec<StrategyKind>,
    pub arima: ArimaConfig,
    pub ets: EtsConfig,
    pub var: VarConfig,
    pub prophet: ProphetConfig,
    pub output: OutputConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            frequency: Frequency::BusinessDay,
            horizon: 30,
            seasonal_period: 5,
            mase_period: 1,
            interval_level: 0.95,
            strategies: StrategyKind::ALL.to_vec(),
            arima: ArimaConfig::default(),
            ets: EtsConfig::default(),
            var: VarConfig::default(),
            prophet: ProphetConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if self.seasonal_period == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal_period must be at least 1".to_string(),
            ));
        }
        if self.mase_period == 0 {
            return Err(ForecastError::InvalidParameter(
                "mase_period must be at least 1".to_string(),
            ));
        }
        if !(self.interval_level > 0.0 && self.interval_level < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "interval_level must be between 0 and 1".to_string(),
            ));
        }
        if self.prophet.changepoint_prior_scale.is_nan() || self.prophet.changepoint_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "prophet.changepoint_prior_scale must be positive".to_string(),
            ));
        }
        if self.strategies.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one strategy must be selected".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.horizon, 30);
        assert_eq!(config.seasonal_period, 5);
        assert_eq!(config.arima.window, Some(500));
        assert_eq!(config.strategies.len(), 5);
        assert_eq!(
            config.dataset.source().path(),
            PathBuf::from("data").join("sp500").join("sp500.csv")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"horizon": 10, "frequency": "D", "arima": {{"max_p": 1}}, "strategies": ["naive", "var"]}}"#
        )
        .unwrap();

        let config = BacktestConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.horizon, 10);
        assert_eq!(config.frequency, Frequency::Daily);
        assert_eq!(config.arima.max_p, 1);
        assert_eq!(config.arima.max_q, 3);
        assert_eq!(config.strategies, vec![StrategyKind::Naive, StrategyKind::Var]);
    }

    #[test]
    fn test_validation() {
        let mut config = BacktestConfig::default();
        config.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = BacktestConfig::default();
        config.prophet.changepoint_prior_scale = -1.0;
        assert!(config.validate().is_err());
    }
}

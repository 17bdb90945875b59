//! The five backtest strategies behind one dispatch point

use crate::config::BacktestConfig;
use crate::error::{ForecastError, Result};
use crate::models::arima::AutoArima;
use crate::models::ets::AutoEts;
use crate::models::naive::Naive;
use crate::models::prophet::Prophet;
use crate::models::var::VarModel;
use crate::models::{ForecastModel, TrainedForecastModel, TrainingData};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a strategy in configuration, CLI flags and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Naive,
    AutoArima,
    AutoEts,
    Var,
    Prophet,
}

impl StrategyKind {
    /// Every strategy, in reporting order
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Naive,
        StrategyKind::AutoArima,
        StrategyKind::AutoEts,
        StrategyKind::Var,
        StrategyKind::Prophet,
    ];

    /// Display name used in reports
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Naive => "Naive",
            StrategyKind::AutoArima => "AutoARIMA",
            StrategyKind::AutoEts => "AutoETS",
            StrategyKind::Var => "VAR",
            StrategyKind::Prophet => "Prophet",
        }
    }

    /// Whether the strategy consumes the volume series
    pub fn uses_exogenous(&self) -> bool {
        matches!(self, StrategyKind::Var)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "naive" => Ok(StrategyKind::Naive),
            "autoarima" | "auto_arima" | "arima" => Ok(StrategyKind::AutoArima),
            "autoets" | "auto_ets" | "ets" => Ok(StrategyKind::AutoEts),
            "var" => Ok(StrategyKind::Var),
            "prophet" => Ok(StrategyKind::Prophet),
            _ => Err(ForecastError::InvalidParameter(format!(
                "Unknown strategy: {}",
                s
            ))),
        }
    }
}

/// A configured forecasting strategy
#[derive(Debug, Clone)]
pub enum Strategy {
    Naive(Naive),
    AutoArima(AutoArima),
    AutoEts(AutoEts),
    Var(VarModel),
    Prophet(Prophet),
}

impl Strategy {
    /// Build a strategy from the backtest configuration
    pub fn from_config(kind: StrategyKind, config: &BacktestConfig) -> Result<Self> {
        Ok(match kind {
            StrategyKind::Naive => Strategy::Naive(Naive::new()),
            StrategyKind::AutoArima => Strategy::AutoArima(AutoArima::new(config.arima)?),
            StrategyKind::AutoEts => {
                Strategy::AutoEts(AutoEts::new(config.seasonal_period, &config.ets)?)
            }
            StrategyKind::Var => Strategy::Var(VarModel::new(config.var)?),
            StrategyKind::Prophet => Strategy::Prophet(Prophet::new(config.prophet.clone())?),
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Naive(_) => StrategyKind::Naive,
            Strategy::AutoArima(_) => StrategyKind::AutoArima,
            Strategy::AutoEts(_) => StrategyKind::AutoEts,
            Strategy::Var(_) => StrategyKind::Var,
            Strategy::Prophet(_) => StrategyKind::Prophet,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Strategy::Naive(m) => m.name(),
            Strategy::AutoArima(m) => m.name(),
            Strategy::AutoEts(m) => m.name(),
            Strategy::Var(m) => m.name(),
            Strategy::Prophet(m) => m.name(),
        }
    }

    /// Train the underlying model
    pub fn fit(&self, data: &TrainingData) -> Result<Box<dyn TrainedForecastModel>> {
        let trained: Box<dyn TrainedForecastModel> = match self {
            Strategy::Naive(m) => Box::new(m.train(data)?),
            Strategy::AutoArima(m) => Box::new(m.train(data)?),
            Strategy::AutoEts(m) => Box::new(m.train(data)?),
            Strategy::Var(m) => Box::new(m.train(data)?),
            Strategy::Prophet(m) => Box::new(m.train(data)?),
        };
        Ok(trained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("AutoARIMA".parse::<StrategyKind>().unwrap(), StrategyKind::AutoArima);
        assert_eq!("auto-ets".parse::<StrategyKind>().unwrap(), StrategyKind::AutoEts);
        assert_eq!("VAR".parse::<StrategyKind>().unwrap(), StrategyKind::Var);
        assert!("lstm".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_from_config_preserves_kind() {
        let config = BacktestConfig::default();
        for kind in StrategyKind::ALL {
            let strategy = Strategy::from_config(kind, &config).unwrap();
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.name(), kind.label());
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&StrategyKind::AutoArima).unwrap();
        assert_eq!(json, "\"auto_arima\"");
    }
}

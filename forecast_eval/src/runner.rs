//! End-to-end backtest: load, fill gaps, split, fit every strategy, score
//!
//! Loader, gap-fill and split failures abort the run. Anything that goes wrong
//! inside one strategy is recorded against that strategy and the remaining
//! strategies still run.

use crate::calendar::{fill_gaps, reindex_onto};
use crate::config::BacktestConfig;
use crate::data::{DataLoader, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::{Metric, MetricReport};
use crate::models::strategy::{Strategy, StrategyKind};
use crate::models::{ForecastResult, Horizon, TrainingData};
use crate::split::{split_aligned, train_test_split, TrainTestSplit};
use std::cmp::Ordering;
use std::fmt;
use tracing::{info, warn};

/// A strategy that produced a forecast and its scores
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub kind: StrategyKind,
    pub forecast: ForecastResult,
    pub metrics: MetricReport,
}

/// What happened to one strategy
#[derive(Debug)]
pub enum StrategyOutcome {
    Completed(StrategyRun),
    Failed {
        kind: StrategyKind,
        error: ForecastError,
    },
}

impl StrategyOutcome {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyOutcome::Completed(run) => run.kind,
            StrategyOutcome::Failed { kind, .. } => *kind,
        }
    }
}

/// Results of a backtest run
#[derive(Debug)]
pub struct BacktestReport {
    pub train: TimeSeries,
    pub test: TimeSeries,
    pub outcomes: Vec<StrategyOutcome>,
}

impl BacktestReport {
    /// Strategies that completed, in run order
    pub fn successful(&self) -> Vec<&StrategyRun> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                StrategyOutcome::Completed(run) => Some(run),
                StrategyOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// Strategies that were excluded, with the reason
    pub fn failed(&self) -> Vec<(StrategyKind, &ForecastError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                StrategyOutcome::Failed { kind, error } => Some((*kind, error)),
                StrategyOutcome::Completed(_) => None,
            })
            .collect()
    }

    pub fn get(&self, kind: StrategyKind) -> Option<&StrategyRun> {
        self.successful().into_iter().find(|run| run.kind == kind)
    }

    /// Successful strategies ordered best-first by `metric`; undefined values last
    pub fn ranking(&self, metric: Metric) -> Vec<&StrategyRun> {
        let mut runs = self.successful();
        runs.sort_by(|a, b| {
            match (a.metrics.get(metric).value(), b.metrics.get(metric).value()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        runs
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Backtest: {} training points, {} test points",
            self.train.len(),
            self.test.len()
        )?;

        for run in self.successful() {
            writeln!(f)?;
            writeln!(f, "== {} ==", run.kind)?;
            write!(f, "{}", run.metrics)?;
        }

        let successful = self.successful();
        if !successful.is_empty() {
            writeln!(f)?;
            write!(f, "{:<10}", "Model")?;
            for metric in Metric::ALL {
                write!(f, " {:>12}", metric.name())?;
            }
            writeln!(f)?;
            for run in successful {
                write!(f, "{:<10}", run.kind.label())?;
                for metric in Metric::ALL {
                    match run.metrics.get(metric).value() {
                        Some(v) => write!(f, " {:>12.*}", metric.precision(), v)?,
                        None => write!(f, " {:>12}", "undefined")?,
                    }
                }
                writeln!(f)?;
            }
        }

        let failed = self.failed();
        if !failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Excluded strategies:")?;
            for (kind, error) in failed {
                writeln!(f, "  {}: {}", kind, error)?;
            }
        }

        Ok(())
    }
}

/// Backtest runner
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Load and gap-fill the target, plus the volume series when it is available
    pub fn load(&self) -> Result<(TimeSeries, Option<TimeSeries>)> {
        let source = self.config.dataset.source();
        info!(path = %source.path().display(), "loading dataset");

        let raw_target = DataLoader::load(&source, &self.config.dataset.target_column)?;
        let target = fill_gaps(&raw_target, self.config.frequency)?;

        // Only VAR needs volume, so its absence is not fatal here
        let volume = match DataLoader::load(&source, &self.config.dataset.volume_column)
            .and_then(|raw| reindex_onto(&raw, target.dates()))
        {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(error = %e, column = %self.config.dataset.volume_column, "volume unavailable");
                None
            }
        };

        Ok((target, volume))
    }

    /// Run against the configured dataset
    pub fn run(&self) -> Result<BacktestReport> {
        let (target, volume) = self.load()?;
        self.run_on(&target, volume.as_ref())
    }

    /// Run against series that are already gap-filled
    pub fn run_on(&self, target: &TimeSeries, volume: Option<&TimeSeries>) -> Result<BacktestReport> {
        let split = train_test_split(target, self.config.horizon)?;
        info!(
            train = split.train().len(),
            test = split.test().len(),
            "split series"
        );

        let mut outcomes = Vec::with_capacity(self.config.strategies.len());
        for kind in &self.config.strategies {
            match self.run_strategy(*kind, &split, target, volume) {
                Ok(run) => {
                    info!(strategy = %kind, mae = ?run.metrics.mae.value(), "strategy complete");
                    outcomes.push(StrategyOutcome::Completed(run));
                }
                Err(error) => {
                    warn!(strategy = %kind, error = %error, "strategy excluded");
                    outcomes.push(StrategyOutcome::Failed { kind: *kind, error });
                }
            }
        }

        let (train, test) = split.into_parts();
        Ok(BacktestReport {
            train,
            test,
            outcomes,
        })
    }

    fn run_strategy(
        &self,
        kind: StrategyKind,
        split: &TrainTestSplit,
        target: &TimeSeries,
        volume: Option<&TimeSeries>,
    ) -> Result<StrategyRun> {
        let strategy = Strategy::from_config(kind, &self.config)?;
        let training = self.training_data(&strategy, split, target, volume)?;

        let trained = strategy.fit(&training)?;
        let horizon = Horizon::from_test(split.test())?.with_level(self.config.interval_level)?;
        let forecast = trained.forecast(&horizon)?;
        if forecast.values().len() != split.horizon() {
            return Err(ForecastError::fit_failure(
                strategy.name(),
                format!(
                    "returned {} values for a horizon of {}",
                    forecast.values().len(),
                    split.horizon()
                ),
            ));
        }

        let metrics = MetricReport::evaluate(
            strategy.name(),
            split.test().values(),
            forecast.values(),
            split.train().values(),
            self.config.mase_period,
        )?;

        Ok(StrategyRun {
            kind,
            forecast,
            metrics,
        })
    }

    fn training_data(
        &self,
        strategy: &Strategy,
        split: &TrainTestSplit,
        target: &TimeSeries,
        volume: Option<&TimeSeries>,
    ) -> Result<TrainingData> {
        if !strategy.kind().uses_exogenous() {
            return Ok(TrainingData::univariate(split.train().clone()));
        }

        let volume = volume
            .ok_or_else(|| ForecastError::fit_failure(strategy.name(), "volume series is unavailable"))?;
        let (target_split, volume_split) = split_aligned(target, volume, self.config.horizon)
            .map_err(|e| ForecastError::fit_failure(strategy.name(), e))?;
        TrainingData::with_exogenous(
            target_split.train().clone(),
            volume_split.train().clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new("Close", dates, values).unwrap()
    }

    #[test]
    fn test_naive_scenario() {
        let config = BacktestConfig {
            horizon: 2,
            strategies: vec![StrategyKind::Naive],
            ..BacktestConfig::default()
        };
        let report = Backtest::new(config)
            .unwrap()
            .run_on(&series(vec![100.0, 102.0, 101.0, 103.0, 105.0, 106.0, 104.0]), None)
            .unwrap();

        let naive = report.get(StrategyKind::Naive).unwrap();
        assert_eq!(naive.forecast.values(), &[105.0, 105.0]);
        assert_eq!(naive.metrics.mae.value(), Some(1.0));
    }

    #[test]
    fn test_var_without_volume_is_excluded() {
        let config = BacktestConfig {
            horizon: 2,
            strategies: vec![StrategyKind::Naive, StrategyKind::Var],
            ..BacktestConfig::default()
        };
        let values: Vec<f64> = (0..60).map(|i| 100.0 + (i % 7) as f64).collect();
        let report = Backtest::new(config).unwrap().run_on(&series(values), None).unwrap();

        assert_eq!(report.successful().len(), 1);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, StrategyKind::Var);
        assert!(matches!(failed[0].1, ForecastError::ModelFitFailure { .. }));
        assert!(report.to_string().contains("Excluded strategies:"));
    }

    #[test]
    fn test_horizon_longer_than_series_aborts() {
        let config = BacktestConfig {
            horizon: 10,
            ..BacktestConfig::default()
        };
        let result = Backtest::new(config).unwrap().run_on(&series(vec![1.0; 5]), None);
        assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
    }
}

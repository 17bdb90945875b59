//! # Forecast Eval
//!
//! Backtesting of daily price forecasting models on a single index series.
//!
//! ## Pipeline
//!
//! - Load a dated column from `<root>/<dataset>/<filename>` (CSV)
//! - Reindex onto a business-day calendar with forward fill
//! - Hold out the last `horizon` points as the test window
//! - Fit Naive, AutoARIMA, AutoETS, VAR (price and volume) and a
//!   Prophet-style trend/seasonality model on the training prefix
//! - Score each forecast with MAPE, MAE, RMSE, MSE and MASE
//!
//! A strategy that fails to fit is reported as excluded; the others still run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_eval::{Backtest, BacktestConfig};
//!
//! let config = BacktestConfig::default();
//! let report = Backtest::new(config)?.run()?;
//! println!("{}", report);
//! # Ok::<(), forecast_eval::ForecastError>(())
//! ```

pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod plot;
pub mod report;
pub mod runner;
pub mod split;

// Re-export commonly used types
pub use crate::calendar::{fill_gaps, reindex_onto, Frequency};
pub use crate::config::BacktestConfig;
pub use crate::data::{DataLoader, DatasetSource, RawSeries, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::{Metric, MetricReport, MetricValue};
pub use crate::models::strategy::{Strategy, StrategyKind};
pub use crate::models::{ForecastModel, ForecastResult, Horizon, TrainedForecastModel, TrainingData};
pub use crate::plot::{CsvPlotSink, PlotRequest, PlotSink};
pub use crate::report::ForecastExporter;
pub use crate::runner::{Backtest, BacktestReport, StrategyOutcome, StrategyRun};
pub use crate::split::{train_test_split, TrainTestSplit};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

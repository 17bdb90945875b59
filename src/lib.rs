//! # SPX Backtest
//!
//! Workspace umbrella for the S&P 500 forecast backtest.
//!
//! ## Example
//!
//! ```
//! use spx_backtest::forecast_eval::metrics::mae;
//!
//! let error = mae(&[106.0, 104.0], &[105.0, 105.0]).unwrap();
//! assert_eq!(error, 1.0);
//! ```

pub use forecast_eval;
pub use series_math;

pub use forecast_eval::{Backtest, BacktestConfig, BacktestReport, ForecastError, StrategyKind};

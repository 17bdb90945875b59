//! Command-line backtest of the five forecasting strategies on a price CSV.

use anyhow::{Context, Result};
use clap::Parser;
use forecast_eval::plot::plot_report;
use forecast_eval::{Backtest, BacktestConfig, CsvPlotSink, ForecastExporter, Metric, StrategyKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "spx-backtest", version, about = "Backtest daily index forecasts")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per dataset
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Dataset name
    #[arg(long)]
    dataset: Option<String>,

    /// CSV file inside the dataset directory
    #[arg(long)]
    file: Option<String>,

    /// Number of trailing points held out for testing
    #[arg(long)]
    horizon: Option<usize>,

    /// Write forecast, summary and plot files here
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Comma-separated strategies to run, e.g. naive,auto_arima
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,
}

impl Args {
    fn into_config(self) -> Result<BacktestConfig> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => BacktestConfig::default(),
        };

        if let Some(root) = self.data_root {
            config.dataset.root = root;
        }
        if let Some(dataset) = self.dataset {
            config.dataset.name = dataset;
        }
        if let Some(file) = self.file {
            config.dataset.filename = file;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = Some(dir);
        }
        if !self.only.is_empty() {
            config.strategies = self
                .only
                .iter()
                .map(|s| s.parse::<StrategyKind>())
                .collect::<std::result::Result<_, _>>()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("forecast_eval=info,spx_backtest=info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let output = config.output.clone();

    let report = Backtest::new(config)?.run().context("backtest failed")?;
    println!("{}", report);

    let ranking: Vec<&str> = report
        .ranking(Metric::Mase)
        .into_iter()
        .map(|run| run.kind.label())
        .collect();
    if !ranking.is_empty() {
        println!("Ranking by MASE: {}", ranking.join(" > "));
    }

    if let Some(dir) = output.dir {
        if output.write_forecasts {
            let files = ForecastExporter::new(&dir).export(&report)?;
            info!(count = files.len(), "wrote forecast exports");
        }
        if output.write_plots {
            let mut sink = CsvPlotSink::new(dir.join("plots"));
            let count = plot_report(&report, &mut sink, output.plot_tail)?;
            info!(count, "wrote plot data");
        }
    }

    Ok(())
}

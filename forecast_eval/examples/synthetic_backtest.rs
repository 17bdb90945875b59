//! Runs every strategy on a generated business-day series with volume.
//!
//! `cargo run -p forecast_eval --example synthetic_backtest`

use chrono::{Duration, NaiveDate};
use forecast_eval::{fill_gaps, reindex_onto, Backtest, BacktestConfig, Frequency, Metric, RawSeries};

fn generate(days: usize) -> (RawSeries, RawSeries) {
    let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    let mut price = 3700.0;
    let mut prices = Vec::new();
    let mut volumes = Vec::new();

    for i in 0..days {
        let date = start + Duration::days(i as i64);
        if !Frequency::BusinessDay.contains(date) {
            continue;
        }
        // Drift, a weekly wiggle and a slow cycle
        price += 1.2 + 8.0 * (i as f64 * 0.9).sin() + 15.0 * (i as f64 / 40.0).cos();
        let volume = 3.5e9 + 4.0e8 * (i as f64 / 11.0).sin();

        // Every 45th trading day has no quote
        let quote = if i % 45 == 44 { None } else { Some(price) };
        prices.push((date, quote));
        volumes.push((date, Some(volume)));
    }

    (
        RawSeries::from_observations("Close", prices),
        RawSeries::from_observations("Volume", volumes),
    )
}

fn main() -> forecast_eval::Result<()> {
    let (raw_price, raw_volume) = generate(900);
    let price = fill_gaps(&raw_price, Frequency::BusinessDay)?;
    let volume = reindex_onto(&raw_volume, price.dates())?;
    println!(
        "Generated {} business days ({} quotes missing before fill)",
        price.len(),
        raw_price.missing()
    );

    let backtest = Backtest::new(BacktestConfig::default())?;
    let report = backtest.run_on(&price, Some(&volume))?;
    println!("{}", report);

    for (rank, run) in report.ranking(Metric::Mae).iter().enumerate() {
        println!("{}. {} (MAE {:?})", rank + 1, run.kind, run.metrics.mae.value());
    }

    Ok(())
}

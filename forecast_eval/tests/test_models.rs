use chrono::NaiveDate;
use forecast_eval::models::arima::{ArimaConfig, AutoArima};
use forecast_eval::models::naive::Naive;
use forecast_eval::models::var::VarModel;
use forecast_eval::{
    BacktestConfig, ForecastError, ForecastModel, Frequency, Horizon, Strategy, StrategyKind,
    TimeSeries, TrainedForecastModel, TrainingData,
};
use series_math::{difference, integrate};

fn business_days(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut dates = vec![start];
    dates.extend(Frequency::BusinessDay.dates_after(start, n - 1));
    dates
}

fn price_and_volume(n: usize) -> (TimeSeries, TimeSeries) {
    let dates = business_days(n);
    let mut price = Vec::with_capacity(n);
    let mut volume = Vec::with_capacity(n);
    let mut level = 4000.0;
    for i in 0..n {
        let t = i as f64;
        level += 0.8 + 6.0 * (t * 1.3).sin() + 3.0 * (t * 0.37).cos();
        price.push(level);
        volume.push(3.0e9 + 2.0e8 * (t * 0.21).sin() + 5.0e7 * (t * 2.1).cos());
    }
    (
        TimeSeries::new("Close", dates.clone(), price).unwrap(),
        TimeSeries::new("Volume", dates, volume).unwrap(),
    )
}

fn horizon_after(series: &TimeSeries, steps: usize) -> Horizon {
    let last = series.last_date().unwrap();
    Horizon::new(Frequency::BusinessDay.dates_after(last, steps)).unwrap()
}

#[test]
fn test_every_strategy_honors_the_horizon() {
    let (price, volume) = price_and_volume(400);
    let training = TrainingData::with_exogenous(price.clone(), volume).unwrap();
    let config = BacktestConfig::default();

    for steps in [1, 7, 30] {
        let horizon = horizon_after(&price, steps);
        for kind in StrategyKind::ALL {
            let strategy = Strategy::from_config(kind, &config).unwrap();
            let trained = strategy.fit(&training).unwrap();
            let forecast = trained.forecast(&horizon).unwrap();

            assert_eq!(forecast.values().len(), steps, "{} at H={}", kind, steps);
            assert_eq!(forecast.dates().unwrap(), horizon.dates());
            assert!(forecast.values().iter().all(|v| v.is_finite()));
            assert_eq!(forecast.model_name(), kind.label());
        }
    }
}

#[test]
fn test_naive_repeats_last_training_value() {
    let (price, _) = price_and_volume(50);
    let last = price.last_value().unwrap();
    let trained = Naive::new().train(&TrainingData::univariate(price.clone())).unwrap();
    let forecast = trained.forecast(&horizon_after(&price, 12)).unwrap();
    assert!(forecast.values().iter().all(|v| *v == last));
}

#[test]
fn test_var_differencing_round_trip() {
    let (price, volume) = price_and_volume(120);
    let diffs = difference(price.values(), 1);
    let rebuilt = integrate(&diffs, price.values()[0]);
    for (a, b) in rebuilt.iter().zip(&price.values()[1..]) {
        assert!((a - b).abs() < 1e-6);
    }

    let training = TrainingData::with_exogenous(price.clone(), volume).unwrap();
    let trained = VarModel::default().train(&training).unwrap();
    let forecast = trained.forecast(&horizon_after(&price, 5)).unwrap();
    let steps: Vec<f64> = trained
        .forecast_differences(5)
        .iter()
        .map(|s| s[0])
        .collect();
    let expected = integrate(&steps, price.last_value().unwrap());
    for (a, b) in expected.iter().zip(forecast.values()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_var_rejects_misaligned_volume() {
    let (price, volume) = price_and_volume(100);
    let shorter = volume.slice(1, None).unwrap();
    assert!(TrainingData::with_exogenous(price.clone(), shorter).is_err());

    let training = TrainingData::univariate(price);
    assert!(matches!(
        VarModel::default().train(&training),
        Err(ForecastError::ModelFitFailure { .. })
    ));
}

#[test]
fn test_arima_window_limits_history() {
    let (price, _) = price_and_volume(300);
    let tiny = AutoArima::new(ArimaConfig {
        window: Some(5),
        ..ArimaConfig::default()
    })
    .unwrap();
    assert!(matches!(
        tiny.train(&TrainingData::univariate(price.clone())),
        Err(ForecastError::ModelFitFailure { .. })
    ));

    let trained = AutoArima::default()
        .train(&TrainingData::univariate(price))
        .unwrap();
    let order = trained.order();
    assert!(order.p <= 3 && order.d <= 2 && order.q <= 3);
}

#[test]
fn test_intervals_bracket_point_forecasts() {
    let (price, volume) = price_and_volume(300);
    let training = TrainingData::with_exogenous(price.clone(), volume).unwrap();
    let horizon = horizon_after(&price, 10);
    let config = BacktestConfig::default();

    for kind in [StrategyKind::Naive, StrategyKind::AutoArima, StrategyKind::Var, StrategyKind::Prophet] {
        let trained = Strategy::from_config(kind, &config).unwrap().fit(&training).unwrap();
        let forecast = trained.forecast(&horizon).unwrap();
        let intervals = forecast.intervals().unwrap();
        for (value, (lower, upper)) in forecast.values().iter().zip(intervals) {
            assert!(lower <= value && value <= upper, "{}", kind);
        }
    }
}

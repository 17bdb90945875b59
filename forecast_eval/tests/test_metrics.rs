use assert_approx_eq::assert_approx_eq;
use forecast_eval::metrics::{mae, mape, mase, mse, rmse};
use forecast_eval::{ForecastError, Metric, MetricReport, MetricValue};
use rstest::rstest;

#[test]
fn test_naive_scenario_metrics() {
    let train = [100.0, 102.0, 101.0, 103.0, 105.0];
    let test = [106.0, 104.0];
    let forecast = [105.0, 105.0];

    let report = MetricReport::evaluate("Naive", &test, &forecast, &train, 1).unwrap();
    assert_approx_eq!(report.mae.value().unwrap(), 1.0);
    assert_approx_eq!(report.mse.value().unwrap(), 1.0);
    assert_approx_eq!(report.rmse.value().unwrap(), 1.0);
    assert_approx_eq!(report.mape.value().unwrap(), 0.0095, 1e-4);

    // In-sample naive MAE: (2 + 1 + 2 + 2) / 4
    assert_approx_eq!(report.mase.value().unwrap(), 1.0 / 1.75);
}

#[test]
fn test_mase_is_one_when_mae_matches_naive_scale() {
    let train = [10.0, 12.0, 11.0, 13.0];
    // In-sample naive MAE is (2 + 1 + 2) / 3
    let scale = 5.0 / 3.0;
    let actual = [20.0, 20.0, 20.0];
    let forecast = [20.0 + scale, 20.0 - scale, 20.0 + scale];

    assert_approx_eq!(mase(&actual, &forecast, &train, 1).unwrap(), 1.0, 1e-12);
}

#[rstest]
#[case(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.0)]
#[case(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0], 1.0)]
#[case(&[2.0, 4.0], &[0.0, 0.0], 3.0)]
fn test_mae_cases(#[case] actual: &[f64], #[case] forecast: &[f64], #[case] expected: f64) {
    assert_approx_eq!(mae(actual, forecast).unwrap(), expected);
}

#[test]
fn test_rmse_is_root_of_mse() {
    let actual = [3.0, 5.0, 8.0, 13.0];
    let forecast = [2.0, 7.0, 8.0, 10.0];
    assert_approx_eq!(mse(&actual, &forecast).unwrap(), 3.5);
    assert_approx_eq!(rmse(&actual, &forecast).unwrap(), 3.5_f64.sqrt());
}

#[test]
fn test_undefined_metrics_are_reported_not_coerced() {
    let report = MetricReport::evaluate("Naive", &[0.0, 5.0], &[1.0, 5.0], &[7.0, 7.0, 7.0], 1).unwrap();

    assert!(matches!(report.mape, MetricValue::Undefined { .. }));
    assert!(matches!(report.mase, MetricValue::Undefined { .. }));
    assert!(report.mae.is_defined());

    let text = report.to_string();
    assert!(text.contains("MAPE: undefined"));
    assert!(text.contains("MAE: 0.50"));
    assert!(text.contains("MSE: 0.50"));
}

#[test]
fn test_errors() {
    assert!(matches!(
        mape(&[0.0], &[1.0]),
        Err(ForecastError::MetricUndefined { .. })
    ));
    assert!(matches!(
        mae(&[1.0, 2.0], &[1.0]),
        Err(ForecastError::InsufficientData(_))
    ));
    assert!(matches!(
        mase(&[1.0], &[1.0], &[5.0], 1),
        Err(ForecastError::MetricUndefined { .. })
    ));
}

#[test]
fn test_display_precision() {
    let report = MetricReport::evaluate("m", &[3.0], &[2.0], &[1.0, 3.0], 1).unwrap();
    let lines: Vec<String> = report.to_string().lines().map(String::from).collect();
    assert_eq!(
        lines,
        vec![
            "MAPE: 0.3333".to_string(),
            "MAE: 1.00".to_string(),
            "RMSE: 1.00".to_string(),
            "MSE: 1.00".to_string(),
            "MASE: 0.5000".to_string(),
        ]
    );
    assert_eq!(Metric::ALL[0].name(), "MAPE");
}

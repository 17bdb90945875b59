//! KPSS level-stationarity test and differencing-order selection

use crate::differencing::difference;
use crate::stats::mean;
use serde::{Deserialize, Serialize};

/// 5% critical value of the KPSS statistic for level stationarity
pub const KPSS_LEVEL_CRITICAL_5PCT: f64 = 0.463;

/// Outcome of a KPSS test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpssResult {
    /// Test statistic (eta)
    pub statistic: f64,
    /// Newey-West truncation lag used for the long-run variance
    pub lags: usize,
}

impl KpssResult {
    /// H0 (stationary around a constant) survives at the 5% level
    pub fn is_stationary(&self) -> bool {
        self.statistic.is_finite() && self.statistic <= KPSS_LEVEL_CRITICAL_5PCT
    }
}

/// KPSS test with a constant (level) null hypothesis.
///
/// Returns `None` when fewer than 10 observations are available or the series
/// has no variance.
pub fn kpss_level(data: &[f64]) -> Option<KpssResult> {
    let n = data.len();
    if n < 10 {
        return None;
    }

    let m = mean(data);
    let demeaned: Vec<f64> = data.iter().map(|y| y - m).collect();

    let lags = (4.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let mut s2 = demeaned.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for l in 1..=lags.min(n - 1) {
        let weight = 1.0 - l as f64 / (lags + 1) as f64;
        let gamma: f64 = demeaned[l..]
            .iter()
            .zip(demeaned[..n - l].iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        s2 += 2.0 * weight * gamma;
    }
    if s2 <= 0.0 || !s2.is_finite() {
        return None;
    }

    let mut partial = 0.0;
    let mut sum_sq = 0.0;
    for r in &demeaned {
        partial += r;
        sum_sq += partial * partial;
    }
    let statistic = sum_sq / (n * n) as f64 / s2;

    Some(KpssResult { statistic, lags })
}

/// Smallest differencing order in `0..=max_d` that KPSS accepts as stationary.
///
/// A constant series counts as stationary. When no order passes, `max_d` is
/// returned.
pub fn ndiffs(data: &[f64], max_d: usize) -> usize {
    for d in 0..=max_d {
        let series = difference(data, d);
        match kpss_level(&series) {
            Some(result) if result.is_stationary() => return d,
            None if series.len() >= 10 => return d,
            _ => {}
        }
    }
    max_d
}

//! Differencing and its inverse

use crate::{MathError, Result};

/// Difference a series `d` times.
///
/// Each round replaces the series with `x[t] - x[t-1]`, so the output is `d`
/// points shorter than the input. Returns an empty vector when the series is
/// too short.
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Cumulative sum of `diff` starting from `start`.
pub fn integrate(diff: &[f64], start: f64) -> Vec<f64> {
    diff.iter()
        .scan(start, |level, &step| {
            *level += step;
            Some(*level)
        })
        .collect()
}

/// Invert `d` rounds of differencing for values that continue `history`.
///
/// `forecast` lives in the `d`-times differenced space; the result is on the
/// scale of `history`.
pub fn undifference(forecast: &[f64], history: &[f64], d: usize) -> Result<Vec<f64>> {
    if d == 0 {
        return Ok(forecast.to_vec());
    }
    if history.len() < d {
        return Err(MathError::InsufficientData(format!(
            "Undifferencing order {} needs at least {} history points, got {}",
            d,
            d,
            history.len()
        )));
    }

    let mut result = forecast.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(history, level)
            .last()
            .copied()
            .ok_or_else(|| {
                MathError::CalculationError(format!("No anchor at differencing level {}", level))
            })?;
        result = integrate(&result, anchor);
    }
    Ok(result)
}

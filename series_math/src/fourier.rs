//! Fourier seasonality features

use std::f64::consts::PI;

/// Fourier terms for a seasonality of `period` (in the same unit as `t`).
///
/// Each output row holds `[sin(2πkt/P), cos(2πkt/P)]` for `k = 1..=order`.
pub fn fourier_features(t: &[f64], period: f64, order: usize) -> Vec<Vec<f64>> {
    t.iter()
        .map(|&ti| {
            (1..=order)
                .flat_map(|k| {
                    let angle = 2.0 * PI * k as f64 * ti / period;
                    [angle.sin(), angle.cos()]
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_and_periodicity() {
        let t: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let features = fourier_features(&t, 7.0, 3);
        assert_eq!(features.len(), 15);
        assert!(features.iter().all(|row| row.len() == 6));
        for (a, b) in features[0].iter().zip(features[7].iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}

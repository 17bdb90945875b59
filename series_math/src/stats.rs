//! Descriptive statistics and information criteria

/// Arithmetic mean, NaN for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance, NaN for an empty slice
pub fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// Gaussian log-likelihood of `n` residuals with variance `sigma2`
pub fn gaussian_log_likelihood(n: usize, sigma2: f64) -> f64 {
    let n = n as f64;
    -0.5 * n * (1.0 + (2.0 * std::f64::consts::PI * sigma2).ln())
}

/// Akaike information criterion for `k` estimated parameters
pub fn aic(n: usize, sigma2: f64, k: usize) -> f64 {
    -2.0 * gaussian_log_likelihood(n, sigma2) + 2.0 * k as f64
}

//! Least-squares solvers used by the autoregressive and trend models

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};

/// Coefficients and residuals of a least-squares fit
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// In-sample residuals `y - X * beta`
    pub residuals: Vec<f64>,
    /// Residual variance (RSS / n)
    pub sigma2: f64,
}

impl LeastSquaresFit {
    /// Number of observations the fit was computed on
    pub fn observations(&self) -> usize {
        self.residuals.len()
    }

    /// Fitted value for a design row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(self.coefficients.iter())
            .map(|(x, b)| x * b)
            .sum()
    }
}

/// Ordinary least squares on a row-major design matrix.
pub fn ols(rows: usize, cols: usize, design: &[f64], target: &[f64]) -> Result<LeastSquaresFit> {
    ridge(rows, cols, design, target, &vec![0.0; cols])
}

/// Least squares with a per-column L2 penalty added to the normal equations.
///
/// A zero penalty leaves the column unregularised.
pub fn ridge(
    rows: usize,
    cols: usize,
    design: &[f64],
    target: &[f64],
    penalties: &[f64],
) -> Result<LeastSquaresFit> {
    if cols == 0 {
        return Err(MathError::InvalidInput("Design matrix has no columns".to_string()));
    }
    if design.len() != rows * cols {
        return Err(MathError::InvalidInput(format!(
            "Design has {} cells, expected {}x{}",
            design.len(),
            rows,
            cols
        )));
    }
    if target.len() != rows {
        return Err(MathError::InvalidInput(format!(
            "Target length ({}) doesn't match design rows ({})",
            target.len(),
            rows
        )));
    }
    if penalties.len() != cols {
        return Err(MathError::InvalidInput(format!(
            "Expected {} penalties, got {}",
            cols,
            penalties.len()
        )));
    }
    // Penalised columns are identified by their penalty, only free ones need rows
    let free = penalties.iter().filter(|p| **p <= 0.0).count();
    if rows < free.max(1) {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for {} unpenalised coefficients, got {}",
            free.max(1),
            free,
            rows
        )));
    }

    let x = DMatrix::from_row_slice(rows, cols, design);
    let y = DVector::from_column_slice(target);

    let mut xtx = x.transpose() * &x;
    for (i, penalty) in penalties.iter().enumerate() {
        xtx[(i, i)] += penalty;
    }
    let xty = x.transpose() * &y;

    let beta = xtx
        .cholesky()
        .map(|chol| chol.solve(&xty))
        .ok_or_else(|| {
            MathError::CalculationError("Normal equations are not positive definite".to_string())
        })?;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::CalculationError(
            "Least-squares solution is not finite".to_string(),
        ));
    }

    let residuals: Vec<f64> = (&y - &x * &beta).iter().copied().collect();
    let sigma2 = residuals.iter().map(|r| r * r).sum::<f64>() / rows as f64;

    Ok(LeastSquaresFit {
        coefficients: beta.iter().copied().collect(),
        residuals,
        sigma2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ols_recovers_line() {
        // y = 2 + 3x
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let design: Vec<f64> = xs.iter().flat_map(|&x| [1.0, x]).collect();
        let target: Vec<f64> = xs.iter().map(|&x| 2.0 + 3.0 * x).collect();

        let fit = ols(20, 2, &design, &target).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-8);
        assert!(fit.sigma2 < 1e-12);
        assert_relative_eq!(fit.predict_row(&[1.0, 100.0]), 302.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ridge_shrinks_penalised_column() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let design: Vec<f64> = xs.iter().flat_map(|&x| [1.0, x]).collect();
        let target: Vec<f64> = xs.iter().map(|&x| 1.0 + 0.5 * x).collect();

        let free = ols(20, 2, &design, &target).unwrap();
        let shrunk = ridge(20, 2, &design, &target, &[0.0, 1e6]).unwrap();
        assert!(shrunk.coefficients[1].abs() < free.coefficients[1].abs());
    }

    #[test]
    fn test_ridge_fits_more_penalised_columns_than_rows() {
        // 4 rows, 2 free columns and 6 penalised ones
        let design: Vec<f64> = (0..4)
            .flat_map(|i| {
                let x = i as f64;
                [1.0, x, x * x, x.sin(), x.cos(), (2.0 * x).sin(), (2.0 * x).cos(), x.sqrt()]
            })
            .collect();
        let target = [1.0, 2.5, 3.9, 5.2];
        let mut penalties = vec![0.0, 0.0];
        penalties.extend([10.0; 6]);

        let fit = ridge(4, 8, &design, &target, &penalties).unwrap();
        assert_eq!(fit.coefficients.len(), 8);
        assert!(fit.coefficients.iter().all(|b| b.is_finite()));

        assert!(matches!(
            ols(4, 8, &design, &target),
            Err(MathError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(ols(2, 2, &[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());
        assert!(ols(1, 2, &[1.0, 2.0], &[1.0]).is_err());
        assert!(ols(2, 0, &[], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_singular_design_fails() {
        // Second column carries no information
        let design = vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let result = ols(3, 2, &design, &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(MathError::CalculationError(_))));
    }
}

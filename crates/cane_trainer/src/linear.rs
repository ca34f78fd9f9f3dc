//! Ordinary least squares with a small ridge term
//!
//! Columns are standardized before solving so that the ridge penalty acts
//! evenly; coefficients are mapped back to raw feature units afterwards.
//! The month indicators always sum to one, which makes the centred design
//! singular without the ridge term.

use cane_core::model::LinearModel;

use crate::errors::{Result, TrainerError};

/// Pivots smaller than this are treated as singular
const PIVOT_EPSILON: f64 = 1e-12;

/// Fit `y ≈ intercept + Σ coef_j x_j`.
pub fn fit_linear(rows: &[Vec<f64>], targets: &[f64], ridge_lambda: f64) -> Result<LinearModel> {
    let n = rows.len();
    if n == 0 || n != targets.len() {
        return Err(TrainerError::Training(format!(
            "linear fit needs matching non-empty inputs, got {} rows and {} targets",
            n,
            targets.len()
        )));
    }
    let p = rows[0].len();

    let mean: Vec<f64> = (0..p)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
        .collect();
    let scale: Vec<f64> = (0..p)
        .map(|j| {
            let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n as f64;
            var.sqrt()
        })
        .collect();
    // Constant columns carry no signal and are left out of the system.
    let active: Vec<usize> = (0..p).filter(|&j| scale[j] > 0.0).collect();
    let y_mean = targets.iter().sum::<f64>() / n as f64;

    let k = active.len();
    let mut gram = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];
    let mut z = vec![0.0; k];

    for (row, &y) in rows.iter().zip(targets) {
        for (a, &j) in active.iter().enumerate() {
            z[a] = (row[j] - mean[j]) / scale[j];
        }
        for a in 0..k {
            rhs[a] += z[a] * (y - y_mean);
            for b in a..k {
                gram[a][b] += z[a] * z[b];
            }
        }
    }
    for a in 0..k {
        for b in 0..a {
            gram[a][b] = gram[b][a];
        }
        gram[a][a] += ridge_lambda * n as f64;
    }

    let beta = solve(gram, rhs)?;

    let mut coefficients = vec![0.0; p];
    for (a, &j) in active.iter().enumerate() {
        coefficients[j] = beta[a] / scale[j];
    }
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&mean)
            .map(|(c, m)| c * m)
            .sum::<f64>();

    Ok(LinearModel {
        intercept,
        coefficients,
    })
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(TrainerError::Training(format!(
                "normal equations are singular at column {}; increase ridge_lambda",
                col
            )));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[row][c] * x[c]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

//! Regression error metrics

use serde::{Deserialize, Serialize};

/// Error summary of predictions against known targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compare `predicted` with `actual`; extra elements of the longer slice
    /// are ignored and empty input yields all zeros.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
            };
        }

        let pairs = || actual.iter().zip(predicted).take(n);
        let mean = actual[..n].iter().sum::<f64>() / n as f64;

        let ss_res: f64 = pairs().map(|(a, p)| (a - p).powi(2)).sum();
        let abs_err: f64 = pairs().map(|(a, p)| (a - p).abs()).sum();
        let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean).powi(2)).sum();

        let mse = ss_res / n as f64;
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mse,
            rmse: mse.sqrt(),
            mae: abs_err / n as f64,
            r2,
        }
    }
}

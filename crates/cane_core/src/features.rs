//! Feature preparation for model training
//!
//! Turns a raw frame into a row-major design matrix plus target vector:
//! `harvest_month` is one-hot expanded into `month_1..month_12` and
//! non-feature columns are dropped when present.

use crate::dataset::{ETHANOL_TARGET, HARVEST_DATE, HARVEST_MONTH, SUGAR_TARGET};
use crate::errors::{CoreError, Result};
use crate::frame::Frame;

/// Number of month indicator columns
pub const MONTHS: usize = 12;

/// Derived columns that must never be used as model inputs
pub const AUXILIARY_COLUMNS: &[&str] = &[
    HARVEST_DATE,
    "sugar_tons_per_hectare",
    "ethanol_liters_per_hectare",
    "bagasse_tons_per_hectare",
    "molasses_tons_per_hectare",
    "byproduct_revenue_sugar",
    "byproduct_revenue_ethanol",
    "weather_penalty",
    SUGAR_TARGET,
    ETHANOL_TARGET,
    "profit_difference",
];

/// Name of the indicator column for a month (1-based)
pub fn month_column(month: usize) -> String {
    format!("month_{}", month)
}

/// All twelve month indicator names in order
pub fn month_columns() -> Vec<String> {
    (1..=MONTHS).map(month_column).collect()
}

/// One-hot indicators for a month value.
///
/// Fractional values truncate toward zero (`9.7` is September). Months
/// outside 1..=12 after truncation, and NaN, are all zero.
pub fn month_indicators(month: f64) -> [f64; MONTHS] {
    let mut indicators = [0.0; MONTHS];
    let month = month.trunc();
    if (1.0..=MONTHS as f64).contains(&month) {
        indicators[month as usize - 1] = 1.0;
    }
    indicators
}

/// Model-ready design matrix and label vector
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFeatures {
    /// Feature names in matrix column order
    pub columns: Vec<String>,
    /// Row-major feature values
    pub rows: Vec<Vec<f64>>,
    /// Label per row
    pub target: Vec<f64>,
}

impl PreparedFeatures {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Copy out the rows at `indices`.
    pub fn subset(&self, indices: &[usize]) -> PreparedFeatures {
        PreparedFeatures {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }
}

/// Build the design matrix for `target_name` from a raw frame.
pub fn prepare(frame: &Frame, target_name: &str) -> Result<PreparedFeatures> {
    let mut frame = frame.clone();

    let target = frame
        .take_column(target_name)
        .ok_or_else(|| CoreError::MissingTarget(target_name.to_string()))?;

    let months = frame.take_column(HARVEST_MONTH);
    frame.drop_if_present(AUXILIARY_COLUMNS);

    if let Some(months) = months {
        let mut indicator_columns = vec![Vec::with_capacity(months.len()); MONTHS];
        for &month in &months {
            for (column, value) in indicator_columns.iter_mut().zip(month_indicators(month)) {
                column.push(value);
            }
        }
        for (i, values) in indicator_columns.into_iter().enumerate() {
            frame.push_column(month_column(i + 1), values)?;
        }
    }

    let columns: Vec<String> = frame.names().into_iter().map(str::to_string).collect();
    let rows = (0..target.len()).map(|i| frame.row(i)).collect();

    Ok(PreparedFeatures {
        columns,
        rows,
        target,
    })
}

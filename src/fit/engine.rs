//! Single-dataset fitting.
//!
//! The engine has two equivalent entry points with identical semantics:
//! in-memory slices (`fit_series`) or a two-column delimited file
//! (`fit_csv`, first column rate, second capacity).
//!
//! The engine has **no** zero-fallback policy: callers wanting the
//! under-populated-dataset fallback must check the sample count before
//! calling and substitute zeros themselves (the batch driver does).

use std::fs::File;
use std::path::Path;

use nalgebra::DVector;

use crate::domain::FitParams;
use crate::error::AppError;
use crate::math::{LmOptions, least_squares};
use crate::model::norm_capacity;

/// Number of model parameters (`tau`, `n`, `Q`).
pub const PARAM_COUNT: usize = 3;

/// Optimized parameters with their standard errors and diagnostics.
#[derive(Debug, Clone)]
pub struct EngineFit {
    pub params: FitParams,
    /// Standard errors: square roots of the covariance diagonal.
    pub sigma: FitParams,
    /// Full parameter covariance, ordered (tau, n, Q).
    pub covariance: [[f64; 3]; 3],
    pub sse: f64,
    pub iterations: usize,
}

/// Fit the discharge model to in-memory arrays.
///
/// Errors when the arrays disagree in length, when there are fewer
/// observations than parameters, or when the solver fails to converge.
pub fn fit_series(
    guess: FitParams,
    rates: &[f64],
    capacities: &[f64],
) -> Result<EngineFit, AppError> {
    if rates.len() != capacities.len() {
        return Err(AppError::new(
            3,
            format!(
                "Rate and capacity arrays disagree in length ({} vs {}).",
                rates.len(),
                capacities.len()
            ),
        ));
    }
    if rates.len() < PARAM_COUNT {
        return Err(AppError::new(
            3,
            format!(
                "Need at least {PARAM_COUNT} observations to fit {PARAM_COUNT} parameters, got {}.",
                rates.len()
            ),
        ));
    }

    let residual = |p: &[f64]| -> Option<DVector<f64>> {
        let params = FitParams::from_slice(p);
        let mut out = DVector::zeros(rates.len());
        for (i, (&rate, &capacity)) in rates.iter().zip(capacities.iter()).enumerate() {
            let y = norm_capacity(rate, &params);
            if !y.is_finite() {
                return None;
            }
            out[i] = y - capacity;
        }
        Some(out)
    };

    let lm = least_squares(residual, &guess.as_array(), &LmOptions::default())?;

    let params = FitParams::from_slice(&lm.params);
    let mut covariance = [[0.0; 3]; 3];
    for (i, row) in covariance.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = lm.covariance[(i, j)];
        }
    }
    let sigma = FitParams {
        tau: covariance[0][0].sqrt(),
        n: covariance[1][1].sqrt(),
        q: covariance[2][2].sqrt(),
    };

    Ok(EngineFit {
        params,
        sigma,
        covariance,
        sse: lm.sse,
        iterations: lm.iterations,
    })
}

/// Fit the discharge model to a two-column delimited file.
///
/// The first row is a header; data rows hold rate in the first column and
/// capacity in the second. Rows with a missing half are dropped, mirroring
/// the wide-table policy.
pub fn fit_csv(path: &Path, guess: FitParams) -> Result<EngineFit, AppError> {
    let (rates, capacities) = read_rate_capacity_csv(path)?;
    fit_series(guess, &rates, &capacities)
}

/// Load a two-column (rate, capacity) CSV.
pub fn read_rate_capacity_csv(path: &Path) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rates = Vec::new();
    let mut capacities = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row, CSV lines are 1-based.
        let line = idx + 2;
        let record =
            result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;
        let rate = parse_cell(record.get(0));
        let capacity = parse_cell(record.get(1));
        if let (Some(rate), Some(capacity)) = (rate, capacity) {
            rates.push(rate);
            capacities.push(capacity);
        }
    }

    Ok((rates, capacities))
}

fn parse_cell(cell: Option<&str>) -> Option<f64> {
    let s = cell?.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

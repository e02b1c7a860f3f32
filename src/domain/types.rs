//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to CSV/JSON
//! - reloaded later for comparisons

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifier of one experimental dataset: the paper it was digitized from
/// and the set number within that paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetKey {
    pub paper: u32,
    pub set: u32,
}

impl std::fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "paper {} set {}", self.paper, self.set)
    }
}

/// One experimental capacity-rate series, already filtered of missing cells.
///
/// Lifetime is scoped to a single batch iteration: extracted from the wide
/// table, consumed by the fit, then discarded.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub key: DatasetKey,
    /// Discharge rates (C-rate), same length as `capacities`.
    pub rates: Vec<f64>,
    /// Normalized capacities (mAh/g).
    pub capacities: Vec<f64>,
}

impl Dataset {
    /// Number of valid (rate, capacity) samples.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// The three physical parameters of the discharge model.
///
/// - `tau`: characteristic rate-lifetime
/// - `n`: rate-discharge exponent
/// - `q`: specific capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub tau: f64,
    pub n: f64,
    pub q: f64,
}

impl FitParams {
    pub const ZERO: FitParams = FitParams {
        tau: 0.0,
        n: 0.0,
        q: 0.0,
    };

    /// Fixed initial guess used by the batch driver.
    pub const DEFAULT_GUESS: FitParams = FitParams {
        tau: 0.5,
        n: 1.0,
        q: 100.0,
    };

    pub fn as_array(self) -> [f64; 3] {
        [self.tau, self.n, self.q]
    }

    pub fn from_slice(p: &[f64]) -> FitParams {
        FitParams {
            tau: p[0],
            n: p[1],
            q: p[2],
        }
    }
}

/// How a dataset's output row was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Genuine converged fit.
    Fitted,
    /// Fewer valid samples than the minimum; the defined zero-fallback row.
    TooFewPoints,
    /// The solver failed to converge; parameters are NaN sentinels.
    Failed,
}

impl FitStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            FitStatus::Fitted => "ok",
            FitStatus::TooFewPoints => "skipped",
            FitStatus::Failed => "failed",
        }
    }
}

/// Per-dataset output row: identifiers, parameters, standard errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitRow {
    pub key: DatasetKey,
    pub params: FitParams,
    /// Standard errors (square roots of the covariance diagonal).
    pub sigma: FitParams,
    pub status: FitStatus,
}

impl FitRow {
    pub fn fitted(key: DatasetKey, params: FitParams, sigma: FitParams) -> FitRow {
        FitRow {
            key,
            params,
            sigma,
            status: FitStatus::Fitted,
        }
    }

    /// Zero-fallback row for an under-populated dataset.
    pub fn zero(key: DatasetKey) -> FitRow {
        FitRow {
            key,
            params: FitParams::ZERO,
            sigma: FitParams::ZERO,
            status: FitStatus::TooFewPoints,
        }
    }

    /// Sentinel row for a dataset whose fit did not converge.
    pub fn failed(key: DatasetKey) -> FitRow {
        let nan = FitParams {
            tau: f64::NAN,
            n: f64::NAN,
            q: f64::NAN,
        };
        FitRow {
            key,
            params: nan,
            sigma: nan,
            status: FitStatus::Failed,
        }
    }
}

/// Ordered collection of per-dataset rows, one row per column pair.
///
/// Built fresh per batch run and written once; never mutated after writing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitTable {
    pub rows: Vec<FitRow>,
}

impl FitTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fixed column header of the exported parameter table.
pub const FIT_TABLE_HEADER: [&str; 8] = [
    "Paper #",
    "Set",
    "tau",
    "n",
    "Q",
    "sigma_tau",
    "sigma_n",
    "sigma_Q",
];

/// Counts of how the batch's datasets were handled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub n_datasets: usize,
    pub n_fitted: usize,
    pub n_skipped: usize,
    pub n_failed: usize,
}

impl BatchStats {
    pub fn from_rows(rows: &[FitRow]) -> BatchStats {
        let mut stats = BatchStats {
            n_datasets: rows.len(),
            ..BatchStats::default()
        };
        for row in rows {
            match row.status {
                FitStatus::Fitted => stats.n_fitted += 1,
                FitStatus::TooFewPoints => stats.n_skipped += 1,
                FitStatus::Failed => stats.n_failed += 1,
            }
        }
        stats
    }
}

/// A full batch run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults). Paths are explicit
/// parameters; there is no process-wide data-directory state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub export_json: Option<PathBuf>,

    /// Initial guess handed to the fit engine for every dataset.
    pub guess: FitParams,
    /// Minimum valid sample count for a fit attempt (inclusive).
    pub min_points: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

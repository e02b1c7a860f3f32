//! Synthetic capacity-rate table generation.
//!
//! Deterministic given a seed; used by the `synth` subcommand and by
//! pipeline tests that need a wide table with known ground truth.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DatasetKey, FitParams};
use crate::error::AppError;
use crate::io::ingest::{Column, WideTable};
use crate::model::norm_capacity;

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub datasets: usize,
    /// Samples per dataset, log-spaced over `[rate_min, rate_max]`.
    pub points: usize,
    pub seed: u64,
    /// Standard deviation of the Gaussian noise on capacities (mAh/g).
    pub noise_sigma: f64,
    /// Probability that a single cell is blanked out.
    pub missing_prob: f64,
    pub rate_min: f64,
    pub rate_max: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            datasets: 4,
            points: 8,
            seed: 42,
            noise_sigma: 1.5,
            missing_prob: 0.0,
            rate_min: 0.1,
            rate_max: 20.0,
        }
    }
}

/// A generated table together with its ground truth.
#[derive(Debug, Clone)]
pub struct SynthData {
    pub table: WideTable,
    pub truth: Vec<(DatasetKey, FitParams)>,
}

/// Generate a wide capacity-rate table from randomly drawn true parameters.
pub fn generate_table(config: &SynthConfig) -> Result<SynthData, AppError> {
    if config.datasets == 0 {
        return Err(AppError::new(2, "Dataset count must be > 0."));
    }
    if config.points < 2 {
        return Err(AppError::new(2, "Points per dataset must be >= 2."));
    }
    if !(config.rate_min.is_finite()
        && config.rate_max.is_finite()
        && config.rate_min > 0.0
        && config.rate_max > config.rate_min)
    {
        return Err(AppError::new(2, "Invalid rate range for table generation."));
    }
    if !(0.0..1.0).contains(&config.missing_prob) {
        return Err(AppError::new(2, "Missing-cell probability must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sigma.max(0.0))
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    let rates = log_spaced_rates(config.rate_min, config.rate_max, config.points);

    let mut columns = Vec::with_capacity(config.datasets * 2);
    let mut truth = Vec::with_capacity(config.datasets);

    for d in 0..config.datasets {
        let key = DatasetKey {
            paper: 1,
            set: d as u32 + 1,
        };
        let params = FitParams {
            tau: rng.gen_range(0.05..2.0),
            n: rng.gen_range(0.6..1.8),
            q: rng.gen_range(60.0..180.0),
        };

        let mut rate_values = Vec::with_capacity(config.points);
        let mut cap_values = Vec::with_capacity(config.points);
        for &rate in &rates {
            let capacity = norm_capacity(rate, &params) + noise.sample(&mut rng);
            let rate_cell =
                (config.missing_prob == 0.0 || rng.r#gen::<f64>() >= config.missing_prob)
                    .then_some(rate);
            let cap_cell =
                (config.missing_prob == 0.0 || rng.r#gen::<f64>() >= config.missing_prob)
                    .then_some(capacity);
            rate_values.push(rate_cell);
            cap_values.push(cap_cell);
        }

        let paper_label = format!("paper # {}", key.paper);
        let set_label = format!("set # {}", key.set);
        columns.push(Column {
            paper_label: paper_label.clone(),
            set_label: set_label.clone(),
            quantity_label: "C-rate".to_string(),
            values: rate_values,
        });
        columns.push(Column {
            paper_label,
            set_label,
            quantity_label: "Capacity (mAh/g)".to_string(),
            values: cap_values,
        });

        truth.push((key, params));
    }

    Ok(SynthData {
        table: WideTable { columns },
        truth,
    })
}

fn log_spaced_rates(min: f64, max: f64, steps: usize) -> Vec<f64> {
    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);
    (0..steps)
        .map(|i| (ln_min + step * i as f64).exp())
        .collect()
}

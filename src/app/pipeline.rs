//! Shared batch pipeline logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> dataset extraction -> per-dataset fit -> table assembly
//!
//! The CLI front-end can then focus on presentation (printing vs exports).

use rayon::prelude::*;

use crate::domain::{BatchConfig, BatchStats, Dataset, FitRow, FitTable};
use crate::error::AppError;
use crate::fit;
use crate::io::ingest::{self, WideTable};

/// All computed outputs of a single batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub table: FitTable,
    pub stats: BatchStats,
    /// The extracted datasets, kept around for plotting.
    pub datasets: Vec<Dataset>,
}

/// Execute the full batch pipeline: load the wide table and fit every
/// column pair.
pub fn run_batch(config: &BatchConfig) -> Result<BatchOutput, AppError> {
    let table = ingest::load_wide_table(&config.input_path)?;
    run_batch_with_table(config, &table)
}

/// Execute the batch pipeline with a pre-parsed table.
///
/// This is useful for tests and for callers that already hold a table.
pub fn run_batch_with_table(
    config: &BatchConfig,
    table: &WideTable,
) -> Result<BatchOutput, AppError> {
    let datasets = ingest::extract_datasets(table)?;

    // Each dataset is independent, so fits run in parallel; the collected
    // rows keep the original column-pair order.
    let rows: Vec<FitRow> = datasets
        .par_iter()
        .map(|ds| fit_dataset(ds, config))
        .collect();

    let stats = BatchStats::from_rows(&rows);
    Ok(BatchOutput {
        table: FitTable { rows },
        stats,
        datasets,
    })
}

/// Fit one dataset, applying the minimum-sample-count policy.
///
/// Under-populated datasets produce the defined zero-fallback row (not an
/// error). A solver failure must not abort the whole batch; it is recorded
/// as a NaN sentinel row and reported on stderr.
fn fit_dataset(ds: &Dataset, config: &BatchConfig) -> FitRow {
    if ds.len() < config.min_points {
        return FitRow::zero(ds.key);
    }

    match fit::fit_series(config.guess, &ds.rates, &ds.capacities) {
        Ok(fit) => FitRow::fitted(ds.key, fit.params, fit.sigma),
        Err(err) => {
            eprintln!("warning: fit failed for {}: {err}", ds.key);
            FitRow::failed(ds.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParams, FitStatus};
    use crate::io::ingest::read_wide_table;
    use std::path::PathBuf;

    fn test_config() -> BatchConfig {
        BatchConfig {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            export_json: None,
            guess: FitParams::DEFAULT_GUESS,
            min_points: 4,
            plot: false,
            plot_width: 100,
            plot_height: 25,
        }
    }

    fn run(csv: &str) -> BatchOutput {
        let table = read_wide_table(csv.as_bytes()).unwrap();
        run_batch_with_table(&test_config(), &table).unwrap()
    }

    #[test]
    fn three_valid_points_get_the_zero_fallback_row() {
        let csv = "\
paper # 1,paper # 1
set # 1,set # 1
C-rate,Capacity (mAh/g)
0.5,90
1,80
2,60
5,
";
        let output = run(csv);
        assert_eq!(output.table.len(), 1);
        let row = &output.table.rows[0];
        assert_eq!(row.status, FitStatus::TooFewPoints);
        assert_eq!(row.params.tau, 0.0);
        assert_eq!(row.params.n, 0.0);
        assert_eq!(row.params.q, 0.0);
        assert_eq!(row.sigma.tau, 0.0);
        assert_eq!(row.sigma.n, 0.0);
        assert_eq!(row.sigma.q, 0.0);
    }

    #[test]
    fn four_valid_points_get_a_genuine_fit() {
        // Boundary is inclusive at >= 4.
        let csv = "\
paper # 1,paper # 1
set # 1,set # 1
C-rate,Capacity (mAh/g)
0.5,90
1,80
2,60
5,20
";
        let output = run(csv);
        assert_eq!(output.table.len(), 1);
        let row = &output.table.rows[0];
        assert_eq!(row.status, FitStatus::Fitted);
        assert!(row.params.q != 0.0);
    }

    #[test]
    fn row_count_equals_pair_count_regardless_of_missing_density() {
        // Pair 2 is entirely missing; it still yields a (zero) row.
        let csv = "\
paper # 1,paper # 1,paper # 1,paper # 1,paper # 2,paper # 2
set # 1,set # 1,set # 2,set # 2,set # 1,set # 1
C-rate,Capacity (mAh/g),C-rate,Capacity (mAh/g),C-rate,Capacity (mAh/g)
0.5,90,,,0.2,95
1,80,,,0.5,88
2,60,,,1,75
5,20,,,2,61
10,8,,,5,30
";
        let output = run(csv);
        assert_eq!(output.table.len(), 3);
        assert_eq!(output.stats.n_datasets, 3);
        assert_eq!(output.stats.n_fitted, 2);
        assert_eq!(output.stats.n_skipped, 1);
        assert_eq!(output.table.rows[1].status, FitStatus::TooFewPoints);
    }

    #[test]
    fn end_to_end_two_pair_scenario() {
        let csv = "\
paper # 1,paper # 1,paper # 1,paper # 1
set # 1,set # 1,set # 2,set # 2
C-rate,Capacity (mAh/g),C-rate,Capacity (mAh/g)
0.5,90,0.2,95
1,80,0.5,88
2,60,,
5,20,,
";
        let output = run(csv);
        assert_eq!(output.table.len(), 2);

        // Row 2: only 2 valid points -> all zeros.
        let row2 = &output.table.rows[1];
        assert_eq!(row2.key.paper, 1);
        assert_eq!(row2.key.set, 2);
        assert_eq!(row2.params.tau, 0.0);
        assert_eq!(row2.params.n, 0.0);
        assert_eq!(row2.params.q, 0.0);
        assert_eq!(row2.sigma.tau, 0.0);
        assert_eq!(row2.sigma.n, 0.0);
        assert_eq!(row2.sigma.q, 0.0);

        // Row 1: a genuine fit; Q roughly bounded between the max observed
        // capacity and a modest extrapolation above it.
        let row1 = &output.table.rows[0];
        assert_eq!(row1.status, FitStatus::Fitted);
        assert!(row1.params.q > 80.0);
        assert!(row1.params.q < 300.0);
        assert!(row1.params.tau != 0.0);
        assert!(row1.params.n != 0.0);
    }

    #[test]
    fn rows_preserve_column_pair_order() {
        let csv = "\
paper # 3,paper # 3,paper # 1,paper # 1,paper # 2,paper # 2
set # 2,set # 2,set # 1,set # 1,set # 9,set # 9
C-rate,Capacity,C-rate,Capacity,C-rate,Capacity
0.5,90,0.5,91,0.5,92
1,80,1,81,1,82
2,60,2,61,2,62
";
        let output = run(csv);
        let keys: Vec<(u32, u32)> = output
            .table
            .rows
            .iter()
            .map(|r| (r.key.paper, r.key.set))
            .collect();
        assert_eq!(keys, vec![(3, 2), (1, 1), (2, 9)]);
    }

    #[test]
    fn synthetic_truth_is_recovered_without_noise() {
        use crate::data::{SynthConfig, generate_table};

        let data = generate_table(&SynthConfig {
            datasets: 3,
            points: 10,
            seed: 7,
            noise_sigma: 0.0,
            missing_prob: 0.0,
            rate_min: 0.1,
            rate_max: 20.0,
        })
        .unwrap();

        let output = run_batch_with_table(&test_config(), &data.table).unwrap();
        assert_eq!(output.table.len(), 3);

        for (row, (key, truth)) in output.table.rows.iter().zip(data.truth.iter()) {
            assert_eq!(row.key, *key);
            if row.status != FitStatus::Fitted {
                continue; // a pathological draw may legitimately fail
            }
            assert!((row.params.q - truth.q).abs() / truth.q < 1e-2);
        }
    }
}

//! Reporting utilities: formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{BatchConfig, BatchStats, FitTable};
use crate::fit::EngineFit;

/// Format the batch run summary (dataset counts + parameter table).
pub fn format_run_summary(table: &FitTable, stats: &BatchStats, config: &BatchConfig) -> String {
    let mut out = String::new();

    out.push_str("=== ratecap - capacity-rate batch fit ===\n");
    out.push_str(&format!("Input: {}\n", config.input_path.display()));
    out.push_str(&format!(
        "Initial guess: tau0={} n0={} Q0={}\n",
        config.guess.tau, config.guess.n, config.guess.q
    ));
    out.push_str(&format!(
        "Datasets: {} | fitted: {} | skipped (<{} points): {} | failed: {}\n",
        stats.n_datasets, stats.n_fitted, config.min_points, stats.n_skipped, stats.n_failed
    ));
    out.push('\n');
    out.push_str(&format_fit_table(table));

    out
}

/// Format the parameter table with aligned columns.
pub fn format_fit_table(table: &FitTable) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:>7} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}  {:<8}\n",
            "Paper #", "Set", "tau", "n", "Q", "sigma_tau", "sigma_n", "sigma_Q", "status"
        )
        .trim_end(),
    );
    out.push('\n');

    for row in &table.rows {
        out.push_str(
            format!(
                "{:>7} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}  {:<8}\n",
                row.key.paper,
                row.key.set,
                fmt_param(row.params.tau),
                fmt_param(row.params.n),
                fmt_param(row.params.q),
                fmt_param(row.sigma.tau),
                fmt_param(row.sigma.n),
                fmt_param(row.sigma.q),
                row.status.display_name(),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format a single-dataset fit for the `fit` subcommand.
pub fn format_engine_fit(fit: &EngineFit) -> String {
    let mut out = String::new();
    out.push_str("Fitted discharge model parameters:\n");
    out.push_str(&format!(
        "- tau = {} ± {}\n",
        fmt_param(fit.params.tau),
        fmt_param(fit.sigma.tau)
    ));
    out.push_str(&format!(
        "- n   = {} ± {}\n",
        fmt_param(fit.params.n),
        fmt_param(fit.sigma.n)
    ));
    out.push_str(&format!(
        "- Q   = {} ± {}\n",
        fmt_param(fit.params.q),
        fmt_param(fit.sigma.q)
    ));
    out.push_str(&format!(
        "SSE={:.6} | iterations={}\n",
        fit.sse, fit.iterations
    ));
    out
}

fn fmt_param(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    format!("{v:.4}")
}

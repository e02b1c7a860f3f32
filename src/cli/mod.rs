//! Command-line parsing for the capacity-rate fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ratecap", version, about = "Battery rate-capability curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every dataset of a wide capacity-rate table and write the parameter table.
    Batch(BatchArgs),
    /// Fit a single two-column (rate, capacity) CSV and print the parameters.
    Fit(FitArgs),
    /// Plot the datasets of a wide table as a clustered terminal scatter.
    Plot(PlotArgs),
    /// Generate a synthetic wide table with known ground truth.
    Synth(SynthArgs),
}

/// Options for the batch fit.
#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Wide capacity-rate table (CSV with three header rows).
    pub input: PathBuf,

    /// Output CSV for the fitted parameter table.
    #[arg(short = 'o', long, default_value = "fitparameters.csv")]
    pub output: PathBuf,

    /// Initial guess for tau (characteristic rate-lifetime).
    #[arg(long, default_value_t = 0.5)]
    pub tau0: f64,

    /// Initial guess for n (rate-discharge exponent).
    #[arg(long, default_value_t = 1.0)]
    pub n0: f64,

    /// Initial guess for Q (specific capacity).
    #[arg(long, default_value_t = 100.0)]
    pub q0: f64,

    /// Minimum valid sample count for a fit attempt (inclusive).
    #[arg(long, default_value_t = 4)]
    pub min_points: usize,

    /// Also export the fit table (with per-row status) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Render a terminal scatter of all datasets after fitting.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for a single-dataset fit.
#[derive(Debug, Parser)]
pub struct FitArgs {
    /// Two-column CSV: rate in the first column, capacity in the second.
    pub input: PathBuf,

    /// Initial guess for tau.
    #[arg(long, default_value_t = 0.5)]
    pub tau0: f64,

    /// Initial guess for n.
    #[arg(long, default_value_t = 1.0)]
    pub n0: f64,

    /// Initial guess for Q.
    #[arg(long, default_value_t = 100.0)]
    pub q0: f64,

    /// Render the data and the fitted curve in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for plotting a wide table.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Wide capacity-rate table (CSV with three header rows).
    pub input: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for synthetic table generation.
#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Output CSV for the generated wide table.
    #[arg(short = 'o', long, default_value = "synthetic_capacityrate.csv")]
    pub output: PathBuf,

    /// Number of datasets (column pairs).
    #[arg(long, default_value_t = 4)]
    pub datasets: usize,

    /// Samples per dataset.
    #[arg(long, default_value_t = 8)]
    pub points: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Gaussian noise sigma on capacities (mAh/g).
    #[arg(long, default_value_t = 1.5)]
    pub noise: f64,

    /// Probability that a single cell is blanked out.
    #[arg(long, default_value_t = 0.0)]
    pub missing_prob: f64,

    /// Smallest discharge rate (C).
    #[arg(long, default_value_t = 0.1)]
    pub rate_min: f64,

    /// Largest discharge rate (C).
    #[arg(long, default_value_t = 20.0)]
    pub rate_max: f64,
}

//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads or generates tables
//! - runs the batch fit pipeline
//! - prints reports/plots
//! - writes exports

use clap::Parser;

use crate::cli::{BatchArgs, Cli, Command, FitArgs, PlotArgs, SynthArgs};
use crate::data::SynthConfig;
use crate::domain::{BatchConfig, Dataset, FitParams};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ratecap` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Batch(args) => handle_batch(args),
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = batch_config_from_args(&args);
    let output = pipeline::run_batch(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&output.table, &output.stats, &config)
    );

    if config.plot {
        let (points, assignment) = clustered_points(&output.datasets);
        println!(
            "{}",
            crate::plot::render_clustered_points(
                &points,
                &assignment,
                config.plot_width,
                config.plot_height
            )
        );
    }

    crate::io::write_fit_table_csv(&config.output_path, &output.table)?;
    if let Some(path) = &config.export_json {
        crate::io::write_fit_table_json(path, &output.table)?;
    }

    println!(
        "Wrote {} rows to '{}'.",
        output.table.len(),
        config.output_path.display()
    );
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let guess = FitParams {
        tau: args.tau0,
        n: args.n0,
        q: args.q0,
    };
    let (rates, capacities) = crate::fit::read_rate_capacity_csv(&args.input)?;
    let fit = crate::fit::fit_series(guess, &rates, &capacities)?;

    println!("{}", crate::report::format_engine_fit(&fit));

    if args.plot {
        println!(
            "{}",
            crate::plot::render_fit_plot(&rates, &capacities, &fit.params, args.width, args.height)
        );
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let table = crate::io::load_wide_table(&args.input)?;
    let datasets = crate::io::extract_datasets(&table)?;

    let (points, assignment) = clustered_points(&datasets);
    println!(
        "{}",
        crate::plot::render_clustered_points(&points, &assignment, args.width, args.height)
    );

    for (i, ds) in datasets.iter().enumerate() {
        let glyph = crate::plot::CLUSTER_GLYPHS[i % crate::plot::CLUSTER_GLYPHS.len()];
        println!("{glyph}: {} ({} points)", ds.key, ds.len());
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        datasets: args.datasets,
        points: args.points,
        seed: args.seed,
        noise_sigma: args.noise,
        missing_prob: args.missing_prob,
        rate_min: args.rate_min,
        rate_max: args.rate_max,
    };
    let data = crate::data::generate_table(&config)?;
    crate::io::write_wide_table_csv(&args.output, &data.table)?;

    println!(
        "Wrote {} datasets x {} points to '{}' (seed {}).",
        config.datasets,
        config.points,
        args.output.display(),
        config.seed
    );
    Ok(())
}

pub fn batch_config_from_args(args: &BatchArgs) -> BatchConfig {
    BatchConfig {
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        export_json: args.export_json.clone(),
        guess: FitParams {
            tau: args.tau0,
            n: args.n0,
            q: args.q0,
        },
        min_points: args.min_points,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}

/// Flatten datasets into (rate, capacity) points with a per-point cluster
/// assignment (one cluster per dataset) for the scatter plot.
fn clustered_points(datasets: &[Dataset]) -> (Vec<(f64, f64)>, Vec<usize>) {
    let mut points = Vec::new();
    let mut assignment = Vec::new();
    for (i, ds) in datasets.iter().enumerate() {
        for (&r, &c) in ds.rates.iter().zip(ds.capacities.iter()) {
            points.push((r, c));
            assignment.push(i);
        }
    }
    (points, assignment)
}

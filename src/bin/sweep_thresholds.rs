#!/usr/bin/env rust
//! Risk Threshold Sensitivity Sweep
//!
//! Re-runs the full analysis of one observation file across a grid of
//! `risk_threshold` values, in parallel, to show how period counts and total
//! risk hours respond to the threshold. Every other parameter comes from
//! the parameter file.
//!
//! For each threshold in the grid:
//! 1. Clone the base parameter set with the new threshold
//! 2. Analyze the observation file on a worker thread
//! 3. Summarize periods, risk hours and severity counts
//!
//! Usage:
//!   cargo run --bin sweep_thresholds -- observations.json
//!
//! Options:
//!   --from X      First threshold (default 0.2)
//!   --to X        Last threshold (default 0.8)
//!   --step X      Grid step (default 0.05)
//!   --workers N   Worker threads (default 4)
//!   --params PATH Base parameter file (default: DRIFTMON_PARAMS or parameters.toml)
//!
//! Environment:
//!   DRIFTMON_PARAMS - parameter file path
//!   RUST_LOG        - log filter (default: info)

use driftmon_service::analysis::batch::{summarize, sweep};
use driftmon_service::config::{ParameterSet, load_parameters, parameters_path};
use driftmon_service::ingest::observations::load_observations;
use driftmon_service::logging;
use std::env;
use std::sync::Arc;

fn option<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Inclusive threshold grid, rounded to avoid accumulated float drift.
fn threshold_grid(from: f64, to: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || to < from {
        return vec![from];
    }
    let steps = ((to - from) / step + 1e-9).floor() as usize;
    (0..=steps)
        .map(|i| ((from + step * i as f64) * 1e6).round() / 1e6)
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    println!("❄️  Risk Threshold Sweep");
    println!("========================\n");

    let args: Vec<String> = env::args().collect();
    let from = option(&args, "--from", 0.2);
    let to = option(&args, "--to", 0.8);
    let step = option(&args, "--step", 0.05);
    let workers = option(&args, "--workers", 4usize);
    let params_path = args
        .iter()
        .position(|a| a == "--params")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(parameters_path);

    let Some(observations_path) = args.last().filter(|a| a.ends_with(".json")).cloned() else {
        eprintln!("Usage: {} [options] OBSERVATIONS.json", args[0]);
        std::process::exit(1);
    };

    println!("⚙️  Loading base parameters from {}...", params_path);
    let (base, warnings) = load_parameters(&params_path)?;
    for w in &warnings {
        println!("   ⚠️  {}", w);
    }

    let observations = load_observations(&observations_path)?;
    println!("✓ Loaded {} observations from {}\n", observations.len(), observations_path);

    let grid = threshold_grid(from, to, step);
    let parameter_sets: Vec<ParameterSet> = grid
        .iter()
        .map(|t| ParameterSet { risk_threshold: *t, ..base.clone() })
        .collect();

    println!("🔄 Sweeping {} thresholds on {} workers...\n", grid.len(), workers);
    let outcomes = sweep(Arc::from(observations), parameter_sets, workers);

    println!("   {:>9}  {:>7}  {:>8}  {:>5}  {:>8}  {:>6}", "threshold", "periods", "hours", "minor", "moderate", "severe");
    for (threshold, outcome) in grid.iter().zip(&outcomes) {
        match &outcome.result {
            Ok(analysis) => {
                let s = summarize(analysis);
                let count = |label: &str| s.by_severity.get(label).copied().unwrap_or(0);
                println!(
                    "   {:>9.3}  {:>7}  {:>8.1}  {:>5}  {:>8}  {:>6}",
                    threshold,
                    s.periods,
                    s.total_hours,
                    count("minor"),
                    count("moderate"),
                    count("severe"),
                );
            }
            Err(e) => println!("   {:>9.3}  ✗ {}", threshold, e),
        }
    }

    println!("\n✓ Sweep complete");
    Ok(())
}

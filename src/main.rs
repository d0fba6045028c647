//! Snow-Drift Risk Monitor - station file analysis
//!
//! Scores one station's observation file and reports the drift-risk periods
//! found in it:
//! 1. Loads and validates the parameter set (parameters.toml)
//! 2. Parses the observation file (JSON array, RFC 3339 timestamps)
//! 3. Normalizes, scores, detects, merges and classifies periods
//! 4. Prints a summary, or the full analysis as JSON
//!
//! Usage:
//!   cargo run --release -- observations.json
//!   cargo run --release -- --params alpine.toml observations.json
//!   cargo run --release -- --json observations.json > analysis.json
//!   cargo run --release -- --stream observations.json   # replay as a live feed
//!
//! Environment:
//!   DRIFTMON_PARAMS - parameter file path (default: parameters.toml)
//!   RUST_LOG        - log filter (default: info)

use driftmon_service::analysis::batch::summarize;
use driftmon_service::analysis::pipeline::analyze;
use driftmon_service::analysis::streaming::DriftMonitor;
use driftmon_service::config::{ParameterSet, load_parameters, parameters_path};
use driftmon_service::ingest::observations::load_observations;
use driftmon_service::logging;
use driftmon_service::model::{Period, WeatherObservation};
use std::env;
use std::error::Error;

struct Options {
    params_path: String,
    observations_path: String,
    json: bool,
    stream: bool,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--params PATH] [--json] [--stream] OBSERVATIONS.json", program);
    std::process::exit(1);
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().collect();
    let mut params_path = None;
    let mut observations_path = None;
    let mut json = false;
    let mut stream = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--params" => {
                if i + 1 < args.len() {
                    params_path = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --params requires a file path");
                    std::process::exit(1);
                }
            }
            "--json" => {
                json = true;
                i += 1;
            }
            "--stream" => {
                stream = true;
                i += 1;
            }
            arg if arg.starts_with("--") => {
                eprintln!("Unknown argument: {}", arg);
                usage(&args[0]);
            }
            path => {
                observations_path = Some(path.to_string());
                i += 1;
            }
        }
    }

    let Some(observations_path) = observations_path else {
        usage(&args[0]);
    };

    Options {
        params_path: params_path.unwrap_or_else(parameters_path),
        observations_path,
        json,
        stream,
    }
}

fn print_period(p: &Period) {
    let label = |v: Option<&'static str>| v.unwrap_or("-");
    println!(
        "   #{:<3} {} → {}  {:>3} obs  max {:.2}  wind {:.1}/{:.1} m/s  min {:.1}°C  {:<8} {}",
        p.id,
        p.start.format("%Y-%m-%d %H:%M"),
        p.end.format("%Y-%m-%d %H:%M"),
        p.duration,
        p.max_score,
        p.max_wind,
        p.max_gust,
        p.min_temperature,
        label(p.intensity.map(|i| i.as_str())),
        label(p.severity.map(|s| s.as_str())),
    );
}

fn run_batch(observations: &[WeatherObservation], params: &ParameterSet, json: bool) -> Result<(), Box<dyn Error>> {
    let analysis = analyze(observations, params)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let summary = summarize(&analysis);
    println!("📊 Analysis summary");
    println!("   Observations: {} ({} degraded)", summary.observations, summary.degraded);
    println!(
        "   Normalization: {} measured, {} interpolated, {} edge-filled, {} defaulted, {} rejected",
        analysis.normalization.measured,
        analysis.normalization.interpolated,
        analysis.normalization.edge_filled,
        analysis.normalization.defaulted,
        analysis.normalization.rejected,
    );
    println!("   Peak score: {:.3}", summary.peak_score);
    println!("   Periods: {} ({:.1} h total)\n", summary.periods, summary.total_hours);

    for p in &analysis.periods {
        print_period(p);
    }
    if analysis.periods.is_empty() {
        println!("   ✓ No drift-risk periods");
    }
    Ok(())
}

fn run_stream(observations: Vec<WeatherObservation>, params: ParameterSet, json: bool) -> Result<(), Box<dyn Error>> {
    let mut monitor = DriftMonitor::new(params)?;
    let mut finalized = Vec::new();

    for obs in observations {
        monitor.push(obs)?;
        for p in monitor.poll()? {
            if !json {
                print_period(&p);
            }
            finalized.push(p);
        }
    }

    let open = monitor.provisional();
    if json {
        let out = serde_json::json!({ "finalized": finalized, "provisional": open });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("\n   Finalized: {}", monitor.finalized_count());
    match open {
        Some(p) => {
            println!("   ⏳ Provisional period still open:");
            print_period(&p);
        }
        None => println!("   No open period"),
    }
    Ok(())
}

fn main() {
    logging::init();
    let options = parse_args();

    if !options.json {
        println!("❄️  Snow-Drift Risk Monitor");
        println!("==========================\n");
    }

    let (params, warnings) = match load_parameters(&options.params_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Parameter file {} rejected: {}\n", options.params_path, e);
            std::process::exit(1);
        }
    };
    if !options.json {
        println!("✓ Parameters loaded from {}", options.params_path);
        for w in &warnings {
            println!("   ⚠️  {}", w);
        }
    }

    let observations = match load_observations(&options.observations_path) {
        Ok(obs) => obs,
        Err(e) => {
            eprintln!("\n❌ Failed to load observations: {}\n", e);
            std::process::exit(1);
        }
    };
    if !options.json {
        println!("✓ Loaded {} observations from {}\n", observations.len(), options.observations_path);
    }

    let result = if options.stream {
        run_stream(observations, params, options.json)
    } else {
        run_batch(&observations, &params, options.json)
    };

    if let Err(e) = result {
        eprintln!("\n❌ Analysis failed: {}", e);
        std::process::exit(1);
    }
}

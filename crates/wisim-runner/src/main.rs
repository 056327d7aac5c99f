//! # wisim
//!
//! Command-line entry point: resolve a scenario by name, run it, and report
//! run statistics, handover records, and optionally collected metrics.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wisim_common::entity_tracer::{EntityTracer, EntityTracerConfig};
use wisim_model::ScenarioEnvironment;
use wisim_runner::metrics_export::{export_json, InMemoryRecorder};
use wisim_runner::{
    load_config, load_environment, EventLoop, RunnerError, ScenarioConfig, ScenarioRegistry,
    SimulationStats,
};

/// Parse a human-friendly duration into seconds.
///
/// Accepts a plain number ("90", "1.5") or unit-suffixed segments that add
/// up ("45s", "10m", "2h", "1h30m"). A trailing bare number counts as
/// seconds, so "1m30" is ninety seconds.
fn parse_duration(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(value) = s.parse::<f64>() {
        return Ok(value);
    }

    let mut total = 0.0;
    let mut number = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else {
            if number.is_empty() {
                return Err(format!("unit '{}' is missing a number", c));
            }
            let value: f64 = number
                .parse()
                .map_err(|_| format!("invalid number '{}'", number))?;
            let multiplier = match c {
                's' => 1.0,
                'm' => 60.0,
                'h' => 3600.0,
                'd' => 86400.0,
                other => return Err(format!("unknown duration unit '{}'", other)),
            };
            total += value * multiplier;
            number.clear();
        }
    }
    if !number.is_empty() {
        total += number
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", number))?;
    }
    Ok(total)
}

/// wisim - indoor Wi-Fi mobility and handover simulator
#[derive(Parser, Debug)]
#[command(name = "wisim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scenario
    Run(RunnerConfig),
    /// List the built-in scenarios
    List,
}

/// Options for one simulation run.
#[derive(Parser, Debug)]
struct RunnerConfig {
    /// Scenario name (see `wisim list`)
    #[arg(short, long)]
    scenario: String,

    /// Map document (GeoJSON-style) providing APs, doors, and seats
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Scenario parameter file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (default: random)
    #[arg(long)]
    seed: Option<u64>,

    /// Duration override: plain seconds or unit-suffixed, e.g. 90, 45s, 10m, 1h30m
    #[arg(short, long, value_parser = parse_duration)]
    duration: Option<f64>,

    /// Trace entities: comma-separated names, "entity:ID" forms, or "*"
    #[arg(long)]
    trace: Option<String>,

    /// Write handover records to this file (JSON array)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export collected metrics at the end of the run
    #[arg(long, value_enum)]
    metrics_output: Option<MetricsOutputFormat>,

    /// Where to write metrics (stdout if not given)
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetricsOutputFormat {
    /// Nested JSON with totals and a per-station breakdown
    Json,
}

fn run_simulation(config: RunnerConfig) -> Result<SimulationStats, RunnerError> {
    // The recorder must be live before the first macro fires.
    let recorder = if config.metrics_output.is_some() {
        let recorder = Arc::new(InMemoryRecorder::new());
        if let Err(e) = metrics::set_global_recorder(recorder.clone()) {
            eprintln!("Warning: failed to set metrics recorder: {}", e);
            None
        } else {
            wisim_metrics::describe_metrics();
            Some(recorder)
        }
    } else {
        None
    };

    let mut parameters = match &config.config {
        Some(path) => load_config(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(duration_secs) = config.duration {
        parameters.duration_secs = duration_secs;
    }

    let environment = match &config.map {
        Some(path) => {
            let (environment, report) = load_environment(path)?;
            info!(
                "map loaded: {} APs, {} doors, {} seats, {} obstacles ({} features skipped)",
                environment.access_points.len(),
                environment.doors.len(),
                environment.seats.len(),
                environment.obstacles.len(),
                report.skipped
            );
            environment
        }
        None => ScenarioEnvironment::default(),
    };

    let seed = config.seed.unwrap_or_else(|| {
        use rand::Rng;
        rand::thread_rng().gen()
    });
    info!("seed {}", seed);

    let registry = ScenarioRegistry::builtin();
    let scenario = registry
        .get(&config.scenario)
        .ok_or_else(|| RunnerError::UnknownScenario(config.scenario.clone()))?;
    let simulation = scenario.build(&parameters, &environment, seed)?;
    info!(
        "scenario '{}' built: {} entities, {} stations, runs to {}",
        scenario.name(),
        simulation.entities.len(),
        simulation.node_count,
        parameters.end_time()
    );

    let tracer = match &config.trace {
        Some(spec) => {
            let tracer_config = EntityTracerConfig::from_spec(spec);
            if tracer_config.is_enabled() {
                info!("entity tracing enabled for: {}", spec);
            }
            EntityTracer::new(tracer_config)
        }
        None => EntityTracer::disabled(),
    };

    let shutdown_time = simulation.shutdown_time;
    let mut event_loop = EventLoop::new(simulation, seed, tracer);
    let stats = event_loop.run(shutdown_time)?;

    event_loop.handover_log().emit_summary();
    if let Some(ref path) = config.output {
        event_loop.handover_log().write_json(path)?;
        info!("handover records written to {}", path.display());
    }

    if let Some(MetricsOutputFormat::Json) = config.metrics_output {
        if let Some(recorder) = recorder {
            let snapshot = recorder.snapshot();
            match &config.metrics_file {
                Some(path) => {
                    let mut file = std::fs::File::create(path)?;
                    export_json(&snapshot, &mut file)?;
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut handle = stdout.lock();
                    export_json(&snapshot, &mut handle)?;
                }
            }
        }
    }

    Ok(stats)
}

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(config) if config.verbose => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run(config) => {
            let metrics_to_stdout =
                config.metrics_output.is_some() && config.metrics_file.is_none();
            let stats = run_simulation(config)?;
            // Keep stdout clean when the metrics export goes there.
            if !metrics_to_stdout {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
        Commands::List => {
            let registry = ScenarioRegistry::builtin();
            println!("Available scenarios:");
            for scenario in registry.iter() {
                println!("  {:<18} {}", scenario.name(), scenario.description());
            }
        }
    }

    Ok(())
}

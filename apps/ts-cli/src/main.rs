use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use ts_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, SeriesKind, query,
    run_service, scenario_service,
};
use ts_dynamics::PluginRegistry;
use ts_results::RunStore;
use ts_sim::RunStatus;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(about = "TwinSec CLI - OT telemetry simulation under cyber attack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file against the schema and its plugin
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// List registered dynamics plugins
    Plugins,
    /// Run a scenario to completion
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Extra attack plan appended to the scenario's attacks
        #[arg(long)]
        attacks: Option<PathBuf>,
        /// Seed for the noise attack RNG
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Wall-clock delay after each step in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,
        /// Stop the run after this many wall-clock seconds
        #[arg(long)]
        stop_after: Option<f64>,
        /// Run id to use instead of a generated one
        #[arg(long)]
        run_id: Option<String>,
        /// Directory holding stored runs
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
    /// List stored runs
    Runs {
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
    /// Show details of a stored run
    ShowRun {
        /// Run ID to display
        run_id: String,
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
    /// Export one signal of a run as CSV
    ExportSeries {
        /// Run ID
        run_id: String,
        /// Signal name (e.g., tank.level_sensor)
        signal: String,
        /// Which view of the signal to export
        #[arg(long, value_enum, default_value_t = KindArg::Observed)]
        kind: KindArg,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Real,
    Observed,
    Control,
}

impl From<KindArg> for SeriesKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Real => SeriesKind::Real,
            KindArg::Observed => SeriesKind::Observed,
            KindArg::Control => SeriesKind::Control,
        }
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Plugins => cmd_plugins(),
        Commands::Run {
            scenario_path,
            attacks,
            seed,
            pace_ms,
            stop_after,
            run_id,
            out,
        } => cmd_run(
            &scenario_path,
            attacks.as_deref(),
            RunOptions {
                seed,
                pacing: pace_ms.map(Duration::from_millis),
                run_id,
                keep_telemetry: false,
                ..RunOptions::default()
            },
            stop_after,
            &out,
        ),
        Commands::Runs { out } => cmd_runs(&out),
        Commands::ShowRun { run_id, out } => cmd_show_run(&out, &run_id),
        Commands::ExportSeries {
            run_id,
            signal,
            kind,
            output,
            out,
        } => cmd_export_series(&out, &run_id, &signal, kind.into(), output.as_deref()),
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = scenario_service::load_scenario(scenario_path)?;
    let summary = scenario_service::summarize_scenario(&scenario, &PluginRegistry::with_builtin())?;
    println!("✓ Scenario is valid");
    println!(
        "  {} ({}) - {} steps of {} s with {}, controller: {}, attacks: {}",
        summary.model_name,
        summary.model_type,
        summary.steps,
        summary.dt,
        summary.method,
        summary.controller,
        summary.attack_count
    );
    Ok(())
}

fn cmd_plugins() -> AppResult<()> {
    let registry = PluginRegistry::with_builtin();
    println!("Registered model types:");
    for model_type in scenario_service::list_model_types(&registry) {
        println!("  {}", model_type);
    }
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    attack_plan: Option<&Path>,
    options: RunOptions,
    stop_after: Option<f64>,
    out: &Path,
) -> AppResult<()> {
    let mut scenario = scenario_service::load_scenario(scenario_path)?;
    if let Some(path) = attack_plan {
        let extra = scenario_service::load_attack_plan(path)?;
        println!("Adding {} attacks from {}", extra.len(), path.display());
        scenario.attacks.extend(extra);
    }
    println!(
        "Running scenario '{}' ({} attacks)",
        scenario.name,
        scenario.attacks.len()
    );

    let store = RunStore::new(out.to_path_buf())?;
    let request = RunRequest::new(scenario)
        .with_options(options)
        .with_store(store);
    let handle = run_service::spawn_run(request)?;

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    loop {
        while let Some(event) = handle.try_progress() {
            let fraction = event
                .simulation
                .as_ref()
                .map(|p| p.fraction_complete)
                .unwrap_or(-1.0);
            let emit_now = (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }
        if handle.is_finished() {
            break;
        }
        if let Some(limit) = stop_after {
            if started.elapsed().as_secs_f64() >= limit && handle.stop() {
                clear_progress_line();
                println!("Stop requested after {:.1} s", limit);
            }
        }
        thread::sleep(Duration::from_millis(20));
    }
    let response = handle.join()?;
    clear_progress_line();

    let report = &response.report;
    match report.status {
        RunStatus::Completed => println!("✓ Simulation completed: {}", response.run_id),
        RunStatus::Stopped => println!("■ Simulation stopped: {}", response.run_id),
        _ => println!("✗ Simulation {}: {}", report.status, response.run_id),
    }
    println!(
        "  Steps: {}/{}  t = {:.3} s  wall = {:.2} s",
        report.steps, report.total_steps, report.final_time, response.wall_time_s
    );
    if report.attack_failures > 0 {
        println!("  Attack handler failures: {}", report.attack_failures);
    }

    let (_manifest, records) = run_service::load_run(out, &response.run_id)?;
    if let Ok(summary) = query::get_run_summary(&records) {
        println!("  Records: {}", summary.record_count);
        println!("  Attacked steps: {}", summary.attacked_steps);
        println!("  Max deviation: {:.4}", summary.max_deviation);
    }

    if report.status == RunStatus::Failed {
        return Err(AppError::Simulation(
            report.error.clone().unwrap_or_else(|| "run failed".to_string()),
        ));
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.simulation) {
        (RunStage::Running, Some(p)) => {
            let width = 28usize;
            let filled = ((p.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.3}/{:.3}s  step={}/{}  elapsed={:.1}s",
                bar,
                p.fraction_complete * 100.0,
                p.sim_time,
                p.duration,
                p.step,
                p.total_steps,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn cmd_runs(out: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(out)?;

    if runs.is_empty() {
        println!("No stored runs in {}", out.display());
    } else {
        println!("Stored runs in {}:", out.display());
        for manifest in runs {
            println!(
                "  {} {:<9} {} ({}, {}/{} steps)",
                manifest.run_id,
                manifest.status.as_str(),
                manifest.scenario_name,
                manifest.timestamp,
                manifest.steps,
                manifest.total_steps
            );
        }
    }
    Ok(())
}

fn cmd_show_run(out: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(out, run_id)?;
    println!("\nRun:");
    println!("  Scenario: {}", manifest.scenario_name);
    println!("  Model: {} ({})", manifest.model_name, manifest.model_type);
    println!(
        "  Solver: {} dt={} duration={} seed={}",
        manifest.method, manifest.dt, manifest.duration, manifest.seed
    );
    println!(
        "  Status: {} ({}/{} steps)",
        manifest.status, manifest.steps, manifest.total_steps
    );
    if let Some(error) = &manifest.error {
        println!("  Error: {}", error);
    }
    println!("  Fingerprint: {}", manifest.fingerprint);

    let summary = query::get_run_summary(&records)?;
    println!("\nTelemetry:");
    println!("  Records: {}", summary.record_count);
    println!(
        "  Time range: {:.3} - {:.3} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  Attacked steps: {}", summary.attacked_steps);
    println!("  Max deviation: {:.4}", summary.max_deviation);

    println!("\nSignals:");
    for signal in &summary.signals {
        println!(
            "  {:<32} attacked={:<6} max_dev={:.4}",
            signal.name, signal.attacked_steps, signal.max_deviation
        );
    }
    if !summary.attack_ids.is_empty() {
        println!("\nAttacks seen:");
        for id in &summary.attack_ids {
            println!("  {}", id);
        }
    }

    Ok(())
}

fn cmd_export_series(
    out: &Path,
    run_id: &str,
    signal: &str,
    kind: SeriesKind,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(out, run_id)?;
    let series = query::extract_signal_series(&records, signal, kind)?;

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}

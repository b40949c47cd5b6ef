use anyhow::{Context, Result, bail};
use atmos::bench;
use atmos::config::AppConfig;
use atmos::scenario::{ScenarioDefinition, ScenarioExecutor, ScenarioExecutorConfig};
use atmos::station::StationSpec;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (RON); defaults to ./atmos.ron when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one or more scenario files
    #[arg(long, num_args = 1..)]
    scenario: Vec<PathBuf>,

    /// Run every .ron scenario in a directory
    #[arg(long)]
    scenario_dir: Option<PathBuf>,

    /// Time a generated station
    #[arg(long)]
    bench: bool,

    /// Station edge length for --bench
    #[arg(long)]
    size: Option<usize>,

    /// Ticks to simulate for --bench
    #[arg(long)]
    ticks: Option<usize>,

    /// Station seed for --bench
    #[arg(long)]
    seed: Option<u64>,

    /// Print engine version and SIMD level
    #[arg(long)]
    info: bool,

    /// Write the effective configuration to a file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Write JSON reports here (a directory when running scenarios)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log every action and tick
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    #[cfg(feature = "detailed_profiling")]
    let _chrome_guard = {
        use tracing_subscriber::prelude::*;
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .file("atmos_trace.json")
            .build();
        tracing_subscriber::registry().with(chrome_layer).init();
        log::info!("Writing Chrome trace to atmos_trace.json");
        guard
    };

    let mut config = AppConfig::load_from(args.config.as_deref())?;
    if args.verbose {
        config.debug.verbose_logging = true;
    }
    if let Some(size) = args.size {
        config.run.station_size = size;
    }
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(report) = &args.report {
        config.run.report_path = Some(report.display().to_string());
    }

    if args.info {
        println!(
            "atmos-core {} (SIMD level {})",
            atmos::engine::engine_version(),
            atmos::engine::simd_level()
        );
        return Ok(());
    }

    if let Some(path) = &args.write_config {
        std::fs::write(path, config.to_ron()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        log::info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let mut scenarios = args.scenario.clone();
    if let Some(dir) = &args.scenario_dir {
        scenarios.extend(scenario_files(dir)?);
    }

    if !scenarios.is_empty() {
        return run_scenarios(&scenarios, &config);
    }

    if args.bench {
        return run_bench(&config);
    }

    log::warn!("Nothing to do; pass --scenario, --scenario-dir, --bench or --info");
    Ok(())
}

fn scenario_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read scenario directory: {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn run_scenarios(paths: &[PathBuf], config: &AppConfig) -> Result<()> {
    let mut executor = ScenarioExecutor::with_config(ScenarioExecutorConfig {
        verbose: config.debug.verbose_logging,
        log_ticks: config.debug.log_ticks,
    });

    let mut failed = Vec::new();
    for path in paths {
        let scenario = ScenarioDefinition::from_file(path)?;
        let report = match executor.execute_scenario(&scenario, &config.engine) {
            Ok(report) => report,
            Err(e) => {
                log::error!("{}: {e:#}", scenario.name);
                failed.push(scenario.name.clone());
                continue;
            }
        };

        if let Some(dir) = &config.run.report_path {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| scenario.name.clone());
            report.save_json(Path::new(dir).join(format!("{stem}.json")))?;
        }
        if !report.passed {
            failed.push(scenario.name.clone());
        }
    }

    log::info!(
        "{} of {} scenarios passed",
        paths.len() - failed.len(),
        paths.len()
    );
    if !failed.is_empty() {
        bail!("Failed scenarios: {}", failed.join(", "));
    }
    Ok(())
}

fn run_bench(config: &AppConfig) -> Result<()> {
    let spec = StationSpec::new(config.run.station_size, config.run.seed);
    let report = bench::run(&spec, config.run.ticks, &config.engine, config.debug.log_ticks)?;
    println!("{}", report.summary());

    if let Some(path) = &config.run.report_path {
        report.save_json(path)?;
        log::info!("Wrote bench report to {path}");
    }
    Ok(())
}

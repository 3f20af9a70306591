use orbsim::{resume_or_start, RunConfigFile};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Resumable long-duration N-body integration")]
struct Args {
    /// Run file; looked up under `scenarios/` when not found as given
    #[arg(short, default_value = "solar_system.yaml")]
    file_name: String,

    /// Override the configured end time
    #[arg(long)]
    end_time: Option<f64>,
}

fn resolve_config_path(file_name: &str) -> PathBuf {
    let direct = PathBuf::from(file_name);
    if direct.exists() {
        return direct;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

// load here to keep main clean
fn load_run_from_yaml(file_name: &str) -> Result<RunConfigFile> {
    let config_path = resolve_config_path(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open run file {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let cfg: RunConfigFile = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse run file {}", config_path.display()))?;
    Ok(cfg)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut cfg = load_run_from_yaml(&args.file_name)?;
    if let Some(end_time) = args.end_time {
        cfg.run.end_time = end_time;
    }
    let run = cfg.run_config()?;

    let mut session = resume_or_start(
        &run,
        || cfg.construction_spec(),
        || cfg.effect_set(),
    )?;

    let summary = session.run(&run)?;
    println!(
        "Finished {} steps, t = {:.16} (resumed: {})",
        summary.steps, summary.t_final, session.resumed
    );
    Ok(())
}

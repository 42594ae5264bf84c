mod collectors;
mod config;
mod health;
mod render;
mod report;

use clap::Parser;
use collectors::collect_facts;
use config::{parse_service_list, Config};
use render::{OutputFormat, EXIT_FATAL};
use report::HealthReport;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Checks an Ubuntu host's vital signs and prints a JSON health report.
///
/// Exits 0 when healthy, 1 when unhealthy and 2 on a fatal error.
#[derive(Parser, Debug)]
#[command(name = "hostcheck")]
#[command(version)]
struct Cli {
    /// Optional YAML file with defaults for the settings below.
    #[arg(long, env = "HOSTCHECK_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    /// Root filesystem usage percentage (0-100) above which the host is unhealthy.
    #[arg(long, env = "DISK_THRESHOLD", value_parser = clap::value_parser!(u8).range(0..=100))]
    disk_threshold: Option<u8>,
    /// Host or address to ping once.
    #[arg(long = "ping", env = "PING_TARGET")]
    ping: Option<String>,
    /// Space-separated systemd units that must be active.
    #[arg(long, env = "CHECK_SERVICES")]
    services: Option<String>,
    #[arg(long, env = "FORMAT", value_enum)]
    format: Option<OutputFormat>,
    /// Upper bound for each external command, e.g. `10s`.
    #[arg(long, env = "COMMAND_TIMEOUT", value_parser = humantime::parse_duration)]
    command_timeout: Option<Duration>,
}

impl Cli {
    fn apply(self, cfg: &mut Config) {
        if let Some(v) = self.disk_threshold {
            cfg.disk_threshold_pct = v;
        }
        if let Some(v) = self.ping {
            cfg.ping_target = v;
        }
        if let Some(v) = self.services {
            cfg.services = parse_service_list(&v);
        }
        if let Some(v) = self.format {
            cfg.format = v;
        }
        if let Some(v) = self.command_timeout {
            cfg.command_timeout = v;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return ExitCode::SUCCESS;
    }

    let mut cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                return ExitCode::from(EXIT_FATAL);
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut cfg);
    if let Err(err) = cfg.validate() {
        error!(error = %err, "invalid configuration");
        return ExitCode::from(EXIT_FATAL);
    }

    let facts = match collect_facts(&cfg).await {
        Ok(facts) => facts,
        Err(err) => {
            error!(error = %err, "unsupported host, no report produced");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let policy = cfg.policy();
    let evaluation = health::evaluate(&facts, &policy);
    let report = HealthReport::assemble(facts, &policy, evaluation, SystemTime::now());
    info!(
        status = ?report.status,
        failures = report.failures.len(),
        "health check finished"
    );

    match render::render(&report, cfg.format) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            error!(error = %err, "failed to serialize report");
            return ExitCode::from(EXIT_FATAL);
        }
    }

    ExitCode::from(render::exit_code(&report))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

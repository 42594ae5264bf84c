pub mod checks;
pub mod command;
pub mod system;

use crate::config::Config;
use command::CommandError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

pub const OS_RELEASE_PATH: &str = "/etc/os-release";
pub const LOADAVG_PATH: &str = "/proc/loadavg";
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Outcome of a single probe.
///
/// `Unsupported` means the underlying tool or file is absent; `Failed` means it
/// was there but errored or printed something we could not parse. Neither is
/// an error for the run as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Present(T),
    Unsupported,
    Failed(String),
}

impl<T> Probe<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Probe::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_present(self) -> Option<T> {
        match self {
            Probe::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<CommandError> for Probe<T> {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound { .. } => Probe::Unsupported,
            other => Probe::Failed(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot read load average from {path}: {reason}")]
    LoadAverage { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadAverages {
    #[serde(rename = "1m")]
    pub one: f64,
    #[serde(rename = "5m")]
    pub five: f64,
    #[serde(rename = "15m")]
    pub fifteen: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStat {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemoryStat {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.available_kb)
    }

    /// Used share of RAM in percent, one decimal. Zero when total is unknown.
    pub fn used_pct(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        round1(self.used_kb() as f64 / self.total_kb as f64 * 100.0)
    }
}

/// One row of `df -P` for the root mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub avail: String,
    pub used_pct: u8,
    pub mount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DockerState {
    Running,
    InstalledNotRunningOrNoPerms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facts {
    pub host: String,
    pub os_name: String,
    pub kernel: String,
    pub uptime: Probe<String>,
    pub boot_time: Probe<String>,
    pub load_averages: LoadAverages,
    pub cpu_usage_pct: Probe<f64>,
    pub memory: MemoryStat,
    pub disk_root: Probe<DiskUsage>,
    pub ping: Probe<bool>,
    /// Services that were queried and found inactive, in check order.
    pub services_down: Probe<Vec<String>>,
    pub upgrades_pending: Probe<u64>,
    pub docker: Probe<DockerState>,
}

/// Runs every collector once, one after another.
///
/// Only the load average read can abort the run; every other probe degrades.
pub async fn collect_facts(cfg: &Config) -> Result<Facts, CollectError> {
    let timeout = cfg.command_timeout;

    let load_averages = system::read_load_average(LOADAVG_PATH)?;
    let (host, kernel) = system::collect_identity();
    let os_name = system::read_os_name(OS_RELEASE_PATH);
    let uptime = system::collect_uptime(timeout).await;
    let boot_time = system::collect_boot_time(timeout).await;
    let cpu_usage_pct = system::collect_cpu_usage(timeout).await;
    let memory = system::read_memory(MEMINFO_PATH);
    let disk_root = system::collect_disk_root(timeout).await;

    let ping = checks::check_ping(&cfg.ping_target, cfg.ping_timeout_secs, timeout).await;
    let services_down = checks::check_services(&cfg.services, timeout).await;
    let upgrades_pending = checks::count_upgrades(timeout).await;
    let docker = checks::docker_state(timeout).await;

    note_degraded("uptime", &uptime);
    note_degraded("boot_time", &boot_time);
    note_degraded("cpu_usage", &cpu_usage_pct);
    note_degraded("disk_root", &disk_root);
    note_degraded("ping", &ping);
    note_degraded("services", &services_down);
    note_degraded("packages", &upgrades_pending);
    note_degraded("docker", &docker);

    debug!(
        host = %host,
        cpu = ?cpu_usage_pct,
        ping = ?ping,
        upgrades = ?upgrades_pending,
        docker = ?docker,
        "facts collected"
    );

    Ok(Facts {
        host,
        os_name,
        kernel,
        uptime,
        boot_time,
        load_averages,
        cpu_usage_pct,
        memory,
        disk_root,
        ping,
        services_down,
        upgrades_pending,
        docker,
    })
}

fn note_degraded<T>(fact: &str, probe: &Probe<T>) {
    match probe {
        Probe::Present(_) => {}
        Probe::Unsupported => debug!(fact, "tool not installed, fact left empty"),
        Probe::Failed(reason) => warn!(fact, reason = %reason, "fact unavailable"),
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

use crate::collectors::{DockerState, Facts, LoadAverages};
use crate::health::{Evaluation, HealthStatus, Policy};
use serde::{Serialize, Serializer};
use std::time::SystemTime;

/// One run's findings. Field names match the JSON consumers already parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: SystemTime,
    pub host: String,
    #[serde(rename = "os")]
    pub os_name: String,
    pub kernel: String,
    #[serde(rename = "uptime")]
    pub uptime_text: String,
    #[serde(rename = "boot_time")]
    pub boot_time_text: String,
    #[serde(rename = "loadavg")]
    pub load_averages: LoadAverages,
    pub cpu_usage_pct: Option<f64>,
    pub memory: MemoryReport,
    pub disk_root: DiskReport,
    pub network: NetworkReport,
    pub services: ServicesReport,
    pub packages: PackagesReport,
    pub docker: Option<DockerState>,
    pub status: HealthStatus,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryReport {
    pub used_pct: f64,
    pub used_kb: u64,
    pub total_kb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskReport {
    pub used_pct: u8,
    pub size: String,
    pub avail: String,
    pub threshold_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkReport {
    pub ping_host: String,
    pub ping_ok: PingOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PingOutcome {
    #[serde(rename = "true")]
    Reachable,
    #[serde(rename = "false")]
    Unreachable,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicesReport {
    pub checked: Vec<String>,
    pub down: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagesReport {
    pub upgrades_pending: Option<u64>,
}

impl HealthReport {
    pub fn assemble(
        facts: Facts,
        policy: &Policy,
        evaluation: Evaluation,
        timestamp: SystemTime,
    ) -> Self {
        let disk_root = match facts.disk_root.into_present() {
            Some(disk) => DiskReport {
                used_pct: disk.used_pct,
                size: disk.size,
                avail: disk.avail,
                threshold_pct: policy.disk_threshold_pct,
            },
            None => DiskReport {
                used_pct: 0,
                size: String::new(),
                avail: String::new(),
                threshold_pct: policy.disk_threshold_pct,
            },
        };

        let ping_ok = match facts.ping.present() {
            Some(true) => PingOutcome::Reachable,
            Some(false) => PingOutcome::Unreachable,
            None => PingOutcome::Unknown,
        };

        Self {
            timestamp,
            host: facts.host,
            os_name: facts.os_name,
            kernel: facts.kernel,
            uptime_text: facts.uptime.into_present().unwrap_or_default(),
            boot_time_text: facts.boot_time.into_present().unwrap_or_default(),
            load_averages: facts.load_averages,
            cpu_usage_pct: facts.cpu_usage_pct.into_present(),
            memory: MemoryReport {
                used_pct: facts.memory.used_pct(),
                used_kb: facts.memory.used_kb(),
                total_kb: facts.memory.total_kb,
            },
            disk_root,
            network: NetworkReport {
                ping_host: policy.ping_target.clone(),
                ping_ok,
            },
            services: ServicesReport {
                checked: policy.services.clone(),
                down: facts.services_down.into_present().unwrap_or_default(),
            },
            packages: PackagesReport {
                upgrades_pending: facts.upgrades_pending.into_present(),
            },
            docker: facts.docker.into_present(),
            status: evaluation.status,
            failures: evaluation.failures,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

fn serialize_rfc3339<S: Serializer>(ts: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_rfc3339_seconds(*ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::Probe;
    use crate::health::evaluate;
    use crate::health::tests::{disk, healthy_facts, policy};
    use std::time::{Duration, UNIX_EPOCH};

    fn build(facts: Facts) -> HealthReport {
        let policy = policy();
        let evaluation = evaluate(&facts, &policy);
        HealthReport::assemble(
            facts,
            &policy,
            evaluation,
            UNIX_EPOCH + Duration::from_secs(1_714_554_780),
        )
    }

    #[test]
    fn scenario_disk_full() {
        let mut facts = healthy_facts();
        facts.disk_root = Probe::Present(disk(90));
        let report = build(facts);
        assert!(!report.is_healthy());
        assert_eq!(report.failures, vec!["Root disk usage 90% exceeds 85%"]);
        assert_eq!(report.disk_root.used_pct, 90);
        assert_eq!(report.disk_root.threshold_pct, 85);
    }

    #[test]
    fn scenario_ping_failed() {
        let mut facts = healthy_facts();
        facts.ping = Probe::Present(false);
        let report = build(facts);
        assert_eq!(report.failures, vec!["Ping to 8.8.8.8 failed"]);
        assert_eq!(report.network.ping_ok, PingOutcome::Unreachable);
        assert_eq!(report.services.checked, vec!["ssh", "cron"]);
        assert!(report.services.down.is_empty());
    }

    #[test]
    fn scenario_minimal_tooling() {
        let mut facts = healthy_facts();
        facts.ping = Probe::Unsupported;
        facts.upgrades_pending = Probe::Unsupported;
        facts.docker = Probe::Unsupported;
        let report = build(facts);
        assert!(report.is_healthy());
        assert!(report.failures.is_empty());
        assert_eq!(report.network.ping_ok, PingOutcome::Unknown);

        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["packages"]["upgrades_pending"], serde_json::Value::Null);
        assert_eq!(json["docker"], serde_json::Value::Null);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["network"]["ping_ok"], "unknown");
    }

    #[test]
    fn scenario_one_service_down() {
        let mut facts = healthy_facts();
        facts.services_down = Probe::Present(vec!["cron".to_string()]);
        let report = build(facts);
        assert_eq!(report.failures, vec!["Services not active: cron"]);
        assert_eq!(report.services.down, vec!["cron"]);
    }

    #[test]
    fn degraded_facts_become_empty_values() {
        let mut facts = healthy_facts();
        facts.uptime = Probe::Unsupported;
        facts.boot_time = Probe::Failed("unexpected who -b output".to_string());
        facts.cpu_usage_pct = Probe::Unsupported;
        facts.disk_root = Probe::Failed("unexpected df output".to_string());
        let report = build(facts);
        assert_eq!(report.uptime_text, "");
        assert_eq!(report.boot_time_text, "");
        assert_eq!(report.cpu_usage_pct, None);
        assert_eq!(report.disk_root.used_pct, 0);
        assert_eq!(report.disk_root.size, "");
        assert!(report.is_healthy());
    }

    #[test]
    fn json_uses_wire_field_names() {
        let mut facts = healthy_facts();
        facts.docker = Probe::Present(DockerState::InstalledNotRunningOrNoPerms);
        let json = serde_json::to_value(build(facts)).expect("report serializes");

        assert_eq!(json["timestamp"], "2024-05-01T09:13:00Z");
        assert_eq!(json["os"], "Ubuntu 22.04.4 LTS");
        assert_eq!(json["uptime"], "up 3 days, 2 hours");
        assert_eq!(json["boot_time"], "2024-05-01 09:13");
        assert_eq!(json["loadavg"]["1m"], 0.52);
        assert_eq!(json["loadavg"]["15m"], 0.59);
        assert_eq!(json["cpu_usage_pct"], 3.4);
        assert_eq!(json["memory"]["used_pct"], 50.0);
        assert_eq!(json["memory"]["used_kb"], 8_000_000);
        assert_eq!(json["disk_root"]["avail"], "48G");
        assert_eq!(json["network"]["ping_ok"], "true");
        assert_eq!(json["packages"]["upgrades_pending"], 4);
        assert_eq!(json["docker"], "installed_not_running_or_no_perms");
        assert_eq!(json["failures"], serde_json::json!([]));
    }

    #[test]
    fn same_inputs_same_verdict() {
        let mut facts = healthy_facts();
        facts.disk_root = Probe::Present(disk(95));
        let first = build(facts.clone());
        let second = build(facts);
        assert_eq!(first.status, second.status);
        assert_eq!(first.failures, second.failures);
    }
}

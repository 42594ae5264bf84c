use crate::collectors::Facts;
use serde::Serialize;

/// Thresholds and targets the evaluator judges facts against.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub disk_threshold_pct: u8,
    pub ping_target: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub failures: Vec<String>,
    pub status: HealthStatus,
}

/// Applies the policy to collected facts.
///
/// Only root disk usage, ping and service state count. CPU, memory and pending
/// upgrades are reported but never fail the host. Failures keep rule order:
/// disk, ping, services.
pub fn evaluate(facts: &Facts, policy: &Policy) -> Evaluation {
    let mut failures = Vec::new();

    if let Some(disk) = facts.disk_root.present() {
        if disk.used_pct > policy.disk_threshold_pct {
            failures.push(format!(
                "Root disk usage {}% exceeds {}%",
                disk.used_pct, policy.disk_threshold_pct
            ));
        }
    }

    if facts.ping.present() == Some(&false) {
        failures.push(format!("Ping to {} failed", policy.ping_target));
    }

    if let Some(down) = facts.services_down.present() {
        if !down.is_empty() {
            failures.push(format!("Services not active: {}", down.join(" ")));
        }
    }

    let status = if failures.is_empty() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    Evaluation { failures, status }
}

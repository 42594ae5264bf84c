use crate::collectors::command::{run_command, tool_available, CommandError};
use crate::collectors::{DockerState, Probe};
use std::time::Duration;
use tracing::{debug, warn};

/// One ICMP echo with a bounded wait. `Unsupported` when there is no `ping`.
pub async fn check_ping(target: &str, wait_secs: u64, timeout: Duration) -> Probe<bool> {
    ping_with("ping", target, wait_secs, timeout).await
}

async fn ping_with(ping: &str, target: &str, wait_secs: u64, timeout: Duration) -> Probe<bool> {
    let wait = wait_secs.to_string();
    match run_command(ping, &["-c", "1", "-W", &wait, target], timeout).await {
        Ok(output) => {
            if !output.success {
                warn!(target = %target, "ping failed");
            }
            Probe::Present(output.success)
        }
        Err(CommandError::Timeout { .. }) => {
            warn!(target = %target, "ping timeout");
            Probe::Present(false)
        }
        Err(err) => err.into(),
    }
}

/// Units from `services` that `systemctl` does not report as active, in order.
///
/// Skipped entirely when `systemctl` is not installed.
pub async fn check_services(services: &[String], timeout: Duration) -> Probe<Vec<String>> {
    services_with("systemctl", services, timeout).await
}

async fn services_with(
    systemctl: &str,
    services: &[String],
    timeout: Duration,
) -> Probe<Vec<String>> {
    if !tool_available(systemctl) {
        debug!("systemctl not found, skipping service checks");
        return Probe::Unsupported;
    }

    let mut down = Vec::new();
    for service in services {
        let active = match run_command(
            systemctl,
            &["is-active", "--quiet", service.as_str()],
            timeout,
        )
        .await
        {
            Ok(output) => output.success,
            Err(err) => {
                warn!(service = %service, error = %err, "service state query failed");
                false
            }
        };
        if !active {
            warn!(service = %service, "service not active");
            down.push(service.clone());
        }
    }

    Probe::Present(down)
}

/// Pending upgrades according to a simulated `apt-get upgrade`.
pub async fn count_upgrades(timeout: Duration) -> Probe<u64> {
    upgrades_with("apt-get", timeout).await
}

async fn upgrades_with(apt_get: &str, timeout: Duration) -> Probe<u64> {
    match run_command(apt_get, &["-s", "upgrade"], timeout).await {
        Ok(output) if output.success => Probe::Present(count_pending_installs(&output.stdout)),
        Ok(output) => {
            debug!(stderr = %output.stderr.trim(), "apt-get simulation failed");
            Probe::Failed("apt-get -s upgrade exited with error".to_string())
        }
        Err(err) => err.into(),
    }
}

/// Number of `Inst ` lines in `apt-get -s` output.
pub fn count_pending_installs(text: &str) -> u64 {
    text.lines().filter(|l| l.starts_with("Inst ")).count() as u64
}

pub async fn docker_state(timeout: Duration) -> Probe<DockerState> {
    docker_with("docker", timeout).await
}

async fn docker_with(docker: &str, timeout: Duration) -> Probe<DockerState> {
    match run_command(docker, &["info"], timeout).await {
        Ok(output) => Probe::Present(classify_docker(output.success)),
        Err(CommandError::NotFound { .. }) => Probe::Unsupported,
        Err(err) => {
            debug!(error = %err, "docker info did not complete");
            Probe::Present(classify_docker(false))
        }
    }
}

fn classify_docker(info_ok: bool) -> DockerState {
    if info_ok {
        DockerState::Running
    } else {
        DockerState::InstalledNotRunningOrNoPerms
    }
}

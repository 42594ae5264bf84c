use crate::collectors::command::{run_command, tool_available};
use crate::collectors::{round1, CollectError, DiskUsage, LoadAverages, MemoryStat, Probe};
use std::fs;
use std::path::Path;
use std::time::Duration;
use sysinfo::{System, SystemExt};
use tracing::{debug, warn};

/// Host name and kernel release, empty when the platform does not report them.
pub fn collect_identity() -> (String, String) {
    let system = System::new();
    let host = system.host_name().unwrap_or_default();
    let kernel = system.kernel_version().unwrap_or_default();
    (host, kernel)
}

pub fn read_os_name(path: impl AsRef<Path>) -> String {
    match fs::read_to_string(path.as_ref()) {
        Ok(text) => parse_os_release(&text).unwrap_or_default(),
        Err(err) => {
            debug!(path = %path.as_ref().display(), error = %err, "os-release unavailable");
            String::new()
        }
    }
}

/// Value of the first `PRETTY_NAME=` line, unquoted.
pub fn parse_os_release(text: &str) -> Option<String> {
    let line = text.lines().find(|l| l.starts_with("PRETTY_NAME="))?;
    let (_, value) = line.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some(value.to_string())
}

pub async fn collect_uptime(timeout: Duration) -> Probe<String> {
    let output = match run_command("uptime", &["-p"], timeout).await {
        Ok(output) => output,
        Err(err) => return err.into(),
    };
    if !output.success {
        return Probe::Failed(format!("uptime exited with error: {}", output.stderr.trim()));
    }
    non_empty(output.stdout.trim())
}

pub async fn collect_boot_time(timeout: Duration) -> Probe<String> {
    boot_time_with("who", timeout).await
}

async fn boot_time_with(who: &str, timeout: Duration) -> Probe<String> {
    let output = match run_command(who, &["-b"], timeout).await {
        Ok(output) => output,
        Err(err) => return err.into(),
    };
    if !output.success {
        return Probe::Failed(format!("who exited with error: {}", output.stderr.trim()));
    }
    match parse_who_boot(&output.stdout) {
        Some(v) => Probe::Present(v),
        None => Probe::Failed("unexpected who -b output".to_string()),
    }
}

/// Everything after `system boot` in `who -b` output, single-spaced.
///
/// The C locale prints `May  1 09:13`, other locales `2024-05-01 09:13`.
pub fn parse_who_boot(text: &str) -> Option<String> {
    let line = text.lines().find(|l| !l.trim().is_empty())?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return None;
    }
    Some(fields[2..].join(" "))
}

pub fn read_load_average(path: impl AsRef<Path>) -> Result<LoadAverages, CollectError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| CollectError::LoadAverage {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    parse_loadavg(&text).ok_or_else(|| CollectError::LoadAverage {
        path: path.to_path_buf(),
        reason: format!("unexpected contents {:?}", text.trim()),
    })
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(text: &str) -> Option<LoadAverages> {
    let mut fields = text.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some(LoadAverages {
        one: fields.next()??,
        five: fields.next()??,
        fifteen: fields.next()??,
    })
}

/// Approximate CPU busy percentage over a one second window.
///
/// `mpstat` is preferred; `top` is the fallback when sysstat is not installed.
pub async fn collect_cpu_usage(timeout: Duration) -> Probe<f64> {
    if tool_available("mpstat") {
        return match run_command("mpstat", &["1", "1"], timeout).await {
            Ok(output) if output.success => match parse_mpstat(&output.stdout) {
                Some(v) => Probe::Present(v),
                None => Probe::Failed("no Average line in mpstat output".to_string()),
            },
            Ok(output) => Probe::Failed(format!("mpstat failed: {}", output.stderr.trim())),
            Err(err) => err.into(),
        };
    }

    match run_command("top", &["-bn1"], timeout).await {
        Ok(output) if output.success => match parse_top(&output.stdout) {
            Some(v) => Probe::Present(v),
            None => Probe::Failed("no %Cpu(s) line in top output".to_string()),
        },
        Ok(output) => Probe::Failed(format!("top failed: {}", output.stderr.trim())),
        Err(err) => err.into(),
    }
}

/// Busy percentage from the `Average:` row of `mpstat`, whose last column is `%idle`.
pub fn parse_mpstat(text: &str) -> Option<f64> {
    text.lines()
        .filter(|l| l.starts_with("Average"))
        .find_map(|l| l.split_whitespace().last()?.parse::<f64>().ok())
        .map(busy_from_idle)
}

/// Busy percentage from the `%Cpu(s):` summary of `top -b`, using the `id` field.
pub fn parse_top(text: &str) -> Option<f64> {
    let line = text.lines().find(|l| l.contains("Cpu(s)"))?;
    let (_, fields) = line.split_once(':')?;
    fields
        .split(',')
        .find_map(|field| {
            let mut parts = field.split_whitespace();
            let value = parts.next()?;
            match parts.next()? {
                "id" => value.parse::<f64>().ok(),
                _ => None,
            }
        })
        .map(busy_from_idle)
}

fn busy_from_idle(idle: f64) -> f64 {
    round1((100.0 - idle).clamp(0.0, 100.0))
}

pub fn read_memory(path: impl AsRef<Path>) -> MemoryStat {
    match fs::read_to_string(path.as_ref()) {
        Ok(text) => parse_meminfo(&text),
        Err(err) => {
            warn!(path = %path.as_ref().display(), error = %err, "meminfo unavailable");
            MemoryStat::default()
        }
    }
}

/// `MemTotal` and `MemAvailable` in kB; absent keys read as zero.
pub fn parse_meminfo(text: &str) -> MemoryStat {
    let mut stat = MemoryStat::default();
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match key.trim() {
            "MemTotal" => stat.total_kb = value,
            "MemAvailable" => stat.available_kb = value,
            _ => {}
        }
    }
    stat
}

pub async fn collect_disk_root(timeout: Duration) -> Probe<DiskUsage> {
    let output = match run_command("df", &["-hP", "/"], timeout).await {
        Ok(output) => output,
        Err(err) => return err.into(),
    };
    match parse_df(&output.stdout) {
        Some(usage) => {
            debug!(
                filesystem = %usage.filesystem,
                mount = %usage.mount,
                used = %usage.used,
                used_pct = usage.used_pct,
                "root filesystem usage"
            );
            Probe::Present(usage)
        }
        None if !output.success => {
            Probe::Failed(format!("df exited with error: {}", output.stderr.trim()))
        }
        None => Probe::Failed("unexpected df output".to_string()),
    }
}

/// Second line of `df -P`: filesystem, size, used, avail, use%, mount.
pub fn parse_df(text: &str) -> Option<DiskUsage> {
    let line = text.lines().nth(1)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    let used_pct = fields[4].trim_end_matches('%').parse::<u8>().ok()?;
    Some(DiskUsage {
        filesystem: fields[0].to_string(),
        size: fields[1].to_string(),
        used: fields[2].to_string(),
        avail: fields[3].to_string(),
        used_pct,
        mount: fields[5..].join(" "),
    })
}

fn non_empty(text: &str) -> Probe<String> {
    if text.is_empty() {
        Probe::Failed("empty output".to_string())
    } else {
        Probe::Present(text.to_string())
    }
}

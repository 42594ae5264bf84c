use crate::report::HealthReport;
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Invalid configuration or an unsupported host; no report is printed.
pub const EXIT_FATAL: u8 = 2;

/// The report as printed to stdout. Text mode adds a two-line header before
/// the same JSON document.
pub fn render(report: &HealthReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(match format {
        OutputFormat::Json => json,
        OutputFormat::Text => {
            let status = if report.is_healthy() {
                "healthy"
            } else {
                "unhealthy"
            };
            format!(
                "Ubuntu Health Check - {}\nStatus: {}\n{}",
                humantime::format_rfc3339_seconds(report.timestamp),
                status,
                json
            )
        }
    })
}

pub const EXIT_HEALTHY: u8 = 0;
pub const EXIT_UNHEALTHY: u8 = 1;

pub fn exit_code(report: &HealthReport) -> u8 {
    if report.is_healthy() {
        EXIT_HEALTHY
    } else {
        EXIT_UNHEALTHY
    }
}

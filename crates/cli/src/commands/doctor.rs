use serde::Serialize;
use staybook_core::config::{AppConfig, LoadOptions};
use staybook_db::migrations::{missing_tables, BOOKING_TABLES};
use staybook_db::{connect_with_config, DemoDataset};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self::new(name, CheckStatus::Skipped, format!("skipped because {reason}"))
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 1 when any check fails; warnings and skips still pass.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_gateway(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["gateway_readiness", "database_connectivity", "schema", "demo_data"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_gateway(config: &AppConfig) -> DoctorCheck {
    let gateway = &config.gateway;
    match (&gateway.base_url, gateway.api_key.is_some(), gateway.webhook_secret.is_some()) {
        (Some(base_url), true, true) => DoctorCheck::new(
            "gateway_readiness",
            CheckStatus::Pass,
            format!("gateway at `{base_url}` with signed webhooks"),
        ),
        (Some(base_url), true, false) => DoctorCheck::new(
            "gateway_readiness",
            CheckStatus::Warn,
            format!("gateway at `{base_url}` but no webhook secret; signed callbacks are refused"),
        ),
        (Some(_), false, _) => DoctorCheck::new(
            "gateway_readiness",
            CheckStatus::Fail,
            "gateway.base_url is set without gateway.api_key",
        ),
        (None, _, _) => DoctorCheck::new(
            "gateway_readiness",
            CheckStatus::Warn,
            "no gateway configured; checkout links are disabled and refunds stay local",
        ),
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::new(
                    "database_connectivity",
                    CheckStatus::Fail,
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("schema", "the runtime did not start"),
                DoctorCheck::skipped("demo_data", "the runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::new(
                        "database_connectivity",
                        CheckStatus::Fail,
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("schema", "the database is unreachable"),
                    DoctorCheck::skipped("demo_data", "the database is unreachable"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.database.url),
        )];

        match missing_tables(&pool).await {
            Ok(missing) if missing.is_empty() => {
                checks.push(DoctorCheck::new(
                    "schema",
                    CheckStatus::Pass,
                    format!("{} booking tables present", BOOKING_TABLES.len()),
                ));
                checks.push(match DemoDataset::verify(&pool).await {
                    Ok(true) => {
                        DoctorCheck::new("demo_data", CheckStatus::Pass, "demo dataset is loaded")
                    }
                    Ok(false) => DoctorCheck::new(
                        "demo_data",
                        CheckStatus::Warn,
                        "demo dataset not loaded; run `staybook seed`",
                    ),
                    Err(error) => DoctorCheck::new("demo_data", CheckStatus::Fail, error.to_string()),
                });
            }
            Ok(missing) => {
                checks.push(DoctorCheck::new(
                    "schema",
                    CheckStatus::Fail,
                    format!("missing tables: {}; run `staybook migrate`", missing.join(", ")),
                ));
                checks.push(DoctorCheck::skipped("demo_data", "the schema is incomplete"));
            }
            Err(error) => {
                checks.push(DoctorCheck::new(
                    "schema",
                    CheckStatus::Fail,
                    format!("schema inspection failed: {error}"),
                ));
                checks.push(DoctorCheck::skipped("demo_data", "the schema is incomplete"));
            }
        }

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

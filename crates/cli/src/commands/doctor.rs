use std::net::TcpListener;

use secrecy::ExposeSecret;
use serde::Serialize;
use storefront_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] = ["token_shape", "guild_identifiers", "keep_alive_port"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

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
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_token_shape(&config));
            checks.push(check_guild_identifiers(&config));
            checks.push(check_keep_alive_port(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_token_shape(config: &AppConfig) -> DoctorCheck {
    let token = config.discord.token.expose_secret();
    let segments = token.trim().split('.').map(str::len).collect::<Vec<_>>();

    if segments.len() == 3 && segments.iter().all(|length| *length > 0) {
        DoctorCheck {
            name: "token_shape",
            status: CheckStatus::Pass,
            details: "bot token has three non-empty segments".to_string(),
        }
    } else {
        DoctorCheck {
            name: "token_shape",
            status: CheckStatus::Fail,
            details: format!("expected three token segments, found {}", segments.len()),
        }
    }
}

fn check_guild_identifiers(config: &AppConfig) -> DoctorCheck {
    let guild = &config.guild;
    let category = guild.ticket_category_id;

    if category == guild.offer_channel_id || category == guild.transcript_channel_id {
        return DoctorCheck {
            name: "guild_identifiers",
            status: CheckStatus::Fail,
            details: "guild.ticket_category_id must be a category, not the offer or transcript channel"
                .to_string(),
        };
    }

    let rules = guild
        .rules_channel()
        .map(|channel| channel.to_string())
        .unwrap_or_else(|| "unset".to_string());
    DoctorCheck {
        name: "guild_identifiers",
        status: CheckStatus::Pass,
        details: format!(
            "offer={} category={} transcripts={} rules={rules}",
            guild.offer_channel_id, category, guild.transcript_channel_id
        ),
    }
}

fn check_keep_alive_port(config: &AppConfig) -> DoctorCheck {
    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    match TcpListener::bind(&address) {
        Ok(_) => DoctorCheck {
            name: "keep_alive_port",
            status: CheckStatus::Pass,
            details: format!("`{address}` is free to bind"),
        },
        Err(error) => DoctorCheck {
            name: "keep_alive_port",
            status: CheckStatus::Fail,
            details: format!("cannot bind `{address}`: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
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

use std::env;
use std::sync::{Mutex, OnceLock};

use storefront_cli::commands::{config, doctor};
use serde_json::Value;

const TOKEN: &str = "MTIzNDU2Nzg5.Gh1jKl.abcdefghijklmnopqrstuvwxyz";

fn valid_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("DISCORD_TOKEN", TOKEN),
        ("STOREFRONT_GUILD_OFFER_CHANNEL_ID", "101"),
        ("STOREFRONT_GUILD_TICKET_CATEGORY_ID", "202"),
        ("STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID", "303"),
    ]
}

#[test]
fn config_redacts_token_and_attributes_env_sources() {
    with_env(&valid_env(), || {
        let output = config::run();

        assert!(output.contains("- discord.token = MTIzNDU2Nzg5.*** (source: env (DISCORD_TOKEN))"));
        assert!(!output.contains("abcdefghijklmnop"));
        assert!(output.contains(
            "- guild.offer_channel_id = 101 (source: env (STOREFRONT_GUILD_OFFER_CHANNEL_ID))"
        ));
        assert!(output.contains("- server.port = 5000 (source: default)"));
    });
}

#[test]
fn config_prefers_port_alias_when_set() {
    let mut vars = valid_env();
    vars.push(("PORT", "8123"));
    with_env(&vars, || {
        let output = config::run();
        assert!(output.contains("- server.port = 8123 (source: env (PORT))"));
    });
}

#[test]
fn config_reports_validation_failure_without_token() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"));
        assert!(output.contains("discord.token"));
    });
}

#[test]
fn doctor_json_reports_passing_config_checks() {
    with_env(&valid_env(), || {
        let result = doctor::run(true);
        let payload = parse_payload(&result.output);

        assert_eq!(check_status(&payload, "config_validation"), "pass");
        assert_eq!(check_status(&payload, "token_shape"), "pass");
        assert_eq!(check_status(&payload, "guild_identifiers"), "pass");
    });
}

#[test]
fn doctor_flags_category_reused_as_channel() {
    with_env(
        &[
            ("DISCORD_TOKEN", TOKEN),
            ("STOREFRONT_GUILD_OFFER_CHANNEL_ID", "101"),
            ("STOREFRONT_GUILD_TICKET_CATEGORY_ID", "101"),
            ("STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID", "303"),
        ],
        || {
            let result = doctor::run(true);
            let payload = parse_payload(&result.output);

            assert_eq!(result.exit_code, 1);
            assert_eq!(payload["overall_status"], "fail");
            assert_eq!(check_status(&payload, "guild_identifiers"), "fail");
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[], || {
        let result = doctor::run(true);
        let payload = parse_payload(&result.output);

        assert_eq!(result.exit_code, 1);
        assert_eq!(check_status(&payload, "config_validation"), "fail");
        assert_eq!(check_status(&payload, "token_shape"), "skipped");
        assert_eq!(check_status(&payload, "keep_alive_port"), "skipped");
    });
}

#[test]
fn doctor_human_output_lists_markers() {
    with_env(&[], || {
        let result = doctor::run(false);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] guild_identifiers:"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("doctor output should be valid json")
}

fn check_status(payload: &Value, name: &str) -> String {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or("missing")
        .to_string()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DISCORD_TOKEN",
        "PORT",
        "STOREFRONT_DISCORD_TOKEN",
        "STOREFRONT_GUILD_OFFER_CHANNEL_ID",
        "STOREFRONT_GUILD_RULES_CHANNEL_ID",
        "STOREFRONT_GUILD_TICKET_CATEGORY_ID",
        "STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID",
        "STOREFRONT_GUILD_STOCK_ROLE_ID",
        "STOREFRONT_GUILD_REACTION_CHANNEL_ID",
        "STOREFRONT_GUILD_INFO_URL",
        "STOREFRONT_GUILD_STATUS_MESSAGE_CHANNEL_ID",
        "STOREFRONT_GUILD_STATUS_MESSAGE_ID",
        "STOREFRONT_STOREFRONT_INITIAL_STATUS_GLYPH",
        "STOREFRONT_STOREFRONT_STOCK_CHECK",
        "STOREFRONT_STOREFRONT_STOCK_PLACEHOLDER",
        "STOREFRONT_STOREFRONT_STATUS_REQUIRES_ADMIN",
        "STOREFRONT_STOREFRONT_PRESENCE",
        "STOREFRONT_TICKETS_ALLOCATION",
        "STOREFRONT_TICKETS_APPEND_REQUESTER_HANDLE",
        "STOREFRONT_TICKETS_GRANT_ADMIN_MEMBERS",
        "STOREFRONT_TICKETS_CLOSE_REVOKES_SEND",
        "STOREFRONT_SERVER_BIND_ADDRESS",
        "STOREFRONT_SERVER_PORT",
        "STOREFRONT_LOGGING_LEVEL",
        "STOREFRONT_LOGGING_FORMAT",
        "STOREFRONT_LOG_LEVEL",
        "STOREFRONT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

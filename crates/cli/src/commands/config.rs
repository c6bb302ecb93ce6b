use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use storefront_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.into(), env_keys }
}

fn optional_id(value: Option<u64>) -> String {
    value.map(|id| id.to_string()).unwrap_or_else(|| "<unset>".to_string())
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        field(
            "discord.token",
            redact_token(config.discord.token.expose_secret()),
            &["STOREFRONT_DISCORD_TOKEN", "DISCORD_TOKEN"],
        ),
        field(
            "guild.offer_channel_id",
            config.guild.offer_channel_id.to_string(),
            &["STOREFRONT_GUILD_OFFER_CHANNEL_ID"],
        ),
        field(
            "guild.rules_channel_id",
            config.guild.rules_channel_id.to_string(),
            &["STOREFRONT_GUILD_RULES_CHANNEL_ID"],
        ),
        field(
            "guild.ticket_category_id",
            config.guild.ticket_category_id.to_string(),
            &["STOREFRONT_GUILD_TICKET_CATEGORY_ID"],
        ),
        field(
            "guild.transcript_channel_id",
            config.guild.transcript_channel_id.to_string(),
            &["STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID"],
        ),
        field(
            "guild.stock_role_id",
            optional_id(config.guild.stock_role_id),
            &["STOREFRONT_GUILD_STOCK_ROLE_ID"],
        ),
        field(
            "guild.reaction_channel_id",
            optional_id(config.guild.reaction_channel_id),
            &["STOREFRONT_GUILD_REACTION_CHANNEL_ID"],
        ),
        field(
            "guild.info_url",
            config.guild.info_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["STOREFRONT_GUILD_INFO_URL"],
        ),
        field(
            "guild.status_message_id",
            optional_id(config.guild.status_message.map(|status| status.message_id)),
            &["STOREFRONT_GUILD_STATUS_MESSAGE_ID"],
        ),
        field(
            "storefront.initial_status_glyph",
            config.storefront.initial_status_glyph.clone(),
            &["STOREFRONT_STOREFRONT_INITIAL_STATUS_GLYPH"],
        ),
        field(
            "storefront.stock_check",
            format!("{:?}", config.storefront.stock_check),
            &["STOREFRONT_STOREFRONT_STOCK_CHECK"],
        ),
        field(
            "storefront.stock_placeholder",
            config.storefront.stock_placeholder.to_string(),
            &["STOREFRONT_STOREFRONT_STOCK_PLACEHOLDER"],
        ),
        field(
            "storefront.status_requires_admin",
            config.storefront.status_requires_admin.to_string(),
            &["STOREFRONT_STOREFRONT_STATUS_REQUIRES_ADMIN"],
        ),
        field(
            "storefront.presence",
            config.storefront.presence.clone(),
            &["STOREFRONT_STOREFRONT_PRESENCE"],
        ),
        field(
            "tickets.allocation",
            format!("{:?}", config.tickets.allocation),
            &["STOREFRONT_TICKETS_ALLOCATION"],
        ),
        field(
            "tickets.append_requester_handle",
            config.tickets.append_requester_handle.to_string(),
            &["STOREFRONT_TICKETS_APPEND_REQUESTER_HANDLE"],
        ),
        field(
            "tickets.grant_admin_members",
            config.tickets.grant_admin_members.to_string(),
            &["STOREFRONT_TICKETS_GRANT_ADMIN_MEMBERS"],
        ),
        field(
            "tickets.close_revokes_send",
            config.tickets.close_revokes_send.to_string(),
            &["STOREFRONT_TICKETS_CLOSE_REVOKES_SEND"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["STOREFRONT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["STOREFRONT_SERVER_PORT", "PORT"]),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["STOREFRONT_LOGGING_LEVEL", "STOREFRONT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["STOREFRONT_LOGGING_FORMAT", "STOREFRONT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key,
            &field.value,
            field_source(
                field.key,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("storefront.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/storefront.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Bot tokens lead with the base64 application id, which is not secret.
pub fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('.') {
        Some((application, _)) => format!("{application}.***"),
        None => "<redacted>".to_string(),
    }
}

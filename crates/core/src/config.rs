use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::ChannelId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub guild: GuildConfig,
    pub storefront: StorefrontConfig,
    pub tickets: TicketConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
}

/// Fixed destination identifiers. These are supplied, never discovered.
#[derive(Clone, Debug, Default)]
pub struct GuildConfig {
    pub offer_channel_id: u64,
    pub rules_channel_id: u64,
    pub ticket_category_id: u64,
    pub transcript_channel_id: u64,
    pub stock_role_id: Option<u64>,
    pub reaction_channel_id: Option<u64>,
    pub info_url: Option<String>,
    pub status_message: Option<StatusMessageRef>,
}

impl GuildConfig {
    /// `0` means the rules channel was not configured.
    pub fn rules_channel(&self) -> Option<ChannelId> {
        (self.rules_channel_id != 0).then_some(ChannelId(self.rules_channel_id))
    }

    pub fn offer_channel(&self) -> ChannelId {
        ChannelId(self.offer_channel_id)
    }

    pub fn ticket_category(&self) -> ChannelId {
        ChannelId(self.ticket_category_id)
    }

    pub fn transcript_channel(&self) -> ChannelId {
        ChannelId(self.transcript_channel_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusMessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    pub initial_status_glyph: String,
    pub stock_check: StockCheckMode,
    pub stock_placeholder: u32,
    pub status_requires_admin: bool,
    pub presence: String,
}

#[derive(Clone, Debug)]
pub struct TicketConfig {
    pub allocation: AllocationPolicy,
    pub append_requester_handle: bool,
    pub grant_admin_members: bool,
    pub close_revokes_send: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockCheckMode {
    Open,
    Gated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    Scan,
    Counter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub discord_token: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub offer_channel_id: Option<u64>,
    pub ticket_category_id: Option<u64>,
    pub transcript_channel_id: Option<u64>,
    pub allocation: Option<AllocationPolicy>,
    pub stock_check: Option<StockCheckMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig { token: String::new().into() },
            guild: GuildConfig::default(),
            storefront: StorefrontConfig {
                initial_status_glyph: "🟢".to_string(),
                stock_check: StockCheckMode::Open,
                stock_placeholder: 0,
                status_requires_admin: false,
                presence: "for orders..".to_string(),
            },
            tickets: TicketConfig {
                allocation: AllocationPolicy::Scan,
                append_requester_handle: false,
                grant_admin_members: true,
                close_revokes_send: true,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 5000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for StockCheckMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "gated" => Ok(Self::Gated),
            other => Err(ConfigError::Validation(format!(
                "unsupported stock check mode `{other}` (expected open|gated)"
            ))),
        }
    }
}

impl std::str::FromStr for AllocationPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(Self::Scan),
            "counter" => Ok(Self::Counter),
            other => Err(ConfigError::Validation(format!(
                "unsupported ticket allocation policy `{other}` (expected scan|counter)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("storefront.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(discord_token_value) = discord.token {
                self.discord.token = secret_value(discord_token_value);
            }
        }

        if let Some(guild) = patch.guild {
            if let Some(offer_channel_id) = guild.offer_channel_id {
                self.guild.offer_channel_id = offer_channel_id;
            }
            if let Some(rules_channel_id) = guild.rules_channel_id {
                self.guild.rules_channel_id = rules_channel_id;
            }
            if let Some(ticket_category_id) = guild.ticket_category_id {
                self.guild.ticket_category_id = ticket_category_id;
            }
            if let Some(transcript_channel_id) = guild.transcript_channel_id {
                self.guild.transcript_channel_id = transcript_channel_id;
            }
            if let Some(stock_role_id) = guild.stock_role_id {
                self.guild.stock_role_id = Some(stock_role_id);
            }
            if let Some(reaction_channel_id) = guild.reaction_channel_id {
                self.guild.reaction_channel_id = Some(reaction_channel_id);
            }
            if let Some(info_url) = guild.info_url {
                self.guild.info_url = Some(info_url);
            }
            if let (Some(channel_id), Some(message_id)) =
                (guild.status_message_channel_id, guild.status_message_id)
            {
                self.guild.status_message = Some(StatusMessageRef { channel_id, message_id });
            }
        }

        if let Some(storefront) = patch.storefront {
            if let Some(initial_status_glyph) = storefront.initial_status_glyph {
                self.storefront.initial_status_glyph = initial_status_glyph;
            }
            if let Some(stock_check) = storefront.stock_check {
                self.storefront.stock_check = stock_check;
            }
            if let Some(stock_placeholder) = storefront.stock_placeholder {
                self.storefront.stock_placeholder = stock_placeholder;
            }
            if let Some(status_requires_admin) = storefront.status_requires_admin {
                self.storefront.status_requires_admin = status_requires_admin;
            }
            if let Some(presence) = storefront.presence {
                self.storefront.presence = presence;
            }
        }

        if let Some(tickets) = patch.tickets {
            if let Some(allocation) = tickets.allocation {
                self.tickets.allocation = allocation;
            }
            if let Some(append_requester_handle) = tickets.append_requester_handle {
                self.tickets.append_requester_handle = append_requester_handle;
            }
            if let Some(grant_admin_members) = tickets.grant_admin_members {
                self.tickets.grant_admin_members = grant_admin_members;
            }
            if let Some(close_revokes_send) = tickets.close_revokes_send {
                self.tickets.close_revokes_send = close_revokes_send;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let token = read_env("STOREFRONT_DISCORD_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = token {
            self.discord.token = secret_value(value);
        }

        if let Some(value) = read_env("STOREFRONT_GUILD_OFFER_CHANNEL_ID") {
            self.guild.offer_channel_id = parse_u64("STOREFRONT_GUILD_OFFER_CHANNEL_ID", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_RULES_CHANNEL_ID") {
            self.guild.rules_channel_id = parse_u64("STOREFRONT_GUILD_RULES_CHANNEL_ID", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_TICKET_CATEGORY_ID") {
            self.guild.ticket_category_id =
                parse_u64("STOREFRONT_GUILD_TICKET_CATEGORY_ID", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID") {
            self.guild.transcript_channel_id =
                parse_u64("STOREFRONT_GUILD_TRANSCRIPT_CHANNEL_ID", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_STOCK_ROLE_ID") {
            self.guild.stock_role_id = Some(parse_u64("STOREFRONT_GUILD_STOCK_ROLE_ID", &value)?);
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_REACTION_CHANNEL_ID") {
            self.guild.reaction_channel_id =
                Some(parse_u64("STOREFRONT_GUILD_REACTION_CHANNEL_ID", &value)?);
        }
        if let Some(value) = read_env("STOREFRONT_GUILD_INFO_URL") {
            self.guild.info_url = Some(value);
        }
        let status_channel = read_env("STOREFRONT_GUILD_STATUS_MESSAGE_CHANNEL_ID");
        let status_message = read_env("STOREFRONT_GUILD_STATUS_MESSAGE_ID");
        if let (Some(channel), Some(message)) = (status_channel, status_message) {
            self.guild.status_message = Some(StatusMessageRef {
                channel_id: parse_u64("STOREFRONT_GUILD_STATUS_MESSAGE_CHANNEL_ID", &channel)?,
                message_id: parse_u64("STOREFRONT_GUILD_STATUS_MESSAGE_ID", &message)?,
            });
        }

        if let Some(value) = read_env("STOREFRONT_STOREFRONT_INITIAL_STATUS_GLYPH") {
            self.storefront.initial_status_glyph = value;
        }
        if let Some(value) = read_env("STOREFRONT_STOREFRONT_STOCK_CHECK") {
            self.storefront.stock_check = value.parse()?;
        }
        if let Some(value) = read_env("STOREFRONT_STOREFRONT_STOCK_PLACEHOLDER") {
            self.storefront.stock_placeholder =
                parse_u32("STOREFRONT_STOREFRONT_STOCK_PLACEHOLDER", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_STOREFRONT_STATUS_REQUIRES_ADMIN") {
            self.storefront.status_requires_admin =
                parse_bool("STOREFRONT_STOREFRONT_STATUS_REQUIRES_ADMIN", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_STOREFRONT_PRESENCE") {
            self.storefront.presence = value;
        }

        if let Some(value) = read_env("STOREFRONT_TICKETS_ALLOCATION") {
            self.tickets.allocation = value.parse()?;
        }
        if let Some(value) = read_env("STOREFRONT_TICKETS_APPEND_REQUESTER_HANDLE") {
            self.tickets.append_requester_handle =
                parse_bool("STOREFRONT_TICKETS_APPEND_REQUESTER_HANDLE", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_TICKETS_GRANT_ADMIN_MEMBERS") {
            self.tickets.grant_admin_members =
                parse_bool("STOREFRONT_TICKETS_GRANT_ADMIN_MEMBERS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_TICKETS_CLOSE_REVOKES_SEND") {
            self.tickets.close_revokes_send =
                parse_bool("STOREFRONT_TICKETS_CLOSE_REVOKES_SEND", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STOREFRONT_SERVER_PORT") {
            self.server.port = parse_u16("STOREFRONT_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }

        let log_level =
            read_env("STOREFRONT_LOGGING_LEVEL").or_else(|| read_env("STOREFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STOREFRONT_LOGGING_FORMAT").or_else(|| read_env("STOREFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(discord_token) = overrides.discord_token {
            self.discord.token = secret_value(discord_token);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(offer_channel_id) = overrides.offer_channel_id {
            self.guild.offer_channel_id = offer_channel_id;
        }
        if let Some(ticket_category_id) = overrides.ticket_category_id {
            self.guild.ticket_category_id = ticket_category_id;
        }
        if let Some(transcript_channel_id) = overrides.transcript_channel_id {
            self.guild.transcript_channel_id = transcript_channel_id;
        }
        if let Some(allocation) = overrides.allocation {
            self.tickets.allocation = allocation;
        }
        if let Some(stock_check) = overrides.stock_check {
            self.storefront.stock_check = stock_check;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_guild(&self.guild)?;
        validate_storefront(&self.storefront, &self.guild)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("storefront.toml"), PathBuf::from("config/storefront.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.token is required. Set DISCORD_TOKEN or get it from https://discord.com/developers/applications > Your App > Bot".to_string(),
        ));
    }

    let segments = token.trim().split('.').filter(|segment| !segment.is_empty()).count();
    if segments != 3 {
        let hint = if token.trim().starts_with("Bot ") {
            " (hint: drop the `Bot ` prefix, it is added automatically)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "discord.token must be a bot token with three dot-separated segments{hint}"
        )));
    }

    Ok(())
}

fn validate_guild(guild: &GuildConfig) -> Result<(), ConfigError> {
    let required = [
        ("guild.offer_channel_id", guild.offer_channel_id),
        ("guild.ticket_category_id", guild.ticket_category_id),
        ("guild.transcript_channel_id", guild.transcript_channel_id),
    ];
    if let Some((key, _)) = required.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigError::Validation(format!(
            "{key} is required (enable developer mode in Discord and copy the id)"
        )));
    }

    if let Some(info_url) = &guild.info_url {
        if !info_url.starts_with("http://") && !info_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "guild.info_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_storefront(
    storefront: &StorefrontConfig,
    guild: &GuildConfig,
) -> Result<(), ConfigError> {
    if storefront.initial_status_glyph.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.initial_status_glyph must not be empty".to_string(),
        ));
    }

    if storefront.stock_check == StockCheckMode::Gated && guild.stock_role_id.is_none() {
        return Err(ConfigError::Validation(
            "storefront.stock_check is `gated` but guild.stock_role_id is not configured"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    guild: Option<GuildPatch>,
    storefront: Option<StorefrontPatch>,
    tickets: Option<TicketPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GuildPatch {
    offer_channel_id: Option<u64>,
    rules_channel_id: Option<u64>,
    ticket_category_id: Option<u64>,
    transcript_channel_id: Option<u64>,
    stock_role_id: Option<u64>,
    reaction_channel_id: Option<u64>,
    info_url: Option<String>,
    status_message_channel_id: Option<u64>,
    status_message_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorefrontPatch {
    initial_status_glyph: Option<String>,
    stock_check: Option<StockCheckMode>,
    stock_placeholder: Option<u32>,
    status_requires_admin: Option<bool>,
    presence: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TicketPatch {
    allocation: Option<AllocationPolicy>,
    append_requester_handle: Option<bool>,
    grant_admin_members: Option<bool>,
    close_revokes_send: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

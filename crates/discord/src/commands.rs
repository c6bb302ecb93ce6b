use std::sync::Arc;

use async_trait::async_trait;
use storefront_core::{ApplicationError, ChannelId, GuildId};
use thiserror::Error;

use crate::blocks::{InteractionReply, MessageTemplate};
use crate::events::Invoker;
use crate::offer::OfferPublisher;

pub const EMBED_COMMAND: &str = "embed";
pub const CHANGE_STOCK_COMMAND: &str = "changestock";
pub const STATUS_COMMAND: &str = "status";
pub const UPDATE_COMMAND: &str = "update";
pub const GLYPH_OPTION: &str = "emoji";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub options: Vec<(String, String)>,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub invoker: Invoker,
    pub request_id: String,
}

impl SlashCommandPayload {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontCommand {
    Embed,
    ChangeStock { glyph: String },
    Update,
    Unknown { name: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandPolicy {
    pub status_requires_admin: bool,
}

impl CommandPolicy {
    pub fn requires_admin(&self, command: &StorefrontCommand) -> bool {
        match command {
            StorefrontCommand::Embed | StorefrontCommand::Update => true,
            StorefrontCommand::ChangeStock { .. } => self.status_requires_admin,
            StorefrontCommand::Unknown { .. } => false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn parse_command(payload: &SlashCommandPayload) -> StorefrontCommand {
    match payload.command.trim_start_matches('/').to_ascii_lowercase().as_str() {
        EMBED_COMMAND => StorefrontCommand::Embed,
        CHANGE_STOCK_COMMAND | STATUS_COMMAND => StorefrontCommand::ChangeStock {
            glyph: payload.option(GLYPH_OPTION).unwrap_or_default().trim().to_owned(),
        },
        UPDATE_COMMAND => StorefrontCommand::Update,
        other => StorefrontCommand::Unknown { name: other.to_owned() },
    }
}

pub struct CommandRouter<S> {
    service: S,
    policy: CommandPolicy,
}

impl<S> CommandRouter<S>
where
    S: OfferCommandService,
{
    pub fn new(service: S, policy: CommandPolicy) -> Self {
        Self { service, policy }
    }

    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<InteractionReply, CommandRouteError> {
        let command = parse_command(payload);
        if self.policy.requires_admin(&command) && !payload.invoker.is_admin {
            let denial = ApplicationError::PermissionDenied(format!(
                "/{} requires administrator",
                payload.command
            ))
            .into_interface(payload.request_id.clone());
            return Ok(InteractionReply::private_text(denial.user_message()));
        }

        match command {
            StorefrontCommand::Embed => {
                self.service.publish_offer(&payload.request_id).await?;
                Ok(InteractionReply::private_text("✅ Offer embed posted."))
            }
            StorefrontCommand::ChangeStock { glyph } if glyph.is_empty() => {
                Ok(InteractionReply::private_text("❌ Provide a stock emoji."))
            }
            StorefrontCommand::ChangeStock { glyph } => {
                self.service.change_status(&glyph, &payload.request_id).await?;
                Ok(InteractionReply::public(MessageTemplate::text(format!(
                    "✅ Stock emoji updated to {glyph}!"
                ))))
            }
            StorefrontCommand::Update => {
                self.service.publish_offer(&payload.request_id).await?;
                Ok(InteractionReply::private_text("✅ Embed updated successfully!"))
            }
            StorefrontCommand::Unknown { name } => {
                Ok(InteractionReply::private_text(format!("❌ Unknown command `/{name}`.")))
            }
        }
    }
}

#[async_trait]
pub trait OfferCommandService: Send + Sync {
    async fn publish_offer(&self, request_id: &str) -> Result<(), CommandRouteError>;

    async fn change_status(&self, glyph: &str, request_id: &str) -> Result<(), CommandRouteError>;
}

#[async_trait]
impl OfferCommandService for OfferPublisher {
    async fn publish_offer(&self, request_id: &str) -> Result<(), CommandRouteError> {
        self.publish(request_id)
            .await
            .map(|_| ())
            .map_err(|error| CommandRouteError::Service(error.to_string()))
    }

    async fn change_status(&self, glyph: &str, request_id: &str) -> Result<(), CommandRouteError> {
        OfferPublisher::change_status(self, glyph, request_id)
            .await
            .map(|_| ())
            .map_err(|error| CommandRouteError::Service(error.to_string()))
    }
}

#[async_trait]
impl<T> OfferCommandService for Arc<T>
where
    T: OfferCommandService + ?Sized,
{
    async fn publish_offer(&self, request_id: &str) -> Result<(), CommandRouteError> {
        self.as_ref().publish_offer(request_id).await
    }

    async fn change_status(&self, glyph: &str, request_id: &str) -> Result<(), CommandRouteError> {
        self.as_ref().change_status(glyph, request_id).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOption {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
    pub options: Vec<CommandOption>,
}

/// Commands registered with the platform once the gateway is ready.
pub fn command_definitions(policy: CommandPolicy) -> Vec<CommandDefinition> {
    let glyph = || {
        vec![CommandOption {
            name: GLYPH_OPTION,
            description: "New stock emoji",
            required: true,
        }]
    };

    vec![
        CommandDefinition {
            name: EMBED_COMMAND,
            description: "Post the payment embed with purchase buttons",
            admin_only: true,
            options: Vec::new(),
        },
        CommandDefinition {
            name: CHANGE_STOCK_COMMAND,
            description: "Change the stock emoji (visible to everyone)",
            admin_only: policy.status_requires_admin,
            options: glyph(),
        },
        CommandDefinition {
            name: STATUS_COMMAND,
            description: "Change the stock emoji",
            admin_only: policy.status_requires_admin,
            options: glyph(),
        },
        CommandDefinition {
            name: UPDATE_COMMAND,
            description: "Refresh the payment embed manually",
            admin_only: true,
            options: Vec::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use storefront_core::{ChannelId, GuildId, UserId};
    use tokio::sync::Mutex;

    use super::{
        command_definitions, parse_command, CommandPolicy, CommandRouteError, CommandRouter,
        OfferCommandService, SlashCommandPayload, StorefrontCommand,
    };
    use crate::blocks::Visibility;
    use crate::events::Invoker;

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OfferCommandService for RecordingService {
        async fn publish_offer(&self, request_id: &str) -> Result<(), CommandRouteError> {
            self.calls.lock().await.push(format!("publish:{request_id}"));
            Ok(())
        }

        async fn change_status(
            &self,
            glyph: &str,
            request_id: &str,
        ) -> Result<(), CommandRouteError> {
            self.calls.lock().await.push(format!("status:{glyph}:{request_id}"));
            Ok(())
        }
    }

    fn payload(command: &str, is_admin: bool, options: &[(&str, &str)]) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            options: options
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
            guild_id: Some(GuildId(1)),
            channel_id: ChannelId(2),
            invoker: Invoker {
                user_id: UserId(3),
                handle: "alice".to_owned(),
                is_admin,
                role_ids: Vec::new(),
            },
            request_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn status_is_an_alias_for_changestock() {
        let command = parse_command(&payload("status", false, &[("emoji", " 🔴 ")]));
        assert_eq!(command, StorefrontCommand::ChangeStock { glyph: "🔴".to_owned() });
    }

    #[tokio::test]
    async fn admin_commands_deny_non_admins_privately() {
        let router = CommandRouter::new(RecordingService::default(), CommandPolicy::default());

        for name in ["embed", "update"] {
            let reply = router.route(&payload(name, false, &[])).await.expect("route");
            assert_eq!(reply.visibility, Visibility::Private);
            assert_eq!(
                reply.message.content.as_deref(),
                Some("❌ You don't have permission to use this command.")
            );
        }
        assert!(router.service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn changestock_is_open_by_default_and_replies_publicly() {
        let router = CommandRouter::new(RecordingService::default(), CommandPolicy::default());

        let reply =
            router.route(&payload("changestock", false, &[("emoji", "🔴")])).await.expect("route");

        assert_eq!(reply.visibility, Visibility::Public);
        assert_eq!(reply.message.content.as_deref(), Some("✅ Stock emoji updated to 🔴!"));
        assert_eq!(*router.service.calls.lock().await, vec!["status:🔴:req-1".to_owned()]);
    }

    #[tokio::test]
    async fn changestock_can_be_admin_gated() {
        let router = CommandRouter::new(
            RecordingService::default(),
            CommandPolicy { status_requires_admin: true },
        );

        let denied =
            router.route(&payload("changestock", false, &[("emoji", "🔴")])).await.expect("route");
        let allowed =
            router.route(&payload("changestock", true, &[("emoji", "🔴")])).await.expect("route");

        assert!(denied.message.content.unwrap_or_default().starts_with("❌"));
        assert_eq!(allowed.visibility, Visibility::Public);
    }

    #[tokio::test]
    async fn embed_and_update_republish_for_admins() {
        let router = CommandRouter::new(RecordingService::default(), CommandPolicy::default());

        let embed = router.route(&payload("embed", true, &[])).await.expect("route");
        let update = router.route(&payload("update", true, &[])).await.expect("route");

        assert_eq!(embed.message.content.as_deref(), Some("✅ Offer embed posted."));
        assert_eq!(update.message.content.as_deref(), Some("✅ Embed updated successfully!"));
        assert_eq!(router.service.calls.lock().await.len(), 2);
    }

    #[test]
    fn definitions_mark_admin_only_commands() {
        let definitions = command_definitions(CommandPolicy::default());
        let admin_only = definitions
            .iter()
            .filter(|definition| definition.admin_only)
            .map(|definition| definition.name)
            .collect::<Vec<_>>();
        assert_eq!(admin_only, vec!["embed", "update"]);
    }
}

use async_trait::async_trait;
use storefront_core::{ChannelId, GuildId, MessageId, RoleId, TranscriptEntry, UserId};
use thiserror::Error;

use crate::blocks::MessageTemplate;

pub mod memory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("{resource} was not found")]
    NotFound { resource: String },
    #[error("missing permission: {0}")]
    Forbidden(String),
    #[error("platform request failed: {0}")]
    Request(String),
}

impl PlatformError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessTarget {
    Everyone,
    Member(UserId),
    Role(RoleId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
    #[default]
    Inherit,
}

/// A per-channel permission override for one member or role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    pub target: AccessTarget,
    pub view: Access,
    pub send: Access,
}

impl AccessGrant {
    pub fn hidden_from_everyone() -> Self {
        Self { target: AccessTarget::Everyone, view: Access::Deny, send: Access::Inherit }
    }

    pub fn participant(user: UserId) -> Self {
        Self { target: AccessTarget::Member(user), view: Access::Allow, send: Access::Allow }
    }

    pub fn read_only(user: UserId) -> Self {
        Self { target: AccessTarget::Member(user), view: Access::Allow, send: Access::Deny }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRequest {
    pub name: String,
    pub category: ChannelId,
    pub grants: Vec<AccessGrant>,
}

/// Everything the storefront needs from the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn bot_user(&self) -> Result<UserId, PlatformError>;

    /// `Ok(None)` when the category does not exist in the guild.
    async fn channels_in_category(
        &self,
        guild: GuildId,
        category: ChannelId,
    ) -> Result<Option<Vec<ChannelSummary>>, PlatformError>;

    async fn resolve_channel(
        &self,
        channel: ChannelId,
    ) -> Result<Option<ChannelSummary>, PlatformError>;

    async fn create_private_channel(
        &self,
        guild: GuildId,
        request: ChannelRequest,
    ) -> Result<ChannelSummary, PlatformError>;

    async fn set_access(&self, channel: ChannelId, grant: AccessGrant) -> Result<(), PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    async fn administrator_members(&self, guild: GuildId) -> Result<Vec<UserId>, PlatformError>;

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId)
        -> Result<(), PlatformError>;

    async fn message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<String, PlatformError>;

    async fn edit_message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError>;

    /// Full channel history, oldest first.
    async fn history(&self, channel: ChannelId) -> Result<Vec<TranscriptEntry>, PlatformError>;

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;
}

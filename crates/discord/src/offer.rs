use std::sync::{Arc, OnceLock};

use regex::Regex;
use storefront_core::config::{GuildConfig, StockCheckMode, StorefrontConfig};
use storefront_core::{ChannelId, MessageId, OfferSession, RoleId};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::blocks::{offer_message, InteractionReply, OfferView};
use crate::platform::{ChatPlatform, PlatformError};

/// The marker runs to the end of the line or to the first markdown delimiter.
static STATUS_RE: OnceLock<Regex> = OnceLock::new();

fn status_re() -> &'static Regex {
    STATUS_RE.get_or_init(|| {
        Regex::new(r"STATUS:[ \t]*[^\n*_~`|]*").expect("status marker pattern is valid")
    })
}

#[derive(Debug, Error)]
pub enum OfferError {
    #[error("offer channel {0} is not reachable")]
    MissingOfferChannel(ChannelId),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Owns the single live offer message and the current status glyph.
pub struct OfferPublisher {
    platform: Arc<dyn ChatPlatform>,
    guild: GuildConfig,
    storefront: StorefrontConfig,
    session: Mutex<OfferSession>,
}

impl OfferPublisher {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        guild: GuildConfig,
        storefront: StorefrontConfig,
    ) -> Self {
        let session = Mutex::new(OfferSession::new(storefront.initial_status_glyph.clone()));
        Self { platform, guild, storefront, session }
    }

    pub async fn session(&self) -> OfferSession {
        self.session.lock().await.clone()
    }

    /// Replaces the tracked offer message with a freshly rendered one.
    pub async fn publish(&self, correlation_id: &str) -> Result<MessageId, OfferError> {
        let channel = self.guild.offer_channel();
        if self.platform.resolve_channel(channel).await?.is_none() {
            return Err(OfferError::MissingOfferChannel(channel));
        }

        let mut session = self.session.lock().await;
        if let Some(previous) = session.current_message {
            self.discard_previous(channel, previous, correlation_id).await;
        }

        let message = offer_message(&OfferView {
            status_glyph: &session.status_glyph,
            rules_channel: self.guild.rules_channel(),
            info_url: self.guild.info_url.as_deref(),
        });
        let message_id = self.platform.send_message(channel, &message).await?;
        session.replace_current(message_id);

        info!(
            event_name = "discord.offer.published",
            correlation_id = %correlation_id,
            channel_id = %channel,
            message_id = %message_id,
            status_glyph = %session.status_glyph,
            "offer message published"
        );
        Ok(message_id)
    }

    /// Stores the glyph, republishes, then patches the status message if one is configured.
    pub async fn change_status(
        &self,
        glyph: &str,
        correlation_id: &str,
    ) -> Result<MessageId, OfferError> {
        self.session.lock().await.set_status_glyph(glyph);
        let message_id = self.publish(correlation_id).await?;
        self.patch_status_message(glyph, correlation_id).await;
        Ok(message_id)
    }

    pub async fn check_stock(&self, invoker_roles: &[RoleId]) -> InteractionReply {
        match self.storefront.stock_check {
            StockCheckMode::Open => {
                let glyph = self.session.lock().await.status_glyph.clone();
                InteractionReply::private_text(format!("📦 Current stock: {glyph}"))
            }
            StockCheckMode::Gated => {
                let allowed = self
                    .guild
                    .stock_role_id
                    .is_some_and(|role| invoker_roles.contains(&RoleId(role)));
                if allowed {
                    InteractionReply::private_text(format!(
                        "📦 Current stock: {}",
                        self.storefront.stock_placeholder
                    ))
                } else {
                    InteractionReply::private_text("❌ You don't have permission to check stock.")
                }
            }
        }
    }

    async fn discard_previous(&self, channel: ChannelId, previous: MessageId, correlation_id: &str) {
        match self.platform.delete_message(channel, previous).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => debug!(
                event_name = "discord.offer.previous_missing",
                correlation_id = %correlation_id,
                message_id = %previous,
                "previous offer message already gone"
            ),
            Err(error) => warn!(
                event_name = "discord.offer.previous_delete_failed",
                correlation_id = %correlation_id,
                message_id = %previous,
                error = %error,
                "could not delete previous offer message"
            ),
        }
    }

    async fn patch_status_message(&self, glyph: &str, correlation_id: &str) {
        let Some(target) = self.guild.status_message else {
            return;
        };
        let channel = ChannelId(target.channel_id);
        let message = MessageId(target.message_id);

        let content = match self.platform.message_content(channel, message).await {
            Ok(content) => content,
            Err(error) => {
                debug!(
                    event_name = "discord.offer.status_message_unavailable",
                    correlation_id = %correlation_id,
                    message_id = %message,
                    error = %error,
                    "status message could not be fetched; skipping patch"
                );
                return;
            }
        };

        let Some(patched) = replace_status(&content, glyph) else {
            return;
        };
        if let Err(error) = self.platform.edit_message_content(channel, message, &patched).await {
            warn!(
                event_name = "discord.offer.status_patch_failed",
                correlation_id = %correlation_id,
                message_id = %message,
                error = %error,
                "status message patch failed"
            );
        }
    }
}

/// `None` when the text carries no `STATUS: <glyph>` marker.
pub fn replace_status(content: &str, glyph: &str) -> Option<String> {
    let pattern = status_re();
    if !pattern.is_match(content) {
        return None;
    }
    let patched = pattern.replace_all(content, |caps: &regex::Captures<'_>| {
        let marker = &caps[0];
        let trailing = &marker[marker.trim_end().len()..];
        format!("STATUS: {glyph}{trailing}")
    });
    Some(patched.into_owned())
}

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use storefront_core::config::AppConfig;
use storefront_core::{ChannelId, GuildId, MessageId, RoleId, UserId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    blocks::{
        ticket_form, FormTemplate, InteractionReply, Visibility, PAYMENT_FIELD_ID, QUANTITY_FIELD_ID,
    },
    commands::{CommandPolicy, CommandRouteError, CommandRouter, OfferCommandService, SlashCommandPayload},
    controls::ControlAction,
    offer::OfferPublisher,
    platform::{ChatPlatform, PlatformError},
    tickets::{TicketAction, TicketController, TicketError, TicketRequest},
};

pub const ACKNOWLEDGEMENT_GLYPH: &str = "✅";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscordEnvelope {
    pub envelope_id: String,
    pub event: DiscordEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscordEvent {
    SlashCommand(SlashCommandPayload),
    Component(ComponentEvent),
    FormSubmit(FormSubmitEvent),
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl DiscordEvent {
    pub fn event_type(&self) -> DiscordEventType {
        match self {
            Self::SlashCommand(_) => DiscordEventType::SlashCommand,
            Self::Component(_) => DiscordEventType::Component,
            Self::FormSubmit(_) => DiscordEventType::FormSubmit,
            Self::Message(_) => DiscordEventType::Message,
            Self::Unsupported { .. } => DiscordEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiscordEventType {
    SlashCommand,
    Component,
    FormSubmit,
    Message,
    Unsupported,
}

/// Who triggered an interaction, as resolved by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: UserId,
    pub handle: String,
    pub is_admin: bool,
    pub role_ids: Vec<RoleId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentEvent {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub custom_id: String,
    pub invoker: Invoker,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSubmitEvent {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub custom_id: String,
    pub fields: Vec<(String, String)>,
    pub invoker: Invoker,
}

impl FormSubmitEvent {
    pub fn field(&self, custom_id: &str) -> &str {
        self.fields
            .iter()
            .find(|(key, _)| key == custom_id)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_is_bot: bool,
}

/// Sends the initial interaction response ahead of the handler's own result.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn acknowledge(&self, reply: InteractionReply) -> Result<(), PlatformError>;

    /// Claims the interaction before slow work; the eventual reply edits the placeholder.
    async fn defer(&self, _visibility: Visibility) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct NoopAcknowledger;

#[async_trait]
impl Acknowledger for NoopAcknowledger {
    async fn acknowledge(&self, _reply: InteractionReply) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct EventContext {
    pub correlation_id: String,
    pub acknowledger: Arc<dyn Acknowledger>,
}

impl EventContext {
    pub fn new(correlation_id: impl Into<String>, acknowledger: Arc<dyn Acknowledger>) -> Self {
        Self { correlation_id: correlation_id.into(), acknowledger }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self {
            correlation_id: "unknown-correlation-id".to_owned(),
            acknowledger: Arc::new(NoopAcknowledger),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied(InteractionReply),
    OpenForm(FormTemplate),
    /// The response was already sent through the context's acknowledger.
    Acknowledged,
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> DiscordEventType;
    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<DiscordEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires every storefront handler against shared services.
pub fn storefront_dispatcher(
    platform: Arc<dyn ChatPlatform>,
    offer: Arc<OfferPublisher>,
    tickets: Arc<TicketController>,
    config: &AppConfig,
) -> EventDispatcher {
    let policy = CommandPolicy { status_requires_admin: config.storefront.status_requires_admin };
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(offer.clone(), policy));
    dispatcher.register(ComponentHandler::new(offer, tickets.clone()));
    dispatcher.register(FormSubmitHandler::new(tickets));
    dispatcher.register(MessageHandler::new(
        platform,
        config.guild.reaction_channel_id.map(ChannelId),
    ));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: OfferCommandService,
{
    pub fn new(service: S, policy: CommandPolicy) -> Self {
        Self { router: CommandRouter::new(service, policy) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: OfferCommandService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = self.router.route(payload).await?;
        Ok(HandlerResult::Replied(reply))
    }
}

pub struct ComponentHandler {
    offer: Arc<OfferPublisher>,
    tickets: Arc<TicketController>,
}

impl ComponentHandler {
    pub fn new(offer: Arc<OfferPublisher>, tickets: Arc<TicketController>) -> Self {
        Self { offer, tickets }
    }
}

#[async_trait]
impl EventHandler for ComponentHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::Component
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::Component(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(action) = ControlAction::parse(&event.custom_id) else {
            debug!(
                event_name = "discord.component.unknown",
                correlation_id = %ctx.correlation_id,
                custom_id = %event.custom_id,
                "ignoring unknown component"
            );
            return Ok(HandlerResult::Ignored);
        };

        let actor = event.invoker.user_id;
        let correlation_id = ctx.correlation_id.as_str();
        let outcome = match action {
            ControlAction::Purchase => Ok(HandlerResult::OpenForm(ticket_form())),
            ControlAction::CheckStock => {
                Ok(HandlerResult::Replied(self.offer.check_stock(&event.invoker.role_ids).await))
            }
            ControlAction::SubmitOrder => Ok(HandlerResult::Ignored),
            ControlAction::CloseTicket { channel, owner } => self
                .tickets
                .close(
                    TicketAction { channel, owner, actor },
                    ctx.acknowledger.as_ref(),
                    correlation_id,
                )
                .await
                .map(HandlerResult::Replied),
            ControlAction::ReopenTicket { channel, owner } => self
                .tickets
                .reopen(
                    TicketAction { channel, owner, actor },
                    ctx.acknowledger.as_ref(),
                    correlation_id,
                )
                .await
                .map(HandlerResult::Replied),
            ControlAction::Transcript { channel, owner } => self
                .tickets
                .transcript(
                    TicketAction { channel, owner, actor },
                    ctx.acknowledger.as_ref(),
                    correlation_id,
                )
                .await
                .map(HandlerResult::Replied),
            ControlAction::DeleteTicket { channel, owner } => self
                .tickets
                .delete(
                    TicketAction { channel, owner, actor },
                    ctx.acknowledger.as_ref(),
                    correlation_id,
                )
                .await
                .map(|()| HandlerResult::Acknowledged),
        };

        Ok(outcome.unwrap_or_else(|error| ticket_failure(&error, correlation_id)))
    }
}

pub struct FormSubmitHandler {
    tickets: Arc<TicketController>,
}

impl FormSubmitHandler {
    pub fn new(tickets: Arc<TicketController>) -> Self {
        Self { tickets }
    }
}

#[async_trait]
impl EventHandler for FormSubmitHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::FormSubmit
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::FormSubmit(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if ControlAction::parse(&event.custom_id) != Some(ControlAction::SubmitOrder) {
            return Ok(HandlerResult::Ignored);
        }
        let Some(guild) = event.guild_id else {
            return Ok(HandlerResult::Replied(InteractionReply::private_text(
                "❌ Tickets can only be opened inside the server.",
            )));
        };

        let request = TicketRequest {
            guild,
            requester: event.invoker.user_id,
            requester_handle: event.invoker.handle.clone(),
            quantity: event.field(QUANTITY_FIELD_ID).to_owned(),
            payment: event.field(PAYMENT_FIELD_ID).to_owned(),
        };
        Ok(match self
            .tickets
            .create(request, ctx.acknowledger.as_ref(), &ctx.correlation_id)
            .await {
            Ok(reply) => HandlerResult::Replied(reply),
            Err(error) => ticket_failure(&error, &ctx.correlation_id),
        })
    }
}

/// Acknowledges every human message in the configured channel with a reaction.
pub struct MessageHandler {
    platform: Arc<dyn ChatPlatform>,
    reaction_channel: Option<ChannelId>,
}

impl MessageHandler {
    pub fn new(platform: Arc<dyn ChatPlatform>, reaction_channel: Option<ChannelId>) -> Self {
        Self { platform, reaction_channel }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::Message
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.author_is_bot || self.reaction_channel != Some(event.channel_id) {
            return Ok(HandlerResult::Ignored);
        }

        if let Err(error) = self
            .platform
            .add_reaction(event.channel_id, event.message_id, ACKNOWLEDGEMENT_GLYPH)
            .await
        {
            debug!(
                event_name = "discord.message.react_failed",
                correlation_id = %ctx.correlation_id,
                message_id = %event.message_id,
                error = %error,
                "could not add acknowledgement reaction"
            );
        }
        Ok(HandlerResult::Processed)
    }
}

fn ticket_failure(error: &TicketError, correlation_id: &str) -> HandlerResult {
    warn!(
        event_name = "discord.ticket.action_failed",
        correlation_id = %correlation_id,
        error = %error,
        "ticket action failed"
    );
    HandlerResult::Replied(InteractionReply::private_text(error.user_message(correlation_id)))
}

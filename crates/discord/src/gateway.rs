//! Serenity adapter.
//!
//! `SerenityPlatform` implements [`ChatPlatform`] over the REST client and
//! `GatewayHandler` turns gateway events into [`DiscordEnvelope`]s for the
//! dispatcher, then renders the handler result back as an interaction response.

use std::num::NonZeroU64;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ActionRowComponent, ActivityData, ButtonStyle as SerenityButtonStyle, ChannelType, Client,
    Command, CommandInteraction, ComponentInteraction, Context, CreateActionRow, CreateAttachment,
    CreateButton, CreateChannel, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateEmbedAuthor, CreateEmbedFooter, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
    CreateModal, EditInteractionResponse, EditMessage, EventHandler, GatewayIntents, GetMessages, Http, InputTextStyle,
    Interaction, Member, Message, ModalInteraction, PermissionOverwrite, PermissionOverwriteType,
    Permissions, ReactionType, Ready,
};
use storefront_core::{
    ChannelId, GuildId, InterfaceError, MessageId, RoleId, TranscriptEntry, UserId,
};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use crate::blocks::{
    ButtonElement, ButtonStyle, ButtonTarget, EmbedTemplate, FormTemplate, InteractionReply,
    MessageTemplate, Visibility,
};
use crate::commands::{CommandDefinition, SlashCommandPayload};
use crate::events::{
    Acknowledger, ComponentEvent, DiscordEnvelope, DiscordEvent, EventContext, EventDispatcher,
    FormSubmitEvent, HandlerResult, Invoker, MessageEvent, NoopAcknowledger,
};
use crate::platform::{
    Access, AccessGrant, AccessTarget, ChannelRequest, ChannelSummary, ChatPlatform, PlatformError,
};

const HISTORY_PAGE_SIZE: u8 = 100;
const MEMBER_PAGE_SIZE: u64 = 1000;
const BUTTONS_PER_ROW: usize = 5;

pub fn gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("discord client failed: {0}")]
    Client(#[from] serenity::Error),
}

/// Builds the gateway client. Call `start` on the result to connect.
pub async fn connect(token: &str, handler: GatewayHandler) -> Result<Client, GatewayError> {
    Ok(Client::builder(token, gateway_intents()).event_handler(handler).await?)
}

pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_user: OnceCell<UserId>,
}

impl SerenityPlatform {
    pub fn new(token: &str) -> Self {
        Self { http: Arc::new(Http::new(token)), bot_user: OnceCell::new() }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

fn snowflake<T>(raw: u64, resource: &str) -> Result<T, PlatformError>
where
    T: From<NonZeroU64>,
{
    NonZeroU64::new(raw).map(T::from).ok_or_else(|| PlatformError::not_found(resource.to_owned()))
}

fn map_error(error: serenity::Error, resource: impl Into<String>) -> PlatformError {
    if let serenity::Error::Http(http_error) = &error {
        match http_error.status_code().map(|status| status.as_u16()) {
            Some(404) => return PlatformError::not_found(resource),
            Some(403) => return PlatformError::Forbidden(error.to_string()),
            _ => {}
        }
    }
    PlatformError::Request(error.to_string())
}

fn allow_deny(grant: &AccessGrant) -> (Permissions, Permissions) {
    let mut allow = Permissions::empty();
    let mut deny = Permissions::empty();
    for (access, bit) in
        [(grant.view, Permissions::VIEW_CHANNEL), (grant.send, Permissions::SEND_MESSAGES)]
    {
        match access {
            Access::Allow => allow |= bit,
            Access::Deny => deny |= bit,
            Access::Inherit => {}
        }
    }
    (allow, deny)
}

pub fn permission_overwrite(
    everyone: RoleId,
    grant: &AccessGrant,
) -> Result<PermissionOverwrite, PlatformError> {
    let kind = match grant.target {
        AccessTarget::Everyone => PermissionOverwriteType::Role(snowflake(everyone.0, "role")?),
        AccessTarget::Role(role) => PermissionOverwriteType::Role(snowflake(role.0, "role")?),
        AccessTarget::Member(user) => PermissionOverwriteType::Member(snowflake(user.0, "user")?),
    };
    let (allow, deny) = allow_deny(grant);
    Ok(PermissionOverwrite { allow, deny, kind })
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn bot_user(&self) -> Result<UserId, PlatformError> {
        self.bot_user
            .get_or_try_init(|| async {
                let user = self
                    .http()
                    .get_current_user()
                    .await
                    .map_err(|error| map_error(error, "current user"))?;
                Ok(UserId(user.id.get()))
            })
            .await
            .copied()
    }

    async fn channels_in_category(
        &self,
        guild: GuildId,
        category: ChannelId,
    ) -> Result<Option<Vec<ChannelSummary>>, PlatformError> {
        let guild_id: serenity::all::GuildId = snowflake(guild.0, "guild")?;
        let channels =
            guild_id.channels(self.http()).await.map_err(|error| map_error(error, "guild channels"))?;

        let is_category = channels
            .values()
            .any(|channel| channel.id.get() == category.0 && channel.kind == ChannelType::Category);
        if !is_category {
            return Ok(None);
        }

        Ok(Some(
            channels
                .values()
                .filter(|channel| channel.parent_id.is_some_and(|parent| parent.get() == category.0))
                .map(|channel| ChannelSummary {
                    id: ChannelId(channel.id.get()),
                    name: channel.name.clone(),
                })
                .collect(),
        ))
    }

    async fn resolve_channel(
        &self,
        channel: ChannelId,
    ) -> Result<Option<ChannelSummary>, PlatformError> {
        let Ok(channel_id) = snowflake::<serenity::all::ChannelId>(channel.0, "channel") else {
            return Ok(None);
        };
        match channel_id.to_channel(self.http()).await {
            Ok(resolved) => Ok(resolved.guild().map(|guild_channel| ChannelSummary {
                id: channel,
                name: guild_channel.name,
            })),
            Err(error) => match map_error(error, format!("channel {channel}")) {
                PlatformError::NotFound { .. } | PlatformError::Forbidden(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create_private_channel(
        &self,
        guild: GuildId,
        request: ChannelRequest,
    ) -> Result<ChannelSummary, PlatformError> {
        let guild_id: serenity::all::GuildId = snowflake(guild.0, "guild")?;
        let category: serenity::all::ChannelId = snowflake(request.category.0, "category")?;
        let overwrites = request
            .grants
            .iter()
            .map(|grant| permission_overwrite(guild.everyone_role(), grant))
            .collect::<Result<Vec<_>, _>>()?;

        let builder = CreateChannel::new(request.name.as_str())
            .kind(ChannelType::Text)
            .category(category)
            .permissions(overwrites);
        let created = guild_id
            .create_channel(self.http(), builder)
            .await
            .map_err(|error| map_error(error, format!("category {}", request.category)))?;

        Ok(ChannelSummary { id: ChannelId(created.id.get()), name: created.name })
    }

    async fn set_access(&self, channel: ChannelId, grant: AccessGrant) -> Result<(), PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let everyone = match grant.target {
            AccessTarget::Everyone => {
                let resolved = channel_id
                    .to_channel(self.http())
                    .await
                    .map_err(|error| map_error(error, format!("channel {channel}")))?;
                let guild_channel = resolved
                    .guild()
                    .ok_or_else(|| PlatformError::not_found(format!("guild channel {channel}")))?;
                GuildId(guild_channel.guild_id.get()).everyone_role()
            }
            _ => RoleId(0),
        };

        let overwrite = permission_overwrite(everyone, &grant)?;
        channel_id
            .create_permission(self.http(), overwrite)
            .await
            .map_err(|error| map_error(error, format!("channel {channel}")))
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        channel_id
            .delete(self.http())
            .await
            .map(|_| ())
            .map_err(|error| map_error(error, format!("channel {channel}")))
    }

    async fn administrator_members(&self, guild: GuildId) -> Result<Vec<UserId>, PlatformError> {
        let guild_id: serenity::all::GuildId = snowflake(guild.0, "guild")?;
        let roles = guild_id.roles(self.http()).await.map_err(|error| map_error(error, "roles"))?;
        let admin_roles = roles
            .values()
            .filter(|role| role.permissions.administrator())
            .map(|role| role.id)
            .collect::<Vec<_>>();

        let mut admins = Vec::new();
        let mut after = None;
        loop {
            let page: Vec<Member> = guild_id
                .members(self.http(), Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(|error| map_error(error, "members"))?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.user.id);
            let full_page = page.len() as u64 == MEMBER_PAGE_SIZE;

            admins.extend(
                page.iter()
                    .filter(|member| !member.user.bot)
                    .filter(|member| member.roles.iter().any(|role| admin_roles.contains(role)))
                    .map(|member| UserId(member.user.id.get())),
            );
            if !full_page {
                break;
            }
        }
        Ok(admins)
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let sent = channel_id
            .send_message(self.http(), render_message(message))
            .await
            .map_err(|error| map_error(error, format!("channel {channel}")))?;
        Ok(MessageId(sent.id.get()))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let message_id: serenity::all::MessageId = snowflake(message.0, "message")?;
        channel_id
            .delete_message(self.http(), message_id)
            .await
            .map_err(|error| map_error(error, format!("message {message}")))
    }

    async fn message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<String, PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let message_id: serenity::all::MessageId = snowflake(message.0, "message")?;
        channel_id
            .message(self.http(), message_id)
            .await
            .map(|fetched| fetched.content)
            .map_err(|error| map_error(error, format!("message {message}")))
    }

    async fn edit_message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let message_id: serenity::all::MessageId = snowflake(message.0, "message")?;
        channel_id
            .edit_message(self.http(), message_id, EditMessage::new().content(content))
            .await
            .map(|_| ())
            .map_err(|error| map_error(error, format!("message {message}")))
    }

    async fn history(&self, channel: ChannelId) -> Result<Vec<TranscriptEntry>, PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let mut entries = Vec::new();
        let mut before = None;

        // Pages arrive newest first.
        loop {
            let mut request = GetMessages::new().limit(HISTORY_PAGE_SIZE);
            if let Some(before) = before {
                request = request.before(before);
            }
            let page = channel_id
                .messages(self.http(), request)
                .await
                .map_err(|error| map_error(error, format!("channel {channel}")))?;
            let Some(oldest) = page.last() else {
                break;
            };
            before = Some(oldest.id);
            let full_page = page.len() == usize::from(HISTORY_PAGE_SIZE);
            entries.extend(page.iter().map(transcript_entry));
            if !full_page {
                break;
            }
        }

        entries.reverse();
        Ok(entries)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        let channel_id: serenity::all::ChannelId = snowflake(channel.0, "channel")?;
        let message_id: serenity::all::MessageId = snowflake(message.0, "message")?;
        channel_id
            .create_reaction(self.http(), message_id, ReactionType::Unicode(emoji.to_owned()))
            .await
            .map_err(|error| map_error(error, format!("message {message}")))
    }
}

fn transcript_entry(message: &Message) -> TranscriptEntry {
    let timestamp =
        DateTime::<Utc>::from_timestamp(message.timestamp.unix_timestamp(), 0).unwrap_or_default();
    TranscriptEntry { timestamp, author: message.author.tag(), content: message.content.clone() }
}

fn render_embed(template: &EmbedTemplate) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(author) = &template.author {
        embed = embed.author(CreateEmbedAuthor::new(author));
    }
    if let Some(title) = &template.title {
        embed = embed.title(title);
    }
    if let Some(description) = &template.description {
        embed = embed.description(description);
    }
    if let Some(color) = template.color {
        embed = embed.color(color);
    }
    for field in &template.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(url) = &template.image_url {
        embed = embed.image(url);
    }
    if let Some(footer) = &template.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed
}

fn render_button(button: &ButtonElement) -> CreateButton {
    let mut rendered = match &button.target {
        ButtonTarget::Action { custom_id } => CreateButton::new(custom_id).style(match button.style {
            ButtonStyle::Primary => SerenityButtonStyle::Primary,
            ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
            ButtonStyle::Success => SerenityButtonStyle::Success,
            ButtonStyle::Danger => SerenityButtonStyle::Danger,
        }),
        ButtonTarget::Link { url } => CreateButton::new_link(url),
    };
    rendered = rendered.label(&button.label);
    if let Some(emoji) = &button.emoji {
        rendered = rendered.emoji(ReactionType::Unicode(emoji.clone()));
    }
    rendered
}

fn render_rows(buttons: &[ButtonElement]) -> Vec<CreateActionRow> {
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| CreateActionRow::Buttons(row.iter().map(render_button).collect()))
        .collect()
}

fn render_message(template: &MessageTemplate) -> CreateMessage {
    let mut message = CreateMessage::new()
        .embeds(template.embeds.iter().map(render_embed).collect())
        .components(render_rows(&template.buttons));
    if let Some(content) = &template.content {
        message = message.content(content);
    }
    if let Some(attachment) = &template.attachment {
        message = message
            .add_file(CreateAttachment::bytes(attachment.data.clone(), attachment.filename.clone()));
    }
    message
}

fn render_reply(reply: &InteractionReply) -> CreateInteractionResponseMessage {
    let template = &reply.message;
    let mut message = CreateInteractionResponseMessage::new()
        .embeds(template.embeds.iter().map(render_embed).collect())
        .components(render_rows(&template.buttons))
        .ephemeral(reply.visibility == Visibility::Private);
    if let Some(content) = &template.content {
        message = message.content(content);
    }
    if let Some(attachment) = &template.attachment {
        message = message
            .add_file(CreateAttachment::bytes(attachment.data.clone(), attachment.filename.clone()));
    }
    message
}

fn render_edit(reply: &InteractionReply) -> EditInteractionResponse {
    let template = &reply.message;
    let mut edit = EditInteractionResponse::new()
        .embeds(template.embeds.iter().map(render_embed).collect())
        .components(render_rows(&template.buttons));
    if let Some(content) = &template.content {
        edit = edit.content(content);
    }
    if let Some(attachment) = &template.attachment {
        edit = edit.new_attachment(CreateAttachment::bytes(
            attachment.data.clone(),
            attachment.filename.clone(),
        ));
    }
    edit
}

fn render_followup(reply: &InteractionReply) -> CreateInteractionResponseFollowup {
    let template = &reply.message;
    let mut followup = CreateInteractionResponseFollowup::new()
        .embeds(template.embeds.iter().map(render_embed).collect())
        .components(render_rows(&template.buttons))
        .ephemeral(reply.visibility == Visibility::Private);
    if let Some(content) = &template.content {
        followup = followup.content(content);
    }
    followup
}

fn render_form(form: &FormTemplate) -> CreateModal {
    let rows = form
        .fields
        .iter()
        .map(|field| {
            CreateActionRow::InputText(
                CreateInputText::new(InputTextStyle::Short, &field.label, &field.custom_id)
                    .required(field.required)
                    .max_length(field.max_length),
            )
        })
        .collect();
    CreateModal::new(&form.custom_id, &form.title).components(rows)
}

fn render_command(definition: &CommandDefinition) -> CreateCommand {
    let mut command = CreateCommand::new(definition.name).description(definition.description);
    if definition.admin_only {
        command = command.default_member_permissions(Permissions::ADMINISTRATOR);
    }
    for option in &definition.options {
        command = command.add_option(
            CreateCommandOption::new(
                serenity::all::CommandOptionType::String,
                option.name,
                option.description,
            )
            .required(option.required),
        );
    }
    command
}

fn invoker(user: &serenity::all::User, member: Option<&Member>) -> Invoker {
    Invoker {
        user_id: UserId(user.id.get()),
        handle: user.name.clone(),
        is_admin: member
            .and_then(|member| member.permissions)
            .is_some_and(|permissions| permissions.administrator()),
        role_ids: member
            .map(|member| member.roles.iter().map(|role| RoleId(role.get())).collect())
            .unwrap_or_default(),
    }
}

fn form_fields(interaction: &ModalInteraction) -> Vec<(String, String)> {
    interaction
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => {
                Some((input.custom_id.clone(), input.value.clone().unwrap_or_default()))
            }
            _ => None,
        })
        .collect()
}

#[derive(Clone)]
enum Responder {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

impl Responder {
    async fn respond(&self, http: &Http, response: CreateInteractionResponse) -> serenity::Result<()> {
        match self {
            Self::Command(interaction) => interaction.create_response(http, response).await,
            Self::Component(interaction) => interaction.create_response(http, response).await,
            Self::Modal(interaction) => interaction.create_response(http, response).await,
        }
    }

    async fn follow_up(
        &self,
        http: &Http,
        followup: CreateInteractionResponseFollowup,
    ) -> serenity::Result<Message> {
        match self {
            Self::Command(interaction) => interaction.create_followup(http, followup).await,
            Self::Component(interaction) => interaction.create_followup(http, followup).await,
            Self::Modal(interaction) => interaction.create_followup(http, followup).await,
        }
    }

    async fn edit(&self, http: &Http, edit: EditInteractionResponse) -> serenity::Result<Message> {
        match self {
            Self::Command(interaction) => interaction.edit_response(http, edit).await,
            Self::Component(interaction) => interaction.edit_response(http, edit).await,
            Self::Modal(interaction) => interaction.edit_response(http, edit).await,
        }
    }

    async fn delete(&self, http: &Http) -> serenity::Result<()> {
        match self {
            Self::Command(interaction) => interaction.delete_response(http).await,
            Self::Component(interaction) => interaction.delete_response(http).await,
            Self::Modal(interaction) => interaction.delete_response(http).await,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResponseState {
    Pending,
    Deferred(Visibility),
    Responded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Respond,
    EditDeferred,
    /// The deferred placeholder has the wrong visibility, so it is removed and the reply follows up.
    ReplaceDeferred,
    FollowUp,
}

fn delivery_route(state: ResponseState, visibility: Visibility) -> Delivery {
    match state {
        ResponseState::Pending => Delivery::Respond,
        ResponseState::Deferred(deferred) if deferred == visibility => Delivery::EditDeferred,
        ResponseState::Deferred(_) => Delivery::ReplaceDeferred,
        ResponseState::Responded => Delivery::FollowUp,
    }
}

/// Tracks the single initial response Discord allows and routes every later reply around it.
struct InteractionAcknowledger {
    http: Arc<Http>,
    responder: Responder,
    state: Mutex<ResponseState>,
}

impl InteractionAcknowledger {
    fn new(http: Arc<Http>, responder: Responder) -> Self {
        Self { http, responder, state: Mutex::new(ResponseState::Pending) }
    }

    async fn send(&self, reply: &InteractionReply) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        let result = match delivery_route(*state, reply.visibility) {
            Delivery::Respond => {
                self.responder
                    .respond(&self.http, CreateInteractionResponse::Message(render_reply(reply)))
                    .await
            }
            Delivery::EditDeferred => {
                self.responder.edit(&self.http, render_edit(reply)).await.map(|_| ())
            }
            Delivery::ReplaceDeferred => {
                if let Err(error) = self.responder.delete(&self.http).await {
                    debug!(
                        event_name = "discord.interaction.placeholder_delete_failed",
                        error = %error,
                        "could not remove deferred placeholder"
                    );
                }
                self.responder.follow_up(&self.http, render_followup(reply)).await.map(|_| ())
            }
            Delivery::FollowUp => {
                self.responder.follow_up(&self.http, render_followup(reply)).await.map(|_| ())
            }
        };
        *state = ResponseState::Responded;
        result.map_err(|error| map_error(error, "interaction"))
    }

    async fn open_form(&self, form: &FormTemplate) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        *state = ResponseState::Responded;
        self.responder
            .respond(&self.http, CreateInteractionResponse::Modal(render_form(form)))
            .await
            .map_err(|error| map_error(error, "interaction"))
    }
}

#[async_trait]
impl Acknowledger for InteractionAcknowledger {
    async fn acknowledge(&self, reply: InteractionReply) -> Result<(), PlatformError> {
        self.send(&reply).await
    }

    async fn defer(&self, visibility: Visibility) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if *state != ResponseState::Pending {
            return Ok(());
        }
        let message =
            CreateInteractionResponseMessage::new().ephemeral(visibility == Visibility::Private);
        self.responder
            .respond(&self.http, CreateInteractionResponse::Defer(message))
            .await
            .map_err(|error| map_error(error, "interaction"))?;
        *state = ResponseState::Deferred(visibility);
        Ok(())
    }
}

pub struct GatewayHandler {
    dispatcher: Arc<EventDispatcher>,
    commands: Vec<CommandDefinition>,
    presence: String,
}

impl GatewayHandler {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        commands: Vec<CommandDefinition>,
        presence: impl Into<String>,
    ) -> Self {
        Self { dispatcher, commands, presence: presence.into() }
    }

    async fn dispatch_interaction(&self, ctx: &Context, envelope: DiscordEnvelope, responder: Responder) {
        let acknowledger = Arc::new(InteractionAcknowledger::new(ctx.http.clone(), responder));
        let event_ctx = EventContext::new(envelope.envelope_id.clone(), acknowledger.clone());

        let delivered = match self.dispatcher.dispatch(&envelope, &event_ctx).await {
            Ok(HandlerResult::Replied(reply)) => acknowledger.send(&reply).await,
            Ok(HandlerResult::OpenForm(form)) => acknowledger.open_form(&form).await,
            Ok(HandlerResult::Acknowledged | HandlerResult::Processed | HandlerResult::Ignored) => {
                Ok(())
            }
            Err(dispatch_error) => {
                error!(
                    event_name = "discord.interaction.failed",
                    correlation_id = %envelope.envelope_id,
                    error = %dispatch_error,
                    "interaction handler failed"
                );
                let interface = InterfaceError::ServiceUnavailable {
                    message: dispatch_error.to_string(),
                    correlation_id: envelope.envelope_id.clone(),
                };
                acknowledger.send(&InteractionReply::private_text(interface.user_message())).await
            }
        };

        if let Err(delivery_error) = delivered {
            warn!(
                event_name = "discord.interaction.response_failed",
                correlation_id = %envelope.envelope_id,
                error = %delivery_error,
                "could not deliver interaction response"
            );
        }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let commands = self.commands.iter().map(render_command).collect::<Vec<_>>();
        match Command::set_global_commands(&ctx.http, commands).await {
            Ok(registered) => info!(
                event_name = "discord.commands.synced",
                commands = registered.len(),
                "slash commands registered"
            ),
            Err(sync_error) => warn!(
                event_name = "discord.commands.sync_failed",
                error = %sync_error,
                "slash command registration failed"
            ),
        }

        ctx.set_activity(Some(ActivityData::watching(self.presence.clone())));
        info!(
            event_name = "discord.gateway.ready",
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "✅ Logged in as {}",
            ready.user.tag()
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let envelope = DiscordEnvelope {
            envelope_id: format!("msg-{}", msg.id),
            event: DiscordEvent::Message(MessageEvent {
                channel_id: ChannelId(msg.channel_id.get()),
                message_id: MessageId(msg.id.get()),
                author_id: UserId(msg.author.id.get()),
                author_is_bot: msg.author.bot,
            }),
        };
        let ctx = EventContext::new(envelope.envelope_id.clone(), Arc::new(NoopAcknowledger));
        if let Err(dispatch_error) = self.dispatcher.dispatch(&envelope, &ctx).await {
            debug!(
                event_name = "discord.message.failed",
                correlation_id = %envelope.envelope_id,
                error = %dispatch_error,
                "message handler failed"
            );
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                let options = command
                    .data
                    .options
                    .iter()
                    .filter_map(|option| {
                        option.value.as_str().map(|value| (option.name.clone(), value.to_owned()))
                    })
                    .collect();
                let envelope = DiscordEnvelope {
                    envelope_id: command.id.to_string(),
                    event: DiscordEvent::SlashCommand(SlashCommandPayload {
                        command: command.data.name.clone(),
                        options,
                        guild_id: command.guild_id.map(|guild| GuildId(guild.get())),
                        channel_id: ChannelId(command.channel_id.get()),
                        invoker: invoker(&command.user, command.member.as_deref()),
                        request_id: command.id.to_string(),
                    }),
                };
                self.dispatch_interaction(&ctx, envelope, Responder::Command(command)).await;
            }
            Interaction::Component(component) => {
                let envelope = DiscordEnvelope {
                    envelope_id: component.id.to_string(),
                    event: DiscordEvent::Component(ComponentEvent {
                        guild_id: component.guild_id.map(|guild| GuildId(guild.get())),
                        channel_id: ChannelId(component.channel_id.get()),
                        message_id: MessageId(component.message.id.get()),
                        custom_id: component.data.custom_id.clone(),
                        invoker: invoker(&component.user, component.member.as_ref()),
                    }),
                };
                self.dispatch_interaction(&ctx, envelope, Responder::Component(component)).await;
            }
            Interaction::Modal(modal) => {
                let envelope = DiscordEnvelope {
                    envelope_id: modal.id.to_string(),
                    event: DiscordEvent::FormSubmit(FormSubmitEvent {
                        guild_id: modal.guild_id.map(|guild| GuildId(guild.get())),
                        channel_id: ChannelId(modal.channel_id.get()),
                        custom_id: modal.data.custom_id.clone(),
                        fields: form_fields(&modal),
                        invoker: invoker(&modal.user, modal.member.as_ref()),
                    }),
                };
                self.dispatch_interaction(&ctx, envelope, Responder::Modal(modal)).await;
            }
            other => debug!(
                event_name = "discord.interaction.unsupported",
                kind = ?other.kind(),
                "ignoring unsupported interaction"
            ),
        }
    }
}

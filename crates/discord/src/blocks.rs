use serde::Serialize;
use storefront_core::{ChannelId, TicketNumber, UserId};

use crate::controls::ControlAction;

pub const COLOR_DARK_GREY: u32 = 0x607D8B;
pub const COLOR_OFFER: u32 = 0xFFA43D;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ButtonTarget {
    Action { custom_id: String },
    Link { url: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub label: String,
    pub target: ButtonTarget,
    pub style: ButtonStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl ButtonElement {
    pub fn action(action: &ControlAction, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Action { custom_id: action.custom_id() },
            style: ButtonStyle::Secondary,
            emoji: None,
        }
    }

    pub fn link(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Link { url: url.into() },
            style: ButtonStyle::Secondary,
            emoji: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn custom_id(&self) -> Option<&str> {
        match &self.target {
            ButtonTarget::Action { custom_id } => Some(custom_id),
            ButtonTarget::Link { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EmbedTemplate {
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub image_url: Option<String>,
    pub footer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub content: Option<String>,
    pub embeds: Vec<EmbedTemplate>,
    pub buttons: Vec<ButtonElement>,
    pub attachment: Option<Attachment>,
}

impl MessageTemplate {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    /// Content and embed text joined, for assertions and log previews.
    pub fn fallback_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content.clone());
        }
        for embed in &self.embeds {
            parts.extend(embed.title.clone());
            parts.extend(embed.description.clone());
        }
        parts.join("\n")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the invoking user sees the reply.
    Private,
    Public,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractionReply {
    pub message: MessageTemplate,
    pub visibility: Visibility,
}

impl InteractionReply {
    pub fn private(message: MessageTemplate) -> Self {
        Self { message, visibility: Visibility::Private }
    }

    pub fn public(message: MessageTemplate) -> Self {
        Self { message, visibility: Visibility::Public }
    }

    pub fn private_text(text: impl Into<String>) -> Self {
        Self::private(MessageTemplate::text(text))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub custom_id: String,
    pub label: String,
    pub required: bool,
    pub max_length: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormTemplate {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<FormField>,
}

pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<EmbedTemplate>,
    buttons: Vec<ButtonElement>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { content: None, embeds: Vec::new(), buttons: Vec::new() }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embeds.push(builder.build());
        self
    }

    pub fn actions<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.buttons.extend(builder.build());
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            content: self.content,
            embeds: self.embeds,
            buttons: self.buttons,
            attachment: None,
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    embed: EmbedTemplate,
}

impl EmbedBuilder {
    pub fn author(&mut self, name: impl Into<String>) -> &mut Self {
        self.embed.author = Some(name.into());
        self
    }

    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.embed.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.embed.color = Some(color);
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.embed.fields.push(EmbedField { name: name.into(), value: value.into(), inline: false });
        self
    }

    pub fn image(&mut self, url: impl Into<String>) -> &mut Self {
        self.embed.image_url = Some(url.into());
        self
    }

    pub fn footer(&mut self, text: impl Into<String>) -> &mut Self {
        self.embed.footer = Some(text.into());
        self
    }

    fn build(self) -> EmbedTemplate {
        self.embed
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    buttons: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.buttons.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.buttons
    }
}

pub struct OfferView<'a> {
    pub status_glyph: &'a str,
    pub rules_channel: Option<ChannelId>,
    pub info_url: Option<&'a str>,
}

pub fn offer_message(view: &OfferView<'_>) -> MessageTemplate {
    let rules_line = match view.rules_channel {
        Some(channel) => format!("\n\nCheck out {} to see that we're legit!", channel.mention()),
        None => String::new(),
    };

    MessageBuilder::new()
        .embed(|embed| {
            embed
                .author("Ranked Enabled Account")
                .description(format!(
                    "**# PAYMENT METHODS**\n**# STATUS: {}**{rules_line}",
                    view.status_glyph
                ))
                .color(COLOR_OFFER)
                .footer("Thanks for buying!");
        })
        .actions(|actions| {
            actions
                .button(
                    ButtonElement::action(&ControlAction::Purchase, "Purchase")
                        .emoji("🛒")
                        .style(ButtonStyle::Success),
                )
                .button(ButtonElement::action(&ControlAction::CheckStock, "Check Stock").emoji("📦"));
            if let Some(url) = view.info_url {
                actions.button(ButtonElement::link(url, "Info").emoji("❓"));
            }
        })
        .build()
}

pub const QUANTITY_FIELD_ID: &str = "ticket.form.quantity";
pub const PAYMENT_FIELD_ID: &str = "ticket.form.payment";
/// Keeps each answer well inside the 1024-character embed field limit.
pub const FORM_FIELD_MAX_LENGTH: u16 = 200;

pub fn ticket_form() -> FormTemplate {
    FormTemplate {
        custom_id: ControlAction::SubmitOrder.custom_id(),
        title: "Ranked Enabled Account".to_owned(),
        fields: vec![
            FormField {
                custom_id: QUANTITY_FIELD_ID.to_owned(),
                label: "How many accounts?".to_owned(),
                required: true,
                max_length: FORM_FIELD_MAX_LENGTH,
            },
            FormField {
                custom_id: PAYMENT_FIELD_ID.to_owned(),
                label: "Payment method".to_owned(),
                required: true,
                max_length: FORM_FIELD_MAX_LENGTH,
            },
        ],
    }
}

pub fn ticket_welcome_message(
    channel: ChannelId,
    owner: UserId,
    quantity: &str,
    payment: &str,
    rules_channel: Option<ChannelId>,
) -> MessageTemplate {
    let description = match rules_channel {
        Some(rules) => format!("Please wait for a response. Read {} while waiting.", rules.mention()),
        None => "Please wait for a response.".to_owned(),
    };

    MessageBuilder::new()
        .content(owner.mention())
        .embed(|embed| {
            embed
                .description(description)
                .color(COLOR_DARK_GREY)
                .field("Quantity", format!("```{quantity}```"))
                .field("Payment", format!("```{payment}```"));
        })
        .actions(|actions| {
            actions.button(
                ButtonElement::action(&ControlAction::CloseTicket { channel, owner }, "Close")
                    .emoji("🔒"),
            );
        })
        .build()
}

pub fn ticket_closed_message(channel: ChannelId, owner: UserId, actor: UserId) -> MessageTemplate {
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .author("Ticket Tool")
                .description(format!("🔒 Ticket closed by {}", actor.mention()))
                .color(COLOR_DARK_GREY);
        })
        .actions(|actions| {
            actions
                .button(
                    ButtonElement::action(&ControlAction::Transcript { channel, owner }, "Transcript")
                        .emoji("📄"),
                )
                .button(
                    ButtonElement::action(&ControlAction::ReopenTicket { channel, owner }, "Reopen")
                        .emoji("🔓")
                        .style(ButtonStyle::Success),
                )
                .button(
                    ButtonElement::action(&ControlAction::DeleteTicket { channel, owner }, "Delete")
                        .emoji("🗑️")
                        .style(ButtonStyle::Danger),
                );
        })
        .build()
}

pub fn transcript_notice(channel: ChannelId, number: Option<TicketNumber>) -> EmbedTemplate {
    let mut builder = EmbedBuilder::default();
    builder
        .title("📄 Ticket Transcript")
        .description(format!("Transcript from {}", channel.mention()))
        .color(COLOR_DARK_GREY);
    if let Some(number) = number {
        builder.footer(format!("Ticket #{number}"));
    }
    builder.build()
}

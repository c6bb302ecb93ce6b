use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use storefront_core::config::{GuildConfig, TicketConfig};
use storefront_core::domain::ticket::ticket_channel_name;
use storefront_core::{
    parse_ticket_number, ApplicationError, ChannelId, DomainError, GuildId, Ticket,
    TicketAllocator, TicketEvent, TicketRegistry, TicketState, UserId,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::blocks::{
    ticket_closed_message, ticket_welcome_message, InteractionReply, Visibility,
    FORM_FIELD_MAX_LENGTH,
};
use crate::events::Acknowledger;
use crate::platform::{AccessGrant, ChannelRequest, ChatPlatform, PlatformError};
use crate::transcript::{ExportOutcome, TranscriptExporter};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket category {0} was not found")]
    MissingCategory(ChannelId),
    #[error("required field `{0}` was blank")]
    EmptyField(&'static str),
    #[error("field `{0}` exceeds {max} characters", max = FORM_FIELD_MAX_LENGTH)]
    FieldTooLong(&'static str),
    #[error("channel {0} is not a ticket channel")]
    NotATicket(ChannelId),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl TicketError {
    /// Private reply text for the invoking user.
    pub fn user_message(&self, correlation_id: &str) -> String {
        match self {
            Self::MissingCategory(_) => "❌ Ticket category not found.".to_owned(),
            Self::EmptyField(field) => format!("❌ Please fill in the {field} field."),
            Self::FieldTooLong(field) => {
                format!("❌ The {field} field is too long (max {FORM_FIELD_MAX_LENGTH} characters).")
            }
            Self::NotATicket(_) => "❌ This channel is no longer an open ticket.".to_owned(),
            other => other.to_application().into_interface(correlation_id).user_message().to_owned(),
        }
    }

    fn to_application(&self) -> ApplicationError {
        match self {
            Self::Domain(error) => ApplicationError::Domain(error.clone()),
            Self::Platform(PlatformError::Forbidden(message)) => {
                ApplicationError::PermissionDenied(message.clone())
            }
            other => ApplicationError::Integration(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketRequest {
    pub guild: GuildId,
    pub requester: UserId,
    pub requester_handle: String,
    pub quantity: String,
    pub payment: String,
}

/// The channel a ticket control was bound to, plus who clicked it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketAction {
    pub channel: ChannelId,
    pub owner: UserId,
    pub actor: UserId,
}

pub struct TicketController {
    platform: Arc<dyn ChatPlatform>,
    guild: GuildConfig,
    tickets: TicketConfig,
    allocator: TicketAllocator,
    registry: TicketRegistry,
    exporter: TranscriptExporter,
    creation_gate: Mutex<()>,
}

impl TicketController {
    pub fn new(platform: Arc<dyn ChatPlatform>, guild: GuildConfig, tickets: TicketConfig) -> Self {
        let exporter = TranscriptExporter::new(platform.clone(), guild.transcript_channel());
        Self {
            allocator: TicketAllocator::new(tickets.allocation),
            registry: TicketRegistry::default(),
            exporter,
            platform,
            guild,
            tickets,
            creation_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    pub async fn create(
        &self,
        request: TicketRequest,
        acknowledger: &dyn Acknowledger,
        correlation_id: &str,
    ) -> Result<InteractionReply, TicketError> {
        let quantity = checked_field("quantity", &request.quantity)?;
        let payment = checked_field("payment", &request.payment)?;
        self.defer(acknowledger, Visibility::Private, correlation_id).await;

        let category = self.guild.ticket_category();
        let (ticket, channel_name) = {
            // Allocation reads live channel names, so it must not interleave with another creation.
            let _gate = self.creation_gate.lock().await;

            let siblings = self
                .platform
                .channels_in_category(request.guild, category)
                .await?
                .ok_or(TicketError::MissingCategory(category))?;
            let names = siblings.into_iter().map(|channel| channel.name).collect::<Vec<_>>();
            let number = self.allocator.allocate(Some(&names));

            let handle = self.tickets.append_requester_handle.then_some(request.requester_handle.as_str());
            let channel_name = ticket_channel_name(number, handle);
            let grants = self.initial_grants(request.guild, request.requester).await?;
            let channel = self
                .platform
                .create_private_channel(
                    request.guild,
                    ChannelRequest { name: channel_name.clone(), category, grants },
                )
                .await?;

            let mut ticket = Ticket {
                number,
                channel_id: channel.id,
                owner: request.requester,
                state: TicketState::Requested,
                created_at: Utc::now(),
            };
            ticket.apply(TicketEvent::ChannelProvisioned)?;
            self.registry.insert(ticket.clone()).await;
            (ticket, channel_name)
        };

        let welcome = ticket_welcome_message(
            ticket.channel_id,
            ticket.owner,
            quantity,
            payment,
            self.guild.rules_channel(),
        );
        self.platform.send_message(ticket.channel_id, &welcome).await?;

        info!(
            event_name = "discord.ticket.created",
            correlation_id = %correlation_id,
            ticket_number = %ticket.number,
            channel_id = %ticket.channel_id,
            channel_name = %channel_name,
            requester = %ticket.owner,
            "ticket channel created"
        );
        Ok(InteractionReply::private_text(format!(
            "✅ Ticket created: {}",
            ticket.channel_id.mention()
        )))
    }

    pub async fn close(
        &self,
        action: TicketAction,
        acknowledger: &dyn Acknowledger,
        correlation_id: &str,
    ) -> Result<InteractionReply, TicketError> {
        let ticket = self.track(action, TicketState::Open).await?;
        ensure_transition(&ticket, TicketEvent::CloseRequested)?;
        self.defer(acknowledger, Visibility::Public, correlation_id).await;

        self.export(&ticket, correlation_id).await?;
        if self.tickets.close_revokes_send {
            self.platform.set_access(ticket.channel_id, AccessGrant::read_only(ticket.owner)).await?;
        }
        let ticket = self.registry.apply(ticket.channel_id, TicketEvent::CloseRequested).await?;

        info!(
            event_name = "discord.ticket.closed",
            correlation_id = %correlation_id,
            ticket_number = %ticket.number,
            channel_id = %ticket.channel_id,
            actor = %action.actor,
            "ticket closed"
        );
        Ok(InteractionReply::public(ticket_closed_message(
            ticket.channel_id,
            ticket.owner,
            action.actor,
        )))
    }

    pub async fn reopen(
        &self,
        action: TicketAction,
        acknowledger: &dyn Acknowledger,
        correlation_id: &str,
    ) -> Result<InteractionReply, TicketError> {
        let ticket = self.track(action, TicketState::Closed).await?;
        ensure_transition(&ticket, TicketEvent::ReopenRequested)?;
        self.defer(acknowledger, Visibility::Private, correlation_id).await;

        self.platform.set_access(ticket.channel_id, AccessGrant::participant(ticket.owner)).await?;
        let ticket = self.registry.apply(ticket.channel_id, TicketEvent::ReopenRequested).await?;

        info!(
            event_name = "discord.ticket.reopened",
            correlation_id = %correlation_id,
            ticket_number = %ticket.number,
            channel_id = %ticket.channel_id,
            actor = %action.actor,
            "ticket reopened"
        );
        Ok(InteractionReply::private_text("🔓 Ticket reopened."))
    }

    /// Acknowledges first, archives, then removes the channel. The archive step never blocks deletion.
    pub async fn delete(
        &self,
        action: TicketAction,
        acknowledger: &dyn Acknowledger,
        correlation_id: &str,
    ) -> Result<(), TicketError> {
        let ticket = self.track(action, TicketState::Closed).await?;
        ensure_transition(&ticket, TicketEvent::DeleteRequested)?;

        if let Err(error) =
            acknowledger.acknowledge(InteractionReply::private_text("🗑️ Deleting ticket...")).await
        {
            warn!(
                event_name = "discord.ticket.delete_ack_failed",
                correlation_id = %correlation_id,
                channel_id = %ticket.channel_id,
                error = %error,
                "could not acknowledge delete request"
            );
        }

        if let Err(error) = self.export(&ticket, correlation_id).await {
            warn!(
                event_name = "discord.ticket.delete_transcript_failed",
                correlation_id = %correlation_id,
                channel_id = %ticket.channel_id,
                error = %error,
                "transcript export failed; deleting anyway"
            );
        }

        self.platform.delete_channel(ticket.channel_id).await?;
        self.registry.apply(ticket.channel_id, TicketEvent::DeleteRequested).await?;

        info!(
            event_name = "discord.ticket.deleted",
            correlation_id = %correlation_id,
            ticket_number = %ticket.number,
            channel_id = %ticket.channel_id,
            actor = %action.actor,
            "ticket deleted"
        );
        Ok(())
    }

    pub async fn transcript(
        &self,
        action: TicketAction,
        acknowledger: &dyn Acknowledger,
        correlation_id: &str,
    ) -> Result<InteractionReply, TicketError> {
        let ticket = self.track(action, TicketState::Closed).await?;
        let ticket = self.registry.apply(ticket.channel_id, TicketEvent::TranscriptRequested).await?;
        self.defer(acknowledger, Visibility::Private, correlation_id).await;
        self.export(&ticket, correlation_id).await?;
        Ok(InteractionReply::private_text("📄 Transcript sent to logs."))
    }

    /// A failed defer is logged; the reply is still attempted afterwards.
    async fn defer(
        &self,
        acknowledger: &dyn Acknowledger,
        visibility: Visibility,
        correlation_id: &str,
    ) {
        if let Err(error) = acknowledger.defer(visibility).await {
            warn!(
                event_name = "discord.ticket.defer_failed",
                correlation_id = %correlation_id,
                visibility = ?visibility,
                error = %error,
                "could not defer interaction"
            );
        }
    }

    async fn initial_grants(
        &self,
        guild: GuildId,
        requester: UserId,
    ) -> Result<Vec<AccessGrant>, PlatformError> {
        let bot = self.platform.bot_user().await?;
        let mut members = BTreeSet::from([requester, bot]);
        let mut grants = vec![
            AccessGrant::hidden_from_everyone(),
            AccessGrant::participant(requester),
            AccessGrant::participant(bot),
        ];

        if self.tickets.grant_admin_members {
            for admin in self.platform.administrator_members(guild).await? {
                if members.insert(admin) {
                    grants.push(AccessGrant::participant(admin));
                }
            }
        }
        Ok(grants)
    }

    /// Returns the tracked ticket, adopting it from the live channel when this process never saw it.
    async fn track(&self, action: TicketAction, assumed: TicketState) -> Result<Ticket, TicketError> {
        if let Some(ticket) = self.registry.get(action.channel).await {
            return Ok(ticket);
        }

        let channel = self
            .platform
            .resolve_channel(action.channel)
            .await?
            .ok_or(TicketError::NotATicket(action.channel))?;
        let number =
            parse_ticket_number(&channel.name).ok_or(TicketError::NotATicket(action.channel))?;

        let ticket = self
            .registry
            .adopt(Ticket {
                number,
                channel_id: action.channel,
                owner: action.owner,
                state: assumed,
                created_at: Utc::now(),
            })
            .await;
        info!(
            event_name = "discord.ticket.adopted",
            channel_id = %ticket.channel_id,
            ticket_number = %ticket.number,
            state = ?ticket.state,
            "adopted ticket not seen by this process"
        );
        Ok(ticket)
    }

    async fn export(&self, ticket: &Ticket, correlation_id: &str) -> Result<ExportOutcome, TicketError> {
        let channel_name = match self.platform.resolve_channel(ticket.channel_id).await? {
            Some(channel) => channel.name,
            None => ticket_channel_name(ticket.number, None),
        };
        Ok(self
            .exporter
            .export(ticket.channel_id, &channel_name, Some(ticket.number), correlation_id)
            .await?)
    }
}

fn checked_field<'a>(name: &'static str, value: &'a str) -> Result<&'a str, TicketError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TicketError::EmptyField(name));
    }
    if value.chars().count() > usize::from(FORM_FIELD_MAX_LENGTH) {
        return Err(TicketError::FieldTooLong(name));
    }
    Ok(value)
}

fn ensure_transition(ticket: &Ticket, event: TicketEvent) -> Result<(), DomainError> {
    if ticket.can_apply(event) {
        Ok(())
    } else {
        Err(DomainError::InvalidTicketTransition { from: ticket.state, event })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use storefront_core::config::{AllocationPolicy, AppConfig};
    use storefront_core::{ChannelId, GuildId, TicketState, UserId};
    use tokio::sync::Mutex;

    use super::{TicketAction, TicketController, TicketError, TicketRequest};
    use crate::blocks::{InteractionReply, Visibility, FORM_FIELD_MAX_LENGTH};
    use crate::events::{Acknowledger, NoopAcknowledger};
    use crate::platform::memory::InMemoryPlatform;
    use crate::platform::{Access, AccessGrant, AccessTarget, PlatformError};

    const GUILD: GuildId = GuildId(1);
    const CATEGORY: ChannelId = ChannelId(50);
    const ARCHIVE: ChannelId = ChannelId(60);
    const BOT: UserId = UserId(2);
    const CUSTOMER: UserId = UserId(300);
    const STAFF: UserId = UserId(400);

    #[derive(Default)]
    struct RecordingAcknowledger {
        replies: Mutex<Vec<InteractionReply>>,
    }

    #[async_trait]
    impl Acknowledger for RecordingAcknowledger {
        async fn acknowledge(&self, reply: InteractionReply) -> Result<(), PlatformError> {
            self.replies.lock().await.push(reply);
            Ok(())
        }
    }

    /// Captures what the platform had already done at the moment each defer arrived.
    struct DeferralAcknowledger {
        platform: Arc<InMemoryPlatform>,
        deferrals: Mutex<Vec<(Visibility, Vec<String>)>>,
    }

    impl DeferralAcknowledger {
        fn new(platform: Arc<InMemoryPlatform>) -> Self {
            Self { platform, deferrals: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Acknowledger for DeferralAcknowledger {
        async fn acknowledge(&self, _reply: InteractionReply) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn defer(&self, visibility: Visibility) -> Result<(), PlatformError> {
            let operations = self.platform.operations().await;
            self.deferrals.lock().await.push((visibility, operations));
            Ok(())
        }
    }

    async fn controller(
        configure: impl FnOnce(&mut AppConfig),
    ) -> (Arc<InMemoryPlatform>, TicketController) {
        let platform = Arc::new(InMemoryPlatform::new(BOT));
        platform.add_category(CATEGORY, "Tickets").await;
        platform.add_channel(ARCHIVE, "transcripts", None).await;

        let mut config = AppConfig::default();
        config.guild.ticket_category_id = CATEGORY.0;
        config.guild.transcript_channel_id = ARCHIVE.0;
        config.guild.rules_channel_id = 70;
        configure(&mut config);

        let controller = TicketController::new(platform.clone(), config.guild, config.tickets);
        (platform, controller)
    }

    fn request(requester: UserId) -> TicketRequest {
        TicketRequest {
            guild: GUILD,
            requester,
            requester_handle: "Alice.Smith".to_owned(),
            quantity: "2".to_owned(),
            payment: "paypal".to_owned(),
        }
    }

    async fn created_channel(platform: &InMemoryPlatform, name: &str) -> ChannelId {
        platform
            .channel_names_in(CATEGORY)
            .await
            .into_iter()
            .find(|(_, channel_name)| channel_name == name)
            .map(|(id, _)| id)
            .expect("ticket channel exists")
    }

    fn action(channel: ChannelId) -> TicketAction {
        TicketAction { channel, owner: CUSTOMER, actor: STAFF }
    }

    #[tokio::test]
    async fn create_provisions_private_channel_and_replies_privately() {
        let (platform, controller) = controller(|_| {}).await;
        platform.add_administrator(UserId(900)).await;
        platform.add_channel(ChannelId(51), "ticket-003", Some(CATEGORY)).await;
        platform.add_channel(ChannelId(52), "ticket-010-bob", Some(CATEGORY)).await;

        let reply = controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");

        let channel = created_channel(&platform, "ticket-011").await;
        assert_eq!(reply.visibility, Visibility::Private);
        assert_eq!(
            reply.message.content.as_deref(),
            Some(format!("✅ Ticket created: <#{channel}>").as_str())
        );

        let everyone = platform.grant_for(channel, AccessTarget::Everyone).await.expect("everyone");
        assert_eq!(everyone.view, Access::Deny);
        for member in [CUSTOMER, BOT, UserId(900)] {
            assert_eq!(
                platform.grant_for(channel, AccessTarget::Member(member)).await,
                Some(AccessGrant::participant(member))
            );
        }

        let welcome = platform.messages(channel).await;
        assert_eq!(welcome.len(), 1);
        assert_eq!(welcome[0].template.embeds[0].fields[0].value, "```2```");
        assert_eq!(
            controller.registry().get(channel).await.map(|ticket| ticket.state),
            Some(TicketState::Open)
        );
    }

    #[tokio::test]
    async fn create_appends_sanitized_handle_when_enabled() {
        let (platform, controller) =
            controller(|config| config.tickets.append_requester_handle = true).await;

        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");

        created_channel(&platform, "ticket-000-alice-smith").await;
    }

    #[tokio::test]
    async fn create_without_category_creates_nothing() {
        let (platform, controller) =
            controller(|config| config.guild.ticket_category_id = 999).await;

        let error = controller
            .create(request(CUSTOMER), &NoopAcknowledger, "req-1")
            .await
            .expect_err("missing");

        assert!(matches!(error, TicketError::MissingCategory(ChannelId(999))));
        assert_eq!(error.user_message("req-1"), "❌ Ticket category not found.");
        assert!(platform.operations().await.iter().all(|op| !op.starts_with("create_channel")));
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let (platform, controller) = controller(|_| {}).await;
        let mut blank = request(CUSTOMER);
        blank.payment = "   ".to_owned();

        let error = controller.create(blank, &NoopAcknowledger, "req-1").await.expect_err("blank payment");

        assert!(matches!(error, TicketError::EmptyField("payment")));
        assert!(platform.operations().await.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_overlong_fields_before_any_platform_call() {
        let (platform, controller) = controller(|_| {}).await;
        let acknowledger = DeferralAcknowledger::new(platform.clone());
        let mut oversized = request(CUSTOMER);
        oversized.quantity = "9".repeat(usize::from(FORM_FIELD_MAX_LENGTH) + 1);

        let error =
            controller.create(oversized, &acknowledger, "req-1").await.expect_err("too long");

        assert!(matches!(error, TicketError::FieldTooLong("quantity")));
        assert!(error.user_message("req-1").contains("too long"));
        assert!(platform.operations().await.is_empty());
        assert!(acknowledger.deferrals.lock().await.is_empty());
    }

    #[tokio::test]
    async fn create_defers_privately_before_provisioning_channel() {
        let (platform, controller) = controller(|_| {}).await;
        platform.add_administrator(UserId(900)).await;
        let acknowledger = DeferralAcknowledger::new(platform.clone());

        controller.create(request(CUSTOMER), &acknowledger, "req-1").await.expect("create");

        let deferrals = acknowledger.deferrals.lock().await;
        assert_eq!(deferrals.len(), 1);
        let (visibility, before) = &deferrals[0];
        assert_eq!(*visibility, Visibility::Private);
        assert!(before.iter().all(|op| !op.starts_with("create_channel")));
        assert!(platform.operations().await.iter().any(|op| op.starts_with("create_channel")));
    }

    #[tokio::test]
    async fn concurrent_creations_receive_distinct_numbers() {
        let (platform, controller) = controller(|_| {}).await;

        let (first, second) = tokio::join!(
            controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1"),
            controller.create(request(UserId(301)), &NoopAcknowledger, "req-2"),
        );
        first.expect("first create");
        second.expect("second create");

        let mut names = platform
            .channel_names_in(CATEGORY)
            .await
            .into_iter()
            .map(|(_, name)| name)
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["ticket-000".to_owned(), "ticket-001".to_owned()]);
    }

    #[tokio::test]
    async fn counter_policy_ignores_existing_channels() {
        let (platform, controller) =
            controller(|config| config.tickets.allocation = AllocationPolicy::Counter).await;
        platform.add_channel(ChannelId(51), "ticket-007", Some(CATEGORY)).await;

        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");

        created_channel(&platform, "ticket-000").await;
    }

    #[tokio::test]
    async fn close_archives_before_posting_closure_and_narrows_access() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;

        let reply = controller.close(action(channel), &NoopAcknowledger, "req-2").await.expect("close");

        assert_eq!(reply.visibility, Visibility::Public);
        assert!(reply.message.fallback_text().contains(&format!("<@{STAFF}>")));
        assert_eq!(reply.message.buttons.len(), 3);
        assert_eq!(platform.messages(ARCHIVE).await.len(), 1);
        assert_eq!(
            platform.grant_for(channel, AccessTarget::Member(CUSTOMER)).await,
            Some(AccessGrant::read_only(CUSTOMER))
        );
        assert!(platform.channel_exists(channel).await);
    }

    #[tokio::test]
    async fn close_defers_publicly_before_reading_history() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;
        let acknowledger = DeferralAcknowledger::new(platform.clone());

        controller.close(action(channel), &acknowledger, "req-2").await.expect("close");

        let history = format!("history:{channel}");
        let deferrals = acknowledger.deferrals.lock().await;
        assert_eq!(deferrals.len(), 1);
        let (visibility, before) = &deferrals[0];
        assert_eq!(*visibility, Visibility::Public);
        assert!(!before.contains(&history));
        assert!(platform.operations().await.contains(&history));
    }

    #[tokio::test]
    async fn rejected_close_is_not_deferred() {
        let (platform, controller) = controller(|_| {}).await;
        platform.add_channel(ChannelId(78), "general", None).await;
        let acknowledger = DeferralAcknowledger::new(platform.clone());

        controller
            .close(action(ChannelId(78)), &acknowledger, "req-1")
            .await
            .expect_err("not a ticket");

        assert!(acknowledger.deferrals.lock().await.is_empty());
    }

    #[tokio::test]
    async fn close_leaves_access_alone_when_revocation_disabled() {
        let (platform, controller) =
            controller(|config| config.tickets.close_revokes_send = false).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;

        controller.close(action(channel), &NoopAcknowledger, "req-2").await.expect("close");

        assert_eq!(
            platform.grant_for(channel, AccessTarget::Member(CUSTOMER)).await,
            Some(AccessGrant::participant(CUSTOMER))
        );
    }

    #[tokio::test]
    async fn close_then_reopen_restores_view_and_send() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;

        controller.close(action(channel), &NoopAcknowledger, "req-2").await.expect("close");
        let reply = controller.reopen(action(channel), &NoopAcknowledger, "req-3").await.expect("reopen");

        assert_eq!(reply.visibility, Visibility::Private);
        assert_eq!(
            platform.grant_for(channel, AccessTarget::Member(CUSTOMER)).await,
            Some(AccessGrant::participant(CUSTOMER))
        );
        assert_eq!(
            controller.registry().get(channel).await.map(|ticket| ticket.state),
            Some(TicketState::Open)
        );
    }

    #[tokio::test]
    async fn closing_twice_is_rejected() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;
        controller.close(action(channel), &NoopAcknowledger, "req-2").await.expect("close");

        let error = controller.close(action(channel), &NoopAcknowledger, "req-3").await.expect_err("closed");

        assert!(matches!(error, TicketError::Domain(_)));
        assert!(error.user_message("req-3").starts_with("❌"));
    }

    #[tokio::test]
    async fn delete_archives_before_removing_channel() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;
        let acknowledger = RecordingAcknowledger::default();

        controller.delete(action(channel), &acknowledger, "req-2").await.expect("delete");

        let operations = platform.operations().await;
        let history = operations.iter().position(|op| op == &format!("history:{channel}"));
        let removed = operations.iter().position(|op| op == &format!("delete_channel:{channel}"));
        assert!(history.is_some() && history < removed);
        assert!(!platform.channel_exists(channel).await);
        assert!(controller.registry().get(channel).await.is_none());

        let acknowledged = acknowledger.replies.lock().await;
        assert_eq!(acknowledged[0].message.content.as_deref(), Some("🗑️ Deleting ticket..."));
    }

    #[tokio::test]
    async fn delete_proceeds_without_archive_channel() {
        let (platform, controller) =
            controller(|config| config.guild.transcript_channel_id = 12345).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;

        controller
            .delete(action(channel), &RecordingAcknowledger::default(), "req-2")
            .await
            .expect("delete");

        assert!(!platform.channel_exists(channel).await);
    }

    #[tokio::test]
    async fn transcript_only_is_repeatable_and_keeps_state() {
        let (platform, controller) = controller(|_| {}).await;
        controller.create(request(CUSTOMER), &NoopAcknowledger, "req-1").await.expect("create");
        let channel = created_channel(&platform, "ticket-000").await;

        for _ in 0..2 {
            let reply = controller
                .transcript(action(channel), &NoopAcknowledger, "req-2")
                .await
                .expect("transcript");
            assert_eq!(reply.message.content.as_deref(), Some("📄 Transcript sent to logs."));
        }

        assert_eq!(platform.messages(ARCHIVE).await.len(), 2);
        assert_eq!(
            controller.registry().get(channel).await.map(|ticket| ticket.state),
            Some(TicketState::Open)
        );
    }

    #[tokio::test]
    async fn controls_survive_restart_by_adopting_live_channel() {
        let (platform, controller) = controller(|_| {}).await;
        platform.add_channel(ChannelId(77), "ticket-004", Some(CATEGORY)).await;

        controller.reopen(action(ChannelId(77)), &NoopAcknowledger, "req-1").await.expect("reopen adopted");

        let ticket = controller.registry().get(ChannelId(77)).await.expect("adopted");
        assert_eq!(ticket.number.to_string(), "004");
        assert_eq!(ticket.owner, CUSTOMER);
        assert_eq!(ticket.state, TicketState::Open);
    }

    #[tokio::test]
    async fn controls_on_non_ticket_channels_are_rejected() {
        let (platform, controller) = controller(|_| {}).await;
        platform.add_channel(ChannelId(78), "general", None).await;

        let error = controller
            .close(action(ChannelId(78)), &NoopAcknowledger, "req-1")
            .await
            .expect_err("not a ticket");

        assert!(matches!(error, TicketError::NotATicket(ChannelId(78))));
    }
}

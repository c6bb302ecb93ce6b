use std::sync::Arc;

use secrecy::ExposeSecret;
use storefront_core::config::AppConfig;
use storefront_discord::commands::{command_definitions, CommandPolicy};
use storefront_discord::{
    storefront_dispatcher, ChatPlatform, EventDispatcher, GatewayHandler, OfferPublisher,
    SerenityPlatform, TicketController,
};
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: Arc<EventDispatcher>,
    pub offer: Arc<OfferPublisher>,
    pub tickets: Arc<TicketController>,
}

impl Application {
    pub fn gateway_handler(&self) -> GatewayHandler {
        let policy =
            CommandPolicy { status_requires_admin: self.config.storefront.status_requires_admin };
        GatewayHandler::new(
            self.dispatcher.clone(),
            command_definitions(policy),
            self.config.storefront.presence.clone(),
        )
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let platform: Arc<dyn ChatPlatform> =
        Arc::new(SerenityPlatform::new(config.discord.token.expose_secret()));
    assemble(config, platform)
}

/// Wires services against any platform; the gateway binary passes the serenity one.
pub fn assemble(config: AppConfig, platform: Arc<dyn ChatPlatform>) -> Application {
    let offer = Arc::new(OfferPublisher::new(
        platform.clone(),
        config.guild.clone(),
        config.storefront.clone(),
    ));
    let tickets = Arc::new(TicketController::new(
        platform.clone(),
        config.guild.clone(),
        config.tickets.clone(),
    ));
    let dispatcher =
        Arc::new(storefront_dispatcher(platform, offer.clone(), tickets.clone(), &config));

    info!(
        event_name = "system.bootstrap.services_ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        allocation = ?config.tickets.allocation,
        stock_check = ?config.storefront.stock_check,
        "storefront services assembled"
    );

    Application { config, dispatcher, offer, tickets }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_core::config::AppConfig;
    use storefront_discord::platform::memory::InMemoryPlatform;

    use crate::bootstrap::assemble;

    #[tokio::test]
    async fn assemble_registers_every_event_handler() {
        let app = assemble(AppConfig::default(), Arc::new(InMemoryPlatform::default()));

        assert_eq!(app.dispatcher.handler_count(), 4);
        assert_eq!(app.offer.session().await.status_glyph, "🟢");
        assert!(app.tickets.registry().is_empty().await);
    }
}

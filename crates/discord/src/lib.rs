//! Discord Integration - storefront ticket bot interface
//!
//! This crate provides the Discord side of the storefront:
//! - **Gateway** (`gateway`) - serenity client, slash command sync, interaction responses
//! - **Slash Commands** (`commands`) - `/embed`, `/changestock`, `/status`, `/update`
//! - **Events** (`events`) - Buttons, form submissions, channel messages
//! - **Blocks** (`blocks`) - Embed, button and form templates
//! - **Tickets** (`tickets`) - Private ticket channel lifecycle
//! - **Offer** (`offer`) - The pinned purchase embed and its stock status
//!
//! # Architecture
//!
//! ```text
//! Discord Gateway → EventDispatcher → Handlers → TicketController / OfferPublisher
//!                        ↓                              ↓
//!               InteractionReply ←──────────── ChatPlatform (REST)
//! ```

pub mod blocks;
pub mod commands;
pub mod controls;
pub mod events;
pub mod gateway;
pub mod offer;
pub mod platform;
pub mod tickets;
pub mod transcript;

pub use events::{storefront_dispatcher, EventDispatcher};
pub use gateway::{GatewayHandler, SerenityPlatform};
pub use offer::OfferPublisher;
pub use platform::ChatPlatform;
pub use tickets::TicketController;

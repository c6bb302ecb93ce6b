use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::ids::ChannelId;
use crate::domain::ticket::{Ticket, TicketEvent, TicketState};
use crate::errors::DomainError;

/// In-memory ticket lifecycle state keyed by channel. Not persisted.
#[derive(Default)]
pub struct TicketRegistry {
    tickets: RwLock<HashMap<ChannelId, Ticket>>,
}

impl TicketRegistry {
    pub async fn get(&self, channel_id: ChannelId) -> Option<Ticket> {
        self.tickets.read().await.get(&channel_id).cloned()
    }

    pub async fn insert(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.channel_id, ticket);
    }

    /// Keeps an existing record; only inserts `ticket` when the channel is unknown.
    pub async fn adopt(&self, ticket: Ticket) -> Ticket {
        let mut tickets = self.tickets.write().await;
        tickets.entry(ticket.channel_id).or_insert(ticket).clone()
    }

    pub async fn apply(
        &self,
        channel_id: ChannelId,
        event: TicketEvent,
    ) -> Result<Ticket, DomainError> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets.get_mut(&channel_id).ok_or_else(|| {
            DomainError::InvariantViolation(format!("no ticket tracked for channel {channel_id}"))
        })?;
        ticket.apply(event)?;
        let snapshot = ticket.clone();
        if snapshot.state == TicketState::Deleted {
            tickets.remove(&channel_id);
        }
        Ok(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, UserId};
use crate::errors::DomainError;

pub const TICKET_CHANNEL_PREFIX: &str = "ticket-";

/// Sequential ticket number. Displays zero-padded to a minimum of three digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketNumber(pub u64);

impl TicketNumber {
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketState {
    Requested,
    Open,
    Closed,
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketEvent {
    ChannelProvisioned,
    CloseRequested,
    ReopenRequested,
    DeleteRequested,
    TranscriptRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: TicketNumber,
    pub channel_id: ChannelId,
    pub owner: UserId,
    pub state: TicketState,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn can_apply(&self, event: TicketEvent) -> bool {
        next_state(self.state, event).is_some()
    }

    pub fn apply(&mut self, event: TicketEvent) -> Result<TicketState, DomainError> {
        let next = next_state(self.state, event)
            .ok_or(DomainError::InvalidTicketTransition { from: self.state, event })?;
        self.state = next;
        Ok(next)
    }
}

fn next_state(current: TicketState, event: TicketEvent) -> Option<TicketState> {
    use TicketEvent::{
        ChannelProvisioned, CloseRequested, DeleteRequested, ReopenRequested, TranscriptRequested,
    };
    use TicketState::{Closed, Deleted, Open, Requested};

    match (current, event) {
        (Requested, ChannelProvisioned) => Some(Open),
        (Open, CloseRequested) => Some(Closed),
        (Closed, ReopenRequested) => Some(Open),
        (Open | Closed, DeleteRequested) => Some(Deleted),
        (Open | Closed, TranscriptRequested) => Some(current),
        _ => None,
    }
}

/// Builds `ticket-<padded>` with an optional sanitized requester handle suffix.
pub fn ticket_channel_name(number: TicketNumber, requester_handle: Option<&str>) -> String {
    let base = format!("{TICKET_CHANNEL_PREFIX}{number}");
    let Some(handle) = requester_handle else {
        return base;
    };

    let suffix = sanitize_handle(handle);
    if suffix.is_empty() {
        base
    } else {
        format!("{base}-{suffix}")
    }
}

fn sanitize_handle(handle: &str) -> String {
    let mut cleaned = String::with_capacity(handle.len());
    for ch in handle.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() || ch == '_' {
            cleaned.push(ch);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    cleaned.trim_matches('-').to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{ticket_channel_name, Ticket, TicketEvent, TicketNumber, TicketState};
    use crate::domain::ids::{ChannelId, UserId};
    use crate::errors::DomainError;

    fn ticket(state: TicketState) -> Ticket {
        Ticket {
            number: TicketNumber(4),
            channel_id: ChannelId(10),
            owner: UserId(20),
            state,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn display_pads_to_minimum_three_digits() {
        assert_eq!(TicketNumber(7).to_string(), "007");
        assert_eq!(TicketNumber(123).to_string(), "123");
        assert_eq!(TicketNumber(1000).to_string(), "1000");
    }

    #[test]
    fn close_then_reopen_returns_to_open() {
        let mut ticket = ticket(TicketState::Open);
        ticket.apply(TicketEvent::CloseRequested).expect("open -> closed");
        ticket.apply(TicketEvent::ReopenRequested).expect("closed -> open");
        assert_eq!(ticket.state, TicketState::Open);
    }

    #[test]
    fn closing_twice_is_rejected() {
        let mut ticket = ticket(TicketState::Closed);
        let error = ticket.apply(TicketEvent::CloseRequested).expect_err("closed -> closed");
        assert!(matches!(
            error,
            DomainError::InvalidTicketTransition { from: TicketState::Closed, .. }
        ));
    }

    #[test]
    fn deleted_is_terminal() {
        let mut ticket = ticket(TicketState::Closed);
        ticket.apply(TicketEvent::DeleteRequested).expect("closed -> deleted");
        assert!(!ticket.can_apply(TicketEvent::ReopenRequested));
        assert!(!ticket.can_apply(TicketEvent::TranscriptRequested));
    }

    #[test]
    fn transcript_keeps_state() {
        let mut ticket = ticket(TicketState::Closed);
        let state = ticket.apply(TicketEvent::TranscriptRequested).expect("transcript");
        assert_eq!(state, TicketState::Closed);
    }

    #[test]
    fn channel_name_optionally_carries_sanitized_handle() {
        assert_eq!(ticket_channel_name(TicketNumber(3), None), "ticket-003");
        assert_eq!(ticket_channel_name(TicketNumber(3), Some("Alice.B")), "ticket-003-alice-b");
        assert_eq!(ticket_channel_name(TicketNumber(3), Some("...")), "ticket-003");
    }
}

//! Interactive control identifiers.
//!
//! Ticket-scoped controls embed the channel and owner in their custom id, so a
//! click after a restart still carries enough context to act without the
//! in-memory registry.

use storefront_core::{ChannelId, UserId};

const PURCHASE: &str = "offer.purchase";
const CHECK_STOCK: &str = "offer.check_stock";
const SUBMIT_ORDER: &str = "ticket.form.v1";
const CLOSE: &str = "ticket.close";
const TRANSCRIPT: &str = "ticket.transcript";
const REOPEN: &str = "ticket.reopen";
const DELETE: &str = "ticket.delete";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Purchase,
    CheckStock,
    SubmitOrder,
    CloseTicket { channel: ChannelId, owner: UserId },
    Transcript { channel: ChannelId, owner: UserId },
    ReopenTicket { channel: ChannelId, owner: UserId },
    DeleteTicket { channel: ChannelId, owner: UserId },
}

impl ControlAction {
    pub fn custom_id(&self) -> String {
        match self {
            Self::Purchase => PURCHASE.to_owned(),
            Self::CheckStock => CHECK_STOCK.to_owned(),
            Self::SubmitOrder => SUBMIT_ORDER.to_owned(),
            Self::CloseTicket { channel, owner } => format!("{CLOSE}:{channel}:{owner}"),
            Self::Transcript { channel, owner } => format!("{TRANSCRIPT}:{channel}:{owner}"),
            Self::ReopenTicket { channel, owner } => format!("{REOPEN}:{channel}:{owner}"),
            Self::DeleteTicket { channel, owner } => format!("{DELETE}:{channel}:{owner}"),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        let kind = parts.next()?;
        let channel = parts.next().map(|raw| raw.parse::<u64>().map(ChannelId));
        let owner = parts.next().map(|raw| raw.parse::<u64>().map(UserId));
        if parts.next().is_some() {
            return None;
        }

        let action = match (kind, channel, owner) {
            (PURCHASE, None, None) => Self::Purchase,
            (CHECK_STOCK, None, None) => Self::CheckStock,
            (SUBMIT_ORDER, None, None) => Self::SubmitOrder,
            (CLOSE, Some(Ok(channel)), Some(Ok(owner))) => Self::CloseTicket { channel, owner },
            (TRANSCRIPT, Some(Ok(channel)), Some(Ok(owner))) => Self::Transcript { channel, owner },
            (REOPEN, Some(Ok(channel)), Some(Ok(owner))) => Self::ReopenTicket { channel, owner },
            (DELETE, Some(Ok(channel)), Some(Ok(owner))) => Self::DeleteTicket { channel, owner },
            _ => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::{ChannelId, UserId};

    use super::ControlAction;

    #[test]
    fn ticket_controls_carry_channel_and_owner() {
        let close = ControlAction::CloseTicket { channel: ChannelId(77), owner: UserId(5) };
        assert_eq!(close.custom_id(), "ticket.close:77:5");
        assert_eq!(ControlAction::parse("ticket.close:77:5"), Some(close));
        assert_eq!(
            ControlAction::parse("ticket.delete:77:5"),
            Some(ControlAction::DeleteTicket { channel: ChannelId(77), owner: UserId(5) })
        );
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(ControlAction::parse("ticket.close:77"), None);
        assert_eq!(ControlAction::parse("ticket.delete:abc:1"), None);
        assert_eq!(ControlAction::parse("offer.purchase:1"), None);
        assert_eq!(ControlAction::parse("ticket.transcript:1:2:3"), None);
        assert_eq!(ControlAction::parse("something.else"), None);
    }
}

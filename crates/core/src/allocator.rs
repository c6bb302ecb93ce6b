//! Ticket number allocation.
//!
//! The canonical policy re-derives the next number from the live channel
//! names under the ticket category, so it survives restarts and out-of-band
//! deletions. The counter policy only remembers what this process handed out.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::AllocationPolicy;
use crate::domain::ticket::{TicketNumber, TICKET_CHANNEL_PREFIX};

/// Parses `ticket-<digits>` or `ticket-<digits>-<suffix>`.
pub fn parse_ticket_number(channel_name: &str) -> Option<TicketNumber> {
    let rest = channel_name.strip_prefix(TICKET_CHANNEL_PREFIX)?;
    let digits = rest.split('-').next()?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().map(TicketNumber)
}

/// `max(parsed) + 1`, or `0` when nothing under the category looks like a ticket.
pub fn next_from_names<'a, I>(names: I) -> TicketNumber
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(parse_ticket_number)
        .max()
        .map(TicketNumber::next)
        .unwrap_or_default()
}

#[derive(Debug)]
pub struct TicketAllocator {
    policy: AllocationPolicy,
    counter: AtomicU64,
}

impl Default for TicketAllocator {
    fn default() -> Self {
        Self::new(AllocationPolicy::Scan)
    }
}

impl TicketAllocator {
    pub fn new(policy: AllocationPolicy) -> Self {
        Self { policy, counter: AtomicU64::new(0) }
    }

    /// `category_names` is `None` when the ticket category does not exist.
    pub fn allocate(&self, category_names: Option<&[String]>) -> TicketNumber {
        match self.policy {
            AllocationPolicy::Scan => match category_names {
                Some(names) => next_from_names(names.iter().map(String::as_str)),
                None => TicketNumber(0),
            },
            AllocationPolicy::Counter => TicketNumber(self.counter.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{next_from_names, parse_ticket_number, TicketAllocator};
    use crate::config::AllocationPolicy;
    use crate::domain::ticket::TicketNumber;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn scan_returns_max_plus_one() {
        let allocator = TicketAllocator::default();
        let existing = names(&["ticket-003", "ticket-007", "ticket-010"]);
        assert_eq!(allocator.allocate(Some(&existing)), TicketNumber(11));
    }

    #[test]
    fn scan_returns_zero_for_empty_or_missing_category() {
        let allocator = TicketAllocator::default();
        assert_eq!(allocator.allocate(Some(&[])), TicketNumber(0));
        assert_eq!(allocator.allocate(None), TicketNumber(0));
    }

    #[test]
    fn scan_ignores_suffix_and_unrelated_channels() {
        let existing = names(&["general", "ticket-004-alice", "ticket-abc", "ticket-", "tickets-9"]);
        assert_eq!(next_from_names(existing.iter().map(String::as_str)), TicketNumber(5));
    }

    #[test]
    fn parse_only_reads_first_two_segments() {
        assert_eq!(parse_ticket_number("ticket-012-bob-smith"), Some(TicketNumber(12)));
        assert_eq!(parse_ticket_number("ticket-1000"), Some(TicketNumber(1000)));
        assert_eq!(parse_ticket_number("ticket-12x"), None);
        assert_eq!(parse_ticket_number("Ticket-001"), None);
    }

    #[test]
    fn counter_policy_ignores_live_channels() {
        let allocator = TicketAllocator::new(AllocationPolicy::Counter);
        let existing = names(&["ticket-050"]);
        assert_eq!(allocator.allocate(Some(&existing)), TicketNumber(0));
        assert_eq!(allocator.allocate(None), TicketNumber(1));
    }
}

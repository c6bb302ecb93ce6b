pub mod allocator;
pub mod config;
pub mod domain;
pub mod errors;
pub mod registry;
pub mod transcript;

pub use allocator::{next_from_names, parse_ticket_number, TicketAllocator};
pub use domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
pub use domain::offer::OfferSession;
pub use domain::ticket::{Ticket, TicketEvent, TicketNumber, TicketState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use registry::TicketRegistry;
pub use transcript::{Transcript, TranscriptEntry};

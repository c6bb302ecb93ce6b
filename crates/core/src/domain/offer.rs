use serde::{Deserialize, Serialize};

use crate::domain::ids::MessageId;

/// Process-lifetime state of the storefront offer message. Lost on restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSession {
    pub status_glyph: String,
    pub current_message: Option<MessageId>,
}

impl OfferSession {
    pub fn new(status_glyph: impl Into<String>) -> Self {
        Self { status_glyph: status_glyph.into(), current_message: None }
    }

    /// Records a freshly published instance, returning the one it replaces.
    pub fn replace_current(&mut self, message: MessageId) -> Option<MessageId> {
        self.current_message.replace(message)
    }

    pub fn set_status_glyph(&mut self, glyph: impl Into<String>) {
        self.status_glyph = glyph.into();
    }
}

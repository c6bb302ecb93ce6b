use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake!(GuildId);
snowflake!(ChannelId);
snowflake!(MessageId);
snowflake!(UserId);
snowflake!(RoleId);

impl ChannelId {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}

impl UserId {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl GuildId {
    /// The `@everyone` role shares the guild's id.
    pub fn everyone_role(&self) -> RoleId {
        RoleId(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelId, GuildId, RoleId, UserId};

    #[test]
    fn mentions_use_platform_markup() {
        assert_eq!(ChannelId(42).mention(), "<#42>");
        assert_eq!(UserId(7).mention(), "<@7>");
        assert_eq!(GuildId(9).everyone_role(), RoleId(9));
    }
}

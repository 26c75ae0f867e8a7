//! Identifier newtypes shared across the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("Unique identifier for a ", $prefix, ".")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            #[doc = concat!("Create a new random ", $prefix, " id.")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Wrap an existing UUID as a ", $prefix, " id.")]
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

uuid_id!(SessionId, "session");
uuid_id!(ConversationId, "conversation");
uuid_id!(MessageId, "message");
uuid_id!(UserId, "user");
uuid_id!(InstanceId, "instance");
uuid_id!(SnapshotId, "snapshot");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_prefix() {
        let id = SessionId::new();
        assert!(id.to_string().starts_with("session:"));
    }

    #[test]
    fn from_uuid_round_trips() {
        let uuid = Uuid::new_v4();
        let id = ConversationId::from_uuid(uuid);
        assert_eq!(id.0, uuid);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}

//! Stable identifiers for kernel-owned entities.
//!
//! Editors, terminals, collaboration sessions and participants get a `uuid`
//! v4 identity at creation time. Files and folders are keyed by path instead.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identity.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identity of one open editor instance.
    EditorId
);
uuid_id!(
    /// Identity of one terminal.
    TerminalId
);
uuid_id!(
    /// Identity of one collaboration session.
    SessionId
);
uuid_id!(
    /// Identity of one collaboration participant.
    ParticipantId
);

#[cfg(test)]
mod tests {
    use super::{EditorId, TerminalId};

    #[test]
    fn ids_are_unique_and_parse_back() {
        let first = EditorId::new();
        let second = EditorId::new();
        assert_ne!(first, second);

        let parsed: EditorId = first.to_string().parse().expect("editor id should parse");
        assert_eq!(parsed, first);
    }

    #[test]
    fn ids_serialize_as_plain_uuid_strings() {
        let id = TerminalId::new();
        let json = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(json, format!("\"{id}\""));
    }
}

use crate::id::RoomId;
use serde::{Deserialize, Serialize};

/// Closed role model for a room. Exactly one OWNER grant may exist per room;
/// that invariant is enforced at write time by the access service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    ExecutiveModerator,
    Moderator,
    Participant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::ExecutiveModerator => "EXECUTIVE_MODERATOR",
            Role::Moderator => "MODERATOR",
            Role::Participant => "PARTICIPANT",
        }
    }

    /// Room-scoped role claim carried by internal tokens, e.g. `OWNER-<roomId>`.
    pub fn room_claim(self, room: &RoomId) -> String {
        format!("{}-{}", self.as_str(), room.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Role::Owner),
            "EXECUTIVE_MODERATOR" => Ok(Role::ExecutiveModerator),
            "MODERATOR" => Ok(Role::Moderator),
            "PARTICIPANT" => Ok(Role::Participant),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_format() {
        let room = RoomId("r1".into());
        assert_eq!(Role::Owner.room_claim(&room), "OWNER-r1");
        assert_eq!(
            Role::ExecutiveModerator.room_claim(&room),
            "EXECUTIVE_MODERATOR-r1"
        );
    }

    #[test]
    fn parse_roundtrip() {
        for role in [
            Role::Owner,
            Role::ExecutiveModerator,
            Role::Moderator,
            Role::Participant,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("ADMIN".parse::<Role>().is_err());
    }
}

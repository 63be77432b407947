use crate::id::UserId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    Service,
}

/// Authenticated caller as established from the public end-user token:
/// the subject id plus any top-level (non-room) roles the token carried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub user_id: UserId,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Subject {
    pub fn user(user_id: UserId, roles: Vec<String>) -> Self {
        Self {
            kind: SubjectKind::User,
            user_id,
            roles,
        }
    }

    /// Admin-level top-level role lets a caller pass membership-required
    /// routes; it never yields an elevated room role claim.
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "ADMIN")
    }
}

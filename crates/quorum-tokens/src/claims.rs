use quorum_types::prelude::*;
use serde::{Deserialize, Serialize};

/// Claims carried by end-user tokens, signed in the public trust domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicClaims {
    pub sub: UserId,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat_ms: i64,
    pub exp_ms: i64,
}

/// Claims carried by the short-lived service-to-service token minted at the
/// gateway. `roles` holds the room-scoped claim (`"<ROLE>-<roomId>"`, when a
/// room is targeted) followed by the caller's top-level roles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalClaims {
    pub sub: UserId,
    pub roles: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub iat_ms: i64,
    pub exp_ms: i64,
}

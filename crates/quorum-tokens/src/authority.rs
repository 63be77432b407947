use quorum_types::prelude::*;

use crate::claims::{InternalClaims, PublicClaims};
use crate::errors::TokenError;
use crate::jws;
use crate::keys::Keyring;

/// End-user trust domain. The gateway only verifies here; minting exists for
/// the identity service and for tests.
#[derive(Clone, Debug)]
pub struct PublicTokenAuthority {
    keyring: Keyring,
}

impl PublicTokenAuthority {
    pub fn new(keyring: Keyring) -> Self {
        Self { keyring }
    }

    pub fn mint(&self, claims: &PublicClaims) -> Result<String, TokenError> {
        jws::sign(&self.keyring, claims)
    }

    pub fn verify(&self, token: &str, now_ms: i64) -> Result<PublicClaims, TokenError> {
        let claims: PublicClaims = jws::verify(&self.keyring, token)?;
        if claims.exp_ms <= now_ms {
            return Err(TokenError::unauthenticated("public token expired"));
        }
        Ok(claims)
    }
}

/// Service-to-service trust domain with a short fixed validity window. Its
/// keyring is never reused for end-user verification.
#[derive(Clone, Debug)]
pub struct InternalTokenAuthority {
    keyring: Keyring,
    validity_ms: i64,
}

impl InternalTokenAuthority {
    pub fn new(keyring: Keyring, validity_ms: i64) -> Self {
        Self {
            keyring,
            validity_ms,
        }
    }

    /// Mints the internal token for one forwarded request: the room-scoped
    /// role claim first, then the caller's top-level roles.
    pub fn mint_room_token(
        &self,
        subject: &Subject,
        room: Option<(&RoomId, Role)>,
        features: &[String],
        now_ms: i64,
    ) -> Result<String, TokenError> {
        let mut roles = Vec::with_capacity(subject.roles.len() + 1);
        if let Some((room_id, role)) = room {
            roles.push(role.room_claim(room_id));
        }
        roles.extend(subject.roles.iter().cloned());

        let claims = InternalClaims {
            sub: subject.user_id.clone(),
            roles,
            features: features.to_vec(),
            iat_ms: now_ms,
            exp_ms: now_ms + self.validity_ms,
        };
        jws::sign(&self.keyring, &claims)
    }

    pub fn verify(&self, token: &str, now_ms: i64) -> Result<InternalClaims, TokenError> {
        let claims: InternalClaims = jws::verify(&self.keyring, token)?;
        if claims.exp_ms <= now_ms {
            return Err(TokenError::unauthenticated("internal token expired"));
        }
        Ok(claims)
    }
}

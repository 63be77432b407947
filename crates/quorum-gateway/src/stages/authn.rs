use crate::context::{headers, ProtoRequest, ProtoResponse, RequestContext};
use crate::errors::GatewayError;
use crate::now_ms;
use crate::stages::{Stage, StageOutcome};
use async_trait::async_trait;
use quorum_tokens::prelude::PublicTokenAuthority;
use quorum_types::prelude::*;
use std::sync::Arc;

/// Verifies the caller's public bearer token. Guarded routes require one;
/// open routes pass through anonymously, but a token that is present and
/// invalid is always an error.
pub struct AuthnStage {
    authority: Arc<PublicTokenAuthority>,
}

impl AuthnStage {
    pub fn new(authority: Arc<PublicTokenAuthority>) -> Self {
        Self { authority }
    }
}

fn bearer(req: &dyn ProtoRequest) -> Option<String> {
    let raw = req.header(headers::AUTHORIZATION)?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token.trim().to_string())
}

#[async_trait]
impl Stage for AuthnStage {
    fn name(&self) -> &'static str {
        "authn"
    }

    async fn on_request(
        &self,
        cx: &mut RequestContext,
        req: &dyn ProtoRequest,
        _res: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, GatewayError> {
        let Some(token) = bearer(req) else {
            let guarded = cx
                .route
                .as_ref()
                .map(|r| r.rule.requires_membership)
                .unwrap_or(false);
            if guarded {
                return Err(GatewayError::unauthenticated("missing bearer token"));
            }
            return Ok(StageOutcome::Continue);
        };
        let claims = self.authority.verify(&token, now_ms())?;
        cx.subject = Some(Subject::user(claims.sub, claims.roles));
        Ok(StageOutcome::Continue)
    }
}

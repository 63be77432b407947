use crate::access_api::AccessApi;
use crate::context::{ProtoRequest, ProtoResponse, RequestContext};
use crate::errors::GatewayError;
use crate::now_ms;
use crate::stages::{Stage, StageOutcome};
use async_trait::async_trait;
use quorum_tokens::prelude::InternalTokenAuthority;
use quorum_types::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-user feature entitlements baked into the internal token.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn features_for(&self, user: &UserId) -> Result<Vec<String>, GatewayError>;
}

/// Hands every user the same feature set; the default when no entitlement
/// service is wired up.
pub struct StaticFeatureSource(pub Vec<String>);

#[async_trait]
impl FeatureSource for StaticFeatureSource {
    async fn features_for(&self, _user: &UserId) -> Result<Vec<String>, GatewayError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub resolve_timeout_ms: u64,
    pub feature_timeout_ms: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 500,
            feature_timeout_ms: 300,
        }
    }
}

/// Exchanges the verified public identity for a short-lived internal
/// token carrying the caller's room role.
///
/// Role resolution fails closed: when the access service is down or slow,
/// a guarded route is rejected rather than guessed at. Open room routes
/// degrade to the participant role so read traffic keeps flowing.
/// Feature lookup is best-effort either way.
pub struct TranslateStage {
    access: Arc<dyn AccessApi>,
    features: Arc<dyn FeatureSource>,
    authority: Arc<InternalTokenAuthority>,
    config: TranslateConfig,
}

impl TranslateStage {
    pub fn new(
        access: Arc<dyn AccessApi>,
        features: Arc<dyn FeatureSource>,
        authority: Arc<InternalTokenAuthority>,
        config: TranslateConfig,
    ) -> Self {
        Self {
            access,
            features,
            authority,
            config,
        }
    }

    async fn resolve_role(
        &self,
        cx: &RequestContext,
        room: &RoomId,
        subject: &Subject,
        guarded: bool,
    ) -> Result<Role, GatewayError> {
        let deadline = Duration::from_millis(self.config.resolve_timeout_ms);
        let resolved = tokio::time::timeout(deadline, self.access.resolve(room, &subject.user_id)).await;
        match resolved {
            Ok(Ok(Some(grant))) => Ok(grant.role),
            Ok(Ok(None)) => {
                if guarded && !subject.is_admin() {
                    return Err(GatewayError::forbidden(&format!(
                        "user {} has no grant in room {}",
                        subject.user_id.0, room.0
                    )));
                }
                if guarded {
                    // Admin override: admitted, but with the lowest room
                    // role rather than any elevated claim.
                    debug!(
                        request_id = %cx.request_id,
                        room = %room.0,
                        user = %subject.user_id.0,
                        "admin admitted to guarded room without grant"
                    );
                }
                Ok(Role::Participant)
            }
            Ok(Err(err)) => self.degraded_role(cx, room, guarded, &format!("{err}")),
            Err(_) => self.degraded_role(cx, room, guarded, "resolve timed out"),
        }
    }

    fn degraded_role(
        &self,
        cx: &RequestContext,
        room: &RoomId,
        guarded: bool,
        reason: &str,
    ) -> Result<Role, GatewayError> {
        if guarded {
            warn!(
                request_id = %cx.request_id,
                room = %room.0,
                reason,
                "access resolve unavailable, failing closed"
            );
            return Err(GatewayError::forbidden(
                "room access could not be verified, try again shortly",
            ));
        }
        warn!(
            request_id = %cx.request_id,
            room = %room.0,
            reason,
            "access resolve unavailable on open route, defaulting to participant"
        );
        Ok(Role::Participant)
    }

    async fn features_for(&self, cx: &RequestContext, user: &UserId) -> Vec<String> {
        let deadline = Duration::from_millis(self.config.feature_timeout_ms);
        match tokio::time::timeout(deadline, self.features.features_for(user)).await {
            Ok(Ok(features)) => features,
            Ok(Err(err)) => {
                warn!(
                    request_id = %cx.request_id,
                    code = err.code().as_str(),
                    "feature lookup failed, minting without features"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    request_id = %cx.request_id,
                    "feature lookup timed out, minting without features"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Stage for TranslateStage {
    fn name(&self) -> &'static str {
        "translate"
    }

    async fn on_request(
        &self,
        cx: &mut RequestContext,
        _req: &dyn ProtoRequest,
        _res: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, GatewayError> {
        let Some(route) = cx.route.clone() else {
            return Ok(StageOutcome::Continue);
        };
        let Some(subject) = cx.subject.clone() else {
            // Anonymous caller on an open route; nothing to translate.
            return Ok(StageOutcome::Continue);
        };

        let room_claim = match route.room_id() {
            Some(room) => {
                let role = self
                    .resolve_role(cx, &room, &subject, route.rule.requires_membership)
                    .await?;
                cx.room_role = Some(role);
                Some((room, role))
            }
            // Routes without a room segment (e.g. room creation) still get
            // an internal identity token.
            None => None,
        };

        let features = self.features_for(cx, &subject.user_id).await;
        let token = self.authority.mint_room_token(
            &subject,
            room_claim.as_ref().map(|(room, role)| (room, *role)),
            &features,
            now_ms(),
        )?;
        // The token rides in the context; the adapter attaches it to the
        // upstream hop, never to the client response.
        cx.internal_token = Some(token);
        Ok(StageOutcome::Continue)
    }
}

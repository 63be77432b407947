use crate::errors::GatewayError;
use crate::filters::{AccessChangeRequest, ChangeKind};
use async_trait::async_trait;
use quorum_types::prelude::*;
use serde::Deserialize;
use std::time::Duration;

/// Client seam for the access service. The gateway only resolves grants
/// and replays derived changes; everything else stays behind the service.
#[async_trait]
pub trait AccessApi: Send + Sync {
    async fn resolve(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> Result<Option<AccessGrant>, GatewayError>;

    async fn apply(&self, change: &AccessChangeRequest) -> Result<(), GatewayError>;
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AccessApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for AccessApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8701".into(),
            timeout_ms: 800,
        }
    }
}

/// HTTP client against the access service's internal plane.
pub struct HttpAccessApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAccessApi {
    pub fn new(config: &AccessApiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::internal(&format!("access client build failed: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl AccessApi for HttpAccessApi {
    async fn resolve(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> Result<Option<AccessGrant>, GatewayError> {
        let url = format!("{}/access/{}/{}", self.base_url, room.0, user.0);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::upstream_timeout(&format!("access resolve timed out: {e}"))
            } else {
                GatewayError::upstream_unavailable(&format!("access resolve failed: {e}"))
            }
        })?;
        match response.status().as_u16() {
            200 => {
                let grant = response.json::<AccessGrant>().await.map_err(|e| {
                    GatewayError::upstream_unavailable(&format!("access resolve decode: {e}"))
                })?;
                Ok(Some(grant))
            }
            404 => Ok(None),
            status => Err(GatewayError::upstream_unavailable(&format!(
                "access resolve returned {status}"
            ))),
        }
    }

    async fn apply(&self, change: &AccessChangeRequest) -> Result<(), GatewayError> {
        let response = match change.kind {
            ChangeKind::Create => {
                let user = change.user_id.as_ref().ok_or_else(|| {
                    GatewayError::bad_request("create change without a target user")
                })?;
                let role = change
                    .role
                    .ok_or_else(|| GatewayError::bad_request("create change without a role"))?;
                let mut url = format!("{}/access/", self.base_url);
                if let Some(limit) = change.participant_limit {
                    url.push_str(&format!("?participant_limit={limit}"));
                }
                self.client
                    .post(&url)
                    .json(&serde_json::json!({
                        "room_id": change.room_id,
                        "user_id": user,
                        "role": role,
                        "revision": change.revision,
                    }))
                    .send()
                    .await
            }
            ChangeKind::Delete => {
                let user = change.user_id.as_ref().ok_or_else(|| {
                    GatewayError::bad_request("delete change without a target user")
                })?;
                let url = format!("{}/access/{}/{}", self.base_url, change.room_id.0, user.0);
                self.client.delete(&url).send().await
            }
            ChangeKind::DeleteAll => {
                let url = format!("{}/access/{}", self.base_url, change.room_id.0);
                self.client.delete(&url).send().await
            }
        };

        let response = response.map_err(|e| {
            if e.is_timeout() {
                GatewayError::upstream_timeout(&format!("access apply timed out: {e}"))
            } else {
                GatewayError::upstream_unavailable(&format!("access apply failed: {e}"))
            }
        })?;
        match response.status().as_u16() {
            // A delete of an already-gone grant is a success for replay.
            200 | 404 => Ok(()),
            status => Err(GatewayError::upstream_unavailable(&format!(
                "access apply returned {status}"
            ))),
        }
    }
}

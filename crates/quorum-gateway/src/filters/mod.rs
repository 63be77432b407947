use crate::access_api::AccessApi;
use crate::context::{ProtoRequest, RequestContext};
use crate::errors::GatewayError;
use quorum_types::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub mod standard;

/// One access mutation derived from a successful room operation, to be
/// replayed against the access service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessChangeRequest {
    pub kind: ChangeKind,
    pub room_id: RoomId,
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub revision: Revision,
    pub participant_limit: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Create,
    Delete,
    DeleteAll,
}

/// What the upstream told us about the entity it touched, read off the
/// response before the body is forwarded.
#[derive(Clone, Debug, Default)]
pub struct ResponseMeta {
    pub status: u16,
    /// `X-Entity-Id` response header.
    pub entity_id: Option<String>,
    /// `X-Entity-Revision` response header.
    pub revision: Option<Revision>,
}

impl ResponseMeta {
    pub fn revision_or_zero(&self) -> Revision {
        self.revision.clone().unwrap_or_else(Revision::zero)
    }
}

/// Route-attached hook that mirrors room mutations into access grants.
/// `precheck` runs before the upstream call and may veto the request;
/// `derive` runs only after a 2xx upstream response.
pub trait PropagationFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn precheck(
        &self,
        _cx: &RequestContext,
        _req: &dyn ProtoRequest,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    fn derive(
        &self,
        cx: &RequestContext,
        req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest>;
}

/// Applies derived changes against the access service off the request
/// path. Changes from one request run sequentially on a single task, so
/// ordered pairs (revoke old owner, grant new owner) stay ordered.
/// Failures are logged and dropped; the next reconciliation sync heals
/// any divergence.
#[derive(Clone)]
pub struct PropagationExecutor {
    api: Arc<dyn AccessApi>,
}

impl PropagationExecutor {
    pub fn new(api: Arc<dyn AccessApi>) -> Self {
        Self { api }
    }

    pub fn dispatch(
        &self,
        request_id: String,
        changes: Vec<AccessChangeRequest>,
    ) -> tokio::task::JoinHandle<()> {
        let api = self.api.clone();
        tokio::spawn(async move {
            for change in changes {
                if let Err(err) = api.apply(&change).await {
                    warn!(
                        request_id = %request_id,
                        room = %change.room_id.0,
                        kind = ?change.kind,
                        code = err.code().as_str(),
                        "access propagation failed"
                    );
                }
            }
        })
    }
}

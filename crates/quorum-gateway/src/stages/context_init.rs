use crate::context::{headers, ProtoRequest, ProtoResponse, RequestContext};
use crate::errors::GatewayError;
use crate::now_ms;
use crate::routes::RoutePolicy;
use crate::stages::{Stage, StageOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Seeds the request context: correlation id, arrival time, peer address
/// and the bound route rule.
pub struct ContextInitStage {
    policy: Arc<RoutePolicy>,
}

impl ContextInitStage {
    pub fn new(policy: Arc<RoutePolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Stage for ContextInitStage {
    fn name(&self) -> &'static str {
        "context_init"
    }

    async fn on_request(
        &self,
        cx: &mut RequestContext,
        req: &dyn ProtoRequest,
        _res: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, GatewayError> {
        cx.request_id = req
            .header(headers::REQUEST_ID)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        cx.received_at_ms = now_ms();
        cx.peer_ip = req.peer_ip();
        cx.route = self.policy.bind(req.method(), req.path());
        Ok(StageOutcome::Continue)
    }
}

use crate::context::{headers, ProtoRequest, ProtoResponse, RequestContext};
use crate::errors::GatewayError;
use crate::filters::{PropagationExecutor, ResponseMeta};
use async_trait::async_trait;
use futures::future::BoxFuture;
use quorum_types::prelude::Revision;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub mod authn;
pub mod context_init;
pub mod throttle;
pub mod translate;

pub enum StageOutcome {
    Continue,
    /// The stage already produced the final response.
    ShortCircuit,
}

/// One link of the edge chain. Stages run in order and may enrich the
/// context, rewrite the response, or abort the request with an error.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_request(
        &self,
        cx: &mut RequestContext,
        req: &dyn ProtoRequest,
        res: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, GatewayError>;
}

/// Boxed request handler invoked once the chain admits the request.
pub type Handler<'h> = Box<
    dyn for<'a> FnOnce(
            &'a RequestContext,
            &'a mut dyn ProtoResponse,
        ) -> BoxFuture<'a, Result<(), GatewayError>>
        + Send
        + 'h,
>;

/// Runs stages, filter prechecks, the handler under a deadline, and the
/// post-response propagation derive. Returns the join handle of the
/// propagation task when one was dispatched, so callers (mostly tests)
/// can await completion.
pub struct GatewayChain {
    stages: Vec<Arc<dyn Stage>>,
    executor: PropagationExecutor,
    handler_timeout_ms: u64,
}

impl GatewayChain {
    pub fn new(stages: Vec<Arc<dyn Stage>>, executor: PropagationExecutor) -> Self {
        Self {
            stages,
            executor,
            handler_timeout_ms: 10_000,
        }
    }

    pub fn handler_timeout_ms(mut self, ms: u64) -> Self {
        self.handler_timeout_ms = ms;
        self
    }

    pub async fn run_with_handler(
        &self,
        cx: &mut RequestContext,
        req: &dyn ProtoRequest,
        res: &mut dyn ProtoResponse,
        handler: Handler<'_>,
    ) -> Option<JoinHandle<()>> {
        for stage in &self.stages {
            match stage.on_request(cx, req, res).await {
                Ok(StageOutcome::Continue) => {}
                Ok(StageOutcome::ShortCircuit) => {
                    self.finalize(cx, res);
                    return None;
                }
                Err(err) => {
                    res.set_error(&err.0);
                    self.finalize(cx, res);
                    return None;
                }
            }
        }

        if let Some(route) = &cx.route {
            for filter in &route.rule.filters {
                if let Err(err) = filter.precheck(cx, req) {
                    res.set_error(&err.0);
                    self.finalize(cx, res);
                    return None;
                }
            }
        }

        let deadline = Duration::from_millis(self.handler_timeout_ms);
        match tokio::time::timeout(deadline, handler(cx, res)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                res.set_error(&err.0);
                self.finalize(cx, res);
                return None;
            }
            Err(_) => {
                let err = GatewayError::upstream_timeout("request handler deadline exceeded");
                res.set_error(&err.0);
                self.finalize(cx, res);
                return None;
            }
        }
        self.finalize(cx, res);

        if !(200..300).contains(&res.status()) {
            return None;
        }
        let route = cx.route.as_ref()?;
        if route.rule.filters.is_empty() {
            return None;
        }
        let meta = ResponseMeta {
            status: res.status(),
            entity_id: res.header(headers::ENTITY_ID),
            revision: res.header(headers::ENTITY_REVISION).map(Revision),
        };
        let mut changes = Vec::new();
        for filter in &route.rule.filters {
            changes.extend(filter.derive(cx, req, &meta));
        }
        if changes.is_empty() {
            return None;
        }
        Some(self.executor.dispatch(cx.request_id.clone(), changes))
    }

    fn finalize(&self, cx: &RequestContext, res: &mut dyn ProtoResponse) {
        if !cx.request_id.is_empty() {
            res.set_header(headers::REQUEST_ID, &cx.request_id);
        }
        if let Some(remaining) = cx.rate_remaining {
            res.set_header(headers::RATE_REMAINING, &remaining.to_string());
        }
    }
}

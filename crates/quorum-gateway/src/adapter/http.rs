use crate::context::{ProtoRequest, ProtoResponse, RequestContext};
use crate::stages::{GatewayChain, Handler};
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use quorum_errors::prelude::ErrorObj;

/// [`ProtoRequest`] view over an axum request's parts.
pub struct AxumReq {
    method: String,
    path: String,
    headers: HeaderMap,
    peer_ip: Option<String>,
}

impl AxumReq {
    pub fn from_request<B>(req: &Request<B>, peer_ip: Option<String>) -> Self {
        Self {
            method: req.method().as_str().to_string(),
            path: req.uri().path().to_string(),
            headers: req.headers().clone(),
            peer_ip,
        }
    }
}

impl ProtoRequest for AxumReq {
    fn method(&self) -> &str {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    fn peer_ip(&self) -> Option<String> {
        self.peer_ip.clone()
    }
}

/// [`ProtoResponse`] backed by an axum status/header/body triple.
pub struct AxumRes {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for AxumRes {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl AxumRes {
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ProtoResponse for AxumRes {
    fn status(&self) -> u16 {
        self.status.as_u16()
    }

    fn set_status(&mut self, status: u16) {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            return;
        };
        self.headers.insert(name, value);
    }

    fn set_body_json(&mut self, value: &serde_json::Value) {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = value.to_string().into_bytes();
    }

    fn set_error(&mut self, err: &ErrorObj) {
        self.set_status(err.http_status);
        match serde_json::to_value(err.to_public()) {
            Ok(body) => self.set_body_json(&body),
            Err(_) => self.body = Vec::new(),
        }
    }
}

/// Runs one axum request through the chain and renders the result. The
/// propagation task, if any, is detached; tests that need to await it use
/// [`GatewayChain::run_with_handler`] directly.
pub async fn handle_with_chain<B>(
    chain: &GatewayChain,
    req: &Request<B>,
    peer_ip: Option<String>,
    handler: Handler<'_>,
) -> Response {
    let proto_req = AxumReq::from_request(req, peer_ip);
    let mut proto_res = AxumRes::default();
    let mut cx = RequestContext::default();
    let _propagation = chain
        .run_with_handler(&mut cx, &proto_req, &mut proto_res, handler)
        .await;
    proto_res.into_response()
}

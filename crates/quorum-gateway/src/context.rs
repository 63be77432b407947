use crate::routes::RouteBinding;
use quorum_errors::prelude::ErrorObj;
use quorum_types::prelude::*;

/// Header names shared between stages, filters and adapters. All
/// lower-case; HTTP header lookup is case-insensitive anyway.
pub mod headers {
    pub const AUTHORIZATION: &str = "authorization";
    pub const REQUEST_ID: &str = "x-request-id";
    pub const RATE_REMAINING: &str = "x-ratelimit-remaining";
    pub const INTERNAL_TOKEN: &str = "x-internal-token";
    pub const ENTITY_ID: &str = "x-entity-id";
    pub const ENTITY_REVISION: &str = "x-entity-revision";
    pub const PREVIOUS_OWNER: &str = "x-previous-owner";
}

/// Per-request state threaded through the interceptor chain. Stages fill
/// it in; the handler and the propagation filters read it.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub received_at_ms: i64,
    pub peer_ip: Option<String>,
    /// Caller identity after public-token verification.
    pub subject: Option<Subject>,
    /// Bound route rule, when the path matched the route policy.
    pub route: Option<RouteBinding>,
    /// Room role resolved by the token translator.
    pub room_role: Option<Role>,
    /// Internal token minted for the upstream hop.
    pub internal_token: Option<String>,
    /// Tokens left in the caller's throttle bucket after this request.
    pub rate_remaining: Option<u32>,
}

impl RequestContext {
    pub fn subject_user(&self) -> Option<&UserId> {
        self.subject.as_ref().map(|s| &s.user_id)
    }
}

/// Protocol-neutral view of the inbound request, so stages never depend on
/// a specific HTTP framework.
pub trait ProtoRequest: Send + Sync {
    fn method(&self) -> &str;
    fn path(&self) -> &str;
    fn header(&self, name: &str) -> Option<String>;
    fn peer_ip(&self) -> Option<String>;
}

/// Mutable view of the outbound response for stages, handlers and error
/// rendering.
pub trait ProtoResponse: Send {
    fn status(&self) -> u16;
    fn set_status(&mut self, status: u16);
    fn header(&self, name: &str) -> Option<String>;
    fn set_header(&mut self, name: &str, value: &str);
    fn set_body_json(&mut self, value: &serde_json::Value);
    /// Replaces the response with the public rendering of `err`.
    fn set_error(&mut self, err: &ErrorObj);
}

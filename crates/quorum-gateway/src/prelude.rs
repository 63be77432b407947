pub use crate::access_api::{AccessApi, AccessApiConfig, HttpAccessApi};
pub use crate::adapter::http::{handle_with_chain, AxumReq, AxumRes};
pub use crate::context::{headers, ProtoRequest, ProtoResponse, RequestContext};
pub use crate::errors::GatewayError;
pub use crate::filters::standard::{
    MembershipJoinFilter, MembershipLeaveFilter, RoleGrantFilter, RoleRevokeFilter,
    RoomCreatedFilter, RoomDeletedFilter, TransferByIdFilter, TransferByTokenFilter,
};
pub use crate::filters::{
    AccessChangeRequest, ChangeKind, PropagationExecutor, PropagationFilter, ResponseMeta,
};
pub use crate::routes::{RouteBinding, RoutePolicy, RouteRule};
pub use crate::stages::authn::AuthnStage;
pub use crate::stages::context_init::ContextInitStage;
pub use crate::stages::throttle::{
    RequestThrottle, ThrottleBudget, ThrottleConfig, ThrottleOutcome, ThrottleStage,
};
pub use crate::stages::translate::{
    FeatureSource, StaticFeatureSource, TranslateConfig, TranslateStage,
};
pub use crate::stages::{GatewayChain, Handler, Stage, StageOutcome};

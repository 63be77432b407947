use crate::context::{headers, ProtoRequest, RequestContext};
use crate::errors::GatewayError;
use crate::filters::{AccessChangeRequest, ChangeKind, PropagationFilter, ResponseMeta};
use quorum_types::prelude::*;
use tracing::warn;

fn caller(cx: &RequestContext) -> Option<UserId> {
    cx.subject.as_ref().map(|s| s.user_id.clone())
}

fn route_room(cx: &RequestContext) -> Option<RoomId> {
    cx.route.as_ref().and_then(|r| r.room_id())
}

fn target_user(cx: &RequestContext, param: &str) -> Option<UserId> {
    cx.route
        .as_ref()
        .and_then(|r| r.param(param))
        .map(|s| UserId(s.to_string()))
}

fn create(
    room: RoomId,
    user: UserId,
    role: Role,
    meta: &ResponseMeta,
    participant_limit: Option<u32>,
) -> AccessChangeRequest {
    AccessChangeRequest {
        kind: ChangeKind::Create,
        room_id: room,
        user_id: Some(user),
        role: Some(role),
        revision: meta.revision_or_zero(),
        participant_limit,
    }
}

fn delete(room: RoomId, user: UserId, meta: &ResponseMeta) -> AccessChangeRequest {
    AccessChangeRequest {
        kind: ChangeKind::Delete,
        room_id: room,
        user_id: Some(user),
        role: None,
        revision: meta.revision_or_zero(),
        participant_limit: None,
    }
}

/// A newly created room grants its creator the owner role. The room id
/// comes from the upstream `X-Entity-Id` header since the route path has
/// no room segment yet.
pub struct RoomCreatedFilter;

impl PropagationFilter for RoomCreatedFilter {
    fn name(&self) -> &'static str {
        "room_created"
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(user), Some(entity)) = (caller(cx), meta.entity_id.clone()) else {
            warn!(request_id = %cx.request_id, "room creation without caller or entity id, no grant derived");
            return Vec::new();
        };
        vec![create(RoomId(entity), user, Role::Owner, meta, None)]
    }
}

/// Deleting a room revokes every grant in it.
pub struct RoomDeletedFilter;

impl PropagationFilter for RoomDeletedFilter {
    fn name(&self) -> &'static str {
        "room_deleted"
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let Some(room) = route_room(cx) else {
            return Vec::new();
        };
        vec![AccessChangeRequest {
            kind: ChangeKind::DeleteAll,
            room_id: room,
            user_id: None,
            role: None,
            revision: meta.revision_or_zero(),
            participant_limit: None,
        }]
    }
}

/// Grants `role` to the user named by a path parameter. Callers cannot
/// change their own role through these routes.
pub struct RoleGrantFilter {
    pub param: &'static str,
    pub role: Role,
}

impl PropagationFilter for RoleGrantFilter {
    fn name(&self) -> &'static str {
        "role_grant"
    }

    fn precheck(&self, cx: &RequestContext, _req: &dyn ProtoRequest) -> Result<(), GatewayError> {
        reject_self_target(cx, self.param)
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(user)) = (route_room(cx), target_user(cx, self.param)) else {
            return Vec::new();
        };
        vec![create(room, user, self.role, meta, None)]
    }
}

/// Revokes the grant of the user named by a path parameter.
pub struct RoleRevokeFilter {
    pub param: &'static str,
}

impl PropagationFilter for RoleRevokeFilter {
    fn name(&self) -> &'static str {
        "role_revoke"
    }

    fn precheck(&self, cx: &RequestContext, _req: &dyn ProtoRequest) -> Result<(), GatewayError> {
        reject_self_target(cx, self.param)
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(user)) = (route_room(cx), target_user(cx, self.param)) else {
            return Vec::new();
        };
        vec![delete(room, user, meta)]
    }
}

/// Ownership transfer where the new owner is named in the path and the
/// caller is the outgoing owner. Emits the grant before the revoke, in
/// that order, so the room is never left ownerless; the executor
/// preserves the order.
pub struct TransferByIdFilter {
    pub param: &'static str,
}

impl PropagationFilter for TransferByIdFilter {
    fn name(&self) -> &'static str {
        "transfer_by_id"
    }

    fn precheck(&self, cx: &RequestContext, _req: &dyn ProtoRequest) -> Result<(), GatewayError> {
        reject_self_target(cx, self.param)
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(old), Some(new)) =
            (route_room(cx), caller(cx), target_user(cx, self.param))
        else {
            return Vec::new();
        };
        vec![
            create(room.clone(), new, Role::Owner, meta, None),
            delete(room, old, meta),
        ]
    }
}

/// Ownership transfer claimed by the new owner, e.g. through a handover
/// token. The outgoing owner is reported by the upstream in the
/// `X-Previous-Owner` request header.
pub struct TransferByTokenFilter;

impl PropagationFilter for TransferByTokenFilter {
    fn name(&self) -> &'static str {
        "transfer_by_token"
    }

    fn derive(
        &self,
        cx: &RequestContext,
        req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(new)) = (route_room(cx), caller(cx)) else {
            return Vec::new();
        };
        let mut changes = vec![create(room.clone(), new.clone(), Role::Owner, meta, None)];
        if let Some(previous) = req.header(headers::PREVIOUS_OWNER) {
            if previous != new.0 {
                changes.push(delete(room, UserId(previous), meta));
            }
        }
        changes
    }
}

/// Joining a room grants the caller a participant role, subject to the
/// route's soft capacity.
pub struct MembershipJoinFilter;

impl PropagationFilter for MembershipJoinFilter {
    fn name(&self) -> &'static str {
        "membership_join"
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(user)) = (route_room(cx), caller(cx)) else {
            return Vec::new();
        };
        let limit = cx.route.as_ref().and_then(|r| r.rule.participant_limit);
        vec![create(room, user, Role::Participant, meta, limit)]
    }
}

/// Leaving a room revokes the caller's grant.
pub struct MembershipLeaveFilter;

impl PropagationFilter for MembershipLeaveFilter {
    fn name(&self) -> &'static str {
        "membership_leave"
    }

    fn derive(
        &self,
        cx: &RequestContext,
        _req: &dyn ProtoRequest,
        meta: &ResponseMeta,
    ) -> Vec<AccessChangeRequest> {
        let (Some(room), Some(user)) = (route_room(cx), caller(cx)) else {
            return Vec::new();
        };
        vec![delete(room, user, meta)]
    }
}

fn reject_self_target(cx: &RequestContext, param: &str) -> Result<(), GatewayError> {
    let (Some(user), Some(target)) = (caller(cx), target_user(cx, param)) else {
        return Ok(());
    };
    if user == target {
        return Err(GatewayError::self_target(&format!(
            "user {} targeted their own grant",
            user.0
        )));
    }
    Ok(())
}

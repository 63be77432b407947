use crate::errors::AccessError;
use crate::now_ms;
use crate::reconcile::{Reconciler, SyncPublisher};
use crate::retry::{with_retry, RetryPolicy};
use crate::store::AccessStore;
use quorum_types::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One create-or-update request as received over the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrantRequest {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: Role,
    #[serde(default = "Revision::zero")]
    pub revision: Revision,
}

/// Application-facing facade over the store and reconciler. Owns the
/// room-level rules that are not plain CRUD: the single-owner invariant
/// and the soft participant limit.
pub struct AccessService<S, P> {
    store: S,
    reconciler: Reconciler<S, P>,
    retry: RetryPolicy,
}

impl<S, P> AccessService<S, P>
where
    S: AccessStore + Clone,
    P: SyncPublisher,
{
    pub fn new(store: S, publisher: P, retry: RetryPolicy) -> Self {
        let reconciler = Reconciler::new(store.clone(), publisher, retry);
        Self {
            store,
            reconciler,
            retry,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<S, P> {
        &self.reconciler
    }

    pub async fn resolve(&self, room: &RoomId, user: &UserId) -> Result<AccessGrant, AccessError> {
        self.store
            .get_and_touch(room, user, now_ms())
            .await?
            .ok_or_else(|| {
                AccessError::not_found(&format!("no grant for user {} in room {}", user.0, room.0))
            })
    }

    pub async fn list_by_room(
        &self,
        room: &RoomId,
        role: Option<Role>,
    ) -> Result<Vec<AccessGrant>, AccessError> {
        self.store.list_by_room(room, role).await
    }

    pub async fn list_by_user(&self, user: &UserId) -> Result<Vec<AccessGrant>, AccessError> {
        self.store.list_by_user(user).await
    }

    pub async fn count_by_room_and_role(
        &self,
        room: &RoomId,
        role: Role,
    ) -> Result<usize, AccessError> {
        self.store.count_by_room_and_role(room, role).await
    }

    /// Creates or updates a grant. Owner grants displace any previous owner
    /// of the room inside one room transaction. Participant grants honor an
    /// optional room capacity; the check is a soft limit (count and insert
    /// are separate statements), which keeps the join path cheap.
    pub async fn create(
        &self,
        request: &GrantRequest,
        participant_limit: Option<u32>,
    ) -> Result<AccessGrant, AccessError> {
        if request.role == Role::Participant {
            if let Some(limit) = participant_limit {
                let current = self
                    .store
                    .count_by_room_and_role(&request.room_id, Role::Participant)
                    .await?;
                if current >= limit as usize {
                    return Err(AccessError::capacity(&format!(
                        "room {} holds {current} participants, limit {limit}",
                        request.room_id.0
                    )));
                }
            }
        }
        if request.role == Role::Owner {
            return with_retry(&self.retry, || self.create_owner_once(request)).await;
        }
        self.store
            .upsert(
                &request.room_id,
                &request.user_id,
                request.role,
                &request.revision,
                now_ms(),
            )
            .await
    }

    async fn create_owner_once(&self, request: &GrantRequest) -> Result<AccessGrant, AccessError> {
        let mut tx = self.store.room_tx(&request.room_id).await?;
        let displaced: Vec<UserId> = tx
            .grants()
            .into_iter()
            .filter(|g| g.role == Role::Owner && g.user_id != request.user_id)
            .map(|g| g.user_id)
            .collect();
        for user in &displaced {
            tx.delete(user);
        }
        let grant = tx.upsert(&request.user_id, Role::Owner, &request.revision, now_ms());
        tx.commit().await?;
        for user in &displaced {
            info!(room = %request.room_id.0, user = %user.0, "previous owner grant revoked");
        }
        Ok(grant)
    }

    pub async fn delete(&self, room: &RoomId, user: &UserId) -> Result<AccessGrant, AccessError> {
        self.store.delete(room, user).await?.ok_or_else(|| {
            AccessError::not_found(&format!("no grant for user {} in room {}", user.0, room.0))
        })
    }

    pub async fn delete_all_for_room(
        &self,
        room: &RoomId,
    ) -> Result<Vec<AccessGrant>, AccessError> {
        let removed = self.store.delete_all_for_room(room).await?;
        if !removed.is_empty() {
            info!(room = %room.0, removed = removed.len(), "all room grants revoked");
        }
        Ok(removed)
    }

    pub async fn request_sync(
        &self,
        room: &RoomId,
        min_revision: &Revision,
    ) -> Result<RoomSyncTracker, AccessError> {
        self.reconciler.request_sync(room, min_revision).await
    }
}

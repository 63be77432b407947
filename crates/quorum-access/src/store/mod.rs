use crate::errors::AccessError;
use async_trait::async_trait;
use quorum_types::prelude::*;

pub mod memory;

/// Persistent table of per-room-per-user role grants plus the per-room sync
/// tracker. Pure data/query layer; all consistency decisions live in the
/// reconciler and service.
///
/// The direct operations are single atomic statements at read-committed
/// strength. Flows that must not race with a concurrent reconciliation of
/// the same room (snapshot application, owner replacement, tracker writes)
/// go through [`AccessStore::room_tx`] instead.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Hot-path lookup. Touches `last_access_at` as a side effect, since
    /// callers use this path to detect inactivity.
    async fn get_and_touch(
        &self,
        room: &RoomId,
        user: &UserId,
        now_ms: i64,
    ) -> Result<Option<AccessGrant>, AccessError>;

    async fn list_by_room(
        &self,
        room: &RoomId,
        role: Option<Role>,
    ) -> Result<Vec<AccessGrant>, AccessError>;

    async fn list_by_user(&self, user: &UserId) -> Result<Vec<AccessGrant>, AccessError>;

    async fn count_by_room_and_role(
        &self,
        room: &RoomId,
        role: Role,
    ) -> Result<usize, AccessError>;

    async fn tracker(&self, room: &RoomId) -> Result<Option<RoomSyncTracker>, AccessError>;

    /// Idempotent create-or-update in one statement, so there is no
    /// read-then-write window. A role change keeps `created_at`.
    async fn upsert(
        &self,
        room: &RoomId,
        user: &UserId,
        role: Role,
        revision: &Revision,
        now_ms: i64,
    ) -> Result<AccessGrant, AccessError>;

    async fn delete(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> Result<Option<AccessGrant>, AccessError>;

    async fn delete_all_for_room(&self, room: &RoomId) -> Result<Vec<AccessGrant>, AccessError>;

    /// Serializable room-scoped transaction. Commit fails with
    /// `STORAGE.CONFLICT` when another commit touched the room in between;
    /// callers wrap it in the bounded retry combinator.
    async fn room_tx(&self, room: &RoomId) -> Result<Box<dyn RoomTx>, AccessError>;
}

/// Buffered-write transaction over a single room's grants and tracker row.
/// Dropping it without commit discards all buffered changes. Cross-room
/// operations never share a transaction, so reconciliation throughput
/// scales with room concurrency.
#[async_trait]
pub trait RoomTx: Send {
    /// Tracker as seen by this transaction; a never-synced room reads as
    /// revision `"0"`.
    fn tracker(&self) -> RoomSyncTracker;

    fn get(&self, user: &UserId) -> Option<AccessGrant>;

    fn grants(&self) -> Vec<AccessGrant>;

    fn upsert(
        &mut self,
        user: &UserId,
        role: Role,
        revision: &Revision,
        now_ms: i64,
    ) -> AccessGrant;

    fn delete(&mut self, user: &UserId) -> Option<AccessGrant>;

    /// Removes every grant whose revision sequence is strictly below `seq`
    /// and returns how many were removed.
    fn delete_below(&mut self, seq: u64) -> usize;

    fn set_tracker(&mut self, revision: Revision);

    async fn commit(self: Box<Self>) -> Result<(), AccessError>;
}

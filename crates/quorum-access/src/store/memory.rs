use crate::errors::AccessError;
use crate::store::{AccessStore, RoomTx};
use async_trait::async_trait;
use parking_lot::RwLock;
use quorum_types::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory [`AccessStore`] used by tests and single-node deployments.
/// Each room lives behind its own lock with a commit counter, so room
/// transactions conflict exactly when another commit landed on the same
/// room in between.
#[derive(Clone, Default)]
pub struct MemoryAccessStore {
    rooms: Arc<RwLock<HashMap<RoomId, Arc<RwLock<RoomState>>>>>,
}

#[derive(Clone, Default)]
struct RoomState {
    version: u64,
    tracker: Option<Revision>,
    grants: HashMap<UserId, AccessGrant>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, room: &RoomId) -> Arc<RwLock<RoomState>> {
        if let Some(slot) = self.rooms.read().get(room) {
            return slot.clone();
        }
        self.rooms
            .write()
            .entry(room.clone())
            .or_default()
            .clone()
    }

    fn existing_slot(&self, room: &RoomId) -> Option<Arc<RwLock<RoomState>>> {
        self.rooms.read().get(room).cloned()
    }
}

fn make_grant(
    room: &RoomId,
    user: &UserId,
    role: Role,
    revision: &Revision,
    now_ms: i64,
) -> AccessGrant {
    AccessGrant {
        room_id: room.clone(),
        user_id: user.clone(),
        role,
        revision: revision.clone(),
        created_at_ms: now_ms,
        last_access_at_ms: now_ms,
    }
}

fn upsert_in(
    state: &mut RoomState,
    room: &RoomId,
    user: &UserId,
    role: Role,
    revision: &Revision,
    now_ms: i64,
) -> AccessGrant {
    match state.grants.get_mut(user) {
        Some(existing) => {
            existing.role = role;
            existing.revision = revision.clone();
            existing.clone()
        }
        None => {
            let grant = make_grant(room, user, role, revision, now_ms);
            state.grants.insert(user.clone(), grant.clone());
            grant
        }
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn get_and_touch(
        &self,
        room: &RoomId,
        user: &UserId,
        now_ms: i64,
    ) -> Result<Option<AccessGrant>, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(None);
        };
        let mut state = slot.write();
        Ok(state.grants.get_mut(user).map(|grant| {
            grant.last_access_at_ms = now_ms;
            grant.clone()
        }))
    }

    async fn list_by_room(
        &self,
        room: &RoomId,
        role: Option<Role>,
    ) -> Result<Vec<AccessGrant>, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(Vec::new());
        };
        let state = slot.read();
        let mut out: Vec<AccessGrant> = state
            .grants
            .values()
            .filter(|g| role.map_or(true, |r| g.role == r))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.user_id.0.cmp(&b.user_id.0));
        Ok(out)
    }

    async fn list_by_user(&self, user: &UserId) -> Result<Vec<AccessGrant>, AccessError> {
        let slots: Vec<Arc<RwLock<RoomState>>> = self.rooms.read().values().cloned().collect();
        let mut out = Vec::new();
        for slot in slots {
            if let Some(grant) = slot.read().grants.get(user) {
                out.push(grant.clone());
            }
        }
        out.sort_by(|a, b| a.room_id.0.cmp(&b.room_id.0));
        Ok(out)
    }

    async fn count_by_room_and_role(
        &self,
        room: &RoomId,
        role: Role,
    ) -> Result<usize, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(0);
        };
        let count = slot.read().grants.values().filter(|g| g.role == role).count();
        Ok(count)
    }

    async fn tracker(&self, room: &RoomId) -> Result<Option<RoomSyncTracker>, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(None);
        };
        let tracker = slot.read().tracker.clone();
        Ok(tracker.map(|revision| RoomSyncTracker {
            room_id: room.clone(),
            revision,
        }))
    }

    async fn upsert(
        &self,
        room: &RoomId,
        user: &UserId,
        role: Role,
        revision: &Revision,
        now_ms: i64,
    ) -> Result<AccessGrant, AccessError> {
        let slot = self.slot(room);
        let mut state = slot.write();
        let grant = upsert_in(&mut state, room, user, role, revision, now_ms);
        state.version += 1;
        Ok(grant)
    }

    async fn delete(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> Result<Option<AccessGrant>, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(None);
        };
        let mut state = slot.write();
        let removed = state.grants.remove(user);
        if removed.is_some() {
            state.version += 1;
        }
        Ok(removed)
    }

    async fn delete_all_for_room(&self, room: &RoomId) -> Result<Vec<AccessGrant>, AccessError> {
        let Some(slot) = self.existing_slot(room) else {
            return Ok(Vec::new());
        };
        let mut state = slot.write();
        let mut removed: Vec<AccessGrant> = state.grants.drain().map(|(_, g)| g).collect();
        removed.sort_by(|a, b| a.user_id.0.cmp(&b.user_id.0));
        if !removed.is_empty() {
            state.version += 1;
        }
        Ok(removed)
    }

    async fn room_tx(&self, room: &RoomId) -> Result<Box<dyn RoomTx>, AccessError> {
        let slot = self.slot(room);
        let (base_version, working) = {
            let state = slot.read();
            (state.version, state.clone())
        };
        Ok(Box::new(MemoryRoomTx {
            room: room.clone(),
            slot,
            base_version,
            working,
        }))
    }
}

struct MemoryRoomTx {
    room: RoomId,
    slot: Arc<RwLock<RoomState>>,
    base_version: u64,
    working: RoomState,
}

#[async_trait]
impl RoomTx for MemoryRoomTx {
    fn tracker(&self) -> RoomSyncTracker {
        match &self.working.tracker {
            Some(revision) => RoomSyncTracker {
                room_id: self.room.clone(),
                revision: revision.clone(),
            },
            None => RoomSyncTracker::never_synced(self.room.clone()),
        }
    }

    fn get(&self, user: &UserId) -> Option<AccessGrant> {
        self.working.grants.get(user).cloned()
    }

    fn grants(&self) -> Vec<AccessGrant> {
        let mut out: Vec<AccessGrant> = self.working.grants.values().cloned().collect();
        out.sort_by(|a, b| a.user_id.0.cmp(&b.user_id.0));
        out
    }

    fn upsert(
        &mut self,
        user: &UserId,
        role: Role,
        revision: &Revision,
        now_ms: i64,
    ) -> AccessGrant {
        let room = self.room.clone();
        upsert_in(&mut self.working, &room, user, role, revision, now_ms)
    }

    fn delete(&mut self, user: &UserId) -> Option<AccessGrant> {
        self.working.grants.remove(user)
    }

    fn delete_below(&mut self, seq: u64) -> usize {
        let before = self.working.grants.len();
        self.working.grants.retain(|_, g| g.revision.seq() >= seq);
        before - self.working.grants.len()
    }

    fn set_tracker(&mut self, revision: Revision) {
        self.working.tracker = Some(revision);
    }

    async fn commit(self: Box<Self>) -> Result<(), AccessError> {
        let mut state = self.slot.write();
        if state.version != self.base_version {
            return Err(AccessError::conflict(&format!(
                "room {} changed concurrently (seen v{}, now v{})",
                self.room.0, self.base_version, state.version
            )));
        }
        let mut committed = self.working;
        committed.version = state.version + 1;
        *state = committed;
        Ok(())
    }
}

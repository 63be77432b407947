use crate::id::{RoomId, UserId};
use crate::revision::Revision;
use crate::role::Role;
use serde::{Deserialize, Serialize};

/// One room-scoped role assignment for a user. At most one grant exists per
/// `(room_id, user_id)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: Role,
    pub revision: Revision,
    pub created_at_ms: i64,
    /// Updated on every successful lookup; used for inactivity reporting.
    pub last_access_at_ms: i64,
}

/// Last revision known to be fully reconciled for a room. Reset to `"0"`
/// marks a sync in progress; otherwise the revision never regresses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSyncTracker {
    pub room_id: RoomId,
    pub revision: Revision,
}

impl RoomSyncTracker {
    pub fn never_synced(room_id: RoomId) -> Self {
        Self {
            room_id,
            revision: Revision::zero(),
        }
    }
}

/// One membership entry inside an authoritative room snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub user_id: UserId,
    pub role: Role,
}

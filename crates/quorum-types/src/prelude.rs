pub use crate::{
    grant::{AccessGrant, RoomSyncTracker, SyncEntry},
    id::{RoomId, UserId},
    revision::Revision,
    role::{ParseRoleError, Role},
    subject::{Subject, SubjectKind},
};

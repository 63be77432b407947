use crate::errors::AccessError;
use crate::now_ms;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::AccessStore;
use async_trait::async_trait;
use quorum_types::prelude::*;
use tracing::{debug, info};

/// Transport seam for asking the authoritative room service to publish a
/// fresh membership snapshot. Implementations deliver a `SyncRequested`
/// event; the memory variant in [`crate::events`] just records it.
#[async_trait]
pub trait SyncPublisher: Send + Sync {
    async fn sync_requested(&self, room: &RoomId) -> Result<(), AccessError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot advanced the tracker and replaced older grants.
    Applied,
    /// Same revision as the tracker; redelivery, nothing to do.
    Duplicate,
    /// Older than the tracker; dropped without touching any grant.
    StaleDropped,
}

/// Drives the per-room revision state machine: stale detection on read,
/// tracker reset while a sync is in flight, and ordered application of
/// authoritative snapshots.
pub struct Reconciler<S, P> {
    store: S,
    publisher: P,
    retry: RetryPolicy,
}

impl<S: AccessStore, P: SyncPublisher> Reconciler<S, P> {
    pub fn new(store: S, publisher: P, retry: RetryPolicy) -> Self {
        Self {
            store,
            publisher,
            retry,
        }
    }

    /// Checks whether the room is reconciled up to `min_revision`. If not,
    /// the tracker is reset to `"0"` and a snapshot is requested from the
    /// authoritative service. Returns the tracker state after the call;
    /// callers seeing revision `"0"` know a sync is in flight.
    pub async fn request_sync(
        &self,
        room: &RoomId,
        min_revision: &Revision,
    ) -> Result<RoomSyncTracker, AccessError> {
        let (tracker, stale) =
            with_retry(&self.retry, || self.request_sync_once(room, min_revision)).await?;
        if stale {
            self.publisher.sync_requested(room).await?;
            info!(room = %room.0, min_revision = %min_revision, "room access stale, snapshot requested");
        }
        Ok(tracker)
    }

    async fn request_sync_once(
        &self,
        room: &RoomId,
        min_revision: &Revision,
    ) -> Result<(RoomSyncTracker, bool), AccessError> {
        let mut tx = self.store.room_tx(room).await?;
        let tracker = tx.tracker();
        if tracker.revision.is_at_least(min_revision) {
            // Already fresh enough (or a sync is in flight after a reset
            // to "0" and the caller only asked for "0"). Drop the tx.
            return Ok((tracker, false));
        }
        tx.set_tracker(Revision::zero());
        tx.commit().await?;
        Ok((RoomSyncTracker::never_synced(room.clone()), true))
    }

    /// Applies an authoritative membership snapshot. Ordering is decided by
    /// the numeric sequence of the revision against the room tracker; the
    /// payload is trusted to be the complete membership at that revision.
    pub async fn apply_sync(
        &self,
        room: &RoomId,
        revision: &Revision,
        entries: &[SyncEntry],
    ) -> Result<SyncOutcome, AccessError> {
        with_retry(&self.retry, || self.apply_sync_once(room, revision, entries)).await
    }

    async fn apply_sync_once(
        &self,
        room: &RoomId,
        revision: &Revision,
        entries: &[SyncEntry],
    ) -> Result<SyncOutcome, AccessError> {
        let mut tx = self.store.room_tx(room).await?;
        let current = tx.tracker().revision;
        if revision.seq() < current.seq() {
            debug!(room = %room.0, incoming = %revision, tracker = %current, "stale snapshot dropped");
            return Ok(SyncOutcome::StaleDropped);
        }
        if revision.seq() == current.seq() {
            debug!(room = %room.0, revision = %revision, "duplicate snapshot, no-op");
            return Ok(SyncOutcome::Duplicate);
        }

        let removed = tx.delete_below(revision.seq());
        let now = now_ms();
        for entry in entries {
            // Grants already written at this or a later revision win over
            // the snapshot entry.
            if let Some(existing) = tx.get(&entry.user_id) {
                if existing.revision.seq() >= revision.seq() {
                    continue;
                }
            }
            tx.upsert(&entry.user_id, entry.role, revision, now);
        }
        tx.set_tracker(revision.clone());
        tx.commit().await?;
        info!(
            room = %room.0,
            revision = %revision,
            entries = entries.len(),
            removed,
            "room access snapshot applied"
        );
        Ok(SyncOutcome::Applied)
    }
}

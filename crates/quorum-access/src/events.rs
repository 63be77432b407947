use crate::errors::AccessError;
use crate::reconcile::{SyncOutcome, SyncPublisher};
use crate::service::AccessService;
use crate::store::AccessStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use quorum_types::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CHANNEL_SYNC_ROOM_ACCESS: &str = "room.access.sync";
pub const CHANNEL_SYNC_REQUESTED: &str = "room.access.sync.requested";

/// Authoritative membership snapshot for one room at one revision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRoomAccess {
    pub room_id: RoomId,
    pub revision: Revision,
    pub entries: Vec<SyncEntry>,
}

/// Asks the authoritative room service to publish a fresh snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRequested {
    pub room_id: RoomId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: MsgId,
    pub channel: String,
    pub payload: serde_json::Value,
    /// Incremented on every lease.
    pub attempts: u32,
    pub visible_at_ms: i64,
    pub last_error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: MsgId,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub last_error: String,
    pub stored_at_ms: i64,
}

/// Durable inbox for snapshot deliveries. The broker may deliver out of
/// order and more than once; the reconciler makes redelivery harmless, the
/// inbox only has to keep messages until they are acked or parked.
#[async_trait]
pub trait SyncInbox: Send + Sync {
    async fn enqueue(
        &self,
        channel: &str,
        payload: serde_json::Value,
        now_ms: i64,
    ) -> Result<MsgId, AccessError>;

    /// Leases the next visible message, incrementing its attempt counter.
    /// Returns `None` when nothing is visible at `now_ms`.
    async fn lease(&self, now_ms: i64) -> Result<Option<InboxMessage>, AccessError>;

    async fn ack(&self, id: &MsgId) -> Result<(), AccessError>;

    /// Returns a leased message to the queue, visible again at
    /// `next_visible_at_ms`.
    async fn nack(
        &self,
        id: &MsgId,
        next_visible_at_ms: i64,
        error: &str,
    ) -> Result<(), AccessError>;

    /// Parks a leased message for operator inspection.
    async fn dead_letter(&self, id: &MsgId, error: &str, now_ms: i64) -> Result<(), AccessError>;

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, AccessError>;
}

#[derive(Default)]
struct InboxState {
    queue: Vec<InboxMessage>,
    leased: HashMap<MsgId, InboxMessage>,
    dead: Vec<DeadLetter>,
    next_id: u64,
}

/// In-memory [`SyncInbox`] for tests and single-node deployments.
#[derive(Clone, Default)]
pub struct MemorySyncInbox {
    state: Arc<Mutex<InboxState>>,
}

impl MemorySyncInbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncInbox for MemorySyncInbox {
    async fn enqueue(
        &self,
        channel: &str,
        payload: serde_json::Value,
        now_ms: i64,
    ) -> Result<MsgId, AccessError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = MsgId(format!("m-{}", state.next_id));
        state.queue.push(InboxMessage {
            id: id.clone(),
            channel: channel.to_string(),
            payload,
            attempts: 0,
            visible_at_ms: now_ms,
            last_error: None,
        });
        Ok(id)
    }

    async fn lease(&self, now_ms: i64) -> Result<Option<InboxMessage>, AccessError> {
        let mut state = self.state.lock();
        let Some(pos) = state.queue.iter().position(|m| m.visible_at_ms <= now_ms) else {
            return Ok(None);
        };
        let mut msg = state.queue.remove(pos);
        msg.attempts += 1;
        state.leased.insert(msg.id.clone(), msg.clone());
        Ok(Some(msg))
    }

    async fn ack(&self, id: &MsgId) -> Result<(), AccessError> {
        self.state.lock().leased.remove(id);
        Ok(())
    }

    async fn nack(
        &self,
        id: &MsgId,
        next_visible_at_ms: i64,
        error: &str,
    ) -> Result<(), AccessError> {
        let mut state = self.state.lock();
        if let Some(mut msg) = state.leased.remove(id) {
            msg.visible_at_ms = next_visible_at_ms;
            msg.last_error = Some(error.to_string());
            state.queue.push(msg);
        }
        Ok(())
    }

    async fn dead_letter(&self, id: &MsgId, error: &str, now_ms: i64) -> Result<(), AccessError> {
        let mut state = self.state.lock();
        if let Some(msg) = state.leased.remove(id) {
            state.dead.push(DeadLetter {
                id: msg.id,
                payload: msg.payload,
                attempts: msg.attempts,
                last_error: error.to_string(),
                stored_at_ms: now_ms,
            });
        }
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, AccessError> {
        Ok(self.state.lock().dead.clone())
    }
}

/// Records [`SyncRequested`] envelopes instead of publishing them; the
/// transport used by tests and by deployments that colocate the room
/// service.
#[derive(Clone, Default)]
pub struct MemorySyncPublisher {
    published: Arc<Mutex<Vec<SyncRequested>>>,
}

impl MemorySyncPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<RoomId> {
        self.published.lock().iter().map(|e| e.room_id.clone()).collect()
    }

    pub fn published(&self) -> Vec<SyncRequested> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl SyncPublisher for MemorySyncPublisher {
    async fn sync_requested(&self, room: &RoomId) -> Result<(), AccessError> {
        debug!(channel = CHANNEL_SYNC_REQUESTED, room = %room.0, "sync requested");
        self.published.lock().push(SyncRequested {
            room_id: room.clone(),
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 250,
        }
    }
}

/// Pulls snapshot deliveries off the inbox and feeds them to the
/// reconciler. Failed messages are redelivered with a fixed delay until
/// the attempt budget is spent, then parked as dead letters.
pub struct SyncConsumer<S, P, Q> {
    service: Arc<AccessService<S, P>>,
    inbox: Q,
    config: QueueConfig,
}

impl<S, P, Q> SyncConsumer<S, P, Q>
where
    S: AccessStore + Clone,
    P: SyncPublisher,
    Q: SyncInbox,
{
    pub fn new(service: Arc<AccessService<S, P>>, inbox: Q, config: QueueConfig) -> Self {
        Self {
            service,
            inbox,
            config,
        }
    }

    /// Drains every message visible at `now_ms` once and returns how many
    /// were applied. Callers loop or schedule ticks; redelivered messages
    /// become visible again in the future, so a single tick terminates.
    pub async fn tick(&self, now_ms: i64) -> Result<u32, AccessError> {
        let mut handled = 0u32;
        while let Some(msg) = self.inbox.lease(now_ms).await? {
            if msg.channel != CHANNEL_SYNC_ROOM_ACCESS {
                debug!(msg_id = %msg.id.0, channel = %msg.channel, "skipping foreign channel");
                self.inbox.ack(&msg.id).await?;
                continue;
            }
            match self.handle(&msg).await {
                Ok(_) => {
                    self.inbox.ack(&msg.id).await?;
                    handled += 1;
                }
                Err(err) => {
                    let reason = err
                        .0
                        .message_dev
                        .clone()
                        .unwrap_or_else(|| err.0.message_user.clone());
                    if msg.attempts >= self.config.max_attempts {
                        warn!(
                            msg_id = %msg.id.0,
                            attempts = msg.attempts,
                            error = %reason,
                            "sync delivery dead-lettered"
                        );
                        self.inbox.dead_letter(&msg.id, &reason, now_ms).await?;
                    } else {
                        self.inbox
                            .nack(
                                &msg.id,
                                now_ms + self.config.retry_delay_ms as i64,
                                &reason,
                            )
                            .await?;
                    }
                }
            }
        }
        Ok(handled)
    }

    async fn handle(&self, msg: &InboxMessage) -> Result<SyncOutcome, AccessError> {
        let event: SyncRoomAccess = serde_json::from_value(msg.payload.clone())
            .map_err(|e| AccessError::bad_request(&format!("malformed sync payload: {e}")))?;
        self.service
            .reconciler()
            .apply_sync(&event.room_id, &event.revision, &event.entries)
            .await
    }
}

pub use crate::errors::AccessError;
pub use crate::events::{
    DeadLetter, InboxMessage, MemorySyncInbox, MemorySyncPublisher, MsgId, QueueConfig,
    SyncConsumer, SyncInbox, SyncRequested, SyncRoomAccess, CHANNEL_SYNC_REQUESTED,
    CHANNEL_SYNC_ROOM_ACCESS,
};
pub use crate::http::{router, ApiError};
pub use crate::reconcile::{Reconciler, SyncOutcome, SyncPublisher};
pub use crate::retry::{with_retry, RetryPolicy};
pub use crate::service::{AccessService, GrantRequest};
pub use crate::store::memory::MemoryAccessStore;
pub use crate::store::{AccessStore, RoomTx};

use std::collections::HashMap;

use crate::DomainResult;
use crate::chat::{SenderType, StoredMessage};
use crate::ports::BoxFuture;

pub trait ChatRepository: Send + Sync {
    fn append(&self, message: &StoredMessage) -> BoxFuture<'_, DomainResult<StoredMessage>>;

    /// Most recent `limit` messages of the room, ascending by creation time.
    fn list_by_room(
        &self,
        room_id: &str,
        limit: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>>;

    /// Flips every unread message of `sender_type` in the room to read.
    /// Must be idempotent.
    fn mark_read(
        &self,
        room_id: &str,
        sender_type: SenderType,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>>;

    /// Unread message counts of `sender_type`, grouped by room.
    fn unread_counts(
        &self,
        sender_type: SenderType,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, u64>>>;

    /// Up to `max_scanned` most recent messages system-wide, descending by
    /// creation time.
    fn list_recent(&self, max_scanned: usize)
    -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>>;
}

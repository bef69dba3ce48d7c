use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::ports::chat::ChatRepository;
use crate::util::{now_ms, uuid_v7_without_dashes};

/// Messages pushed to a connection when it joins a room.
pub const HISTORY_LIMIT: usize = 100;
/// System-wide recency window scanned when building the room directory.
pub const DIRECTORY_SCAN_LIMIT: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    User,
    Admin,
}

impl SenderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(SenderType::User),
            "ADMIN" => Some(SenderType::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "USER",
            SenderType::Admin => "ADMIN",
        }
    }
}

/// One chat message row. Immutable after creation except for the
/// `is_read`/`read_at` transition, which only ever goes false→true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub message: String,
    pub is_read: bool,
    #[serde(rename = "readAt")]
    pub read_at_ms: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct AppendMessage {
    pub room_id: String,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub message: String,
}

/// Staff-facing summary of one conversation. Rooms are derived from the
/// message rows; nothing is persisted per room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub user_name: String,
    pub last_message: String,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: i64,
    pub unread_count: u64,
}

#[derive(Clone)]
pub struct ChatService {
    repository: Arc<dyn ChatRepository>,
}

impl ChatService {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    /// Appends one immutable row with a server-assigned id and timestamp.
    /// Empty bodies are not rejected here; that policy belongs to the
    /// calling handler.
    pub async fn append_message(&self, input: AppendMessage) -> DomainResult<StoredMessage> {
        let now = now_ms();
        let message = StoredMessage {
            id: uuid_v7_without_dashes(),
            room_id: input.room_id,
            sender_type: input.sender_type,
            sender_name: input.sender_name,
            message: input.message,
            is_read: false,
            read_at_ms: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.repository.append(&message).await
    }

    /// The most recent `limit` messages of a room, ascending by creation
    /// time. Used to hydrate a freshly joined connection.
    pub async fn list_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> DomainResult<Vec<StoredMessage>> {
        self.repository.list_by_room(room_id, limit).await
    }

    /// Marks every unread message of `sender_type` in the room as read,
    /// stamping the current time. Idempotent.
    pub async fn mark_read(&self, room_id: &str, sender_type: SenderType) -> DomainResult<()> {
        self.repository
            .mark_read(room_id, sender_type, now_ms())
            .await
    }

    pub async fn unread_counts_by_room(
        &self,
        sender_type: SenderType,
    ) -> DomainResult<HashMap<String, u64>> {
        self.repository.unread_counts(sender_type).await
    }

    /// Latest message per room among the `max_scanned` most recent messages
    /// system-wide. A room whose latest activity is older than the scan
    /// window is absent from the result; the directory builder compensates
    /// for unread rooms but not for read ones.
    pub async fn recent_messages_per_room(
        &self,
        max_scanned: usize,
    ) -> DomainResult<HashMap<String, StoredMessage>> {
        let scanned = self.repository.list_recent(max_scanned).await?;
        let mut latest: HashMap<String, StoredMessage> = HashMap::new();
        for message in scanned {
            latest.entry(message.room_id.clone()).or_insert(message);
        }
        Ok(latest)
    }

    /// Builds the staff directory: one entry per room seen in the recency
    /// scan, overlaid with exact unread counts. Rooms that only surface via
    /// the unread aggregate are synthesized so no unread conversation is
    /// hidden. Sorted by timestamp descending.
    pub async fn room_directory(&self) -> DomainResult<Vec<RoomSummary>> {
        let recent = self.recent_messages_per_room(DIRECTORY_SCAN_LIMIT).await?;
        let mut rooms: HashMap<String, RoomSummary> = HashMap::with_capacity(recent.len());
        for (room_id, message) in recent {
            let user_name = match message.sender_type {
                SenderType::User => message.sender_name.clone(),
                SenderType::Admin => room_label(&room_id),
            };
            rooms.insert(
                room_id.clone(),
                RoomSummary {
                    id: room_id,
                    user_name,
                    last_message: message.message,
                    updated_at_ms: message.created_at_ms,
                    unread_count: 0,
                },
            );
        }

        let unread = self.unread_counts_by_room(SenderType::User).await?;
        for (room_id, count) in unread {
            if let Some(entry) = rooms.get_mut(&room_id) {
                entry.unread_count = count;
            } else {
                rooms.insert(
                    room_id.clone(),
                    RoomSummary {
                        user_name: room_label(&room_id),
                        id: room_id,
                        last_message: String::new(),
                        updated_at_ms: now_ms(),
                        unread_count: count,
                    },
                );
            }
        }

        let mut rooms: Vec<_> = rooms.into_values().collect();
        rooms.sort_by(|a, b| {
            b.updated_at_ms
                .cmp(&a.updated_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rooms)
    }
}

fn room_label(room_id: &str) -> String {
    format!("Room {room_id}")
}

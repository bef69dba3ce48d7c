//! Realtime fan-out for the support chat. One registry per process maps
//! connection ids to their room subscriptions and outbound channels; it is
//! mutated only by join/disconnect and read by the broadcast routine.
//! Broadcasts never leave the process.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use backoffice_domain::chat::{SenderType, StoredMessage};

/// Frames a client may send. Anything that does not parse into one of these
/// is dropped at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    SendMessage {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "senderType")]
        sender_type: SenderType,
        #[serde(rename = "senderName")]
        sender_name: String,
        message: String,
    },
    MarkRead {
        #[serde(rename = "roomId")]
        room_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PreviousMessages {
        messages: Vec<StoredMessage>,
    },
    NewMessage {
        message: StoredMessage,
    },
    MessagesRead {
        #[serde(rename = "roomId")]
        room_id: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    rooms: HashSet<String>,
    sender: UnboundedSender<ServerEvent>,
}

/// The per-process connection registry. Created at startup, cleared as
/// connections drop; holds no authoritative chat state.
#[derive(Clone)]
pub struct ChatRealtime {
    connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl ChatRealtime {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a connection with no room; returns its id and the outbound
    /// event stream the socket task should pump to the client.
    pub async fn register(&self) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections.write().await.insert(
            id,
            Connection {
                rooms: HashSet::new(),
                sender,
            },
        );
        (id, receiver)
    }

    /// Subscribes the connection to a room. Re-joining another room adds a
    /// subscription; the transport does not limit a connection to one room.
    pub async fn join(&self, connection_id: ConnectionId, room_id: &str) {
        if let Some(connection) = self.connections.write().await.get_mut(&connection_id) {
            connection.rooms.insert(room_id.to_string());
        }
    }

    /// Pushes an event to a single connection (history hydration).
    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&connection_id) {
            Some(connection) => connection.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Delivers the event to every connection subscribed to the room,
    /// including the sender's own. Returns the delivery count.
    pub async fn broadcast(&self, room_id: &str, event: ServerEvent) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for connection in connections.values() {
            if connection.rooms.contains(room_id)
                && connection.sender.send(event.clone()).is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Drops the connection and all of its subscriptions.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
    }

    pub async fn is_subscribed(&self, connection_id: ConnectionId, room_id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .map(|connection| connection.rooms.contains(room_id))
            .unwrap_or(false)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ChatRealtime {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::Message;
use taskboard_shared::events::{EventPublisher, LiveEvent, PublishError, Room, SerializationError};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct Connection {
    /// User the socket authenticated as.
    pub user_id: Uuid,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Rooms this connection currently receives.
    pub rooms: HashSet<Room>,
}

/// Tracks live WebSocket connections and their room memberships.
///
/// Implements [`EventPublisher`] for single-process deployments: a published
/// event is serialized once and pushed to every connection in the room.
/// Wrap in `Arc` and share across the application.
pub struct Hub {
    connections: RwLock<HashMap<String, Connection>>,
    closed: AtomicBool,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, user_id: Uuid) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            user_id,
            sender: tx,
            rooms: HashSet::new(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and all of its room memberships.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Adds the connection to a room; false if the connection is unknown.
    pub async fn join(&self, conn_id: &str, room: Room) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.rooms.insert(room);
                true
            }
            None => false,
        }
    }

    /// Removes the connection from a room; false if it was not a member.
    pub async fn leave(&self, conn_id: &str, room: Room) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .map(|conn| conn.rooms.remove(&room))
            .unwrap_or(false)
    }

    /// Rooms a connection belongs to, in no particular order.
    pub async fn rooms_of(&self, conn_id: &str) -> Vec<Room> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|conn| conn.rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Send a message to one connection.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|conn| conn.sender.send(message).is_ok())
            .unwrap_or(false)
    }

    /// Send a message to every connection in a room.
    ///
    /// Connections whose send channels are closed are skipped; they are
    /// removed when their receive loop ends. Returns the number of
    /// connections the message was handed to.
    pub async fn send_to_room(&self, room: Room, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.rooms.contains(&room)) {
            if conn.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Removes the given users' connections from a room and sends them
    /// `message`. Returns the number of connections evicted.
    pub async fn evict(&self, room: Room, user_ids: &[Uuid], message: Message) -> usize {
        let mut conns = self.connections.write().await;
        let mut count = 0;
        for conn in conns.values_mut() {
            if user_ids.contains(&conn.user_id) && conn.rooms.remove(&room) {
                let _ = conn.sender.send(message.clone());
                count += 1;
            }
        }
        count
    }

    /// Serializes an event envelope and sends it to a room.
    ///
    /// `projectAccessRevoked` goes only to the revoked users, who leave the room.
    pub async fn deliver(&self, room: Room, event: &LiveEvent) -> Result<usize, SerializationError> {
        let text = serde_json::to_string(event)?;
        let count = match event {
            LiveEvent::ProjectAccessRevoked { user_ids, .. } => {
                self.evict(room, user_ids, Message::Text(text)).await
            }
            _ => self.send_to_room(room, Message::Text(text)).await,
        };
        tracing::trace!(room = %room, event = event.name(), count, "Delivered live event");
        Ok(count)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether [`Hub::shutdown_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Later publications fail with [`PublishError::Closed`].
    pub async fn shutdown_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Vec::new()));
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for Hub {
    async fn publish(&self, room: Room, event: LiveEvent) -> Result<(), PublishError> {
        if self.is_closed() {
            return Err(PublishError::Closed);
        }

        self.deliver(room, &event).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text,
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_room_delivery_reaches_members_only() {
        let hub = Hub::new();
        let project = Room::Project(Uuid::new_v4());
        let mut in_room = hub.add("a".to_string(), Uuid::new_v4()).await;
        let mut elsewhere = hub.add("b".to_string(), Uuid::new_v4()).await;
        assert!(hub.join("a", project).await);

        let task_id = Uuid::new_v4();
        let sent = hub
            .deliver(project, &LiveEvent::TaskDeleted { task_id })
            .await
            .unwrap();
        assert_eq!(sent, 1);

        let frame: serde_json::Value =
            serde_json::from_str(&text_of(in_room.try_recv().unwrap())).unwrap();
        assert_eq!(frame["event"], "taskDeleted");
        assert_eq!(frame["data"]["taskId"], task_id.to_string());
        assert!(elsewhere.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_leave_and_remove() {
        let hub = Hub::new();
        let user_id = Uuid::new_v4();
        let room = Room::User(user_id);
        let _rx = hub.add("a".to_string(), user_id).await;

        assert!(!hub.join("missing", room).await);
        assert!(hub.join("a", room).await);
        assert_eq!(hub.rooms_of("a").await, vec![room]);

        assert!(hub.leave("a", room).await);
        assert!(!hub.leave("a", room).await);
        assert!(hub.rooms_of("a").await.is_empty());

        hub.remove("a").await;
        assert_eq!(hub.connection_count().await, 0);
        assert!(!hub.send_to("a", Message::Text("hi".into())).await);
    }

    #[tokio::test]
    async fn test_revoked_users_leave_project_room() {
        let hub = Hub::new();
        let project_id = Uuid::new_v4();
        let room = Room::Project(project_id);
        let kept = Uuid::new_v4();
        let revoked = Uuid::new_v4();

        let mut kept_rx = hub.add("kept".to_string(), kept).await;
        let mut revoked_rx = hub.add("revoked".to_string(), revoked).await;
        let mut revoked_tab = hub.add("revoked-2".to_string(), revoked).await;
        hub.join("kept", room).await;
        hub.join("revoked", room).await;
        hub.join("revoked", Room::User(revoked)).await;

        let event = LiveEvent::ProjectAccessRevoked {
            project_id,
            user_ids: vec![revoked],
        };
        assert_eq!(hub.deliver(room, &event).await.unwrap(), 1);

        let frame: serde_json::Value =
            serde_json::from_str(&text_of(revoked_rx.try_recv().unwrap())).unwrap();
        assert_eq!(frame["event"], "projectAccessRevoked");
        assert!(kept_rx.try_recv().is_err());
        // Not in the room, so untouched
        assert!(revoked_tab.try_recv().is_err());
        assert_eq!(hub.rooms_of("revoked").await, vec![Room::User(revoked)]);

        let task_id = Uuid::new_v4();
        hub.deliver(room, &LiveEvent::TaskDeleted { task_id }).await.unwrap();
        assert!(kept_rx.try_recv().is_ok());
        assert!(revoked_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_skipped() {
        let hub = Hub::new();
        let room = Room::Project(Uuid::new_v4());
        let rx = hub.add("gone".to_string(), Uuid::new_v4()).await;
        hub.join("gone", room).await;
        drop(rx);

        assert_eq!(hub.send_to_room(room, Message::Text("x".into())).await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections_and_publisher() {
        let hub = Hub::new();
        let mut rx = hub.add("a".to_string(), Uuid::new_v4()).await;

        hub.shutdown_all().await;

        assert!(matches!(rx.try_recv(), Ok(Message::Close(None))));
        assert_eq!(hub.connection_count().await, 0);
        assert!(hub.is_closed());

        let result = hub
            .publish(
                Room::Project(Uuid::new_v4()),
                LiveEvent::TaskDeleted { task_id: Uuid::new_v4() },
            )
            .await;
        assert!(matches!(result, Err(PublishError::Closed)));
    }
}

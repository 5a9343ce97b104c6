/// Live update events
///
/// Entity changes are pushed to connected clients through rooms:
///
/// - `project:<id>`: everyone viewing a project (`taskCreated`, `taskUpdated`, `taskDeleted`)
/// - `user:<id>`: one user's sockets (`notification`)
///
/// `projectAccessRevoked` is also addressed to a project room, but it is a
/// control message: delivery removes the listed users' sockets from the room
/// and only those sockets receive the frame.
///
/// Publication is fire-and-forget. There is no acknowledgment and no replay;
/// a client that was offline re-reads state over HTTP.
///
/// # Wire format
///
/// Every message is an envelope with the event name and its payload:
///
/// ```text
/// { "event": "taskDeleted", "data": { "taskId": "..." } }
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::events::{EventPublisher, LiveEvent, Room};
/// use uuid::Uuid;
///
/// # async fn example(publisher: &dyn EventPublisher) {
/// let project_id = Uuid::new_v4();
/// let task_id = Uuid::new_v4();
///
/// if let Err(e) = publisher
///     .publish(Room::Project(project_id), LiveEvent::TaskDeleted { task_id })
///     .await
/// {
///     tracing::warn!(error = %e, "Broadcast failed");
/// }
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::models::task::TaskView;

pub mod serialization;

pub use serialization::{
    decode_relay, encode_relay, RelayMessage, SerializationError, RELAY_CHANNEL,
};

/// Addressable broadcast group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Room {
    Project(Uuid),
    User(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Project(id) => write!(f, "project:{}", id),
            Room::User(id) => write!(f, "user:{}", id),
        }
    }
}

impl FromStr for Room {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid room '{}'", s))?;
        let id = Uuid::parse_str(id).map_err(|_| format!("Invalid room id in '{}'", s))?;

        match kind {
            "project" => Ok(Room::Project(id)),
            "user" => Ok(Room::User(id)),
            _ => Err(format!("Unknown room kind '{}'", kind)),
        }
    }
}

impl From<Room> for String {
    fn from(room: Room) -> Self {
        room.to_string()
    }
}

impl TryFrom<String> for Room {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Server-to-client event
///
/// Serializes directly to the `{ event, data }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum LiveEvent {
    /// A task was created in the room's project
    TaskCreated(TaskView),

    /// A task changed; carries the fully resolved task
    TaskUpdated(TaskView),

    /// A task was deleted; only its ID is sent
    TaskDeleted {
        #[serde(rename = "taskId")]
        task_id: Uuid,
    },

    /// A notification addressed to the room's user
    Notification(Notification),

    /// The listed users lost access to the room's project
    ProjectAccessRevoked {
        #[serde(rename = "projectId")]
        project_id: Uuid,
        #[serde(rename = "userIds")]
        user_ids: Vec<Uuid>,
    },
}

impl LiveEvent {
    /// Event name as it appears in the envelope
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::TaskCreated(_) => "taskCreated",
            LiveEvent::TaskUpdated(_) => "taskUpdated",
            LiveEvent::TaskDeleted { .. } => "taskDeleted",
            LiveEvent::Notification(_) => "notification",
            LiveEvent::ProjectAccessRevoked { .. } => "projectAccessRevoked",
        }
    }
}

/// Error type for event publication
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The channel has been shut down
    #[error("Live update channel closed")]
    Closed,

    /// The relay transport failed
    #[error("Relay error: {0}")]
    Transport(String),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Sink for live events
///
/// Constructed once at startup and passed to whatever needs to publish.
/// Failures are reported, but callers treat them as best-effort.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, room: Room, event: LiveEvent) -> Result<(), PublishError>;
}

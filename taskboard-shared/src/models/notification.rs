/// Notification model and database operations
///
/// Notifications are written only as a side effect of task mutations and
/// move through a single transition:
///
/// ```text
/// unread ──mark read──> read
/// ```
///
/// Marking an already read notification is a no-op. Notifications are never
/// deleted by request flows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     actor_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     kind VARCHAR(64) NOT NULL,
///     title VARCHAR(512) NOT NULL,
///     body TEXT,
///     link VARCHAR(1024),
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Number of notifications returned by a feed listing
pub const FEED_LIMIT: i64 = 50;

/// Well-known notification type tags
///
/// The stored column is free-form text; these are the tags task mutations
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskUpdated,
    TaskDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "task_assigned",
            NotificationKind::TaskUpdated => "task_updated",
            NotificationKind::TaskDeleted => "task_deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Recipient
    #[serde(rename = "user")]
    pub user_id: Uuid,

    /// Who triggered it
    #[serde(rename = "actor")]
    pub actor_id: Option<Uuid>,

    #[serde(rename = "type")]
    pub kind: String,

    pub title: String,

    pub body: Option<String>,

    /// Front-end path to open, e.g. `/projects/<id>/tasks/<id>`
    pub link: Option<String>,

    pub read: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, actor_id, kind, title, body, link, read, created_at, updated_at";

impl Notification {
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO notifications (id, user_id, actor_id, kind, title, body, link)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(Uuid::new_v4())
            .bind(data.user_id)
            .bind(data.actor_id)
            .bind(data.kind)
            .bind(data.title)
            .bind(data.body)
            .bind(data.link)
            .fetch_one(pool)
            .await
    }

    /// A user's feed, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Sets `read = true` on a notification owned by `user_id`
    ///
    /// Returns `None` when no such notification belongs to the user.
    pub async fn mark_read(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET read = TRUE, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}

/// Notification feed operations
///
/// Notifications are only ever created as task side effects (see
/// [`super::tasks`]). Users can read their own feed and mark entries read.

use uuid::Uuid;

use crate::auth::middleware::AuthContext;
use crate::error::{ServiceError, ServiceResult};
use crate::models::notification::{Notification, FEED_LIMIT};
use crate::store::Store;

/// The actor's most recent notifications, newest first
pub async fn list(store: &dyn Store, actor: &AuthContext) -> ServiceResult<Vec<Notification>> {
    Ok(store.list_notifications(actor.user_id, FEED_LIMIT).await?)
}

/// Marks one of the actor's notifications read
///
/// Idempotent. A notification belonging to someone else is reported as not
/// found.
pub async fn mark_read(
    store: &dyn Store,
    actor: &AuthContext,
    notification_id: Uuid,
) -> ServiceResult<Notification> {
    store
        .mark_notification_read(notification_id, actor.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Notification not found"))
}

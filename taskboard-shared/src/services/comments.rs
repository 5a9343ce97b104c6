/// Comment operations
///
/// Reading follows task visibility, so an assignee outside the project can
/// read the thread on their task. Writing requires membership in the task's
/// project.

use tracing::info;
use uuid::Uuid;

use super::load_users;
use super::tasks::load_task;
use crate::auth::middleware::AuthContext;
use crate::auth::policy;
use crate::error::{ServiceError, ServiceResult};
use crate::models::comment::{CommentView, CreateComment};
use crate::models::user::User;
use crate::store::Store;

/// Comments on a task, oldest first
pub async fn list(store: &dyn Store, actor: &AuthContext, task_id: Uuid) -> ServiceResult<Vec<CommentView>> {
    let (task, project) = load_task(store, task_id).await?;
    if !policy::can_view_task(actor, &task, &project) {
        return Err(ServiceError::forbidden("Forbidden"));
    }

    let comments = store.list_comments(task.id).await?;
    let authors = load_users(store, comments.iter().map(|c| c.author_id)).await?;

    Ok(comments
        .into_iter()
        .map(|comment| {
            let author = authors.get(&comment.author_id).map(User::summary);
            CommentView::new(comment, author)
        })
        .collect())
}

pub async fn create(
    store: &dyn Store,
    actor: &AuthContext,
    task_id: Option<Uuid>,
    text: &str,
) -> ServiceResult<CommentView> {
    let text = text.trim();
    let task_id = match task_id {
        Some(id) if !text.is_empty() => id,
        _ => return Err(ServiceError::validation("taskId and text required")),
    };

    let (task, project) = load_task(store, task_id).await?;
    if !policy::can_view_project(actor, &project) {
        return Err(ServiceError::forbidden("Forbidden"));
    }

    let comment = store
        .create_comment(CreateComment {
            task_id: task.id,
            author_id: actor.user_id,
            text: text.to_string(),
        })
        .await?;

    info!(comment_id = %comment.id, task_id = %task.id, user_id = %actor.user_id, "Comment created");

    let author = store.find_user(actor.user_id).await?.map(|u| u.summary());
    Ok(CommentView::new(comment, author))
}

/// Deletes a comment; allowed for its author, the project owner and admins
pub async fn delete(store: &dyn Store, actor: &AuthContext, comment_id: Uuid) -> ServiceResult<()> {
    let comment = store
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Comment not found"))?;
    let (_, project) = load_task(store, comment.task_id).await?;

    if !policy::can_delete_comment(actor, &comment, &project) {
        return Err(ServiceError::forbidden("Not allowed to delete comment"));
    }

    if !store.delete_comment(comment.id).await? {
        return Err(ServiceError::not_found("Comment not found"));
    }

    info!(comment_id = %comment.id, user_id = %actor.user_id, "Comment deleted");
    Ok(())
}

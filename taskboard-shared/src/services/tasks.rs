/// Task operations
///
/// Every mutation re-loads the task's project and runs the access policy on
/// that snapshot before writing. Side effects follow a successful write:
///
/// | Operation | Notifications | Project broadcast |
/// |---|---|---|
/// | create | `task_assigned` to the assignee, if any | `taskCreated` |
/// | update | `task_assigned` to a new assignee; `task_updated` to the assignee and the owner on a status change | `taskUpdated` |
/// | delete | `task_deleted` to the assignee, if any | `taskDeleted` |
///
/// The two status-change notifications are independent records, even when
/// the assignee owns the project.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{broadcast, notify, projects_for, task_view, task_views};
use crate::auth::middleware::AuthContext;
use crate::auth::policy;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{EventPublisher, LiveEvent, Room};
use crate::models::notification::{CreateNotification, NotificationKind};
use crate::models::project::Project;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskView};
use crate::store::Store;

/// Default page size for task listings
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update
///
/// Outer `None` leaves a field untouched. For nullable fields `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Option<Uuid>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Listing query: filter plus 1-based page
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub page: i64,
    pub limit: i64,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::default(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl TaskQuery {
    /// Row window after clamping `page` to at least 1 and `limit` to
    /// `1..=max_limit`
    pub fn window(&self, max_limit: i64) -> (i64, i64) {
        let limit = self.limit.clamp(1, max_limit.max(1));
        let page = self.page.max(1);
        (limit, (page - 1).saturating_mul(limit))
    }
}

/// Lists one page of tasks, keeping only those the actor may view
///
/// The page window is applied before the visibility filter, so a page may
/// hold fewer than `limit` rows.
pub async fn list(
    store: &dyn Store,
    actor: &AuthContext,
    query: &TaskQuery,
    max_limit: i64,
) -> ServiceResult<Vec<TaskView>> {
    let (limit, offset) = query.window(max_limit);
    let page = store.list_tasks(&query.filter, limit, offset).await?;
    let fetched = page.len();

    let projects = projects_for(store, &page).await?;
    let visible = visible_tasks(actor, page, &projects);

    debug!(
        user_id = %actor.user_id,
        fetched = fetched,
        visible = visible.len(),
        "Listed tasks"
    );

    task_views(store, visible, &projects).await
}

/// Creates a task in a project the actor belongs to
pub async fn create(
    store: &dyn Store,
    events: &dyn EventPublisher,
    actor: &AuthContext,
    input: CreateTaskInput,
) -> ServiceResult<TaskView> {
    let title = input.title.trim().to_string();
    let project_id = match input.project_id {
        Some(id) if !title.is_empty() => id,
        _ => return Err(ServiceError::validation("Title and project required")),
    };

    let project = load_project(store, project_id).await?;
    if !policy::can_create_task_in_project(actor, &project) {
        return Err(ServiceError::forbidden(
            "Not allowed to create tasks in this project",
        ));
    }

    if let Some(assignee_id) = input.assignee_id {
        check_assignee(store, assignee_id, &project).await?;
    }

    let task = store
        .create_task(CreateTask {
            title,
            description: input.description.unwrap_or_default(),
            project_id,
            assignee_id: input.assignee_id,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
        })
        .await?;

    info!(task_id = %task.id, project_id = %project.id, user_id = %actor.user_id, "Task created");

    if let Some(assignee_id) = task.assignee_id {
        notify(
            store,
            events,
            CreateNotification {
                user_id: assignee_id,
                actor_id: Some(actor.user_id),
                kind: NotificationKind::TaskAssigned.as_str().to_string(),
                title: format!("New task assigned: {}", task.title),
                body: Some(format!(
                    "You were assigned a task in project \"{}\"",
                    project.title
                )),
                link: Some(task_link(&task)),
            },
        )
        .await;
    }

    let view = task_view(store, task, &project).await?;
    broadcast(
        events,
        Room::Project(project.id),
        LiveEvent::TaskCreated(view.clone()),
    )
    .await;

    Ok(view)
}

/// Fetches one task if the actor may view it
pub async fn get(store: &dyn Store, actor: &AuthContext, task_id: Uuid) -> ServiceResult<TaskView> {
    let (task, project) = load_task(store, task_id).await?;
    if !policy::can_view_task(actor, &task, &project) {
        return Err(ServiceError::forbidden("Forbidden"));
    }

    task_view(store, task, &project).await
}

/// Applies a partial update
pub async fn update(
    store: &dyn Store,
    events: &dyn EventPublisher,
    actor: &AuthContext,
    task_id: Uuid,
    input: UpdateTaskInput,
) -> ServiceResult<TaskView> {
    let (mut task, project) = load_task(store, task_id).await?;
    if !policy::can_update_task(actor, &task, &project) {
        return Err(ServiceError::forbidden("Not allowed to update task"));
    }

    let old_status = task.status;
    let old_assignee = task.assignee_id;

    if let Some(title) = input.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::validation("Title required"));
        }
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = description;
    }
    if let Some(assignee_id) = input.assignee_id {
        // Re-validate only an actual change; an existing assignee who has
        // since left the project may be kept as is.
        if let Some(id) = assignee_id.filter(|id| Some(*id) != old_assignee) {
            check_assignee(store, id, &project).await?;
        }
        task.assignee_id = assignee_id;
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    if let Some(priority) = input.priority {
        task.priority = priority;
    }
    if let Some(due_date) = input.due_date {
        task.due_date = due_date;
    }

    let task = store
        .save_task(&task)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task not found"))?;

    info!(task_id = %task.id, user_id = %actor.user_id, "Task updated");

    let link = task_link(&task);

    if let Some(new_assignee) = task.assignee_id.filter(|id| Some(*id) != old_assignee) {
        notify(
            store,
            events,
            CreateNotification {
                user_id: new_assignee,
                actor_id: Some(actor.user_id),
                kind: NotificationKind::TaskAssigned.as_str().to_string(),
                title: format!("You were assigned: {}", task.title),
                body: Some(format!("Assigned in project \"{}\"", project.title)),
                link: Some(link.clone()),
            },
        )
        .await;
    }

    if task.status != old_status {
        if let Some(assignee_id) = task.assignee_id {
            notify(
                store,
                events,
                CreateNotification {
                    user_id: assignee_id,
                    actor_id: Some(actor.user_id),
                    kind: NotificationKind::TaskUpdated.as_str().to_string(),
                    title: format!("Task status changed: {}", task.title),
                    body: Some(format!("Status is now: {}", task.status)),
                    link: Some(link.clone()),
                },
            )
            .await;
        }

        notify(
            store,
            events,
            CreateNotification {
                user_id: project.owner_id,
                actor_id: Some(actor.user_id),
                kind: NotificationKind::TaskUpdated.as_str().to_string(),
                title: format!("Task status changed in your project: {}", task.title),
                body: Some(format!("Status: {}", task.status)),
                link: Some(link),
            },
        )
        .await;
    }

    let view = task_view(store, task, &project).await?;
    broadcast(
        events,
        Room::Project(project.id),
        LiveEvent::TaskUpdated(view.clone()),
    )
    .await;

    Ok(view)
}

/// Deletes a task and its comments
///
/// Returns the number of comments removed with it.
pub async fn delete(
    store: &dyn Store,
    events: &dyn EventPublisher,
    actor: &AuthContext,
    task_id: Uuid,
) -> ServiceResult<u64> {
    let (task, project) = load_task(store, task_id).await?;
    if !policy::can_delete_task(actor, &task, &project) {
        return Err(ServiceError::forbidden(
            "Only project owner or admin can delete tasks",
        ));
    }

    let deleted_comments = store
        .delete_task(task.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task not found"))?;

    info!(
        task_id = %task.id,
        project_id = %project.id,
        user_id = %actor.user_id,
        deleted_comments = deleted_comments,
        "Task deleted"
    );

    broadcast(
        events,
        Room::Project(project.id),
        LiveEvent::TaskDeleted { task_id: task.id },
    )
    .await;

    if let Some(assignee_id) = task.assignee_id {
        notify(
            store,
            events,
            CreateNotification {
                user_id: assignee_id,
                actor_id: Some(actor.user_id),
                kind: NotificationKind::TaskDeleted.as_str().to_string(),
                title: format!("Task removed: {}", task.title),
                body: Some(format!("Task removed from project \"{}\"", project.title)),
                link: Some(format!("/projects/{}", project.id)),
            },
        )
        .await;
    }

    Ok(deleted_comments)
}

/// Loads a task together with its project
pub(crate) async fn load_task(store: &dyn Store, task_id: Uuid) -> ServiceResult<(Task, Project)> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task not found"))?;

    // A task never outlives its project; treat a dangling one as absent.
    let project = store
        .find_project(task.project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task not found"))?;

    Ok((task, project))
}

async fn load_project(store: &dyn Store, project_id: Uuid) -> ServiceResult<Project> {
    store
        .find_project(project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project not found"))
}

async fn check_assignee(store: &dyn Store, assignee_id: Uuid, project: &Project) -> ServiceResult<()> {
    if store.find_user(assignee_id).await?.is_none() {
        return Err(ServiceError::validation("Assignee not found"));
    }
    if !policy::is_valid_assignee(assignee_id, project) {
        return Err(ServiceError::validation(
            "Assignee must be the project owner or a member",
        ));
    }
    Ok(())
}

fn task_link(task: &Task) -> String {
    format!("/projects/{}/tasks/{}", task.project_id, task.id)
}

/// Keeps the tasks the actor may view; tasks without a loaded project are dropped
pub(crate) fn visible_tasks(
    actor: &AuthContext,
    tasks: Vec<Task>,
    projects: &HashMap<Uuid, Project>,
) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| {
            projects
                .get(&task.project_id)
                .is_some_and(|project| policy::can_view_task(actor, task, project))
        })
        .collect()
}

/// Service layer
///
/// Each operation takes the store, the event publisher (where it has side
/// effects), the authenticated subject, and typed input. The flow is always
/// the same:
///
/// 1. validate input
/// 2. load the referenced entities fresh from the store
/// 3. run the access policy on that snapshot
/// 4. mutate
/// 5. fire notifications and broadcasts (best-effort)
///
/// Steps 1 to 3 run before any write, so a rejected operation leaves no
/// partial state. Step 5 never fails the operation.
///
/// # Modules
///
/// - `accounts`: register, login, external identity login, profile, user admin
/// - `projects`: project CRUD with cascade delete
/// - `tasks`: task CRUD, listing, notify-and-broadcast
/// - `comments`: comment listing, creation and deletion
/// - `notifications`: per-user feed and mark-read
/// - `dashboard`: overview, stats, calendar and project report

use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::events::{EventPublisher, LiveEvent, Room};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::project::{Project, ProjectView};
use crate::models::task::{Task, TaskView};
use crate::models::user::{User, UserSummary};
use crate::store::Store;

pub mod accounts;
pub mod comments;
pub mod dashboard;
pub mod notifications;
pub mod projects;
pub mod tasks;

/// Effectively unlimited row count for internal listings
pub(crate) const UNBOUNDED: i64 = i64::MAX;

/// Parses a caller-supplied identifier
///
/// A malformed value is a validation error naming the kind of reference,
/// e.g. `Invalid task id`.
pub fn parse_id(raw: &str, what: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::Validation(format!("Invalid {} id", what)))
}

/// Records a notification and pushes it to the recipient's room
///
/// Failures are logged and swallowed.
pub(crate) async fn notify(
    store: &dyn Store,
    events: &dyn EventPublisher,
    draft: CreateNotification,
) -> Option<Notification> {
    let user_id = draft.user_id;
    let kind = draft.kind.clone();

    match store.create_notification(draft).await {
        Ok(notification) => {
            broadcast(
                events,
                Room::User(user_id),
                LiveEvent::Notification(notification.clone()),
            )
            .await;
            Some(notification)
        }
        Err(e) => {
            warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to record notification");
            None
        }
    }
}

/// Publishes an event; failures are logged and swallowed
pub(crate) async fn broadcast(events: &dyn EventPublisher, room: Room, event: LiveEvent) {
    let name = event.name();
    if let Err(e) = events.publish(room, event).await {
        warn!(room = %room, event = name, error = %e, "Live update publish failed");
    }
}

/// Loads a user map for the given IDs
pub(crate) async fn load_users(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> ServiceResult<HashMap<Uuid, User>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(store
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

/// Resolves one task against its already loaded project
pub(crate) async fn task_view(
    store: &dyn Store,
    task: Task,
    project: &Project,
) -> ServiceResult<TaskView> {
    let assignee = match task.assignee_id {
        Some(id) => store.find_user(id).await?.map(|u| u.summary()),
        None => None,
    };

    Ok(TaskView::new(task, project.as_ref_view(), assignee))
}

/// Resolves many tasks, loading each project and assignee once
///
/// Tasks whose project has vanished are dropped.
pub(crate) async fn task_views(
    store: &dyn Store,
    tasks: Vec<Task>,
    projects: &HashMap<Uuid, Project>,
) -> ServiceResult<Vec<TaskView>> {
    let users = load_users(store, tasks.iter().filter_map(|t| t.assignee_id)).await?;

    Ok(tasks
        .into_iter()
        .filter_map(|task| {
            let project = projects.get(&task.project_id)?;
            let assignee = task
                .assignee_id
                .and_then(|id| users.get(&id))
                .map(User::summary);
            Some(TaskView::new(task, project.as_ref_view(), assignee))
        })
        .collect())
}

/// Loads the distinct projects referenced by `tasks`
pub(crate) async fn projects_for(
    store: &dyn Store,
    tasks: &[Task],
) -> ServiceResult<HashMap<Uuid, Project>> {
    let mut projects = HashMap::new();
    for task in tasks {
        if projects.contains_key(&task.project_id) {
            continue;
        }
        if let Some(project) = store.find_project(task.project_id).await? {
            projects.insert(project.id, project);
        }
    }
    Ok(projects)
}

/// Resolves owners and members of each project to user summaries
pub(crate) async fn project_views(
    store: &dyn Store,
    projects: Vec<Project>,
) -> ServiceResult<Vec<ProjectView>> {
    let users = load_users(
        store,
        projects
            .iter()
            .flat_map(|p| std::iter::once(p.owner_id).chain(p.members.iter().copied())),
    )
    .await?;

    let summary = |id: &Uuid| users.get(id).map(User::summary);

    Ok(projects
        .into_iter()
        .map(|p| ProjectView {
            owner: summary(&p.owner_id),
            members: p.members.iter().filter_map(summary).collect::<Vec<UserSummary>>(),
            id: p.id,
            title: p.title,
            description: p.description,
            start_date: p.start_date,
            end_date: p.end_date,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect())
}

/// Project operations
///
/// Any authenticated user may create a project and becomes its owner. Owners
/// and admins may change or delete it; members may only view it. Deleting a
/// project removes its tasks and their comments first.
///
/// Dropping members from a project broadcasts `projectAccessRevoked` so live
/// sockets of users who can no longer view it leave the project room.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::{broadcast, load_users, project_views};
use crate::auth::middleware::AuthContext;
use crate::auth::policy;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{EventPublisher, LiveEvent, Room};
use crate::models::project::{CascadeSummary, CreateProject, Project, ProjectView, DEFAULT_PROJECT_STATUS};
use crate::models::user::UserRole;
use crate::store::Store;

/// Input for creating a project
#[derive(Debug, Clone, Default)]
pub struct CreateProjectInput {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub members: Vec<Uuid>,
    pub status: Option<String>,
}

/// Partial project update; owner cannot be changed
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub members: Option<Vec<Uuid>>,
    pub status: Option<String>,
}

/// Projects visible to the actor, newest first
///
/// Admins see every project; everyone else sees what they own or belong to.
pub async fn list(store: &dyn Store, actor: &AuthContext) -> ServiceResult<Vec<ProjectView>> {
    let scope = (!actor.is_admin()).then_some(actor.user_id);
    let projects = store.list_projects(scope).await?;
    project_views(store, projects).await
}

pub async fn create(
    store: &dyn Store,
    actor: &AuthContext,
    input: CreateProjectInput,
) -> ServiceResult<ProjectView> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(ServiceError::validation("Title required"));
    }

    let members = check_members(store, input.members).await?;
    let status = input
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT_STATUS.to_string());

    let project = store
        .create_project(CreateProject {
            title,
            description: input.description.unwrap_or_default(),
            start_date: input.start_date,
            end_date: input.end_date,
            owner_id: actor.user_id,
            members,
            status,
        })
        .await?;

    info!(project_id = %project.id, user_id = %actor.user_id, "Project created");

    resolve(store, project).await
}

pub async fn get(store: &dyn Store, actor: &AuthContext, project_id: Uuid) -> ServiceResult<ProjectView> {
    let project = load(store, project_id).await?;
    if !policy::can_view_project(actor, &project) {
        return Err(ServiceError::forbidden("Forbidden"));
    }

    resolve(store, project).await
}

pub async fn update(
    store: &dyn Store,
    events: &dyn EventPublisher,
    actor: &AuthContext,
    project_id: Uuid,
    input: UpdateProjectInput,
) -> ServiceResult<ProjectView> {
    let mut project = load(store, project_id).await?;
    if !policy::can_mutate_project(actor, &project) {
        return Err(ServiceError::forbidden(
            "Only owner or admin can update project",
        ));
    }

    if let Some(title) = input.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ServiceError::validation("Title required"));
        }
        project.title = title;
    }
    if let Some(description) = input.description {
        project.description = description;
    }
    if let Some(start_date) = input.start_date {
        project.start_date = start_date;
    }
    if let Some(end_date) = input.end_date {
        project.end_date = end_date;
    }
    let previous_members = project.members.clone();
    if let Some(members) = input.members {
        project.members = check_members(store, members).await?;
    }
    if let Some(status) = input.status {
        project.status = if status.trim().is_empty() {
            DEFAULT_PROJECT_STATUS.to_string()
        } else {
            status
        };
    }

    let revoked = revoked_viewers(store, &project, &previous_members).await?;

    let project = store
        .save_project(&project)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project not found"))?;

    info!(project_id = %project.id, user_id = %actor.user_id, "Project updated");

    if !revoked.is_empty() {
        broadcast(
            events,
            Room::Project(project.id),
            LiveEvent::ProjectAccessRevoked {
                project_id: project.id,
                user_ids: revoked,
            },
        )
        .await;
    }

    resolve(store, project).await
}

/// Former members who can no longer view the project (admins keep access)
async fn revoked_viewers(
    store: &dyn Store,
    project: &Project,
    previous_members: &[Uuid],
) -> ServiceResult<Vec<Uuid>> {
    let dropped: Vec<Uuid> = previous_members
        .iter()
        .copied()
        .filter(|id| !project.is_related(*id))
        .collect();
    if dropped.is_empty() {
        return Ok(dropped);
    }

    let users = load_users(store, dropped.iter().copied()).await?;
    Ok(dropped
        .into_iter()
        .filter(|id| users.get(id).map_or(true, |u| u.role != UserRole::Admin))
        .collect())
}

/// Deletes the project with every task and comment under it
pub async fn delete(
    store: &dyn Store,
    actor: &AuthContext,
    project_id: Uuid,
) -> ServiceResult<CascadeSummary> {
    let project = load(store, project_id).await?;
    if !policy::can_mutate_project(actor, &project) {
        return Err(ServiceError::forbidden(
            "Only owner or admin can delete project",
        ));
    }

    let summary = store
        .delete_project(project.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project not found"))?;

    info!(
        project_id = %project.id,
        user_id = %actor.user_id,
        deleted_tasks = summary.deleted_tasks,
        deleted_comments = summary.deleted_comments,
        "Project deleted"
    );

    Ok(summary)
}

pub(crate) async fn load(store: &dyn Store, project_id: Uuid) -> ServiceResult<Project> {
    store
        .find_project(project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project not found"))
}

async fn resolve(store: &dyn Store, project: Project) -> ServiceResult<ProjectView> {
    project_views(store, vec![project])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::Internal("Project view missing".to_string()))
}

/// Deduplicates member IDs and rejects unknown users
async fn check_members(store: &dyn Store, members: Vec<Uuid>) -> ServiceResult<Vec<Uuid>> {
    let mut unique = Vec::with_capacity(members.len());
    for id in members {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }

    let known = load_users(store, unique.iter().copied()).await?;
    if let Some(missing) = unique.iter().find(|id| !known.contains_key(id)) {
        return Err(ServiceError::Validation(format!("Member not found: {}", missing)));
    }

    Ok(unique)
}

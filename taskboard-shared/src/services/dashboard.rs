/// Dashboard aggregates
///
/// Read-only summaries built from the same store queries as the task
/// listing. Every task returned here passes the task visibility check.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::{projects_for, task_views, UNBOUNDED};
use super::projects::load;
use super::tasks::visible_tasks;
use crate::auth::middleware::AuthContext;
use crate::auth::policy;
use crate::error::{ServiceError, ServiceResult};
use crate::models::project::Project;
use crate::models::task::{Task, TaskFilter, TaskStatus, TaskView};
use crate::store::Store;

/// Look-ahead window for upcoming deadlines
pub const UPCOMING_DAYS: i64 = 7;

/// Project summary shown on the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBrief {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: String,
}

impl From<Project> for ProjectBrief {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            title: p.title,
            start_date: p.start_date,
            end_date: p.end_date,
            status: p.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub projects: Vec<ProjectBrief>,
    pub assigned_tasks: Vec<TaskView>,
    /// Assigned tasks per status; statuses with no tasks are omitted
    pub status_counts: BTreeMap<String, i64>,
    pub upcoming: Vec<TaskView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_tasks: i64,
    pub done: i64,
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    #[serde(rename = "_id")]
    pub status: TaskStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub completed: i64,
    pub percent: i64,
}

/// Calendar range query
#[derive(Debug, Clone, Default)]
pub struct CalendarQuery {
    pub project_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Rounded completion percentage; zero when there is nothing to complete
pub fn percent(done: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (done as f64 * 100.0 / total as f64).round() as i64
}

/// The actor's projects, assigned work and deadlines in the next week
pub async fn overview(
    store: &dyn Store,
    actor: &AuthContext,
    now: DateTime<Utc>,
) -> ServiceResult<Overview> {
    let projects = store.list_projects(Some(actor.user_id)).await?;
    let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

    let assigned = store
        .list_tasks(
            &TaskFilter {
                assignee_id: Some(actor.user_id),
                ..Default::default()
            },
            UNBOUNDED,
            0,
        )
        .await?;

    let mut status_counts = BTreeMap::new();
    for task in &assigned {
        *status_counts.entry(task.status.to_string()).or_insert(0) += 1;
    }

    let window = TaskFilter {
        due_after: Some(now),
        due_before: Some(now + Duration::days(UPCOMING_DAYS)),
        ..Default::default()
    };
    let mut upcoming = store
        .list_tasks(
            &TaskFilter {
                assignee_id: Some(actor.user_id),
                ..window.clone()
            },
            UNBOUNDED,
            0,
        )
        .await?;
    if !project_ids.is_empty() {
        let in_projects = store
            .list_tasks(
                &TaskFilter {
                    project_ids: Some(project_ids),
                    ..window
                },
                UNBOUNDED,
                0,
            )
            .await?;
        merge_by_due_date(&mut upcoming, in_projects);
    }

    let mut all = assigned.clone();
    all.extend(upcoming.iter().cloned());
    let task_projects = projects_for(store, &all).await?;

    Ok(Overview {
        projects: projects.into_iter().map(ProjectBrief::from).collect(),
        assigned_tasks: task_views(store, assigned, &task_projects).await?,
        status_counts,
        upcoming: task_views(store, upcoming, &task_projects).await?,
    })
}

/// Completion over every project the actor owns or belongs to
pub async fn stats(store: &dyn Store, actor: &AuthContext) -> ServiceResult<Stats> {
    let project_ids: Vec<Uuid> = store
        .list_projects(Some(actor.user_id))
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if project_ids.is_empty() {
        return Ok(Stats {
            total_tasks: 0,
            done: 0,
            percent: 0,
        });
    }

    let filter = TaskFilter {
        project_ids: Some(project_ids),
        ..Default::default()
    };
    let total_tasks = store.count_tasks(&filter).await?;
    let done = store
        .count_tasks(&TaskFilter {
            status: Some(TaskStatus::Done),
            ..filter
        })
        .await?;

    Ok(Stats {
        total_tasks,
        done,
        percent: percent(done, total_tasks),
    })
}

/// Visible tasks due within an optional range
pub async fn calendar(
    store: &dyn Store,
    actor: &AuthContext,
    query: CalendarQuery,
) -> ServiceResult<Vec<TaskView>> {
    let filter = TaskFilter {
        project_id: query.project_id,
        due_after: query.from,
        due_before: query.to,
        ..Default::default()
    };

    let tasks = store.list_tasks(&filter, UNBOUNDED, 0).await?;
    let projects = projects_for(store, &tasks).await?;
    let visible = visible_tasks(actor, tasks, &projects);

    task_views(store, visible, &projects).await
}

/// Task totals per status for one project the actor can view
pub async fn report(store: &dyn Store, actor: &AuthContext, project_id: Uuid) -> ServiceResult<ProjectReport> {
    let project = load(store, project_id).await?;
    if !policy::can_view_project(actor, &project) {
        return Err(ServiceError::forbidden("Forbidden"));
    }

    let by_status: Vec<StatusCount> = store
        .task_status_counts(project.id)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let total = by_status.iter().map(|s| s.count).sum();
    let completed = by_status
        .iter()
        .find(|s| s.status == TaskStatus::Done)
        .map_or(0, |s| s.count);

    Ok(ProjectReport {
        total,
        by_status,
        completed,
        percent: percent(completed, total),
    })
}

/// Appends tasks not already present, then restores due date order
fn merge_by_due_date(into: &mut Vec<Task>, more: Vec<Task>) {
    let mut seen: HashSet<Uuid> = into.iter().map(|t| t.id).collect();
    into.extend(more.into_iter().filter(|t| seen.insert(t.id)));
    into.sort_by_key(|t| (t.due_date, t.created_at));
}

/// Task model and database operations
///
/// Tasks belong to exactly one project for their whole life and may be
/// assigned to one user who must be the project owner or a member.
///
/// # Status board
///
/// ```text
/// todo ⇄ inprogress ⇄ done
/// ```
///
/// Any project member may move a task between columns; there is no
/// transition restriction.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'inprogress', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Fix bug".to_string(),
///     description: String::new(),
///     project_id,
///     assignee_id: None,
///     status: TaskStatus::Todo,
///     priority: TaskPriority::High,
///     due_date: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::project::ProjectRef;
use super::user::UserSummary;

/// Kanban column of a task
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// All statuses in board order
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!(
                "Invalid status '{}': expected todo, inprogress or done",
                other
            )),
        }
    }
}

/// Task priority
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!(
                "Invalid priority '{}': expected low, medium or high",
                other
            )),
        }
    }
}

/// Task record as persisted
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub title: String,

    pub description: String,

    /// Owning project; immutable after creation
    #[serde(rename = "project")]
    pub project_id: Uuid,

    /// Assigned user, if any
    #[serde(rename = "assignee")]
    pub assignee_id: Option<Uuid>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Task response with project and assignee resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub project: ProjectRef,
    pub assignee: Option<UserSummary>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Combines a task with its already loaded project and assignee
    pub fn new(task: Task, project: ProjectRef, assignee: Option<UserSummary>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            project,
            assignee,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

/// Query filter for task listings
///
/// Every present field narrows the result (logical AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Single project
    pub project_id: Option<Uuid>,

    /// Any of these projects
    pub project_ids: Option<Vec<Uuid>>,

    pub status: Option<TaskStatus>,

    pub assignee_id: Option<Uuid>,

    pub priority: Option<TaskPriority>,

    /// Due on or before
    pub due_before: Option<DateTime<Utc>>,

    /// Due on or after
    pub due_after: Option<DateTime<Utc>>,

    /// Case-insensitive substring over title and description
    pub search: Option<String>,
}

impl TaskFilter {
    /// In-process evaluation, mirroring the SQL built by [`Task::list`]
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = self.project_id {
            if task.project_id != project_id {
                return false;
            }
        }
        if let Some(ref ids) = self.project_ids {
            if !ids.contains(&task.project_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(assignee_id) = self.assignee_id {
            if task.assignee_id != Some(assignee_id) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if self.due_before.is_some() || self.due_after.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_before.is_some_and(|before| due > before) {
                return false;
            }
            if self.due_after.is_some_and(|after| due < after) {
                return false;
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            if !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(project_id) = self.project_id {
            qb.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(ref ids) = self.project_ids {
            qb.push(" AND project_id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(assignee_id) = self.assignee_id {
            qb.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        if let Some(priority) = self.priority {
            qb.push(" AND priority = ").push_bind(priority);
        }
        if let Some(before) = self.due_before {
            qb.push(" AND due_date <= ").push_bind(before);
        }
        if let Some(after) = self.due_after {
            qb.push(" AND due_date >= ").push_bind(after);
        }
        if let Some(ref needle) = self.search {
            let pattern = format!("%{}%", escape_like(needle));
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Escapes LIKE metacharacters so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const TASK_COLUMNS: &str = "id, title, description, project_id, assignee_id, status, priority, \
                            due_date, created_at, updated_at";

impl Task {
    /// Inserts a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (id, title, description, project_id, assignee_id, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(Uuid::new_v4())
            .bind(data.title)
            .bind(data.description)
            .bind(data.project_id)
            .bind(data.assignee_id)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.due_date)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable field back (last write wins, no version check)
    pub async fn save(pool: &PgPool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                assignee_id = $4,
                status = $5,
                priority = $6,
                due_date = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.assignee_id)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .fetch_optional(pool)
            .await
    }

    /// Lists one page of tasks matching `filter`
    ///
    /// Ordered by due date (undated last), then creation time.
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM tasks WHERE TRUE",
            TASK_COLUMNS
        ));
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY due_date ASC NULLS LAST, created_at ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        qb.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Counts tasks matching `filter`
    pub async fn count(pool: &PgPool, filter: &TaskFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks WHERE TRUE");
        filter.push_conditions(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Per-status task counts for one project
    pub async fn count_by_status(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (TaskStatus, i64)>(
            "SELECT status, COUNT(*) FROM tasks WHERE project_id = $1 GROUP BY status",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes a task and its comments in one transaction
    ///
    /// Returns the number of comments removed, or `None` if the task did not
    /// exist.
    pub async fn delete_cascade(pool: &PgPool, id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let comments = sqlx::query("DELETE FROM comments WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let task = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if task.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(comments.rows_affected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(title: &str, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "Investigate the crash on login".to_string(),
            project_id: Uuid::new_v4(),
            assignee_id: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: due,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "inprogress"
        );
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("in_progress".parse::<TaskStatus>().is_err());
        assert!("urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_filter_search_is_literal_and_case_insensitive() {
        let t = task("Fix BUG (urgent)", None);

        let filter = TaskFilter {
            search: Some("bug (".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&t));

        let filter = TaskFilter {
            search: Some("LOGIN".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&t));

        let filter = TaskFilter {
            search: Some("b.g".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&t));
    }

    #[test]
    fn test_filter_due_range_excludes_undated() {
        let now = Utc::now();
        let dated = task("dated", Some(now));
        let undated = task("undated", None);

        let filter = TaskFilter {
            due_after: Some(now - Duration::days(1)),
            due_before: Some(now + Duration::days(1)),
            ..Default::default()
        };

        assert!(filter.matches(&dated));
        assert!(!filter.matches(&undated));

        let filter = TaskFilter {
            due_before: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(!filter.matches(&dated));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}

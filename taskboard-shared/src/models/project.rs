/// Project model and database operations
///
/// A project has exactly one owner and a set of members. The owner is
/// always treated as related to the project even when absent from
/// `members`. Projects own their tasks: deleting a project deletes every
/// task under it and, transitively, their comments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_date TIMESTAMPTZ,
///     end_date TIMESTAMPTZ,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     members UUID[] NOT NULL DEFAULT '{}',
///     status VARCHAR(64) NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

/// Default status for new projects
pub const DEFAULT_PROJECT_STATUS: &str = "active";

/// Project record as persisted
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub title: String,

    pub description: String,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,

    /// Owning user; immutable after creation
    #[serde(rename = "owner")]
    pub owner_id: Uuid,

    /// Member user IDs; order is not significant
    pub members: Vec<Uuid>,

    /// `active`, `archived` or any free-form label
    pub status: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether `user_id` owns this project
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Whether `user_id` is listed as a member
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// Owner or member
    pub fn is_related(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.is_member(user_id)
    }

    /// Reference embedded in task responses
    pub fn as_ref_view(&self) -> ProjectRef {
        ProjectRef {
            id: self.id,
            title: self.title.clone(),
            owner: self.owner_id,
            members: self.members.clone(),
        }
    }
}

/// Project reference embedded in task responses (`{ _id, title, owner, members }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub owner: Uuid,
    pub members: Vec<Uuid>,
}

/// Project response with owner and members resolved to user summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_id: Uuid,
    pub members: Vec<Uuid>,
    pub status: String,
}

/// Rows removed by a cascading project delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub deleted_tasks: u64,
    pub deleted_comments: u64,
}

const PROJECT_COLUMNS: &str = "id, title, description, start_date, end_date, owner_id, members, \
                               status, created_at, updated_at";

impl Project {
    /// Inserts a new project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO projects (id, title, description, start_date, end_date, owner_id, members, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(Uuid::new_v4())
            .bind(data.title)
            .bind(data.description)
            .bind(data.start_date)
            .bind(data.end_date)
            .bind(data.owner_id)
            .bind(data.members)
            .bind(data.status)
            .fetch_one(pool)
            .await
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable field of `project` back (last write wins)
    ///
    /// The owner is not part of the SET clause.
    pub async fn save(pool: &PgPool, project: &Project) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE projects
            SET title = $2,
                description = $3,
                start_date = $4,
                end_date = $5,
                members = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(project.id)
            .bind(&project.title)
            .bind(&project.description)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(&project.members)
            .bind(&project.status)
            .fetch_optional(pool)
            .await
    }

    /// Lists projects owned by or shared with `user_id`, or every project when `None`
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match user_id {
            Some(user_id) => {
                let query = format!(
                    "SELECT {} FROM projects WHERE owner_id = $1 OR $1 = ANY(members) \
                     ORDER BY created_at DESC",
                    PROJECT_COLUMNS
                );
                sqlx::query_as::<_, Project>(&query)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {} FROM projects ORDER BY created_at DESC",
                    PROJECT_COLUMNS
                );
                sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
            }
        }
    }

    /// Deletes a project together with its tasks and their comments
    ///
    /// Children go first and the whole cascade runs in one transaction, so a
    /// failure leaves nothing half-deleted. Returns `None` if the project
    /// did not exist.
    pub async fn delete_cascade(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<CascadeSummary>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let comments = sqlx::query(
            "DELETE FROM comments WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let tasks = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let project = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if project.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;

        Ok(Some(CascadeSummary {
            deleted_tasks: tasks.rows_affected(),
            deleted_comments: comments.rows_affected(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(owner: Uuid, members: Vec<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Sprint 1".to_string(),
            description: String::new(),
            start_date: None,
            end_date: None,
            owner_id: owner,
            members,
            status: DEFAULT_PROJECT_STATUS.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_is_related_without_membership() {
        let owner = Uuid::new_v4();
        let p = project(owner, vec![]);

        assert!(p.is_owner(owner));
        assert!(!p.is_member(owner));
        assert!(p.is_related(owner));
        assert!(!p.is_related(Uuid::new_v4()));
    }

    #[test]
    fn test_serialized_shape() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let p = project(owner, vec![member]);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["owner"], owner.to_string());
        assert_eq!(json["members"][0], member.to_string());
        assert!(json.get("startDate").is_some());
    }
}

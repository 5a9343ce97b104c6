/// PostgreSQL-backed [`Store`]
///
/// Thin delegation to the model functions. Unique-constraint violations are
/// surfaced as [`StoreError::Duplicate`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::db::{migrations, pool};
use crate::models::comment::{Comment, CreateComment};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::project::{CascadeSummary, CreateProject, Project};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{CreateUser, UpdateUser, User};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects, verifies connectivity and applies pending migrations
    pub async fn connect(config: pool::DatabaseConfig) -> Result<Self, StoreError> {
        let pool = pool::create_pool(config).await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn map_unique(e: sqlx::Error, what: &str) -> StoreError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Duplicate(what.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_unique(e, "email"))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        Ok(User::find_many(&self.pool, ids).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool, limit, offset).await?)
    }

    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn save_project(&self, project: &Project) -> Result<Option<Project>, StoreError> {
        Ok(Project::save(&self.pool, project).await?)
    }

    async fn list_projects(&self, user_id: Option<Uuid>) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list_for_user(&self.pool, user_id).await?)
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<CascadeSummary>, StoreError> {
        Ok(Project::delete_cascade(&self.pool, id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn save_task(&self, task: &Task) -> Result<Option<Task>, StoreError> {
        Ok(Task::save(&self.pool, task).await?)
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list(&self.pool, filter, limit, offset).await?)
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, StoreError> {
        Ok(Task::count(&self.pool, filter).await?)
    }

    async fn task_status_counts(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, StoreError> {
        Ok(Task::count_by_status(&self.pool, project_id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<Option<u64>, StoreError> {
        Ok(Task::delete_cascade(&self.pool, id).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> Result<Comment, StoreError> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(Comment::find_by_id(&self.pool, id).await?)
    }

    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(Comment::list_for_task(&self.pool, task_id).await?)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Comment::delete(&self.pool, id).await?)
    }

    async fn create_notification(
        &self,
        data: CreateNotification,
    ) -> Result<Notification, StoreError> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(Notification::list_for_user(&self.pool, user_id, limit).await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        Ok(Notification::mark_read(&self.pool, id, user_id).await?)
    }
}

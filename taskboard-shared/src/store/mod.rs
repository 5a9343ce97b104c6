/// Entity persistence
///
/// [`Store`] is the single seam between the service layer and storage. Two
/// implementations exist:
///
/// - [`PgStore`]: PostgreSQL via sqlx, cascades run inside a transaction
/// - [`MemoryStore`]: process-local, used for development and tests
///
/// The store performs no access checks. Callers load entities, run the
/// access policy on the fresh snapshot, then mutate.
///
/// # Example
///
/// ```
/// use taskboard_shared::store::{MemoryStore, Store};
/// use taskboard_shared::models::user::{CreateUser, UserRole};
///
/// # async fn example() -> Result<(), taskboard_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: None,
///     role: UserRole::Member,
///     google_id: None,
///     avatar_url: None,
/// }).await?;
///
/// assert!(store.find_user(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::comment::{Comment, CreateComment};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::project::{CascadeSummary, CreateProject, Project};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{CreateUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Persistence operations for every entity
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend label reported by the health endpoint
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    // Users

    /// Fails with [`StoreError::Duplicate`] if the email is taken
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Loads the users in `ids`; unknown IDs are skipped
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    // Projects

    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Persists the mutable fields of `project`; owner is left untouched
    async fn save_project(&self, project: &Project) -> Result<Option<Project>, StoreError>;

    /// Projects related to `user_id` (owner or member), newest first; all
    /// projects when `None`
    async fn list_projects(&self, user_id: Option<Uuid>) -> Result<Vec<Project>, StoreError>;

    /// Deletes the project, its tasks and their comments, children first
    async fn delete_project(&self, id: Uuid) -> Result<Option<CascadeSummary>, StoreError>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Persists the mutable fields of `task`; project is left untouched
    async fn save_task(&self, task: &Task) -> Result<Option<Task>, StoreError>;

    /// One page of matching tasks, due date ascending with undated last
    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError>;

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, StoreError>;

    /// Per-status counts for one project; statuses with no tasks are omitted
    async fn task_status_counts(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, StoreError>;

    /// Deletes the task and its comments; returns the comment count
    async fn delete_task(&self, id: Uuid) -> Result<Option<u64>, StoreError>;

    // Comments

    async fn create_comment(&self, data: CreateComment) -> Result<Comment, StoreError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;

    /// Comments on a task, oldest first
    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError>;

    // Notifications

    async fn create_notification(
        &self,
        data: CreateNotification,
    ) -> Result<Notification, StoreError>;

    /// A user's notifications, newest first
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Marks a notification owned by `user_id` as read (idempotent)
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, StoreError>;
}

/// Database models for Taskboard
///
/// Each model carries its row type, create/view types, and the sqlx
/// operations used by [`crate::store::PgStore`].
///
/// # Models
///
/// - `user`: Accounts, roles and embedded user summaries
/// - `project`: Projects with owner and members
/// - `task`: Kanban tasks, filters and resolved task views
/// - `comment`: Comments attached to tasks
/// - `notification`: Per-user notification feed
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User, UserRole};
/// use taskboard_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let owner = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: None,
///     role: UserRole::Member,
///     google_id: None,
///     avatar_url: None,
/// }).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     title: "Sprint 1".to_string(),
///     description: String::new(),
///     start_date: None,
///     end_date: None,
///     owner_id: owner.id,
///     members: vec![],
///     status: "active".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

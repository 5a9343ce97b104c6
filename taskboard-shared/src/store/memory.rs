/// In-process [`Store`]
///
/// Selected with `DATABASE_URL=memory` and used by the test suites. Records
/// are kept in insertion order, which doubles as creation order for the
/// "oldest first" and "newest first" listings.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::comment::{Comment, CreateComment};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::project::{CascadeSummary, CreateProject, Project};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{CreateUser, UpdateUser, User};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

impl Tables {
    /// Removes a task's comments and then the task itself
    fn remove_task(&mut self, id: Uuid) -> Option<u64> {
        let position = self.tasks.iter().position(|t| t.id == id)?;

        let before = self.comments.len();
        self.comments.retain(|c| c.task_id != id);
        let removed = (before - self.comments.len()) as u64;

        self.tasks.remove(position);
        Some(removed)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            google_id: data.google_id,
            avatar_url: data.avatar_url,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(google_id) = data.google_id {
            user.google_id = google_id;
        }
        if let Some(avatar_url) = data.avatar_url {
            user.avatar_url = avatar_url;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(page(tables.users.clone(), limit, offset))
    }

    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            start_date: data.start_date,
            end_date: data.end_date,
            owner_id: data.owner_id,
            members: data.members,
            status: data.status,
            created_at: now,
            updated_at: now,
        };

        self.tables.write().await.projects.push(project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn save_project(&self, project: &Project) -> Result<Option<Project>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.projects.iter_mut().find(|p| p.id == project.id) else {
            return Ok(None);
        };

        stored.title = project.title.clone();
        stored.description = project.description.clone();
        stored.start_date = project.start_date;
        stored.end_date = project.end_date;
        stored.members = project.members.clone();
        stored.status = project.status.clone();
        stored.updated_at = Utc::now();

        Ok(Some(stored.clone()))
    }

    async fn list_projects(&self, user_id: Option<Uuid>) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .rev()
            .filter(|p| user_id.map_or(true, |u| p.is_related(u)))
            .cloned()
            .collect())
    }

    async fn delete_project(&self, id: Uuid) -> Result<Option<CascadeSummary>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(position) = tables.projects.iter().position(|p| p.id == id) else {
            return Ok(None);
        };

        let task_ids: Vec<Uuid> = tables
            .tasks
            .iter()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();

        let mut summary = CascadeSummary::default();
        for task_id in task_ids {
            if let Some(comments) = tables.remove_task(task_id) {
                summary.deleted_tasks += 1;
                summary.deleted_comments += comments;
            }
        }

        tables.projects.remove(position);
        Ok(Some(summary))
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            project_id: data.project_id,
            assignee_id: data.assignee_id,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        };

        self.tables.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(None);
        };

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.assignee_id = task.assignee_id;
        stored.status = task.status;
        stored.priority = task.priority;
        stored.due_date = task.due_date;
        stored.updated_at = Utc::now();

        Ok(Some(stored.clone()))
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        matching.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.created_at));
        Ok(page(matching, limit, offset))
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().filter(|t| filter.matches(t)).count() as i64)
    }

    async fn task_status_counts(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<TaskStatus, i64> = HashMap::new();
        for task in tables.tasks.iter().filter(|t| t.project_id == project_id) {
            *counts.entry(task.status).or_insert(0) += 1;
        }

        Ok(TaskStatus::ALL
            .iter()
            .filter_map(|s| counts.get(s).map(|c| (*s, *c)))
            .collect())
    }

    async fn delete_task(&self, id: Uuid) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.write().await.remove_task(id))
    }

    async fn create_comment(&self, data: CreateComment) -> Result<Comment, StoreError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            author_id: data.author_id,
            text: data.text,
            created_at: now,
            updated_at: now,
        };

        self.tables.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }

    async fn create_notification(
        &self,
        data: CreateNotification,
    ) -> Result<Notification, StoreError> {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            actor_id: data.actor_id,
            kind: data.kind,
            title: data.title,
            body: data.body,
            link: data.link,
            read: false,
            created_at: now,
            updated_at: now,
        };

        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(n) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        else {
            return Ok(None);
        };

        n.read = true;
        n.updated_at = Utc::now();
        Ok(Some(n.clone()))
    }
}

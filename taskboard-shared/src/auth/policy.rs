/// Access policy
///
/// Pure predicates deciding whether a subject may act on a project, task or
/// comment. Callers pass freshly loaded entities; nothing here performs I/O
/// or caches a decision, so a membership change takes effect on the very
/// next request.
///
/// # Rules
///
/// | Action | Allowed for |
/// |---|---|
/// | view project, create task, comment | owner, member, admin |
/// | update or delete project | owner, admin |
/// | view task | owner, member, admin, assignee |
/// | update task | owner, member, admin, assignee |
/// | delete task | owner, admin |
/// | delete comment | author, project owner, admin |
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::middleware::AuthContext;
/// use taskboard_shared::auth::policy;
/// use taskboard_shared::models::user::UserRole;
/// # use taskboard_shared::models::project::Project;
/// # fn example(project: &Project) {
/// let admin = AuthContext::new(uuid::Uuid::new_v4(), UserRole::Admin);
/// assert!(policy::can_mutate_project(&admin, project));
/// # }
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::comment::Comment;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::user::UserRole;

/// Owner, member or admin
pub fn can_view_project(actor: &AuthContext, project: &Project) -> bool {
    actor.is_admin() || project.is_related(actor.user_id)
}

/// Owner or admin; members may view but not change a project
pub fn can_mutate_project(actor: &AuthContext, project: &Project) -> bool {
    actor.is_admin() || project.is_owner(actor.user_id)
}

pub fn can_create_task_in_project(actor: &AuthContext, project: &Project) -> bool {
    can_view_project(actor, project)
}

/// `project` must be the task's own project
pub fn can_view_task(actor: &AuthContext, task: &Task, project: &Project) -> bool {
    can_view_project(actor, project) || is_assignee(actor, task)
}

/// Any project member may move any task on the board
pub fn can_update_task(actor: &AuthContext, task: &Task, project: &Project) -> bool {
    is_assignee(actor, task) || can_view_project(actor, project)
}

/// Narrower than update: assignees and members cannot delete
pub fn can_delete_task(actor: &AuthContext, _task: &Task, project: &Project) -> bool {
    can_mutate_project(actor, project)
}

/// Assignees must belong to the project (owner or member)
pub fn is_valid_assignee(candidate: Uuid, project: &Project) -> bool {
    project.is_related(candidate)
}

/// Author, the owning project's owner, or admin
pub fn can_delete_comment(actor: &AuthContext, comment: &Comment, project: &Project) -> bool {
    actor.is_admin() || comment.author_id == actor.user_id || project.is_owner(actor.user_id)
}

/// Role gate: true iff the actor's role is one of `allowed`
pub fn authorize(actor: &AuthContext, allowed: &[UserRole]) -> bool {
    allowed.contains(&actor.role)
}

fn is_assignee(actor: &AuthContext, task: &Task) -> bool {
    task.assignee_id == Some(actor.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    struct Fixture {
        owner: AuthContext,
        member: AuthContext,
        admin: AuthContext,
        assignee: AuthContext,
        stranger: AuthContext,
        project: Project,
        task: Task,
    }

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext::new(Uuid::new_v4(), role)
    }

    fn fixture() -> Fixture {
        let owner = ctx(UserRole::Member);
        let member = ctx(UserRole::Member);
        let admin = ctx(UserRole::Admin);
        // An assignee who has since left the project
        let assignee = ctx(UserRole::Manager);
        let stranger = ctx(UserRole::Manager);

        let project = Project {
            id: Uuid::new_v4(),
            title: "Sprint 1".to_string(),
            description: String::new(),
            start_date: None,
            end_date: None,
            owner_id: owner.user_id,
            members: vec![member.user_id],
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let task = Task {
            id: Uuid::new_v4(),
            title: "Fix bug".to_string(),
            description: String::new(),
            project_id: project.id,
            assignee_id: Some(assignee.user_id),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        Fixture {
            owner,
            member,
            admin,
            assignee,
            stranger,
            project,
            task,
        }
    }

    #[test]
    fn test_can_view_project_all_relations() {
        let f = fixture();
        assert!(can_view_project(&f.owner, &f.project));
        assert!(can_view_project(&f.member, &f.project));
        assert!(can_view_project(&f.admin, &f.project));
        assert!(!can_view_project(&f.stranger, &f.project));
    }

    #[test]
    fn test_owner_needs_no_membership_entry() {
        let f = fixture();
        assert!(!f.project.members.contains(&f.owner.user_id));
        assert!(can_create_task_in_project(&f.owner, &f.project));
    }

    #[test]
    fn test_can_mutate_project() {
        let f = fixture();
        assert!(can_mutate_project(&f.owner, &f.project));
        assert!(can_mutate_project(&f.admin, &f.project));
        assert!(!can_mutate_project(&f.member, &f.project));
        assert!(!can_mutate_project(&f.stranger, &f.project));
    }

    #[test]
    fn test_can_update_task_each_relation() {
        let f = fixture();
        assert!(can_update_task(&f.assignee, &f.task, &f.project));
        assert!(can_update_task(&f.owner, &f.task, &f.project));
        assert!(can_update_task(&f.member, &f.task, &f.project));
        assert!(can_update_task(&f.admin, &f.task, &f.project));
        assert!(!can_update_task(&f.stranger, &f.task, &f.project));
    }

    #[test]
    fn test_can_view_task_includes_assignee() {
        let f = fixture();
        assert!(can_view_task(&f.assignee, &f.task, &f.project));
        assert!(can_view_task(&f.admin, &f.task, &f.project));
        assert!(!can_view_task(&f.stranger, &f.task, &f.project));
    }

    #[test]
    fn test_can_delete_task_is_narrow() {
        let f = fixture();
        assert!(can_delete_task(&f.owner, &f.task, &f.project));
        assert!(can_delete_task(&f.admin, &f.task, &f.project));
        assert!(!can_delete_task(&f.member, &f.task, &f.project));
        assert!(!can_delete_task(&f.assignee, &f.task, &f.project));
    }

    #[test]
    fn test_is_valid_assignee() {
        let f = fixture();
        assert!(is_valid_assignee(f.owner.user_id, &f.project));
        assert!(is_valid_assignee(f.member.user_id, &f.project));
        assert!(!is_valid_assignee(f.assignee.user_id, &f.project));
        assert!(!is_valid_assignee(f.admin.user_id, &f.project));
    }

    #[test]
    fn test_can_delete_comment() {
        let f = fixture();
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: f.task.id,
            author_id: f.member.user_id,
            text: "On it".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(can_delete_comment(&f.member, &comment, &f.project));
        assert!(can_delete_comment(&f.owner, &comment, &f.project));
        assert!(can_delete_comment(&f.admin, &comment, &f.project));
        assert!(!can_delete_comment(&f.assignee, &comment, &f.project));
        assert!(!can_delete_comment(&f.stranger, &comment, &f.project));
    }

    #[test]
    fn test_authorize_roles() {
        let f = fixture();
        assert!(authorize(&f.admin, &[UserRole::Admin]));
        assert!(!authorize(&f.owner, &[UserRole::Admin]));
        assert!(authorize(&f.stranger, &[UserRole::Admin, UserRole::Manager]));
        assert!(!authorize(&f.admin, &[]));
    }
}

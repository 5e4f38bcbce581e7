use std::fmt;

use uuid::Uuid;

/// The kinds of request the evaluator rules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateProject,
    ViewProject,
    UpdateProject,
    DeleteProject,
    ManageMembers,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
    CreateMilestone,
    UpdateMilestone,
    DeleteMilestone,
    CreateComment,
    DeleteComment,
    UpdateProfile,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProject => "project.create",
            Action::ViewProject => "project.view",
            Action::UpdateProject => "project.update",
            Action::DeleteProject => "project.delete",
            Action::ManageMembers => "project.members.manage",
            Action::CreateTask => "task.create",
            Action::ViewTask => "task.view",
            Action::UpdateTask => "task.update",
            Action::DeleteTask => "task.delete",
            Action::CreateMilestone => "milestone.create",
            Action::UpdateMilestone => "milestone.update",
            Action::DeleteMilestone => "milestone.delete",
            Action::CreateComment => "comment.create",
            Action::DeleteComment => "comment.delete",
            Action::UpdateProfile => "user.update",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the target of an action together with the project that scopes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A project that does not exist yet.
    NewProject,
    Project(Uuid),
    Task {
        id: Uuid,
        project_id: Uuid,
    },
    Milestone {
        id: Uuid,
        project_id: Uuid,
    },
    Comment {
        id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
        author_id: Uuid,
    },
    User(Uuid),
}

impl Resource {
    /// The owning project, if the resource is project scoped.
    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            Resource::Project(id) => Some(*id),
            Resource::Task { project_id, .. }
            | Resource::Milestone { project_id, .. }
            | Resource::Comment { project_id, .. } => Some(*project_id),
            Resource::NewProject | Resource::User(_) => None,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Resource::NewProject => None,
            Resource::Project(id) | Resource::User(id) => Some(*id),
            Resource::Task { id, .. } | Resource::Milestone { id, .. } | Resource::Comment { id, .. } => Some(*id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resource::NewProject | Resource::Project(_) => "project",
            Resource::Task { .. } => "task",
            Resource::Milestone { .. } => "milestone",
            Resource::Comment { .. } => "comment",
            Resource::User(_) => "user",
        }
    }
}

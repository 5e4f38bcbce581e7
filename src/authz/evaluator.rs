use uuid::Uuid;

use super::resource::{Action, Resource};
use super::store::MembershipStore;
use super::AccessError;

/// Access control evaluator
///
/// Decides whether an actor may perform an action using only ownership and
/// membership facts read from the injected store. It never writes and keeps
/// no state between calls.
///
/// Evaluation order:
/// 1. `CreateProject` -> allow (any authenticated actor)
/// 2. `UpdateProfile` -> allow only on the actor's own user record
/// 3. unknown project, or actor neither owner nor member -> `Invisible`
/// 4. action rule (see `rule`) -> allow or `InsufficientRole`
#[derive(Debug, Clone)]
pub struct AccessEvaluator<S> {
    store: S,
}

impl<S: MembershipStore> AccessEvaluator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn check(&self, actor: Uuid, action: Action, resource: &Resource) -> Result<(), AccessError> {
        let outcome = self.evaluate(actor, action, resource).await;

        match &outcome {
            Ok(()) => tracing::debug!(
                actor = %actor,
                action = %action,
                resource = resource.kind(),
                resource_id = ?resource.id(),
                "access allowed"
            ),
            Err(AccessError::Indeterminate(err)) => tracing::error!(
                actor = %actor,
                action = %action,
                project_id = ?resource.project_id(),
                error = %err,
                "access evaluation indeterminate"
            ),
            Err(err) => tracing::debug!(
                actor = %actor,
                action = %action,
                resource = resource.kind(),
                resource_id = ?resource.id(),
                reason = %err,
                "access denied"
            ),
        }

        outcome
    }

    /// An unset assignee is always acceptable; a set one must hold a
    /// membership in the project.
    pub async fn check_assignee(&self, project_id: Uuid, assignee: Option<Uuid>) -> Result<(), AccessError> {
        let Some(assignee) = assignee else {
            return Ok(());
        };

        let members = self.store.list_members(project_id).await?;
        if members.contains(&assignee) {
            Ok(())
        } else {
            tracing::debug!(project_id = %project_id, assignee = %assignee, "assignee is not a project member");
            Err(AccessError::Validation(
                "Assignee is not a member of this project".to_string(),
            ))
        }
    }

    async fn evaluate(&self, actor: Uuid, action: Action, resource: &Resource) -> Result<(), AccessError> {
        match (action, resource) {
            (Action::CreateProject, _) => return Ok(()),
            (Action::UpdateProfile, Resource::User(user_id)) if *user_id == actor => return Ok(()),
            (Action::UpdateProfile, _) => return Err(AccessError::Invisible),
            _ => {}
        }

        let project_id = resource.project_id().ok_or(AccessError::Invisible)?;
        let owner = self
            .store
            .get_owner(project_id)
            .await?
            .ok_or(AccessError::Invisible)?;
        let membership = self.store.get_membership(project_id, actor).await?;

        let standing = Standing {
            is_owner: owner == actor,
            role: membership.map(|m| m.role),
        };

        if !standing.is_owner && standing.role.is_none() {
            return Err(AccessError::Invisible);
        }

        rule(actor, action, resource, standing)
    }
}

#[derive(Debug, Clone, Copy)]
struct Standing {
    is_owner: bool,
    role: Option<crate::models::member::MemberRole>,
}

impl Standing {
    fn is_member(&self) -> bool {
        self.role.is_some()
    }

    fn can_edit(&self) -> bool {
        self.role.is_some_and(|role| role.can_edit())
    }
}

/// Per-action rule for an actor that already has visibility into the project.
fn rule(actor: Uuid, action: Action, resource: &Resource, standing: Standing) -> Result<(), AccessError> {
    let allowed = match action {
        Action::ViewProject | Action::ViewTask | Action::CreateComment => true,
        Action::UpdateProject => standing.can_edit(),
        Action::DeleteProject | Action::ManageMembers => standing.is_owner,
        Action::CreateTask
        | Action::UpdateTask
        | Action::CreateMilestone
        | Action::UpdateMilestone
        | Action::DeleteMilestone => standing.is_member(),
        Action::DeleteTask => standing.is_owner || standing.can_edit(),
        Action::DeleteComment => {
            standing.is_owner || matches!(resource, Resource::Comment { author_id, .. } if *author_id == actor)
        }
        Action::CreateProject => true,
        Action::UpdateProfile => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AccessError::InsufficientRole(denial_reason(action).to_string()))
    }
}

fn denial_reason(action: Action) -> &'static str {
    match action {
        Action::UpdateProject => "You do not have permission to update this project",
        Action::DeleteProject => "Only the project owner can delete this project",
        Action::ManageMembers => "Only the project owner can manage team members",
        Action::DeleteTask => "You do not have permission to delete this task",
        Action::DeleteComment => "Only the comment author or the project owner can delete this comment",
        _ => "You do not have access to this project",
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{Loggable, Severity};

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Member,
}

text_enum!(MemberRole, "member role", {
    Owner => "OWNER",
    Member => "MEMBER",
});

impl MemberRole {
    /// Roles allowed to edit project fields and delete tasks.
    pub fn can_edit(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Member)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

impl Loggable for TeamMember {
    fn entity_type() -> &'static str { "team_member" }
    fn subject_id(&self) -> Uuid { self.user_id }
    fn project_id(&self) -> Option<Uuid> { Some(self.project_id) }
    fn severity(&self) -> Severity { Severity::Critical }
}

/// Membership row joined with the member's user record.
#[derive(Debug, Clone, FromRow)]
pub struct DbTeamMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<DbTeamMember> for TeamMember {
    type Error = AppError;

    fn try_from(value: DbTeamMember) -> Result<Self, Self::Error> {
        Ok(TeamMember {
            id: value.id,
            project_id: value.project_id,
            user_id: value.user_id,
            role: value.role.parse().map_err(AppError::internal)?,
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            joined_at: value.joined_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    #[schema(example = "bob@student.edu")]
    pub email: String,
    #[schema(example = "MEMBER")]
    pub role: Option<MemberRole>,
}

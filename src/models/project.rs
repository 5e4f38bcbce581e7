use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::Loggable;

use super::member::TeamMember;
use super::milestone::MilestoneSummary;
use super::task::TaskSummary;
use super::user::UserRef;
use super::{double_option, text_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

text_enum!(ProjectStatus, "project status", {
    Planning => "PLANNING",
    InProgress => "IN_PROGRESS",
    OnHold => "ON_HOLD",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Project {
    fn entity_type() -> &'static str { "project" }
    fn subject_id(&self) -> Uuid { self.id }
    fn project_id(&self) -> Option<Uuid> { Some(self.id) }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbProject> for Project {
    type Error = AppError;

    fn try_from(value: DbProject) -> Result<Self, Self::Error> {
        Ok(Project {
            id: value.id,
            owner_id: value.owner_id,
            name: value.name,
            description: value.description,
            status: value.status.parse().map_err(AppError::internal)?,
            start_date: value.start_date,
            end_date: value.end_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Entry of the project listing: the project with its owner and how much it holds.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub owner: UserRef,
    pub member_count: i64,
    pub task_count: i64,
    pub milestone_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProjectSummary {
    #[sqlx(flatten)]
    pub project: DbProject,
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub member_count: i64,
    pub task_count: i64,
    pub milestone_count: i64,
}

impl TryFrom<DbProjectSummary> for ProjectSummary {
    type Error = AppError;

    fn try_from(value: DbProjectSummary) -> Result<Self, Self::Error> {
        let project = Project::try_from(value.project)?;
        Ok(ProjectSummary {
            owner: UserRef {
                id: project.owner_id,
                first_name: value.owner_first_name,
                last_name: value.owner_last_name,
            },
            project,
            member_count: value.member_count,
            task_count: value.task_count,
            milestone_count: value.milestone_count,
        })
    }
}

/// Project with everything a member sees on the project page.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectDetail {
    pub project: Project,
    pub members: Vec<TeamMember>,
    pub tasks: Vec<TaskSummary>,
    pub milestones: Vec<MilestoneSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "E-Commerce Platform")]
    pub name: String,
    #[schema(example = "Full-stack shop with cart and checkout.")]
    pub description: Option<String>,
    #[schema(format = DateTime, example = "2025-01-15T00:00:00Z")]
    pub start_date: Option<DateTime<Utc>>,
    #[schema(format = DateTime, example = "2025-04-30T00:00:00Z")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    #[schema(example = "E-Commerce Platform")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

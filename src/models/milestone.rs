use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::Loggable;

use super::double_option;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(format = DateTime, example = "2025-02-15T00:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Milestone {
    fn entity_type() -> &'static str { "milestone" }
    fn subject_id(&self) -> Uuid { self.id }
    fn project_id(&self) -> Option<Uuid> { Some(self.project_id) }
}

#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct MilestoneSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub milestone: Milestone,
    pub task_count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MilestoneCreateRequest {
    #[schema(example = "Phase 1: Foundation")]
    pub name: String,
    #[schema(example = "Infrastructure, authentication and base UI")]
    pub description: Option<String>,
    #[schema(format = DateTime, example = "2025-02-15T00:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MilestoneUpdateRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub is_completed: Option<bool>,
}

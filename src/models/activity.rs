use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ActivityEntry {
    pub id: Uuid,
    #[schema(example = "task.created")]
    pub event_name: String,
    #[schema(example = "Task created")]
    pub description: String,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    #[schema(example = "important")]
    pub severity: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::Loggable;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub author_first_name: String,
    pub author_last_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Comment {
    fn entity_type() -> &'static str { "comment" }
    fn subject_id(&self) -> Uuid { self.id }
    fn project_id(&self) -> Option<Uuid> { Some(self.project_id) }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Pushed a first draft, please review.")]
    pub content: String,
}

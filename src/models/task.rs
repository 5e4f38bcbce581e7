use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::Loggable;

use super::comment::Comment;
use super::user::UserRef;
use super::{double_option, text_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

text_enum!(TaskStatus, "task status", {
    Todo => "TODO",
    InProgress => "IN_PROGRESS",
    InReview => "IN_REVIEW",
    Done => "DONE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(TaskPriority, "task priority", {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Urgent => "URGENT",
});

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    #[schema(format = DateTime, example = "2025-02-10T17:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Task {
    fn entity_type() -> &'static str { "task" }
    fn subject_id(&self) -> Uuid { self.id }
    fn project_id(&self) -> Option<Uuid> { Some(self.project_id) }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: value.id,
            project_id: value.project_id,
            milestone_id: value.milestone_id,
            title: value.title,
            description: value.description,
            status: value.status.parse().map_err(AppError::internal)?,
            priority: value.priority.parse().map_err(AppError::internal)?,
            assignee_id: value.assignee_id,
            creator_id: value.creator_id,
            due_date: value.due_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Task as it appears in listings, with the names a board needs to render it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskSummary {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<UserRef>,
    pub creator: UserRef,
    pub project_name: String,
    pub milestone_name: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTaskSummary {
    #[sqlx(flatten)]
    pub task: DbTask,
    pub assignee_first_name: Option<String>,
    pub assignee_last_name: Option<String>,
    pub creator_first_name: String,
    pub creator_last_name: String,
    pub project_name: String,
    pub milestone_name: Option<String>,
    pub comment_count: i64,
}

impl TryFrom<DbTaskSummary> for TaskSummary {
    type Error = AppError;

    fn try_from(value: DbTaskSummary) -> Result<Self, Self::Error> {
        let task = Task::try_from(value.task)?;
        let assignee = match (task.assignee_id, value.assignee_first_name, value.assignee_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(UserRef {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };

        Ok(TaskSummary {
            assignee,
            creator: UserRef {
                id: task.creator_id,
                first_name: value.creator_first_name,
                last_name: value.creator_last_name,
            },
            task,
            project_name: value.project_name,
            milestone_name: value.milestone_name,
            comment_count: value.comment_count,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDetail {
    pub task: Task,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Set up CI pipeline")]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub milestone_id: Option<Uuid>,
    #[schema(format = DateTime, example = "2025-02-10T17:00:00Z")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; `null` clears the nullable fields.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Uuid>)]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Uuid>)]
    pub milestone_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

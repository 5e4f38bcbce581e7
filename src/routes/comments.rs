use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest};
use crate::utils::{non_blank, utc_now};

use super::tasks::fetch_task;

const COMMENT_SELECT: &str = "SELECT c.id, c.task_id, t.project_id, c.author_id, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, c.content, c.created_at \
     FROM comments c JOIN tasks t ON t.id = c.task_id JOIN users u ON u.id = c.author_id";

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks/{task_id}/comments",
    tag = "Comments",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("task_id" = Uuid, Path, description = "Task id")
    ),
    responses((status = 200, description = "Comments, oldest first", body = [Comment])),
    security(("bearerAuth" = []))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Comment>>> {
    state
        .access
        .check(auth.user_id, Action::ViewTask, &Resource::Task { id: task_id, project_id })
        .await?;
    fetch_task(&state.pool, project_id, task_id).await?;

    Ok(Json(fetch_task_comments(&state.pool, task_id).await?))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks/{task_id}/comments",
    tag = "Comments",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("task_id" = Uuid, Path, description = "Task id")
    ),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let id = Uuid::new_v4();
    state
        .access
        .check(
            auth.user_id,
            Action::CreateComment,
            &Resource::Comment {
                id,
                task_id,
                project_id,
                author_id: auth.user_id,
            },
        )
        .await?;
    fetch_task(&state.pool, project_id, task_id).await?;

    let content = non_blank(Some(payload.content.as_str())).ok_or_else(|| AppError::bad_request("Comment cannot be empty"))?;

    sqlx::query("INSERT INTO comments (id, task_id, author_id, content, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(task_id)
        .bind(auth.user_id)
        .bind(&content)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let comment = fetch_comment(&state.pool, task_id, id).await?;
    log_activity(&state.event_bus, "created", Some(auth.user_id), &comment);

    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/tasks/{task_id}/comments/{id}",
    tag = "Comments",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("task_id" = Uuid, Path, description = "Task id"),
        ("id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Only the author or the project owner may delete")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, task_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    // Visibility first so strangers cannot probe comment ids.
    state
        .access
        .check(auth.user_id, Action::ViewTask, &Resource::Task { id: task_id, project_id })
        .await?;

    let comment = fetch_comment(&state.pool, task_id, id).await?;
    if comment.project_id != project_id {
        return Err(AppError::not_found("Comment not found"));
    }

    state
        .access
        .check(
            auth.user_id,
            Action::DeleteComment,
            &Resource::Comment {
                id,
                task_id,
                project_id,
                author_id: comment.author_id,
            },
        )
        .await?;

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    log_activity(&state.event_bus, "deleted", Some(auth.user_id), &comment);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_task_comments(pool: &SqlitePool, task_id: Uuid) -> Result<Vec<Comment>, AppError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE c.task_id = ? ORDER BY c.created_at ASC"
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

async fn fetch_comment(pool: &SqlitePool, task_id: Uuid, id: Uuid) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ? AND c.task_id = ?"))
        .bind(id)
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

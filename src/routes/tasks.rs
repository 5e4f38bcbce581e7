use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::task::{DbTask, DbTaskSummary, Task, TaskCreateRequest, TaskDetail, TaskSummary, TaskUpdateRequest};
use crate::utils::{non_blank, utc_now};

use super::comments::fetch_task_comments;

const TASK_COLUMNS: &str = "id, project_id, milestone_id, title, description, status, priority, assignee_id, creator_id, due_date, created_at, updated_at";

const TASK_SUMMARY_SELECT: &str = "SELECT t.id, t.project_id, t.milestone_id, t.title, t.description, t.status, t.priority, \
     t.assignee_id, t.creator_id, t.due_date, t.created_at, t.updated_at, \
     a.first_name AS assignee_first_name, a.last_name AS assignee_last_name, \
     c.first_name AS creator_first_name, c.last_name AS creator_last_name, \
     p.name AS project_name, m.name AS milestone_name, \
     (SELECT COUNT(1) FROM comments cm WHERE cm.task_id = t.id) AS comment_count \
     FROM tasks t \
     JOIN projects p ON p.id = t.project_id \
     JOIN users c ON c.id = t.creator_id \
     LEFT JOIN users a ON a.id = t.assignee_id \
     LEFT JOIN milestones m ON m.id = t.milestone_id";

// Workflow order first, then most urgent, then newest.
const TASK_SUMMARY_ORDER: &str = "ORDER BY \
     CASE t.status WHEN 'TODO' THEN 0 WHEN 'IN_PROGRESS' THEN 1 WHEN 'IN_REVIEW' THEN 2 ELSE 3 END ASC, \
     CASE t.priority WHEN 'URGENT' THEN 3 WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END DESC, \
     t.created_at DESC";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Restrict the listing to one project
    pub project_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Tasks across every project visible to the caller", body = [TaskSummary]),
        (status = 404, description = "Filtered project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_my_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<Vec<TaskSummary>>> {
    if let Some(project_id) = query.project_id {
        state
            .access
            .check(auth.user_id, Action::ViewProject, &Resource::Project(project_id))
            .await?;
        return Ok(Json(fetch_project_tasks(&state.pool, project_id).await?));
    }

    let rows = sqlx::query_as::<_, DbTaskSummary>(&format!(
        "{TASK_SUMMARY_SELECT} WHERE t.project_id IN ( \
             SELECT id FROM projects WHERE owner_id = ? \
             UNION SELECT project_id FROM team_members WHERE user_id = ?) \
         {TASK_SUMMARY_ORDER}"
    ))
    .bind(auth.user_id)
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    let tasks: Vec<TaskSummary> = rows.into_iter().map(TaskSummary::try_from).collect::<Result<_, _>>()?;
    Ok(Json(tasks))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Tasks of the project", body = [TaskSummary]),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<TaskSummary>>> {
    state
        .access
        .check(auth.user_id, Action::ViewProject, &Resource::Project(project_id))
        .await?;

    Ok(Json(fetch_project_tasks(&state.pool, project_id).await?))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Missing title, assignee outside the team or foreign milestone"),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task_id = Uuid::new_v4();
    state
        .access
        .check(auth.user_id, Action::CreateTask, &Resource::Task { id: task_id, project_id })
        .await?;

    let title = non_blank(Some(payload.title.as_str())).ok_or_else(|| AppError::bad_request("Task title is required"))?;
    state.access.check_assignee(project_id, payload.assignee_id).await?;
    ensure_milestone_in_project(&state.pool, project_id, payload.milestone_id).await?;

    let now = utc_now();
    let task = Task {
        id: task_id,
        project_id,
        milestone_id: payload.milestone_id,
        title,
        description: non_blank(payload.description.as_deref()),
        status: payload.status.unwrap_or_default(),
        priority: payload.priority.unwrap_or_default(),
        assignee_id: payload.assignee_id,
        creator_id: auth.user_id,
        due_date: payload.due_date,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"))
        .bind(task.id)
        .bind(task.project_id)
        .bind(task.milestone_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assignee_id)
        .bind(task.creator_id)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&state.pool)
        .await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &task,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task with its comments", body = TaskDetail),
        (status = 404, description = "Task missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<TaskDetail>> {
    state
        .access
        .check(auth.user_id, Action::ViewTask, &Resource::Task { id, project_id })
        .await?;

    let task = fetch_task(&state.pool, project_id, id).await?;
    let comments = fetch_task_comments(&state.pool, id).await?;

    Ok(Json(TaskDetail { task, comments }))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Task id")
    ),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Assignee outside the team or foreign milestone"),
        (status = 404, description = "Task missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    state
        .access
        .check(auth.user_id, Action::UpdateTask, &Resource::Task { id, project_id })
        .await?;

    let existing = fetch_task(&state.pool, project_id, id).await?;
    let mut task = existing.clone();

    if let Some(title) = payload.title.as_deref() {
        task.title = non_blank(Some(title)).ok_or_else(|| AppError::bad_request("Task title cannot be empty"))?;
    }
    if let Some(description) = payload.description {
        task.description = non_blank(description.as_deref());
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(assignee_id) = payload.assignee_id {
        // Validated before anything is written; a rejected assignee leaves the task untouched.
        state.access.check_assignee(project_id, assignee_id).await?;
        task.assignee_id = assignee_id;
    }
    if let Some(milestone_id) = payload.milestone_id {
        ensure_milestone_in_project(&state.pool, project_id, milestone_id).await?;
        task.milestone_id = milestone_id;
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = due_date;
    }
    task.updated_at = utc_now();

    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, assignee_id = ?, milestone_id = ?, due_date = ?, updated_at = ? \
         WHERE id = ? AND project_id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(task.assignee_id)
    .bind(task.milestone_id)
    .bind(task.due_date)
    .bind(task.updated_at)
    .bind(task.id)
    .bind(project_id)
    .execute(&state.pool)
    .await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(auth.user_id),
        &task,
        Some(&existing),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Task id")
    ),
    responses(
        (status = 204, description = "Task and its comments deleted"),
        (status = 403, description = "Caller lacks the role to delete tasks"),
        (status = 404, description = "Task missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .access
        .check(auth.user_id, Action::DeleteTask, &Resource::Task { id, project_id })
        .await?;

    let task = fetch_task(&state.pool, project_id, id).await?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM comments WHERE task_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tasks WHERE id = ? AND project_id = ?")
        .bind(id)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &task,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_project_tasks(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<TaskSummary>, AppError> {
    let rows = sqlx::query_as::<_, DbTaskSummary>(&format!(
        "{TASK_SUMMARY_SELECT} WHERE t.project_id = ? {TASK_SUMMARY_ORDER}"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TaskSummary::try_from).collect()
}

/// Loads a task through its project so ids from another project read as missing.
pub(crate) async fn fetch_task(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Task, AppError> {
    sqlx::query_as::<_, DbTask>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND project_id = ?"))
        .bind(id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))?
        .try_into()
}

async fn ensure_milestone_in_project(
    pool: &SqlitePool,
    project_id: Uuid,
    milestone_id: Option<Uuid>,
) -> Result<(), AppError> {
    let Some(milestone_id) = milestone_id else {
        return Ok(());
    };

    let owner: Option<Uuid> = sqlx::query_scalar("SELECT project_id FROM milestones WHERE id = ?")
        .bind(milestone_id)
        .fetch_optional(pool)
        .await?;

    if owner == Some(project_id) {
        Ok(())
    } else {
        Err(AppError::bad_request("Milestone does not belong to this project"))
    }
}

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
use crate::models::milestone::{Milestone, MilestoneCreateRequest, MilestoneSummary, MilestoneUpdateRequest};
use crate::utils::{non_blank, utc_now};

const MILESTONE_COLUMNS: &str = "id, project_id, name, description, due_date, is_completed, created_at, updated_at";

#[utoipa::path(
    get,
    path = "/projects/{project_id}/milestones",
    tag = "Milestones",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Milestones ordered by due date, with task counts", body = [MilestoneSummary])),
    security(("bearerAuth" = []))
)]
pub async fn list_milestones(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<MilestoneSummary>>> {
    state
        .access
        .check(auth.user_id, Action::ViewProject, &Resource::Project(project_id))
        .await?;

    Ok(Json(fetch_milestones(&state.pool, project_id).await?))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/milestones",
    tag = "Milestones",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = MilestoneCreateRequest,
    responses((status = 201, description = "Milestone created", body = Milestone)),
    security(("bearerAuth" = []))
)]
pub async fn create_milestone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<MilestoneCreateRequest>,
) -> AppResult<(StatusCode, Json<Milestone>)> {
    let id = Uuid::new_v4();
    state
        .access
        .check(auth.user_id, Action::CreateMilestone, &Resource::Milestone { id, project_id })
        .await?;

    let name = non_blank(Some(payload.name.as_str())).ok_or_else(|| AppError::bad_request("Milestone name is required"))?;
    let now = utc_now();
    let milestone = Milestone {
        id,
        project_id,
        name,
        description: non_blank(payload.description.as_deref()),
        due_date: payload.due_date,
        is_completed: false,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(&format!("INSERT INTO milestones ({MILESTONE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"))
        .bind(milestone.id)
        .bind(milestone.project_id)
        .bind(&milestone.name)
        .bind(&milestone.description)
        .bind(milestone.due_date)
        .bind(milestone.is_completed)
        .bind(milestone.created_at)
        .bind(milestone.updated_at)
        .execute(&state.pool)
        .await?;

    log_activity(&state.event_bus, "created", Some(auth.user_id), &milestone);

    Ok((StatusCode::CREATED, Json(milestone)))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/milestones/{id}",
    tag = "Milestones",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Milestone id")
    ),
    request_body = MilestoneUpdateRequest,
    responses((status = 200, description = "Milestone updated", body = Milestone)),
    security(("bearerAuth" = []))
)]
pub async fn update_milestone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MilestoneUpdateRequest>,
) -> AppResult<Json<Milestone>> {
    state
        .access
        .check(auth.user_id, Action::UpdateMilestone, &Resource::Milestone { id, project_id })
        .await?;

    let mut milestone = fetch_milestone(&state.pool, project_id, id).await?;

    if let Some(name) = payload.name.as_deref() {
        milestone.name = non_blank(Some(name)).ok_or_else(|| AppError::bad_request("Milestone name cannot be empty"))?;
    }
    if let Some(description) = payload.description {
        milestone.description = non_blank(description.as_deref());
    }
    if let Some(due_date) = payload.due_date {
        milestone.due_date = due_date;
    }
    if let Some(is_completed) = payload.is_completed {
        milestone.is_completed = is_completed;
    }
    milestone.updated_at = utc_now();

    sqlx::query(
        "UPDATE milestones SET name = ?, description = ?, due_date = ?, is_completed = ?, updated_at = ? WHERE id = ? AND project_id = ?",
    )
    .bind(&milestone.name)
    .bind(&milestone.description)
    .bind(milestone.due_date)
    .bind(milestone.is_completed)
    .bind(milestone.updated_at)
    .bind(id)
    .bind(project_id)
    .execute(&state.pool)
    .await?;

    log_activity(&state.event_bus, "updated", Some(auth.user_id), &milestone);

    Ok(Json(milestone))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/milestones/{id}",
    tag = "Milestones",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Milestone id")
    ),
    responses((status = 204, description = "Milestone deleted; its tasks are detached")),
    security(("bearerAuth" = []))
)]
pub async fn delete_milestone(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .access
        .check(auth.user_id, Action::DeleteMilestone, &Resource::Milestone { id, project_id })
        .await?;

    let milestone = fetch_milestone(&state.pool, project_id, id).await?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE tasks SET milestone_id = NULL, updated_at = ? WHERE project_id = ? AND milestone_id = ?")
        .bind(utc_now())
        .bind(project_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM milestones WHERE id = ? AND project_id = ?")
        .bind(id)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    log_activity(&state.event_bus, "deleted", Some(auth.user_id), &milestone);

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_milestones(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<MilestoneSummary>, AppError> {
    let milestones = sqlx::query_as::<_, MilestoneSummary>(&format!(
        "SELECT {MILESTONE_COLUMNS}, \
             (SELECT COUNT(1) FROM tasks t WHERE t.milestone_id = milestones.id) AS task_count \
         FROM milestones WHERE project_id = ? ORDER BY due_date IS NULL, due_date ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(milestones)
}

async fn fetch_milestone(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Milestone, AppError> {
    sqlx::query_as::<_, Milestone>(&format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ? AND project_id = ?"
    ))
    .bind(id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Milestone not found"))
}

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::member::{AddMemberRequest, DbTeamMember, MemberRole, TeamMember};
use crate::utils::utc_now;

const MEMBER_SELECT: &str = "SELECT tm.id, tm.project_id, tm.user_id, tm.role, u.first_name, u.last_name, u.email, tm.joined_at \
     FROM team_members tm JOIN users u ON u.id = tm.user_id";

#[utoipa::path(
    get,
    path = "/projects/{id}/members",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Team members", body = [TeamMember]),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<TeamMember>>> {
    state
        .access
        .check(auth.user_id, Action::ViewProject, &Resource::Project(id))
        .await?;

    Ok(Json(fetch_members(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/projects/{id}/members",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = TeamMember),
        (status = 400, description = "Ownership cannot be granted"),
        (status = 403, description = "Only the owner manages members"),
        (status = 404, description = "Project or user not found"),
        (status = 409, description = "User is already a member")
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<TeamMember>)> {
    state
        .access
        .check(auth.user_id, Action::ManageMembers, &Resource::Project(id))
        .await?;

    let role = payload.role.unwrap_or(MemberRole::Member);
    if role == MemberRole::Owner {
        return Err(AppError::bad_request("Ownership cannot be granted through membership"));
    }

    let email = payload.email.trim().to_lowercase();
    let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("No user with that email"))?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM team_members WHERE project_id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("User is already a member of this project"));
    }

    let member_id = Uuid::new_v4();
    sqlx::query("INSERT INTO team_members (id, project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)")
        .bind(member_id)
        .bind(id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(utc_now())
        .execute(&state.pool)
        .await
        .map_err(|err| {
            if err.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::conflict("User is already a member of this project")
            } else {
                AppError::from(err)
            }
        })?;

    let member = fetch_member(&state.pool, id, user_id).await?;

    tracing::info!(project_id = %id, user_id = %user_id, role = %member.role, "team member added");
    log_activity_with_context(
        &state.event_bus,
        "added",
        Some(auth.user_id),
        &member,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}/members/{user_id}",
    tag = "Members",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "User id of the member")
    ),
    responses(
        (status = 204, description = "Member removed and unassigned from the project's tasks"),
        (status = 400, description = "The owner cannot be removed"),
        (status = 403, description = "Only the owner manages members"),
        (status = 404, description = "Project or membership not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .access
        .check(auth.user_id, Action::ManageMembers, &Resource::Project(id))
        .await?;

    let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    if owner_id == user_id {
        return Err(AppError::bad_request("The project owner cannot be removed"));
    }

    let member = fetch_member(&state.pool, id, user_id).await?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE tasks SET assignee_id = NULL, updated_at = ? WHERE project_id = ? AND assignee_id = ?")
        .bind(utc_now())
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM team_members WHERE project_id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(project_id = %id, user_id = %user_id, "team member removed");
    log_activity_with_context(
        &state.event_bus,
        "removed",
        Some(auth.user_id),
        &member,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_members(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
    let rows = sqlx::query_as::<_, DbTeamMember>(&format!(
        "{MEMBER_SELECT} WHERE tm.project_id = ? ORDER BY tm.joined_at ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TeamMember::try_from).collect()
}

async fn fetch_member(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> Result<TeamMember, AppError> {
    sqlx::query_as::<_, DbTeamMember>(&format!("{MEMBER_SELECT} WHERE tm.project_id = ? AND tm.user_id = ?"))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Team member not found"))?
        .try_into()
}

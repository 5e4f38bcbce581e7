use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::user::{Profile, ProfileCounts, ProfileUpdateRequest, User};
use crate::utils::{change_password, non_blank, utc_now};

use super::auth::fetch_user_by_id;

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses((status = 200, description = "Profile with project and task counts", body = Profile)),
    security(("bearerAuth" = []))
)]
pub async fn get_profile(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Profile>> {
    let user: User = fetch_user_by_id(&state.pool, auth.user_id).await?.try_into()?;
    let counts = profile_counts(&state.pool, user.id).await?;

    Ok(Json(Profile { user, counts }))
}

#[utoipa::path(
    put,
    path = "/users/me",
    tag = "Users",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Invalid name or rejected password change")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<ProfileUpdateRequest>,
) -> AppResult<Json<Profile>> {
    state
        .access
        .check(auth.user_id, Action::UpdateProfile, &Resource::User(auth.user_id))
        .await?;

    let db_user = fetch_user_by_id(&state.pool, auth.user_id).await?;

    // Validate the password change before touching the row.
    let new_hash = match payload.new_password.as_deref() {
        Some(new_password) => Some(change_password(
            db_user.password_hash.as_deref(),
            payload.current_password.as_deref(),
            new_password,
        )?),
        None => None,
    };

    let existing: User = db_user.try_into()?;
    let mut user = existing.clone();

    if let Some(first_name) = payload.first_name.as_deref() {
        user.first_name = non_blank(Some(first_name)).ok_or_else(|| AppError::bad_request("first name cannot be empty"))?;
    }
    if let Some(last_name) = payload.last_name.as_deref() {
        user.last_name = non_blank(Some(last_name)).ok_or_else(|| AppError::bad_request("last name cannot be empty"))?;
    }
    user.updated_at = utc_now();

    sqlx::query(
        "UPDATE users SET first_name = ?, last_name = ?, password_hash = COALESCE(?, password_hash), updated_at = ? WHERE id = ?",
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&new_hash)
    .bind(user.updated_at)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let context = RequestContext::from_headers(&headers);
    log_activity_with_context(&state.event_bus, "updated", Some(user.id), &user, Some(&existing), Some(context));
    if new_hash.is_some() {
        tracing::info!(user_id = %user.id, "password changed");
        log_activity(&state.event_bus, "password_changed", Some(user.id), &user);
    }

    let counts = profile_counts(&state.pool, user.id).await?;
    Ok(Json(Profile { user, counts }))
}

async fn profile_counts(pool: &SqlitePool, user_id: Uuid) -> AppResult<ProfileCounts> {
    let owned_projects: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM projects WHERE owner_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    let memberships: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM team_members WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    let assigned_tasks: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM tasks WHERE assignee_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(ProfileCounts {
        owned_projects,
        memberships,
        assigned_tasks,
    })
}

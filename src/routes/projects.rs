use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::db::projects::{self as project_store, NewProject, PROJECT_COLUMNS};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::activity::ActivityEntry;
use crate::models::project::{
    DbProject, DbProjectSummary, Project, ProjectCreateRequest, ProjectDetail, ProjectSummary, ProjectUpdateRequest,
};
use crate::utils::{non_blank, utc_now};

use super::members::fetch_members;
use super::milestones::fetch_milestones;
use super::tasks::fetch_project_tasks;

const ACTIVITY_LIMIT: i64 = 100;

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses((status = 200, description = "Projects the caller owns or belongs to, with owner and counts", body = [ProjectSummary])),
    security(("bearerAuth" = []))
)]
pub async fn list_projects(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<ProjectSummary>>> {
    let projects = sqlx::query_as::<_, DbProjectSummary>(
        "SELECT p.id, p.owner_id, p.name, p.description, p.status, p.start_date, p.end_date, p.created_at, p.updated_at, \
             u.first_name AS owner_first_name, u.last_name AS owner_last_name, \
             (SELECT COUNT(1) FROM team_members tm WHERE tm.project_id = p.id) AS member_count, \
             (SELECT COUNT(1) FROM tasks t WHERE t.project_id = p.id) AS task_count, \
             (SELECT COUNT(1) FROM milestones m WHERE m.project_id = p.id) AS milestone_count \
         FROM projects p JOIN users u ON u.id = p.owner_id \
         WHERE p.owner_id = ? OR EXISTS (SELECT 1 FROM team_members tm WHERE tm.project_id = p.id AND tm.user_id = ?) \
         ORDER BY p.updated_at DESC",
    )
    .bind(auth.user_id)
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    let projects: Vec<ProjectSummary> = projects
        .into_iter()
        .map(ProjectSummary::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(projects))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created with the caller as owner", body = Project),
        (status = 400, description = "Missing name or inverted dates")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    state
        .access
        .check(auth.user_id, Action::CreateProject, &Resource::NewProject)
        .await?;

    let name = non_blank(Some(payload.name.as_str())).ok_or_else(|| AppError::bad_request("Project name is required"))?;
    let description = non_blank(payload.description.as_deref());
    validate_dates(payload.start_date, payload.end_date)?;

    let project = project_store::create_with_owner(
        &state.pool,
        auth.user_id,
        NewProject {
            name: &name,
            description: description.as_deref(),
            start_date: payload.start_date,
            end_date: payload.end_date,
        },
    )
    .await?;
    let project: Project = project.try_into()?;

    tracing::info!(project_id = %project.id, owner_id = %auth.user_id, "project created");
    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &project,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project with members, tasks and milestones", body = ProjectDetail),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProjectDetail>> {
    state
        .access
        .check(auth.user_id, Action::ViewProject, &Resource::Project(id))
        .await?;

    let project: Project = fetch_project(&state.pool, id).await?.try_into()?;
    let members = fetch_members(&state.pool, id).await?;
    let tasks = fetch_project_tasks(&state.pool, id).await?;
    let milestones = fetch_milestones(&state.pool, id).await?;

    Ok(Json(ProjectDetail {
        project,
        members,
        tasks,
        milestones,
    }))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 403, description = "Caller lacks the role to edit"),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    state
        .access
        .check(auth.user_id, Action::UpdateProject, &Resource::Project(id))
        .await?;

    let existing: Project = fetch_project(&state.pool, id).await?.try_into()?;
    let mut project = existing.clone();

    if let Some(name) = payload.name.as_deref() {
        project.name = non_blank(Some(name)).ok_or_else(|| AppError::bad_request("Project name cannot be empty"))?;
    }
    if let Some(description) = payload.description {
        project.description = non_blank(description.as_deref());
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(start_date) = payload.start_date {
        project.start_date = start_date;
    }
    if let Some(end_date) = payload.end_date {
        project.end_date = end_date;
    }
    validate_dates(project.start_date, project.end_date)?;

    project.updated_at = utc_now();

    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, status = ?, start_date = ?, end_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(project.updated_at)
    .bind(project.id)
    .execute(&state.pool)
    .await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(auth.user_id),
        &project,
        Some(&existing),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project and everything it scopes deleted"),
        (status = 403, description = "Only the owner may delete"),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .access
        .check(auth.user_id, Action::DeleteProject, &Resource::Project(id))
        .await?;

    let project: Project = fetch_project(&state.pool, id).await?.try_into()?;

    if project_store::delete_cascade(&state.pool, id).await? == 0 {
        return Err(AppError::not_found("Project not found"));
    }

    tracing::info!(project_id = %id, actor = %auth.user_id, "project deleted");
    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &project,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/projects/{id}/activity",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Recent project activity, newest first", body = [ActivityEntry]),
        (status = 404, description = "Project missing or not visible to the caller")
    ),
    security(("bearerAuth" = []))
)]
pub async fn project_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    state
        .access
        .check(auth.user_id, Action::ViewProject, &Resource::Project(id))
        .await?;

    let entries = sqlx::query_as::<_, ActivityEntry>(
        "SELECT id, event_name, description, actor_id, subject_id, occurred_at, severity \
         FROM activity_log WHERE project_id = ? ORDER BY occurred_at DESC LIMIT ?",
    )
    .bind(id)
    .bind(ACTIVITY_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}

pub(crate) async fn fetch_project(pool: &SqlitePool, id: Uuid) -> Result<DbProject, AppError> {
    sqlx::query_as::<_, DbProject>(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))
}

fn validate_dates(
    start_date: Option<chrono::DateTime<chrono::Utc>>,
    end_date: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(), AppError> {
    match (start_date, end_date) {
        (Some(start), Some(end)) if end < start => Err(AppError::bad_request("End date must not be before start date")),
        _ => Ok(()),
    }
}

//! Project writes that must land atomically.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::member::MemberRole;
use crate::models::project::DbProject;
use crate::utils::utc_now;

pub const PROJECT_COLUMNS: &str =
    "id, owner_id, name, description, status, start_date, end_date, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewProject<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Inserts the project and its owner's `OWNER` membership in one transaction.
/// If either insert fails, neither row survives.
pub async fn create_with_owner(pool: &SqlitePool, owner_id: Uuid, new: NewProject<'_>) -> Result<DbProject, sqlx::Error> {
    let project_id = Uuid::new_v4();
    let now = utc_now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, owner_id, name, description, status, start_date, end_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'PLANNING', ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(owner_id)
    .bind(new.name)
    .bind(new.description)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO team_members (id, project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)")
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(owner_id)
        .bind(MemberRole::Owner.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let project = sqlx::query_as::<_, DbProject>(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(project_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(project)
}

/// Deletes the project and everything it scopes. Returns the number of
/// project rows removed (0 when it was already gone).
pub async fn delete_cascade(pool: &SqlitePool, project_id: Uuid) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM comments WHERE task_id IN (SELECT id FROM tasks WHERE project_id = ?)")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tasks WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM milestones WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM team_members WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    let affected = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(affected.rows_affected())
}

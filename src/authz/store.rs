use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::member::MemberRole;

/// A user's standing within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub role: MemberRole,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("membership store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("corrupt membership record: {0}")]
    Corrupt(String),
}

/// Read-only view over project ownership and team membership.
///
/// Implementations must answer from the latest committed state; the evaluator
/// relies on revocations being visible to the very next lookup.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_membership(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, StoreError>;

    /// `None` when the project does not exist.
    async fn get_owner(&self, project_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    async fn list_members(&self, project_id: Uuid) -> Result<HashSet<Uuid>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteMembershipStore {
    pool: SqlitePool,
}

impl SqliteMembershipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for SqliteMembershipStore {
    async fn get_membership(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM team_members WHERE project_id = ? AND user_id = ?")
                .bind(project_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        role.map(|r| {
            r.parse::<MemberRole>()
                .map(|role| Membership { role })
                .map_err(StoreError::Corrupt)
        })
        .transpose()
    }

    async fn get_owner(&self, project_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn list_members(&self, project_id: Uuid) -> Result<HashSet<Uuid>, StoreError> {
        let members = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM team_members WHERE project_id = ?")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(members.into_iter().collect())
    }
}

//! Authorization module - access control for projects and everything they scope
//!
//! One evaluator answers every handler's question "may this actor do this to
//! that resource?" from ownership and team membership alone:
//! - read access is membership based (owner or any team member)
//! - collaborative mutations (tasks, milestones, project fields) need a membership
//! - destructive project-level actions are owner only
//!
//! Outcomes distinguish an actor with no visibility (`Invisible`, reported as
//! not found) from a member lacking the elevated right (`InsufficientRole`),
//! and both from a lookup failure (`Indeterminate`), which callers must treat
//! as a denial.

mod evaluator;
mod resource;
mod store;

pub use evaluator::AccessEvaluator;
pub use resource::{Action, Resource};
pub use store::{Membership, MembershipStore, SqliteMembershipStore, StoreError};

/// The evaluator wired to the application's database.
pub type SqliteAccessEvaluator = AccessEvaluator<SqliteMembershipStore>;

#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    /// The actor has no standing to learn that the resource exists.
    #[error("resource not found")]
    Invisible,
    #[error("{0}")]
    InsufficientRole(String),
    #[error("{0}")]
    Validation(String),
    #[error("authorization could not be evaluated: {0}")]
    Indeterminate(#[from] StoreError),
}

impl AccessError {
    /// Only infrastructure trouble is worth retrying; denials are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Indeterminate(_))
    }
}

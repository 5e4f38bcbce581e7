pub mod auth;
pub mod comments;
pub mod health;
pub mod members;
pub mod milestones;
pub mod projects;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AccessEvaluator, SqliteAccessEvaluator, SqliteMembershipStore};
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{auth, comments, health, members, milestones, projects, tasks, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub access: Arc<SqliteAccessEvaluator>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let access = AccessEvaluator::new(SqliteMembershipStore::new(pool.clone()));

        Self {
            pool,
            jwt: Arc::new(jwt),
            access: Arc::new(access),
            event_bus,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let (event_bus, rx) = events::init_event_bus();
    tokio::spawn(events::start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/me", get(users::get_profile))
        .route("/me", put(users::update_profile));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id", put(projects::update_project))
        .route("/:id", delete(projects::delete_project))
        .route("/:id/activity", get(projects::project_activity))
        .route("/:id/members", get(members::list_members))
        .route("/:id/members", post(members::add_member))
        .route("/:id/members/:user_id", delete(members::remove_member));

    // Everything below is scoped to a project: /projects/:project_id/...
    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/", post(tasks::create_task))
        .route("/:id", get(tasks::get_task))
        .route("/:id", put(tasks::update_task))
        .route("/:id", delete(tasks::delete_task));

    let comment_routes = Router::new()
        .route("/", get(comments::list_comments))
        .route("/", post(comments::create_comment))
        .route("/:id", delete(comments::delete_comment));

    let milestone_routes = Router::new()
        .route("/", get(milestones::list_milestones))
        .route("/", post(milestones::create_milestone))
        .route("/:id", put(milestones::update_milestone))
        .route("/:id", delete(milestones::delete_milestone));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/tasks", get(tasks::list_my_tasks))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/projects/:project_id/tasks", task_routes)
        .nest("/projects/:project_id/tasks/:task_id/comments", comment_routes)
        .nest("/projects/:project_id/milestones", milestone_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::logout,
		routes::users::get_profile,
		routes::users::update_profile,
		routes::projects::list_projects,
		routes::projects::create_project,
		routes::projects::get_project,
		routes::projects::update_project,
		routes::projects::delete_project,
		routes::projects::project_activity,
		routes::members::list_members,
		routes::members::add_member,
		routes::members::remove_member,
		routes::tasks::list_my_tasks,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::tasks::get_task,
		routes::tasks::update_task,
		routes::tasks::delete_task,
		routes::milestones::list_milestones,
		routes::milestones::create_milestone,
		routes::milestones::update_milestone,
		routes::milestones::delete_milestone,
		routes::comments::list_comments,
		routes::comments::create_comment,
		routes::comments::delete_comment
	),
	components(
		schemas(
			routes::health::HealthResponse,
			routes::auth::MessageResponse,
			models::user::User,
			models::user::UserRole,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::Profile,
			models::user::ProfileCounts,
			models::user::ProfileUpdateRequest,
			models::user::UserRef,
			models::project::Project,
			models::project::ProjectStatus,
			models::project::ProjectDetail,
			models::project::ProjectSummary,
			models::project::ProjectCreateRequest,
			models::project::ProjectUpdateRequest,
			models::member::MemberRole,
			models::member::TeamMember,
			models::member::AddMemberRequest,
			models::task::Task,
			models::task::TaskStatus,
			models::task::TaskPriority,
			models::task::TaskDetail,
			models::task::TaskSummary,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::milestone::Milestone,
			models::milestone::MilestoneSummary,
			models::milestone::MilestoneCreateRequest,
			models::milestone::MilestoneUpdateRequest,
			models::comment::Comment,
			models::comment::CommentCreateRequest,
			models::activity::ActivityEntry
		)
	),
	modifiers(&BearerAuth),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Registration and credential login"),
		(name = "Users", description = "The caller's own profile"),
		(name = "Projects", description = "Capstone projects and their activity"),
		(name = "Members", description = "Project team membership"),
		(name = "Tasks", description = "Project tasks"),
		(name = "Milestones", description = "Project milestones"),
		(name = "Comments", description = "Task discussion")
	)
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme so Swagger UI offers the Authorize dialog.
struct BearerAuth;

impl Modify for BearerAuth {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		if let Some(components) = openapi.components.as_mut() {
			components.add_security_scheme(
				"bearerAuth",
				SecurityScheme::Http(
					HttpBuilder::new()
						.scheme(HttpAuthScheme::Bearer)
						.bearer_format("JWT")
						.build(),
				),
			);
		}
	}
}

pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
	let mut doc = ApiDoc::openapi();
	doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
	doc
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	Router::new().merge(
		SwaggerUi::new("/docs")
			.url("/api-docs/openapi.json", doc)
			.config(swagger_config),
	)
}

#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use capstone_tracker::create_app;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    migrator().await?.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp { app, pool, _dir: dir })
}

pub async fn migrator() -> Result<Migrator> {
    Ok(Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?)
}

impl TestApp {
    /// Sends a request and returns the status with the decoded JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, value))
    }

    /// Registers a student and returns `(token, user_id)`.
    pub async fn register(&self, first_name: &str, email: &str) -> Result<(String, String)> {
        let body = serde_json::json!({
            "first_name": first_name,
            "last_name": "Tester",
            "email": email,
            "password": "password123"
        });
        let (status, value) = self.send("POST", "/auth/register", None, Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", value);

        let token = value["token"].as_str().context("missing token")?.to_string();
        let user_id = value["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, user_id))
    }

    /// Creates a project as the given user and returns its id.
    pub async fn create_project(&self, token: &str, name: &str) -> Result<String> {
        let (status, value) = self
            .send("POST", "/projects", Some(token), Some(serde_json::json!({ "name": name })))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", value);
        Ok(value["id"].as_str().context("missing project id")?.to_string())
    }

    pub async fn add_member(&self, owner_token: &str, project_id: &str, email: &str) -> Result<()> {
        let (status, value) = self
            .send(
                "POST",
                &format!("/projects/{}/members", project_id),
                Some(owner_token),
                Some(serde_json::json!({ "email": email })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "add member failed: {}", value);
        Ok(())
    }

    pub async fn create_task(&self, token: &str, project_id: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send("POST", &format!("/projects/{}/tasks", project_id), Some(token), Some(body))
            .await
    }
}

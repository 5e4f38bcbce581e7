mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::spawn_app;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let t = spawn_app().await?;

    let (status, v) = t.send("GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK, "health endpoint did not return 200");

    let db_ok = v.get("db_ok").and_then(|b| b.as_bool()).unwrap_or(false);
    assert!(db_ok, "expected db_ok: true, got: {}", v);
    assert_eq!(v["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let t = spawn_app().await?;

    for (method, uri) in [("GET", "/projects"), ("GET", "/tasks"), ("GET", "/users/me"), ("POST", "/auth/logout")] {
        let (status, body) = t.send(method, uri, None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} should require auth", method, uri);
        assert_eq!(body["error"], "unauthorized");
    }

    Ok(())
}

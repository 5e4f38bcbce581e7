mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn creating_a_project_records_owner_membership() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, owner_id) = t.register("Owner", "owner@student.edu").await?;

    let (status, _) = t
        .send("POST", "/projects", Some(&owner), Some(json!({ "name": "   " })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .send(
            "POST",
            "/projects",
            Some(&owner),
            Some(json!({
                "name": "Backwards",
                "start_date": "2025-04-30T00:00:00Z",
                "end_date": "2025-01-15T00:00:00Z"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, project) = t
        .send("POST", "/projects", Some(&owner), Some(json!({ "name": "  Capstone  " })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["name"], "Capstone");
    assert_eq!(project["status"], "PLANNING");
    assert_eq!(project["owner_id"], owner_id.as_str());

    let (_, members) = t
        .send(
            "GET",
            &format!("/projects/{}/members", project["id"].as_str().context("missing id")?),
            Some(&owner),
            None,
        )
        .await?;
    let members = members.as_array().context("members not an array")?;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["role"], "OWNER");
    assert_eq!(members[0]["user_id"], owner_id.as_str());

    Ok(())
}

#[tokio::test]
async fn failed_owner_membership_rolls_back_project() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;

    sqlx::query("CREATE TRIGGER fail_member BEFORE INSERT ON team_members BEGIN SELECT RAISE(ABORT, 'boom'); END;")
        .execute(&t.pool)
        .await?;

    let (status, body) = t
        .send("POST", "/projects", Some(&owner), Some(json!({ "name": "Doomed" })))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database");

    let projects: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM projects")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(projects, 0, "project row must not outlive its failed owner membership");

    Ok(())
}

#[tokio::test]
async fn deleting_a_project_removes_everything_it_scopes() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    t.register("Member", "member@student.edu").await?;
    let project_id = t.create_project(&owner, "Short lived").await?;
    t.add_member(&owner, &project_id, "member@student.edu").await?;

    let (_, milestone) = t
        .send(
            "POST",
            &format!("/projects/{}/milestones", project_id),
            Some(&owner),
            Some(json!({ "name": "Phase 1" })),
        )
        .await?;
    let (_, task) = t
        .create_task(&owner, &project_id, json!({ "title": "Build", "milestone_id": milestone["id"] }))
        .await?;
    let (status, _) = t
        .send(
            "POST",
            &format!("/projects/{}/tasks/{}/comments", project_id, task["id"].as_str().context("missing task id")?),
            Some(&owner),
            Some(json!({ "content": "first" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = t
        .send("DELETE", &format!("/projects/{}", project_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for table in ["projects", "team_members", "milestones", "tasks", "comments"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {}", table))
            .fetch_one(&t.pool)
            .await?;
        assert_eq!(count, 0, "{} should be empty after project delete", table);
    }

    Ok(())
}

#[tokio::test]
async fn deleting_a_milestone_detaches_its_tasks() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let project_id = t.create_project(&owner, "Milestones").await?;
    let milestones_uri = format!("/projects/{}/milestones", project_id);

    let (status, milestone) = t
        .send("POST", &milestones_uri, Some(&owner), Some(json!({ "name": "Alpha", "due_date": "2025-02-15T00:00:00Z" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(milestone["is_completed"], false);
    let milestone_uri = format!("{}/{}", milestones_uri, milestone["id"].as_str().context("missing id")?);

    let (status, updated) = t
        .send("PUT", &milestone_uri, Some(&owner), Some(json!({ "is_completed": true, "description": "done" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_completed"], true);
    assert_eq!(updated["description"], "done");

    let (_, task) = t
        .create_task(&owner, &project_id, json!({ "title": "Tied", "milestone_id": milestone["id"] }))
        .await?;
    assert_eq!(task["milestone_id"], milestone["id"]);

    // Backdate the task so the detach has to move updated_at forward.
    sqlx::query("UPDATE tasks SET updated_at = ?")
        .bind(chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")?.with_timezone(&chrono::Utc))
        .execute(&t.pool)
        .await?;

    let (status, _) = t.send("DELETE", &milestone_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, tasks) = t
        .send("GET", &format!("/projects/{}/tasks", project_id), Some(&owner), None)
        .await?;
    let tasks = tasks.as_array().context("tasks not an array")?;
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0]["milestone_id"].is_null());
    assert!(tasks[0]["milestone_name"].is_null());
    let updated_at = tasks[0]["updated_at"].as_str().context("missing updated_at")?;
    assert!(!updated_at.starts_with("2020-01-01"), "detach left updated_at at {updated_at}");

    Ok(())
}

#[tokio::test]
async fn store_outage_fails_closed() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let project_id = t.create_project(&owner, "Outage").await?;

    t.pool.close().await;

    let (status, body) = t
        .send("GET", &format!("/projects/{}", project_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "indeterminate");

    let (status, body) = t
        .send("DELETE", &format!("/projects/{}", project_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "indeterminate");

    Ok(())
}

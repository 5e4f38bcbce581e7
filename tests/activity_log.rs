mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;

use capstone_tracker::events::chain_hash;
use common::spawn_app;

#[tokio::test]
async fn test_activity_log_flow() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Audit", "audit@student.edu").await?;
    let (stranger, _) = t.register("Stranger", "stranger@student.edu").await?;
    let project_id = t.create_project(&owner, "Audited").await?;

    let (status, task) = t.create_task(&owner, &project_id, json!({ "title": "Audit this task" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let task_uri = format!("/projects/{}/tasks/{}", project_id, task["id"].as_str().context("missing task id")?);

    let (status, _) = t
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "status": "DONE" })))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t.send("DELETE", &task_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The listener is async, so poll until the projection catches up.
    let mut rows: Vec<(String, String, String)> = Vec::new();
    for _ in 0..15 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        rows = sqlx::query_as("SELECT event_name, description, severity FROM activity_log WHERE event_name LIKE 'task.%' ORDER BY rowid")
            .fetch_all(&t.pool)
            .await?;
        if rows.len() >= 3 {
            break;
        }
    }

    assert_eq!(rows.len(), 3, "expected created/updated/deleted, got {:?}", rows);
    assert_eq!(rows[0], ("task.created".to_string(), "Task created".to_string(), "important".to_string()));
    assert_eq!(rows[1].0, "task.updated");
    assert_eq!(rows[2].0, "task.deleted");
    assert_eq!(rows[2].2, "critical");

    let (status, entries) = t
        .send("GET", &format!("/projects/{}/activity", project_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = entries
        .as_array()
        .context("activity not an array")?
        .iter()
        .filter_map(|e| e["event_name"].as_str())
        .collect();
    assert!(names.contains(&"project.created"));
    assert!(names.contains(&"task.deleted"));

    let (status, _) = t
        .send("GET", &format!("/projects/{}/activity", project_id), Some(&stranger), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn event_store_rows_form_a_hash_chain() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Chain", "chain@student.edu").await?;
    let project_id = t.create_project(&owner, "Chained").await?;
    t.create_task(&owner, &project_id, json!({ "title": "One" })).await?;
    t.create_task(&owner, &project_id, json!({ "title": "Two" })).await?;

    // user.registered + project.created + 2 x task.created
    let mut chain: Vec<(String, Option<String>, String)> = Vec::new();
    for _ in 0..15 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        chain = sqlx::query_as("SELECT payload, prev_hash, hash FROM event_store ORDER BY rowid")
            .fetch_all(&t.pool)
            .await?;
        if chain.len() >= 4 {
            break;
        }
    }
    assert_eq!(chain.len(), 4);

    assert!(chain[0].1.is_none());
    for (i, (payload, prev_hash, hash)) in chain.iter().enumerate() {
        if i > 0 {
            assert_eq!(prev_hash.as_deref(), Some(chain[i - 1].2.as_str()));
        }
        assert_eq!(hash, &chain_hash(prev_hash.as_deref(), payload));
    }

    Ok(())
}

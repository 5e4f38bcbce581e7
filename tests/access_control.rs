mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn member_collaborates_but_cannot_delete_project() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Xavier", "x@student.edu").await?;
    let (member, _) = t.register("Yara", "y@student.edu").await?;
    let (stranger, _) = t.register("Zed", "z@student.edu").await?;

    let project_id = t.create_project(&owner, "P1").await?;
    t.add_member(&owner, &project_id, "y@student.edu").await?;
    let project_uri = format!("/projects/{}", project_id);

    // The member sees the project and appears in its team list.
    let (status, detail) = t.send("GET", &project_uri, Some(&member), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["members"].as_array().map(Vec::len), Some(2));

    let (status, task) = t
        .create_task(&member, &project_id, json!({ "title": "Write proposal" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().context("missing task id")?.to_string();

    let (status, updated) = t
        .send("PUT", &project_uri, Some(&member), Some(json!({ "status": "IN_PROGRESS" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "IN_PROGRESS");

    // Delete is owner only: the member is told why, not that the project is missing.
    let (status, body) = t.send("DELETE", &project_uri, Some(&member), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // A plain membership is enough to delete a task.
    let (status, _) = t
        .send("DELETE", &format!("/projects/{}/tasks/{}", project_id, task_id), Some(&member), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // A stranger cannot tell the project exists.
    for (method, body) in [("GET", None), ("PUT", Some(json!({ "name": "Hijacked" }))), ("DELETE", None)] {
        let (status, value) = t.send(method, &project_uri, Some(&stranger), body).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} should be hidden from strangers", method);
        assert_eq!(value["error"], "not_found");
    }

    let (status, projects) = t.send("GET", "/projects", Some(&stranger), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(projects.as_array().map(Vec::len), Some(0));

    let (status, _) = t.send("DELETE", &project_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.send("GET", &project_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn stranger_and_unknown_project_are_indistinguishable() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let (stranger, _) = t.register("Stranger", "stranger@student.edu").await?;
    let project_id = t.create_project(&owner, "Hidden").await?;

    let (hidden_status, hidden) = t
        .send("GET", &format!("/projects/{}/tasks", project_id), Some(&stranger), None)
        .await?;
    let (missing_status, missing) = t
        .send("GET", &format!("/projects/{}/tasks", uuid::Uuid::new_v4()), Some(&stranger), None)
        .await?;

    assert_eq!(hidden_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(hidden, missing);

    let (status, _) = t
        .create_task(&stranger, &project_id, json!({ "title": "Sneaky" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn instructor_role_claim_grants_no_project_access() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let (_, stranger_id) = t.register("Stranger", "stranger@student.edu").await?;
    let project_id = t.create_project(&owner, "Hidden").await?;

    // Same subject, but the token claims an instructor role.
    let jwt = capstone_tracker::jwt::JwtConfig::new("test-secret", 1);
    let token = jwt.encode(stranger_id.parse()?, capstone_tracker::models::user::UserRole::Instructor)?;

    let project_uri = format!("/projects/{}", project_id);
    let (status, _) = t.send("GET", &project_uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.send("DELETE", &project_uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, projects) = t.send("GET", "/projects", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(projects.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn assignee_must_be_a_project_member() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, owner_id) = t.register("Owner", "owner@student.edu").await?;
    let (_, outsider_id) = t.register("Outsider", "outsider@student.edu").await?;
    let project_id = t.create_project(&owner, "Assignments").await?;

    let (status, body) = t
        .create_task(&owner, &project_id, json!({ "title": "Spec", "assignee_id": outsider_id }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "bad request: Assignee is not a member of this project");

    let (status, task) = t.create_task(&owner, &project_id, json!({ "title": "Spec" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let task_uri = format!("/projects/{}/tasks/{}", project_id, task["id"].as_str().context("missing task id")?);

    let (status, _) = t
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "assignee_id": outsider_id, "title": "Renamed" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The rejected update left the task untouched.
    let (status, detail) = t.send("GET", &task_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(detail["task"]["assignee_id"].is_null());
    assert_eq!(detail["task"]["title"], "Spec");

    let (status, task) = t
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "assignee_id": owner_id })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["assignee_id"], owner_id.as_str());

    let (status, task) = t
        .send("PUT", &task_uri, Some(&owner), Some(json!({ "assignee_id": null })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(task["assignee_id"].is_null());

    Ok(())
}

#[tokio::test]
async fn only_owner_manages_members() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, owner_id) = t.register("Owner", "owner@student.edu").await?;
    let (member, member_id) = t.register("Member", "member@student.edu").await?;
    t.register("Late", "late@student.edu").await?;
    let project_id = t.create_project(&owner, "Team").await?;
    t.add_member(&owner, &project_id, "Member@Student.edu").await?;
    let members_uri = format!("/projects/{}/members", project_id);

    let (status, _) = t
        .send("POST", &members_uri, Some(&member), Some(json!({ "email": "late@student.edu" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send("POST", &members_uri, Some(&owner), Some(json!({ "email": "member@student.edu" })))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .send("POST", &members_uri, Some(&owner), Some(json!({ "email": "nobody@student.edu" })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send("POST", &members_uri, Some(&owner), Some(json!({ "email": "late@student.edu", "role": "OWNER" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .send("DELETE", &format!("{}/{}", members_uri, owner_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Removing a member drops their assignments and their visibility.
    let (status, task) = t
        .create_task(&owner, &project_id, json!({ "title": "Assigned", "assignee_id": member_id }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().context("missing task id")?.to_string();

    let (status, _) = t
        .send("DELETE", &format!("{}/{}", members_uri, member_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, detail) = t
        .send("GET", &format!("/projects/{}/tasks/{}", project_id, task_id), Some(&owner), None)
        .await?;
    assert!(detail["task"]["assignee_id"].is_null());

    let (status, _) = t.send("GET", &format!("/projects/{}", project_id), Some(&member), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn comment_deletion_is_limited_to_author_and_owner() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let (alice, _) = t.register("Alice", "alice@student.edu").await?;
    let (bob, _) = t.register("Bob", "bob@student.edu").await?;
    let project_id = t.create_project(&owner, "Discussion").await?;
    t.add_member(&owner, &project_id, "alice@student.edu").await?;
    t.add_member(&owner, &project_id, "bob@student.edu").await?;

    let (_, task) = t.create_task(&owner, &project_id, json!({ "title": "Review" })).await?;
    let comments_uri = format!(
        "/projects/{}/tasks/{}/comments",
        project_id,
        task["id"].as_str().context("missing task id")?
    );

    let (status, _) = t
        .send("POST", &comments_uri, Some(&alice), Some(json!({ "content": "   " })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = t
        .send("POST", &comments_uri, Some(&alice), Some(json!({ "content": "  Looks good  " })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["content"], "Looks good");
    assert_eq!(comment["author_first_name"], "Alice");
    let comment_uri = format!("{}/{}", comments_uri, comment["id"].as_str().context("missing comment id")?);

    let (status, _) = t.send("DELETE", &comment_uri, Some(&bob), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.send("DELETE", &comment_uri, Some(&owner), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, comment) = t
        .send("POST", &comments_uri, Some(&bob), Some(json!({ "content": "Mine" })))
        .await?;
    let comment_uri = format!("{}/{}", comments_uri, comment["id"].as_str().context("missing comment id")?);
    let (status, _) = t.send("DELETE", &comment_uri, Some(&bob), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, comments) = t.send("GET", &comments_uri, Some(&alice), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn task_ids_are_scoped_to_their_project() -> Result<()> {
    let t = spawn_app().await?;
    let (owner, _) = t.register("Owner", "owner@student.edu").await?;
    let first = t.create_project(&owner, "First").await?;
    let second = t.create_project(&owner, "Second").await?;

    let (_, task) = t.create_task(&owner, &first, json!({ "title": "Lives in first" })).await?;
    let task_id = task["id"].as_str().context("missing task id")?;

    let (status, _) = t
        .send("GET", &format!("/projects/{}/tasks/{}", second, task_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send("DELETE", &format!("/projects/{}/tasks/{}", second, task_id), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A milestone from another project cannot be attached.
    let (status, milestone) = t
        .send("POST", &format!("/projects/{}/milestones", second), Some(&owner), Some(json!({ "name": "M1" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = t
        .create_task(&owner, &first, json!({ "title": "Misfiled", "milestone_id": milestone["id"] }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, all) = t.send("GET", "/tasks", Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    let (status, filtered) = t
        .send("GET", &format!("/tasks?project_id={}", second), Some(&owner), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered.as_array().map(Vec::len), Some(0));

    Ok(())
}

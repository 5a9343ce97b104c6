//! Router-level tests for the Taskboard API
//!
//! These tests drive the full router (middleware included) against the
//! in-memory store:
//! - Banner, health and security headers
//! - Registration, login and bearer authentication
//! - Project, task and comment flows with access checks
//! - Notifications, dashboard and admin endpoints
//! - Live events reaching hub connections

mod common;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, StatusCode};
use common::{read_json, test_config, TestContext, TEST_PASSWORD};
use serde_json::json;
use taskboard_shared::events::Room;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_banner_and_health() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project Management API");
    assert_eq!(body["environment"], "development");

    let (status, body) = ctx.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "memory connected");
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let ctx = TestContext::new();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = ctx.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": " Ada@Example.com ", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "member");
    assert!(body["token"].is_string());

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = read_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_admin_role() {
    let ctx = TestContext::new();
    let payload = json!({ "name": "Bo", "email": "bo@example.com", "password": "pw" });

    let (status, _) = ctx.send("POST", "/api/auth/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx.send("POST", "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Eve", "email": "eve@example.com", "password": "pw", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Cannot self-register as admin");

    let (status, body) = ctx
        .send("POST", "/api/auth/register", None, Some(json!({ "name": "Cy" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide name, email and password");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let ctx = TestContext::new();
    ctx.member("Dana").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "dana@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "dana@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token missing");

    let request = Request::builder()
        .uri("/api/projects")
        .header("authorization", "Basic abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = read_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, bad authorization format");

    let request = Request::builder()
        .uri("/api/projects")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = read_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let mut config = test_config(&[]);
    config.auth.jwt_secret = None;
    let ctx = TestContext::with_config(config);

    let request = Request::builder()
        .uri("/api/projects")
        .header("authorization", "Bearer whatever")
        .body(Body::empty())
        .unwrap();
    let (status, body) = read_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server misconfigured: missing JWT secret");
}

#[tokio::test]
async fn test_project_lifecycle_and_access() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let outsider = ctx.member("Outsider").await;

    let project_id = ctx.create_project(&owner, "Launch", &[&member]).await;
    let uri = format!("/api/projects/{}", project_id);

    let (status, body) = ctx.get(&uri, &member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Launch");
    assert_eq!(body["owner"]["name"], "Owner");
    assert_eq!(body["members"][0]["name"], "Member");

    let (status, body) = ctx.get(&uri, &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");

    let (_, list) = ctx.get("/api/projects", &outsider).await;
    assert_eq!(list.as_array().unwrap().len(), 0);

    let (status, _) = ctx.put(&uri, &member, json!({ "title": "Hijack" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .put(&uri, &owner, json!({ "title": "Launch v2", "endDate": "2030-01-31" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Launch v2");
    assert_eq!(body["endDate"], "2030-01-31T00:00:00Z");

    let (status, body) = ctx.put(&uri, &owner, json!({ "endDate": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endDate"].is_null());
}

#[tokio::test]
async fn test_invalid_ids_are_bad_requests() {
    let ctx = TestContext::new();
    let user = ctx.member("Ivy").await;

    let (status, body) = ctx.get("/api/projects/not-a-uuid", &user).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid project id");

    let (status, body) = ctx.get("/api/tasks/123", &user).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid task id");

    let (status, body) = ctx
        .get(&format!("/api/projects/{}", Uuid::new_v4()), &user)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");
}

#[tokio::test]
async fn test_task_flow_with_filters_and_delete_rights() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let outsider = ctx.member("Outsider").await;
    let project_id = ctx.create_project(&owner, "Board", &[&member]).await;

    let first = ctx
        .create_task(
            &member,
            json!({ "title": "Write docs", "project": project_id, "priority": "high" }),
        )
        .await;
    ctx.create_task(
        &owner,
        json!({ "title": "Ship it", "project": project_id, "status": "done" }),
    )
    .await;

    let (status, body) = ctx
        .post("/api/tasks", &outsider, json!({ "title": "Sneak", "project": project_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not allowed to create tasks in this project");

    let (status, body) = ctx
        .get(&format!("/api/tasks?project={}&status=done", project_id), &member)
        .await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Ship it");

    let (_, body) = ctx.get("/api/tasks?q=DOCS", &member).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = ctx.get("/api/tasks", &outsider).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let (status, body) = ctx.get("/api/tasks?status=blocked", &member).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let uri = format!("/api/tasks/{}", first);
    let (status, body) = ctx.put(&uri, &member, json!({ "status": "inprogress" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "inprogress");
    assert_eq!(body["project"]["title"], "Board");

    for blank in [json!({ "status": "" }), json!({ "priority": " " })] {
        let (status, body) = ctx.put(&uri, &member, blank).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid"));
    }
    let (_, body) = ctx.get(&uri, &member).await;
    assert_eq!(body["status"], "inprogress");
    assert_eq!(body["priority"], "high");

    let (status, body) = ctx.delete(&uri, &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only project owner or admin can delete tasks");

    let (status, body) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task removed");

    let (status, _) = ctx.get(&uri, &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assignment_creates_notification() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let project_id = ctx.create_project(&owner, "Ops", &[&member]).await;

    ctx.create_task(
        &owner,
        json!({ "title": "Rotate keys", "project": project_id, "assignee": member.id() }),
    )
    .await;

    let (status, body) = ctx.get("/api/notifications", &member).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "task_assigned");
    assert_eq!(notifications[0]["read"], false);

    let id = notifications[0]["_id"].as_str().unwrap();
    let uri = format!("/api/notifications/{}/read", id);

    let (status, _) = ctx.put(&uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.put(&uri, &member, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["read"], true);

    let (_, body) = ctx.get("/api/notifications", &owner).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_assignee_must_belong_to_project() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let outsider = ctx.member("Outsider").await;
    let project_id = ctx.create_project(&owner, "Closed", &[]).await;

    let (status, _) = ctx
        .post(
            "/api/tasks",
            &owner,
            json!({ "title": "Nope", "project": project_id, "assignee": outsider.id() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comments_flow() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let outsider = ctx.member("Outsider").await;
    let project_id = ctx.create_project(&owner, "Talk", &[&member]).await;
    let task_id = ctx
        .create_task(&owner, json!({ "title": "Discuss", "project": project_id }))
        .await;

    let (status, body) = ctx
        .post("/api/comments", &member, json!({ "taskId": task_id, "text": "On it" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"]["name"], "Member");
    let comment_id = body["_id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .post("/api/comments", &member, json!({ "taskId": task_id, "text": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "taskId and text required");

    let (status, body) = ctx.get("/api/comments", &member).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "task query param required");

    let (status, body) = ctx
        .get(&format!("/api/comments?task={}", task_id), &member)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .get(&format!("/api/comments?task={}", task_id), &outsider)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/comments/{}", comment_id);
    let (status, body) = ctx.delete(&uri, &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not allowed to delete comment");

    let (status, body) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment removed");
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let project_id = ctx.create_project(&owner, "Doomed", &[&member]).await;
    let task_id = ctx
        .create_task(&owner, json!({ "title": "Soon gone", "project": project_id }))
        .await;
    ctx.post("/api/comments", &member, json!({ "taskId": task_id, "text": "bye" }))
        .await;

    let uri = format!("/api/projects/{}", project_id);
    let (status, body) = ctx.delete(&uri, &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only owner or admin can delete project");

    let (status, body) = ctx.delete(&uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project removed");
    assert_eq!(body["deletedTasks"], 1);
    assert_eq!(body["deletedComments"], 1);

    let (status, _) = ctx.get(&format!("/api/tasks/{}", task_id), &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_stats_and_report() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let project_id = ctx.create_project(&owner, "Metrics", &[]).await;
    ctx.create_task(&owner, json!({ "title": "a", "project": project_id, "status": "done" }))
        .await;
    ctx.create_task(&owner, json!({ "title": "b", "project": project_id }))
        .await;

    let (status, body) = ctx.get("/api/dashboard/stats", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "totalTasks": 2, "done": 1, "percent": 50 }));

    let (status, body) = ctx.get("/api/dashboard/report", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "projectId required");

    let (status, _) = ctx
        .get(&format!("/api/dashboard/report?projectId={}", project_id), &owner)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get("/api/dashboard/overview", &owner).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.get("/api/dashboard/calendar?from=soon", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid from");
}

#[tokio::test]
async fn test_admin_user_listing() {
    let ctx = TestContext::new();
    let admin = ctx.admin("Root").await;
    let member = ctx.member("Member").await;

    let (status, body) = ctx.get("/api/admin/users", &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden: insufficient role");

    let (status, body) = ctx.get("/api/admin/users?limit=1", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = ctx.get("/api/admin/users?page=abc", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_task_events_reach_project_room() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let project_id = ctx.create_project(&owner, "Live", &[]).await;

    let hub = ctx.state.hub.clone();
    let mut rx = hub.add("conn-1".to_string(), owner.user.id).await;
    hub.join("conn-1", Room::Project(project_id.parse().unwrap()))
        .await;

    let task_id = ctx
        .create_task(&owner, json!({ "title": "Watch me", "project": project_id }))
        .await;

    match rx.try_recv() {
        Ok(Message::Text(text)) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(frame["event"], "taskCreated");
            assert_eq!(frame["data"]["_id"], task_id.as_str());
        }
        other => panic!("expected taskCreated frame, got {:?}", other),
    }

    ctx.delete(&format!("/api/tasks/{}", task_id), &owner).await;

    match rx.try_recv() {
        Ok(Message::Text(text)) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(frame["event"], "taskDeleted");
            assert_eq!(frame["data"]["taskId"], task_id.as_str());
        }
        other => panic!("expected taskDeleted frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_removed_member_stops_receiving_project_events() {
    let ctx = TestContext::new();
    let owner = ctx.manager("Owner").await;
    let member = ctx.member("Member").await;
    let project_id = ctx.create_project(&owner, "Live", &[&member]).await;
    let room = Room::Project(project_id.parse().unwrap());

    let hub = ctx.state.hub.clone();
    let mut rx = hub.add("member-conn".to_string(), member.user.id).await;
    hub.join("member-conn", room).await;

    let (status, body) = ctx
        .put(
            &format!("/api/projects/{}", project_id),
            &owner,
            json!({ "members": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 0);

    match rx.try_recv() {
        Ok(Message::Text(text)) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(frame["event"], "projectAccessRevoked");
            assert_eq!(frame["data"]["projectId"], project_id.as_str());
        }
        other => panic!("expected projectAccessRevoked frame, got {:?}", other),
    }
    assert!(hub.rooms_of("member-conn").await.is_empty());

    ctx.create_task(&owner, json!({ "title": "Private now", "project": project_id }))
        .await;
    assert!(rx.try_recv().is_err());
}

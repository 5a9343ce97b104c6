//! Common test utilities for API tests
//!
//! This module provides shared infrastructure for router-level tests:
//! - In-memory store and local hub (no database or Redis needed)
//! - Configuration built from a fixed variable map
//! - User creation with ready-to-use bearer tokens
//! - Request helpers that drive the router with `oneshot`

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::password::hash_password;
use taskboard_shared::models::user::{CreateUser, User, UserRole};
use taskboard_shared::store::{MemoryStore, Store};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "hunter22";

/// Builds a config from `vars` on top of a memory database and test secret
pub fn test_config(vars: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = HashMap::from([
        ("DATABASE_URL".to_string(), "memory".to_string()),
        ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
    ]);
    for (k, v) in vars {
        map.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| map.get(key).cloned()).unwrap()
}

/// A registered user and their bearer token
#[derive(Clone)]
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> String {
        self.user.id.to_string()
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing the router and its state
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config);
        let app = build_router(state.clone());

        Self { store, state, app }
    }

    /// Creates a user directly in the store
    pub async fn create_user(&self, name: &str, role: UserRole) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: Some(hash_password(TEST_PASSWORD).unwrap()),
                role,
                google_id: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue(user.id).unwrap();

        TestUser { user, token }
    }

    pub async fn member(&self, name: &str) -> TestUser {
        self.create_user(name, UserRole::Member).await
    }

    pub async fn manager(&self, name: &str) -> TestUser {
        self.create_user(name, UserRole::Manager).await
    }

    pub async fn admin(&self, name: &str) -> TestUser {
        self.create_user(name, UserRole::Admin).await
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", user.auth_header());
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(user), None).await
    }

    /// Creates a project owned by `owner` and returns its id
    pub async fn create_project(&self, owner: &TestUser, title: &str, members: &[&TestUser]) -> String {
        let members: Vec<String> = members.iter().map(|m| m.id()).collect();
        let (status, body) = self
            .post(
                "/api/projects",
                owner,
                serde_json::json!({ "title": title, "members": members }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    /// Creates a task and returns its id
    pub async fn create_task(&self, user: &TestUser, body: Value) -> String {
        let (status, body) = self.post("/api/tasks", user, body).await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

//! Shared fixtures for service integration tests
//!
//! Everything runs against [`MemoryStore`], so no database is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::events::{EventPublisher, LiveEvent, PublishError, Room};
use taskboard_shared::models::project::ProjectView;
use taskboard_shared::models::user::{CreateUser, User, UserRole};
use taskboard_shared::services::projects::{self, CreateProjectInput};
use taskboard_shared::store::{MemoryStore, Store};
use uuid::Uuid;

/// Publisher that remembers every event
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(Room, LiveEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(Room, LiveEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Event names published to `room`, in order
    pub fn names_in(&self, room: Room) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter(|(r, _)| *r == room)
            .map(|(_, e)| e.name())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, room: Room, event: LiveEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push((room, event));
        Ok(())
    }
}

/// Publisher whose channel is always down
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _room: Room, _event: LiveEvent) -> Result<(), PublishError> {
        Err(PublishError::Closed)
    }
}

pub struct TestEnv {
    pub store: MemoryStore,
    pub events: RecordingPublisher,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            events: RecordingPublisher::default(),
        }
    }

    pub async fn user(&self, name: &str, role: UserRole) -> (User, AuthContext) {
        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: None,
                role,
                google_id: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        let ctx = AuthContext::from_user(&user);
        (user, ctx)
    }

    pub async fn member(&self, name: &str) -> (User, AuthContext) {
        self.user(name, UserRole::Member).await
    }

    pub async fn project(&self, owner: &AuthContext, title: &str, members: Vec<Uuid>) -> ProjectView {
        projects::create(
            &self.store,
            owner,
            CreateProjectInput {
                title: title.to_string(),
                members,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

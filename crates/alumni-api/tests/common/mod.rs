//! Shared fixtures: an in-memory database, a temp upload dir, users and tokens.

#![allow(dead_code)]

use alumni_api::AppState;
use alumni_common::{
    auth::{Claims, Identity},
    config::LimitsConfig,
    models::user::Role,
};
use alumni_db::{
    Database,
    repository::users::{self, NewUser},
    storage::{FileStore, LocalStore},
};
use jsonwebtoken::{EncodingKey, Header};
use tempfile::TempDir;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

/// App state backed by a private in-memory database. Keep the `TempDir`
/// alive for as long as uploads are needed.
pub async fn test_state() -> (AppState, TempDir) {
    let db = Database::in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStore::Local(LocalStore::new(dir.path(), "/files"));
    let state = AppState::new(db, storage, LimitsConfig::default(), SECRET.to_string());
    (state, dir)
}

pub async fn student(state: &AppState, name: &str) -> Identity {
    let id = Uuid::now_v7();
    let resume = format!("/files/resumes/{id}/cv.pdf");
    users::create_user(
        &state.db.pool,
        &NewUser {
            id,
            name,
            email: None,
            role: Role::Student,
            headline: Some("Final-year CS student"),
            resume_url: Some(&resume),
            mentoring_enabled: false,
            mentorship_capacity: 3,
        },
    )
    .await
    .unwrap();
    Identity::new(id, Role::Student)
}

pub async fn alumni(state: &AppState, name: &str, capacity: i64) -> Identity {
    let id = Uuid::now_v7();
    users::create_user(
        &state.db.pool,
        &NewUser {
            id,
            name,
            email: Some("mentor@example.com"),
            role: Role::Alumni,
            headline: Some("Staff engineer, class of 2012"),
            resume_url: None,
            mentoring_enabled: true,
            mentorship_capacity: capacity,
        },
    )
    .await
    .unwrap();
    Identity::new(id, Role::Alumni)
}

pub fn admin() -> Identity {
    Identity::new(Uuid::now_v7(), Role::Admin)
}

/// A bearer token for `identity`, valid for an hour.
pub fn token(identity: &Identity) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: identity.user_id.to_string(),
        role: identity.role,
        iat: now,
        exp: now + 3600,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

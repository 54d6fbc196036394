//! Mentorship routes — requests, responses, the conversation list, flags and notes.
//!
//! POST   /api/v1/mentorships                — Request a mentor (student)
//! GET    /api/v1/mentorships                — My mentorships (?status=&archived=)
//! GET    /api/v1/mentorships/{id}           — Full conversation
//! PATCH  /api/v1/mentorships/{id}/status    — Accept / reject / remove (alumni, admin)
//! POST   /api/v1/mentorships/{id}/read      — Mark all messages read
//! POST   /api/v1/mentorships/{id}/mute      — Toggle mute
//! POST   /api/v1/mentorships/{id}/archive   — Toggle archive
//! GET    /api/v1/mentorships/{id}/notes     — Mentor notes (alumni)
//! POST   /api/v1/mentorships/{id}/notes     — Add a mentor note (alumni)

use alumni_common::{
    access::{MentorshipDetail, MentorshipSummary},
    auth::Identity,
    error::AlumniResult,
    models::mentorship::{
        CreateMentorshipRequest, CreateNoteRequest, MentorNote, MentorshipListQuery,
        MentorshipStatus, UpdateStatusRequest,
    },
    validation::validate_request,
};
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    mentorship::{conversation, notes, requests},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/mentorships",
            get(list_mentorships).post(request_mentorship),
        )
        .route("/mentorships/{id}", get(get_mentorship))
        .route("/mentorships/{id}/status", patch(update_status))
        .route("/mentorships/{id}/read", post(mark_read))
        .route("/mentorships/{id}/mute", post(toggle_mute))
        .route("/mentorships/{id}/archive", post(toggle_archive))
        .route("/mentorships/{id}/notes", get(list_notes).post(add_note))
}

async fn request_mentorship(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMentorshipRequest>,
) -> AlumniResult<(StatusCode, Json<MentorshipDetail>)> {
    let m = requests::request_mentorship(&state, &identity, body).await?;
    let detail = requests::view(&state, &m, &identity).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_mentorships(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MentorshipListQuery>,
) -> AlumniResult<Json<Vec<MentorshipSummary>>> {
    let list = requests::list_mine(&state, &identity, query).await?;
    Ok(Json(list))
}

async fn get_mentorship(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AlumniResult<Json<MentorshipDetail>> {
    let detail = requests::get_conversation(&state, &identity, id).await?;
    Ok(Json(detail))
}

async fn update_status(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AlumniResult<Json<MentorshipDetail>> {
    let next = MentorshipStatus::parse_response_target(&body.status)?;
    let m = requests::update_status(&state, &identity, id, next, body.response).await?;
    let detail = requests::view(&state, &m, &identity).await?;
    Ok(Json(detail))
}

#[derive(Serialize)]
struct ReadResponse {
    updated: usize,
}

async fn mark_read(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AlumniResult<Json<ReadResponse>> {
    let updated = conversation::mark_read(&state, &identity, id).await?;
    Ok(Json(ReadResponse { updated }))
}

async fn toggle_mute(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AlumniResult<Json<serde_json::Value>> {
    let muted = conversation::toggle_mute(&state, &identity, id).await?;
    Ok(Json(serde_json::json!({ "is_muted": muted })))
}

async fn toggle_archive(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AlumniResult<Json<serde_json::Value>> {
    let archived = conversation::toggle_archive(&state, &identity, id).await?;
    Ok(Json(serde_json::json!({ "is_archived": archived })))
}

async fn list_notes(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AlumniResult<Json<Vec<MentorNote>>> {
    let notes = notes::list_notes(&state, &identity, id).await?;
    Ok(Json(notes))
}

async fn add_note(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateNoteRequest>,
) -> AlumniResult<(StatusCode, Json<Vec<MentorNote>>)> {
    validate_request(&body)?;
    let notes = notes::add_note(&state, &identity, id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(notes)))
}

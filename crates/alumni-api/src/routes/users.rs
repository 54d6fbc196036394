//! User routes — own profile, mentoring settings, resume upload, mentor directory.

use alumni_common::{
    auth::Identity,
    error::{AlumniError, AlumniResult},
    models::user::{MentorListing, Role, UpdateMentoringRequest, User},
    validation::validate_request,
};
use alumni_db::repository::{mentorships, users};
use axum::{
    Json, Router,
    extract::{Extension, Multipart, State},
    routing::{get, put},
};
use std::sync::Arc;

use super::uploads;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/@me", get(get_current_user))
        .route("/users/@me/mentoring", put(update_mentoring))
        .route("/users/@me/resume", put(upload_resume))
        .route("/mentors", get(list_mentors))
}

/// GET /api/v1/users/@me — Get the authenticated user's profile.
async fn get_current_user(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
) -> AlumniResult<Json<User>> {
    let user = users::find_by_id(&state.db.pool, identity.user_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;

    Ok(Json(user))
}

/// PUT /api/v1/users/@me/mentoring — Turn mentoring on/off, set capacity (alumni only).
async fn update_mentoring(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateMentoringRequest>,
) -> AlumniResult<Json<User>> {
    if identity.role != Role::Alumni {
        return Err(AlumniError::forbidden("Only alumni can mentor"));
    }
    validate_request(&body)?;

    let max = state.limits.max_mentorship_capacity;
    if body.mentorship_capacity.is_some_and(|c| c > max) {
        return Err(AlumniError::validation(format!(
            "Capacity must be between 1 and {max}"
        )));
    }

    let pool = &state.db.pool;
    let updated = users::update_mentoring(
        pool,
        identity.user_id,
        body.mentoring_enabled,
        body.mentorship_capacity,
    )
    .await?;
    let user = users::find_by_id(pool, identity.user_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;
    if !updated {
        let accepted = mentorships::count_accepted_for_alumni(pool, identity.user_id).await?;
        return Err(AlumniError::conflict(format!(
            "Capacity cannot go below the {accepted} mentorships already accepted"
        )));
    }

    tracing::info!(
        user_id = %user.id,
        enabled = user.mentoring_enabled,
        capacity = user.mentorship_capacity,
        "Mentoring settings updated"
    );
    Ok(Json(user))
}

/// PUT /api/v1/users/@me/resume — Upload a new resume (students only).
///
/// Form fields: `file` (required).
async fn upload_resume(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AlumniResult<Json<User>> {
    if identity.role != Role::Student {
        return Err(AlumniError::forbidden("Only students can upload a resume"));
    }

    let form = uploads::read_form(&mut multipart, state.limits.max_file_size_bytes).await?;
    let file = form
        .file
        .ok_or_else(|| AlumniError::validation("No file field in request"))?;

    let stored = uploads::store(&state, "resumes", file).await?;
    let user = users::update_resume(&state.db.pool, identity.user_id, &stored.attachment.url)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;

    tracing::info!(user_id = %user.id, "Resume updated");
    Ok(Json(user))
}

/// GET /api/v1/mentors — Alumni currently accepting mentees.
async fn list_mentors(State(state): State<Arc<AppState>>) -> AlumniResult<Json<Vec<MentorListing>>> {
    let mentors = users::list_mentors(&state.db.pool).await?;
    Ok(Json(mentors))
}

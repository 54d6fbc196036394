use alumni_common::{
    access,
    auth::Identity,
    error::{AlumniError, AlumniResult},
    models::mentorship::{MentorNote, Party},
    validation::require_text,
};
use chrono::Utc;
use uuid::Uuid;

use super::{load, mutate};
use crate::AppState;

/// Append a private note and return all notes in the order they were written.
pub async fn add_note(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
    text: &str,
) -> AlumniResult<Vec<MentorNote>> {
    let note = MentorNote {
        id: Uuid::now_v7(),
        text: require_text("Note", text, state.limits.max_note_length)?,
        created_at: Utc::now(),
    };

    let (m, ()) = mutate(state, id, |m| {
        access::authorize(m, actor.user_id)?;
        m.add_note(actor.user_id, note.clone())
    })
    .await?;

    tracing::debug!(mentorship_id = %id, note_id = %note.id, "Mentor note added");
    Ok(m.mentor_notes)
}

pub async fn list_notes(state: &AppState, actor: &Identity, id: Uuid) -> AlumniResult<Vec<MentorNote>> {
    let m = load(state, id).await?;
    if access::authorize(&m, actor.user_id)? != Party::Alumni {
        return Err(AlumniError::forbidden("Only the mentor can read notes"));
    }
    Ok(m.mentor_notes)
}

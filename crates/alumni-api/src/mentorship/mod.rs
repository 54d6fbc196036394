//! Mentorship engine — the rules behind the mentorship routes.
//!
//! - [`requests`]: requesting a mentor, responding, listing, reading a conversation
//! - [`conversation`]: sending, deleting, read receipts, mute/archive
//! - [`notes`]: the mentor's private notes
//!
//! Every change to an existing mentorship goes through [`mutate`], which
//! loads the document, applies the change in memory and writes it back only
//! if nobody else wrote in between. A lost race reloads and reapplies, so
//! concurrent writers never drop each other's updates.

pub mod conversation;
pub mod notes;
pub mod requests;

use alumni_common::{
    error::{AlumniError, AlumniResult},
    events::MentorshipEvent,
    models::{mentorship::Mentorship, user::ProfileCard},
};
use alumni_db::repository::{mentorships, users};
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;

/// Attempts before a contended write gives up with a conflict.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 5;

/// Load a mentorship or fail with NotFound.
pub(crate) async fn load(state: &AppState, id: Uuid) -> AlumniResult<Mentorship> {
    mentorships::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AlumniError::not_found("Mentorship"))
}

/// Apply `change` to the stored mentorship and persist it with a version check.
///
/// `change` returns `Some(value)` to write, or `None` when there is nothing
/// to persist (the stored document is returned untouched). It may run more
/// than once if another writer races us, so it must not have side effects
/// outside the document.
pub(crate) async fn mutate_if<T, F>(
    state: &AppState,
    id: Uuid,
    mut change: F,
) -> AlumniResult<(Mentorship, Option<T>)>
where
    F: FnMut(&mut Mentorship) -> AlumniResult<Option<T>>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut m = load(state, id).await?;
        let Some(value) = change(&mut m)? else {
            return Ok((m, None));
        };
        m.updated_at = m.updated_at.max(Utc::now());

        if mentorships::save(&state.db.pool, &m, None).await? {
            m.version += 1;
            return Ok((m, Some(value)));
        }
        tracing::debug!(mentorship_id = %id, attempt, "Version conflict, retrying write");
    }

    tracing::warn!(mentorship_id = %id, "Giving up on contended mentorship write");
    Err(AlumniError::conflict(
        "The conversation changed while saving, please try again",
    ))
}

/// [`mutate_if`] for changes that always write.
pub(crate) async fn mutate<T, F>(state: &AppState, id: Uuid, mut change: F) -> AlumniResult<(Mentorship, T)>
where
    F: FnMut(&mut Mentorship) -> AlumniResult<T>,
{
    let (m, value) = mutate_if(state, id, |m| change(m).map(Some)).await?;
    let value = value.ok_or_else(|| anyhow::anyhow!("mutation produced no value"))?;
    Ok((m, value))
}

/// Profile cards for both parties.
pub(crate) async fn party_cards(
    state: &AppState,
    m: &Mentorship,
) -> AlumniResult<(ProfileCard, ProfileCard)> {
    let student = users::find_by_id(&state.db.pool, m.student_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;
    let alumni = users::find_by_id(&state.db.pool, m.alumni_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;
    Ok(((&student).into(), (&alumni).into()))
}

/// Publish an event to both parties. Having no listeners is fine.
pub(crate) fn publish(
    state: &AppState,
    event_type: &str,
    m: &Mentorship,
    actor_id: Uuid,
    data: serde_json::Value,
) {
    let _ = state.events.send(MentorshipEvent {
        event_type: event_type.to_string(),
        mentorship_id: m.id,
        actor_id,
        recipients: vec![m.student_id, m.alumni_id],
        data,
    });
}

/// Whether a store error is a unique-index violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

//! Requesting a mentor and responding to requests.

use std::collections::HashMap;

use alumni_common::{
    access::{self, MentorshipDetail, MentorshipSummary},
    auth::Identity,
    error::{AlumniError, AlumniResult},
    events,
    models::{
        mentorship::{CreateMentorshipRequest, Mentorship, MentorshipListQuery, MentorshipStatus},
        user::{ProfileCard, Role},
    },
    validation::{require_text, validate_request},
};
use alumni_db::repository::{
    mentorships::{self, AcceptGuard, ListScope},
    users,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::{MAX_WRITE_ATTEMPTS, is_unique_violation, load, party_cards, publish};
use crate::AppState;

/// Open a pending mentorship from a student to an alumni.
pub async fn request_mentorship(
    state: &AppState,
    actor: &Identity,
    body: CreateMentorshipRequest,
) -> AlumniResult<Mentorship> {
    if actor.role != Role::Student {
        return Err(AlumniError::forbidden("Only students can request mentorship"));
    }
    validate_request(&body)?;
    let max = state.limits.max_request_length;
    let message = require_text("Message", &body.message, max)?;
    let topic = require_text("Topic", &body.topic, max)?;

    let pool = &state.db.pool;
    let alumni = users::find_by_id(pool, body.alumni_id)
        .await?
        .filter(|u| u.role == Role::Alumni)
        .ok_or_else(|| AlumniError::not_found("Alumni"))?;

    if !alumni.mentoring_enabled {
        return Err(AlumniError::forbidden(
            "This alumni is not accepting mentees right now",
        ));
    }

    let accepted = mentorships::count_accepted_for_alumni(pool, alumni.id).await?;
    if accepted >= alumni.mentorship_capacity {
        return Err(AlumniError::CapacityExceeded {
            message: format!("{} has no free mentorship slots", alumni.name),
        });
    }

    if mentorships::count_accepted_for_student(pool, actor.user_id).await? > 0 {
        return Err(AlumniError::conflict("You already have an active mentorship"));
    }

    if mentorships::has_pending_request(pool, actor.user_id, alumni.id).await? {
        return Err(AlumniError::conflict(
            "You already have a pending request to this alumni",
        ));
    }

    let student = users::find_by_id(pool, actor.user_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;

    let m = Mentorship::new(
        Uuid::now_v7(),
        student.id,
        alumni.id,
        message,
        topic,
        student.resume_url.clone(),
        Utc::now(),
    );

    match mentorships::insert(pool, &m).await {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AlumniError::conflict(
                "You already have a pending request to this alumni",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        mentorship_id = %m.id,
        student_id = %m.student_id,
        alumni_id = %m.alumni_id,
        "Mentorship requested"
    );
    publish(
        state,
        events::MENTORSHIP_REQUEST,
        &m,
        actor.user_id,
        json!({ "status": m.status, "topic": m.topic }),
    );

    Ok(m)
}

/// Accept, reject or remove a mentorship.
///
/// Accepting re-checks both capacity rules against the store and repeats the
/// check inside the conditional write, so two concurrent accepts cannot push
/// an alumni over capacity or give a student two mentors.
pub async fn update_status(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
    next: MentorshipStatus,
    response: Option<String>,
) -> AlumniResult<Mentorship> {
    let response = match response.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(require_text("Response", text, state.limits.max_request_length)?),
    };
    let pool = &state.db.pool;

    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut m = load(state, id).await?;
        if !access::can_respond(&m, actor) {
            return Err(AlumniError::forbidden(
                "Only the requested alumni can respond to this mentorship",
            ));
        }
        let previous = m.status;
        m.transition_to(next, response.clone(), Utc::now())?;

        let guard = if next == MentorshipStatus::Accepted {
            Some(check_accept_capacity(state, &m).await?)
        } else {
            None
        };

        match mentorships::save(pool, &m, guard).await {
            Ok(true) => {
                m.version += 1;
                tracing::info!(
                    mentorship_id = %m.id,
                    actor_id = %actor.user_id,
                    from = %previous,
                    to = %next,
                    "Mentorship status changed"
                );
                publish(
                    state,
                    events::MENTORSHIP_STATUS,
                    &m,
                    actor.user_id,
                    json!({ "status": m.status, "response": m.response }),
                );
                return Ok(m);
            }
            Ok(false) => {
                tracing::debug!(mentorship_id = %id, attempt, "Status write lost a race, retrying");
            }
            Err(e) if is_unique_violation(&e) => {
                return Err(AlumniError::conflict(
                    "The student already has an active mentorship",
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(mentorship_id = %id, "Giving up on contended status change");
    Err(AlumniError::conflict(
        "The mentorship changed while saving, please try again",
    ))
}

async fn check_accept_capacity(state: &AppState, m: &Mentorship) -> AlumniResult<AcceptGuard> {
    let pool = &state.db.pool;
    let alumni = users::find_by_id(pool, m.alumni_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("Alumni"))?;

    let accepted = mentorships::count_accepted_for_alumni(pool, m.alumni_id).await?;
    if accepted >= alumni.mentorship_capacity {
        return Err(AlumniError::CapacityExceeded {
            message: format!(
                "Mentorship capacity reached ({accepted}/{})",
                alumni.mentorship_capacity
            ),
        });
    }
    if mentorships::count_accepted_for_student(pool, m.student_id).await? > 0 {
        return Err(AlumniError::conflict(
            "The student already has an active mentorship",
        ));
    }

    Ok(AcceptGuard {
        capacity: alumni.mentorship_capacity,
    })
}

/// The caller's mentorships, most recent activity first.
///
/// Parties only see conversations they can still open; admins see everything.
pub async fn list_mine(
    state: &AppState,
    actor: &Identity,
    query: MentorshipListQuery,
) -> AlumniResult<Vec<MentorshipSummary>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<MentorshipStatus>)
        .transpose()?;

    let scope = match actor.role {
        Role::Student => ListScope::Student(actor.user_id),
        Role::Alumni => ListScope::Alumni(actor.user_id),
        Role::Admin => ListScope::All,
    };

    let pool = &state.db.pool;
    let mut cards: HashMap<Uuid, ProfileCard> = HashMap::new();
    let mut out = Vec::new();

    for m in mentorships::list(pool, scope).await? {
        if status.is_some_and(|s| s != m.status) {
            continue;
        }
        if !actor.is_admin() && access::authorize(&m, actor.user_id).is_err() {
            continue;
        }
        if let Some(archived) = query.archived {
            if m.archived_by.contains(&actor.user_id) != archived {
                continue;
            }
        }

        let student = card(state, &mut cards, m.student_id).await?;
        let alumni = card(state, &mut cards, m.alumni_id).await?;
        out.push(access::summarize(&m, actor.user_id, student, alumni));
    }

    Ok(out)
}

async fn card(
    state: &AppState,
    cache: &mut HashMap<Uuid, ProfileCard>,
    user_id: Uuid,
) -> AlumniResult<ProfileCard> {
    if let Some(card) = cache.get(&user_id) {
        return Ok(card.clone());
    }
    let user = users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| AlumniError::not_found("User"))?;
    let card = ProfileCard::from(&user);
    cache.insert(user_id, card.clone());
    Ok(card)
}

/// Load one conversation for one of its parties.
pub async fn get_conversation(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
) -> AlumniResult<MentorshipDetail> {
    let m = load(state, id).await?;
    access::authorize(&m, actor.user_id)?;
    view(state, &m, actor).await
}

/// Render `m` as `actor` is allowed to see it.
pub(crate) async fn view(
    state: &AppState,
    m: &Mentorship,
    actor: &Identity,
) -> AlumniResult<MentorshipDetail> {
    let (student, alumni) = party_cards(state, m).await?;
    Ok(access::detail(m, actor.user_id, student, alumni))
}

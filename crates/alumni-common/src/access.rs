//! Mentorship access rules.
//!
//! Every read or write on a mentorship goes through [`authorize`] first. What a
//! user may see depends on the mentorship's *current* status, so the answer
//! changes as soon as a status transition is persisted.
//!
//! Serialisation also goes through here: [`summarize`] and [`detail`] are the
//! only way a mentorship leaves the service, and they strip what the viewer
//! is not allowed to see (the pending student's resume for the alumni, the
//! mentor notes for everyone but the alumni).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{AlumniError, AlumniResult};
use crate::models::mentorship::{MentorNote, Mentorship, MentorshipStatus, Party};
use crate::models::message::Message;
use crate::models::user::ProfileCard;

/// Gate for any read or write on one mentorship.
///
/// Non-parties are always refused. Parties are refused once the mentorship is
/// `removed`; clients treat that refusal as the cue to look for a new mentor.
pub fn authorize(mentorship: &Mentorship, viewer: Uuid) -> AlumniResult<Party> {
    let party = mentorship
        .party_of(viewer)
        .ok_or_else(|| AlumniError::forbidden("You are not part of this mentorship"))?;

    if mentorship.status == MentorshipStatus::Removed {
        return Err(AlumniError::forbidden(
            "This mentorship has ended. Find a new mentor to continue.",
        ));
    }

    Ok(party)
}

/// Whether `actor` may accept, reject or remove this mentorship.
pub fn can_respond(mentorship: &Mentorship, actor: &Identity) -> bool {
    actor.is_admin() || mentorship.party_of(actor.user_id) == Some(Party::Alumni)
}

/// The alumni does not see a student's resume until the request is accepted.
pub fn hides_resume(status: MentorshipStatus, viewer: Option<Party>) -> bool {
    viewer == Some(Party::Alumni) && status == MentorshipStatus::Pending
}

/// List entry for "my mentorships".
#[derive(Debug, Clone, Serialize)]
pub struct MentorshipSummary {
    pub id: Uuid,
    pub status: MentorshipStatus,
    pub topic: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    pub response: Option<String>,
    pub student: ProfileCard,
    pub alumni: ProfileCard,
    pub last_message: Option<Message>,
    pub unread_count: usize,
    pub is_muted: bool,
    pub is_archived: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full conversation as returned to one of its parties.
#[derive(Debug, Clone, Serialize)]
pub struct MentorshipDetail {
    #[serde(flatten)]
    pub summary: MentorshipSummary,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor_notes: Option<Vec<MentorNote>>,
}

/// Build the list view of `mentorship` for `viewer`.
pub fn summarize(
    mentorship: &Mentorship,
    viewer: Uuid,
    mut student: ProfileCard,
    alumni: ProfileCard,
) -> MentorshipSummary {
    let hide = hides_resume(mentorship.status, mentorship.party_of(viewer));
    if hide {
        student.resume_url = None;
    }

    MentorshipSummary {
        id: mentorship.id,
        status: mentorship.status,
        topic: mentorship.topic.clone(),
        message: mentorship.message.clone(),
        resume_url: if hide {
            None
        } else {
            mentorship.resume_url.clone()
        },
        response: mentorship.response.clone(),
        student,
        alumni,
        last_message: mentorship.last_message().cloned(),
        unread_count: mentorship.unread_count(viewer),
        is_muted: mentorship.muted_by.contains(&viewer),
        is_archived: mentorship.archived_by.contains(&viewer),
        last_message_at: mentorship.last_message_at,
        created_at: mentorship.created_at,
        updated_at: mentorship.updated_at,
    }
}

/// Build the conversation view of `mentorship` for `viewer`.
pub fn detail(
    mentorship: &Mentorship,
    viewer: Uuid,
    student: ProfileCard,
    alumni: ProfileCard,
) -> MentorshipDetail {
    let notes = (mentorship.party_of(viewer) == Some(Party::Alumni))
        .then(|| mentorship.mentor_notes.clone());

    MentorshipDetail {
        summary: summarize(mentorship, viewer, student, alumni),
        messages: mentorship.messages.clone(),
        mentor_notes: notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn card(id: Uuid, resume: Option<&str>) -> ProfileCard {
        ProfileCard {
            id,
            name: "Someone".into(),
            headline: None,
            resume_url: resume.map(str::to_string),
        }
    }

    fn mentorship() -> Mentorship {
        Mentorship::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Uuid::now_v7(),
            "Please mentor me".into(),
            "Career switch".into(),
            Some("resumes/snapshot.pdf".into()),
            Utc::now(),
        )
    }

    #[test]
    fn outsiders_are_forbidden() {
        let m = mentorship();
        assert!(matches!(
            authorize(&m, Uuid::now_v7()),
            Err(AlumniError::Forbidden { .. })
        ));
        assert_eq!(authorize(&m, m.student_id).unwrap(), Party::Student);
        assert_eq!(authorize(&m, m.alumni_id).unwrap(), Party::Alumni);
    }

    #[test]
    fn removed_is_forbidden_for_both_parties() {
        let mut m = mentorship();
        m.transition_to(MentorshipStatus::Removed, None, Utc::now())
            .unwrap();
        assert!(authorize(&m, m.student_id).is_err());
        assert!(authorize(&m, m.alumni_id).is_err());
    }

    #[test]
    fn rejected_stays_readable() {
        let mut m = mentorship();
        m.transition_to(MentorshipStatus::Rejected, Some("Full".into()), Utc::now())
            .unwrap();
        assert!(authorize(&m, m.student_id).is_ok());
    }

    #[test]
    fn respond_allowed_for_alumni_and_admin_only() {
        let m = mentorship();
        assert!(can_respond(&m, &Identity::new(m.alumni_id, Role::Alumni)));
        assert!(can_respond(&m, &Identity::new(Uuid::now_v7(), Role::Admin)));
        assert!(!can_respond(&m, &Identity::new(m.student_id, Role::Student)));
        assert!(!can_respond(&m, &Identity::new(Uuid::now_v7(), Role::Alumni)));
    }

    #[test]
    fn pending_resume_hidden_from_alumni_only() {
        let mut m = mentorship();
        let student = card(m.student_id, Some("resumes/live.pdf"));
        let alumni = card(m.alumni_id, None);

        let for_alumni = summarize(&m, m.alumni_id, student.clone(), alumni.clone());
        assert!(for_alumni.resume_url.is_none());
        assert!(for_alumni.student.resume_url.is_none());

        let for_student = summarize(&m, m.student_id, student.clone(), alumni.clone());
        assert_eq!(for_student.resume_url.as_deref(), Some("resumes/snapshot.pdf"));

        m.transition_to(MentorshipStatus::Accepted, None, Utc::now())
            .unwrap();
        let for_alumni = summarize(&m, m.alumni_id, student, alumni);
        assert_eq!(for_alumni.resume_url.as_deref(), Some("resumes/snapshot.pdf"));
        assert_eq!(for_alumni.student.resume_url.as_deref(), Some("resumes/live.pdf"));
    }

    #[test]
    fn notes_only_in_alumni_detail() {
        let mut m = mentorship();
        m.transition_to(MentorshipStatus::Accepted, None, Utc::now())
            .unwrap();
        m.add_note(
            m.alumni_id,
            MentorNote {
                id: Uuid::now_v7(),
                text: "Follow up on portfolio".into(),
                created_at: Utc::now(),
            },
        )
        .unwrap();

        let student_view = detail(&m, m.student_id, card(m.student_id, None), card(m.alumni_id, None));
        assert!(student_view.mentor_notes.is_none());
        let json = serde_json::to_value(&student_view).unwrap();
        assert!(json.get("mentor_notes").is_none());

        let alumni_view = detail(&m, m.alumni_id, card(m.student_id, None), card(m.alumni_id, None));
        assert_eq!(alumni_view.mentor_notes.map(|n| n.len()), Some(1));
    }
}

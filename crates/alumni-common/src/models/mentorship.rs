//! Mentorship — the aggregate that pairs one student with one alumni.
//!
//! The whole conversation (messages, read receipts, mute/archive flags and the
//! alumni's private notes) is embedded in the mentorship document, so every
//! mutation here is a pure in-memory change that the store later persists
//! with a version check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AlumniError, AlumniResult};
use crate::models::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorshipStatus {
    Pending,
    Accepted,
    Rejected,
    Removed,
    Completed,
}

impl MentorshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Removed => "removed",
            Self::Completed => "completed",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Removed | Self::Completed)
    }

    /// Transition table:
    ///
    /// - pending  → accepted | rejected | removed
    /// - accepted → removed
    pub fn can_transition_to(&self, next: MentorshipStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Removed)
                | (Self::Accepted, Self::Removed)
        )
    }

    /// Parse a status sent by an alumni/admin response. Only the three
    /// response targets are accepted; everything else is a validation error.
    pub fn parse_response_target(s: &str) -> AlumniResult<Self> {
        match s.parse::<Self>()? {
            status @ (Self::Accepted | Self::Rejected | Self::Removed) => Ok(status),
            other => Err(AlumniError::validation(format!(
                "Status must be one of accepted, rejected, removed (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for MentorshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MentorshipStatus {
    type Err = AlumniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "removed" => Ok(Self::Removed),
            "completed" => Ok(Self::Completed),
            other => Err(AlumniError::validation(format!(
                "Unknown mentorship status '{other}'"
            ))),
        }
    }
}

/// Which side of a mentorship a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Student,
    Alumni,
}

/// Private annotation kept by the alumni. Never shown to the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorNote {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentorship {
    pub id: Uuid,
    pub student_id: Uuid,
    pub alumni_id: Uuid,
    pub status: MentorshipStatus,

    /// Student's opening message, immutable
    pub message: String,
    /// What the student wants mentoring on, immutable
    pub topic: String,
    /// Resume reference copied from the student's profile at request time
    pub resume_url: Option<String>,
    /// Alumni's rationale for the latest status change
    pub response: Option<String>,

    pub messages: Vec<Message>,
    pub mentor_notes: Vec<MentorNote>,
    pub muted_by: BTreeSet<Uuid>,
    pub archived_by: BTreeSet<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency token, bumped by every persisted write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mentorship {
    /// A fresh pending request.
    pub fn new(
        id: Uuid,
        student_id: Uuid,
        alumni_id: Uuid,
        message: String,
        topic: String,
        resume_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            alumni_id,
            status: MentorshipStatus::Pending,
            message,
            topic,
            resume_url,
            response: None,
            messages: Vec::new(),
            mentor_notes: Vec::new(),
            muted_by: BTreeSet::new(),
            archived_by: BTreeSet::new(),
            last_message_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn party_of(&self, user_id: Uuid) -> Option<Party> {
        if user_id == self.student_id {
            Some(Party::Student)
        } else if user_id == self.alumni_id {
            Some(Party::Alumni)
        } else {
            None
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.party_of(user_id).is_some()
    }

    /// Apply a status change. Moving to `removed` wipes the conversation.
    pub fn transition_to(
        &mut self,
        next: MentorshipStatus,
        response: Option<String>,
        now: DateTime<Utc>,
    ) -> AlumniResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AlumniError::conflict(format!(
                "Cannot move a {} mentorship to {next}",
                self.status
            )));
        }

        self.status = next;
        if response.is_some() {
            self.response = response;
        }
        if next == MentorshipStatus::Removed {
            self.messages.clear();
        }
        self.updated_at = now;
        Ok(())
    }

    /// Append a message. The mentorship must be active and the sender one of
    /// its two parties, checked in that order.
    pub fn post_message(&mut self, mut message: Message) -> AlumniResult<()> {
        if self.status != MentorshipStatus::Accepted {
            return Err(AlumniError::conflict("Mentorship is not active"));
        }
        if !self.is_party(message.sender_id) {
            return Err(AlumniError::forbidden(
                "Only the mentor and mentee can post in this conversation",
            ));
        }

        message.read_by.insert(message.sender_id);
        self.last_message_at = Some(message.created_at);
        self.updated_at = message.created_at;
        self.messages.push(message);
        Ok(())
    }

    /// Remove one message. Only its sender may do so; there is no tombstone.
    pub fn delete_message(&mut self, message_id: Uuid, actor_id: Uuid) -> AlumniResult<Message> {
        let index = self
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| AlumniError::not_found("Message"))?;

        if self.messages[index].sender_id != actor_id {
            return Err(AlumniError::forbidden(
                "You can only delete your own messages",
            ));
        }

        Ok(self.messages.remove(index))
    }

    /// Add `reader` to every message's read receipts. Returns how many
    /// messages changed; zero means there is nothing to persist.
    pub fn mark_read(&mut self, reader: Uuid) -> usize {
        self.messages
            .iter_mut()
            .map(|m| m.read_by.insert(reader))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Flip `user`'s mute flag and return the new state.
    pub fn toggle_muted(&mut self, user_id: Uuid) -> bool {
        toggle(&mut self.muted_by, user_id)
    }

    /// Flip `user`'s archive flag and return the new state.
    pub fn toggle_archived(&mut self, user_id: Uuid) -> bool {
        toggle(&mut self.archived_by, user_id)
    }

    /// Append a private note. Only the alumni party may write notes.
    pub fn add_note(&mut self, author_id: Uuid, note: MentorNote) -> AlumniResult<()> {
        if self.party_of(author_id) != Some(Party::Alumni) {
            return Err(AlumniError::forbidden("Only the mentor can keep notes"));
        }
        self.updated_at = note.created_at;
        self.mentor_notes.push(note);
        Ok(())
    }

    pub fn unread_count(&self, viewer: Uuid) -> usize {
        self.messages.iter().filter(|m| !m.is_read_by(viewer)).count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Timestamp used to order a user's conversation list.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

fn toggle(set: &mut BTreeSet<Uuid>, user_id: Uuid) -> bool {
    if set.remove(&user_id) {
        false
    } else {
        set.insert(user_id);
        true
    }
}

/// Student's request for mentorship.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMentorshipRequest {
    pub alumni_id: Uuid,
    #[validate(length(min = 1, message = "A message to the mentor is required"))]
    pub message: String,
    #[validate(length(min = 1, message = "A mentorship topic is required"))]
    pub topic: String,
}

/// Alumni (or admin) response to a request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub response: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, message = "Note text cannot be empty"))]
    pub text: String,
}

/// Filters for the conversation list.
#[derive(Debug, Default, Deserialize)]
pub struct MentorshipListQuery {
    pub status: Option<String>,
    /// `true` for only archived, `false` for only unarchived, absent for all
    pub archived: Option<bool>,
}

//! The chat side of a mentorship: messages, read receipts, mute and archive.

use std::collections::BTreeSet;

use alumni_common::{
    access,
    auth::Identity,
    error::{AlumniError, AlumniResult},
    events,
    models::{
        mentorship::MentorshipStatus,
        message::{Message, MessageType, StoredAttachment},
    },
    validation::require_text,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::{load, mutate, mutate_if, publish};
use crate::AppState;

/// A message as submitted, before it gets an id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    /// Explicit type; inferred from the attachment when absent
    pub message_type: Option<MessageType>,
    pub text: String,
    pub attachment: Option<StoredAttachment>,
    pub transcription: Option<String>,
}

/// Fail early if `actor` could not post to this mentorship right now.
///
/// Upload routes call this before storing a file so a refused message does
/// not leave an orphaned upload behind.
pub async fn ensure_can_send(state: &AppState, actor: &Identity, id: Uuid) -> AlumniResult<()> {
    let m = load(state, id).await?;
    if m.status != MentorshipStatus::Accepted {
        return Err(AlumniError::conflict("Mentorship is not active"));
    }
    if !m.is_party(actor.user_id) {
        return Err(AlumniError::forbidden(
            "Only the mentor and mentee can post in this conversation",
        ));
    }
    Ok(())
}

/// Append a message and return the whole conversation.
pub async fn send_message(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
    draft: MessageDraft,
) -> AlumniResult<Vec<Message>> {
    let message = build_message(state, actor.user_id, draft)?;
    let message_id = message.id;

    let (m, ()) = mutate(state, id, |m| m.post_message(message.clone())).await?;

    tracing::debug!(
        mentorship_id = %id,
        message_id = %message_id,
        message_type = %message.message_type,
        "Message sent"
    );
    let stored = m.messages.iter().find(|x| x.id == message_id);
    publish(
        state,
        events::MESSAGE_CREATE,
        &m,
        actor.user_id,
        json!({ "message": stored }),
    );

    Ok(m.messages)
}

fn build_message(state: &AppState, sender_id: Uuid, draft: MessageDraft) -> AlumniResult<Message> {
    let limits = &state.limits;
    let message_type = match (draft.message_type, &draft.attachment) {
        (Some(explicit), _) => explicit,
        (None, Some(file)) => MessageType::from_media(file.content_type.as_deref(), &file.file_name),
        (None, None) => MessageType::Text,
    };

    let text = if message_type.is_media() {
        let trimmed = draft.text.trim();
        if trimmed.chars().count() > limits.max_message_length {
            return Err(AlumniError::validation(format!(
                "Message must be at most {} characters",
                limits.max_message_length
            )));
        }
        trimmed.to_string()
    } else {
        require_text("Message", &draft.text, limits.max_message_length)?
    };

    match (&draft.attachment, message_type.is_media()) {
        (None, true) => {
            return Err(AlumniError::validation(format!(
                "A {message_type} message needs an attached file"
            )));
        }
        (Some(_), false) => {
            return Err(AlumniError::validation(
                "Text messages cannot carry an attachment",
            ));
        }
        (Some(file), true) if file.size > limits.max_file_size_bytes as u64 => {
            return Err(AlumniError::validation(format!(
                "File exceeds the {} byte limit",
                limits.max_file_size_bytes
            )));
        }
        _ => {}
    }

    let transcription = draft
        .transcription
        .filter(|_| message_type == MessageType::Voice)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let attachment = draft.attachment;
    Ok(Message {
        id: Uuid::now_v7(),
        sender_id,
        message_type,
        text,
        file_url: attachment.as_ref().map(|a| a.url.clone()),
        file_name: attachment.as_ref().map(|a| a.file_name.clone()),
        content_type: attachment.as_ref().and_then(|a| a.content_type.clone()),
        file_size: attachment.as_ref().map(|a| a.size),
        transcription,
        read_by: BTreeSet::new(),
        created_at: Utc::now(),
    })
}

/// Delete one of the caller's own messages.
pub async fn delete_message(
    state: &AppState,
    actor: &Identity,
    id: Uuid,
    message_id: Uuid,
) -> AlumniResult<Vec<Message>> {
    let (m, _removed) = mutate(state, id, |m| {
        access::authorize(m, actor.user_id)?;
        m.delete_message(message_id, actor.user_id)
    })
    .await?;

    tracing::debug!(mentorship_id = %id, message_id = %message_id, "Message deleted");
    publish(
        state,
        events::MESSAGE_DELETE,
        &m,
        actor.user_id,
        json!({ "message_id": message_id }),
    );

    Ok(m.messages)
}

/// Mark every message as read by the caller. Returns how many changed.
pub async fn mark_read(state: &AppState, actor: &Identity, id: Uuid) -> AlumniResult<usize> {
    let (m, changed) = mutate_if(state, id, |m| {
        access::authorize(m, actor.user_id)?;
        let n = m.mark_read(actor.user_id);
        Ok((n > 0).then_some(n))
    })
    .await?;

    let Some(changed) = changed else {
        return Ok(0);
    };
    publish(
        state,
        events::MESSAGES_READ,
        &m,
        actor.user_id,
        json!({ "reader_id": actor.user_id, "count": changed }),
    );
    Ok(changed)
}

/// Flip the caller's mute flag; returns whether the conversation is now muted.
pub async fn toggle_mute(state: &AppState, actor: &Identity, id: Uuid) -> AlumniResult<bool> {
    let (_, muted) = mutate(state, id, |m| {
        access::authorize(m, actor.user_id)?;
        Ok(m.toggle_muted(actor.user_id))
    })
    .await?;
    Ok(muted)
}

/// Flip the caller's archive flag; returns whether the conversation is now archived.
pub async fn toggle_archive(state: &AppState, actor: &Identity, id: Uuid) -> AlumniResult<bool> {
    let (_, archived) = mutate(state, id, |m| {
        access::authorize(m, actor.user_id)?;
        Ok(m.toggle_archived(actor.user_id))
    })
    .await?;
    Ok(archived)
}

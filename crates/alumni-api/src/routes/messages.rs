//! Message routes — send (JSON or multipart) and delete.
//!
//! POST   /api/v1/mentorships/{id}/messages               — Send a text message
//! POST   /api/v1/mentorships/{id}/messages/upload        — Send an image, voice note or file
//! DELETE /api/v1/mentorships/{id}/messages/{message_id}  — Delete own message

use alumni_common::{
    auth::Identity,
    error::{AlumniError, AlumniResult},
    models::message::{Message, MessageType, SendMessageRequest},
    validation::validate_request,
};
use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use std::sync::Arc;
use uuid::Uuid;

use super::uploads;
use crate::{
    AppState,
    mentorship::conversation::{self, MessageDraft},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mentorships/{id}/messages", post(send_message))
        .route("/mentorships/{id}/messages/upload", post(upload_message))
        .route(
            "/mentorships/{id}/messages/{message_id}",
            delete(delete_message),
        )
}

/// Send a text message. Returns the whole conversation.
async fn send_message(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> AlumniResult<(StatusCode, Json<Vec<Message>>)> {
    validate_request(&body)?;
    let message_type = body
        .message_type
        .as_deref()
        .map(str::parse::<MessageType>)
        .transpose()?;

    let draft = MessageDraft {
        message_type,
        text: body.text,
        ..Default::default()
    };
    let messages = conversation::send_message(&state, &identity, id, draft).await?;
    Ok((StatusCode::CREATED, Json(messages)))
}

/// Send a message with an attachment.
///
/// Form fields:
/// - `file` — the attachment (required)
/// - `text` — caption (optional)
/// - `type` — image / voice / file; inferred from the file when omitted
/// - `transcription` — transcript of a voice note (optional)
async fn upload_message(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AlumniResult<(StatusCode, Json<Vec<Message>>)> {
    conversation::ensure_can_send(&state, &identity, id).await?;

    let form = uploads::read_form(&mut multipart, state.limits.max_file_size_bytes).await?;
    let message_type = form.text("type").map(str::parse::<MessageType>).transpose()?;
    if message_type == Some(MessageType::Text) {
        return Err(AlumniError::validation(
            "Uploads must be image, voice or file messages",
        ));
    }
    let text = form.text("text").unwrap_or_default().to_string();
    let transcription = form.text("transcription").map(str::to_string);

    let file = form
        .file
        .ok_or_else(|| AlumniError::validation("No file field in request"))?;
    let upload = uploads::store(&state, &format!("messages/{id}"), file).await?;

    let draft = MessageDraft {
        message_type,
        text,
        attachment: Some(upload.attachment.clone()),
        transcription,
    };
    match conversation::send_message(&state, &identity, id, draft).await {
        Ok(messages) => Ok((StatusCode::CREATED, Json(messages))),
        Err(e) => {
            uploads::discard(&state, &upload).await;
            Err(e)
        }
    }
}

/// Delete one of the caller's messages. Returns the remaining conversation.
async fn delete_message(
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> AlumniResult<Json<Vec<Message>>> {
    let messages = conversation::delete_message(&state, &identity, id, message_id).await?;
    Ok(Json(messages))
}

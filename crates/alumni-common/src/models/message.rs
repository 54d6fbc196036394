//! Chat message — one entry of a mentorship conversation.
//!
//! Messages have no lifecycle of their own: they are embedded in the owning
//! mentorship document and only ever written together with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::AlumniError;

/// A message exchanged between the two parties of a mentorship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,

    /// Student or alumni party who wrote it
    pub sender_id: Uuid,

    pub message_type: MessageType,

    /// Body text; may be empty for media messages
    #[serde(default)]
    pub text: String,

    /// Storage reference for image/voice/file messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,

    /// Original filename of the attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    /// Client-provided transcript of a voice note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,

    /// Identities that have seen this message; always contains the sender
    pub read_by: BTreeSet<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_read_by(&self, user_id: Uuid) -> bool {
        self.read_by.contains(&user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Voice,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Voice => "voice",
            MessageType::File => "file",
        }
    }

    /// Whether this type carries an uploaded file.
    pub fn is_media(&self) -> bool {
        !matches!(self, MessageType::Text)
    }

    /// Pick the message type for an attachment from its media type.
    ///
    /// `image/*` becomes an image, `audio/*` a voice note, anything else a
    /// plain file. When the declared type is missing or the generic
    /// `application/octet-stream`, the type is guessed from the filename.
    pub fn from_media(content_type: Option<&str>, file_name: &str) -> Self {
        let declared = content_type
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

        let essence = match declared {
            Some(ct) => ct,
            None => mime_guess::from_path(file_name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        if essence.starts_with("image/") {
            MessageType::Image
        } else if essence.starts_with("audio/") {
            MessageType::Voice
        } else {
            MessageType::File
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = AlumniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "voice" => Ok(MessageType::Voice),
            "file" => Ok(MessageType::File),
            other => Err(AlumniError::validation(format!(
                "Unknown message type '{other}'"
            ))),
        }
    }
}

/// JSON body of a text message.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "Message text cannot be empty"))]
    pub text: String,
    /// Only "text" makes sense without an upload
    pub message_type: Option<String>,
}

/// An uploaded file already handed to file storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAttachment {
    pub url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}
